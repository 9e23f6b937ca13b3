use reqwest::Method;
use serde_json::{Map, Value, json};

use crate::api_paths::ApiPaths;
use crate::client::{ApiRequest, ClearPassClient};
use crate::error::{Error, Result};
use crate::normalize::prepare_payload;
use crate::options::{ListOptions, OperationOptions, PayloadSource, Selector};
use crate::payload::{Payload, load_payload_file};
use crate::resources::{Action, ResourceSpec};

/// The authenticated generic operations, shared by every resource.
pub struct Operations<'a> {
    client: &'a ClearPassClient,
    paths: &'a ApiPaths,
    token: &'a str,
}

impl<'a> Operations<'a> {
    pub fn new(client: &'a ClearPassClient, paths: &'a ApiPaths, token: &'a str) -> Self {
        Self {
            client,
            paths,
            token,
        }
    }

    fn call(&self, req: ApiRequest) -> Result<Option<Value>> {
        self.client.request(self.paths, &req.token(self.token))
    }

    pub fn run(&self, spec: &ResourceSpec, options: &OperationOptions) -> Result<Option<Value>> {
        match options {
            OperationOptions::List(opts) => self.list(spec.name, opts),
            OperationOptions::Get(selector) => self.get(spec.name, selector),
            OperationOptions::Add(source) => self.add(spec, source),
            OperationOptions::Update(selector, source) => {
                self.modify(spec, Action::Update, selector, source)
            }
            OperationOptions::Replace(selector, source) => {
                self.modify(spec, Action::Replace, selector, source)
            }
            OperationOptions::Delete(selector) => self.delete(spec.name, selector).map(Some),
        }
    }

    pub fn list(&self, resource: &str, opts: &ListOptions) -> Result<Option<Value>> {
        opts.validate()?;
        self.call(ApiRequest::new(Method::GET, resource).query(opts.query_pairs()))
    }

    pub fn get(&self, resource: &str, selector: &Selector) -> Result<Option<Value>> {
        self.call(ApiRequest::new(Method::GET, resource).suffix(format!("/{}", selector.path_segment())))
    }

    /// One POST per item, in order. Everything is validated before the first call;
    /// a failing call aborts the batch and earlier creations stay on the server.
    pub fn add(&self, spec: &ResourceSpec, source: &PayloadSource) -> Result<Option<Value>> {
        let (items, batch) = match source {
            PayloadSource::Fields(fields) => (vec![fields.clone()], false),
            PayloadSource::File(path) => {
                let payload = load_payload_file(path)?;
                let batch = matches!(payload, Payload::Batch(_));
                (payload.into_items(), batch)
            }
        };
        let prepared = prepare_all(spec, Action::Add, items, batch)?;

        if !batch {
            let item = prepared.into_iter().next().unwrap_or_default();
            return self.call(ApiRequest::new(Method::POST, spec.name).body(Value::Object(item)));
        }

        let total = prepared.len();
        let mut results = Vec::with_capacity(total);
        for (n, item) in prepared.into_iter().enumerate() {
            log::info!("{} add {}/{}", spec.name, n + 1, total);
            let created = self.call(ApiRequest::new(Method::POST, spec.name).body(Value::Object(item)))?;
            results.push(created.unwrap_or(Value::Null));
        }
        Ok(Some(Value::Array(results)))
    }

    fn modify(
        &self,
        spec: &ResourceSpec,
        action: Action,
        selector: &Selector,
        source: &PayloadSource,
    ) -> Result<Option<Value>> {
        let item = match source {
            PayloadSource::Fields(fields) => fields.clone(),
            PayloadSource::File(path) => match load_payload_file(path)? {
                Payload::Single(item) => item,
                Payload::Batch(mut items) if items.len() == 1 => items.remove(0),
                Payload::Batch(items) => {
                    return Err(Error::validation(format!(
                        "{} {action} takes one object, {} has {} rows",
                        spec.name,
                        path.display(),
                        items.len()
                    )));
                }
            },
        };
        if item.is_empty() {
            return Err(Error::validation(format!(
                "{} {action} needs at least one field to send",
                spec.name
            )));
        }
        let item = prepare_payload(spec, action, item)?;
        let method = if action == Action::Update {
            Method::PATCH
        } else {
            Method::PUT
        };
        self.call(
            ApiRequest::new(method, spec.name)
                .suffix(format!("/{}", selector.path_segment()))
                .body(Value::Object(item)),
        )
    }

    /// Returns a confirmation; whatever the server sends back is dropped.
    pub fn delete(&self, resource: &str, selector: &Selector) -> Result<Value> {
        self.call(
            ApiRequest::new(Method::DELETE, resource)
                .suffix(format!("/{}", selector.path_segment())),
        )?;
        Ok(json!({
            "deleted": selector.label(),
            "status": "ok",
        }))
    }
}

fn prepare_all(
    spec: &ResourceSpec,
    action: Action,
    items: Vec<Map<String, Value>>,
    batch: bool,
) -> Result<Vec<Map<String, Value>>> {
    if batch && items.is_empty() {
        return Err(Error::validation(format!(
            "{} {action}: payload file has no rows",
            spec.name
        )));
    }
    items
        .into_iter()
        .enumerate()
        .map(|(n, item)| {
            prepare_payload(spec, action, item).map_err(|err| match err {
                Error::Validation(msg) if batch => Error::Validation(format!("item {}: {msg}", n + 1)),
                other => other,
            })
        })
        .collect()
}
