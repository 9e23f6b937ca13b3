use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use std::time::Duration;

use crate::api_paths::ApiPaths;
use crate::config::{Config, Credentials};
use crate::error::{Error, HttpError, Result};
use crate::output::bytes_to_text;

/// One call against the API, built by the operation layer and consumed once.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub resource: String,
    pub token: Option<String>,
    pub path_suffix: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, resource: &str) -> Self {
        Self {
            method,
            resource: resource.to_string(),
            token: None,
            path_suffix: String::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.path_suffix = suffix.into();
        self
    }

    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

pub struct ClearPassClient {
    client: Client,
    pub server: String,
    pub https_prefix: String,
}

impl ClearPassClient {
    pub fn new(
        server: &str,
        https_prefix: &str,
        verify_tls: bool,
        timeout_secs: u64,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .user_agent(concat!("clearpass-cli/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .danger_accept_invalid_certs(!verify_tls)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            server: server.to_string(),
            https_prefix: https_prefix.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.server,
            &config.https_prefix,
            config.verify_tls,
            config.timeout_secs,
        )
    }

    pub fn build_url(&self, paths: &ApiPaths, resource: &str, suffix: &str) -> Result<String> {
        let path = paths.get(resource)?;
        Ok(format!("{}{}{}{}", self.https_prefix, self.server, path, suffix))
    }

    /// Returns `None` for 204/empty bodies and the raw text when the body is not JSON.
    pub fn request(&self, paths: &ApiPaths, req: &ApiRequest) -> Result<Option<Value>> {
        let url = self.build_url(paths, &req.resource, &req.path_suffix)?;
        let method = req.method.clone();

        let mut builder = self.client.request(method.clone(), &url);
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        if let Some(token) = &req.token {
            builder = builder.bearer_auth(token);
        }

        log::debug!("request {} {}", method, url);
        let resp = builder.send()?;
        let status = resp.status();
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = resp.bytes()?;
        log::debug!("response {} {} ({} bytes)", status.as_u16(), final_url, bytes.len());

        if !status.is_success() {
            return Err(HttpError::new(
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                &final_url,
                method.as_str(),
                &content_type,
                String::from_utf8_lossy(&bytes).into_owned(),
                req.body.as_ref(),
            )
            .into());
        }

        if status == reqwest::StatusCode::NO_CONTENT || bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(bytes_to_text(&bytes))),
        ))
    }

    /// Client-credentials grant against the `oauth` path key.
    pub fn login(&self, paths: &ApiPaths, credentials: &Credentials) -> Result<Value> {
        let payload = json!({
            "grant_type": credentials.grant_type,
            "client_id": credentials.client_id,
            "client_secret": credentials.client_secret,
        });
        let req = ApiRequest::new(Method::POST, "oauth").body(payload);
        self.request(paths, &req)?.ok_or(Error::MissingToken)
    }

    pub fn access_token(&self, paths: &ApiPaths, credentials: &Credentials) -> Result<String> {
        let resp = self.login(paths, credentials)?;
        resp.get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(Error::MissingToken)
    }
}
