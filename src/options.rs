//! Typed per-operation options, built from the loose argument bag that the
//! CLI collects. Nothing past this module looks at string-keyed input.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::output::{OutputFormat, WriteMode};
use crate::resources::{Action, ResourceSpec};

pub const DEFAULT_LIMIT: u32 = 25;
pub const MAX_LIMIT: u32 = 1000;

/// Keys that steer the tool and never end up in a payload.
pub const RESERVED_KEYS: &[&str] = &[
    "help",
    "version",
    "verbose",
    "debug",
    "module",
    "service",
    "action",
    "out",
    "format",
    "append",
    "no_header",
    "file",
    "csv_fieldnames",
    "id",
    "offset",
    "limit",
    "sort",
    "filter",
    "calculate_count",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Text(String),
    Flag(bool),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgBag {
    values: BTreeMap<String, ArgValue>,
}

impl ArgBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, key: &str, value: &str) -> Self {
        self.insert(key, ArgValue::Text(value.to_string()));
        self
    }

    pub fn flag(mut self, key: &str, value: bool) -> Self {
        self.insert(key, ArgValue::Flag(value));
        self
    }

    pub fn insert(&mut self, key: &str, value: ArgValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ArgValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn is_set(&self, key: &str) -> bool {
        match self.values.get(key) {
            Some(ArgValue::Flag(v)) => *v,
            Some(ArgValue::Text(v)) => parse_truthy(v),
            None => false,
        }
    }

    fn non_reserved(&self) -> impl Iterator<Item = (&String, &ArgValue)> {
        self.values
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
    }
}

/// `1`, `true` and `yes` (any case) are true; everything else is false.
pub fn parse_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    pub offset: u64,
    pub limit: u32,
    pub sort: String,
    pub filter: Option<String>,
    pub calculate_count: Option<bool>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
            sort: "+id".to_string(),
            filter: None,
            calculate_count: None,
        }
    }
}

impl ListOptions {
    pub fn from_bag(bag: &ArgBag, default_sort: &str) -> Result<Self> {
        let offset = match bag.get_text("offset") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                Error::validation(format!("--offset must be a whole number >= 0, got {raw}"))
            })?,
            None => 0,
        };
        let limit = match bag.get_text("limit") {
            Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
                Error::validation(format!("--limit must be a whole number, got {raw}"))
            })?,
            None => i64::from(DEFAULT_LIMIT),
        };
        let limit = check_limit(limit)?;
        let sort = bag
            .get_text("sort")
            .unwrap_or(default_sort)
            .to_string();
        let filter = bag.get_text("filter").map(str::to_string);
        let calculate_count = bag.get("calculate_count").map(|value| match value {
            ArgValue::Text(raw) => parse_truthy(raw),
            ArgValue::Flag(flag) => *flag,
        });
        Ok(Self {
            offset,
            limit,
            sort,
            filter,
            calculate_count,
        })
    }

    pub fn validate(&self) -> Result<()> {
        check_limit(i64::from(self.limit)).map(|_| ())
    }

    /// Query pairs in wire order; unset optional values are left out entirely.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("offset".to_string(), self.offset.to_string()),
            ("limit".to_string(), self.limit.to_string()),
            ("sort".to_string(), self.sort.clone()),
        ];
        if let Some(count) = self.calculate_count {
            pairs.push(("calculate_count".to_string(), count.to_string()));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("filter".to_string(), filter.clone()));
        }
        pairs
    }
}

fn check_limit(limit: i64) -> Result<u32> {
    if !(1..=i64::from(MAX_LIMIT)).contains(&limit) {
        return Err(Error::validation(format!(
            "--limit must be between 1 and {MAX_LIMIT}, got {limit}"
        )));
    }
    Ok(limit as u32)
}

/// Picks one entity. `id` wins when both are given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Name(String),
}

impl Selector {
    pub fn from_bag(bag: &ArgBag, spec: &ResourceSpec, action: Action) -> Result<Self> {
        let id = bag.get_text("id").map(str::trim).filter(|v| !v.is_empty());
        let name = bag.get_text("name").filter(|v| !v.is_empty());
        if let Some(id) = id {
            if name.is_some() {
                log::warn!("both --id and --name given; using --id={id}");
            }
            if spec.numeric_id && !id.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::validation(format!("--id must be numeric, got {id}")));
            }
            return Ok(Self::Id(id.to_string()));
        }
        if let Some(name) = name {
            return Ok(Self::Name(name.to_string()));
        }
        Err(Error::validation(format!(
            "{} {action} requires --id=<id> or --name=<name>",
            spec.name
        )))
    }

    /// Path segment after the collection path: `123` or `name/foo`, passed on unencoded.
    pub fn path_segment(&self) -> String {
        match self {
            Self::Id(id) => id.clone(),
            Self::Name(name) => format!("name/{name}"),
        }
    }

    /// What a delete confirmation reports; numeric ids stay numbers.
    pub fn label(&self) -> Value {
        match self {
            Self::Id(id) => id
                .parse::<u64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(id.clone())),
            Self::Name(name) => Value::String(name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadSource {
    File(PathBuf),
    Fields(Map<String, Value>),
}

impl PayloadSource {
    /// `--file` wins; otherwise every non-reserved key becomes a payload field.
    /// `name` stays in the payload unless it is what selects the entity.
    pub fn from_bag(bag: &ArgBag, selector: Option<&Selector>) -> Self {
        if let Some(file) = bag.get_text("file") {
            return Self::File(PathBuf::from(file));
        }
        let selects_by_name = matches!(selector, Some(Selector::Name(_)));
        let mut fields = Map::new();
        for (key, value) in bag.non_reserved() {
            if selects_by_name && key == "name" {
                continue;
            }
            let value = match value {
                ArgValue::Text(v) => Value::String(v.clone()),
                ArgValue::Flag(v) => Value::Bool(*v),
            };
            fields.insert(key.clone(), value);
        }
        Self::Fields(fields)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationOptions {
    List(ListOptions),
    Get(Selector),
    Add(PayloadSource),
    Update(Selector, PayloadSource),
    Replace(Selector, PayloadSource),
    Delete(Selector),
}

impl OperationOptions {
    pub fn from_bag(bag: &ArgBag, spec: &ResourceSpec, action: Action) -> Result<Self> {
        Ok(match action {
            Action::List => Self::List(ListOptions::from_bag(bag, spec.default_sort)?),
            Action::Get => Self::Get(Selector::from_bag(bag, spec, action)?),
            Action::Add => Self::Add(PayloadSource::from_bag(bag, None)),
            Action::Update => {
                let selector = Selector::from_bag(bag, spec, action)?;
                let source = PayloadSource::from_bag(bag, Some(&selector));
                Self::Update(selector, source)
            }
            Action::Replace => {
                let selector = Selector::from_bag(bag, spec, action)?;
                let source = PayloadSource::from_bag(bag, Some(&selector));
                Self::Replace(selector, source)
            }
            Action::Delete => Self::Delete(Selector::from_bag(bag, spec, action)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutputOptions {
    pub out: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub csv_fieldnames: Option<Vec<String>>,
    pub csv_include_header: bool,
    pub mode: WriteMode,
    pub also_console: bool,
}

impl OutputOptions {
    pub fn from_bag(bag: &ArgBag) -> Result<Self> {
        let format = bag.get_text("format").map(OutputFormat::parse).transpose()?;
        let csv_fieldnames = bag.get_text("csv_fieldnames").map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });
        Ok(Self {
            out: bag.get_text("out").map(PathBuf::from),
            format,
            csv_fieldnames: csv_fieldnames.filter(|names| !names.is_empty()),
            csv_include_header: !bag.is_set("no_header"),
            mode: if bag.is_set("append") {
                WriteMode::Append
            } else {
                WriteMode::Write
            },
            also_console: bag.is_set("verbose"),
        })
    }
}
