use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::resources::{Action, ResourceSpec};

/// Canonical form is lowercase, colon separated: `aa:bb:cc:dd:ee:ff`.
pub fn normalize_mac(raw: &str) -> Result<String> {
    let hex: Vec<char> = raw
        .chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if hex.len() != 12 {
        return Err(Error::validation(format!(
            "invalid MAC address {raw:?} (expected 12 hex digits)"
        )));
    }
    let octets: Vec<String> = hex.chunks(2).map(|pair| pair.iter().collect()).collect();
    Ok(octets.join(":"))
}

pub fn parse_flag_value(field: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::validation(format!(
            "{field} must be a boolean (true/false/yes/no/1/0), got {raw:?}"
        ))),
    }
}

pub fn split_list(raw: &str) -> Vec<Value> {
    raw.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Value::String(v.to_string()))
        .collect()
}

/// Absent, null, blank, `false`, zero, `[]` and `{}` all count as not given.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Bool(b)) => !b,
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(map)) => map.is_empty(),
    }
}

/// Lists every missing required field in one error. Update is a partial write and skips this.
pub fn check_required(spec: &ResourceSpec, action: Action, payload: &Map<String, Value>) -> Result<()> {
    if action == Action::Update || spec.required.is_empty() {
        return Ok(());
    }
    let missing: Vec<&str> = spec
        .required
        .iter()
        .copied()
        .filter(|field| is_missing(payload.get(*field)))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    let wanted: Vec<String> = spec.required.iter().map(|f| format!("--{f}=...")).collect();
    Err(Error::validation(format!(
        "{} {action} requires: {}. Missing: {}",
        spec.name,
        wanted.join(", "),
        missing.join(", ")
    )))
}

/// Rewrites string values in place; values that already have the right JSON type pass through.
pub fn apply_rules(spec: &ResourceSpec, payload: &mut Map<String, Value>) -> Result<()> {
    let rules = &spec.rules;

    for field in rules.mac {
        if let Some(Value::String(raw)) = payload.get(*field) {
            let mac = normalize_mac(raw)?;
            payload.insert(field.to_string(), Value::String(mac));
        }
    }

    for field in rules.flags {
        if let Some(Value::String(raw)) = payload.get(*field) {
            let flag = parse_flag_value(field, raw)?;
            payload.insert(field.to_string(), Value::Bool(flag));
        }
    }

    for field in rules.lists {
        if let Some(Value::String(raw)) = payload.get(*field) {
            let list = split_list(raw);
            payload.insert(field.to_string(), Value::Array(list));
        }
    }

    for (field, allowed) in rules.choices {
        if let Some(value) = payload.get(*field) {
            let ok = value.as_str().is_some_and(|v| allowed.contains(&v));
            if !ok {
                return Err(Error::validation(format!(
                    "{field} must be one of {}, got {value}",
                    allowed.join(", ")
                )));
            }
        }
    }

    Ok(())
}

/// Required-field check followed by normalisation.
pub fn prepare_payload(
    spec: &ResourceSpec,
    action: Action,
    mut payload: Map<String, Value>,
) -> Result<Map<String, Value>> {
    check_required(spec, action, &payload)?;
    apply_rules(spec, &mut payload)?;
    Ok(payload)
}
