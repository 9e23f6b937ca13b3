use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Single(Map<String, Value>),
    Batch(Vec<Map<String, Value>>),
}

impl Payload {
    pub fn into_items(self) -> Vec<Map<String, Value>> {
        match self {
            Self::Single(item) => vec![item],
            Self::Batch(items) => items,
        }
    }
}

/// Reads a `.json` object / list of objects, or a `.csv` with a header row.
pub fn load_payload_file(path: &Path) -> Result<Payload> {
    let ext = path
        .extension()
        .and_then(|v| v.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "json" => load_json(path),
        "csv" => load_csv(path),
        _ => Err(Error::validation(format!(
            "unsupported payload file {} (use .json or .csv)",
            path.display()
        ))),
    }
}

fn load_json(path: &Path) -> Result<Payload> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("read {}", path.display()), e))?;
    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| Error::validation(format!("invalid JSON in {}: {e}", path.display())))?;
    match value {
        Value::Object(item) => Ok(Payload::Single(item)),
        Value::Array(values) if values.iter().all(Value::is_object) => Ok(Payload::Batch(
            values
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(item) => Some(item),
                    _ => None,
                })
                .collect(),
        )),
        _ => Err(Error::validation(format!(
            "{} must contain a JSON object or a list of objects",
            path.display()
        ))),
    }
}

/// Short rows are accepted; their missing trailing columns are left out of the item.
fn load_csv(path: &Path) -> Result<Payload> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let mut items = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut item = Map::new();
        for (key, value) in headers.iter().zip(record.iter()) {
            item.insert(key.to_string(), Value::String(value.to_string()));
        }
        items.push(item);
    }
    Ok(Payload::Batch(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn json_object_is_a_single_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "p.json", r#"{"a": 1}"#);
        let Payload::Single(item) = load_payload_file(&path).unwrap() else {
            panic!("expected single payload");
        };
        assert_eq!(Value::Object(item), json!({"a": 1}));
    }

    #[test]
    fn json_list_of_objects_is_a_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "p.JSON", r#"[{"a": 1}, {"a": 2}]"#);
        let items = load_payload_file(&path).unwrap().into_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["a"], 2);
    }

    #[test]
    fn json_with_other_shapes_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for body in ["[1, 2, 3]", r#"[{"a": 1}, "b"]"#, "\"text\""] {
            let path = write(&dir, "p.json", body);
            let err = load_payload_file(&path).unwrap_err();
            assert!(
                err.to_string().ends_with("must contain a JSON object or a list of objects"),
                "{body}"
            );
        }
    }

    #[test]
    fn csv_rows_keep_values_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "p.csv", "id,name\n1,a\n2,b\n");
        let items = load_payload_file(&path).unwrap().into_items();
        assert_eq!(
            items
                .into_iter()
                .map(Value::Object)
                .collect::<Vec<_>>(),
            vec![json!({"id": "1", "name": "a"}), json!({"id": "2", "name": "b"})]
        );
    }

    #[test]
    fn csv_short_rows_keep_the_columns_they_have() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "nads.csv",
            "name,ip_address,description\nnad1,10.0.0.1\nnad2,10.0.0.2,core\n",
        );
        let items: Vec<Value> = load_payload_file(&path)
            .unwrap()
            .into_items()
            .into_iter()
            .map(Value::Object)
            .collect();
        assert_eq!(
            items,
            vec![
                json!({"name": "nad1", "ip_address": "10.0.0.1"}),
                json!({"name": "nad2", "ip_address": "10.0.0.2", "description": "core"}),
            ]
        );
    }

    #[test]
    fn other_extensions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "p.yaml", "a: 1");
        let err = load_payload_file(&path).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains(".json or .csv"));
    }
}
