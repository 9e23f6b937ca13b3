use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::error::{Error, Result};

pub const DEFAULT_ITEMS_PATH: &[&str] = &["_embedded", "items"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
    Raw,
}

impl OutputFormat {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "raw" => Ok(Self::Raw),
            other => Err(Error::validation(format!(
                "invalid format {other} (expected: json|csv|raw)"
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Raw => "txt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Write,
    Append,
}

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub format: OutputFormat,
    pub csv_fieldnames: Option<Vec<String>>,
    pub csv_include_header: bool,
    pub items_path: Vec<String>,
    pub also_console: bool,
    pub mode: WriteMode,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            csv_fieldnames: None,
            csv_include_header: true,
            items_path: DEFAULT_ITEMS_PATH.iter().map(|s| s.to_string()).collect(),
            also_console: false,
            mode: WriteMode::Write,
        }
    }
}

impl WriteOptions {
    pub fn format(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

/// Runs `producer` and writes what it returns; `None` writes nothing.
pub fn write_with<F>(producer: F, path: &Path, opts: &WriteOptions) -> Result<Option<Value>>
where
    F: FnOnce() -> Result<Option<Value>>,
{
    let value = producer()?;
    if let Some(value) = &value {
        write_value(value, path, opts)?;
    }
    Ok(value)
}

pub fn write_value(value: &Value, path: &Path, opts: &WriteOptions) -> Result<()> {
    ensure_parent_dir(path)?;
    match opts.format {
        OutputFormat::Json => write_json(value, path, opts),
        OutputFormat::Raw => write_raw(&raw_text(value), path, opts),
        OutputFormat::Csv => write_csv(value, path, opts),
    }
}

/// UTF-8 when the bytes decode, else their sequence form (`[255, 0]`).
pub fn bytes_to_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => format!("{bytes:?}"),
    }
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::io(format!("create {}", parent.display()), e))?;
    }
    Ok(())
}

fn open(path: &Path, mode: WriteMode) -> Result<File> {
    let mut options = OpenOptions::new();
    match mode {
        WriteMode::Write => options.write(true).create(true).truncate(true),
        WriteMode::Append => options.append(true).create(true),
    };
    options
        .open(path)
        .map_err(|e| Error::io(format!("open {}", path.display()), e))
}

fn write_json(value: &Value, path: &Path, opts: &WriteOptions) -> Result<()> {
    let rendered = match value {
        Value::Object(_) | Value::Array(_) => serde_json::to_string_pretty(value)?,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut file = open(path, opts.mode)?;
    writeln!(file, "{rendered}").map_err(|e| Error::io(format!("write {}", path.display()), e))?;
    if opts.also_console {
        write_stdout_line(&serde_json::to_string_pretty(value)?)?;
    }
    Ok(())
}

fn raw_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_raw(text: &str, path: &Path, opts: &WriteOptions) -> Result<()> {
    let mut file = open(path, opts.mode)?;
    file.write_all(text.as_bytes())
        .map_err(|e| Error::io(format!("write {}", path.display()), e))?;
    if opts.also_console {
        write_stdout_line(text)?;
    }
    Ok(())
}

/// Follows `path` through nested objects (numeric steps index arrays).
pub fn extract_by_path<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut cur = value;
    for step in path {
        cur = match cur {
            Value::Object(map) => map.get(step)?,
            Value::Array(items) => items.get(step.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Envelope items, then a bare list, then a single object, then `{"value": scalar}`.
pub fn csv_rows<'a>(value: &'a Value, items_path: &[String]) -> Cow<'a, [Value]> {
    if value.is_object() && !items_path.is_empty() {
        if let Some(Value::Array(items)) = extract_by_path(value, items_path) {
            return Cow::Borrowed(items.as_slice());
        }
    }
    match value {
        Value::Array(items) => Cow::Borrowed(items.as_slice()),
        Value::Object(_) => Cow::Owned(vec![value.clone()]),
        scalar => {
            let mut row = Map::new();
            row.insert("value".to_string(), scalar.clone());
            Cow::Owned(vec![Value::Object(row)])
        }
    }
}

fn csv_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn write_csv(value: &Value, path: &Path, opts: &WriteOptions) -> Result<()> {
    let rows = csv_rows(value, &opts.items_path);
    if rows.is_empty() {
        return Ok(());
    }

    let header: Vec<String> = match (&opts.csv_fieldnames, &rows[0]) {
        (Some(names), _) => names.clone(),
        (None, Value::Object(first)) => first.keys().cloned().collect(),
        (None, _) => vec!["value".to_string()],
    };

    let file = open(path, opts.mode)?;
    let write_header = opts.csv_include_header
        && match opts.mode {
            WriteMode::Write => true,
            WriteMode::Append => {
                file.metadata()
                    .map_err(|e| Error::io(format!("stat {}", path.display()), e))?
                    .len()
                    == 0
            }
        };

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);
    if write_header {
        writer.write_record(&header)?;
    }
    for row in rows.iter() {
        let record: Vec<String> = match row {
            Value::Object(map) => header.iter().map(|key| csv_cell(map.get(key))).collect(),
            scalar => vec![csv_cell(Some(scalar))],
        };
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .map_err(|e| Error::io(format!("write {}", path.display()), e))?;

    if opts.also_console {
        write_stdout_line(&format!("Wrote CSV to {}", path.display()))?;
    }
    Ok(())
}

pub fn write_stdout_line(value: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if let Err(err) = out.write_all(value.as_bytes()) {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        return Err(Error::io("write stdout", err));
    }
    if let Err(err) = out.write_all(b"\n") {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        return Err(Error::io("write stdout", err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn csv_opts(mode: WriteMode) -> WriteOptions {
        WriteOptions {
            mode,
            ..WriteOptions::format(OutputFormat::Csv)
        }
    }

    #[test]
    fn json_round_trip_keeps_order_and_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/out.json");
        let value: Value =
            serde_json::from_str(r#"{"zeta": 1, "alpha": {"ö": "Göteborg", "b": [1, 2]}, "mid": null}"#)
                .unwrap();

        write_value(&value, &path, &WriteOptions::default()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("Göteborg"));
        assert!(text.starts_with("{\n  \"zeta\": 1,"));
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
        let keys: Vec<&String> = back.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn json_overwrites_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_value(&json!({"a": 1}), &path, &WriteOptions::default()).unwrap();
        write_value(&json!({"b": 2}), &path, &WriteOptions::default()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\n  \"b\": 2\n}\n");
    }

    #[test]
    fn raw_writes_text_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let opts = WriteOptions::format(OutputFormat::Raw);
        write_value(&Value::String("plain\nbody".to_string()), &path, &opts).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "plain\nbody");
    }

    #[test]
    fn bytes_decode_or_fall_back_to_their_sequence() {
        assert_eq!(bytes_to_text(b"hello"), "hello");
        assert_eq!(bytes_to_text("Göteborg".as_bytes()), "Göteborg");
        assert_eq!(bytes_to_text(&[0xff, 0x00]), "[255, 0]");
    }

    #[test]
    fn csv_extracts_envelope_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let value = json!({"_embedded": {"items": [
            {"id": 1, "name": "a"},
            {"id": 2, "name": "b", "extra": true},
        ]}});

        write_value(&value, &path, &csv_opts(WriteMode::Write)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id,name\n1,a\n2,b\n");
    }

    #[test]
    fn csv_row_precedence() {
        let items_path: Vec<String> = DEFAULT_ITEMS_PATH.iter().map(|s| s.to_string()).collect();
        assert_eq!(csv_rows(&json!([{"a": 1}]), &items_path).len(), 1);
        assert_eq!(
            csv_rows(&json!({"id": 5}), &items_path).into_owned(),
            vec![json!({"id": 5})]
        );
        assert_eq!(
            csv_rows(&json!({"_embedded": {"items": "nope"}}), &items_path).into_owned(),
            vec![json!({"_embedded": {"items": "nope"}})]
        );
        assert_eq!(
            csv_rows(&json!("ok"), &items_path).into_owned(),
            vec![json!({"value": "ok"})]
        );
    }

    #[test]
    fn csv_with_explicit_fieldnames_fills_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let opts = WriteOptions {
            csv_fieldnames: Some(vec!["name".to_string(), "ip_address".to_string()]),
            ..csv_opts(WriteMode::Write)
        };
        write_value(
            &json!([{"id": 1, "name": "nad1", "ip_address": "10.0.0.1"}, {"name": "nad2", "tags": ["x"]}]),
            &path,
            &opts,
        )
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "name,ip_address\nnad1,10.0.0.1\nnad2,\n"
        );
    }

    #[test]
    fn csv_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = json!([{"id": 1}, {"id": 2}]);
        write_value(&rows, &path, &csv_opts(WriteMode::Append)).unwrap();
        write_value(&rows, &path, &csv_opts(WriteMode::Append)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["id", "1", "2", "1", "2"]);
    }

    #[test]
    fn csv_overwrite_always_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_value(&json!([{"id": 1}]), &path, &csv_opts(WriteMode::Write)).unwrap();
        write_value(&json!([{"id": 2}]), &path, &csv_opts(WriteMode::Write)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "id\n2\n");

        let headless = WriteOptions {
            csv_include_header: false,
            ..csv_opts(WriteMode::Write)
        };
        write_value(&json!([{"id": 3}]), &path, &headless).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "3\n");
    }

    #[test]
    fn csv_with_no_rows_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_value(
            &json!({"_embedded": {"items": []}}),
            &path,
            &csv_opts(WriteMode::Write),
        )
        .unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn producer_result_is_written_and_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let out = write_with(|| Ok(Some(json!({"sum": 5}))), &path, &WriteOptions::default())
            .unwrap();
        assert_eq!(out, Some(json!({"sum": 5})));
        assert!(path.exists());

        let skipped = dir.path().join("none.json");
        assert_eq!(
            write_with(|| Ok(None), &skipped, &WriteOptions::default()).unwrap(),
            None
        );
        assert!(!skipped.exists());
    }

    #[test]
    fn extract_by_path_misses_return_none() {
        let value = json!({"a": {"b": 1}, "list": [1, 2]});
        let path = |steps: &[&str]| steps.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(extract_by_path(&value, &path(&["a", "c"])), None);
        assert_eq!(extract_by_path(&value, &path(&["list", "5"])), None);
        assert_eq!(extract_by_path(&value, &path(&["list", "1"])), Some(&json!(2)));
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(matches!(OutputFormat::parse("xml"), Err(Error::Validation(_))));
    }
}
