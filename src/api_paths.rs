use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Resource key -> URL path fragment appended to the server address.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct ApiPaths {
    paths: BTreeMap<String, String>,
}

impl ApiPaths {
    pub fn new(paths: BTreeMap<String, String>) -> Self {
        Self { paths }
    }

    pub fn get(&self, key: &str) -> Result<&str> {
        self.paths
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownPathKey(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.paths.contains_key(key)
    }
}

pub fn load_builtin_paths() -> ApiPaths {
    let raw = include_str!("../schemas/api_paths.json");
    ApiPaths::new(serde_json::from_str(raw).expect("invalid api_paths.json"))
}

/// Swaps in a different path layout without rebuilding (vendor versions differ).
pub fn load_paths_file(path: &Path) -> Result<ApiPaths> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("read {}", path.display()), e))?;
    let paths: ApiPaths = serde_json::from_str(&raw).map_err(|e| {
        Error::validation(format!(
            "{} must be a JSON object of resource key to path: {e}",
            path.display()
        ))
    })?;
    if !paths.contains("oauth") {
        return Err(Error::validation(format!(
            "{} has no `oauth` entry",
            path.display()
        )));
    }
    Ok(paths)
}

pub fn load_api_paths(override_path: Option<&Path>) -> Result<ApiPaths> {
    match override_path {
        Some(path) => load_paths_file(path),
        None => Ok(load_builtin_paths()),
    }
}
