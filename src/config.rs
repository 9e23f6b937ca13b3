use std::env;
use std::fmt;
use std::path::PathBuf;

use clap::ArgMatches;

use crate::error::{Error, Result};
use crate::options::parse_truthy;

pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_OUT_DIR: &str = "./logs";
pub const DEFAULT_GRANT_TYPE: &str = "client_credentials";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &crate::error::SECRET_MASK)
            .finish()
    }
}

/// Process-wide settings, built once and only read afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: String,
    pub https_prefix: String,
    pub verify_tls: bool,
    pub timeout_secs: u64,
    pub credentials: Credentials,
    pub out_dir: PathBuf,
    pub api_paths: Option<PathBuf>,
}

fn out_dir(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<String>("out_dir")
        .cloned()
        .or_else(|| env::var("CLEARPASS_OUT_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR))
}

pub fn load_config(matches: &ArgMatches) -> Result<Config> {
    let server = flag_or_env(matches, "server", "CLEARPASS_SERVER")
        .ok_or_else(|| Error::validation("ClearPass server missing (--server or CLEARPASS_SERVER)"))?;

    let scheme = flag_or_env(matches, "scheme", "CLEARPASS_SCHEME")
        .unwrap_or_else(|| "https".to_string());
    let https_prefix = match scheme.as_str() {
        "https" => "https://".to_string(),
        "http" => "http://".to_string(),
        other => {
            return Err(Error::validation(format!(
                "invalid scheme {other} (expected: https|http)"
            )));
        }
    };

    let insecure = matches.get_flag("insecure")
        || env::var("CLEARPASS_INSECURE")
            .map(|v| parse_truthy(&v))
            .unwrap_or(false);

    let timeout_secs = match matches.get_one::<u64>("timeout") {
        Some(secs) => *secs,
        None => match env::var("CLEARPASS_TIMEOUT") {
            Ok(raw) => raw.parse().map_err(|_| {
                Error::validation(format!("CLEARPASS_TIMEOUT must be whole seconds, got {raw}"))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        },
    };

    let client_id = flag_or_env(matches, "client_id", "CLEARPASS_CLIENT_ID")
        .ok_or_else(|| Error::validation("client id missing (--client-id or CLEARPASS_CLIENT_ID)"))?;
    let client_secret = flag_or_env(matches, "client_secret", "CLEARPASS_CLIENT_SECRET")
        .ok_or_else(|| {
            Error::validation("client secret missing (--client-secret or CLEARPASS_CLIENT_SECRET)")
        })?;
    let grant_type = flag_or_env(matches, "grant_type", "CLEARPASS_GRANT_TYPE")
        .unwrap_or_else(|| DEFAULT_GRANT_TYPE.to_string());

    let api_paths = flag_or_env(matches, "api_paths", "CLEARPASS_API_PATHS").map(PathBuf::from);

    Ok(Config {
        server,
        https_prefix,
        verify_tls: !insecure,
        timeout_secs,
        credentials: Credentials {
            grant_type,
            client_id,
            client_secret,
        },
        out_dir: out_dir(matches),
        api_paths,
    })
}

fn flag_or_env(matches: &ArgMatches, id: &str, var: &str) -> Option<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .or_else(|| env::var(var).ok())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_the_secret() {
        let creds = Credentials {
            grant_type: DEFAULT_GRANT_TYPE.to_string(),
            client_id: "Client2".to_string(),
            client_secret: "h6jXPUUZh".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("Client2"));
        assert!(rendered.contains("***"));
        assert!(!rendered.contains("h6jXPUUZh"));
    }

    #[test]
    fn flags_populate_the_config() {
        let matches = crate::cli::build_cli().get_matches_from([
            "clearpass",
            "--server",
            "cppm.example:443",
            "--scheme",
            "http",
            "--insecure",
            "--timeout",
            "7",
            "--client-id",
            "Client2",
            "--client-secret",
            "s3cr3t",
            "--out-dir",
            "/tmp/cp-out",
            "identities",
            "endpoint",
            "list",
        ]);
        let config = load_config(&matches).unwrap();
        assert_eq!(config.server, "cppm.example:443");
        assert_eq!(config.https_prefix, "http://");
        assert!(!config.verify_tls);
        assert_eq!(config.timeout_secs, 7);
        assert_eq!(config.credentials.client_id, "Client2");
        assert_eq!(config.credentials.grant_type, DEFAULT_GRANT_TYPE);
        assert_eq!(config.out_dir, PathBuf::from("/tmp/cp-out"));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let matches = crate::cli::build_cli().get_matches_from([
            "clearpass",
            "--server",
            "cppm",
            "--scheme",
            "ftp",
            "--client-id",
            "c",
            "--client-secret",
            "s",
            "identities",
            "endpoint",
            "list",
        ]);
        assert!(matches!(load_config(&matches), Err(Error::Validation(_))));
    }
}
