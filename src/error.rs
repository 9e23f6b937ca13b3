use serde_json::Value;
use thiserror::Error;

/// Request body keys whose values never leave the process unmasked.
pub const SECRET_KEYS: &[&str] = &[
    "client_secret",
    "radius_secret",
    "tacacs_secret",
    "password",
    "enable_password",
];

pub const SECRET_MASK: &str = "***";

const MAX_DIAGNOSTIC_BODY: usize = 4000;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("unknown API path key `{0}`")]
    UnknownPathKey(String),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("token response did not contain an access_token")]
    MissingToken,
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// 1 for bad local input, 2 for anything the remote side (or the wire) rejected.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Http(_) | Self::Transport(_) | Self::MissingToken => 2,
            Self::Validation(_)
            | Self::UnknownPathKey(_)
            | Self::Io { .. }
            | Self::Csv(_)
            | Self::Json(_) => 1,
        }
    }
}

/// A non-2xx response, with a diagnostic that is safe to print.
#[derive(Debug, Error)]
#[error("{diagnostic}")]
pub struct HttpError {
    pub status: u16,
    pub reason: String,
    pub url: String,
    pub method: String,
    pub content_type: String,
    pub body: String,
    pub diagnostic: String,
}

impl HttpError {
    pub fn new(
        status: u16,
        reason: &str,
        url: &str,
        method: &str,
        content_type: &str,
        body: String,
        request_json: Option<&Value>,
    ) -> Self {
        let mut diagnostic = format!(
            "HTTP {status} {reason}\nURL: {url}\nMethod: {method}\nContent-Type: {content_type}\nResponse body:\n{}",
            truncate_body(&body)
        );
        if let Some(request_json) = request_json {
            let masked = mask_secrets(request_json);
            let rendered =
                serde_json::to_string_pretty(&masked).unwrap_or_else(|_| masked.to_string());
            diagnostic.push_str("\n\nRequest JSON:\n");
            diagnostic.push_str(&rendered);
        }
        Self {
            status,
            reason: reason.to_string(),
            url: url.to_string(),
            method: method.to_string(),
            content_type: content_type.to_string(),
            body,
            diagnostic,
        }
    }
}

/// Shallow copy of `value` with every top-level secret key replaced by the mask.
pub fn mask_secrets(value: &Value) -> Value {
    let mut masked = value.clone();
    if let Value::Object(map) = &mut masked {
        for key in SECRET_KEYS {
            if let Some(slot) = map.get_mut(*key) {
                *slot = Value::String(SECRET_MASK.to_string());
            }
        }
    }
    masked
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_DIAGNOSTIC_BODY) {
        Some((cut, _)) => format!("{}\n... (truncated)", &body[..cut]),
        None => body.to_string(),
    }
}
