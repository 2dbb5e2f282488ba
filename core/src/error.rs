use std::path::PathBuf;

use serde::Deserialize;

/// Failures while loading credentials or signing a token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// One or more required configuration values are absent or empty.
    #[error("Missing required environment variables: {}", .missing.join(", "))]
    MissingConfig { missing: Vec<&'static str> },
    /// The private key file could not be read.
    #[error("Failed to read private key file {}: {source}", .path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The key file does not contain a usable EC private key.
    #[error("Private key is not a valid PEM-encoded EC key: {source}")]
    KeyFormat {
        #[source]
        source: jsonwebtoken::errors::Error,
    },
    /// The loaded key could not produce a signature.
    #[error("Failed to sign token: {source}")]
    Signing {
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

/// Failures surfaced by the request client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The remote service answered with a non-success status.
    #[error("App Store Connect API error:\n{detail}")]
    Api {
        status: u16,
        /// Structured entries when the body was an Error Envelope.
        errors: Vec<ErrorEntry>,
        detail: String,
    },
    #[error("Invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Request to App Store Connect failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// A success response carried a body that is not a JSON:API document.
    #[error("Failed to decode App Store Connect response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// Builds the `Api` variant from a failed response's status and body.
    pub fn from_failed_response(status: reqwest::StatusCode, body: &str) -> Self {
        let errors = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.errors)
            .unwrap_or_default();
        let detail = if !errors.is_empty() {
            errors
                .iter()
                .map(ErrorEntry::summary)
                .collect::<Vec<_>>()
                .join("\n")
        } else if !body.is_empty() {
            body.to_string()
        } else {
            format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )
        };
        ClientError::Api {
            status: status.as_u16(),
            errors,
            detail,
        }
    }

    /// HTTP status of an `Api` failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure body returned by App Store Connect.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorEntry {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

impl ErrorEntry {
    /// `"<status> <code>: <title> - <detail>"`
    pub fn summary(&self) -> String {
        format!(
            "{} {}: {} - {}",
            self.status, self.code, self.title, self.detail
        )
    }
}
