use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub const KEY_ID_ENV: &str = "APP_STORE_CONNECT_KEY_ID";
pub const ISSUER_ID_ENV: &str = "APP_STORE_CONNECT_ISSUER_ID";
pub const P8_PATH_ENV: &str = "APP_STORE_CONNECT_P8_PATH";

/// Audience App Store Connect expects in every token.
pub const TOKEN_AUDIENCE: &str = "appstoreconnect-v1";
/// Apple rejects tokens that live longer than 20 minutes.
pub const TOKEN_LIFETIME_SECS: i64 = 20 * 60;

/// Raw configuration the credential bundle is loaded from, normally the
/// three `APP_STORE_CONNECT_*` variables.
///
/// Empty strings count as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSettings {
    pub key_id: Option<String>,
    pub issuer_id: Option<String>,
    pub private_key_path: Option<String>,
}

impl AuthSettings {
    fn require(&self) -> Result<(&str, &str, &str), AuthError> {
        let key_id = non_empty(&self.key_id);
        let issuer_id = non_empty(&self.issuer_id);
        let path = non_empty(&self.private_key_path);

        match (key_id, issuer_id, path) {
            (Some(key_id), Some(issuer_id), Some(path)) => Ok((key_id, issuer_id, path)),
            _ => {
                let missing = [
                    (KEY_ID_ENV, key_id.is_none()),
                    (ISSUER_ID_ENV, issuer_id.is_none()),
                    (P8_PATH_ENV, path.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                Err(AuthError::MissingConfig { missing })
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Expands a leading `~` to the current user's home directory.
pub fn expand_home(raw: &str) -> PathBuf {
    match (raw.strip_prefix('~'), dirs::home_dir()) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with('/') => home.join(&rest[1..]),
        _ => PathBuf::from(raw),
    }
}

/// JWT payload accepted by App Store Connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

/// The loaded key id, issuer id and parsed signing key.
#[derive(Clone)]
pub struct Credentials {
    key_id: String,
    issuer_id: String,
    signing_key: EncodingKey,
}

impl Credentials {
    /// Reads the `.p8` key referenced by `settings` and parses it.
    pub fn load(settings: &AuthSettings) -> Result<Self, AuthError> {
        let (key_id, issuer_id, raw_path) = settings.require()?;
        let path = expand_home(raw_path);
        let pem = std::fs::read(&path).map_err(|source| AuthError::FileAccess {
            path: path.clone(),
            source,
        })?;
        Self::from_pem(key_id, issuer_id, &pem)
    }

    pub fn from_pem(
        key_id: impl Into<String>,
        issuer_id: impl Into<String>,
        pem: &[u8],
    ) -> Result<Self, AuthError> {
        let signing_key =
            EncodingKey::from_ec_pem(pem).map_err(|source| AuthError::KeyFormat { source })?;
        Ok(Self {
            key_id: key_id.into(),
            issuer_id: issuer_id.into(),
            signing_key,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }

    /// Signs an ES256 token valid from `issued_at` for [`TOKEN_LIFETIME_SECS`].
    pub fn sign(&self, issued_at: i64) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        header.typ = Some("JWT".to_string());

        let claims = Claims {
            iss: self.issuer_id.clone(),
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
            aud: TOKEN_AUDIENCE.to_string(),
        };

        jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|source| AuthError::Signing { source })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &self.key_id)
            .field("issuer_id", &self.issuer_id)
            .field("signing_key", &"<redacted>")
            .finish()
    }
}

/// Mints a fresh token per request from a lazily loaded, cached credential
/// bundle.
///
/// The bundle is loaded on first use and kept until [`TokenIssuer::reset`];
/// the mutex makes a concurrent first use load it exactly once. Tokens
/// themselves are never cached.
pub struct TokenIssuer {
    settings: AuthSettings,
    credentials: Mutex<Option<Arc<Credentials>>>,
}

impl TokenIssuer {
    pub fn new(settings: AuthSettings) -> Self {
        Self {
            settings,
            credentials: Mutex::new(None),
        }
    }

    /// An issuer whose bundle is already loaded.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            settings: AuthSettings::default(),
            credentials: Mutex::new(Some(Arc::new(credentials))),
        }
    }

    pub fn load_credentials(&self) -> Result<Arc<Credentials>, AuthError> {
        let mut slot = self
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(credentials) = slot.as_ref() {
            return Ok(Arc::clone(credentials));
        }

        let loaded = Arc::new(Credentials::load(&self.settings)?);
        tracing::info!(
            key_id = %loaded.key_id(),
            issuer_id = %loaded.issuer_id(),
            "loaded App Store Connect credentials"
        );
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn issue_token(&self) -> Result<String, AuthError> {
        let credentials = self.load_credentials()?;
        credentials.sign(Utc::now().timestamp())
    }

    /// Drops the cached bundle so the next use loads it again.
    pub fn reset(&self) {
        *self
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
