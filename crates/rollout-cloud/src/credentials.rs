//! Long-lived static secrets and the short-lived credentials exchanged for them.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::executor::ExecEnv;
use crate::tool::ToolError;

pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// The stored key pair the pipeline starts from.
///
/// Either half may be absent; absence is reported when the pair is used,
/// so `doctor` can inspect it without failing.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    access_key_id: Option<SecretString>,
    secret_access_key: Option<SecretString>,
}

impl StaticCredentials {
    pub fn new(access_key_id: SecretString, secret_access_key: SecretString) -> Self {
        Self {
            access_key_id: Some(access_key_id),
            secret_access_key: Some(secret_access_key),
        }
    }

    /// Read the pair from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| {
            std::env::var(key)
                // arch-lint: allow(no-silent-result-drop) reason="an unset variable is reported as Missing when the pair is used"
                .ok()
        })
    }

    /// Read the pair through an arbitrary lookup. Blank values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        };
        Self {
            access_key_id: read(ACCESS_KEY_ID_VAR),
            secret_access_key: read(SECRET_ACCESS_KEY_VAR),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }

    /// Child environment carrying the static pair, scoped to `region`.
    pub fn env(&self, region: &str) -> Result<ExecEnv, CredentialError> {
        let key_id = self.access_key_id.clone().ok_or(CredentialError::Missing {
            var: ACCESS_KEY_ID_VAR,
        })?;
        let secret = self
            .secret_access_key
            .clone()
            .ok_or(CredentialError::Missing {
                var: SECRET_ACCESS_KEY_VAR,
            })?;

        Ok(ExecEnv::new()
            .with_var(ACCESS_KEY_ID_VAR, key_id)
            .with_var(SECRET_ACCESS_KEY_VAR, secret)
            .with_plain("AWS_REGION", region)
            .with_plain("AWS_DEFAULT_REGION", region))
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let presence = |v: &Option<SecretString>| if v.is_some() { "[REDACTED]" } else { "<unset>" };
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &presence(&self.access_key_id))
            .field("secret_access_key", &presence(&self.secret_access_key))
            .finish()
    }
}

/// Short-lived credentials valid in exactly one region.
///
/// Lives only in memory for the duration of a run.
#[derive(Clone)]
pub struct CredentialSet {
    access_key_id: SecretString,
    secret_access_key: SecretString,
    session_token: SecretString,
    region: String,
    expiration: Option<String>,
}

impl CredentialSet {
    pub fn new(
        access_key_id: SecretString,
        secret_access_key: SecretString,
        session_token: SecretString,
        region: &str,
    ) -> Self {
        Self {
            access_key_id,
            secret_access_key,
            session_token,
            region: region.to_owned(),
            expiration: None,
        }
    }

    /// Parse the output of `aws sts get-session-token --output json`.
    pub fn from_session_token_json(json: &str, region: &str) -> Result<Self, CredentialError> {
        let response: SessionTokenResponse =
            serde_json::from_str(json).map_err(|e| CredentialError::InvalidResponse { source: e })?;
        let c = response.credentials;

        Ok(Self {
            access_key_id: SecretString::from(c.access_key_id),
            secret_access_key: SecretString::from(c.secret_access_key),
            session_token: SecretString::from(c.session_token),
            region: region.to_owned(),
            expiration: c.expiration,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn expiration(&self) -> Option<&str> {
        self.expiration.as_deref()
    }

    /// Child environment that authenticates `aws` with these credentials.
    pub fn env(&self) -> ExecEnv {
        ExecEnv::new()
            .with_var(ACCESS_KEY_ID_VAR, self.access_key_id.clone())
            .with_var(SECRET_ACCESS_KEY_VAR, self.secret_access_key.clone())
            .with_var(SESSION_TOKEN_VAR, self.session_token.clone())
            .with_plain("AWS_REGION", &self.region)
            .with_plain("AWS_DEFAULT_REGION", &self.region)
    }

    /// Whether the access key id starts with `prefix`; lets tests check
    /// which credentials were issued without exposing them.
    pub fn access_key_id_starts_with(&self, prefix: &str) -> bool {
        self.access_key_id.expose_secret().starts_with(prefix)
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("access_key_id", &"[REDACTED]")
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .field("region", &self.region)
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SessionTokenResponse {
    credentials: SessionCredentials,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SessionCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("{var} is not set — export it or add it to .env")]
    Missing { var: &'static str },

    #[error("exchanging static credentials for a session failed")]
    Exchange { source: ToolError },

    #[error("resolving the registry account failed")]
    Identity { source: ToolError },

    #[error("credential response could not be parsed")]
    InvalidResponse { source: serde_json::Error },
}
