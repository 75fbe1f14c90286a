//! Access-token discovery for the Google Sheets store
//!
//! Token minting is delegated to whatever issues credentials in the
//! deployment (gcloud, a CI secret, a metadata server sidecar). This module
//! only locates the bearer token: `GOOGLE_ACCESS_TOKEN` first, then a token
//! file.

use std::fs;
use std::path::Path;

use crate::error::ReconcileError;

pub const TOKEN_ENV_VAR: &str = "GOOGLE_ACCESS_TOKEN";

/// OAuth bearer token; never printed
#[derive(Clone)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccessToken(***)")
    }
}

/// Locate a bearer token from the environment value or a token file
pub fn resolve_token(
    env_token: Option<String>,
    token_file: Option<&Path>,
) -> Result<AccessToken, ReconcileError> {
    if let Some(token) = env_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        return Ok(AccessToken(token));
    }

    if let Some(path) = token_file {
        let content = fs::read_to_string(path).map_err(|e| ReconcileError::Authentication {
            reason: format!("cannot read token file {}: {}", path.display(), e),
        })?;
        let token = content.trim();
        if token.is_empty() {
            return Err(ReconcileError::Authentication {
                reason: format!("token file {} is empty", path.display()),
            });
        }
        return Ok(AccessToken(token.to_string()));
    }

    Err(ReconcileError::Authentication {
        reason: format!(
            "no access token found; set {} or configure store.token_file",
            TOKEN_ENV_VAR
        ),
    })
}
