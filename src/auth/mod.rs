//! Bearer credentials for the upstream recognizer
//!
//! Minting temporary keys is left to the deployment; the bridge asks a
//! `CredentialProvider` once per session and never caches the result.

use crate::error::BridgeError;
use async_trait::async_trait;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return a bearer credential valid for at least one session
    async fn credential(&self) -> Result<String, BridgeError>;
}

/// A fixed credential, e.g. a key handed over by the caller
#[derive(Clone)]
pub struct StaticCredential(String);

impl StaticCredential {
    pub fn new(credential: impl Into<String>) -> Self {
        Self(credential.into())
    }
}

impl std::fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticCredential(***)")
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn credential(&self) -> Result<String, BridgeError> {
        Ok(self.0.clone())
    }
}

/// Reads the credential from an environment variable on every session
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredential {
    async fn credential(&self) -> Result<String, BridgeError> {
        match std::env::var(&self.var) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(BridgeError::Handshake(format!(
                "{} environment variable not set",
                self.var
            ))),
        }
    }
}
