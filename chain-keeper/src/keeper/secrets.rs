//! Round secrets and the stores that hold them

use std::fmt::{self, Debug};

use alloy::primitives::Bytes;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_secretsmanager::{error::DisplayErrorContext, Client as SecretsManagerClient};
use tracing::{debug, info};

use crate::keeper::error::SecretsError;

// ----------
// | Handle |
// ----------

/// The secret required to finalize a round
///
/// The handle is consumed when the secret is submitted
pub struct SecretHandle {
    /// The round the secret belongs to
    round_id: u64,
    /// The secret value
    value: Vec<u8>,
}

impl SecretHandle {
    /// Create a new secret handle
    pub fn new(round_id: u64, value: impl Into<Vec<u8>>) -> Self {
        Self { round_id, value: value.into() }
    }

    /// The round the secret belongs to
    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    /// Consume the handle, yielding the secret's bytes for submission
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.value)
    }
}

impl Debug for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHandle")
            .field("round_id", &self.round_id)
            .field("value", &"<redacted>")
            .finish()
    }
}

// ------------
// | Provider |
// ------------

/// A store of per-round secrets
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Get the secret for a round, `None` if it has not been published
    async fn get_secret(&self, round_id: u64) -> Result<Option<SecretHandle>, SecretsError>;
    /// Erase a round's secret once it has been consumed
    async fn erase(&self, round_id: u64) -> Result<(), SecretsError>;
}

/// A secret provider backed by AWS Secrets Manager
///
/// The secret for round `n` is stored as a plain string under
/// `{prefix}-round-{n}`
#[derive(Clone)]
pub struct AwsSecretProvider {
    /// The secrets manager client
    client: SecretsManagerClient,
    /// The prefix of the secret names
    prefix: String,
}

impl AwsSecretProvider {
    /// Create a new provider
    pub fn new(config: &SdkConfig, prefix: String) -> Self {
        Self { client: SecretsManagerClient::new(config), prefix }
    }

    /// The name of the secret for a round
    pub fn secret_name(&self, round_id: u64) -> String {
        secret_name(&self.prefix, round_id)
    }
}

#[async_trait]
impl SecretProvider for AwsSecretProvider {
    async fn get_secret(&self, round_id: u64) -> Result<Option<SecretHandle>, SecretsError> {
        let name = self.secret_name(round_id);
        let response = match self.client.get_secret_value().secret_id(&name).send().await {
            Ok(response) => response,
            Err(e)
                if e.as_service_error().is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                debug!(round_id, "secret {name} not found");
                return Ok(None);
            },
            Err(e) => return Err(SecretsError::retrieval(DisplayErrorContext(&e))),
        };

        match response.secret_string() {
            Some(secret) if !secret.is_empty() => {
                Ok(Some(SecretHandle::new(round_id, secret.as_bytes())))
            },
            _ => {
                debug!(round_id, "secret {name} is empty");
                Ok(None)
            },
        }
    }

    async fn erase(&self, round_id: u64) -> Result<(), SecretsError> {
        let name = self.secret_name(round_id);
        let result = self
            .client
            .delete_secret()
            .secret_id(&name)
            .force_delete_without_recovery(true)
            .send()
            .await;

        match result {
            Ok(_) => {
                info!(round_id, "erased secret {name}");
                Ok(())
            },
            Err(e)
                if e.as_service_error().is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(())
            },
            Err(e) => Err(SecretsError::erase(DisplayErrorContext(&e))),
        }
    }
}

/// The name of a round's secret under the given prefix
fn secret_name(prefix: &str, round_id: u64) -> String {
    format!("{prefix}-round-{round_id}")
}
