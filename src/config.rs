//! Environment-variable configuration.

use rg_azure::types::{AzureCredentials, AzureError, AzureResult};

pub const TENANT_ID_VAR: &str = "AZURE_TENANT_ID";
pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";
pub const SUBSCRIPTION_ID_VAR: &str = "AZURE_SUBSCRIPTION_ID";
pub const LOCATION_VAR: &str = "AZURE_RESOURCE_LOCATION";
pub const ARM_ENDPOINT_VAR: &str = "ARM_ENDPOINT";

/// Everything the walkthrough needs to reach the cloud.
#[derive(Clone, PartialEq, Eq)]
pub struct SampleConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
    /// Region for the group and the vault, e.g. `eastus` or `local`.
    pub location: String,
    /// Resource manager endpoint, e.g. `https://management.local.azurestack.external`.
    pub arm_endpoint: String,
}

impl std::fmt::Debug for SampleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .field("location", &self.location)
            .field("arm_endpoint", &self.arm_endpoint)
            .finish()
    }
}

impl SampleConfig {
    pub fn from_env() -> AzureResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read every variable through `lookup`. The first missing or empty one
    /// is reported by name.
    pub fn from_lookup<F>(lookup: F) -> AzureResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AzureError::missing_env(key))
        };

        Ok(Self {
            tenant_id: require(TENANT_ID_VAR)?,
            client_id: require(CLIENT_ID_VAR)?,
            client_secret: require(CLIENT_SECRET_VAR)?,
            subscription_id: require(SUBSCRIPTION_ID_VAR)?,
            location: require(LOCATION_VAR)?,
            arm_endpoint: require(ARM_ENDPOINT_VAR)?,
        })
    }

    pub fn credentials(&self) -> AzureCredentials {
        AzureCredentials {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            tenant_id: self.tenant_id.clone(),
            subscription_id: self.subscription_id.clone(),
        }
    }
}
