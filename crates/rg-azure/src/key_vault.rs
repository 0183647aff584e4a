//! Key Vault creation through the generic resource API.

use serde::{Deserialize, Serialize};

use crate::resources::ResourceId;
use crate::types::{AzureError, AzureErrorKind, AzureResult, GenericResourceParams};

pub const PROVIDER_NAMESPACE: &str = "Microsoft.KeyVault";
pub const RESOURCE_TYPE: &str = "vaults";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultSku {
    pub family: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyVaultProperties {
    pub sku: VaultSku,
    pub tenant_id: String,
    pub access_policies: Vec<serde_json::Value>,
    pub enabled_for_deployment: bool,
    pub enabled_for_template_deployment: bool,
    pub enabled_for_disk_encryption: bool,
}

/// Create parameters for a standard-tier vault.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyVaultParams {
    pub location: String,
    pub properties: KeyVaultProperties,
}

impl KeyVaultParams {
    /// Standard SKU, no access policies, enabled for VM deployment,
    /// template deployment and disk encryption.
    pub fn standard(location: &str, tenant_id: &str) -> Self {
        Self {
            location: location.to_string(),
            properties: KeyVaultProperties {
                sku: VaultSku {
                    family: "A".into(),
                    name: "standard".into(),
                },
                tenant_id: tenant_id.to_string(),
                access_policies: Vec::new(),
                enabled_for_deployment: true,
                enabled_for_template_deployment: true,
                enabled_for_disk_encryption: true,
            },
        }
    }

    pub fn to_resource_params(&self) -> AzureResult<GenericResourceParams> {
        let properties = serde_json::to_value(&self.properties).map_err(|e| {
            AzureError::new(AzureErrorKind::Parse, format!("Key vault properties: {e}"))
        })?;
        Ok(GenericResourceParams {
            location: self.location.clone(),
            tags: Default::default(),
            properties,
        })
    }
}

/// Address of vault `name` in `resource_group`.
pub fn vault_resource_id(resource_group: &str, name: &str) -> ResourceId {
    ResourceId {
        resource_group: resource_group.to_string(),
        provider_namespace: PROVIDER_NAMESPACE.into(),
        parent_resource_path: String::new(),
        resource_type: RESOURCE_TYPE.into(),
        resource_name: name.to_string(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
