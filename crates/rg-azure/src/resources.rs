//! Generic resources – addressed by provider namespace and type instead of a
//! typed client.

use log::debug;

use crate::client::AzureClient;
use crate::types::{AzureResult, GenericResource, GenericResourceParams};

/// Full address of a resource inside a resource group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub resource_group: String,
    pub provider_namespace: String,
    /// Path of the parent resource for nested types; empty for top-level.
    pub parent_resource_path: String,
    pub resource_type: String,
    pub resource_name: String,
}

impl ResourceId {
    /// `/providers/{namespace}[/{parent}]/{type}/{name}`
    pub fn url_suffix(&self) -> String {
        let parent = self.parent_resource_path.trim_matches('/');
        if parent.is_empty() {
            format!(
                "/providers/{}/{}/{}",
                self.provider_namespace, self.resource_type, self.resource_name
            )
        } else {
            format!(
                "/providers/{}/{}/{}/{}",
                self.provider_namespace, parent, self.resource_type, self.resource_name
            )
        }
    }
}

fn resource_url(client: &AzureClient, id: &ResourceId, api_version: &str) -> AzureResult<String> {
    client.resource_group_url(
        &id.resource_group,
        &format!("{}?api-version={}", id.url_suffix(), api_version),
    )
}

/// Create or update a resource, waiting for the operation to finish.
pub async fn create_or_update_resource(
    client: &AzureClient,
    id: &ResourceId,
    api_version: &str,
    params: &GenericResourceParams,
) -> AzureResult<GenericResource> {
    let url = resource_url(client, id, api_version)?;
    debug!("create_or_update_resource({}) → {}", id.resource_name, url);
    client.put_lro(&url, params).await
}

pub async fn get_resource(
    client: &AzureClient,
    id: &ResourceId,
    api_version: &str,
) -> AzureResult<GenericResource> {
    let url = resource_url(client, id, api_version)?;
    debug!("get_resource({}) → {}", id.resource_name, url);
    client.get_json(&url).await
}

/// List resources within a resource group.
pub async fn list_resources_in_group(
    client: &AzureClient,
    resource_group: &str,
) -> AzureResult<Vec<GenericResource>> {
    let api = &client.config().api_version_resources;
    let url = client.resource_group_url(
        resource_group,
        &format!("/resources?api-version={}", api),
    )?;
    debug!("list_resources_in_group({}) → {}", resource_group, url);
    client.get_all_pages(&url).await
}

// ─── Tests ──────────────────────────────────────────────────────────
