//! Azure Resource Groups – list, get, create or update, delete, export template.

use log::debug;

use crate::client::AzureClient;
use crate::types::{
    AzureErrorKind, AzureResult, ExportTemplateRequest, ResourceGroup,
    ResourceGroupExportResult, ResourceGroupParams,
};

fn group_url(client: &AzureClient, name: &str, suffix: &str) -> AzureResult<String> {
    let api = &client.config().api_version_resources;
    client.subscription_url(&format!(
        "/resourcegroups/{}{}?api-version={}",
        name, suffix, api
    ))
}

/// List all resource groups in the subscription.
pub async fn list_resource_groups(client: &AzureClient) -> AzureResult<Vec<ResourceGroup>> {
    let api = &client.config().api_version_resources;
    let url = client.subscription_url(&format!(
        "/resourcegroups?api-version={}",
        api
    ))?;
    debug!("list_resource_groups → {}", url);
    client.get_all_pages(&url).await
}

/// Get a single resource group by name.
pub async fn get_resource_group(
    client: &AzureClient,
    name: &str,
) -> AzureResult<ResourceGroup> {
    let url = group_url(client, name, "")?;
    debug!("get_resource_group({}) → {}", name, url);
    client.get_json(&url).await
}

/// Create a resource group, or replace the location/tags of an existing one.
pub async fn create_or_update_resource_group(
    client: &AzureClient,
    name: &str,
    params: &ResourceGroupParams,
) -> AzureResult<ResourceGroup> {
    let url = group_url(client, name, "")?;
    debug!("create_or_update_resource_group({}) → {}", name, url);
    client.put_json(&url, params).await
}

/// Delete a resource group and everything in it, waiting for completion.
pub async fn delete_resource_group(
    client: &AzureClient,
    name: &str,
) -> AzureResult<()> {
    let url = group_url(client, name, "")?;
    debug!("delete_resource_group({}) → {}", name, url);
    client.delete_lro(&url).await
}

/// Export the ARM template for a resource group, waiting for completion.
pub async fn export_template(
    client: &AzureClient,
    name: &str,
    request: &ExportTemplateRequest,
) -> AzureResult<ResourceGroupExportResult> {
    let url = group_url(client, name, "/exportTemplate")?;
    debug!("export_template({}) → {}", name, url);
    client.post_lro(&url, request).await
}

/// Check whether a resource group exists.
pub async fn exists(
    client: &AzureClient,
    name: &str,
) -> AzureResult<bool> {
    match get_resource_group(client, name).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind == AzureErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
