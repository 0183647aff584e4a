//! Service façade for the resource-management operations.
//!
//! Owns the HTTP client, the service-principal credentials and the cloud's
//! endpoints. The client re-acquires the bearer token before any request
//! made within a few minutes of its expiry, including operation polls.

use log::info;

use crate::client::AzureClient;
use crate::cloud;
use crate::resource_groups;
use crate::resources::{self, ResourceId};
use crate::types::*;

pub struct AzureService {
    client: AzureClient,
    credentials: AzureCredentials,
    endpoints: CloudEndpoints,
}

impl AzureService {
    /// Discover the cloud behind `arm_endpoint`, then authenticate.
    pub async fn connect(creds: AzureCredentials, arm_endpoint: &str) -> AzureResult<Self> {
        Self::connect_with_config(creds, arm_endpoint, AzureConfig::new()).await
    }

    pub async fn connect_with_config(
        creds: AzureCredentials,
        arm_endpoint: &str,
        config: AzureConfig,
    ) -> AzureResult<Self> {
        let client = AzureClient::with_config(arm_endpoint, config);
        let endpoints = cloud::fetch_cloud_endpoints(&client, arm_endpoint).await?;
        info!(
            "Azure cloud at {} uses authority {}",
            endpoints.resource_manager, endpoints.active_directory
        );

        let mut service = Self::from_parts(client, creds, endpoints);
        service.authenticate().await?;
        Ok(service)
    }

    /// Assemble a service without any network traffic.
    pub fn from_parts(
        mut client: AzureClient,
        creds: AzureCredentials,
        endpoints: CloudEndpoints,
    ) -> Self {
        client.set_base_url(&endpoints.resource_manager);
        client.set_credentials(creds.clone());
        client.set_endpoints(endpoints.clone());
        Self {
            client,
            credentials: creds,
            endpoints,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn client(&self) -> &AzureClient {
        &self.client
    }

    pub fn endpoints(&self) -> &CloudEndpoints {
        &self.endpoints
    }

    pub fn subscription_id(&self) -> &str {
        &self.credentials.subscription_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.client.is_authenticated()
    }

    // ── Auth ─────────────────────────────────────────────────────────

    pub async fn authenticate(&mut self) -> AzureResult<()> {
        self.client.refresh_token().await?;
        Ok(())
    }

    pub fn set_token(&mut self, token: AzureToken) {
        self.client.set_token(token);
    }

    async fn ensure_auth(&mut self) -> AzureResult<()> {
        self.client.valid_token().await?;
        Ok(())
    }

    // ── Resource Groups ──────────────────────────────────────────────

    pub async fn list_resource_groups(&mut self) -> AzureResult<Vec<ResourceGroup>> {
        self.ensure_auth().await?;
        resource_groups::list_resource_groups(&self.client).await
    }

    pub async fn get_resource_group(&mut self, name: &str) -> AzureResult<ResourceGroup> {
        self.ensure_auth().await?;
        resource_groups::get_resource_group(&self.client, name).await
    }

    pub async fn resource_group_exists(&mut self, name: &str) -> AzureResult<bool> {
        self.ensure_auth().await?;
        resource_groups::exists(&self.client, name).await
    }

    pub async fn create_or_update_resource_group(
        &mut self,
        name: &str,
        params: &ResourceGroupParams,
    ) -> AzureResult<ResourceGroup> {
        self.ensure_auth().await?;
        resource_groups::create_or_update_resource_group(&self.client, name, params).await
    }

    pub async fn export_template(
        &mut self,
        name: &str,
        request: &ExportTemplateRequest,
    ) -> AzureResult<ResourceGroupExportResult> {
        self.ensure_auth().await?;
        resource_groups::export_template(&self.client, name, request).await
    }

    pub async fn delete_resource_group(&mut self, name: &str) -> AzureResult<()> {
        self.ensure_auth().await?;
        resource_groups::delete_resource_group(&self.client, name).await
    }

    // ── Generic resources ────────────────────────────────────────────

    pub async fn create_or_update_resource(
        &mut self,
        id: &ResourceId,
        api_version: &str,
        params: &GenericResourceParams,
    ) -> AzureResult<GenericResource> {
        self.ensure_auth().await?;
        resources::create_or_update_resource(&self.client, id, api_version, params).await
    }

    pub async fn get_resource(
        &mut self,
        id: &ResourceId,
        api_version: &str,
    ) -> AzureResult<GenericResource> {
        self.ensure_auth().await?;
        resources::get_resource(&self.client, id, api_version).await
    }

    pub async fn list_resources_in_group(
        &mut self,
        resource_group: &str,
    ) -> AzureResult<Vec<GenericResource>> {
        self.ensure_auth().await?;
        resources::list_resources_in_group(&self.client, resource_group).await
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
