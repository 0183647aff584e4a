//! The resource-group walkthrough.
//!
//! Lists groups, creates one, tags it, puts a key vault in it through the
//! generic resource API, lists its resources, exports its template and
//! deletes it. Each step waits for the previous one; the first error stops
//! the run.

use std::io::Write;

use async_trait::async_trait;
use rg_azure::key_vault::{self, KeyVaultParams};
use rg_azure::resources::ResourceId;
use rg_azure::service::AzureService;
use rg_azure::types::{
    api_versions, AzureResult, ExportTemplateRequest,
    GenericResource, GenericResourceParams, ResourceGroup, ResourceGroupExportResult,
    ResourceGroupParams,
};
use tracing::{debug, info, warn};

use crate::naming;
use crate::output::{write_heading, write_item, write_template};

/// The remote operations the walkthrough issues, in the order it issues them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceManagement: Send {
    async fn list_resource_groups(&mut self) -> AzureResult<Vec<ResourceGroup>>;

    async fn create_or_update_resource_group(
        &mut self,
        name: &str,
        params: &ResourceGroupParams,
    ) -> AzureResult<ResourceGroup>;

    async fn create_or_update_resource(
        &mut self,
        id: &ResourceId,
        api_version: &str,
        params: &GenericResourceParams,
    ) -> AzureResult<GenericResource>;

    async fn list_resources_in_group(&mut self, name: &str) -> AzureResult<Vec<GenericResource>>;

    async fn export_template(
        &mut self,
        name: &str,
        request: &ExportTemplateRequest,
    ) -> AzureResult<ResourceGroupExportResult>;

    async fn delete_resource_group(&mut self, name: &str) -> AzureResult<()>;
}

#[async_trait]
impl ResourceManagement for AzureService {
    async fn list_resource_groups(&mut self) -> AzureResult<Vec<ResourceGroup>> {
        AzureService::list_resource_groups(self).await
    }

    async fn create_or_update_resource_group(
        &mut self,
        name: &str,
        params: &ResourceGroupParams,
    ) -> AzureResult<ResourceGroup> {
        AzureService::create_or_update_resource_group(self, name, params).await
    }

    async fn create_or_update_resource(
        &mut self,
        id: &ResourceId,
        api_version: &str,
        params: &GenericResourceParams,
    ) -> AzureResult<GenericResource> {
        AzureService::create_or_update_resource(self, id, api_version, params).await
    }

    async fn list_resources_in_group(&mut self, name: &str) -> AzureResult<Vec<GenericResource>> {
        AzureService::list_resources_in_group(self, name).await
    }

    async fn export_template(
        &mut self,
        name: &str,
        request: &ExportTemplateRequest,
    ) -> AzureResult<ResourceGroupExportResult> {
        AzureService::export_template(self, name, request).await
    }

    async fn delete_resource_group(&mut self, name: &str) -> AzureResult<()> {
        AzureService::delete_resource_group(self, name).await
    }
}

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct SamplePlan {
    pub location: String,
    pub tenant_id: String,
    /// Fixed group name; drawn from the listing when `None`.
    pub group_name: Option<String>,
    pub vault_name: String,
}

impl SamplePlan {
    pub fn new(location: &str, tenant_id: &str) -> Self {
        Self {
            location: location.to_string(),
            tenant_id: tenant_id.to_string(),
            group_name: None,
            vault_name: naming::vault_name(chrono::Utc::now()),
        }
    }
}

/// What a completed run touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleReport {
    pub group_name: String,
    pub vault_name: String,
    pub groups_listed: usize,
    pub resources_listed: usize,
}

pub async fn run_sample<M, W>(
    manager: &mut M,
    plan: &SamplePlan,
    out: &mut W,
) -> AzureResult<SampleReport>
where
    M: ResourceManagement + ?Sized,
    W: Write + ?Sized,
{
    write_heading(out, "List Resource Groups")?;
    let groups = manager.list_resource_groups().await?;
    for group in &groups {
        write_item(out, group)?;
    }

    let group_name = match &plan.group_name {
        Some(name) => name.clone(),
        None => naming::pick_group_name(
            groups.iter().map(|g| g.name.as_str()),
            &mut rand::thread_rng(),
        )?,
    };
    info!("using resource group {}", group_name);

    write_heading(out, "Create Resource Group")?;
    let mut params = ResourceGroupParams::new(&plan.location);
    let created = manager
        .create_or_update_resource_group(&group_name, &params)
        .await?;
    write_item(out, &created)?;

    write_heading(out, "Modify Resource Group")?;
    params = params.with_tag("hello", "world");
    let updated = manager
        .create_or_update_resource_group(&group_name, &params)
        .await?;
    write_item(out, &updated)?;

    write_heading(out, "Create a Key Vault via a Generic Resource Put")?;
    let vault_id = key_vault::vault_resource_id(&group_name, &plan.vault_name);
    let vault_params =
        KeyVaultParams::standard(&plan.location, &plan.tenant_id).to_resource_params()?;
    let vault = manager
        .create_or_update_resource(&vault_id, api_versions::KEYVAULT, &vault_params)
        .await?;
    debug!("key vault {} provisioned at {}", vault.name, vault.id);

    write_heading(out, "List all of the resources within the group")?;
    let resources = manager.list_resources_in_group(&group_name).await?;
    for resource in &resources {
        write_item(out, resource)?;
    }

    write_heading(out, "Export Resource Group Template")?;
    let exported = manager
        .export_template(&group_name, &ExportTemplateRequest::all_resources())
        .await?;
    if let Some(err) = &exported.error {
        warn!("template export reported: {}", err);
    }
    write_template(out, &exported.template)?;

    write_heading(out, "Delete Resource Group")?;
    manager.delete_resource_group(&group_name).await?;
    writeln!(out, "\nDeleted: {group_name}")?;

    Ok(SampleReport {
        group_name,
        vault_name: plan.vault_name.clone(),
        groups_listed: groups.len(),
        resources_listed: resources.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::Sequence;
    use rg_azure::types::{AzureError, AzureErrorKind, ResourceGroupProperties};
    use serde_json::json;

    const GROUP: &str = "azure-sample-group-resources-321";
    const VAULT: &str = "azureSampleVault-120000";

    fn plan() -> SamplePlan {
        SamplePlan {
            location: "eastus".into(),
            tenant_id: "tenant-1".into(),
            group_name: Some(GROUP.into()),
            vault_name: VAULT.into(),
        }
    }

    fn group_from(name: &str, params: &ResourceGroupParams) -> ResourceGroup {
        ResourceGroup {
            id: format!("/subscriptions/sub-1/resourceGroups/{name}"),
            name: name.to_string(),
            location: params.location.clone(),
            tags: params.tags.clone(),
            properties: Some(ResourceGroupProperties {
                provisioning_state: Some("Succeeded".into()),
            }),
            managed_by: None,
        }
    }

    fn vault() -> GenericResource {
        GenericResource {
            id: format!("/subscriptions/sub-1/resourceGroups/{GROUP}/providers/Microsoft.KeyVault/vaults/{VAULT}"),
            name: VAULT.into(),
            resource_type: "Microsoft.KeyVault/vaults".into(),
            location: "eastus".into(),
            ..Default::default()
        }
    }

    fn expect_full_run(mock: &mut MockResourceManagement, seq: &mut Sequence) {
        mock.expect_list_resource_groups()
            .times(1)
            .in_sequence(seq)
            .returning(|| {
                Ok(vec![ResourceGroup {
                    name: "existing".into(),
                    location: "westus".into(),
                    ..Default::default()
                }])
            });
        mock.expect_create_or_update_resource_group()
            .withf(|name, params| name == GROUP && params.location == "eastus" && params.tags.is_empty())
            .times(1)
            .in_sequence(seq)
            .returning(|name, params| Ok(group_from(name, params)));
        mock.expect_create_or_update_resource_group()
            .withf(|name, params| {
                name == GROUP && params.tags.get("hello").map(String::as_str) == Some("world")
            })
            .times(1)
            .in_sequence(seq)
            .returning(|name, params| Ok(group_from(name, params)));
        mock.expect_create_or_update_resource()
            .withf(|id, api_version, params| {
                id.resource_group == GROUP
                    && id.provider_namespace == "Microsoft.KeyVault"
                    && id.parent_resource_path.is_empty()
                    && id.resource_type == "vaults"
                    && id.resource_name == VAULT
                    && api_version == "2016-10-01"
                    && params.location == "eastus"
                    && params.properties["tenantId"] == json!("tenant-1")
                    && params.properties["sku"] == json!({"family": "A", "name": "standard"})
            })
            .times(1)
            .in_sequence(seq)
            .returning(|_, _, _| Ok(vault()));
        mock.expect_list_resources_in_group()
            .withf(|name| name == GROUP)
            .times(1)
            .in_sequence(seq)
            .returning(|_| Ok(vec![vault()]));
        mock.expect_export_template()
            .withf(|name, request| name == GROUP && request.resources == vec!["*".to_string()])
            .times(1)
            .in_sequence(seq)
            .returning(|_, _| {
                Ok(ResourceGroupExportResult {
                    template: json!({"resources": [{"type": "Microsoft.KeyVault/vaults"}]}),
                    error: None,
                })
            });
        mock.expect_delete_resource_group()
            .withf(|name| name == GROUP)
            .times(1)
            .in_sequence(seq)
            .returning(|_| Ok(()));
    }

    #[tokio::test]
    async fn issues_calls_in_fixed_order() {
        let mut mock = MockResourceManagement::new();
        let mut seq = Sequence::new();
        expect_full_run(&mut mock, &mut seq);

        let mut out = Vec::new();
        let report = run_sample(&mut mock, &plan(), &mut out).await.unwrap();

        assert_eq!(
            report,
            SampleReport {
                group_name: GROUP.into(),
                vault_name: VAULT.into(),
                groups_listed: 1,
                resources_listed: 1,
            }
        );
    }

    #[tokio::test]
    async fn prints_every_step() {
        let mut mock = MockResourceManagement::new();
        let mut seq = Sequence::new();
        expect_full_run(&mut mock, &mut seq);

        let mut out = Vec::new();
        run_sample(&mut mock, &plan(), &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();

        let headings = [
            "List Resource Groups",
            "Create Resource Group",
            "Modify Resource Group",
            "Create a Key Vault via a Generic Resource Put",
            "List all of the resources within the group",
            "Export Resource Group Template",
            "Delete Resource Group",
        ];
        let mut last = 0;
        for heading in headings {
            let pos = text[last..]
                .find(heading)
                .unwrap_or_else(|| panic!("missing heading {heading:?}"));
            last += pos + heading.len();
        }

        assert!(text.contains("\tName: existing\n"));
        assert!(text.contains("\tTags: {hello: world}\n"));
        assert!(text.contains("\t\tProvisioning State: Succeeded\n"));
        assert!(text.contains("\"type\": \"Microsoft.KeyVault/vaults\""));
        assert!(text.ends_with(&format!("\nDeleted: {GROUP}\n")));
    }

    #[tokio::test]
    async fn failure_stops_the_sequence() {
        let mut mock = MockResourceManagement::new();
        let mut seq = Sequence::new();
        mock.expect_list_resource_groups()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![]));
        mock.expect_create_or_update_resource_group()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Err(AzureError::with_status(
                    AzureErrorKind::Forbidden,
                    "AuthorizationFailed: no write permission",
                    403,
                ))
            });
        mock.expect_create_or_update_resource().times(0);
        mock.expect_list_resources_in_group().times(0);
        mock.expect_export_template().times(0);
        mock.expect_delete_resource_group().times(0);

        let mut out = Vec::new();
        let err = run_sample(&mut mock, &plan(), &mut out).await.unwrap_err();
        assert_eq!(err.kind, AzureErrorKind::Forbidden);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Create Resource Group"));
        assert!(!text.contains("Modify Resource Group"));
    }

    struct ClosedConsole;

    impl Write for ClosedConsole {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn console_failure_is_io_error() {
        let mut mock = MockResourceManagement::new();
        mock.expect_list_resource_groups().times(0);

        let err = run_sample(&mut mock, &plan(), &mut ClosedConsole)
            .await
            .unwrap_err();
        assert_eq!(err.kind, AzureErrorKind::Io);
        assert!(err.message.contains("stdout closed"));
    }

    #[tokio::test]
    async fn draws_group_name_when_not_fixed() {
        let mut mock = MockResourceManagement::new();
        mock.expect_list_resource_groups().returning(|| Ok(vec![]));
        mock.expect_create_or_update_resource_group()
            .withf(|name, _| name.starts_with(naming::GROUP_PREFIX))
            .returning(|name, params| Ok(group_from(name, params)));
        mock.expect_create_or_update_resource()
            .returning(|_, _, _| Ok(vault()));
        mock.expect_list_resources_in_group().returning(|_| Ok(vec![]));
        mock.expect_export_template()
            .returning(|_, _| Ok(ResourceGroupExportResult::default()));
        mock.expect_delete_resource_group().returning(|_| Ok(()));

        let plan = SamplePlan {
            group_name: None,
            ..plan()
        };
        let mut out = Vec::new();
        let report = run_sample(&mut mock, &plan, &mut out).await.unwrap();
        assert!(report.group_name.starts_with(naming::GROUP_PREFIX));
        assert_eq!(report.resources_listed, 0);
    }
}
