//! Cloud endpoint discovery through the ARM metadata endpoint.
//!
//! Azure Stack and sovereign clouds publish their login authority and token
//! audience at `{arm}/metadata/endpoints`; the public cloud does too.

use log::debug;
use url::Url;

use crate::client::AzureClient;
use crate::types::{
    api_versions, AzureError, AzureErrorKind, AzureResult, CloudEndpoints, MetadataResponse,
};

/// `{arm}/metadata/endpoints?api-version=2015-01-01`
pub fn metadata_url(arm_endpoint: &str) -> String {
    format!(
        "{}/metadata/endpoints?api-version={}",
        arm_endpoint.trim_end_matches('/'),
        api_versions::METADATA
    )
}

/// Check that `endpoint` is an absolute http(s) URL.
pub fn validate_endpoint(endpoint: &str) -> AzureResult<Url> {
    let url = Url::parse(endpoint).map_err(|e| {
        AzureError::new(
            AzureErrorKind::Config,
            format!("Invalid resource manager endpoint {endpoint:?}: {e}"),
        )
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AzureError::new(
            AzureErrorKind::Config,
            format!("Unsupported scheme {other:?} in {endpoint}"),
        )),
    }
}

/// Turn a metadata document into endpoints for `arm_endpoint`.
pub fn endpoints_from_metadata(
    arm_endpoint: &str,
    metadata: MetadataResponse,
) -> AzureResult<CloudEndpoints> {
    let auth = metadata.authentication.ok_or_else(|| {
        AzureError::new(AzureErrorKind::Parse, "Cloud metadata has no authentication section")
    })?;
    let login = auth.login_endpoint.filter(|s| !s.is_empty()).ok_or_else(|| {
        AzureError::new(AzureErrorKind::Parse, "Cloud metadata has no loginEndpoint")
    })?;
    let audience = auth.audiences.into_iter().next().ok_or_else(|| {
        AzureError::new(AzureErrorKind::Parse, "Cloud metadata lists no audiences")
    })?;

    Ok(CloudEndpoints {
        resource_manager: arm_endpoint.trim_end_matches('/').to_string(),
        active_directory: login,
        active_directory_resource_id: audience,
        active_directory_graph_resource_id: metadata.graph_endpoint,
        gallery: metadata.gallery_endpoint,
    })
}

/// Fetch the endpoints advertised by the cloud behind `arm_endpoint`.
pub async fn fetch_cloud_endpoints(
    client: &AzureClient,
    arm_endpoint: &str,
) -> AzureResult<CloudEndpoints> {
    validate_endpoint(arm_endpoint)?;
    let url = metadata_url(arm_endpoint);
    debug!("fetch_cloud_endpoints → {}", url);

    let metadata: MetadataResponse = client
        .get_json_unauthenticated(&url)
        .await
        .map_err(|e| {
            AzureError::new(
                AzureErrorKind::Config,
                format!("Unable to get endpoints from the cloud.\n{} ({})", url, e),
            )
        })?;
    endpoints_from_metadata(arm_endpoint, metadata)
}

// ─── Tests ──────────────────────────────────────────────────────────
