//! Azure AD OAuth2 authentication.
//!
//! Client-credentials (service-principal) flow against the v2.0 token
//! endpoint of whichever authority the cloud metadata advertises.

use chrono::{Duration, Utc};
use log::debug;

use crate::client::AzureClient;
use crate::types::{
    AzureCredentials, AzureError, AzureErrorKind, AzureResult, AzureToken, CloudEndpoints,
    TokenResponse,
};

/// Token endpoint URL for a tenant under `authority`.
pub fn token_url(authority: &str, tenant_id: &str) -> String {
    format!(
        "{}/{}/oauth2/v2.0/token",
        authority.trim_end_matches('/'),
        tenant_id
    )
}

/// Acquire a resource-manager token using the client-credentials grant.
pub async fn acquire_token(
    client: &AzureClient,
    creds: &AzureCredentials,
    endpoints: &CloudEndpoints,
) -> AzureResult<AzureToken> {
    if creds.client_id.is_empty() || creds.client_secret.is_empty() || creds.tenant_id.is_empty() {
        return Err(AzureError::new(
            AzureErrorKind::Validation,
            "client_id, client_secret, and tenant_id are all required",
        ));
    }

    let url = token_url(&endpoints.active_directory, &creds.tenant_id);
    let scope = endpoints.credential_scope();
    debug!("Azure token request → {} (scope {})", url, scope);

    let form: Vec<(&str, &str)> = vec![
        ("grant_type", "client_credentials"),
        ("client_id", creds.client_id.as_str()),
        ("client_secret", creds.client_secret.as_str()),
        ("scope", scope.as_str()),
    ];

    let resp: TokenResponse = client.post_form_unauthenticated(&url, &form).await?;
    let mut token = token_from_response(resp);
    if token.resource.is_none() {
        token.resource = Some(endpoints.active_directory_resource_id.clone());
    }
    Ok(token)
}

/// Convert the raw token endpoint response into our cached `AzureToken`.
fn token_from_response(resp: TokenResponse) -> AzureToken {
    let expires_at = resp
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs as i64));

    AzureToken {
        access_token: resp.access_token,
        token_type: resp.token_type,
        expires_at,
        resource: resp.resource,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
