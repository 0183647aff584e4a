//! Core types for the Azure Resource Manager REST layer.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Error types ─────────────────────────────────────────────────────

/// Categorised error kinds for Azure operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AzureErrorKind {
    Auth,
    NotFound,
    Conflict,
    Forbidden,
    RateLimit,
    BadRequest,
    ServerError,
    Timeout,
    Network,
    Parse,
    Validation,
    Config,
    OperationFailed,
    Io,
    NotAuthenticated,
    SubscriptionNotSet,
}

impl fmt::Display for AzureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auth => write!(f, "Authentication error"),
            Self::NotFound => write!(f, "Resource not found"),
            Self::Conflict => write!(f, "Resource conflict"),
            Self::Forbidden => write!(f, "Forbidden"),
            Self::RateLimit => write!(f, "Rate limit exceeded"),
            Self::BadRequest => write!(f, "Bad request"),
            Self::ServerError => write!(f, "Server error"),
            Self::Timeout => write!(f, "Operation timed out"),
            Self::Network => write!(f, "Network error"),
            Self::Parse => write!(f, "Parse error"),
            Self::Validation => write!(f, "Validation error"),
            Self::Config => write!(f, "Configuration error"),
            Self::OperationFailed => write!(f, "Long-running operation failed"),
            Self::Io => write!(f, "I/O error"),
            Self::NotAuthenticated => write!(f, "Not authenticated"),
            Self::SubscriptionNotSet => write!(f, "Subscription ID not set"),
        }
    }
}

/// Main error type for Azure operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureError {
    pub kind: AzureErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl AzureError {
    pub fn new(kind: AzureErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(kind: AzureErrorKind, message: impl Into<String>, status: u16) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: Some(status),
        }
    }

    /// Map an HTTP failure to an error. When the body is an ARM error
    /// envelope the message becomes `code: message`, otherwise the raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            400 => AzureErrorKind::BadRequest,
            401 => AzureErrorKind::Auth,
            403 => AzureErrorKind::Forbidden,
            404 => AzureErrorKind::NotFound,
            409 => AzureErrorKind::Conflict,
            429 => AzureErrorKind::RateLimit,
            500..=599 => AzureErrorKind::ServerError,
            _ => AzureErrorKind::Network,
        };
        let message = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map(|d| d.to_string())
            .unwrap_or_else(|| body.to_string());
        Self::with_status(kind, message, status)
    }

    pub fn not_authenticated() -> Self {
        Self::new(AzureErrorKind::NotAuthenticated, "Not authenticated, acquire a token first")
    }

    pub fn subscription_not_set() -> Self {
        Self::new(AzureErrorKind::SubscriptionNotSet, "Subscription ID not configured")
    }

    pub fn missing_env(var: &str) -> Self {
        Self::new(
            AzureErrorKind::Config,
            format!("Required environment variable {var} is not set"),
        )
    }
}

impl fmt::Display for AzureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for AzureError {}

impl From<std::io::Error> for AzureError {
    fn from(e: std::io::Error) -> Self {
        Self::new(AzureErrorKind::Io, e.to_string())
    }
}

pub type AzureResult<T> = Result<T, AzureError>;

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(c), Some(m)) => write!(f, "{c}: {m}"),
            (Some(c), None) => write!(f, "{c}"),
            (None, Some(m)) => write!(f, "{m}"),
            (None, None) => write!(f, "unknown error"),
        }
    }
}

// ─── OAuth / Auth ────────────────────────────────────────────────────

/// Service-principal credentials for Azure AD.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AzureCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub subscription_id: String,
}

impl fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

/// Tokens expiring within this window are re-acquired before use.
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Cached bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AzureToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resource: Option<String>,
}

impl AzureToken {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => Utc::now() >= exp,
            None => false,
        }
    }

    /// Expired, or close enough to expiry that a long poll could outlive it.
    pub fn needs_refresh(&self) -> bool {
        match self.expires_at {
            Some(exp) => Utc::now() + chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) >= exp,
            None => false,
        }
    }
}

/// Raw token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub resource: Option<String>,
}

// ─── Cloud metadata ─────────────────────────────────────────────────

/// Endpoints a cloud advertises through `{arm}/metadata/endpoints`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CloudEndpoints {
    pub resource_manager: String,
    /// Login authority, e.g. `https://login.microsoftonline.com/`.
    pub active_directory: String,
    /// Token audience for the resource manager.
    pub active_directory_resource_id: String,
    #[serde(default)]
    pub active_directory_graph_resource_id: Option<String>,
    #[serde(default)]
    pub gallery: Option<String>,
}

impl CloudEndpoints {
    /// Scope requested from the token endpoint. The audience is appended
    /// verbatim, so an audience ending in `/` yields `...//.default`, which
    /// AAD accepts for v1 resources.
    pub fn credential_scope(&self) -> String {
        format!(
            "openid profile offline_access {}/.default",
            self.active_directory_resource_id
        )
    }
}

/// Raw metadata document.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    #[serde(default)]
    pub gallery_endpoint: Option<String>,
    #[serde(default)]
    pub graph_endpoint: Option<String>,
    #[serde(default)]
    pub authentication: Option<MetadataAuthentication>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetadataAuthentication {
    #[serde(default)]
    pub login_endpoint: Option<String>,
    #[serde(default)]
    pub audiences: Vec<String>,
}

// ─── Azure Resource Manager common ──────────────────────────────────

/// Generic ARM list wrapper (`value` array with optional `nextLink`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArmList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub next_link: Option<String>,
}

/// Any ARM resource addressed by provider namespace and type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenericResource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl GenericResource {
    /// `properties.provisioningState`, when the service returned one.
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.get("provisioningState"))
            .and_then(|s| s.as_str())
    }
}

// ─── Resource Groups ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub properties: Option<ResourceGroupProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
}

impl ResourceGroup {
    pub fn provisioning_state(&self) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|p| p.provisioning_state.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

/// Body of a resource-group create-or-update.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResourceGroupParams {
    pub location: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl ResourceGroupParams {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            tags: HashMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// Body of a generic resource create-or-update.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct GenericResourceParams {
    pub location: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    pub properties: serde_json::Value,
}

/// Body of `exportTemplate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportTemplateRequest {
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
}

impl ExportTemplateRequest {
    /// Export every resource in the group.
    pub fn all_resources() -> Self {
        Self {
            resources: vec!["*".into()],
            options: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResourceGroupExportResult {
    #[serde(default)]
    pub template: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl PartialEq for ErrorDetail {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message && self.target == other.target
    }
}

/// Status document returned by an `Azure-AsyncOperation` URL.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AsyncOperationStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

// ─── Configuration ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    pub api_version_resources: String,
    /// Wait between LRO polls when the service sends no `Retry-After`.
    pub lro_poll_interval_ms: u64,
    /// Upper bound on LRO polls before giving up.
    pub lro_max_polls: u32,
    pub request_timeout_secs: u64,
}

impl AzureConfig {
    pub fn new() -> Self {
        Self {
            api_version_resources: api_versions::RESOURCES.into(),
            lro_poll_interval_ms: 5_000,
            lro_max_polls: 360,
            request_timeout_secs: 30,
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Azure API version constants ────────────────────────────────────

pub mod api_versions {
    /// `Microsoft.Resources` in the 2020-09-01 hybrid profile.
    pub const RESOURCES: &str = "2019-10-01";
    pub const KEYVAULT: &str = "2016-10-01";
    pub const METADATA: &str = "2015-01-01";
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = AzureError::new(AzureErrorKind::Auth, "bad credentials");
        assert_eq!(e.to_string(), "[Authentication error] bad credentials");
    }

    #[test]
    fn error_from_status_codes() {
        assert_eq!(AzureError::from_status(400, "x").kind, AzureErrorKind::BadRequest);
        assert_eq!(AzureError::from_status(401, "x").kind, AzureErrorKind::Auth);
        assert_eq!(AzureError::from_status(403, "x").kind, AzureErrorKind::Forbidden);
        assert_eq!(AzureError::from_status(404, "x").kind, AzureErrorKind::NotFound);
        assert_eq!(AzureError::from_status(409, "x").kind, AzureErrorKind::Conflict);
        assert_eq!(AzureError::from_status(429, "x").kind, AzureErrorKind::RateLimit);
        assert_eq!(AzureError::from_status(500, "x").kind, AzureErrorKind::ServerError);
        assert_eq!(AzureError::from_status(503, "x").kind, AzureErrorKind::ServerError);
    }

    #[test]
    fn error_from_status_arm_envelope() {
        let body = r#"{"error":{"code":"ResourceGroupNotFound","message":"Resource group 'rg1' could not be found."}}"#;
        let e = AzureError::from_status(404, body);
        assert_eq!(e.status_code, Some(404));
        assert_eq!(
            e.message,
            "ResourceGroupNotFound: Resource group 'rg1' could not be found."
        );
    }

    #[test]
    fn error_from_status_plain_body() {
        let e = AzureError::from_status(502, "Bad Gateway");
        assert_eq!(e.message, "Bad Gateway");
    }

    #[test]
    fn missing_env_names_variable() {
        let e = AzureError::missing_env("AZURE_TENANT_ID");
        assert_eq!(e.kind, AzureErrorKind::Config);
        assert!(e.message.contains("AZURE_TENANT_ID"));
    }

    #[test]
    fn token_expiry() {
        assert!(!AzureToken::default().is_expired());
        let past = AzureToken {
            access_token: "tok".into(),
            token_type: "Bearer".into(),
            expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
            resource: None,
        };
        assert!(past.is_expired());
    }

    #[test]
    fn token_near_expiry_needs_refresh() {
        let token = |minutes: i64| AzureToken {
            access_token: "tok".into(),
            token_type: "Bearer".into(),
            expires_at: Some(Utc::now() + chrono::Duration::minutes(minutes)),
            resource: None,
        };
        let soon = token(2);
        assert!(!soon.is_expired());
        assert!(soon.needs_refresh());
        assert!(!token(60).needs_refresh());
        assert!(!AzureToken::default().needs_refresh());
    }

    #[test]
    fn credentials_debug_redacts_secret() {
        let creds = AzureCredentials {
            client_id: "client-1".into(),
            client_secret: "s3cret".into(),
            tenant_id: "tenant-1".into(),
            subscription_id: "sub-1".into(),
        };
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains("s3cret"));
        assert!(dbg.contains("<redacted>"));
        assert!(dbg.contains("client-1"));
    }

    #[test]
    fn io_error_maps_to_io_kind() {
        let e: AzureError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed").into();
        assert_eq!(e.kind, AzureErrorKind::Io);
        assert!(e.message.contains("closed"));
    }

    #[test]
    fn credential_scope_appends_audience() {
        let ep = CloudEndpoints {
            active_directory_resource_id: "https://management.local.azurestack.external/abc".into(),
            ..Default::default()
        };
        assert_eq!(
            ep.credential_scope(),
            "openid profile offline_access https://management.local.azurestack.external/abc/.default"
        );
    }

    #[test]
    fn resource_group_serde() {
        let json = r#"{"id":"/subscriptions/sub1/resourceGroups/rg1","name":"rg1","location":"eastus","tags":{"hello":"world"},"properties":{"provisioningState":"Succeeded"}}"#;
        let rg: ResourceGroup = serde_json::from_str(json).unwrap();
        assert_eq!(rg.name, "rg1");
        assert_eq!(rg.provisioning_state(), Some("Succeeded"));
        assert_eq!(rg.tags.get("hello"), Some(&"world".to_string()));
    }

    #[test]
    fn resource_group_without_properties() {
        let rg: ResourceGroup = serde_json::from_str(r#"{"name":"rg1"}"#).unwrap();
        assert!(rg.provisioning_state().is_none());
        assert!(rg.tags.is_empty());
    }

    #[test]
    fn rg_params_omit_empty_tags() {
        let json = serde_json::to_value(ResourceGroupParams::new("eastus")).unwrap();
        assert_eq!(json, serde_json::json!({"location": "eastus"}));

        let tagged = ResourceGroupParams::new("eastus").with_tag("hello", "world");
        let json = serde_json::to_value(tagged).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"location": "eastus", "tags": {"hello": "world"}})
        );
    }

    #[test]
    fn generic_resource_provisioning_state() {
        let json = r#"{"id":"x","name":"kv","type":"Microsoft.KeyVault/vaults","location":"eastus","properties":{"provisioningState":"Succeeded"}}"#;
        let r: GenericResource = serde_json::from_str(json).unwrap();
        assert_eq!(r.resource_type, "Microsoft.KeyVault/vaults");
        assert_eq!(r.provisioning_state(), Some("Succeeded"));
    }

    #[test]
    fn arm_list_deserialization() {
        let json = r#"{"value":[{"name":"a"},{"name":"b"}],"nextLink":"http://next"}"#;
        let list: ArmList<ResourceGroup> = serde_json::from_str(json).unwrap();
        assert_eq!(list.value.len(), 2);
        assert_eq!(list.next_link.unwrap(), "http://next");
    }

    #[test]
    fn arm_list_of_type_without_default() {
        #[derive(Debug, Deserialize)]
        struct Named {
            name: String,
        }
        let list: ArmList<Named> = serde_json::from_str(r#"{"value":[{"name":"a"}]}"#).unwrap();
        assert_eq!(list.value[0].name, "a");
        let empty: ArmList<Named> = serde_json::from_str("{}").unwrap();
        assert!(empty.value.is_empty());
        assert!(empty.next_link.is_none());
    }

    #[test]
    fn export_request_body() {
        let json = serde_json::to_value(ExportTemplateRequest::all_resources()).unwrap();
        assert_eq!(json, serde_json::json!({"resources": ["*"]}));
    }

    #[test]
    fn config_defaults() {
        let c = AzureConfig::new();
        assert_eq!(c.api_version_resources, "2019-10-01");
        assert_eq!(c.lro_poll_interval_ms, 5_000);
        assert!(c.lro_max_polls > 0);
    }
}
