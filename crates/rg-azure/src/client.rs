//! HTTP client wrapper for the Azure Resource Manager API.
//!
//! Handles bearer-token injection and refresh, rate-limit retries with
//! exponential backoff, pagination via `nextLink`, long-running operations and
//! standard ARM error extraction.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth;
use crate::poller::{self, FinalState};
use crate::types::{
    ArmList, AzureConfig, AzureCredentials, AzureError, AzureErrorKind, AzureResult, AzureToken,
    CloudEndpoints,
};

/// Maximum retries for transient / rate-limit errors.
const MAX_RETRIES: u32 = 3;
/// Base delay between retries (doubled each attempt).
const BASE_DELAY_MS: u64 = 500;

/// HTTP client with Azure-specific auth and retry logic.
///
/// Clones share the cached token.
#[derive(Clone)]
pub struct AzureClient {
    http: Client,
    base_url: String,
    token: Arc<RwLock<Option<AzureToken>>>,
    credentials: Option<AzureCredentials>,
    endpoints: Option<CloudEndpoints>,
    config: AzureConfig,
}

impl AzureClient {
    /// Client for the resource manager at `base_url`
    /// (e.g. `https://management.local.azurestack.external`).
    pub fn new(base_url: &str) -> Self {
        Self::with_config(base_url, AzureConfig::new())
    }

    pub fn with_config(base_url: &str, config: AzureConfig) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Arc::new(RwLock::new(None)),
            credentials: None,
            endpoints: None,
            config,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &AzureConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_base_url(&mut self, base_url: &str) {
        self.base_url = base_url.trim_end_matches('/').to_string();
    }

    pub fn set_credentials(&mut self, creds: AzureCredentials) {
        self.credentials = Some(creds);
    }

    /// Authority and audience used to re-acquire tokens.
    pub fn set_endpoints(&mut self, endpoints: CloudEndpoints) {
        self.endpoints = Some(endpoints);
    }

    pub fn set_token(&self, token: AzureToken) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token);
        }
    }

    fn cached_token(&self) -> Option<AzureToken> {
        self.token.read().ok().and_then(|slot| slot.clone())
    }

    /// `true` while the cached token is usable without a refresh.
    pub fn is_authenticated(&self) -> bool {
        self.cached_token()
            .map(|t| !t.access_token.is_empty() && !t.needs_refresh())
            .unwrap_or(false)
    }

    // ── Token management ─────────────────────────────────────────────

    /// Acquire a new token with the stored credentials and cache it.
    pub async fn refresh_token(&self) -> AzureResult<AzureToken> {
        let (creds, endpoints) = match (&self.credentials, &self.endpoints) {
            (Some(c), Some(e)) => (c, e),
            _ => return Err(AzureError::not_authenticated()),
        };
        let token = auth::acquire_token(self, creds, endpoints).await?;
        self.set_token(token.clone());
        Ok(token)
    }

    /// The cached token, re-acquired first when missing or near expiry.
    pub async fn valid_token(&self) -> AzureResult<AzureToken> {
        match self.cached_token() {
            Some(t) if !t.access_token.is_empty() && !t.needs_refresh() => Ok(t),
            _ => {
                debug!("Azure token missing or near expiry, re-acquiring");
                self.refresh_token().await
            }
        }
    }

    pub fn subscription_id(&self) -> AzureResult<&str> {
        self.credentials
            .as_ref()
            .map(|c| c.subscription_id.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(AzureError::subscription_not_set)
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base_url}{path}`
    pub fn arm_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/subscriptions/{id}{suffix}` on the resource manager.
    pub fn subscription_url(&self, suffix: &str) -> AzureResult<String> {
        let sub = self.subscription_id()?;
        Ok(self.arm_url(&format!("/subscriptions/{sub}{suffix}")))
    }

    /// `/subscriptions/{id}/resourceGroups/{rg}{suffix}` on the resource manager.
    pub fn resource_group_url(&self, rg: &str, suffix: &str) -> AzureResult<String> {
        self.subscription_url(&format!("/resourceGroups/{rg}{suffix}"))
    }

    // ── Auth header builder ──────────────────────────────────────────

    async fn auth_headers(&self) -> AzureResult<HeaderMap> {
        let token = self.valid_token().await?;

        let mut headers = HeaderMap::new();
        let val = format!("Bearer {}", token.access_token);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&val).map_err(|e| {
                AzureError::new(AzureErrorKind::Auth, format!("Header value error: {e}"))
            })?,
        );
        Ok(headers)
    }

    // ── Transport ────────────────────────────────────────────────────

    /// Send a request built by `build`, retrying transient statuses.
    /// Any 2xx response is returned as-is; other statuses become errors.
    async fn send_with_retry<F>(&self, verb: &str, url: &str, build: F) -> AzureResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        for attempt in 0..=MAX_RETRIES {
            let resp = build(&self.http)
                .send()
                .await
                .map_err(|e| AzureError::new(AzureErrorKind::Network, format!("{e}")))?;

            let status = resp.status();
            if status.is_success() {
                return Ok(resp);
            }

            if should_retry(status.as_u16()) && attempt < MAX_RETRIES {
                let delay = BASE_DELAY_MS * 2u64.pow(attempt);
                warn!("Azure {} {} → {} – retrying in {}ms", verb, url, status, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            return Err(AzureError::from_status(status.as_u16(), &body));
        }

        Err(AzureError::new(
            AzureErrorKind::Network,
            "Max retries exceeded",
        ))
    }

    /// Authenticated request with an optional JSON body.
    pub(crate) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> AzureResult<Response> {
        let headers = self.auth_headers().await?;
        let verb = method.as_str().to_string();
        debug!("Azure {} {}", verb, url);
        self.send_with_retry(&verb, url, |http| {
            let req = http.request(method.clone(), url).headers(headers.clone());
            match body {
                Some(b) => req.json(b),
                None => req,
            }
        })
        .await
    }

    // ── Core HTTP verbs ──────────────────────────────────────────────

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> AzureResult<T> {
        let resp = self.send::<()>(Method::GET, url, None).await?;
        read_json(resp).await
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> AzureResult<T> {
        let resp = self.send(Method::PUT, url, Some(body)).await?;
        read_json(resp).await
    }

    // ── Long-running operations ──────────────────────────────────────

    /// PUT that may complete asynchronously. The final state is read back
    /// from the resource URL once the operation finishes.
    pub async fn put_lro<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> AzureResult<T> {
        let resp = self.send(Method::PUT, url, Some(body)).await?;
        if !poller::needs_polling(&resp) {
            if resp.status() == StatusCode::ACCEPTED {
                // Nothing to poll: read the resource back.
                return self.get_json(url).await;
            }
            return read_json(resp).await;
        }
        match poller::wait(self, resp, url, FinalState::OriginalUri).await? {
            Some(final_resp) => read_json(final_resp).await,
            None => self.get_json(url).await,
        }
    }

    /// POST whose result is delivered through the `Location` URL when the
    /// service answers 202.
    pub async fn post_lro<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> AzureResult<T> {
        let resp = self.send(Method::POST, url, Some(body)).await?;
        if !poller::needs_polling(&resp) {
            if resp.status() == StatusCode::ACCEPTED {
                return Err(AzureError::new(
                    AzureErrorKind::OperationFailed,
                    format!(
                        "POST {url} was accepted without a Location or Azure-AsyncOperation header"
                    ),
                ));
            }
            return read_json(resp).await;
        }
        match poller::wait(self, resp, url, FinalState::Location).await? {
            Some(final_resp) => read_json(final_resp).await,
            None => Err(AzureError::new(
                AzureErrorKind::Parse,
                format!("POST {url} completed without a result location"),
            )),
        }
    }

    /// DELETE, waiting for asynchronous completion.
    pub async fn delete_lro(&self, url: &str) -> AzureResult<()> {
        let resp = self.send::<()>(Method::DELETE, url, None).await?;
        if poller::needs_polling(&resp) {
            poller::wait(self, resp, url, FinalState::Discard).await?;
        }
        Ok(())
    }

    // ── Pagination helper ────────────────────────────────────────────

    /// Follow `nextLink` to collect **all** items from a paginated ARM list endpoint.
    pub async fn get_all_pages<T: DeserializeOwned>(
        &self,
        initial_url: &str,
    ) -> AzureResult<Vec<T>> {
        let mut all: Vec<T> = Vec::new();
        let mut url = initial_url.to_string();

        loop {
            debug!("Azure paginate: {}", url);
            let page: ArmList<T> = self.get_json(&url).await?;
            all.extend(page.value);
            match page.next_link {
                Some(next) if !next.is_empty() => url = next,
                _ => break,
            }
        }

        Ok(all)
    }

    // ── Unauthenticated calls ────────────────────────────────────────

    /// GET without a bearer token (cloud metadata discovery).
    pub async fn get_json_unauthenticated<T: DeserializeOwned>(&self, url: &str) -> AzureResult<T> {
        let resp = self
            .send_with_retry("GET", url, |http| http.get(url))
            .await?;
        read_json(resp).await
    }

    /// POST unauthenticated form data (used by auth module for token exchange).
    pub async fn post_form_unauthenticated<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(impl AsRef<str>, impl AsRef<str>)],
    ) -> AzureResult<T> {
        let form_pairs: Vec<(&str, &str)> = form
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_ref()))
            .collect();

        let resp = self
            .http
            .post(url)
            .form(&form_pairs)
            .send()
            .await
            .map_err(|e| AzureError::new(AzureErrorKind::Network, format!("{e}")))?;

        if resp.status().is_success() {
            read_json(resp).await
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(AzureError::from_status(status, &body))
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> AzureResult<T> {
    resp.json::<T>()
        .await
        .map_err(|e| AzureError::new(AzureErrorKind::Parse, format!("JSON parse: {e}")))
}

fn should_retry(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

// ─── Tests ──────────────────────────────────────────────────────────
