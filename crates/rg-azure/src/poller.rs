//! Long-running operation polling.
//!
//! ARM answers slow PUT/POST/DELETE calls with `201`/`202` and one of two
//! headers: `Azure-AsyncOperation` (a status document) or `Location` (202
//! while running, anything else when done). `Retry-After` overrides the
//! configured poll interval.

use std::time::Duration;

use log::debug;
use reqwest::header::HeaderMap;
use reqwest::{Method, Response};

use crate::client::{read_json, AzureClient};
use crate::types::{AsyncOperationStatus, AzureError, AzureErrorKind, AzureResult};

const ASYNC_OPERATION_HEADER: &str = "azure-asyncoperation";
const LOCATION_HEADER: &str = "location";
const RETRY_AFTER_HEADER: &str = "retry-after";

/// Where the final result of an operation is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalState {
    /// GET the URL the operation was started on (PUT).
    OriginalUri,
    /// Body of the final `Location` response (POST).
    Location,
    /// No result (DELETE).
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PollTarget {
    AsyncOperation(String),
    Location(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OperationState {
    InProgress,
    Succeeded,
    Failed(String),
}

/// `true` when the initial response is 201/202 and names something to poll.
pub(crate) fn needs_polling(resp: &Response) -> bool {
    matches!(resp.status().as_u16(), 201 | 202) && poll_target(resp.headers()).is_some()
}

/// `Azure-AsyncOperation` wins over `Location`.
pub(crate) fn poll_target(headers: &HeaderMap) -> Option<PollTarget> {
    if let Some(url) = header_str(headers, ASYNC_OPERATION_HEADER) {
        return Some(PollTarget::AsyncOperation(url));
    }
    header_str(headers, LOCATION_HEADER).map(PollTarget::Location)
}

pub(crate) fn retry_after(headers: &HeaderMap, default_ms: u64) -> Duration {
    header_str(headers, RETRY_AFTER_HEADER)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_millis(default_ms))
}

pub(crate) fn classify(status: &AsyncOperationStatus) -> OperationState {
    match status.status.to_ascii_lowercase().as_str() {
        "succeeded" => OperationState::Succeeded,
        "failed" | "canceled" | "cancelled" => {
            let detail = status
                .error
                .as_ref()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no error details".into());
            OperationState::Failed(format!("operation {}: {}", status.status, detail))
        }
        _ => OperationState::InProgress,
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// Wait for the operation started by `initial` to finish and fetch its
/// result according to `final_state`.
pub(crate) async fn wait(
    client: &AzureClient,
    initial: Response,
    original_url: &str,
    final_state: FinalState,
) -> AzureResult<Option<Response>> {
    let headers = initial.headers().clone();
    let interval = client.config().lro_poll_interval_ms;
    let delay = retry_after(&headers, interval);
    let location = header_str(&headers, LOCATION_HEADER);

    match poll_target(&headers) {
        Some(PollTarget::AsyncOperation(op_url)) => {
            poll_async_operation(client, &op_url, delay).await?;
            match final_state {
                FinalState::OriginalUri => get(client, original_url).await.map(Some),
                FinalState::Location => match location {
                    Some(loc) => get(client, &loc).await.map(Some),
                    None => Ok(None),
                },
                FinalState::Discard => Ok(None),
            }
        }
        Some(PollTarget::Location(loc)) => {
            let done = poll_location(client, loc, delay).await?;
            match final_state {
                FinalState::OriginalUri => get(client, original_url).await.map(Some),
                FinalState::Location => Ok(Some(done)),
                FinalState::Discard => Ok(None),
            }
        }
        None => Ok(Some(initial)),
    }
}

async fn get(client: &AzureClient, url: &str) -> AzureResult<Response> {
    client.send::<()>(Method::GET, url, None).await
}

async fn poll_async_operation(
    client: &AzureClient,
    url: &str,
    first_delay: Duration,
) -> AzureResult<()> {
    let interval = client.config().lro_poll_interval_ms;
    let max_polls = client.config().lro_max_polls;
    let mut delay = first_delay;

    for poll in 1..=max_polls {
        tokio::time::sleep(delay).await;
        let resp = get(client, url).await?;
        delay = retry_after(resp.headers(), interval);
        let status: AsyncOperationStatus = read_json(resp).await?;
        match classify(&status) {
            OperationState::Succeeded => return Ok(()),
            OperationState::Failed(msg) => {
                return Err(AzureError::new(AzureErrorKind::OperationFailed, msg))
            }
            OperationState::InProgress => {
                debug!("operation {} still {} (poll {})", url, status.status, poll);
            }
        }
    }

    Err(timed_out(url, max_polls))
}

async fn poll_location(
    client: &AzureClient,
    mut url: String,
    first_delay: Duration,
) -> AzureResult<Response> {
    let interval = client.config().lro_poll_interval_ms;
    let max_polls = client.config().lro_max_polls;
    let mut delay = first_delay;

    for poll in 1..=max_polls {
        tokio::time::sleep(delay).await;
        let resp = get(client, &url).await?;
        if resp.status().as_u16() != 202 {
            return Ok(resp);
        }
        debug!("location {} still running (poll {})", url, poll);
        delay = retry_after(resp.headers(), interval);
        if let Some(next) = header_str(resp.headers(), LOCATION_HEADER) {
            url = next;
        }
    }

    Err(timed_out(&url, max_polls))
}

fn timed_out(url: &str, polls: u32) -> AzureError {
    AzureError::new(
        AzureErrorKind::Timeout,
        format!("operation at {url} did not complete after {polls} polls"),
    )
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorDetail;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(*k, HeaderValue::from_static(v));
        }
        h
    }

    #[test]
    fn async_operation_preferred_over_location() {
        let h = headers(&[
            ("location", "https://arm/loc"),
            ("azure-asyncoperation", "https://arm/op"),
        ]);
        assert_eq!(
            poll_target(&h),
            Some(PollTarget::AsyncOperation("https://arm/op".into()))
        );
    }

    #[test]
    fn location_used_alone() {
        let h = headers(&[("location", "https://arm/loc")]);
        assert_eq!(poll_target(&h), Some(PollTarget::Location("https://arm/loc".into())));
        assert_eq!(poll_target(&HeaderMap::new()), None);
    }

    #[test]
    fn retry_after_seconds_or_default() {
        assert_eq!(
            retry_after(&headers(&[("retry-after", "7")]), 100),
            Duration::from_secs(7)
        );
        assert_eq!(retry_after(&HeaderMap::new(), 100), Duration::from_millis(100));
        assert_eq!(
            retry_after(&headers(&[("retry-after", "soon")]), 250),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn classify_terminal_states() {
        let ok = AsyncOperationStatus {
            status: "Succeeded".into(),
            error: None,
        };
        assert_eq!(classify(&ok), OperationState::Succeeded);

        let running = AsyncOperationStatus {
            status: "InProgress".into(),
            error: None,
        };
        assert_eq!(classify(&running), OperationState::InProgress);

        let failed = AsyncOperationStatus {
            status: "Failed".into(),
            error: Some(ErrorDetail {
                code: Some("VaultAlreadyExists".into()),
                message: Some("name taken".into()),
                target: None,
            }),
        };
        match classify(&failed) {
            OperationState::Failed(msg) => assert!(msg.contains("VaultAlreadyExists: name taken")),
            other => panic!("unexpected state: {other:?}"),
        }

        let canceled = AsyncOperationStatus {
            status: "Canceled".into(),
            error: None,
        };
        assert!(matches!(classify(&canceled), OperationState::Failed(_)));
    }
}
