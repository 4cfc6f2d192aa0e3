use reqwest::header::RETRY_AFTER;
use thiserror::Error;

/// Errors returned by the provider clients.
///
/// The variants are the engine's error taxonomy: `Timeout` and `Network`
/// (plus upstream 5xx) are transient and retried by the iteration executor;
/// `RateLimited` and `AuthFailed` propagate unretried as pause triggers;
/// everything else records the iteration as failed.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider call timed out")]
    Timeout,

    #[error("rate limited by provider")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("authentication failed (HTTP {status})")]
    AuthFailed { status: u16 },

    /// Non-2xx response other than 401/403/429.
    #[error("unexpected HTTP status {status} from provider: {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure (connection reset, DNS, TLS).
    #[error("network error: {0}")]
    Network(reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The provider appears in the settings snapshot but no API key was
    /// configured for it.
    #[error("provider '{0}' is not configured")]
    NotConfigured(sovscan_core::Provider),
}

impl ProviderError {
    /// `true` for errors worth retrying after a back-off delay: timeouts,
    /// transport failures, and upstream 5xx. Rate limits and auth failures
    /// are hard stops for the whole scan, not per-call retries.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout | ProviderError::Network(_) => true,
            ProviderError::Upstream { status, .. } => *status >= 500,
            ProviderError::RateLimited { .. }
            | ProviderError::AuthFailed { .. }
            | ProviderError::Deserialize { .. }
            | ProviderError::NotConfigured(_) => false,
        }
    }

    /// Classify a transport error from `reqwest`: request timeouts map to
    /// [`ProviderError::Timeout`], everything else stays a network error.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else {
            ProviderError::Network(err)
        }
    }
}

/// Pass a 2xx response through; classify anything else.
///
/// 401/403 become [`ProviderError::AuthFailed`], 429 becomes
/// [`ProviderError::RateLimited`] (honouring a numeric `Retry-After`), and
/// other statuses become [`ProviderError::Upstream`] with a truncated body.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    Err(match status.as_u16() {
        401 | 403 => ProviderError::AuthFailed {
            status: status.as_u16(),
        },
        429 => ProviderError::RateLimited { retry_after_secs },
        s => ProviderError::Upstream {
            status: s,
            message: truncate_body(&body),
        },
    })
}

/// Error bodies can be arbitrarily large; keep enough to diagnose.
fn truncate_body(body: &str) -> String {
    const MAX_LEN: usize = 512;
    if body.len() <= MAX_LEN {
        body.to_string()
    } else {
        let mut end = MAX_LEN;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &body[..end])
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
