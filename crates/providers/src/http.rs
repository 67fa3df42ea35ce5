//! Shared HTTP transport: per-request timeout and bounded retries with
//! exponential backoff. Whether a failing provider stays in rotation is
//! decided by the chain, not here.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use crate::types::ProviderError;

/// Wait before retry `attempt` (1-based): 1s, 2s, 4s, ... capped at 16s.
fn backoff_delay(attempt: usize) -> Duration {
    let exp = attempt.saturating_sub(1).min(4) as u32;
    Duration::from_millis(1000 * 2u64.pow(exp))
}

/// JSON-over-HTTPS client shared by all provider wire formats.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    provider: &'static str,
    timeout_secs: u64,
    max_retries: usize,
}

impl HttpTransport {
    pub fn new(provider: &'static str, timeout_secs: u64, max_retries: usize) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            provider,
            timeout_secs,
            max_retries: max_retries.max(1),
        })
    }

    /// POST a JSON body and return the parsed JSON reply.
    ///
    /// 5xx and 429 are retried with exponential backoff; other 4xx fail
    /// immediately, 401/403 as [`ProviderError::Unavailable`]. Transport
    /// errors are not retried.
    pub async fn post_json(
        &self,
        url: &Url,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        let mut last_err = None;
        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(attempt);
                tracing::debug!(
                    provider = self.provider,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying provider request"
                );
                tokio::time::sleep(delay).await;
            }

            let mut req = self.client.post(url.clone()).json(body);
            for (name, value) in headers {
                req = req.header(*name, *value);
            }

            match req.send().await {
                Ok(resp) if resp.status() == StatusCode::TOO_MANY_REQUESTS => {
                    last_err = Some(ProviderError::RateLimited {
                        attempts: attempt + 1,
                    });
                }
                Ok(resp) if resp.status().is_server_error() => {
                    let status = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();
                    last_err = Some(ProviderError::Http { status, body });
                }
                Ok(resp)
                    if matches!(resp.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) =>
                {
                    return Err(ProviderError::Unavailable(format!(
                        "credential rejected ({})",
                        resp.status()
                    )));
                }
                Ok(resp) if resp.status().is_client_error() => {
                    let status = resp.status().as_u16();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(ProviderError::Http { status, body });
                }
                Ok(resp) => {
                    return resp
                        .json::<serde_json::Value>()
                        .await
                        .map_err(|e| ProviderError::InvalidResponse(format!("body is not JSON: {e}")));
                }
                Err(e) => {
                    tracing::warn!(
                        provider = self.provider,
                        error = %e,
                        "Provider transport error"
                    );
                    if e.is_timeout() {
                        return Err(ProviderError::Timeout(self.timeout_secs));
                    }
                    return Err(ProviderError::Unavailable(format!("request failed: {e}")));
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            ProviderError::Unavailable("request failed after retries".into())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(3), Duration::from_secs(4));
        assert_eq!(backoff_delay(10), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let transport = HttpTransport::new("test", 2, 3).unwrap();
        // Port 9 (discard) on localhost is closed in test environments.
        let url = Url::parse("http://127.0.0.1:9/v1/messages").unwrap();
        let err = transport
            .post_json(&url, &[], &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Unavailable(_) | ProviderError::Timeout(_)
        ));
    }
}
