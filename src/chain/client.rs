//! JSON-over-HTTP access to public chain APIs.
//!
//! All calls are read-only GETs. Transient failures (timeouts, dropped
//! connections, 5xx, 429) are retried with bounded exponential backoff;
//! anything else is returned to the caller immediately.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp;
use std::error::Error as _;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("invalid client configuration: {0}")]
    Config(String),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream returned HTTP {0}")]
    HttpStatus(u16),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("gave up after {attempts} attempts: {last_error}")]
    RetryExhausted {
        attempts: u32,
        last_error: Box<ChainError>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 250,
            max_delay_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub retry: RetryConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            connect_timeout_ms: 3_000,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonClient {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl JsonClient {
    pub fn new(cfg: &HttpConfig) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
            .user_agent(concat!("zeyo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ChainError::Config(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            retry: cfg.retry.clone(),
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, op: &'static str, url: &str) -> Result<T, ChainError> {
        let resp = self.send_with_retry(op, url).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChainError::HttpStatus(status.as_u16()));
        }
        resp.json::<T>()
            .await
            .map_err(|e| ChainError::Decode(e.to_string()))
    }

    /// Like [`get_json`](Self::get_json) but a 404 means "no such record".
    pub async fn get_json_optional<T: DeserializeOwned>(
        &self,
        op: &'static str,
        url: &str,
    ) -> Result<Option<T>, ChainError> {
        let resp = self.send_with_retry(op, url).await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ChainError::HttpStatus(status.as_u16()));
        }
        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| ChainError::Decode(e.to_string()))
    }

    async fn send_with_retry(&self, op: &'static str, url: &str) -> Result<reqwest::Response, ChainError> {
        let attempts = cmp::max(1, self.retry.max_attempts);
        let seed = seed_from(url);
        let mut last_err: Option<ChainError> = None;

        for attempt in 1..=attempts {
            log::debug!("{op}: GET {url} (attempt {attempt}/{attempts})");

            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if !is_transient_status(status) {
                        return Ok(resp);
                    }
                    let err = ChainError::HttpStatus(status.as_u16());
                    if attempt == attempts {
                        return Err(ChainError::RetryExhausted {
                            attempts,
                            last_error: Box::new(err),
                        });
                    }
                    let delay_ms = backoff_delay_ms(&self.retry, attempt, seed);
                    log::warn!(
                        "{op}: transient HTTP {} from upstream; retrying in {delay_ms}ms",
                        status.as_u16()
                    );
                    last_err = Some(err);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(e) => {
                    let transient = is_transient_reqwest_error(&e);
                    let err = map_send_error(&e);
                    if !transient {
                        return Err(err);
                    }
                    if attempt == attempts {
                        return Err(ChainError::RetryExhausted {
                            attempts,
                            last_error: Box::new(err),
                        });
                    }
                    let delay_ms = backoff_delay_ms(&self.retry, attempt, seed);
                    log::warn!("{op}: transport error ({e}); retrying in {delay_ms}ms");
                    last_err = Some(err);
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }

        Err(ChainError::RetryExhausted {
            attempts,
            last_error: Box::new(
                last_err.unwrap_or_else(|| ChainError::Network("unknown error".to_string())),
            ),
        })
    }
}

pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

fn is_transient_reqwest_error(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_connect() {
        return true;
    }
    let mut src = err.source();
    while let Some(e) = src {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            );
        }
        src = e.source();
    }
    false
}

fn map_send_error(err: &reqwest::Error) -> ChainError {
    if err.is_timeout() {
        ChainError::Timeout
    } else if err.is_builder() {
        ChainError::Config(err.to_string())
    } else {
        ChainError::Network(err.to_string())
    }
}

fn seed_from(url: &str) -> u64 {
    // FNV-1a
    url.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

fn jitter_ms(seed: u64, attempt: u32, max_jitter_ms: u64) -> u64 {
    if max_jitter_ms == 0 {
        return 0;
    }
    let mut x = seed ^ u64::from(attempt).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    x = x.wrapping_mul(0x2545_F491_4F6C_DD1D);
    x % (max_jitter_ms + 1)
}

/// Exponential backoff for a 1-based attempt, capped, plus up to 50% jitter.
fn backoff_delay_ms(retry: &RetryConfig, attempt: u32, seed: u64) -> u64 {
    let exp = attempt.saturating_sub(1);
    let mult = 1u64.checked_shl(exp).unwrap_or(u64::MAX);
    let base = retry.base_delay_ms.saturating_mul(mult);
    let capped = cmp::min(base, retry.max_delay_ms);
    capped.saturating_add(jitter_ms(seed, attempt, capped / 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves the given (status, body) pairs in order, one per connection.
    async fn scripted_server(responses: Vec<(u16, &'static str)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            for (status, body) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        format!("http://{addr}")
    }

    fn fast_client(max_attempts: u32) -> JsonClient {
        JsonClient::new(&HttpConfig {
            request_timeout_ms: 2_000,
            connect_timeout_ms: 1_000,
            retry: RetryConfig {
                max_attempts,
                base_delay_ms: 1,
                max_delay_ms: 5,
            },
        })
        .expect("client")
    }

    #[test]
    fn only_5xx_and_429_are_transient() {
        assert!(is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
        assert!(!is_transient_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn backoff_grows_and_stays_bounded() {
        let retry = RetryConfig {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        };
        let first = backoff_delay_ms(&retry, 1, 42);
        assert!((100..=150).contains(&first));
        for attempt in 1..40 {
            assert!(backoff_delay_ms(&retry, attempt, 42) <= 1_500);
        }
        assert_eq!(backoff_delay_ms(&retry, 3, 7), backoff_delay_ms(&retry, 3, 7));
    }

    #[test]
    fn joins_urls_without_double_slashes() {
        assert_eq!(join_url("https://a.io/", "/v2/x"), "https://a.io/v2/x");
        assert_eq!(join_url("https://a.io/api", "periods/"), "https://a.io/api/periods/");
    }

    #[tokio::test]
    async fn retries_transient_status_then_succeeds() {
        let base = scripted_server(vec![(503, "{}"), (200, r#"{"amount": 7}"#)]).await;
        let value: serde_json::Value = fast_client(3)
            .get_json("test", &join_url(&base, "/x"))
            .await
            .expect("eventual success");
        assert_eq!(value["amount"], 7);
    }

    #[tokio::test]
    async fn reports_exhaustion_after_max_attempts() {
        let base = scripted_server(vec![(500, "{}"), (502, "{}")]).await;
        let err = fast_client(2)
            .get_json::<serde_json::Value>("test", &join_url(&base, "/x"))
            .await
            .unwrap_err();
        match err {
            ChainError::RetryExhausted { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last_error, ChainError::HttpStatus(502)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn not_found_is_none_for_optional_lookups() {
        let base = scripted_server(vec![(404, "{}"), (400, "{}")]).await;
        let client = fast_client(3);
        let missing: Option<serde_json::Value> = client
            .get_json_optional("test", &join_url(&base, "/gone"))
            .await
            .expect("404 is not an error");
        assert!(missing.is_none());

        let err = client
            .get_json_optional::<serde_json::Value>("test", &join_url(&base, "/bad"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::HttpStatus(400)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let base = scripted_server(vec![(200, "not json")]).await;
        let err = fast_client(1)
            .get_json::<serde_json::Value>("test", &join_url(&base, "/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Decode(_)));
    }
}
