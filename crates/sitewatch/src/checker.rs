use std::error::Error as StdError;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::debug;

use crate::config::CheckerConfig;
use crate::error::Result;
use crate::types::{CheckOutcome, OfflineReason};

/// Performs a single reachability probe.
///
/// Implementations never fail: every failure mode is folded into
/// [`CheckOutcome::Offline`]. They must not touch the registry.
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, url: &str) -> CheckOutcome;
}

/// HTTP GET checker. Only a 200 response counts as online.
pub struct HttpChecker {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpChecker {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_user_agent(timeout, CheckerConfig::default_user_agent())
    }

    pub fn with_user_agent(timeout: Duration, user_agent: impl AsRef<str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.as_ref())
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn from_config(config: &CheckerConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.max(1));
        Self::with_user_agent(timeout, &config.user_agent)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn describe_error(&self, error: &reqwest::Error) -> String {
        if error.is_timeout() {
            return format!("request timed out after {}s", self.timeout.as_secs_f32());
        }

        // reqwest's top-level message hides the cause (refused, DNS, TLS)
        let mut message = error.to_string();
        let mut source = StdError::source(error);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, url: &str) -> CheckOutcome {
        let start = Instant::now();

        match self.client.get(url).send().await {
            Ok(response) => {
                let latency = start.elapsed().as_millis() as u64;
                let status = response.status();
                debug!(url, status = status.as_u16(), latency_ms = latency, "HTTP check finished");

                if status == StatusCode::OK {
                    CheckOutcome::online(latency)
                } else {
                    CheckOutcome::offline(OfflineReason::Status(status.as_u16()))
                }
            }
            Err(e) => {
                let reason = self.describe_error(&e);
                debug!(url, error = %reason, "HTTP check failed");
                CheckOutcome::offline(OfflineReason::Network(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `response` verbatim to every connection and return the base URL
    async fn serve(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let _ = stream.read(&mut buf).await;
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_200_is_online() {
        let url =
            serve("HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nOK").await;
        let checker = HttpChecker::new(Duration::from_secs(5)).unwrap();

        let outcome = checker.check(&url).await;
        assert!(outcome.is_online(), "unexpected outcome: {outcome:?}");
    }

    #[tokio::test]
    async fn test_500_is_offline_with_status() {
        let url = serve(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        let checker = HttpChecker::new(Duration::from_secs(5)).unwrap();

        let outcome = checker.check(&url).await;
        assert_eq!(outcome, CheckOutcome::offline(OfflineReason::Status(500)));
    }

    #[tokio::test]
    async fn test_other_success_codes_are_offline() {
        let url = serve("HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n").await;
        let checker = HttpChecker::new(Duration::from_secs(5)).unwrap();

        let outcome = checker.check(&url).await;
        assert_eq!(outcome, CheckOutcome::offline(OfflineReason::Status(204)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let checker = HttpChecker::new(Duration::from_secs(5)).unwrap();
        let outcome = checker.check(&format!("http://{addr}/")).await;

        match outcome {
            CheckOutcome::Offline { reason: OfflineReason::Network(message) } => {
                assert!(!message.is_empty());
            }
            other => panic!("expected network failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold connections open without ever answering
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let checker = HttpChecker::new(Duration::from_millis(300)).unwrap();
        let outcome = checker.check(&format!("http://{addr}/")).await;

        match outcome {
            CheckOutcome::Offline { reason: OfflineReason::Network(message) } => {
                assert!(message.contains("timed out"), "message: {message}");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_from_config_clamps_zero_timeout() {
        let config = CheckerConfig { timeout_seconds: 0, ..CheckerConfig::default() };
        let checker = HttpChecker::from_config(&config).unwrap();
        assert_eq!(checker.timeout(), Duration::from_secs(1));
    }
}
