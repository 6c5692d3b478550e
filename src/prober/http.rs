use super::{ProbeOutcome, ProtocolProber};
use crate::{random_user_agent, CheckerError, Config};
use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client, StatusCode};
use std::time::Duration;
use tracing::debug;

/// GET with a random browser User-Agent; reachable iff the status is exactly 200.
pub struct HttpProber {
    client: Client,
    user_agents: Vec<String>,
}

impl HttpProber {
    pub fn new(config: &Config) -> Result<Self, CheckerError> {
        let client = Client::builder()
            .timeout(config.check_timeout)
            .connect_timeout(config.check_timeout)
            .no_proxy()
            .build()
            .map_err(|e| CheckerError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            user_agents: config.user_agents.clone(),
        })
    }
}

#[async_trait]
impl ProtocolProber for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, random_user_agent(&self.user_agents))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CheckerError::Timeout(timeout)
                } else {
                    CheckerError::from(e)
                }
            })?;

        let status = response.status();
        debug!("HTTP probe {} returned {}", url, status);
        Ok(status == StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let response = format!("{status_line}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });

        format!("http://{addr}/live.m3u8")
    }

    #[tokio::test]
    async fn test_status_200_is_reachable() {
        let url = serve_once("HTTP/1.1 200 OK").await;
        let prober = HttpProber::new(&Config::default()).unwrap();
        assert!(prober.probe(&url, Duration::from_secs(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_404_is_a_clean_failure() {
        let url = serve_once("HTTP/1.1 404 Not Found").await;
        let prober = HttpProber::new(&Config::default()).unwrap();
        assert!(!prober.probe(&url, Duration::from_secs(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_refused_connection_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let prober = HttpProber::new(&Config::default()).unwrap();
        let outcome = prober.probe(&format!("http://{addr}/"), Duration::from_secs(5)).await;
        assert!(outcome.is_err());
    }
}
