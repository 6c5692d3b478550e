use super::{Endpoint, ProbeOutcome, ProtocolProber};
use crate::{CheckerError, HandshakeConfig};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const RESPONSE_LIMIT: usize = 1024;

/// Stream-socket handshake used by the P2P and P3P schemes.
///
/// Sends one request line naming the URL path and looks for the configured
/// marker in the first response bytes. URLs without host, port or path are
/// a clean failure rather than an error.
pub struct HandshakeProber {
    handshake: HandshakeConfig,
}

impl HandshakeProber {
    pub fn new(handshake: HandshakeConfig) -> Self {
        Self { handshake }
    }

    async fn exchange(&self, url: &str) -> ProbeOutcome {
        let endpoint = Endpoint::parse(url)?;
        let Some(port) = endpoint.port else {
            debug!("Handshake probe skipped, no port in {}", url);
            return Ok(false);
        };
        if endpoint.path.is_empty() {
            debug!("Handshake probe skipped, no path in {}", url);
            return Ok(false);
        }

        let mut stream = TcpStream::connect((endpoint.host.as_str(), port))
            .await
            .map_err(|e| CheckerError::Network(format!("connect {}:{port}: {e}", endpoint.host)))?;

        let request = self.handshake.request(&endpoint.host, &endpoint.path);
        stream.write_all(request.as_bytes()).await?;

        let mut buf = vec![0u8; RESPONSE_LIMIT];
        let n = stream.read(&mut buf).await?;
        Ok(contains(&buf[..n], self.handshake.marker.as_bytes()))
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

#[async_trait]
impl ProtocolProber for HandshakeProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        tokio::time::timeout(timeout, self.exchange(url))
            .await
            .map_err(|_| CheckerError::Timeout(timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn peer(reply: &'static [u8]) -> (std::net::SocketAddr, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 512];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(reply).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        (addr, handle)
    }

    #[tokio::test]
    async fn test_marker_present() {
        let (addr, handle) = peer(b"P3P/1.0 200 OK\r\n\r\n").await;
        let prober = HandshakeProber::new(HandshakeConfig::p3p());

        let url = format!("p3p://{addr}/live/7");
        assert!(prober.probe(&url, Duration::from_secs(5)).await.unwrap());

        let request = handle.await.unwrap();
        assert!(request.starts_with("GET /live/7 P3P/1.0\r\n"));
    }

    #[tokio::test]
    async fn test_marker_absent() {
        let (addr, _handle) = peer(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
        let prober = HandshakeProber::new(HandshakeConfig::p2p());

        let url = format!("p2p://{addr}/live/7");
        assert!(!prober.probe(&url, Duration::from_secs(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_path_or_port_is_clean_failure() {
        let prober = HandshakeProber::new(HandshakeConfig::p3p());
        assert!(!prober.probe("p3p://127.0.0.1:9", Duration::from_secs(1)).await.unwrap());
        assert!(!prober.probe("p3p://127.0.0.1/ch", Duration::from_secs(1)).await.unwrap());
    }

    #[test]
    fn test_contains() {
        assert!(contains(b"xxP3Pxx", b"P3P"));
        assert!(!contains(b"xxP2xx", b"P3P"));
        assert!(!contains(b"", b"P3P"));
    }
}
