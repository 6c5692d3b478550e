use super::{Endpoint, ProbeOutcome, ProtocolProber};
use crate::CheckerError;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};

/// Sends an empty datagram and waits for any reply.
///
/// The socket is connected so that ICMP port-unreachable surfaces as an
/// error on receive instead of a silent timeout.
pub struct RtpProber;

impl RtpProber {
    async fn exchange(url: &str) -> ProbeOutcome {
        let endpoint = Endpoint::parse(url)?;
        let port = endpoint
            .port
            .ok_or_else(|| CheckerError::InvalidUrl(format!("missing port in {url}")))?;

        let target = lookup_host((endpoint.host.as_str(), port))
            .await
            .map_err(|e| CheckerError::Network(format!("resolve {}: {e}", endpoint.host)))?
            .next()
            .ok_or_else(|| CheckerError::Network(format!("no address for {}", endpoint.host)))?;

        let bind_addr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(target).await?;
        socket.send(&[]).await?;

        let mut buf = [0u8; 1];
        socket.recv(&mut buf).await?;
        Ok(true)
    }
}

#[async_trait]
impl ProtocolProber for RtpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        tokio::time::timeout(timeout, Self::exchange(url))
            .await
            .map_err(|_| CheckerError::Timeout(timeout))?
    }
}
