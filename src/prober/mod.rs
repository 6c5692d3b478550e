//! Protocol-specific liveness checks
//!
//! Each supported [`Protocol`] maps to one [`ProtocolProber`] implementation
//! held in a [`ProberRegistry`]. Adding a protocol means adding a variant and
//! registering an implementation; dispatch never branches on strings.
//!
//! A prober answers with `Ok(true)` / `Ok(false)` for a clean protocol-level
//! verdict and `Err(_)` when the check itself failed (DNS, refused
//! connection, timeout, malformed URL). The caller turns errors into an
//! unreachable result and attributes them to the host.

use crate::{CheckerError, Config, Protocol};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

mod handshake;
mod http;
mod rtp;
mod stream;

pub use handshake::HandshakeProber;
pub use http::HttpProber;
pub use rtp::RtpProber;
pub use stream::StreamToolProber;

/// `Ok(reachable)` for a clean verdict, `Err` when the check itself failed.
pub type ProbeOutcome = Result<bool, CheckerError>;

#[async_trait]
pub trait ProtocolProber: Send + Sync {
    /// Check one URL, never blocking past `timeout`.
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}

/// Lookup table from protocol to prober
#[derive(Clone, Default)]
pub struct ProberRegistry {
    probers: HashMap<Protocol, Arc<dyn ProtocolProber>>,
}

impl ProberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in prober for every supported protocol.
    pub fn from_config(config: &Config) -> Result<Self, CheckerError> {
        let http: Arc<dyn ProtocolProber> = Arc::new(HttpProber::new(config)?);
        let stream: Arc<dyn ProtocolProber> =
            Arc::new(StreamToolProber::new(config.ffprobe_path.clone()));

        let mut registry = Self::new();
        registry.register(Protocol::Http, http.clone());
        registry.register(Protocol::Https, http);
        registry.register(Protocol::Rtmp, stream.clone());
        registry.register(Protocol::Rtsp, stream);
        registry.register(Protocol::Rtp, Arc::new(RtpProber));
        registry.register(
            Protocol::P3p,
            Arc::new(HandshakeProber::new(config.p3p_handshake.clone())),
        );
        registry.register(
            Protocol::P2p,
            Arc::new(HandshakeProber::new(config.p2p_handshake.clone())),
        );
        Ok(registry)
    }

    pub fn register(&mut self, protocol: Protocol, prober: Arc<dyn ProtocolProber>) {
        self.probers.insert(protocol, prober);
    }

    pub fn get(&self, protocol: Protocol) -> Option<&Arc<dyn ProtocolProber>> {
        self.probers.get(&protocol)
    }

    /// Dispatch to the prober for `protocol`; protocols without one report unreachable.
    pub async fn probe(&self, protocol: Protocol, url: &str, timeout: Duration) -> ProbeOutcome {
        match self.get(protocol) {
            Some(prober) => prober.probe(url, timeout).await,
            None => {
                warn!("Unsupported protocol for {}", url);
                Ok(false)
            }
        }
    }
}

/// Host, port and path pulled out of a socket-level stream URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
}

impl Endpoint {
    pub fn parse(url: &str) -> Result<Self, CheckerError> {
        let parsed = url::Url::parse(url)?;
        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CheckerError::InvalidUrl(format!("missing host in {url}")))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();

        Ok(Self {
            host,
            port: parsed.port(),
            path: parsed.path().to_string(),
        })
    }
}
