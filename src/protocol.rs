//! Stream protocols recognised by the prober, derived from the URL scheme.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of schemes the checker knows how to probe.
///
/// Anything else maps to [`Protocol::Unsupported`], which always reports
/// an unreachable result without touching the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
    Rtmp,
    Rtsp,
    Rtp,
    P3p,
    P2p,
    Unsupported,
}

impl Protocol {
    pub const ALL: [Protocol; 8] = [
        Protocol::Http,
        Protocol::Https,
        Protocol::Rtmp,
        Protocol::Rtsp,
        Protocol::Rtp,
        Protocol::P3p,
        Protocol::P2p,
        Protocol::Unsupported,
    ];

    /// Classify a URL by its scheme prefix (the part before `://`).
    pub fn from_url(url: &str) -> Self {
        match url.split_once("://") {
            Some((scheme, _)) => Self::from_scheme(scheme),
            None => Protocol::Unsupported,
        }
    }

    pub fn from_scheme(scheme: &str) -> Self {
        match scheme.trim().to_ascii_lowercase().as_str() {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            "rtmp" => Protocol::Rtmp,
            "rtsp" => Protocol::Rtsp,
            "rtp" => Protocol::Rtp,
            "p3p" => Protocol::P3p,
            "p2p" => Protocol::P2p,
            _ => Protocol::Unsupported,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Rtmp => "rtmp",
            Protocol::Rtsp => "rtsp",
            Protocol::Rtp => "rtp",
            Protocol::P3p => "p3p",
            Protocol::P2p => "p2p",
            Protocol::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Protocol::Unsupported)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = crate::CheckerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Protocol::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| crate::CheckerError::Configuration(format!("unknown protocol: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url() {
        assert_eq!(Protocol::from_url("http://x/1"), Protocol::Http);
        assert_eq!(Protocol::from_url("HTTPS://x/1"), Protocol::Https);
        assert_eq!(Protocol::from_url("rtmp://live/app"), Protocol::Rtmp);
        assert_eq!(Protocol::from_url("rtsp://cam:554/s"), Protocol::Rtsp);
        assert_eq!(Protocol::from_url("rtp://239.0.0.1:5000"), Protocol::Rtp);
        assert_eq!(Protocol::from_url("p3p://h:1/x"), Protocol::P3p);
        assert_eq!(Protocol::from_url("p2p://h:1/x"), Protocol::P2p);
        assert_eq!(Protocol::from_url("foo://bar"), Protocol::Unsupported);
        assert_eq!(Protocol::from_url("no-scheme"), Protocol::Unsupported);
    }

    #[test]
    fn test_rtp_is_not_confused_with_rtmp_or_rtsp() {
        assert_ne!(Protocol::from_url("rtmp://a"), Protocol::Rtp);
        assert_ne!(Protocol::from_url("rtsp://a"), Protocol::Rtp);
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&Protocol::Rtsp).unwrap();
        assert_eq!(json, "\"rtsp\"");
        let back: Protocol = serde_json::from_str("\"p3p\"").unwrap();
        assert_eq!(back, Protocol::P3p);
    }
}
