//! Configuration management with serde serialization/deserialization
//!
//! This module provides the run configuration for the stream checker along with
//! the value types that flow between pipeline stages.

use crate::{CheckerError, Protocol};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for a checking run
///
/// Every field has a default and can be overridden independently, either from a
/// JSON configuration file or from command-line flags.
///
/// # Examples
///
/// ```rust
/// use stream_checker::Config;
///
/// // Use default configuration
/// let config = Config::default();
///
/// // Create custom configuration
/// let config = Config {
///     max_workers: 8,
///     save_failed: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Number of concurrent probe workers (default: 20)
    ///
    /// This is a hard upper bound on in-flight network operations; extra
    /// candidates wait in the queue.
    pub max_workers: usize,

    /// Timeout for a single liveness probe (default: 6 seconds)
    pub check_timeout: Duration,

    /// Timeout for a single resolution inspection (default: 8 seconds)
    ///
    /// Usually longer than `check_timeout` since the inspector has to decode
    /// the first video frames.
    pub inspect_timeout: Duration,

    /// Timeout for downloading one subscription playlist (default: 30 seconds)
    pub download_timeout: Duration,

    /// Maximum download attempts per subscription (default: 2)
    pub retry_count: usize,

    /// A subscription fetch yielding fewer lines than this is retried (default: 1)
    ///
    /// The default only retries an empty fetch. Raise it to also retry
    /// partially successful downloads.
    pub retry_min_lines: usize,

    /// Protocols allowed to be probed; empty means all (default: empty)
    pub protocols: Vec<Protocol>,

    /// Host substrings that are never probed (default: empty)
    pub blocked_hosts: Vec<String>,

    /// Keep unreachable entries in the main output (default: false)
    pub save_failed: bool,

    /// Maximum kept entries sharing one name (default: unlimited)
    pub keep_per_name: Option<usize>,

    /// Maximum kept entries overall (default: unlimited)
    pub max_results: Option<usize>,

    /// Look up width and height for reachable streams (default: true)
    pub inspect_resolution: bool,

    /// Shape of the written output (default: lists)
    pub output_mode: OutputMode,

    /// Directory receiving result files and reports (default: "output")
    pub output_dir: PathBuf,

    /// Media inspection executable, also used to probe RTMP/RTSP (default: "ffprobe")
    pub ffprobe_path: String,

    /// Browser User-Agent strings, one is picked at random per request
    pub user_agents: Vec<String>,

    /// Handshake used for P3P endpoints
    pub p3p_handshake: HandshakeConfig,

    /// Handshake used for P2P endpoints
    pub p2p_handshake: HandshakeConfig,

    /// Write a Prometheus text exposition of run metrics to the report directory (default: false)
    pub export_metrics: bool,

    /// Minimum log severity: DEBUG, INFO, WARN or ERROR (default: INFO)
    pub log_level: String,

    /// Remote subscription playlists to download
    pub sources: Vec<String>,

    /// Local playlist files to read
    pub local_files: Vec<PathBuf>,

    /// Interval between progress log lines during probing (default: 10 seconds)
    pub progress_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: 20,
            check_timeout: Duration::from_secs(6),
            inspect_timeout: Duration::from_secs(8),
            download_timeout: Duration::from_secs(30),
            retry_count: 2,
            retry_min_lines: 1,
            protocols: Vec::new(),
            blocked_hosts: Vec::new(),
            save_failed: false,
            keep_per_name: None,
            max_results: None,
            inspect_resolution: true,
            output_mode: OutputMode::Lists,
            output_dir: PathBuf::from("output"),
            ffprobe_path: "ffprobe".to_string(),
            user_agents: default_user_agents(),
            p3p_handshake: HandshakeConfig::p3p(),
            p2p_handshake: HandshakeConfig::p2p(),
            export_metrics: false,
            log_level: "INFO".to_string(),
            sources: Vec::new(),
            local_files: Vec::new(),
            progress_interval: Some(Duration::from_secs(10)),
        }
    }
}

impl Config {
    /// Load a JSON configuration file; missing fields take their defaults.
    pub async fn from_file(path: &std::path::Path) -> Result<Self, CheckerError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn validate(&self) -> Result<(), CheckerError> {
        if self.max_workers == 0 {
            return Err(CheckerError::Configuration(
                "max_workers must be greater than 0".to_string(),
            ));
        }

        if self.check_timeout.is_zero() || self.inspect_timeout.is_zero() {
            return Err(CheckerError::Configuration(
                "check and inspect timeouts must be greater than 0".to_string(),
            ));
        }

        if self.download_timeout.is_zero() {
            return Err(CheckerError::Configuration(
                "download_timeout must be greater than 0".to_string(),
            ));
        }

        if self.retry_count == 0 {
            return Err(CheckerError::Configuration(
                "retry_count must be greater than 0".to_string(),
            ));
        }

        if self.keep_per_name == Some(0) || self.max_results == Some(0) {
            return Err(CheckerError::Configuration(
                "retention caps must be greater than 0 when set".to_string(),
            ));
        }

        if self.user_agents.is_empty() {
            return Err(CheckerError::Configuration(
                "at least one user agent is required".to_string(),
            ));
        }

        self.tracing_level()?;

        Ok(())
    }

    pub fn tracing_level(&self) -> Result<tracing::Level, CheckerError> {
        self.log_level
            .parse::<tracing::Level>()
            .map_err(|_| CheckerError::Configuration(format!("invalid log level: {}", self.log_level)))
    }

    /// Whether candidates using `protocol` may be scheduled.
    pub fn allows_protocol(&self, protocol: Protocol) -> bool {
        self.protocols.is_empty() || self.protocols.contains(&protocol)
    }

    /// Whether `host` matches one of the blocked host substrings.
    pub fn is_blocked_host(&self, host: &str) -> bool {
        self.blocked_hosts
            .iter()
            .any(|blocked| !blocked.is_empty() && host.contains(blocked.as_str()))
    }
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/90.0.4430.93 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.82 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/88.0.4324.150 Safari/537.36",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Request line and success marker for the stream-socket handshake protocols
///
/// The request is rendered as `"{method} {path} {version}\r\nHost: {host}\r\n\r\n"`
/// and the probe succeeds when `marker` appears in the first response bytes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HandshakeConfig {
    pub method: String,
    pub version: String,
    pub marker: String,
}

impl HandshakeConfig {
    pub fn p3p() -> Self {
        Self {
            method: "GET".to_string(),
            version: "P3P/1.0".to_string(),
            marker: "P3P".to_string(),
        }
    }

    pub fn p2p() -> Self {
        Self {
            method: "GET".to_string(),
            version: "P2P/1.0".to_string(),
            marker: "P2P".to_string(),
        }
    }

    pub fn request(&self, host: &str, path: &str) -> String {
        format!(
            "{} {} {}\r\nHost: {}\r\n\r\n",
            self.method, path, self.version, host
        )
    }
}

/// Layout of the written results
///
/// - Lists: whitelist, whitelist tv list and blacklist files with a header block
/// - Detailed: a single result file with reachability, latency and resolution columns
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    Lists,
    Detailed,
}

impl std::str::FromStr for OutputMode {
    type Err = CheckerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lists" => Ok(OutputMode::Lists),
            "detailed" => Ok(OutputMode::Detailed),
            other => Err(CheckerError::Configuration(format!("unknown output mode: {other}"))),
        }
    }
}

/// Video dimensions reported by the media inspector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Outcome of checking one candidate
///
/// `elapsed_ms` is `None` only when the probe itself errored (DNS failure,
/// refused connection, timeout, malformed URL). A clean protocol-level
/// "no" still carries the elapsed time.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub name: String,
    pub url: String,
    pub protocol: Protocol,
    pub reachable: bool,
    pub elapsed_ms: Option<f64>,
    pub resolution: Option<Resolution>,
    pub error: Option<CheckerError>,
}

impl ProbeResult {
    pub fn width(&self) -> Option<u32> {
        self.resolution.map(|r| r.width)
    }

    pub fn height(&self) -> Option<u32> {
        self.resolution.map(|r| r.height)
    }

    /// `name,url` as used for sorting failures and in blacklist files.
    pub fn name_url(&self) -> String {
        format!("{},{}", self.name, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_workers, 20);
        assert_eq!(config.check_timeout, Duration::from_secs(6));
        assert_eq!(config.inspect_timeout, Duration::from_secs(8));
        assert_eq!(config.retry_count, 2);
        assert_eq!(config.retry_min_lines, 1);
        assert!(config.protocols.is_empty());
        assert!(!config.save_failed);
        assert!(config.keep_per_name.is_none());
        assert!(config.max_results.is_none());
        assert!(config.inspect_resolution);
        assert_eq!(config.output_mode, OutputMode::Lists);
        assert_eq!(config.user_agents.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let json = r#"{
            "max_workers": 5,
            "protocols": ["http", "rtmp"],
            "keep_per_name": 2,
            "output_mode": "detailed",
            "check_timeout": { "secs": 3, "nanos": 0 }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_workers, 5);
        assert_eq!(config.protocols, vec![Protocol::Http, Protocol::Rtmp]);
        assert_eq!(config.keep_per_name, Some(2));
        assert_eq!(config.output_mode, OutputMode::Detailed);
        assert_eq!(config.check_timeout, Duration::from_secs(3));
        assert_eq!(config.inspect_timeout, Duration::from_secs(8));
        assert_eq!(config.ffprobe_path, "ffprobe");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero_workers = Config {
            max_workers: 0,
            ..Default::default()
        };
        assert!(zero_workers.validate().is_err());

        let zero_cap = Config {
            keep_per_name: Some(0),
            ..Default::default()
        };
        assert!(zero_cap.validate().is_err());

        let bad_level = Config {
            log_level: "LOUD".to_string(),
            ..Default::default()
        };
        assert!(bad_level.validate().is_err());

        let no_agents = Config {
            user_agents: Vec::new(),
            ..Default::default()
        };
        assert!(no_agents.validate().is_err());
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let config = Config {
            log_level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(config.tracing_level().unwrap(), tracing::Level::WARN);
    }

    #[test]
    fn test_allows_protocol() {
        let all = Config::default();
        assert!(all.allows_protocol(Protocol::Rtp));

        let http_only = Config {
            protocols: vec![Protocol::Http],
            ..Default::default()
        };
        assert!(http_only.allows_protocol(Protocol::Http));
        assert!(!http_only.allows_protocol(Protocol::Https));
    }

    #[test]
    fn test_blocked_hosts() {
        let config = Config {
            blocked_hosts: vec!["127.0.0.1:8080".to_string(), "qcloudcdn.com".to_string()],
            ..Default::default()
        };
        assert!(config.is_blocked_host("127.0.0.1:8080"));
        assert!(config.is_blocked_host("newcntv.qcloudcdn.com"));
        assert!(!config.is_blocked_host("example.com"));
    }

    #[test]
    fn test_handshake_request() {
        let request = HandshakeConfig::p3p().request("peer.local", "/live/1");
        assert_eq!(request, "GET /live/1 P3P/1.0\r\nHost: peer.local\r\n\r\n");
    }
}
