//! # Stream Checker
//!
//! A concurrent health checker for live-stream playlists. Candidate URLs are
//! gathered from subscription playlists and local files, normalized, probed
//! under a bounded worker pool, and written back out as ranked whitelist and
//! blacklist playlists together with a per-host failure report.
//!
//! ## Pipeline
//!
//! | Stage | Module | Concurrency |
//! |-------|--------|-------------|
//! | Load lines | [`sources`] | subscriptions fetched concurrently |
//! | Split, clean, dedup | [`normalizer`] | sequential |
//! | Probe + inspect | [`worker`], [`checker`], [`prober`], [`inspector`] | bounded by `max_workers` |
//! | Sort and cap | [`aggregator`] | sequential |
//! | Write files | [`report`] | sequential |
//!
//! ## Supported protocols
//!
//! | Scheme | Liveness check |
//! |--------|----------------|
//! | `http`, `https` | `GET` returns exactly 200 |
//! | `rtmp`, `rtsp` | external probe tool exits with 0 |
//! | `rtp` | an empty datagram gets any reply |
//! | `p3p`, `p2p` | handshake response contains the protocol marker |
//!
//! Every other scheme is reported unreachable without touching the network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stream_checker::{normalize, BatchProcessor, Config, HostFailureCounter, Metrics, StreamChecker};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let candidates = normalize(&["CCTV1,http://example.com/live.m3u8#http://backup.example.com/live.m3u8"]);
//!
//!     let checker = StreamChecker::from_config(config, HostFailureCounter::new(), Arc::new(Metrics::new()))?;
//!     let report = BatchProcessor::new(Arc::new(checker)).process_batch(candidates).await;
//!     println!("{} of {} reachable", report.reachable(), report.results.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! stream-checker check --file channels.txt --urls https://example.com/live.m3u --threads 30
//! stream-checker probe rtmp://example.com/live/stream
//! stream-checker validate config.json
//! ```

/// Ranking, per-name and global caps over probe results
pub mod aggregator;

/// Per-candidate probe, timing and resolution lookup
pub mod checker;

/// Command-line interface implementation
pub mod cli;

/// Configuration and the value types shared between stages
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// Per-host tally of probe errors
pub mod host_failures;

/// Video resolution lookup through an external media tool
pub mod inspector;

/// Run metrics and the optional Prometheus exporter
pub mod metrics;

/// Split, clean and deduplicate raw playlist lines
pub mod normalizer;

/// Protocol-specific liveness probes
pub mod prober;

/// URL scheme classification
pub mod protocol;

/// Output files and reports
pub mod report;

/// Subscription downloads and local playlist files
pub mod sources;

/// Utility functions and helpers
pub mod utils;

/// Bounded worker pool running checks concurrently
pub mod worker;


pub use crate::metrics::*;
pub use aggregator::*;
pub use checker::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use host_failures::*;
pub use inspector::*;
pub use normalizer::*;
pub use prober::*;
pub use protocol::*;
pub use report::*;
pub use sources::*;
pub use utils::*;
pub use worker::*;
