//! Per-host tally of probe errors, shared by all workers for one run.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Thread-safe counter of probe errors keyed by host authority.
///
/// Cloning is cheap and yields a handle onto the same counts. Increments go
/// through the map's shard lock so concurrent updates are never lost.
#[derive(Debug, Clone, Default)]
pub struct HostFailureCounter {
    counts: Arc<DashMap<String, usize>>,
}

impl HostFailureCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure for `host`, returning the new total. Empty hosts are ignored.
    pub fn record(&self, host: &str) -> usize {
        if host.is_empty() {
            return 0;
        }
        let mut entry = self.counts.entry(host.to_string()).or_insert(0);
        *entry += 1;
        let total = *entry;
        drop(entry);

        debug!("Recorded failing host {} (total: {})", host, total);
        total
    }

    pub fn count(&self, host: &str) -> usize {
        self.counts.get(host).map(|c| *c).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Counts sorted by descending total, ties broken by host name.
    pub fn snapshot(&self) -> Vec<(String, usize)> {
        let mut entries: Vec<(String, usize)> = self
            .counts
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    /// Take the sorted snapshot and reset the counter.
    pub fn drain(&self) -> Vec<(String, usize)> {
        let entries = self.snapshot();
        self.counts.clear();
        entries
    }
}

/// Host authority of a URL: scheme and path stripped, port kept.
///
/// Falls back to plain string slicing for URLs the parser rejects so that
/// malformed entries still get attributed to something recognisable.
pub fn host_of(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            return match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            };
        }
    }

    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let authority = rest
        .split(|c| matches!(c, '/' | '?' | '#'))
        .next()
        .unwrap_or_default();
    authority
        .rsplit_once('@')
        .map(|(_, host)| host)
        .unwrap_or(authority)
        .to_string()
}
