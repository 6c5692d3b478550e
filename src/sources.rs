//! Raw playlist lines from subscriptions and local files.

use crate::{
    is_m3u_url, is_playlist_entry, random_user_agent, CheckerError, Config, GENRE_MARKER,
    SCHEME_SEPARATOR,
};
use futures::future::join_all;
use reqwest::{header::USER_AGENT, Client};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Line count contributed by one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub source: String,
    pub lines: usize,
    pub attempts: usize,
}

/// Convert an extended M3U playlist into `name,url` lines.
///
/// `#EXTINF` supplies the name (text after its last comma) for the URL lines
/// that follow it; other directives are ignored.
pub fn convert_m3u(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut name = String::new();

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("#EXTM3U") {
            continue;
        }
        if line.starts_with("#EXTINF") {
            name = line
                .rsplit_once(',')
                .map(|(_, title)| title.trim().to_string())
                .unwrap_or_default();
        } else if !line.starts_with('#') && line.contains(SCHEME_SEPARATOR) {
            lines.push(format!("{name},{line}"));
        }
    }

    lines
}

/// Keep the `name,url` entries of a plain-text playlist.
pub fn filter_text_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| is_playlist_entry(line))
        .map(String::from)
        .collect()
}

/// Interpret a downloaded payload according to the subscription URL.
pub fn parse_payload(url: &str, content: &str) -> Vec<String> {
    if is_m3u_url(url) {
        convert_m3u(content)
    } else {
        filter_text_lines(content)
    }
}

/// Downloads subscriptions, retrying fetches that come back too short.
pub struct SourceLoader {
    client: Client,
    user_agents: Vec<String>,
    retry_count: usize,
    retry_min_lines: usize,
}

impl SourceLoader {
    pub fn new(config: &Config) -> Result<Self, CheckerError> {
        let client = Client::builder()
            .timeout(config.download_timeout)
            .no_proxy()
            .build()
            .map_err(|e| CheckerError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            user_agents: config.user_agents.clone(),
            retry_count: config.retry_count.max(1),
            retry_min_lines: config.retry_min_lines,
        })
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<String>, CheckerError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, random_user_agent(&self.user_agents))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckerError::Download(format!("{url}: HTTP {status}")));
        }

        let body = response.text().await?;
        Ok(parse_payload(url, &body))
    }

    /// Fetch one subscription with up to `retry_count` attempts.
    ///
    /// A fetch shorter than `retry_min_lines` is retried; when attempts run
    /// out the longest fetch seen is returned, possibly empty.
    pub async fn fetch(&self, url: &str) -> (Vec<String>, SourceStats) {
        info!("Processing subscription: {}", url);
        let mut best: Vec<String> = Vec::new();
        let mut attempts = 0;

        while attempts < self.retry_count {
            attempts += 1;
            match self.fetch_once(url).await {
                Ok(lines) if lines.len() >= self.retry_min_lines => {
                    best = lines;
                    break;
                }
                Ok(lines) => {
                    warn!(
                        "Subscription {} returned {} lines (attempt {}/{})",
                        url,
                        lines.len(),
                        attempts,
                        self.retry_count
                    );
                    if lines.len() > best.len() {
                        best = lines;
                    }
                }
                Err(e) if !e.is_retryable() => {
                    warn!("Subscription {} cannot be fetched: {}", url, e);
                    break;
                }
                Err(e) => warn!(
                    "Subscription download failed (attempt {}/{}): {}",
                    attempts, self.retry_count, e
                ),
            }
        }

        if best.len() < self.retry_min_lines {
            error!(
                "Giving up on {} after {} attempts with {} lines",
                url,
                attempts,
                best.len()
            );
        }

        let stats = SourceStats {
            source: url.to_string(),
            lines: best.len(),
            attempts,
        };
        (best, stats)
    }

    /// Fetch every subscription concurrently; lines keep the source order.
    pub async fn fetch_all(&self, urls: &[String]) -> (Vec<String>, Vec<SourceStats>) {
        let fetched = join_all(urls.iter().map(|url| self.fetch(url))).await;

        let mut lines = Vec::new();
        let mut stats = Vec::with_capacity(fetched.len());
        for (source_lines, source_stats) in fetched {
            lines.extend(source_lines);
            stats.push(source_stats);
        }
        (lines, stats)
    }
}

/// Read candidate lines from a local playlist. A missing file contributes nothing.
pub async fn read_local_file(path: &Path) -> Vec<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|line| {
                !line.is_empty() && line.contains(SCHEME_SEPARATOR) && !line.contains(GENRE_MARKER)
            })
            .map(String::from)
            .collect(),
        Err(e) => {
            warn!("Failed to read local file {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

pub async fn read_local_files(paths: &[PathBuf]) -> (Vec<String>, Vec<SourceStats>) {
    let mut lines = Vec::new();
    let mut stats = Vec::with_capacity(paths.len());

    for path in paths {
        let file_lines = read_local_file(path).await;
        info!("Loaded {} lines from {}", file_lines.len(), path.display());
        stats.push(SourceStats {
            source: path.display().to_string(),
            lines: file_lines.len(),
            attempts: 1,
        });
        lines.extend(file_lines);
    }

    (lines, stats)
}
