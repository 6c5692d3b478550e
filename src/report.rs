//! Output files: result lists, history copies, host-failure report.
//!
//! Rendering is pure and separate from writing so the formats can be tested
//! without touching the filesystem.

use crate::{Aggregated, CheckerError, Config, OutputMode, ProbeResult, GENRE_MARKER};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info};

pub const WHITELIST_FILE: &str = "whitelist_auto.txt";
pub const WHITELIST_TV_FILE: &str = "whitelist_auto_tv.txt";
pub const BLACKLIST_FILE: &str = "blacklist_auto.txt";
pub const DETAILED_FILE: &str = "result.txt";
pub const METRICS_FILE: &str = "metrics.prom";

/// `20240131-235959`, the version line of the header block.
pub fn version_stamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d-%H%M%S").to_string()
}

/// `20240131_235959`, prefix of timestamped file names.
pub fn file_stamp(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}

/// `20240131 23:59:59`, used on `CheckTime:` lines.
pub fn check_time(now: &DateTime<Local>) -> String {
    now.format("%Y%m%d %H:%M:%S").to_string()
}

pub fn header_block(version: &str, columns: &str) -> Vec<String> {
    vec![
        format!("updateTime,{GENRE_MARKER}"),
        version.to_string(),
        String::new(),
        format!("{columns},{GENRE_MARKER}"),
    ]
}

/// `elapsed ms,name,url` for timed successes, `name,url` for everything else.
pub fn format_list_line(result: &ProbeResult) -> String {
    match result.elapsed_ms {
        Some(elapsed) if result.reachable => {
            format!("{:.1}ms,{},{}", elapsed, result.name, result.url)
        }
        _ => result.name_url(),
    }
}

/// `name,url,reachable,<elapsed ms|N/A>,<WxH|N/A>`
pub fn format_detailed_line(result: &ProbeResult) -> String {
    let elapsed = result
        .elapsed_ms
        .map(|ms| format!("{ms:.1}ms"))
        .unwrap_or_else(|| "N/A".to_string());
    let resolution = result
        .resolution
        .map(|r| r.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "{},{},{},{},{}",
        result.name, result.url, result.reachable, elapsed, resolution
    )
}

/// Contents of the three list-mode files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFiles {
    pub whitelist: Vec<String>,
    pub whitelist_tv: Vec<String>,
    pub blacklist: Vec<String>,
}

pub fn render_lists(aggregated: &Aggregated, version: &str) -> ListFiles {
    let mut whitelist = header_block(version, "elapsedMs,name,url");
    whitelist.extend(aggregated.kept.iter().map(format_list_line));

    let mut whitelist_tv = header_block(version, "name,url");
    whitelist_tv.extend(aggregated.kept.iter().map(ProbeResult::name_url));

    let mut blacklist = header_block(version, "name,url");
    blacklist.extend(aggregated.failed.iter().map(ProbeResult::name_url));

    ListFiles {
        whitelist,
        whitelist_tv,
        blacklist,
    }
}

pub fn render_detailed(aggregated: &Aggregated, check_time: &str) -> Vec<String> {
    let mut lines = vec![format!("CheckTime: {check_time}")];
    lines.extend(aggregated.kept.iter().map(format_detailed_line));
    lines
}

/// One `host: count` line per host, in the order given.
pub fn render_host_report(counts: &[(String, usize)]) -> Vec<String> {
    counts
        .iter()
        .map(|(host, count)| format!("{host}: {count}"))
        .collect()
}

pub fn render_fallback(check_time: &str, message: &str) -> Vec<String> {
    vec![
        format!("CheckTime: {check_time}"),
        format!("ERROR: {message}"),
    ]
}

async fn write_lines(path: &Path, lines: &[String]) -> Result<(), CheckerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content).await?;
    Ok(())
}

pub struct ReportWriter {
    output_dir: PathBuf,
    mode: OutputMode,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, mode: OutputMode) -> Self {
        Self {
            output_dir: output_dir.into(),
            mode,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.output_dir.clone(), config.output_mode)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn history_dir(&self) -> PathBuf {
        self.output_dir.join("history")
    }

    fn report_dir(&self) -> PathBuf {
        self.output_dir.join("blackhost")
    }

    /// Files rewritten on every run in the active mode.
    pub fn primary_files(&self) -> Vec<PathBuf> {
        match self.mode {
            OutputMode::Lists => [WHITELIST_FILE, WHITELIST_TV_FILE, BLACKLIST_FILE]
                .iter()
                .map(|name| self.output_dir.join(name))
                .collect(),
            OutputMode::Detailed => vec![self.output_dir.join(DETAILED_FILE)],
        }
    }

    /// Write the result files for the active mode, returning every path written.
    pub async fn write_results(
        &self,
        aggregated: &Aggregated,
        now: &DateTime<Local>,
    ) -> Result<Vec<PathBuf>, CheckerError> {
        let written = match self.mode {
            OutputMode::Lists => {
                let files = render_lists(aggregated, &version_stamp(now));
                let stamp = file_stamp(now);
                let history = self.history_dir();
                let targets = [
                    (self.output_dir.join(WHITELIST_FILE), &files.whitelist),
                    (self.output_dir.join(WHITELIST_TV_FILE), &files.whitelist_tv),
                    (self.output_dir.join(BLACKLIST_FILE), &files.blacklist),
                    (history.join(format!("{stamp}_{WHITELIST_FILE}")), &files.whitelist),
                    (history.join(format!("{stamp}_{BLACKLIST_FILE}")), &files.blacklist),
                ];

                let mut written = Vec::with_capacity(targets.len());
                for (path, lines) in targets {
                    write_lines(&path, lines).await?;
                    written.push(path);
                }
                written
            }
            OutputMode::Detailed => {
                let path = self.output_dir.join(DETAILED_FILE);
                write_lines(&path, &render_detailed(aggregated, &check_time(now))).await?;
                vec![path]
            }
        };

        info!(
            "Wrote {} result files to {}",
            written.len(),
            self.output_dir.display()
        );
        Ok(written)
    }

    pub async fn write_host_failures(
        &self,
        counts: &[(String, usize)],
        now: &DateTime<Local>,
    ) -> Result<PathBuf, CheckerError> {
        let path = self
            .report_dir()
            .join(format!("{}_blackhost_count.txt", file_stamp(now)));
        write_lines(&path, &render_host_report(counts)).await?;
        info!(
            "Host failure report ({} hosts) saved to {}",
            counts.len(),
            path.display()
        );
        Ok(path)
    }

    pub async fn write_metrics(
        &self,
        rendered: &str,
        now: &DateTime<Local>,
    ) -> Result<PathBuf, CheckerError> {
        let dir = self.report_dir();
        fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}_{METRICS_FILE}", file_stamp(now)));
        fs::write(&path, rendered).await?;
        info!("Metrics saved to {}", path.display());
        Ok(path)
    }

    /// Stamp every primary file with the error so downstream consumers still find them.
    ///
    /// Best effort: individual write failures are logged and skipped.
    pub async fn write_fallback(&self, message: &str, now: &DateTime<Local>) -> Vec<PathBuf> {
        let lines = render_fallback(&check_time(now), message);
        let mut written = Vec::new();
        for path in self.primary_files() {
            match write_lines(&path, &lines).await {
                Ok(()) => written.push(path),
                Err(e) => error!("Failed to write fallback file {}: {}", path.display(), e),
            }
        }
        written
    }
}
