use crate::{
    aggregate, normalize_with_stats, read_local_files, AggregationPolicy, BatchProcessor,
    Candidate, CheckerError, Config, HostFailureCounter, Metrics, NormalizeStats, OutputMode,
    PrometheusExporter, Protocol, ReportWriter, SkipStats, SourceLoader, SourceStats,
    StreamChecker,
};
use anyhow::{anyhow, Context};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "stream-checker")]
#[command(about = "Concurrent liveness checker for live stream playlists")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(short, long, global = true, help = "Number of concurrent probe workers")]
    pub threads: Option<usize>,

    #[arg(long, global = true, help = "Probe timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(long, global = true, help = "Resolution inspection timeout in seconds")]
    pub inspect_timeout: Option<u64>,

    #[arg(long, global = true, help = "Minimum log level (DEBUG, INFO, WARN, ERROR)")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Apply global flags, then command-specific flags, on top of `config`.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(threads) = self.threads {
            config.max_workers = threads;
        }
        if let Some(timeout) = self.timeout {
            config.check_timeout = Duration::from_secs(timeout);
        }
        if let Some(timeout) = self.inspect_timeout {
            config.inspect_timeout = Duration::from_secs(timeout);
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if self.verbose {
            config.log_level = "DEBUG".to_string();
        }
        if let Commands::Check(args) = &self.command {
            args.apply(config);
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check every stream from the configured subscriptions and files
    Check(CheckArgs),

    /// Probe a single stream URL and print the outcome
    Probe {
        #[arg(help = "Stream URL to probe")]
        url: String,

        #[arg(short, long, help = "Display name for the stream")]
        name: Option<String>,
    },

    /// Validate a configuration file
    Validate {
        #[arg(help = "Configuration file to validate")]
        path: PathBuf,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    #[arg(short, long, help = "Local playlist file (repeatable)")]
    pub file: Vec<PathBuf>,

    #[arg(short, long, help = "Subscription URL (repeatable)")]
    pub urls: Vec<String>,

    #[arg(short, long, help = "Output directory")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, help = "Download attempts per subscription")]
    pub retry: Option<usize>,

    #[arg(short, long, value_delimiter = ',', help = "Protocols to probe, e.g. http,rtmp")]
    pub protocol: Vec<Protocol>,

    #[arg(long, help = "Keep unreachable streams in the main output")]
    pub save_failed: bool,

    #[arg(long, help = "Maximum kept streams per channel name")]
    pub keep_per_name: Option<usize>,

    #[arg(long, help = "Maximum kept streams overall")]
    pub max_results: Option<usize>,

    #[arg(short, long, help = "Output mode (lists, detailed)")]
    pub mode: Option<OutputMode>,

    #[arg(long, help = "Skip resolution inspection")]
    pub no_resolution: bool,

    #[arg(long, help = "Host substring never to probe (repeatable)")]
    pub blocked_host: Vec<String>,

    #[arg(long, help = "Write Prometheus metrics to the report directory")]
    pub export_metrics: bool,
}

impl CheckArgs {
    pub fn apply(&self, config: &mut Config) {
        config.local_files.extend(self.file.iter().cloned());
        config.sources.extend(self.urls.iter().cloned());
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(retry) = self.retry {
            config.retry_count = retry;
        }
        if !self.protocol.is_empty() {
            config.protocols = self.protocol.clone();
        }
        if self.save_failed {
            config.save_failed = true;
        }
        if self.keep_per_name.is_some() {
            config.keep_per_name = self.keep_per_name;
        }
        if self.max_results.is_some() {
            config.max_results = self.max_results;
        }
        if let Some(mode) = self.mode {
            config.output_mode = mode;
        }
        if self.no_resolution {
            config.inspect_resolution = false;
        }
        config.blocked_hosts.extend(self.blocked_host.iter().cloned());
        if self.export_metrics {
            config.export_metrics = true;
        }
    }
}

/// Stage counts of one `check` run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub sources: Vec<SourceStats>,
    pub normalize: NormalizeStats,
    pub skipped: SkipStats,
    pub probed: usize,
    pub reachable: usize,
    pub kept: usize,
    pub failed: usize,
    pub failing_hosts: usize,
    pub outputs: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        for source in &self.sources {
            info!("{} lines from {}", source.lines, source.source);
        }
        info!(
            "Lines: {} initial, {} after split, {} after clean, {} after dedup",
            self.normalize.input,
            self.normalize.after_split,
            self.normalize.after_clean,
            self.normalize.after_dedup
        );
        info!(
            "Probed {} ({} skipped): {} reachable, {} failed, {} kept, {} failing hosts",
            self.probed,
            self.skipped.total(),
            self.reachable,
            self.failed,
            self.kept,
            self.failing_hosts
        );
        info!("Run finished in {}", crate::format_duration(self.elapsed));
    }
}

pub struct CliRunner {
    pub config: Config,
    pub metrics: Arc<Metrics>,
    pub host_failures: HostFailureCounter,
    exporter: Option<PrometheusExporter>,
}

impl CliRunner {
    pub fn new(config: Config, exporter: Option<PrometheusExporter>) -> Self {
        Self {
            config,
            metrics: Arc::new(Metrics::new()),
            host_failures: HostFailureCounter::new(),
            exporter,
        }
    }

    pub async fn run(&self, command: Commands) -> anyhow::Result<()> {
        match command {
            Commands::Check(_) => self.run_check().await.map(|summary| summary.log()),
            Commands::Probe { url, name } => self.run_probe(url, name).await,
            Commands::Validate { path } => self.validate_config(path).await,
        }
    }

    fn checker(&self) -> Result<Arc<StreamChecker>, CheckerError> {
        StreamChecker::from_config(
            self.config.clone(),
            self.host_failures.clone(),
            self.metrics.clone(),
        )
        .map(Arc::new)
    }

    /// Gather lines from every input source, in configuration order.
    pub async fn load_lines(&self) -> anyhow::Result<(Vec<String>, Vec<SourceStats>)> {
        let mut lines = Vec::new();
        let mut stats = Vec::new();

        if !self.config.sources.is_empty() {
            let loader = SourceLoader::new(&self.config)?;
            let (remote_lines, remote_stats) = loader.fetch_all(&self.config.sources).await;
            lines.extend(remote_lines);
            stats.extend(remote_stats);
        }

        let (local_lines, local_stats) = read_local_files(&self.config.local_files).await;
        lines.extend(local_lines);
        stats.extend(local_stats);

        Ok((lines, stats))
    }

    pub async fn run_check(&self) -> anyhow::Result<RunSummary> {
        let start = Instant::now();
        info!("Starting stream check");

        let (lines, sources) = self.load_lines().await?;
        if lines.is_empty() {
            warn!("No input lines from {} sources", sources.len());
        }

        let (candidates, normalize) = normalize_with_stats(&lines);

        let checker = self.checker()?;
        let batch = BatchProcessor::new(checker).process_batch(candidates).await;
        let skipped = batch.skipped.clone();
        let probed = batch.results.len();
        let reachable = batch.reachable();

        let aggregated = aggregate(batch.results, &AggregationPolicy::from_config(&self.config));

        let now = Local::now();
        let writer = ReportWriter::from_config(&self.config);
        let mut outputs = writer
            .write_results(&aggregated, &now)
            .await
            .context("failed to write result files")?;

        let host_counts = self.host_failures.drain();
        outputs.push(
            writer
                .write_host_failures(&host_counts, &now)
                .await
                .context("failed to write host failure report")?,
        );

        if let Some(exporter) = &self.exporter {
            outputs.push(
                writer
                    .write_metrics(&exporter.render(), &now)
                    .await
                    .context("failed to write metrics")?,
            );
        }

        Ok(RunSummary {
            sources,
            normalize,
            skipped,
            probed,
            reachable,
            kept: aggregated.kept.len(),
            failed: aggregated.failed.len(),
            failing_hosts: host_counts.len(),
            outputs,
            elapsed: start.elapsed(),
        })
    }

    pub async fn run_probe(&self, url: String, name: Option<String>) -> anyhow::Result<()> {
        let candidate = Candidate::new(name.unwrap_or_default(), url.as_str())
            .ok_or_else(|| anyhow!("not a stream URL: {url}"))?;

        let result = self.checker()?.check(candidate).await;

        println!("Probe result:");
        println!("  URL: {}", result.url);
        println!("  Protocol: {}", result.protocol);
        println!("  Reachable: {}", result.reachable);
        match result.elapsed_ms {
            Some(ms) => println!("  Elapsed: {ms:.1}ms"),
            None => println!("  Elapsed: N/A"),
        }
        if let Some(resolution) = result.resolution {
            println!("  Resolution: {resolution}");
        }
        if let Some(error) = &result.error {
            println!("  Error: {error}");
        }

        Ok(())
    }

    pub async fn validate_config(&self, path: PathBuf) -> anyhow::Result<()> {
        println!("Validating configuration: {}", path.display());

        let config = Config::from_file(&path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))?;
        config.validate()?;

        println!("Configuration is valid:");
        println!("  Workers: {}", config.max_workers);
        println!("  Check timeout: {:?}", config.check_timeout);
        println!("  Inspect timeout: {:?}", config.inspect_timeout);
        println!("  Retry count: {} (min lines {})", config.retry_count, config.retry_min_lines);
        if config.protocols.is_empty() {
            println!("  Protocols: all");
        } else {
            let protocols: Vec<&str> = config.protocols.iter().map(|p| p.as_str()).collect();
            println!("  Protocols: {}", protocols.join(","));
        }
        println!("  Save failed: {}", config.save_failed);
        println!("  Keep per name: {:?}", config.keep_per_name);
        println!("  Max results: {:?}", config.max_results);
        println!("  Output: {:?} in {}", config.output_mode, config.output_dir.display());
        println!("  Sources: {}, local files: {}", config.sources.len(), config.local_files.len());
        println!("  Log level: {}", config.log_level);

        Ok(())
    }
}

pub fn setup_logging(level: tracing::Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}
