use anyhow::Context;
use chrono::Local;
use clap::Parser;
use stream_checker::{
    setup_logging, Cli, CliRunner, Commands, Config, PrometheusExporter, ReportWriter,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let is_check = matches!(args.command, Commands::Check(_));

    let config = match load_config(&args).await {
        Ok(config) => config,
        Err(e) => {
            // Logging is not set up yet.
            eprintln!("Configuration error: {e:#}");
            if is_check {
                write_fallback(&fallback_config(&args), &e).await;
            }
            std::process::exit(1);
        }
    };

    setup_logging(config.tracing_level().unwrap_or(tracing::Level::INFO));
    info!("Starting stream-checker v{}", env!("CARGO_PKG_VERSION"));

    let exporter = if config.export_metrics {
        match PrometheusExporter::install() {
            Ok(exporter) => Some(exporter),
            Err(e) => {
                error!("Metrics export disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    let runner = CliRunner::new(config.clone(), exporter);

    if let Err(e) = runner.run(args.command).await {
        error!("Application error: {:#}", e);
        if is_check {
            write_fallback(&config, &e).await;
        }
        std::process::exit(1);
    }

    info!("stream-checker stopped");
}

async fn load_config(args: &Cli) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .await
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    args.apply_overrides(&mut config);
    config.validate()?;

    Ok(config)
}

/// Best-effort output location when the configuration itself could not be loaded.
fn fallback_config(args: &Cli) -> Config {
    let mut config = Config::default();
    args.apply_overrides(&mut config);
    config
}

async fn write_fallback(config: &Config, e: &anyhow::Error) {
    let writer = ReportWriter::from_config(config);
    let written = writer.write_fallback(&format!("{e:#}"), &Local::now()).await;
    if written.is_empty() {
        eprintln!("Failed to write any fallback output to {}", writer.output_dir().display());
    }
}
