//! Resolution lookup for streams that already passed a liveness probe.

use crate::{CheckerError, Resolution};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Reports the first video stream's dimensions, or `None` when they cannot be read.
///
/// Implementations never fail past this boundary; every problem degrades to
/// `None` with a warning.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaInspector: Send + Sync {
    async fn inspect(&self, url: &str, timeout: Duration) -> Option<Resolution>;
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
}

/// Extract width and height from `ffprobe -of json` output.
pub fn parse_resolution(stdout: &str) -> Result<Resolution, CheckerError> {
    let output: FfprobeOutput = serde_json::from_str(stdout)?;
    let stream = output
        .streams
        .first()
        .ok_or_else(|| CheckerError::Inspection("no video stream reported".to_string()))?;

    match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => Ok(Resolution { width, height }),
        _ => Err(CheckerError::Inspection(
            "video stream has no dimensions".to_string(),
        )),
    }
}

/// Shells out to `ffprobe` for the first video stream's width and height.
pub struct FfprobeInspector {
    program: String,
}

impl FfprobeInspector {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(url: &str) -> Vec<String> {
        [
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "json",
            url,
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    async fn run(&self, url: &str, timeout: Duration) -> Result<Resolution, CheckerError> {
        let child = Command::new(&self.program)
            .args(Self::args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(CheckerError::Process(format!(
                    "`{}` is not installed or available in PATH",
                    self.program
                )))
            }
            Ok(Err(e)) => return Err(CheckerError::Process(e.to_string())),
            Err(_) => return Err(CheckerError::Timeout(timeout)),
        };

        if !output.status.success() {
            return Err(CheckerError::Inspection(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_resolution(&String::from_utf8_lossy(&output.stdout))
    }
}

impl Default for FfprobeInspector {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[async_trait]
impl MediaInspector for FfprobeInspector {
    async fn inspect(&self, url: &str, timeout: Duration) -> Option<Resolution> {
        match self.run(url, timeout).await {
            Ok(resolution) => {
                debug!("Resolution of {}: {}", url, resolution);
                Some(resolution)
            }
            Err(e) => {
                warn!("Failed to get resolution for {}: {}", url, e);
                None
            }
        }
    }
}
