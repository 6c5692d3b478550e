use super::{ProbeOutcome, ProtocolProber};
use crate::CheckerError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Runs an external stream-probing tool against RTMP/RTSP URLs.
///
/// Only the exit status is consulted: zero means reachable. The child is
/// killed if it outlives the timeout.
pub struct StreamToolProber {
    program: String,
}

impl StreamToolProber {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ProtocolProber for StreamToolProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let child = Command::new(&self.program)
            .args(["-v", "error", url])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        let status = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => {
                return Err(CheckerError::Process(format!(
                    "`{}` is not installed or available in PATH",
                    self.program
                )))
            }
            Ok(Err(e)) => return Err(CheckerError::Process(e.to_string())),
            Err(_) => return Err(CheckerError::Timeout(timeout)),
        };

        debug!("{} exited with {} for {}", self.program, status, url);
        Ok(status.success())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exit_status_decides() {
        assert!(StreamToolProber::new("true")
            .probe("rtmp://live/app", Duration::from_secs(5))
            .await
            .unwrap());
        assert!(!StreamToolProber::new("false")
            .probe("rtmp://live/app", Duration::from_secs(5))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_missing_tool_is_an_error() {
        let outcome = StreamToolProber::new("definitely-not-an-installed-tool")
            .probe("rtsp://cam/1", Duration::from_secs(5))
            .await;
        assert!(matches!(outcome, Err(CheckerError::Process(_))));
    }
}
