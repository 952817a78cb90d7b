//! # CLI Process Channel
//!
//! Spawns a vendor command-line tool for every send.
//!
//! The stream reaches the tool one of two ways:
//!
//! - **File**: if any argument contains `{file}`, the stream is spooled to a
//!   temporary file and the placeholder replaced by its path
//! - **Stdin**: otherwise the stream is piped to the tool's standard input
//!
//! A non-zero exit status is a failure carrying the tool's stderr. On
//! timeout the child is killed (`kill_on_drop`) and the temp file removed.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{ChannelKind, PrintChannel, find_program, spool};
use crate::codegen::CommandStream;
use crate::error::{EtiquetaError, Result};

/// Argument placeholder replaced by the spool file path.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Default hard timeout for one CLI run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default priority in the fallback chain
pub const DEFAULT_PRIORITY: i32 = 30;

#[derive(Debug, Clone)]
pub struct ProcessChannel {
    name: String,
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    priority: i32,
}

impl ProcessChannel {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            name: "cli".to_string(),
            program: program.into(),
            args,
            timeout: DEFAULT_TIMEOUT,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    fn uses_file(&self) -> bool {
        self.args.iter().any(|a| a.contains(FILE_PLACEHOLDER))
    }

    async fn run(&self, program: PathBuf, stream: &CommandStream) -> Result<()> {
        let spooled = if self.uses_file() {
            Some(spool(stream, None)?)
        } else {
            None
        };

        let args: Vec<String> = match &spooled {
            Some(file) => {
                let path = file.path().to_string_lossy();
                self.args.iter().map(|a| a.replace(FILE_PLACEHOLDER, &path)).collect()
            }
            None => self.args.clone(),
        };

        debug!(channel = %self.name, program = %program.display(), ?args, "spawning");

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(if spooled.is_some() { Stdio::null() } else { Stdio::piped() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EtiquetaError::channel(&self.name, format!("spawn {}: {}", program.display(), e)))?;

        // A tool that exits before reading everything closes the pipe. Its
        // exit status and stderr say why, so the write error is kept aside.
        let written = match child.stdin.take() {
            Some(mut stdin) => {
                let written = stdin.write_all(stream.as_bytes()).await;
                // Closing stdin signals end of input.
                drop(stdin);
                written
            }
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| EtiquetaError::channel(&self.name, format!("wait: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            let mut message = if detail.is_empty() {
                format!("{} exited with {}", program.display(), output.status)
            } else {
                format!("{} exited with {}: {}", program.display(), output.status, detail)
            };
            if let Err(e) = &written {
                message.push_str(&format!(" (stdin closed early: {})", e));
            }
            return Err(EtiquetaError::channel(&self.name, message));
        }

        match written {
            Ok(()) => {
                debug!(channel = %self.name, "process exited successfully");
                Ok(())
            }
            Err(e) => Err(EtiquetaError::channel(
                &self.name,
                format!("{} exited before reading the whole stream: {}", program.display(), e),
            )),
        }
    }
}

#[async_trait]
impl PrintChannel for ProcessChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Process
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn availability(&self) -> Result<()> {
        match find_program(&self.program) {
            Some(_) => Ok(()),
            None => Err(EtiquetaError::unavailable(
                &self.name,
                format!("program '{}' not found", self.program.display()),
            )),
        }
    }

    async fn send(&self, stream: &CommandStream) -> Result<()> {
        let program = find_program(&self.program).ok_or_else(|| {
            EtiquetaError::channel(&self.name, format!("program '{}' not found", self.program.display()))
        })?;

        tokio::time::timeout(self.timeout, self.run(program, stream))
            .await
            .map_err(|_| EtiquetaError::ChannelTimeout {
                channel: self.name.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::codegen::Language;
    use crate::label::LabelSize;
    use std::os::unix::fs::PermissionsExt;

    fn stream() -> CommandStream {
        CommandStream::from_raw("^XA\n^FO1,1^FDx^FS\n^XZ", Language::Zpl, LabelSize::new(50.0, 30.0), 203)
            .unwrap()
    }

    fn script(dir: &std::path::Path, body: &str) -> PathBuf {
        let path = dir.join("fake-printer-cli");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_file_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("received");
        let program = script(dir.path(), &format!("cp \"$1\" '{}'", out.display()));

        let channel = ProcessChannel::new(program, vec![FILE_PLACEHOLDER.into()]);
        assert!(channel.is_available().await);
        channel.send(&stream()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), stream().text());
    }

    #[tokio::test]
    async fn test_stdin_mode() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("received");
        let program = script(dir.path(), &format!("cat > '{}'", out.display()));

        ProcessChannel::new(program, vec![]).send(&stream()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), stream().text());
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "cat > /dev/null; echo 'printer offline' >&2; exit 3");

        let err = ProcessChannel::new(program, vec![]).send(&stream()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'cli'"));
        assert!(message.contains("printer offline"));
    }

    #[tokio::test]
    async fn test_early_exit_on_stdin_keeps_status_and_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "echo 'unknown option -x' >&2; exit 2");

        // Larger than a pipe buffer, so the write outlives the process.
        let body = "^FO1,1^FDpadding^FS\n".repeat(20_000);
        let big = CommandStream::from_raw(
            format!("^XA\n{}^XZ", body),
            Language::Zpl,
            LabelSize::new(50.0, 30.0),
            203,
        )
        .unwrap();

        let err = ProcessChannel::new(program, vec![]).send(&big).await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown option -x"), "{}", message);
        assert!(message.contains("exit status: 2"), "{}", message);
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let program = script(dir.path(), "sleep 5");

        let channel = ProcessChannel::new(program, vec![FILE_PLACEHOLDER.into()])
            .with_timeout(Duration::from_millis(100));
        let err = channel.send(&stream()).await.unwrap_err();
        assert!(matches!(err, EtiquetaError::ChannelTimeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_unavailable() {
        let channel = ProcessChannel::new("/nonexistent/etiqueta-cli", vec![]);
        assert!(!channel.is_available().await);
        assert!(channel.send(&stream()).await.is_err());
    }
}
