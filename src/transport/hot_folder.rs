//! # Hot Folder Channel
//!
//! Drops the stream as a file into a directory watched by external printer
//! software, then waits for that software to consume (delete) it.
//!
//! The file is first written under a hidden temporary name and renamed into
//! place, so a watcher never sees a partially written file. The channel
//! polls for the file at a fixed interval; if it is still there when the
//! pickup timeout expires, the file is removed again and the send fails,
//! which keeps a late watcher from printing a job that already fell through
//! to another channel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{ChannelKind, PrintChannel};
use crate::codegen::CommandStream;
use crate::error::{EtiquetaError, Result};

/// Default time the watcher has to consume the file
pub const DEFAULT_PICKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default interval between existence checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default priority in the fallback chain
pub const DEFAULT_PRIORITY: i32 = 50;

#[derive(Debug, Clone)]
pub struct HotFolderChannel {
    name: String,
    dir: PathBuf,
    pickup_timeout: Duration,
    poll_interval: Duration,
    priority: i32,
}

impl HotFolderChannel {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "hot-folder".to_string(),
            dir: dir.into(),
            pickup_timeout: DEFAULT_PICKUP_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_pickup_timeout(mut self, timeout: Duration) -> Self {
        self.pickup_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn timeout_error(&self) -> EtiquetaError {
        EtiquetaError::ChannelTimeout {
            channel: self.name.clone(),
            timeout_ms: self.pickup_timeout.as_millis() as u64,
        }
    }

    /// Wait until `path` disappears or the pickup timeout expires.
    async fn wait_for_pickup(&self, path: &Path) -> Result<bool> {
        let deadline = Instant::now() + self.pickup_timeout;
        loop {
            if !tokio::fs::try_exists(path).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl PrintChannel for HotFolderChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::HotFolder
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    /// Pickup timeout plus one poll, so the channel reports its own timeout
    /// before the orchestrator's bound fires.
    fn timeout(&self) -> Duration {
        self.pickup_timeout + self.poll_interval * 2
    }

    async fn availability(&self) -> Result<()> {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(EtiquetaError::unavailable(
                &self.name,
                format!("{} is not a directory", self.dir.display()),
            )),
            Err(e) => Err(EtiquetaError::unavailable(
                &self.name,
                format!("{}: {}", self.dir.display(), e),
            )),
        }
    }

    async fn send(&self, stream: &CommandStream) -> Result<()> {
        let id = Uuid::new_v4();
        let ext = stream.language().file_extension();
        let staging = self.dir.join(format!(".etiqueta-{}.tmp", id));
        let target = self.dir.join(format!("etiqueta-{}.{}", id, ext));

        let dropped = async {
            tokio::fs::write(&staging, stream.as_bytes()).await?;
            tokio::fs::rename(&staging, &target).await
        }
        .await;
        if let Err(e) = dropped {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(EtiquetaError::channel(
                &self.name,
                format!("cannot drop file into {}: {}", self.dir.display(), e),
            ));
        }

        debug!(channel = %self.name, file = %target.display(), "waiting for pickup");

        let picked_up = self
            .wait_for_pickup(&target)
            .await
            .map_err(|e| EtiquetaError::channel(&self.name, format!("polling {}: {}", target.display(), e)))?;

        if picked_up {
            debug!(channel = %self.name, "file consumed");
            return Ok(());
        }

        if let Err(e) = tokio::fs::remove_file(&target).await {
            // Consumed between the last poll and now.
            if e.kind() == std::io::ErrorKind::NotFound {
                return Ok(());
            }
            warn!(channel = %self.name, file = %target.display(), error = %e, "could not withdraw unconsumed file");
        }
        Err(self.timeout_error())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::Language;
    use crate::label::LabelSize;

    fn stream() -> CommandStream {
        CommandStream::from_raw("^L\nE", Language::Ezpl, LabelSize::new(100.0, 50.0), 203).unwrap()
    }

    fn files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect()
    }

    #[tokio::test]
    async fn test_missing_dir_unavailable() {
        let channel = HotFolderChannel::new("/nonexistent/etiqueta-hot-folder");
        assert!(!channel.is_available().await);
    }

    #[tokio::test]
    async fn test_file_is_not_a_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, "").unwrap();
        let err = HotFolderChannel::new(&file).availability().await.unwrap_err();
        assert!(err.to_string().contains("not a directory"));
    }

    #[tokio::test]
    async fn test_consumed_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let watched = dir.path().to_path_buf();

        // Fake watcher: delete the first .ezp file that appears.
        let watcher = tokio::spawn(async move {
            loop {
                for path in files(&watched) {
                    if path.extension().is_some_and(|e| e == "ezp") {
                        assert_eq!(std::fs::read_to_string(&path).unwrap(), "^L\nE");
                        std::fs::remove_file(&path).unwrap();
                        return;
                    }
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let channel = HotFolderChannel::new(dir.path()).with_poll_interval(Duration::from_millis(10));
        assert!(channel.is_available().await);
        channel.send(&stream()).await.unwrap();
        watcher.await.unwrap();
        assert!(files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_unconsumed_file_times_out_and_is_withdrawn() {
        let dir = tempfile::tempdir().unwrap();
        let channel = HotFolderChannel::new(dir.path())
            .with_pickup_timeout(Duration::from_millis(50))
            .with_poll_interval(Duration::from_millis(10));

        let err = channel.send(&stream()).await.unwrap_err();
        assert!(matches!(err, EtiquetaError::ChannelTimeout { .. }));
        assert!(files(dir.path()).is_empty());
    }
}
