//! # Delivery Channels
//!
//! Independent ways of getting a finished [`CommandStream`] to a printer.
//! The orchestrator walks them in priority order until one succeeds.
//!
//! ## Available Channels
//!
//! | Channel | Delivery | Available when |
//! |---------|----------|----------------|
//! | [`hot_folder`] | drop a file, wait for external software to consume it | directory exists |
//! | [`native`] | vendor SDK shared library (`openport`/`sendcommand`) | library loads |
//! | [`process`] | spawn a vendor CLI with the stream as file or stdin | program found |
//! | [`socket`] | raw bytes to `host:port` (usually 9100) | address resolves |
//! | [`device`] | write to a device node (`/dev/usb/lp0`, `/dev/rfcomm0`) | node exists |
//! | [`shell`] | generated OS script (`lp -o raw` / PowerShell copy) | interpreter found |
//!
//! Every channel opens its handle, process or connection inside `send` and
//! releases it before returning. Nothing is pooled between sends.

pub mod device;
pub mod hot_folder;
pub mod native;
pub mod process;
pub mod shell;
pub mod socket;

pub use device::DeviceChannel;
pub use hot_folder::HotFolderChannel;
pub use native::NativeChannel;
pub use process::ProcessChannel;
pub use shell::ShellChannel;
pub use socket::SocketChannel;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::codegen::CommandStream;
use crate::error::{EtiquetaError, Result};

/// Channel family, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    HotFolder,
    Native,
    Process,
    Socket,
    Device,
    Shell,
    /// Caller-supplied channel implementation.
    Custom,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::HotFolder => "hot folder",
            Self::Native => "native SDK",
            Self::Process => "CLI process",
            Self::Socket => "raw socket",
            Self::Device => "device node",
            Self::Shell => "OS shell",
            Self::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// One strategy for delivering a command stream.
///
/// `send` must leave nothing open behind it. The orchestrator bounds every
/// `send` by [`PrintChannel::timeout`] and drops the future when it expires,
/// so resources must be released on drop (`kill_on_drop`, owned sockets).
#[async_trait]
pub trait PrintChannel: Send + Sync {
    /// Unique name, reported in job records and error messages.
    fn name(&self) -> &str;

    fn kind(&self) -> ChannelKind;

    /// Higher runs first.
    fn priority(&self) -> i32;

    /// Hard bound on one `send`.
    fn timeout(&self) -> Duration;

    /// Pre-check. `Err` carries the reason the channel cannot be used now.
    ///
    /// Must not fail for any other reason than unavailability and must not
    /// print anything.
    async fn availability(&self) -> Result<()>;

    async fn is_available(&self) -> bool {
        self.availability().await.is_ok()
    }

    /// Deliver the whole stream in one transmission.
    async fn send(&self, stream: &CommandStream) -> Result<()>;
}

/// Snapshot of one configured channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelStatus {
    pub name: String,
    pub kind: ChannelKind,
    pub priority: i32,
    pub available: bool,
    /// Why the channel is unavailable, if it is.
    pub reason: Option<String>,
}

impl ChannelStatus {
    pub async fn probe(channel: &dyn PrintChannel) -> Self {
        let availability = check_availability(channel).await;
        Self {
            name: channel.name().to_string(),
            kind: channel.kind(),
            priority: channel.priority(),
            available: availability.is_ok(),
            reason: availability.err().map(|e| unavailable_reason(&e)),
        }
    }
}

/// [`PrintChannel::availability`] bounded by the channel's own timeout.
///
/// A pre-check that does not answer in time counts as unavailable.
pub(crate) async fn check_availability(channel: &dyn PrintChannel) -> Result<()> {
    let limit = channel.timeout();
    match tokio::time::timeout(limit, channel.availability()).await {
        Ok(result) => result,
        Err(_) => Err(EtiquetaError::unavailable(
            channel.name(),
            format!("availability check timed out after {}ms", limit.as_millis()),
        )),
    }
}

/// The bare reason of an unavailability error.
pub(crate) fn unavailable_reason(err: &EtiquetaError) -> String {
    match err {
        EtiquetaError::ChannelUnavailable { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

/// Locate `program` the way a shell would: as given if it contains a path
/// separator, otherwise in each `PATH` directory.
pub(crate) fn find_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Write `stream` to a named temporary file that is deleted on drop.
pub(crate) fn spool(stream: &CommandStream, dir: Option<&Path>) -> Result<tempfile::NamedTempFile> {
    use std::io::Write;

    let suffix = format!(".{}", stream.language().file_extension());
    let mut builder = tempfile::Builder::new();
    builder.prefix("etiqueta-").suffix(&suffix);
    let mut file = match dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    file.write_all(stream.as_bytes())?;
    file.flush()?;
    Ok(file)
}

// ============================================================================
// TESTS
// ============================================================================
