//! # Device Node Channel
//!
//! Writes the stream straight to a printer device node: a USB line printer
//! (`/dev/usb/lp0`), a serial port, or a Bluetooth RFCOMM binding
//! (`/dev/rfcomm0`).
//!
//! ## TTY Configuration
//!
//! When the node is a terminal it is switched to raw mode before writing so
//! the command text passes through unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, INLCR, IGNCR, ICRNL
//! - **No software flow control**: IXON, IXOFF, IXANY
//! - **No output processing**: OPOST (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **No echo, non-canonical**: ECHO, ECHONL, ICANON, ISIG, IEXTEN
//!
//! Plain files and USB printer class nodes are not terminals and are written
//! as-is.
//!
//! ## Chunked Writes
//!
//! Streams larger than the chunk size are written in chunks with a short
//! delay between them, so slow serial links are not overrun.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ChannelKind, PrintChannel};
use crate::codegen::CommandStream;
use crate::error::{EtiquetaError, Result};

/// Default chunk size for writes (bytes)
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Default delay between chunks
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(2);

/// Default hard timeout for one write
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default priority in the fallback chain
pub const DEFAULT_PRIORITY: i32 = 15;

#[derive(Debug, Clone)]
pub struct DeviceChannel {
    name: String,
    path: PathBuf,
    chunk_size: usize,
    chunk_delay: Duration,
    timeout: Duration,
    priority: i32,
}

impl DeviceChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: "device".to_string(),
            path: path.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: DEFAULT_CHUNK_DELAY,
            timeout: DEFAULT_TIMEOUT,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Larger chunks are faster but may overrun a serial buffer.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
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
}

#[async_trait]
impl PrintChannel for DeviceChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Device
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn availability(&self) -> Result<()> {
        match tokio::fs::try_exists(&self.path).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(EtiquetaError::unavailable(
                &self.name,
                format!("{} does not exist", self.path.display()),
            )),
            Err(e) => Err(EtiquetaError::unavailable(
                &self.name,
                format!("cannot stat {}: {}", self.path.display(), e),
            )),
        }
    }

    async fn send(&self, stream: &CommandStream) -> Result<()> {
        let writer = DeviceWriter {
            path: self.path.clone(),
            chunk_size: self.chunk_size,
            chunk_delay: self.chunk_delay,
        };
        let data = stream.as_bytes().to_vec();

        debug!(channel = %self.name, device = %self.path.display(), bytes = data.len(), "writing to device");

        let write = tokio::task::spawn_blocking(move || writer.write(&data));
        let joined = tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| EtiquetaError::ChannelTimeout {
                channel: self.name.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?;

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(EtiquetaError::channel(&self.name, format!("{}: {}", self.path.display(), e))),
            Err(e) => Err(EtiquetaError::channel(&self.name, format!("writer task failed: {}", e))),
        }
    }
}

/// Blocking half of the channel, moved onto the blocking pool.
struct DeviceWriter {
    path: PathBuf,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl DeviceWriter {
    fn write(&self, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        configure_if_tty(&file)?;

        if data.len() <= self.chunk_size {
            file.write_all(data)?;
        } else {
            for chunk in data.chunks(self.chunk_size) {
                file.write_all(chunk)?;
                if !self.chunk_delay.is_zero() {
                    thread::sleep(self.chunk_delay);
                }
            }
        }

        file.flush()
    }
}

#[cfg(unix)]
fn configure_if_tty(file: &File) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    // SAFETY: fd is owned by `file` for the duration of the call.
    if unsafe { libc::isatty(fd) } == 1 {
        configure_tty_raw(fd)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn configure_if_tty(_file: &File) -> io::Result<()> {
    Ok(())
}

/// Put a terminal file descriptor in raw 8-bit mode.
///
/// XON/XOFF must be off: 0x11 and 0x13 can appear in graphic payloads.
#[cfg(unix)]
fn configure_tty_raw(fd: i32) -> io::Result<()> {
    use std::mem::MaybeUninit;

    let mut termios = MaybeUninit::uninit();
    // SAFETY: tcgetattr fills the struct on success.
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: initialized by the successful tcgetattr above.
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    // SAFETY: termios is a valid, initialized struct.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
