//! # Native SDK Channel
//!
//! Calls the printer vendor's shared library directly. The library is loaded
//! with `dlopen` for every send and unloaded afterwards; nothing is cached.
//!
//! ## Expected Exports
//!
//! ```text
//! int openport(const char *port);     non-zero on success
//! int sendcommand(const char *cmd);   negative on failure
//! int closeport(void);
//! ```
//!
//! Each line of the stream is passed to `sendcommand` in order, between one
//! `openport` and one `closeport`.
//!
//! A library that cannot be loaded, or lacks one of the exports, makes the
//! channel unavailable instead of failing the job. Loading is only supported
//! on Unix; elsewhere the channel always reports unavailable.
//!
//! The SDK call blocks, so it runs on tokio's blocking pool. A timed-out call
//! cannot be interrupted; the orchestrator stops waiting for it and moves on.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{ChannelKind, PrintChannel};
use crate::codegen::CommandStream;
use crate::error::{EtiquetaError, Result};

/// Default hard timeout for one SDK session
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default priority in the fallback chain
pub const DEFAULT_PRIORITY: i32 = 40;

/// Default port name passed to `openport`
pub const DEFAULT_PORT: &str = "6";

#[derive(Debug, Clone)]
pub struct NativeChannel {
    name: String,
    library: PathBuf,
    port: String,
    timeout: Duration,
    priority: i32,
}

impl NativeChannel {
    pub fn new(library: impl Into<PathBuf>) -> Self {
        Self {
            name: "native-sdk".to_string(),
            library: library.into(),
            port: DEFAULT_PORT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
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
impl PrintChannel for NativeChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Native
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn availability(&self) -> Result<()> {
        let library = self.library.clone();
        let loaded = tokio::task::spawn_blocking(move || sdk::Sdk::load(&library).map(|_| ()))
            .await
            .map_err(|e| EtiquetaError::unavailable(&self.name, format!("loader task failed: {}", e)))?;
        loaded.map_err(|reason| EtiquetaError::unavailable(&self.name, reason))
    }

    async fn send(&self, stream: &CommandStream) -> Result<()> {
        let library = self.library.clone();
        let port = self.port.clone();
        let commands: Vec<String> = stream.text().lines().map(str::to_string).collect();
        let name = self.name.clone();

        debug!(channel = %self.name, library = %self.library.display(), port = %self.port, "opening SDK port");

        let session = tokio::task::spawn_blocking(move || -> std::result::Result<(), String> {
            let sdk = sdk::Sdk::load(&library)?;
            sdk.print(&port, &commands)
        });

        let joined = tokio::time::timeout(self.timeout, session)
            .await
            .map_err(|_| EtiquetaError::ChannelTimeout {
                channel: name.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            })?;

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(EtiquetaError::channel(name, message)),
            Err(e) => Err(EtiquetaError::channel(name, format!("SDK task failed: {}", e))),
        }
    }
}

#[cfg(unix)]
mod sdk {
    use std::ffi::{CStr, CString, c_char, c_int, c_void};
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    type OpenPort = unsafe extern "C" fn(*const c_char) -> c_int;
    type SendCommand = unsafe extern "C" fn(*const c_char) -> c_int;
    type ClosePort = unsafe extern "C" fn() -> c_int;

    /// A loaded SDK. Unloaded on drop.
    pub(super) struct Sdk {
        handle: *mut c_void,
        openport: OpenPort,
        sendcommand: SendCommand,
        closeport: ClosePort,
    }

    fn last_dl_error() -> String {
        // SAFETY: dlerror returns a thread-local C string or null.
        let err = unsafe { libc::dlerror() };
        if err.is_null() {
            "unknown dynamic loader error".to_string()
        } else {
            // SAFETY: non-null dlerror result is a valid C string.
            unsafe { CStr::from_ptr(err) }.to_string_lossy().into_owned()
        }
    }

    impl Sdk {
        pub(super) fn load(path: &Path) -> Result<Self, String> {
            let c_path = CString::new(path.as_os_str().as_bytes())
                .map_err(|_| format!("library path {} contains NUL", path.display()))?;

            // SAFETY: c_path is a valid NUL-terminated string.
            let handle = unsafe { libc::dlopen(c_path.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
            if handle.is_null() {
                return Err(format!("cannot load {}: {}", path.display(), last_dl_error()));
            }

            let symbol = |name: &str| -> Result<*mut c_void, String> {
                let c_name = CString::new(name).map_err(|_| "symbol name contains NUL".to_string())?;
                // SAFETY: handle is a live dlopen handle, c_name is NUL-terminated.
                let ptr = unsafe { libc::dlsym(handle, c_name.as_ptr()) };
                if ptr.is_null() {
                    Err(format!("{} does not export '{}'", path.display(), name))
                } else {
                    Ok(ptr)
                }
            };

            let resolved = (symbol("openport"), symbol("sendcommand"), symbol("closeport"));
            match resolved {
                (Ok(open), Ok(send), Ok(close)) => {
                    // SAFETY: the exports have the C signatures documented
                    // in the module header.
                    unsafe {
                        Ok(Self {
                            handle,
                            openport: std::mem::transmute::<*mut c_void, OpenPort>(open),
                            sendcommand: std::mem::transmute::<*mut c_void, SendCommand>(send),
                            closeport: std::mem::transmute::<*mut c_void, ClosePort>(close),
                        })
                    }
                }
                (open, send, close) => {
                    // SAFETY: handle came from dlopen and is not used again.
                    unsafe { libc::dlclose(handle) };
                    Err([open.err(), send.err(), close.err()]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>()
                        .join("; "))
                }
            }
        }

        /// Open `port`, send every command, close the port.
        pub(super) fn print(&self, port: &str, commands: &[String]) -> Result<(), String> {
            let c_port = CString::new(port).map_err(|_| "port name contains NUL".to_string())?;

            // SAFETY: function pointers resolved from the loaded library.
            let opened = unsafe { (self.openport)(c_port.as_ptr()) };
            if opened == 0 {
                return Err(format!("openport('{}') failed", port));
            }

            let mut result = Ok(());
            for command in commands {
                let c_cmd = match CString::new(command.as_str()) {
                    Ok(c) => c,
                    Err(_) => {
                        result = Err("command contains NUL".to_string());
                        break;
                    }
                };
                // SAFETY: as above; c_cmd outlives the call.
                let rc = unsafe { (self.sendcommand)(c_cmd.as_ptr()) };
                if rc < 0 {
                    result = Err(format!("sendcommand returned {}", rc));
                    break;
                }
            }

            // SAFETY: the port was opened above.
            unsafe { (self.closeport)() };
            result
        }
    }

    impl Drop for Sdk {
        fn drop(&mut self) {
            // SAFETY: handle came from dlopen and is closed exactly once.
            unsafe { libc::dlclose(self.handle) };
        }
    }
}

#[cfg(not(unix))]
mod sdk {
    use std::path::Path;

    pub(super) struct Sdk;

    impl Sdk {
        pub(super) fn load(_path: &Path) -> Result<Self, String> {
            Err("native SDK loading is only supported on Unix".to_string())
        }

        pub(super) fn print(&self, _port: &str, _commands: &[String]) -> Result<(), String> {
            Err("native SDK loading is only supported on Unix".to_string())
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
