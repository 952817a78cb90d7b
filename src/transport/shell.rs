//! # OS Shell Channel
//!
//! Last-resort delivery through the operating system's own print spooler.
//! The stream is spooled to a temporary file and a short script hands it to
//! the spooler as raw data:
//!
//! ```text
//! POSIX:       lp -d 'Godex_G500' -o raw '/tmp/etiqueta-x.ezp'
//! PowerShell:  Copy-Item -LiteralPath 'C:\...\etiqueta-x.ezp' -Destination '\\localhost\Godex_G500'
//! ```
//!
//! Every value is single-quoted for the target shell, so printer names and
//! paths with spaces or quotes are passed through literally.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{ChannelKind, PrintChannel, find_program, spool};
use crate::codegen::CommandStream;
use crate::error::{EtiquetaError, Result};

/// Default hard timeout for one script run
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default priority in the fallback chain
pub const DEFAULT_PRIORITY: i32 = 10;

/// Which shell the script is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlavor {
    /// `sh -c` with CUPS `lp`
    Posix,
    /// `powershell -Command` copying to the printer share
    PowerShell,
}

impl ShellFlavor {
    /// The flavor of the running platform.
    pub fn native() -> Self {
        if cfg!(windows) { Self::PowerShell } else { Self::Posix }
    }

    fn interpreter(self) -> &'static str {
        match self {
            Self::Posix => "sh",
            Self::PowerShell => "powershell",
        }
    }

    fn interpreter_args(self) -> &'static [&'static str] {
        match self {
            Self::Posix => &["-c"],
            Self::PowerShell => &["-NoProfile", "-NonInteractive", "-Command"],
        }
    }

    fn quote(self, value: &str) -> String {
        match self {
            Self::Posix => format!("'{}'", value.replace('\'', r"'\''")),
            Self::PowerShell => format!("'{}'", value.replace('\'', "''")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShellChannel {
    name: String,
    printer: Option<String>,
    flavor: ShellFlavor,
    /// Spooler program for the POSIX flavor.
    spooler: PathBuf,
    timeout: Duration,
    priority: i32,
}

impl ShellChannel {
    /// Print to `printer`, or the system default printer when `None`.
    pub fn new(printer: Option<String>) -> Self {
        Self {
            name: "shell".to_string(),
            printer: printer.filter(|p| !p.trim().is_empty()),
            flavor: ShellFlavor::native(),
            spooler: PathBuf::from("lp"),
            timeout: DEFAULT_TIMEOUT,
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_flavor(mut self, flavor: ShellFlavor) -> Self {
        self.flavor = flavor;
        self
    }

    /// Replace `lp` with another spooler accepting the same arguments.
    pub fn with_spooler(mut self, spooler: impl Into<PathBuf>) -> Self {
        self.spooler = spooler.into();
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

    /// The script that prints `file`.
    pub fn script(&self, file: &Path) -> Result<String> {
        let q = |v: &str| self.flavor.quote(v);
        let file = file.to_string_lossy();
        match self.flavor {
            ShellFlavor::Posix => {
                let mut script = q(&self.spooler.to_string_lossy());
                if let Some(printer) = &self.printer {
                    script.push_str(&format!(" -d {}", q(printer)));
                }
                script.push_str(&format!(" -o raw {}", q(&file)));
                Ok(script)
            }
            ShellFlavor::PowerShell => {
                let printer = self.printer.as_deref().ok_or_else(|| {
                    EtiquetaError::Config("PowerShell printing needs a printer share name".into())
                })?;
                Ok(format!(
                    "Copy-Item -LiteralPath {} -Destination {}",
                    q(&file),
                    q(&format!(r"\\localhost\{}", printer))
                ))
            }
        }
    }

    async fn run(&self, interpreter: PathBuf, stream: &CommandStream) -> Result<()> {
        let file = spool(stream, None)?;
        let script = self.script(file.path())?;

        debug!(channel = %self.name, interpreter = %interpreter.display(), %script, "running print script");

        let output = Command::new(&interpreter)
            .args(self.flavor.interpreter_args())
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EtiquetaError::channel(&self.name, format!("spawn {}: {}", interpreter.display(), e)))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(EtiquetaError::channel(
            &self.name,
            format!("print script exited with {}: {}", output.status, stderr.trim()),
        ))
    }
}

#[async_trait]
impl PrintChannel for ShellChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Shell
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn availability(&self) -> Result<()> {
        let interpreter = self.flavor.interpreter();
        if find_program(Path::new(interpreter)).is_none() {
            return Err(EtiquetaError::unavailable(&self.name, format!("{} not found", interpreter)));
        }
        match self.flavor {
            ShellFlavor::Posix if find_program(&self.spooler).is_none() => Err(EtiquetaError::unavailable(
                &self.name,
                format!("spooler '{}' not found", self.spooler.display()),
            )),
            ShellFlavor::PowerShell if self.printer.is_none() => {
                Err(EtiquetaError::unavailable(&self.name, "no printer share configured"))
            }
            _ => Ok(()),
        }
    }

    async fn send(&self, stream: &CommandStream) -> Result<()> {
        let interpreter = find_program(Path::new(self.flavor.interpreter())).ok_or_else(|| {
            EtiquetaError::channel(&self.name, format!("{} not found", self.flavor.interpreter()))
        })?;

        tokio::time::timeout(self.timeout, self.run(interpreter, stream))
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
