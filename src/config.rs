//! # Engine Configuration
//!
//! Printer profile, target language and the delivery channel list, read once
//! when an orchestrator is constructed.
//!
//! ## Sources
//!
//! - **Environment**: [`EngineConfig::from_env`] reads `ETIQUETA_*` variables
//!   (the binary loads `.env` first)
//! - **JSON file**: [`EngineConfig::from_json_file`]
//!
//! ## Environment Variables
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ETIQUETA_PRINTER_FAMILY` | `godex` |
//! | `ETIQUETA_LANGUAGE` | family's language |
//! | `ETIQUETA_DPI` | family's resolution |
//! | `ETIQUETA_SPEED` / `ETIQUETA_DARKNESS` | 3 / 10 |
//! | `ETIQUETA_PRINT_MODE` | `direct` |
//! | `ETIQUETA_VALIDATE` / `ETIQUETA_AUTO_FIT` | `true` / `false` |
//! | `ETIQUETA_HOT_FOLDER` (+ `_TIMEOUT_MS`, `_POLL_MS`) | unset |
//! | `ETIQUETA_NATIVE_LIBRARY` (+ `ETIQUETA_NATIVE_PORT`) | unset |
//! | `ETIQUETA_CLI_PROGRAM` (+ `_ARGS`, `_TIMEOUT_MS`) | unset |
//! | `ETIQUETA_SOCKET_ADDR` (+ `_TIMEOUT_MS`, `_GRACE_MS`) | unset |
//! | `ETIQUETA_DEVICE_PATH` (+ `_CHUNK_SIZE`, `_CHUNK_DELAY_MS`) | unset |
//! | `ETIQUETA_SHELL_PRINTER` (+ `ETIQUETA_SHELL_TIMEOUT_MS`) | unset |
//!
//! A channel is configured only when its main variable is set. The shell
//! channel is enabled with `ETIQUETA_SHELL_PRINTER`; an empty value selects
//! the system default printer. `ETIQUETA_CLI_ARGS` is split on whitespace.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codegen::{Language, TruncationPolicy};
use crate::error::{EtiquetaError, Result};
use crate::printer::{PrintMode, PrinterFamily, PrinterProfile};
use crate::transport::{
    DeviceChannel, HotFolderChannel, NativeChannel, PrintChannel, ProcessChannel, ShellChannel,
    SocketChannel,
};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ETIQUETA_";

/// Settings shared by every channel kind. Unset fields use the channel's
/// documented default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCommon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// One configured delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelConfig {
    HotFolder {
        dir: PathBuf,
        #[serde(default)]
        poll_interval_ms: Option<u64>,
        #[serde(flatten)]
        common: ChannelCommon,
    },
    Native {
        library: PathBuf,
        #[serde(default)]
        port: Option<String>,
        #[serde(flatten)]
        common: ChannelCommon,
    },
    Process {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
        #[serde(flatten)]
        common: ChannelCommon,
    },
    Socket {
        /// `host:port`, or a bare host on port 9100.
        addr: String,
        #[serde(default)]
        grace_ms: Option<u64>,
        #[serde(flatten)]
        common: ChannelCommon,
    },
    Device {
        path: PathBuf,
        #[serde(default)]
        chunk_size: Option<usize>,
        #[serde(default)]
        chunk_delay_ms: Option<u64>,
        #[serde(flatten)]
        common: ChannelCommon,
    },
    Shell {
        #[serde(default)]
        printer: Option<String>,
        #[serde(default)]
        spooler: Option<PathBuf>,
        #[serde(flatten)]
        common: ChannelCommon,
    },
}

impl ChannelConfig {
    fn common(&self) -> &ChannelCommon {
        match self {
            Self::HotFolder { common, .. }
            | Self::Native { common, .. }
            | Self::Process { common, .. }
            | Self::Socket { common, .. }
            | Self::Device { common, .. }
            | Self::Shell { common, .. } => common,
        }
    }

    /// Build the channel this entry describes.
    pub fn build(&self) -> Result<Box<dyn PrintChannel>> {
        let common = self.common();
        let timeout = common.timeout_ms.map(Duration::from_millis);
        let ms = Duration::from_millis;

        // Apply the shared overrides to any channel builder.
        macro_rules! finish {
            ($channel:expr, $timeout_setter:ident) => {{
                let mut channel = $channel;
                if let Some(name) = &common.name {
                    channel = channel.with_name(name.clone());
                }
                if let Some(priority) = common.priority {
                    channel = channel.with_priority(priority);
                }
                if let Some(t) = timeout {
                    channel = channel.$timeout_setter(t);
                }
                Box::new(channel) as Box<dyn PrintChannel>
            }};
        }

        let channel = match self {
            Self::HotFolder {
                dir, poll_interval_ms, ..
            } => {
                let mut ch = HotFolderChannel::new(dir);
                if let Some(poll) = poll_interval_ms {
                    ch = ch.with_poll_interval(ms(*poll));
                }
                finish!(ch, with_pickup_timeout)
            }
            Self::Native { library, port, .. } => {
                let mut ch = NativeChannel::new(library);
                if let Some(port) = port {
                    ch = ch.with_port(port.clone());
                }
                finish!(ch, with_timeout)
            }
            Self::Process { program, args, .. } => {
                finish!(ProcessChannel::new(program, args.clone()), with_timeout)
            }
            Self::Socket { addr, grace_ms, .. } => {
                let mut ch = SocketChannel::from_addr(addr)?;
                if let Some(grace) = grace_ms {
                    ch = ch.with_grace(ms(*grace));
                }
                finish!(ch, with_timeout)
            }
            Self::Device {
                path,
                chunk_size,
                chunk_delay_ms,
                ..
            } => {
                let mut ch = DeviceChannel::new(path);
                if let Some(size) = chunk_size {
                    ch = ch.with_chunk_size(*size);
                }
                if let Some(delay) = chunk_delay_ms {
                    ch = ch.with_chunk_delay(ms(*delay));
                }
                finish!(ch, with_timeout)
            }
            Self::Shell { printer, spooler, .. } => {
                let mut ch = ShellChannel::new(printer.clone());
                if let Some(spooler) = spooler {
                    ch = ch.with_spooler(spooler);
                }
                finish!(ch, with_timeout)
            }
        };
        Ok(channel)
    }
}

/// Everything an orchestrator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub family: PrinterFamily,
    /// Defaults to the family's language.
    #[serde(default)]
    pub language: Option<Language>,
    /// Defaults to the family's profile.
    #[serde(default)]
    pub profile: Option<PrinterProfile>,
    #[serde(default)]
    pub truncation: TruncationPolicy,
    /// Validate every stream before delivery.
    #[serde(default = "default_true")]
    pub validate: bool,
    /// Rescale streams that fail validation, then revalidate.
    #[serde(default)]
    pub auto_fit: bool,
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            family: PrinterFamily::default(),
            language: None,
            profile: None,
            truncation: TruncationPolicy::default(),
            validate: true,
            auto_fit: false,
            channels: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Target language after defaults.
    pub fn language(&self) -> Language {
        self.language.unwrap_or_else(|| self.family.language())
    }

    /// Printer profile after defaults.
    pub fn profile(&self) -> PrinterProfile {
        self.profile.unwrap_or_else(|| PrinterProfile::for_family(self.family))
    }

    /// Check cross-field constraints.
    pub fn check(&self) -> Result<()> {
        if self.profile().dpi == 0 {
            return Err(EtiquetaError::Config("printer dpi must be > 0".into()));
        }
        if !self.language().is_printable() {
            return Err(EtiquetaError::Config(format!(
                "{} is not a printer language",
                self.language()
            )));
        }
        Ok(())
    }

    /// Build every configured channel.
    pub fn build_channels(&self) -> Result<Vec<Box<dyn PrintChannel>>> {
        self.channels.iter().map(ChannelConfig::build).collect()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EtiquetaError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    /// Read `ETIQUETA_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which receives full variable
    /// names (`ETIQUETA_DPI`, ...).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env { lookup: &lookup };

        let family = match env.get("PRINTER_FAMILY") {
            Some(f) => PrinterFamily::parse(&f)?,
            None => PrinterFamily::default(),
        };
        let language = env.get("LANGUAGE").map(|l| Language::parse(&l)).transpose()?;

        let base = PrinterProfile::for_family(family);
        let profile = PrinterProfile::new(
            env.parse("DPI")?.unwrap_or(base.dpi),
            env.parse("SPEED")?.unwrap_or(base.speed),
            env.parse("DARKNESS")?.unwrap_or(base.darkness),
            match env.get("PRINT_MODE") {
                Some(m) => PrintMode::parse(&m)?,
                None => base.print_mode,
            },
        )?;

        let mut channels = Vec::new();
        let common = |timeout_key: &str| -> Result<ChannelCommon> {
            Ok(ChannelCommon {
                timeout_ms: env.parse(timeout_key)?,
                ..ChannelCommon::default()
            })
        };

        if let Some(dir) = env.get("HOT_FOLDER") {
            channels.push(ChannelConfig::HotFolder {
                dir: dir.into(),
                poll_interval_ms: env.parse("HOT_FOLDER_POLL_MS")?,
                common: common("HOT_FOLDER_TIMEOUT_MS")?,
            });
        }
        if let Some(library) = env.get("NATIVE_LIBRARY") {
            channels.push(ChannelConfig::Native {
                library: library.into(),
                port: env.get("NATIVE_PORT"),
                common: common("NATIVE_TIMEOUT_MS")?,
            });
        }
        if let Some(program) = env.get("CLI_PROGRAM") {
            channels.push(ChannelConfig::Process {
                program: program.into(),
                args: env
                    .get("CLI_ARGS")
                    .map(|a| a.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default(),
                common: common("CLI_TIMEOUT_MS")?,
            });
        }
        if let Some(addr) = env.get("SOCKET_ADDR") {
            channels.push(ChannelConfig::Socket {
                addr,
                grace_ms: env.parse("SOCKET_GRACE_MS")?,
                common: common("SOCKET_TIMEOUT_MS")?,
            });
        }
        if let Some(path) = env.get("DEVICE_PATH") {
            channels.push(ChannelConfig::Device {
                path: path.into(),
                chunk_size: env.parse("DEVICE_CHUNK_SIZE")?,
                chunk_delay_ms: env.parse("DEVICE_CHUNK_DELAY_MS")?,
                common: common("DEVICE_TIMEOUT_MS")?,
            });
        }
        if let Some(printer) = env.raw("SHELL_PRINTER") {
            channels.push(ChannelConfig::Shell {
                printer: Some(printer).filter(|p| !p.trim().is_empty()),
                spooler: None,
                common: common("SHELL_TIMEOUT_MS")?,
            });
        }

        let config = Self {
            family,
            language,
            profile: Some(profile),
            truncation: TruncationPolicy::default(),
            validate: env.flag("VALIDATE")?.unwrap_or(true),
            auto_fit: env.flag("AUTO_FIT")?.unwrap_or(false),
            channels,
        };
        config.check()?;
        Ok(config)
    }
}

/// Prefixed, typed access to a variable lookup.
struct Env<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn key(name: &str) -> String {
        format!("{}{}", ENV_PREFIX, name)
    }

    /// Value as set, including empty strings.
    fn raw(&self, name: &str) -> Option<String> {
        (self.lookup)(&Self::key(name))
    }

    /// Trimmed non-empty value.
    fn get(&self, name: &str) -> Option<String> {
        self.raw(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.get(name)
            .map(|v| {
                v.parse().map_err(|_| {
                    EtiquetaError::Config(format!("{} has invalid value '{}'", Self::key(name), v))
                })
            })
            .transpose()
    }

    fn flag(&self, name: &str) -> Result<Option<bool>> {
        match self.get(name).map(|v| v.to_ascii_lowercase()) {
            None => Ok(None),
            Some(v) => match v.as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(EtiquetaError::Config(format!(
                    "{} must be true or false, got '{}'",
                    Self::key(name),
                    v
                ))),
            },
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (format!("{}{}", ENV_PREFIX, k), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_env_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.language(), Language::Ezpl);
        assert_eq!(config.profile().dpi, 203);
        assert!(config.validate);
        assert!(!config.auto_fit);
        assert!(config.channels.is_empty());
    }

    #[test]
    fn test_family_sets_dpi_and_language() {
        let config = EngineConfig::from_lookup(lookup(&[("PRINTER_FAMILY", "zebra300")])).unwrap();
        assert_eq!(config.language(), Language::Zpl);
        assert_eq!(config.profile().dpi, 300);

        let config =
            EngineConfig::from_lookup(lookup(&[("PRINTER_FAMILY", "zebra"), ("DPI", "600")])).unwrap();
        assert_eq!(config.profile().dpi, 600);
    }

    #[test]
    fn test_channels_from_env_in_order() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("SOCKET_ADDR", "10.0.0.5:9100"),
            ("SOCKET_GRACE_MS", "50"),
            ("CLI_PROGRAM", "ezpcli"),
            ("CLI_ARGS", "--raw {file}"),
            ("SHELL_PRINTER", ""),
        ]))
        .unwrap();

        assert_eq!(config.channels.len(), 3);
        match &config.channels[0] {
            ChannelConfig::Process { program, args, .. } => {
                assert_eq!(program, &PathBuf::from("ezpcli"));
                assert_eq!(args, &vec!["--raw".to_string(), "{file}".to_string()]);
            }
            other => panic!("expected process channel, got {:?}", other),
        }
        assert!(matches!(&config.channels[1], ChannelConfig::Socket { grace_ms: Some(50), .. }));
        assert!(matches!(&config.channels[2], ChannelConfig::Shell { printer: None, .. }));

        let built = config.build_channels().unwrap();
        let names: Vec<&str> = built.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["cli", "socket", "shell"]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(EngineConfig::from_lookup(lookup(&[("DPI", "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("DPI", "high")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("VALIDATE", "maybe")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("LANGUAGE", "xml")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("SOCKET_TIMEOUT_MS", "-1"), ("SOCKET_ADDR", "a")])).is_err());
    }

    #[test]
    fn test_json_config() {
        let config = EngineConfig::from_json(
            r#"{
                "family": "zebra",
                "auto_fit": true,
                "channels": [
                    {"type": "hot_folder", "dir": "/srv/labels", "timeout_ms": 2000, "priority": 99},
                    {"type": "socket", "addr": "printer.local", "name": "floor-2"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.language(), Language::Zpl);
        assert!(config.validate);
        assert!(config.auto_fit);

        let built = config.build_channels().unwrap();
        assert_eq!(built[0].name(), "hot-folder");
        assert_eq!(built[0].priority(), 99);
        assert_eq!(built[1].name(), "floor-2");
        assert_eq!(built[1].priority(), crate::transport::socket::DEFAULT_PRIORITY);
    }

    #[test]
    fn test_json_rejects_unknown_channel_type() {
        let err = EngineConfig::from_json(r#"{"channels": [{"type": "fax"}]}"#).unwrap_err();
        assert!(matches!(err, EtiquetaError::Json(_)));
    }
}
