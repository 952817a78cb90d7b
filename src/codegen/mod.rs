//! # Command Generation
//!
//! Converts a [`LabelSpec`] into a printer-native [`CommandStream`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌───────────────┐
//! │  LabelSpec  │ ──► │ CommandGenerator │ ──► │ CommandStream │
//! │    (mm)     │     │ (EZPL/ZPL/XML)   │     │ (text + tags) │
//! └─────────────┘     └──────────────────┘     └───────────────┘
//! ```
//!
//! Generation is deterministic and pure: the same label and profile always
//! produce the same text. Every element either becomes a directive or fails
//! generation; nothing is dropped silently.
//!
//! ## Example
//!
//! ```
//! use etiqueta::codegen::{self, Language};
//! use etiqueta::label::{Barcode, LabelSpec, Text};
//! use etiqueta::printer::PrinterProfile;
//!
//! let label = LabelSpec::new(100.0, 50.0)
//!     .with(Text::new(10.0, 10.0, "Order #39798"))
//!     .with(Barcode::new(10.0, 20.0, "7290011505853", "EAN13"));
//!
//! let stream = codegen::generate(&label, Language::Ezpl, &PrinterProfile::default())?;
//! assert!(stream.text().contains("^W100"));
//! assert!(stream.text().contains("7290011505853"));
//! # Ok::<(), etiqueta::EtiquetaError>(())
//! ```

pub mod barcode;
pub mod ezpl;
mod text;
pub mod xml;
pub mod zpl;

pub use barcode::Symbology;
pub use ezpl::EzplGenerator;
pub use text::TruncationPolicy;
pub use xml::XmlGenerator;
pub use zpl::ZplGenerator;

use serde::{Deserialize, Serialize};

use crate::error::{EtiquetaError, Result};
use crate::label::{LabelSize, LabelSpec};
use crate::printer::PrinterProfile;

/// Target command language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Godex EZPL
    Ezpl,
    /// Zebra ZPL
    Zpl,
    /// Vendor label-designer XML (editor target, not printable)
    Xml,
}

impl Language {
    /// Parse a language name (`ezpl`, `zpl`, `xml`) or file extension.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ezpl" | "ezp" => Ok(Self::Ezpl),
            "zpl" => Ok(Self::Zpl),
            "xml" => Ok(Self::Xml),
            other => Err(EtiquetaError::Config(format!(
                "Unknown language '{}'. Use 'ezpl', 'zpl' or 'xml'",
                other
            ))),
        }
    }

    /// Whether streams in this language can be sent to a printer.
    pub fn is_printable(self) -> bool {
        !matches!(self, Self::Xml)
    }

    /// Label-termination directive.
    pub fn end_directive(self) -> &'static str {
        match self {
            Self::Ezpl => crate::protocol::ezpl::END,
            Self::Zpl => crate::protocol::zpl::END,
            Self::Xml => "</Label>",
        }
    }

    /// Conventional file extension for hot-folder and spool files.
    pub fn file_extension(self) -> &'static str {
        match self {
            Self::Ezpl => "ezp",
            Self::Zpl => "zpl",
            Self::Xml => "xml",
        }
    }

    /// Count label-termination directives in `text`.
    pub fn count_labels(self, text: &str) -> usize {
        match self {
            // EZPL's terminator is a bare `E` line.
            Self::Ezpl => text.lines().filter(|l| l.trim() == "E").count(),
            Self::Zpl | Self::Xml => text.matches(self.end_directive()).count(),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ezpl => "EZPL",
            Self::Zpl => "ZPL",
            Self::Xml => "XML",
        };
        f.write_str(name)
    }
}

/// A generated command stream, tagged with what it was generated for.
///
/// Produced once and never mutated; rescaling produces a new stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandStream {
    language: Language,
    size: LabelSize,
    dpi: u16,
    label_count: usize,
    text: String,
}

impl CommandStream {
    pub(crate) fn new(language: Language, size: LabelSize, dpi: u16, text: String) -> Self {
        let label_count = language.count_labels(&text);
        Self {
            language,
            size,
            dpi,
            label_count,
            text,
        }
    }

    /// Wrap caller-supplied command text.
    ///
    /// The text is taken as-is; run it through [`crate::diagnostics::validate`]
    /// to check it against `size`.
    pub fn from_raw(
        text: impl Into<String>,
        language: Language,
        size: LabelSize,
        dpi: u16,
    ) -> Result<Self> {
        if dpi == 0 {
            return Err(EtiquetaError::InvalidGeometry("dpi must be > 0".into()));
        }
        let text = text.into();
        if text.trim().is_empty() {
            return Err(EtiquetaError::Generation("command text is empty".into()));
        }
        Ok(Self::new(language, size, dpi, text))
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Label size the stream was generated for.
    pub fn size(&self) -> LabelSize {
        self.size
    }

    /// Resolution the stream's dot coordinates assume.
    pub fn dpi(&self) -> u16 {
        self.dpi
    }

    /// Number of label-termination directives in the stream.
    pub fn label_count(&self) -> usize {
        self.label_count
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// One implementation per target language.
pub trait CommandGenerator: Send + Sync {
    /// Language this generator emits.
    fn language(&self) -> Language;

    /// Generate the command stream for one label.
    fn generate(&self, label: &LabelSpec) -> Result<CommandStream>;
}

/// Build the generator for `language` with the given default profile.
pub fn generator_for(
    language: Language,
    profile: PrinterProfile,
    truncation: TruncationPolicy,
) -> Box<dyn CommandGenerator> {
    match language {
        Language::Ezpl => Box::new(EzplGenerator::new(profile).with_truncation(truncation)),
        Language::Zpl => Box::new(ZplGenerator::new(profile).with_truncation(truncation)),
        Language::Xml => Box::new(XmlGenerator::new(profile)),
    }
}

/// Generate `label` in `language` with the default truncation policy.
pub fn generate(
    label: &LabelSpec,
    language: Language,
    profile: &PrinterProfile,
) -> Result<CommandStream> {
    generator_for(language, *profile, TruncationPolicy::default()).generate(label)
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Millimeter → dot conversion bound to one label's profile.
pub(crate) struct Dots {
    dpi: u16,
    /// Label extent in dots.
    width: i32,
    height: i32,
}

impl Dots {
    /// Resolve the profile for `label` and check its physical size.
    pub(crate) fn for_label(label: &LabelSpec, fallback: &PrinterProfile) -> Result<(Self, PrinterProfile)> {
        let profile = label.profile_or(fallback);
        if profile.dpi == 0 {
            return Err(EtiquetaError::InvalidGeometry("printer dpi must be > 0".into()));
        }
        for (name, value) in [("width", label.width_mm), ("height", label.height_mm)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(EtiquetaError::InvalidGeometry(format!(
                    "label {} must be a positive number of millimeters, got {}",
                    name, value
                )));
            }
        }
        let width = crate::printer::mm_to_dots(label.width_mm, profile.dpi)?;
        let height = crate::printer::mm_to_dots(label.height_mm, profile.dpi)?;
        Ok((
            Self {
                dpi: profile.dpi,
                width,
                height,
            },
            profile,
        ))
    }

    pub(crate) fn dots(&self, mm: f64) -> Result<i32> {
        crate::printer::mm_to_dots(mm, self.dpi)
    }

    /// Start column of a `thickness`-dot vertical stroke at `x`.
    pub(crate) fn stroke_x(&self, x: i32, thickness: i32) -> i32 {
        inset(x, thickness, self.width)
    }

    /// Start row of a `thickness`-dot horizontal stroke at `y`.
    pub(crate) fn stroke_y(&self, y: i32, thickness: i32) -> i32 {
        inset(y, thickness, self.height)
    }
}

/// Strokes grow toward larger coordinates. One that starts on the label but
/// would run past `limit` is drawn inward instead. Strokes already off the
/// label are left for the validator to report.
fn inset(at: i32, thickness: i32, limit: i32) -> i32 {
    if at <= limit && at + thickness > limit {
        (limit - thickness).max(0)
    } else {
        at
    }
}

/// Generation error for element `index`.
pub(crate) fn element_error(index: usize, kind: &str, message: impl std::fmt::Display) -> EtiquetaError {
    EtiquetaError::Generation(format!("elements[{}] ({}): {}", index, kind, message))
}

// ============================================================================
// TESTS
// ============================================================================
