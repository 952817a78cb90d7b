//! # Stream Diagnostics
//!
//! Re-parses a [`CommandStream`], collects every coordinate its directives
//! reference and checks them against the physical label size.
//!
//! | Check | Severity |
//! |-------|----------|
//! | Coordinate beyond the declared width/height | Error |
//! | Negative coordinate | Error |
//! | Missing start or end directive, unbalanced labels | Error |
//! | Unparseable numeric parameter | Error |
//! | Size directive disagreeing with the declared size | Warning |
//! | Darkness above the safe threshold | Warning |
//!
//! Text and barcode fields are checked at their anchor point. Boxes, lines
//! and graphic fields are checked at their anchor and far corner.
//!
//! [`rescale`] is the auto-correction: a per-axis linear transform of every
//! coordinate so the content's extent matches a target size. It keeps font
//! and bar sizes, so it does not guarantee legibility.

mod ezpl;
mod zpl;

use serde::Serialize;

use crate::codegen::{CommandStream, Language};
use crate::error::{EtiquetaError, Result};
use crate::label::LabelSize;
use crate::printer::mm_to_dots;

/// EZPL `^H` values above this are flagged.
pub const EZPL_DENSITY_LIMIT: u32 = 15;

/// ZPL `~SD` values above this are flagged.
pub const ZPL_DENSITY_LIMIT: u32 = 25;

/// Size directives may differ from the declared size by this many dots
/// (millimeter rounding in EZPL headers).
const SIZE_TOLERANCE_DOTS: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Overflow,
    NegativeCoordinate,
    MissingStart,
    MissingEnd,
    UnbalancedLabels,
    Malformed,
    SizeMismatch,
    HighDensity,
}

/// One finding, tied to the 1-based line it was found on (0 = whole stream).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub line: usize,
    pub message: String,
}

impl Issue {
    fn error(kind: IssueKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            line,
            message: message.into(),
        }
    }

    fn warning(kind: IssueKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if self.line > 0 {
            write!(f, "{} (line {}): {}", severity, self.line, self.message)
        } else {
            write!(f, "{}: {}", severity, self.message)
        }
    }
}

/// Result of [`validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// No error-severity issues. Warnings do not affect validity.
    pub is_valid: bool,
    pub issues: Vec<Issue>,
    /// Largest referenced `(x, y)` in dots, if the stream references any.
    pub observed_max: Option<(i32, i32)>,
    /// Declared size in dots at the stream's resolution.
    pub declared_dots: (i32, i32),
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// One line per error, `; `-joined.
    pub fn error_summary(&self) -> String {
        self.errors()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ============================================================================
// SCANNING
// ============================================================================

/// A referenced position in dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Point {
    pub x: i32,
    pub y: i32,
    pub line: usize,
}

/// What a language scanner extracts from a stream.
#[derive(Debug, Default)]
pub(crate) struct Scan {
    pub points: Vec<Point>,
    /// Declared `(dots, line)` width and height from the size directives.
    pub width: Option<(i32, usize)>,
    pub height: Option<(i32, usize)>,
    pub starts: usize,
    pub ends: usize,
    pub density: Option<(u32, usize)>,
    pub malformed: Vec<(usize, String)>,
}

impl Scan {
    fn observed_max(&self) -> Option<(i32, i32)> {
        if self.points.is_empty() {
            return None;
        }
        let x = self.points.iter().map(|p| p.x).max().unwrap_or(0);
        let y = self.points.iter().map(|p| p.y).max().unwrap_or(0);
        Some((x, y))
    }
}

/// Parse a numeric field, recording a malformed issue on failure.
pub(crate) fn parse_num<T: std::str::FromStr>(
    scan: &mut Scan,
    line: usize,
    what: &str,
    raw: Option<&str>,
) -> Option<T> {
    match raw.map(str::trim) {
        Some(s) => match s.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                scan.malformed.push((line, format!("{} '{}' is not a number", what, s)));
                None
            }
        },
        None => {
            scan.malformed.push((line, format!("{} is missing", what)));
            None
        }
    }
}

fn scan(stream: &CommandStream) -> Result<Scan> {
    match stream.language() {
        Language::Ezpl => Ok(ezpl::scan(stream.text(), stream.dpi())),
        Language::Zpl => Ok(zpl::scan(stream.text())),
        Language::Xml => Err(EtiquetaError::Validation(
            "XML is not a printer language and cannot be validated".into(),
        )),
    }
}

fn declared_dots(size: LabelSize, dpi: u16) -> Result<(i32, i32)> {
    let w = mm_to_dots(size.width_mm, dpi)?;
    let h = mm_to_dots(size.height_mm, dpi)?;
    if w <= 0 || h <= 0 {
        return Err(EtiquetaError::InvalidGeometry(format!(
            "declared size {} is not positive",
            size
        )));
    }
    Ok((w, h))
}

// ============================================================================
// VALIDATE
// ============================================================================

/// Check `stream` against the physical label size `declared`.
///
/// Fails only when the stream cannot be checked at all (XML streams, a
/// non-positive declared size); everything found in the stream is reported
/// as an [`Issue`].
pub fn validate(stream: &CommandStream, declared: LabelSize) -> Result<ValidationReport> {
    let (max_x, max_y) = declared_dots(declared, stream.dpi())?;
    let scan = scan(stream)?;
    let mut issues = Vec::new();

    if scan.starts == 0 {
        issues.push(Issue::error(IssueKind::MissingStart, 0, "no label start directive"));
    }
    if scan.ends == 0 {
        issues.push(Issue::error(IssueKind::MissingEnd, 0, "no label end directive"));
    }
    if scan.starts > 0 && scan.ends > 0 && scan.starts != scan.ends {
        issues.push(Issue::error(
            IssueKind::UnbalancedLabels,
            0,
            format!("{} label starts but {} label ends", scan.starts, scan.ends),
        ));
    }

    for (line, message) in &scan.malformed {
        issues.push(Issue::error(IssueKind::Malformed, *line, message.clone()));
    }

    for p in &scan.points {
        if p.x < 0 || p.y < 0 {
            issues.push(Issue::error(
                IssueKind::NegativeCoordinate,
                p.line,
                format!("coordinate ({}, {}) is negative", p.x, p.y),
            ));
        } else if p.x > max_x || p.y > max_y {
            issues.push(Issue::error(
                IssueKind::Overflow,
                p.line,
                format!(
                    "coordinate ({}, {}) is outside the {}x{} dot label",
                    p.x, p.y, max_x, max_y
                ),
            ));
        }
    }

    for (axis, found, expected) in [("width", scan.width, max_x), ("height", scan.height, max_y)] {
        match found {
            Some((dots, line)) if (dots - expected).abs() > SIZE_TOLERANCE_DOTS => {
                issues.push(Issue::warning(
                    IssueKind::SizeMismatch,
                    line,
                    format!("stream declares {} {} dots, label is {} dots", axis, dots, expected),
                ));
            }
            Some(_) => {}
            None => issues.push(Issue::warning(
                IssueKind::SizeMismatch,
                0,
                format!("stream declares no label {}", axis),
            )),
        }
    }

    let limit = match stream.language() {
        Language::Ezpl => EZPL_DENSITY_LIMIT,
        _ => ZPL_DENSITY_LIMIT,
    };
    match scan.density {
        Some((density, line)) if density > limit => issues.push(Issue::warning(
            IssueKind::HighDensity,
            line,
            format!("darkness {} is above the safe limit of {}", density, limit),
        )),
        _ => {}
    }

    let is_valid = !issues.iter().any(|i| i.severity == Severity::Error);
    Ok(ValidationReport {
        is_valid,
        issues,
        observed_max: scan.observed_max(),
        declared_dots: (max_x, max_y),
    })
}

// ============================================================================
// RESCALE
// ============================================================================

/// Per-axis scale factors mapping the observed extent onto `target` dots.
///
/// An axis with no positive extent keeps factor 1.
fn scale_factors(observed: Option<(i32, i32)>, target: (i32, i32)) -> (f64, f64) {
    let factor = |seen: i32, want: i32| {
        if seen > 0 {
            want as f64 / seen as f64
        } else {
            1.0
        }
    };
    match observed {
        Some((x, y)) => (factor(x, target.0), factor(y, target.1)),
        None => (1.0, 1.0),
    }
}

pub(crate) fn scale(value: i32, factor: f64) -> i32 {
    (value as f64 * factor).round() as i32
}

/// Rewrite `stream` so its content spans `target`.
///
/// Every coordinate pair is multiplied by `target / observed max` on each
/// axis and the size directives are rewritten to `target`. Malformed streams
/// are refused rather than partially rewritten.
pub fn rescale(stream: &CommandStream, target: LabelSize) -> Result<CommandStream> {
    let target_dots = declared_dots(target, stream.dpi())?;
    let scan = scan(stream)?;
    if let Some((line, message)) = scan.malformed.first() {
        return Err(EtiquetaError::Validation(format!(
            "cannot rescale a malformed stream (line {}): {}",
            line, message
        )));
    }

    let (sx, sy) = scale_factors(scan.observed_max(), target_dots);
    tracing::debug!(sx, sy, target = %target, "rescaling stream");

    let text = match stream.language() {
        Language::Ezpl => ezpl::rewrite(stream.text(), sx, sy, target),
        Language::Zpl => zpl::rewrite(stream.text(), sx, sy, target_dots),
        Language::Xml => {
            return Err(EtiquetaError::Validation("XML streams cannot be rescaled".into()));
        }
    };

    Ok(CommandStream::new(stream.language(), target, stream.dpi(), text))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen;
    use crate::label::{Barcode, LabelSpec, Line, Rectangle, Text};
    use crate::printer::{PrinterFamily, PrinterProfile};

    fn order_label() -> LabelSpec {
        LabelSpec::new(100.0, 50.0)
            .with(Text::new(10.0, 10.0, "Order #39798"))
            .with(Barcode::new(10.0, 20.0, "7290011505853", "EAN13"))
            .with(Rectangle::new(0.0, 0.0, 100.0, 50.0))
            .with(Line::new(0.0, 30.0, 100.0, 30.0))
    }

    #[test]
    fn test_generated_streams_are_clean() {
        for language in [Language::Ezpl, Language::Zpl] {
            let label = order_label();
            let stream = codegen::generate(&label, language, &PrinterProfile::default()).unwrap();
            let report = validate(&stream, label.size()).unwrap();
            assert!(report.is_valid, "{}: {:?}", language, report.issues);
            assert!(report.issues.is_empty(), "{}: {:?}", language, report.issues);
        }
    }

    #[test]
    fn test_edge_and_overflow() {
        for language in [Language::Ezpl, Language::Zpl] {
            let inside = LabelSpec::new(100.0, 50.0).with(Text::new(99.0, 49.0, "edge"));
            let stream = codegen::generate(&inside, language, &PrinterProfile::default()).unwrap();
            assert!(validate(&stream, inside.size()).unwrap().is_valid);

            let outside = LabelSpec::new(100.0, 50.0).with(Text::new(101.0, 51.0, "off"));
            let stream = codegen::generate(&outside, language, &PrinterProfile::default()).unwrap();
            let report = validate(&stream, outside.size()).unwrap();
            assert!(!report.is_valid);
            assert!(report.issues.iter().any(|i| i.kind == IssueKind::Overflow));
        }
    }

    #[test]
    fn test_negative_coordinate() {
        let label = LabelSpec::new(100.0, 50.0).with(Text::new(-2.0, 5.0, "neg"));
        let stream = codegen::generate(&label, Language::Zpl, &PrinterProfile::default()).unwrap();
        let report = validate(&stream, label.size()).unwrap();
        assert!(report.issues.iter().any(|i| i.kind == IssueKind::NegativeCoordinate));
    }

    #[test]
    fn test_missing_end() {
        let stream = CommandStream::from_raw(
            "^XA\n^PW799\n^LL400\n^FO10,10^A0N,24,24^FDx^FS",
            Language::Zpl,
            LabelSize::new(100.0, 50.0),
            203,
        )
        .unwrap();
        let report = validate(&stream, stream.size()).unwrap();
        assert!(!report.is_valid);
        assert!(report.issues.iter().any(|i| i.kind == IssueKind::MissingEnd));
    }

    #[test]
    fn test_density_is_warning_only() {
        let mut profile = PrinterProfile::for_family(PrinterFamily::Godex);
        profile.darkness = 18;
        let label = LabelSpec::new(60.0, 40.0).with_profile(profile);
        let stream = codegen::generate(&label, Language::Ezpl, &profile).unwrap();
        let report = validate(&stream, label.size()).unwrap();
        assert!(report.is_valid);
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::HighDensity);
    }

    #[test]
    fn test_size_mismatch_warns() {
        let label = LabelSpec::new(100.0, 50.0);
        let stream = codegen::generate(&label, Language::Zpl, &PrinterProfile::default()).unwrap();
        let report = validate(&stream, LabelSize::new(60.0, 50.0)).unwrap();
        assert!(report.issues.iter().any(|i| i.kind == IssueKind::SizeMismatch));
    }

    #[test]
    fn test_xml_cannot_be_validated() {
        let label = LabelSpec::new(100.0, 50.0);
        let stream = codegen::generate(&label, Language::Xml, &PrinterProfile::default()).unwrap();
        assert!(validate(&stream, label.size()).is_err());
    }

    #[test]
    fn test_rescale_fits_overflowing_stream() {
        for language in [Language::Ezpl, Language::Zpl] {
            let big = LabelSpec::new(100.0, 50.0)
                .with(Text::new(10.0, 10.0, "Order"))
                .with(Rectangle::new(0.0, 0.0, 100.0, 50.0));
            let stream = codegen::generate(&big, language, &PrinterProfile::default()).unwrap();

            let target = LabelSize::new(50.0, 25.0);
            assert!(!validate(&stream, target).unwrap().is_valid);

            let fitted = rescale(&stream, target).unwrap();
            let report = validate(&fitted, target).unwrap();
            assert!(report.is_valid, "{}: {:?}", language, report.issues);
            assert!(report.warnings().next().is_none(), "{}: {:?}", language, report.issues);
            assert_eq!(fitted.size(), target);
            assert_eq!(fitted.label_count(), 1);
        }
    }

    #[test]
    fn test_rescale_empty_content_keeps_coordinates() {
        assert_eq!(scale_factors(None, (100, 100)), (1.0, 1.0));
        assert_eq!(scale_factors(Some((0, 50)), (100, 100)), (1.0, 2.0));
    }
}
