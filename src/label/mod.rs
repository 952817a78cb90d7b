//! # Label Model
//!
//! A device-independent description of one label: its physical size and a
//! list of drawing elements positioned in millimeters. `LabelSpec` is
//! constructible in Rust and deserializable from JSON.
//!
//! ```
//! use etiqueta::label::{Barcode, Element, LabelSpec, Text};
//!
//! // Rust construction
//! let label = LabelSpec::new(100.0, 50.0)
//!     .with(Text::new(10.0, 10.0, "Order #39798"))
//!     .with(Barcode::new(10.0, 20.0, "7290011505853", "EAN13"));
//!
//! // JSON deserialization
//! let parsed = LabelSpec::from_json(r#"{
//!     "width_mm": 100, "height_mm": 50,
//!     "elements": [{"type": "text", "x": 10, "y": 10, "text": "Order #39798"}]
//! }"#).unwrap();
//!
//! assert_eq!(parsed.elements.len(), 1);
//! assert_eq!(label.elements.len(), 2);
//! ```
//!
//! Element objects whose `type` is not one of the known variants are kept as
//! [`Element::Unsupported`] so that generation, not parsing, rejects them
//! with an error naming the offending type.

pub mod types;

pub use types::*;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::printer::PrinterProfile;

/// Element type names understood by the generators.
const KNOWN_ELEMENTS: &[&str] = &["text", "barcode", "rectangle", "line", "image"];

fn default_copies() -> u32 {
    1
}

fn default_gap() -> f64 {
    3.0
}

/// Physical label dimensions in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl LabelSize {
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
        }
    }
}

impl std::fmt::Display for LabelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}mm", self.width_mm, self.height_mm)
    }
}

/// A drawing element.
///
/// Each variant carries only the fields meaningful to it. The `type` tag
/// enables JSON like `{"type": "text", "x": 10, "y": 10, "text": "Hello"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Text(Text),
    Barcode(Barcode),
    Rectangle(Rectangle),
    Line(Line),
    Image(Image),
    /// An element type no generator knows. Always fails generation.
    Unsupported { kind: String },
}

impl Element {
    /// Type name as it appears in JSON.
    pub fn kind(&self) -> &str {
        match self {
            Element::Text(_) => "text",
            Element::Barcode(_) => "barcode",
            Element::Rectangle(_) => "rectangle",
            Element::Line(_) => "line",
            Element::Image(_) => "image",
            Element::Unsupported { kind } => kind,
        }
    }

    /// Anchor position in millimeters, if the element has one.
    pub fn origin(&self) -> Option<(f64, f64)> {
        match self {
            Element::Text(t) => Some((t.x, t.y)),
            Element::Barcode(b) => Some((b.x, b.y)),
            Element::Rectangle(r) => Some((r.x, r.y)),
            Element::Line(l) => Some((l.x, l.y)),
            Element::Image(i) => Some((i.x, i.y)),
            Element::Unsupported { .. } => None,
        }
    }
}

impl From<Text> for Element {
    fn from(t: Text) -> Self {
        Element::Text(t)
    }
}

impl From<Barcode> for Element {
    fn from(b: Barcode) -> Self {
        Element::Barcode(b)
    }
}

impl From<Rectangle> for Element {
    fn from(r: Rectangle) -> Self {
        Element::Rectangle(r)
    }
}

impl From<Line> for Element {
    fn from(l: Line) -> Self {
        Element::Line(l)
    }
}

impl From<Image> for Element {
    fn from(i: Image) -> Self {
        Element::Image(i)
    }
}

/// Deserialize a `Vec<Element>`, keeping unknown element types.
///
/// Each element is first parsed as raw JSON. Objects whose `type` is not a
/// known element become [`Element::Unsupported`]; known types go through the
/// derived deserializer so missing fields still fail with a precise message.
fn deserialize_elements<'de, D>(deserializer: D) -> std::result::Result<Vec<Element>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<serde_json::Value> = Vec::deserialize(deserializer)?;
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            let obj = match v {
                serde_json::Value::Object(map) => map,
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "elements[{}]: expected object, got {}",
                        i, other
                    )));
                }
            };

            let kind = match obj.get("type") {
                Some(serde_json::Value::String(s)) => s.clone(),
                _ => {
                    return Err(serde::de::Error::custom(format!(
                        "elements[{}]: missing 'type' field",
                        i
                    )));
                }
            };

            if !KNOWN_ELEMENTS.contains(&kind.as_str()) {
                return Ok(Element::Unsupported { kind });
            }

            serde_json::from_value(serde_json::Value::Object(obj))
                .map_err(|e| serde::de::Error::custom(format!("elements[{}]: {}", i, e)))
        })
        .collect()
}

/// A label to generate: physical size plus drawing elements.
///
/// Owned by the caller and treated as immutable by the generators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSpec {
    pub width_mm: f64,
    pub height_mm: f64,
    #[serde(default, deserialize_with = "deserialize_elements")]
    pub elements: Vec<Element>,
    /// Per-label profile. `None` uses the generator's configured profile.
    #[serde(default)]
    pub printer_profile: Option<PrinterProfile>,
    /// Number of copies to print (default: 1).
    #[serde(default = "default_copies")]
    pub copies: u32,
    /// Gap between labels on the roll, in millimeters (default: 3).
    #[serde(default = "default_gap")]
    pub gap_mm: f64,
}

impl LabelSpec {
    /// Create an empty label of the given size.
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self {
            width_mm,
            height_mm,
            elements: Vec::new(),
            printer_profile: None,
            copies: default_copies(),
            gap_mm: default_gap(),
        }
    }

    /// Parse a label from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Add an element (builder style).
    pub fn with(mut self, element: impl Into<Element>) -> Self {
        self.elements.push(element.into());
        self
    }

    /// Add an element.
    pub fn push(&mut self, element: impl Into<Element>) {
        self.elements.push(element.into());
    }

    /// Attach a printer profile that overrides the generator's default.
    pub fn with_profile(mut self, profile: PrinterProfile) -> Self {
        self.printer_profile = Some(profile);
        self
    }

    /// Physical size of the label.
    pub fn size(&self) -> LabelSize {
        LabelSize::new(self.width_mm, self.height_mm)
    }

    /// The label's own profile, or `fallback` when it has none.
    pub fn profile_or(&self, fallback: &PrinterProfile) -> PrinterProfile {
        self.printer_profile.unwrap_or(*fallback)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let label = LabelSpec::new(100.0, 50.0)
            .with(Text::new(10.0, 10.0, "Hello"))
            .with(Line::new(0.0, 20.0, 100.0, 20.0));
        assert_eq!(label.elements.len(), 2);
        assert_eq!(label.size(), LabelSize::new(100.0, 50.0));
        assert_eq!(label.copies, 1);
    }

    #[test]
    fn test_json_defaults() {
        let label = LabelSpec::from_json(
            r#"{"width_mm": 60, "height_mm": 40, "elements": [
                {"type": "text", "x": 1, "y": 2, "text": "A"},
                {"type": "barcode", "x": 1, "y": 10, "data": "123", "symbology": "code128"}
            ]}"#,
        )
        .unwrap();

        match &label.elements[0] {
            Element::Text(t) => {
                assert_eq!(t.size, 3.0);
                assert_eq!(t.alignment, Alignment::Left);
                assert!(!t.bold);
            }
            other => panic!("expected text, got {:?}", other),
        }
        match &label.elements[1] {
            Element::Barcode(b) => {
                assert_eq!(b.height, 10.0);
                assert_eq!(b.width, 2);
                assert!(b.show_text);
            }
            other => panic!("expected barcode, got {:?}", other),
        }
        assert_eq!(label.gap_mm, 3.0);
        assert!(label.printer_profile.is_none());
    }

    #[test]
    fn test_unknown_element_kept_as_unsupported() {
        let label = LabelSpec::from_json(
            r#"{"width_mm": 60, "height_mm": 40, "elements": [
                {"type": "ellipse", "x": 1, "y": 2}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            label.elements[0],
            Element::Unsupported {
                kind: "ellipse".into()
            }
        );
        assert_eq!(label.elements[0].origin(), None);
    }

    #[test]
    fn test_missing_type_rejected() {
        let err = LabelSpec::from_json(
            r#"{"width_mm": 60, "height_mm": 40, "elements": [{"x": 1}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("missing 'type'"));
    }

    #[test]
    fn test_missing_required_field_reports_index() {
        let err = LabelSpec::from_json(
            r#"{"width_mm": 60, "height_mm": 40, "elements": [
                {"type": "text", "x": 1, "y": 2, "text": "ok"},
                {"type": "barcode", "x": 1, "y": 2}
            ]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("elements[1]"));
    }

    #[test]
    fn test_profile_or() {
        let fallback = PrinterProfile::default();
        let label = LabelSpec::new(10.0, 10.0);
        assert_eq!(label.profile_or(&fallback).dpi, 203);

        let mut high = fallback;
        high.dpi = 300;
        let label = label.with_profile(high);
        assert_eq!(label.profile_or(&fallback).dpi, 300);
    }

    #[test]
    fn test_line_orientation() {
        assert!(Line::new(0.0, 5.0, 10.0, 5.0).is_horizontal());
        assert!(Line::new(5.0, 0.0, 5.0, 10.0).is_vertical());
        let diagonal = Line::new(0.0, 0.0, 10.0, 10.0);
        assert!(!diagonal.is_horizontal() && !diagonal.is_vertical());
    }
}
