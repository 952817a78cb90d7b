//! Element struct types for the label model.
//!
//! All types derive `Serialize + Deserialize` so the same types work for
//! both Rust construction and JSON label files. Positions and sizes are in
//! millimeters from the top-left corner of the label.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_text_size() -> f64 {
    3.0
}

fn default_barcode_height() -> f64 {
    10.0
}

fn default_module_width() -> u8 {
    2
}

fn default_line_width() -> f64 {
    0.3
}

// ============================================================================
// TEXT
// ============================================================================

/// Horizontal text alignment inside the text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Text field.
///
/// `size` is the character height in millimeters. Alignment is applied
/// inside a field that starts at `x` and spans `width` millimeters (or the
/// rest of the label when `width` is omitted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub x: f64,
    pub y: f64,
    pub text: String,
    /// Font override: an EZPL internal font letter (`A`-`H`) or a ZPL font
    /// name (`0`, `A`-`Z`). `None` picks a font from `size`.
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default = "default_text_size")]
    pub size: f64,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    /// Clockwise rotation in degrees: 0, 90, 180 or 270.
    #[serde(default)]
    pub rotation: u16,
    #[serde(default)]
    pub alignment: Alignment,
    /// Field width for alignment, in millimeters.
    #[serde(default)]
    pub width: Option<f64>,
    /// Character budget override. `Some(0)` disables truncation.
    #[serde(default)]
    pub max_chars: Option<usize>,
}

impl Text {
    pub fn new(x: f64, y: f64, text: impl Into<String>) -> Self {
        Self {
            x,
            y,
            text: text.into(),
            font: None,
            size: default_text_size(),
            bold: false,
            italic: false,
            rotation: 0,
            alignment: Alignment::Left,
            width: None,
            max_chars: None,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn size(mut self, mm: f64) -> Self {
        self.size = mm;
        self
    }

    pub fn align(mut self, alignment: Alignment, width_mm: f64) -> Self {
        self.alignment = alignment;
        self.width = Some(width_mm);
        self
    }

    pub fn rotate(mut self, degrees: u16) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn max_chars(mut self, budget: usize) -> Self {
        self.max_chars = Some(budget);
        self
    }
}

// ============================================================================
// BARCODE
// ============================================================================

/// 1D/2D barcode.
///
/// `symbology` is matched case-insensitively against each language's fixed
/// symbology table; an unknown name fails generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Barcode {
    pub x: f64,
    pub y: f64,
    pub data: String,
    pub symbology: String,
    /// Bar height in millimeters.
    #[serde(default = "default_barcode_height")]
    pub height: f64,
    /// Narrow bar (module) width in dots.
    #[serde(default = "default_module_width")]
    pub width: u8,
    /// Print the human-readable interpretation below the bars.
    #[serde(default = "default_true")]
    pub show_text: bool,
    /// Clockwise rotation in degrees: 0, 90, 180 or 270.
    #[serde(default)]
    pub rotation: u16,
}

impl Barcode {
    pub fn new(x: f64, y: f64, data: impl Into<String>, symbology: impl Into<String>) -> Self {
        Self {
            x,
            y,
            data: data.into(),
            symbology: symbology.into(),
            height: default_barcode_height(),
            width: default_module_width(),
            show_text: true,
            rotation: 0,
        }
    }

    pub fn height(mut self, mm: f64) -> Self {
        self.height = mm;
        self
    }

    pub fn module_width(mut self, dots: u8) -> Self {
        self.width = dots;
        self
    }

    pub fn hide_text(mut self) -> Self {
        self.show_text = false;
        self
    }
}

// ============================================================================
// SHAPES
// ============================================================================

/// Rectangle outline or filled box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Border thickness in millimeters.
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    #[serde(default)]
    pub filled: bool,
}

impl Rectangle {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            line_width: default_line_width(),
            filled: false,
        }
    }

    pub fn filled(mut self) -> Self {
        self.filled = true;
        self
    }

    pub fn line_width(mut self, mm: f64) -> Self {
        self.line_width = mm;
        self
    }
}

/// Straight line from `(x, y)` to `(x2, y2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub x: f64,
    pub y: f64,
    pub x2: f64,
    pub y2: f64,
    /// Thickness in millimeters.
    #[serde(default = "default_line_width")]
    pub width: f64,
}

impl Line {
    pub fn new(x: f64, y: f64, x2: f64, y2: f64) -> Self {
        Self {
            x,
            y,
            x2,
            y2,
            width: default_line_width(),
        }
    }

    pub fn width(mut self, mm: f64) -> Self {
        self.width = mm;
        self
    }

    pub fn is_horizontal(&self) -> bool {
        self.y == self.y2
    }

    pub fn is_vertical(&self) -> bool {
        self.x == self.x2
    }
}

/// Raster image.
///
/// `data` is base64 of any format the `image` crate decodes (PNG, BMP, ...).
/// The image is scaled to `width` x `height` millimeters and thresholded to
/// 1 bit per pixel at generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub x: f64,
    pub y: f64,
    pub data: String,
    pub width: f64,
    pub height: f64,
}

impl Image {
    pub fn new(x: f64, y: f64, data: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            data: data.into(),
            width,
            height,
        }
    }
}
