//! # EZPL Generator
//!
//! Emits a Godex EZPL stream. Header sizes are millimeters (`^Q`, `^W`);
//! element coordinates are dots at the profile's resolution.
//!
//! EZPL has no inline graphic or diagonal-line directive in this engine, so
//! `Image` elements and diagonal `Line`s fail generation.

use tracing::debug;

use super::barcode::Symbology;
use super::text::TruncationPolicy;
use super::{CommandGenerator, CommandStream, Dots, Language, element_error};
use crate::error::Result;
use crate::label::{Alignment, Barcode, Element, LabelSpec, Line, Rectangle, Text};
use crate::printer::PrinterProfile;
use crate::protocol::ezpl;

/// Internal bitmap fonts: `(letter, cell width, cell height)` in dots.
const FONTS: &[(char, i32, i32)] = &[
    ('A', 6, 10),
    ('B', 8, 14),
    ('C', 10, 18),
    ('D', 12, 22),
    ('E', 14, 26),
    ('F', 18, 34),
    ('G', 24, 48),
    ('H', 32, 64),
];

/// Largest font multiplier the printers accept.
const MAX_MULTIPLIER: i32 = 8;

/// Godex EZPL generator.
#[derive(Debug, Clone)]
pub struct EzplGenerator {
    profile: PrinterProfile,
    truncation: TruncationPolicy,
}

impl EzplGenerator {
    pub fn new(profile: PrinterProfile) -> Self {
        Self {
            profile,
            truncation: TruncationPolicy::default(),
        }
    }

    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.truncation = truncation;
        self
    }

    fn text(&self, lines: &mut Vec<String>, text: &Text, label: &LabelSpec, dots: &Dots) -> std::result::Result<(), String> {
        if text.text.is_empty() {
            return Err("text is empty".into());
        }
        let rotation = ezpl::rotation(text.rotation)
            .ok_or_else(|| format!("rotation {} is not a multiple of 90", text.rotation))?;

        let height = dots.dots(text.size).map_err(|e| e.to_string())?;
        if height <= 0 {
            return Err(format!("text size {}mm is too small", text.size));
        }
        let (font, cell_w, mul) = pick_font(text.font.as_deref(), height)?;

        if text.italic {
            debug!("EZPL internal fonts have no italic; printing upright");
        }

        let data = self.truncation.apply(&text.text, text.max_chars);
        let mut x = dots.dots(text.x).map_err(|e| e.to_string())?;
        let y = dots.dots(text.y).map_err(|e| e.to_string())?;

        if text.alignment != Alignment::Left {
            let field = match text.width {
                Some(w) => dots.dots(w).map_err(|e| e.to_string())?,
                None => dots.dots(label.width_mm - text.x).map_err(|e| e.to_string())?,
            };
            let used = data.chars().count() as i32 * cell_w * mul;
            x += match text.alignment {
                Alignment::Center => ((field - used) / 2).max(0),
                Alignment::Right => (field - used).max(0),
                Alignment::Left => 0,
            };
        }

        let mul = mul as u8;
        lines.push(ezpl::text(font, x, y, mul, 0, rotation, &data));
        if text.bold {
            // Overstrike one dot to the right.
            lines.push(ezpl::text(font, x + 1, y, mul, 0, rotation, &data));
        }
        Ok(())
    }

    fn barcode(&self, lines: &mut Vec<String>, barcode: &Barcode, dots: &Dots) -> std::result::Result<(), String> {
        let symbology = Symbology::parse(&barcode.symbology).map_err(|e| e.to_string())?;
        let code = symbology
            .ezpl_code()
            .ok_or_else(|| format!("EZPL has no code for {}", symbology.name()))?;
        symbology.check_data(&barcode.data)?;

        let rotation = ezpl::rotation(barcode.rotation)
            .ok_or_else(|| format!("rotation {} is not a multiple of 90", barcode.rotation))?;
        let height = dots.dots(barcode.height).map_err(|e| e.to_string())?;
        if height <= 0 {
            return Err(format!("bar height {}mm is too small", barcode.height));
        }

        let narrow = barcode.width.max(1);
        let wide = narrow.saturating_mul(2);
        lines.push(ezpl::barcode(
            code,
            dots.dots(barcode.x).map_err(|e| e.to_string())?,
            dots.dots(barcode.y).map_err(|e| e.to_string())?,
            narrow,
            wide,
            height,
            rotation,
            barcode.show_text,
            &barcode.data,
        ));
        Ok(())
    }

    fn rectangle(&self, lines: &mut Vec<String>, rect: &Rectangle, dots: &Dots) -> std::result::Result<(), String> {
        if !(rect.width > 0.0 && rect.height > 0.0) {
            return Err(format!("size {}x{}mm must be positive", rect.width, rect.height));
        }
        let conv = |mm: f64| dots.dots(mm).map_err(|e| e.to_string());
        let (x1, y1) = (conv(rect.x)?, conv(rect.y)?);
        let (x2, y2) = (conv(rect.x + rect.width)?, conv(rect.y + rect.height)?);

        if rect.filled {
            lines.push(ezpl::block(x1, y1, x2, y2));
        } else {
            let thickness = conv(rect.line_width)?.max(1);
            lines.push(ezpl::rectangle(x1, y1, x2, y2, thickness));
        }
        Ok(())
    }

    fn line(&self, lines: &mut Vec<String>, line: &Line, dots: &Dots) -> std::result::Result<(), String> {
        let conv = |mm: f64| dots.dots(mm).map_err(|e| e.to_string());
        let thickness = conv(line.width)?.max(1);
        let (x1, y1, x2, y2) = (conv(line.x)?, conv(line.y)?, conv(line.x2)?, conv(line.y2)?);

        if line.is_horizontal() {
            let y = dots.stroke_y(y1, thickness);
            lines.push(ezpl::block(x1.min(x2), y, x1.max(x2), y + thickness));
        } else if line.is_vertical() {
            let x = dots.stroke_x(x1, thickness);
            lines.push(ezpl::block(x, y1.min(y2), x + thickness, y1.max(y2)));
        } else {
            return Err("EZPL has no diagonal line directive".into());
        }
        Ok(())
    }
}

/// Choose a font letter, its cell width and a multiplier for `height` dots.
fn pick_font(name: Option<&str>, height: i32) -> std::result::Result<(char, i32, i32), String> {
    let multiplier = |cell_h: i32| ((height as f64 / cell_h as f64).round() as i32).clamp(1, MAX_MULTIPLIER);

    if let Some(name) = name {
        let letter = name.trim().to_ascii_uppercase();
        let entry = FONTS
            .iter()
            .find(|(l, _, _)| letter.len() == 1 && letter.starts_with(*l))
            .ok_or_else(|| format!("unknown EZPL font '{}'", name))?;
        return Ok((entry.0, entry.1, multiplier(entry.2)));
    }

    let largest = FONTS[FONTS.len() - 1];
    if height > largest.2 {
        return Ok((largest.0, largest.1, multiplier(largest.2)));
    }
    let closest = FONTS
        .iter()
        .min_by_key(|(_, _, cell_h)| (cell_h - height).abs())
        .copied()
        .unwrap_or(largest);
    Ok((closest.0, closest.1, 1))
}

impl CommandGenerator for EzplGenerator {
    fn language(&self) -> Language {
        Language::Ezpl
    }

    fn generate(&self, label: &LabelSpec) -> Result<CommandStream> {
        let (dots, profile) = Dots::for_label(label, &self.profile)?;

        let mut lines = vec![
            ezpl::label_length(label.height_mm, label.gap_mm),
            ezpl::label_width(label.width_mm),
            ezpl::darkness(profile.darkness),
            ezpl::quantity(label.copies),
            ezpl::speed(profile.speed),
            ezpl::media(profile.print_mode).to_string(),
        ];
        lines.extend(ezpl::fixed_setup().iter().map(|s| s.to_string()));
        lines.push(ezpl::START.to_string());

        for (index, element) in label.elements.iter().enumerate() {
            let result = match element {
                Element::Text(t) => self.text(&mut lines, t, label, &dots),
                Element::Barcode(b) => self.barcode(&mut lines, b, &dots),
                Element::Rectangle(r) => self.rectangle(&mut lines, r, &dots),
                Element::Line(l) => self.line(&mut lines, l, &dots),
                Element::Image(_) => Err("EZPL has no inline graphic directive".into()),
                Element::Unsupported { kind } => Err(format!("unsupported element type '{}'", kind)),
            };
            result.map_err(|msg| element_error(index, element.kind(), msg))?;
        }

        lines.push(ezpl::END.to_string());

        Ok(CommandStream::new(
            Language::Ezpl,
            label.size(),
            profile.dpi,
            lines.join("\n"),
        ))
    }
}

// ============================================================================
// TESTS
// ============================================================================
