//! # ZPL Generator
//!
//! Emits a Zebra ZPL stream. Every dimension, header included, is in dots
//! at the profile's resolution. Each element becomes one line of `^FO...^FS`
//! fields; field data is hex-escaped through `^FH`.

use tracing::debug;

use super::barcode::Symbology;
use super::text::TruncationPolicy;
use super::{CommandGenerator, CommandStream, Dots, Language, element_error};
use crate::error::Result;
use crate::label::{Alignment, Barcode, Element, Image, LabelSpec, Line, Rectangle, Text};
use crate::printer::PrinterProfile;
use crate::protocol::graphics;
use crate::protocol::zpl::{self, ZplBarcode};

/// Scalable font used when an element names none.
const DEFAULT_FONT: &str = "0";

type ElementResult = std::result::Result<(), String>;

/// Zebra ZPL generator.
#[derive(Debug, Clone)]
pub struct ZplGenerator {
    profile: PrinterProfile,
    truncation: TruncationPolicy,
}

impl ZplGenerator {
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

    fn text(&self, lines: &mut Vec<String>, text: &Text, label: &LabelSpec, dots: &Dots) -> ElementResult {
        if text.text.is_empty() {
            return Err("text is empty".into());
        }
        let orientation = zpl::orientation(text.rotation)
            .ok_or_else(|| format!("rotation {} is not a multiple of 90", text.rotation))?;
        let conv = |mm: f64| dots.dots(mm).map_err(|e| e.to_string());

        let height = conv(text.size)?;
        if height <= 0 {
            return Err(format!("text size {}mm is too small", text.size));
        }
        let font_name = match text.font.as_deref().map(str::trim) {
            Some(name) if name.len() == 1 && name.chars().all(|c| c.is_ascii_alphanumeric()) => {
                name.to_ascii_uppercase()
            }
            Some(name) => return Err(format!("unknown ZPL font '{}'", name)),
            None => DEFAULT_FONT.to_string(),
        };
        if text.italic {
            debug!("ZPL resident fonts have no italic; printing upright");
        }

        let block = if text.alignment != Alignment::Left || text.width.is_some() {
            let width = match text.width {
                Some(w) => conv(w)?,
                None => conv(label.width_mm - text.x)?,
            };
            let justify = match text.alignment {
                Alignment::Left => 'L',
                Alignment::Center => 'C',
                Alignment::Right => 'R',
            };
            zpl::field_block(width.max(1), justify)
        } else {
            String::new()
        };

        let data = self.truncation.apply(&text.text, text.max_chars);
        let x = conv(text.x)?;
        let y = conv(text.y)?;
        let font = zpl::font(&font_name, orientation, height, height);
        let field = |x: i32| format!("{}{}{}{}", zpl::field_origin(x, y), font, block, zpl::field_data(&data));

        lines.push(field(x));
        if text.bold {
            // Overstrike one dot to the right.
            lines.push(field(x + 1));
        }
        Ok(())
    }

    fn barcode(&self, lines: &mut Vec<String>, barcode: &Barcode, dots: &Dots) -> ElementResult {
        let symbology = Symbology::parse(&barcode.symbology).map_err(|e| e.to_string())?;
        symbology.check_data(&barcode.data)?;

        let orientation = zpl::orientation(barcode.rotation)
            .ok_or_else(|| format!("rotation {} is not a multiple of 90", barcode.rotation))?;
        let conv = |mm: f64| dots.dots(mm).map_err(|e| e.to_string());
        let height = conv(barcode.height)?;
        if height <= 0 {
            return Err(format!("bar height {}mm is too small", barcode.height));
        }

        let kind = symbology.zpl_kind();
        let data = match kind {
            // QR field data carries error correction and input mode.
            ZplBarcode::Qr => format!("QA,{}", barcode.data),
            _ => barcode.data.clone(),
        };

        lines.push(format!(
            "{}{}{}{}",
            zpl::field_origin(conv(barcode.x)?, conv(barcode.y)?),
            zpl::barcode_defaults(barcode.width),
            zpl::barcode(kind, orientation, height, barcode.show_text),
            zpl::field_data(&data)
        ));
        Ok(())
    }

    fn rectangle(&self, lines: &mut Vec<String>, rect: &Rectangle, dots: &Dots) -> ElementResult {
        let conv = |mm: f64| dots.dots(mm).map_err(|e| e.to_string());
        let (width, height) = (conv(rect.width)?, conv(rect.height)?);
        if width <= 0 || height <= 0 {
            return Err(format!("size {}x{}mm must be positive", rect.width, rect.height));
        }
        let thickness = if rect.filled {
            width.min(height)
        } else {
            conv(rect.line_width)?.clamp(1, width.min(height))
        };

        lines.push(format!(
            "{}{}",
            zpl::field_origin(conv(rect.x)?, conv(rect.y)?),
            zpl::graphic_box(width, height, thickness)
        ));
        Ok(())
    }

    fn line(&self, lines: &mut Vec<String>, line: &Line, dots: &Dots) -> ElementResult {
        let conv = |mm: f64| dots.dots(mm).map_err(|e| e.to_string());
        let thickness = conv(line.width)?.max(1);
        let (x1, y1, x2, y2) = (conv(line.x)?, conv(line.y)?, conv(line.x2)?, conv(line.y2)?);
        let (dx, dy) = ((x2 - x1).abs(), (y2 - y1).abs());
        let (left, top) = (x1.min(x2), y1.min(y2));

        let (origin, shape) = if line.is_horizontal() {
            (
                zpl::field_origin(left, dots.stroke_y(top, thickness)),
                zpl::graphic_box(dx.max(thickness), thickness, thickness),
            )
        } else if line.is_vertical() {
            (
                zpl::field_origin(dots.stroke_x(left, thickness), top),
                zpl::graphic_box(thickness, dy.max(thickness), thickness),
            )
        } else {
            // Falling toward the bottom right leans left.
            let leaning = if (x2 - x1).signum() == (y2 - y1).signum() { 'L' } else { 'R' };
            (
                zpl::field_origin(left, top),
                zpl::graphic_diagonal(dx.max(1), dy.max(1), thickness, leaning),
            )
        };

        lines.push(format!("{}{}", origin, shape));
        Ok(())
    }

    fn image(&self, lines: &mut Vec<String>, image: &Image, dots: &Dots) -> ElementResult {
        let conv = |mm: f64| dots.dots(mm).map_err(|e| e.to_string());
        let (width, height) = (conv(image.width)?, conv(image.height)?);
        if width <= 0 || height <= 0 {
            return Err(format!("size {}x{}mm must be positive", image.width, image.height));
        }

        let decoded = graphics::decode_base64_image(&image.data).map_err(|e| e.to_string())?;
        let bitmap = graphics::to_bitmap(&decoded, width as usize, height as usize)
            .map_err(|e| e.to_string())?;

        lines.push(format!(
            "{}{}",
            zpl::field_origin(conv(image.x)?, conv(image.y)?),
            zpl::graphic_field(bitmap.row_bytes, &bitmap.data)
        ));
        Ok(())
    }
}

impl CommandGenerator for ZplGenerator {
    fn language(&self) -> Language {
        Language::Zpl
    }

    fn generate(&self, label: &LabelSpec) -> Result<CommandStream> {
        let (dots, profile) = Dots::for_label(label, &self.profile)?;

        let mut lines = vec![
            zpl::START.to_string(),
            "^CI28".to_string(),
            zpl::print_width(dots.dots(label.width_mm)?),
            zpl::label_length(dots.dots(label.height_mm)?),
            "^LH0,0".to_string(),
            zpl::darkness(profile.darkness),
            zpl::speed(profile.speed),
            zpl::media(profile.print_mode).to_string(),
        ];

        for (index, element) in label.elements.iter().enumerate() {
            let result = match element {
                Element::Text(t) => self.text(&mut lines, t, label, &dots),
                Element::Barcode(b) => self.barcode(&mut lines, b, &dots),
                Element::Rectangle(r) => self.rectangle(&mut lines, r, &dots),
                Element::Line(l) => self.line(&mut lines, l, &dots),
                Element::Image(i) => self.image(&mut lines, i, &dots),
                Element::Unsupported { kind } => Err(format!("unsupported element type '{}'", kind)),
            };
            result.map_err(|msg| element_error(index, element.kind(), msg))?;
        }

        lines.push(zpl::quantity(label.copies));
        lines.push(zpl::END.to_string());

        Ok(CommandStream::new(
            Language::Zpl,
            label.size(),
            profile.dpi,
            lines.join("\n"),
        ))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::{PrinterFamily, PrintMode};
    use base64::{Engine, engine::general_purpose::STANDARD};
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn generate(label: &LabelSpec) -> Result<CommandStream> {
        ZplGenerator::new(PrinterProfile::for_family(PrinterFamily::Zebra)).generate(label)
    }

    #[test]
    fn test_order_label() {
        let label = LabelSpec::new(100.0, 50.0)
            .with(Text::new(10.0, 10.0, "Order #39798"))
            .with(Barcode::new(10.0, 20.0, "7290011505853", "EAN13"));
        let stream = generate(&label).unwrap();
        let lines: Vec<&str> = stream.text().lines().collect();

        assert_eq!(
            &lines[..8],
            &["^XA", "^CI28", "^PW799", "^LL400", "^LH0,0", "~SD10", "^PR3", "^MTD"]
        );
        assert_eq!(lines[8], "^FO80,80^A0N,24,24^FH^FDOrder #39798^FS");
        assert_eq!(lines[9], "^FO80,160^BY2,3.0^BEN,80,Y,N^FH^FD7290011505853^FS");
        assert_eq!(&lines[10..], &["^PQ1", "^XZ"]);
        assert_eq!(stream.label_count(), 1);
    }

    #[test]
    fn test_300_dpi_header() {
        let label = LabelSpec::new(100.0, 50.0);
        let stream = ZplGenerator::new(PrinterProfile::for_family(PrinterFamily::Zebra300))
            .generate(&label)
            .unwrap();
        assert!(stream.text().contains("^PW1181\n^LL591"));
    }

    #[test]
    fn test_transfer_mode_and_copies() {
        let mut profile = PrinterProfile::default();
        profile.print_mode = PrintMode::Transfer;
        let mut label = LabelSpec::new(50.0, 30.0).with_profile(profile);
        label.copies = 4;
        let text = generate(&label).unwrap().into_text();
        assert!(text.contains("^MTT"));
        assert!(text.contains("^PQ4\n^XZ"));
    }

    #[test]
    fn test_text_escaping() {
        let label = LabelSpec::new(100.0, 50.0).with(Text::new(0.0, 0.0, "A^XZ~B_C"));
        let text = generate(&label).unwrap().into_text();
        assert!(text.contains("^FDA_5EXZ_7EB_5FC^FS"));
        assert_eq!(text.matches("^XZ").count(), 1);
    }

    #[test]
    fn test_centered_text_uses_field_block() {
        let label = LabelSpec::new(100.0, 50.0)
            .with(Text::new(0.0, 0.0, "Mid").align(Alignment::Center, 100.0));
        assert!(generate(&label).unwrap().text().contains("^FB799,1,0,C,0^FH^FDMid^FS"));
    }

    #[test]
    fn test_rotated_text() {
        let label = LabelSpec::new(100.0, 50.0).with(Text::new(5.0, 5.0, "Up").rotate(270));
        assert!(generate(&label).unwrap().text().contains("^A0B,24,24"));

        let label = LabelSpec::new(100.0, 50.0).with(Text::new(5.0, 5.0, "Up").rotate(45));
        assert!(generate(&label).is_err());
    }

    #[test]
    fn test_qr_prefix() {
        let label = LabelSpec::new(100.0, 50.0).with(Barcode::new(5.0, 5.0, "https://x.io", "qr"));
        assert!(generate(&label).unwrap().text().contains("^BQN,2,4^FH^FDQA,https://x.io^FS"));
    }

    #[test]
    fn test_shapes() {
        let label = LabelSpec::new(100.0, 50.0)
            .with(Rectangle::new(1.0, 1.0, 20.0, 10.0))
            .with(Rectangle::new(1.0, 1.0, 20.0, 10.0).filled())
            .with(Line::new(0.0, 10.0, 100.0, 10.0))
            .with(Line::new(0.0, 0.0, 10.0, 10.0))
            .with(Line::new(0.0, 10.0, 10.0, 0.0));
        let text = generate(&label).unwrap().into_text();
        assert!(text.contains("^FO8,8^GB160,80,2,B,0^FS"));
        assert!(text.contains("^FO8,8^GB160,80,80,B,0^FS"));
        assert!(text.contains("^FO0,80^GB799,2,2,B,0^FS"));
        assert!(text.contains("^FO0,0^GD80,80,2,B,L^FS"));
        assert!(text.contains("^FO0,0^GD80,80,2,B,R^FS"));
    }

    #[test]
    fn test_edge_lines_stay_on_label() {
        let label = LabelSpec::new(100.0, 50.0)
            .with(Line::new(0.0, 50.0, 100.0, 50.0))
            .with(Line::new(100.0, 0.0, 100.0, 50.0));
        let text = generate(&label).unwrap().into_text();
        assert!(text.contains("^FO0,398^GB799,2,2,B,0^FS"), "{}", text);
        assert!(text.contains("^FO797,0^GB2,400,2,B,0^FS"), "{}", text);
    }

    #[test]
    fn test_image_becomes_graphic_field() {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([0])))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let image = Image::new(1.0, 1.0, STANDARD.encode(bytes), 2.0, 1.0);
        let label = LabelSpec::new(100.0, 50.0).with(image);
        let text = generate(&label).unwrap().into_text();
        // 2mm x 1mm = 16 x 8 dots = 2 bytes per row, 16 bytes total.
        assert!(text.contains(&format!("^FO8,8^GFA,16,16,2,{}^FS", "FF".repeat(16))));
    }

    #[test]
    fn test_bad_image_data_names_element() {
        let label = LabelSpec::new(100.0, 50.0)
            .with(Text::new(0.0, 0.0, "ok"))
            .with(Image::new(0.0, 0.0, "###", 5.0, 5.0));
        let err = generate(&label).unwrap_err();
        assert!(err.to_string().contains("elements[1] (image)"));
    }

    #[test]
    fn test_invalid_ean_data() {
        let label = LabelSpec::new(100.0, 50.0).with(Barcode::new(0.0, 0.0, "12AB", "EAN13"));
        assert!(generate(&label).is_err());
    }
}
