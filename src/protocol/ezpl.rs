//! # EZPL Directive Builders
//!
//! Godex EZPL is a line-oriented command language: one directive per line,
//! setup directives prefixed with `^` or `~`, drawing directives starting
//! with a letter, fields separated by commas.
//!
//! ## Label Layout
//!
//! ```text
//! ^Q50,3        label length 50mm, gap 3mm
//! ^W100         label width 100mm
//! ^H10          darkness (0-19)
//! ^P1           quantity
//! ^S3           speed
//! ^AD           direct thermal (^AT = thermal transfer)
//! ^C1           copies of each label
//! ^R0           left reference offset
//! ~Q+0          vertical offset
//! ^O0           peel-off off
//! ^D0           cutter off
//! ^E18          stop position
//! ~R255         reset for every label
//! ^L            start of label body
//! AD,80,80,1,1,0,0,Order #39798
//! BE,80,160,2,4,80,0,1,7290011505853
//! E             end of label, print
//! ```
//!
//! Sizes in the header are millimeters; coordinates in the body are dots.
//!
//! ## Escaping
//!
//! Text data runs to the end of the line, so line breaks are flattened to a
//! space and `"` / `\` are backslash-escaped.

use crate::printer::PrintMode;

/// Start of label body
pub const START: &str = "^L";

/// End of label (prints it)
pub const END: &str = "E";

/// Prefix of the label length directive
pub const LENGTH_PREFIX: &str = "^Q";

/// Prefix of the label width directive
pub const WIDTH_PREFIX: &str = "^W";

/// Prefix of the darkness directive
pub const DARKNESS_PREFIX: &str = "^H";

/// Highest darkness the printers accept
pub const MAX_DARKNESS: u8 = 19;

/// Format millimeters: integers without decimals, otherwise one decimal.
pub fn fmt_mm(mm: f64) -> String {
    let tenths = (mm * 10.0).round() / 10.0;
    if tenths.fract() == 0.0 {
        format!("{}", tenths as i64)
    } else {
        format!("{:.1}", tenths)
    }
}

/// # Label Length (^Qn,g)
///
/// ```
/// use etiqueta::protocol::ezpl;
/// assert_eq!(ezpl::label_length(50.0, 3.0), "^Q50,3");
/// ```
pub fn label_length(height_mm: f64, gap_mm: f64) -> String {
    format!("{}{},{}", LENGTH_PREFIX, fmt_mm(height_mm), fmt_mm(gap_mm))
}

/// # Label Width (^Wn)
pub fn label_width(width_mm: f64) -> String {
    format!("{}{}", WIDTH_PREFIX, fmt_mm(width_mm))
}

/// # Darkness (^Hn), clamped to 0-19
pub fn darkness(level: u8) -> String {
    format!("{}{}", DARKNESS_PREFIX, level.min(MAX_DARKNESS))
}

/// # Speed (^Sn)
pub fn speed(ips: u8) -> String {
    format!("^S{}", ips)
}

/// # Quantity (^Pn)
pub fn quantity(copies: u32) -> String {
    format!("^P{}", copies.max(1))
}

/// # Media Mode (^AD / ^AT)
pub fn media(mode: PrintMode) -> &'static str {
    match mode {
        PrintMode::Direct => "^AD",
        PrintMode::Transfer => "^AT",
    }
}

/// Fixed setup lines that follow the variable header.
///
/// Copies-per-label, reference point, offsets, no peel/cut, stop position,
/// and a reset before every label.
pub fn fixed_setup() -> [&'static str; 7] {
    ["^C1", "^R0", "~Q+0", "^O0", "^D0", "^E18", "~R255"]
}

/// Rotation code for text and barcode directives.
///
/// Returns `None` for angles that are not a multiple of 90.
pub fn rotation(degrees: u16) -> Option<u8> {
    match degrees % 360 {
        0 => Some(0),
        90 => Some(1),
        180 => Some(2),
        270 => Some(3),
        _ => None,
    }
}

/// # Internal Font Text (A<font>,x,y,xmul,ymul,gap,rotation,data)
///
/// ```
/// use etiqueta::protocol::ezpl;
/// assert_eq!(ezpl::text('B', 80, 80, 1, 1, 0, "Hi"), "AB,80,80,1,1,0,0,Hi");
/// ```
pub fn text(font: char, x: i32, y: i32, mul: u8, gap: u8, rotation: u8, data: &str) -> String {
    format!(
        "A{},{},{},{},{},{},{},{}",
        font,
        x,
        y,
        mul,
        mul,
        gap,
        rotation,
        escape(data)
    )
}

/// # Barcode (B<type>,x,y,narrow,wide,height,rotation,readable,data)
#[allow(clippy::too_many_arguments)]
pub fn barcode(
    code: &str,
    x: i32,
    y: i32,
    narrow: u8,
    wide: u8,
    height: i32,
    rotation: u8,
    readable: bool,
    data: &str,
) -> String {
    format!(
        "B{},{},{},{},{},{},{},{},{}",
        code,
        x,
        y,
        narrow,
        wide,
        height,
        rotation,
        if readable { 1 } else { 0 },
        escape(data)
    )
}

/// # Rectangle Outline (Rx1,y1,x2,y2,tx,ty)
pub fn rectangle(x1: i32, y1: i32, x2: i32, y2: i32, thickness: i32) -> String {
    format!("R{},{},{},{},{},{}", x1, y1, x2, y2, thickness, thickness)
}

/// # Solid Block (Lo,x1,y1,x2,y2)
///
/// Used for filled rectangles and horizontal/vertical lines.
pub fn block(x1: i32, y1: i32, x2: i32, y2: i32) -> String {
    format!("Lo,{},{},{},{}", x1, y1, x2, y2)
}

/// Escape text data for embedding at the end of a directive line.
///
/// ```
/// use etiqueta::protocol::ezpl;
/// assert_eq!(ezpl::escape("say \"hi\"\nnow"), "say \\\"hi\\\" now");
/// ```
pub fn escape(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    for c in data.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\r' => {}
            '\n' => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_mm() {
        assert_eq!(fmt_mm(100.0), "100");
        assert_eq!(fmt_mm(50.5), "50.5");
        assert_eq!(fmt_mm(3.04), "3");
    }

    #[test]
    fn test_header_directives() {
        assert_eq!(label_length(50.0, 3.0), "^Q50,3");
        assert_eq!(label_width(100.0), "^W100");
        assert_eq!(darkness(10), "^H10");
        assert_eq!(darkness(40), "^H19");
        assert_eq!(speed(4), "^S4");
        assert_eq!(quantity(0), "^P1");
        assert_eq!(media(PrintMode::Direct), "^AD");
        assert_eq!(media(PrintMode::Transfer), "^AT");
    }

    #[test]
    fn test_rotation_codes() {
        assert_eq!(rotation(0), Some(0));
        assert_eq!(rotation(90), Some(1));
        assert_eq!(rotation(270), Some(3));
        assert_eq!(rotation(360), Some(0));
        assert_eq!(rotation(45), None);
    }

    #[test]
    fn test_text() {
        assert_eq!(text('C', 10, 20, 2, 0, 1, "ABC"), "AC,10,20,2,2,0,1,ABC");
    }

    #[test]
    fn test_barcode() {
        assert_eq!(
            barcode("E", 80, 160, 2, 4, 80, 0, true, "7290011505853"),
            "BE,80,160,2,4,80,0,1,7290011505853"
        );
        assert_eq!(
            barcode("1", 0, 0, 2, 4, 40, 0, false, "A1"),
            "B1,0,0,2,4,40,0,0,A1"
        );
    }

    #[test]
    fn test_shapes() {
        assert_eq!(rectangle(10, 10, 100, 50, 2), "R10,10,100,50,2,2");
        assert_eq!(block(0, 80, 799, 82), "Lo,0,80,799,82");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape(r"a\b"), r"a\\b");
        assert_eq!(escape("line1\r\nline2"), "line1 line2");
    }
}
