//! # ZPL Directive Builders
//!
//! ZPL commands are a caret or tilde followed by a two-letter mnemonic and
//! comma-separated parameters. Every dimension is in dots.
//!
//! ## Label Layout
//!
//! ```text
//! ^XA                 start of label
//! ^CI28               UTF-8 field data
//! ^PW799              print width (dots)
//! ^LL400              label length (dots)
//! ^LH0,0              label home
//! ~SD10               darkness (0-30)
//! ^PR3                speed
//! ^MTD                direct thermal (^MTT = transfer)
//! ^FO80,80^A0N,24,24^FH^FDOrder #39798^FS
//! ^FO80,160^BY2,3.0^BEN,80,Y,N^FH^FD7290011505853^FS
//! ^PQ1                quantity
//! ^XZ                 end of label, print
//! ```
//!
//! ## Escaping
//!
//! Field data is preceded by `^FH` so characters with syntactic meaning are
//! sent as `_XX` hex escapes: `^`, `~`, `_`, `\` and `"`.

use crate::printer::PrintMode;

/// Start of label
pub const START: &str = "^XA";

/// End of label (prints it)
pub const END: &str = "^XZ";

/// Prefix of the print width directive
pub const WIDTH_PREFIX: &str = "^PW";

/// Prefix of the label length directive
pub const LENGTH_PREFIX: &str = "^LL";

/// Prefix of the darkness directive
pub const DARKNESS_PREFIX: &str = "~SD";

/// Highest darkness the printers accept
pub const MAX_DARKNESS: u8 = 30;

/// Field orientation for a clockwise rotation in degrees.
///
/// Returns `None` for angles that are not a multiple of 90.
pub fn orientation(degrees: u16) -> Option<char> {
    match degrees % 360 {
        0 => Some('N'),
        90 => Some('R'),
        180 => Some('I'),
        270 => Some('B'),
        _ => None,
    }
}

/// # Print Width (^PWn)
pub fn print_width(dots: i32) -> String {
    format!("{}{}", WIDTH_PREFIX, dots)
}

/// # Label Length (^LLn)
pub fn label_length(dots: i32) -> String {
    format!("{}{}", LENGTH_PREFIX, dots)
}

/// # Darkness (~SDn), clamped to 0-30
pub fn darkness(level: u8) -> String {
    format!("{}{:02}", DARKNESS_PREFIX, level.min(MAX_DARKNESS))
}

/// # Print Rate (^PRn)
pub fn speed(ips: u8) -> String {
    format!("^PR{}", ips)
}

/// # Media Type (^MTD / ^MTT)
pub fn media(mode: PrintMode) -> &'static str {
    match mode {
        PrintMode::Direct => "^MTD",
        PrintMode::Transfer => "^MTT",
    }
}

/// # Print Quantity (^PQn)
pub fn quantity(copies: u32) -> String {
    format!("^PQ{}", copies.max(1))
}

/// # Field Origin (^FOx,y)
pub fn field_origin(x: i32, y: i32) -> String {
    format!("^FO{},{}", x, y)
}

/// # Scalable/Bitmap Font (^A<name><o>,h,w)
pub fn font(name: &str, orientation: char, height: i32, width: i32) -> String {
    format!("^A{}{},{},{}", name, orientation, height, width)
}

/// # Field Block (^FBwidth,lines,spacing,justify,indent)
///
/// Justification: `L`, `C`, `R` or `J`.
pub fn field_block(width: i32, justify: char) -> String {
    format!("^FB{},1,0,{},0", width, justify)
}

/// # Field Data (^FH^FD...^FS)
///
/// ```
/// use etiqueta::protocol::zpl;
/// assert_eq!(zpl::field_data("A^B"), "^FH^FDA_5EB^FS");
/// ```
pub fn field_data(data: &str) -> String {
    format!("^FH^FD{}^FS", escape(data))
}

/// # Barcode Module Defaults (^BYw,ratio)
pub fn barcode_defaults(module_width: u8) -> String {
    format!("^BY{},3.0", module_width.clamp(1, 10))
}

/// Barcode families with a native ZPL command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZplBarcode {
    Code128,
    Code39,
    Ean13,
    Ean8,
    UpcA,
    Interleaved2of5,
    Qr,
    DataMatrix,
}

/// # Barcode Command
///
/// `height` is the bar height in dots, ignored by the 2D symbologies which
/// size themselves from the module width.
pub fn barcode(kind: ZplBarcode, orientation: char, height: i32, readable: bool) -> String {
    let hri = if readable { 'Y' } else { 'N' };
    match kind {
        ZplBarcode::Code128 => format!("^BC{},{},{},N,N", orientation, height, hri),
        ZplBarcode::Code39 => format!("^B3{},N,{},{},N", orientation, height, hri),
        ZplBarcode::Ean13 => format!("^BE{},{},{},N", orientation, height, hri),
        ZplBarcode::Ean8 => format!("^B8{},{},{},N", orientation, height, hri),
        ZplBarcode::UpcA => format!("^BU{},{},{},N,Y", orientation, height, hri),
        ZplBarcode::Interleaved2of5 => format!("^B2{},{},{},N,N", orientation, height, hri),
        ZplBarcode::Qr => format!("^BQ{},2,4", orientation),
        ZplBarcode::DataMatrix => format!("^BX{},4,200", orientation),
    }
}

/// # Graphic Box (^GBw,h,t,B,0^FS)
///
/// A box whose thickness equals its smaller side is drawn solid.
pub fn graphic_box(width: i32, height: i32, thickness: i32) -> String {
    format!("^GB{},{},{},B,0^FS", width, height, thickness)
}

/// # Graphic Diagonal Line (^GDw,h,t,B,o^FS)
///
/// `leaning` is `R` for a line rising to the right, `L` for falling.
pub fn graphic_diagonal(width: i32, height: i32, thickness: i32, leaning: char) -> String {
    format!("^GD{},{},{},B,{}^FS", width, height, thickness, leaning)
}

/// # Graphic Field (^GFA,total,total,row_bytes,hex^FS)
pub fn graphic_field(row_bytes: usize, data: &[u8]) -> String {
    let mut hex = String::with_capacity(data.len() * 2);
    for byte in data {
        hex.push_str(&format!("{:02X}", byte));
    }
    format!(
        "^GFA,{},{},{},{}^FS",
        data.len(),
        data.len(),
        row_bytes,
        hex
    )
}

/// Escape field data for use after `^FH`.
///
/// ```
/// use etiqueta::protocol::zpl;
/// assert_eq!(zpl::escape(r#"a_b~c\"#), "a_5Fb_7Ec_5C");
/// ```
pub fn escape(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    for c in data.chars() {
        match c {
            '_' => out.push_str("_5F"),
            '^' => out.push_str("_5E"),
            '~' => out.push_str("_7E"),
            '\\' => out.push_str("_5C"),
            '"' => out.push_str("_22"),
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
