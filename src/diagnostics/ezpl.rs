//! EZPL scanning and coordinate rewriting.
//!
//! EZPL is line-oriented, so both passes classify one line at a time.
//! Header sizes are millimeters and are converted to dots with the stream's
//! resolution; body coordinates are already dots.

use super::{Point, Scan, parse_num, scale};
use crate::label::LabelSize;
use crate::printer::mm_to_dots;
use crate::protocol::ezpl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    Start,
    End,
    Length,
    Width,
    Darkness,
    Text,
    Barcode,
    Rectangle,
    Block,
    Other,
}

impl Directive {
    fn classify(line: &str) -> Self {
        let bytes = line.as_bytes();
        match line {
            l if l == ezpl::START => Self::Start,
            l if l == ezpl::END => Self::End,
            l if l.starts_with(ezpl::LENGTH_PREFIX) => Self::Length,
            l if l.starts_with(ezpl::WIDTH_PREFIX) => Self::Width,
            l if l.starts_with(ezpl::DARKNESS_PREFIX) => Self::Darkness,
            l if l.starts_with('^') || l.starts_with('~') => Self::Other,
            l if l.starts_with("Lo,") => Self::Block,
            _ if bytes.len() > 2 && bytes[0] == b'A' && bytes[2] == b',' => Self::Text,
            _ if bytes.len() > 2 && bytes[0] == b'B' && line.contains(',') => Self::Barcode,
            _ if bytes.len() > 1 && bytes[0] == b'R' && (bytes[1].is_ascii_digit() || bytes[1] == b'-') => {
                Self::Rectangle
            }
            _ => Self::Other,
        }
    }

    /// Characters before the first comma-separated field, and the
    /// `(x, y)` field index pairs that hold coordinates.
    fn layout(self) -> (usize, &'static [(usize, usize)]) {
        match self {
            Self::Text | Self::Barcode => (0, &[(1, 2)]),
            Self::Block => (0, &[(1, 2), (3, 4)]),
            Self::Rectangle => (1, &[(0, 1), (2, 3)]),
            _ => (0, &[]),
        }
    }
}

pub(crate) fn scan(text: &str, dpi: u16) -> Scan {
    let mut scan = Scan::default();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let directive = Directive::classify(line);
        match directive {
            Directive::Start => scan.starts += 1,
            Directive::End => scan.ends += 1,
            Directive::Length | Directive::Width => {
                let first = line[2..].split(',').next();
                let what = if directive == Directive::Width { "label width" } else { "label length" };
                if let Some(mm) = parse_num::<f64>(&mut scan, line_no, what, first) {
                    match mm_to_dots(mm, dpi) {
                        Ok(dots) if directive == Directive::Width => scan.width = Some((dots, line_no)),
                        Ok(dots) => scan.height = Some((dots, line_no)),
                        Err(e) => scan.malformed.push((line_no, e.to_string())),
                    }
                }
            }
            Directive::Darkness => {
                if let Some(level) = parse_num::<u32>(&mut scan, line_no, "darkness", Some(&line[2..])) {
                    scan.density = Some((level, line_no));
                }
            }
            Directive::Text | Directive::Barcode | Directive::Rectangle | Directive::Block => {
                let (skip, pairs) = directive.layout();
                let fields: Vec<&str> = line[skip..].split(',').collect();
                for &(xi, yi) in pairs {
                    let x = parse_num::<i32>(&mut scan, line_no, "x coordinate", fields.get(xi).copied());
                    let y = parse_num::<i32>(&mut scan, line_no, "y coordinate", fields.get(yi).copied());
                    if let (Some(x), Some(y)) = (x, y) {
                        scan.points.push(Point { x, y, line: line_no });
                    }
                }
            }
            Directive::Other => {}
        }
    }

    scan
}

/// Scale every body coordinate and rewrite the size header to `target`.
pub(crate) fn rewrite(text: &str, sx: f64, sy: f64, target: LabelSize) -> String {
    let mut out = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        let directive = Directive::classify(line);

        let rewritten = match directive {
            Directive::Length => {
                let gap = line[2..].split_once(',').map(|(_, g)| g);
                match gap {
                    Some(gap) => format!("{}{},{}", ezpl::LENGTH_PREFIX, ezpl::fmt_mm(target.height_mm), gap),
                    None => format!("{}{}", ezpl::LENGTH_PREFIX, ezpl::fmt_mm(target.height_mm)),
                }
            }
            Directive::Width => ezpl::label_width(target.width_mm),
            Directive::Text | Directive::Barcode | Directive::Rectangle | Directive::Block => {
                let (skip, pairs) = directive.layout();
                let mut fields: Vec<String> = line[skip..].split(',').map(str::to_string).collect();
                for &(xi, yi) in pairs {
                    for (i, factor) in [(xi, sx), (yi, sy)] {
                        if let Some(v) = fields.get(i).and_then(|f| f.trim().parse::<i32>().ok()) {
                            fields[i] = scale(v, factor).to_string();
                        }
                    }
                }
                format!("{}{}", &line[..skip], fields.join(","))
            }
            _ => raw.to_string(),
        };
        out.push(rewritten);
    }

    out.join("\n")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "^Q50,3\n^W100\n^H10\n^P1\n^L\nAD,80,80,1,1,0,0,Hi, there\nBE,80,160,2,4,80,0,1,7290011505853\nR8,8,168,88,2,2\nLo,0,80,799,82\nE";

    #[test]
    fn test_classify() {
        assert_eq!(Directive::classify("^L"), Directive::Start);
        assert_eq!(Directive::classify("E"), Directive::End);
        assert_eq!(Directive::classify("^Q50,3"), Directive::Length);
        assert_eq!(Directive::classify("^R0"), Directive::Other);
        assert_eq!(Directive::classify("~R255"), Directive::Other);
        assert_eq!(Directive::classify("AD,1,2,1,1,0,0,x"), Directive::Text);
        assert_eq!(Directive::classify("B1,1,2,2,4,40,0,1,x"), Directive::Barcode);
        assert_eq!(Directive::classify("R1,2,3,4,1,1"), Directive::Rectangle);
        assert_eq!(Directive::classify("Lo,1,2,3,4"), Directive::Block);
    }

    #[test]
    fn test_scan() {
        let scan = scan(SAMPLE, 203);
        assert_eq!(scan.starts, 1);
        assert_eq!(scan.ends, 1);
        assert_eq!(scan.width, Some((799, 2)));
        assert_eq!(scan.height, Some((400, 1)));
        assert_eq!(scan.density, Some((10, 3)));
        assert!(scan.malformed.is_empty());
        let xs: Vec<i32> = scan.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![80, 80, 8, 168, 0, 799]);
    }

    #[test]
    fn test_malformed_coordinate() {
        let scan = scan("^L\nAD,x1,80,1,1,0,0,Hi\nE", 203);
        assert_eq!(scan.malformed.len(), 1);
        assert_eq!(scan.malformed[0].0, 2);
    }

    #[test]
    fn test_rewrite_halves() {
        let out = rewrite(SAMPLE, 0.5, 0.5, LabelSize::new(50.0, 25.0));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "^Q25,3");
        assert_eq!(lines[1], "^W50");
        assert_eq!(lines[2], "^H10");
        assert_eq!(lines[5], "AD,40,40,1,1,0,0,Hi, there");
        assert_eq!(lines[6], "BE,40,80,2,4,80,0,1,7290011505853");
        assert_eq!(lines[7], "R4,4,84,44,2,2");
        assert_eq!(lines[8], "Lo,0,40,400,41");
    }
}
