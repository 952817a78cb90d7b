//! ZPL scanning and coordinate rewriting.
//!
//! ZPL commands are not line-bound, so the stream is split at every `^` or
//! `~` into commands. Positions come from `^FO`/`^FT`; `^GB`, `^GD` and
//! `^GF` extend the current field origin to a far corner.

use super::{Point, Scan, parse_num, scale};

/// One `^XX...` or `~XX...` command.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Command<'a> {
    prefix: char,
    name: &'a str,
    params: &'a str,
    /// Byte offset of `params` in the source text.
    offset: usize,
    line: usize,
}

fn commands(text: &str) -> Vec<Command<'_>> {
    let starts: Vec<usize> = text
        .char_indices()
        .filter(|&(_, c)| c == '^' || c == '~')
        .map(|(i, _)| i)
        .collect();

    let mut out = Vec::with_capacity(starts.len());
    let mut line = 1;
    let mut counted = 0;

    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(text.len());
        line += text[counted..start].matches('\n').count();
        counted = start;

        let body = &text[start + 1..end];
        let split = if body.len() >= 2 && body.is_char_boundary(2) { 2 } else { body.len() };
        let (name, params) = body.split_at(split);
        out.push(Command {
            prefix: if text[start..].starts_with('~') { '~' } else { '^' },
            name,
            params: params.trim_end(),
            offset: start + 1 + split,
            line,
        });
    }
    out
}

fn fields(params: &str) -> Vec<&str> {
    params.split(',').collect()
}

pub(crate) fn scan(text: &str) -> Scan {
    let mut scan = Scan::default();
    let mut origin: Option<(i32, i32)> = None;

    for cmd in commands(text) {
        let f = fields(cmd.params);
        let line = cmd.line;
        match (cmd.prefix, cmd.name) {
            ('^', "XA") => scan.starts += 1,
            ('^', "XZ") => {
                scan.ends += 1;
                origin = None;
            }
            ('^', "FO") | ('^', "FT") => {
                let x = parse_num::<i32>(&mut scan, line, "field x", f.first().copied());
                let y = parse_num::<i32>(&mut scan, line, "field y", f.get(1).copied());
                origin = match (x, y) {
                    (Some(x), Some(y)) => {
                        scan.points.push(Point { x, y, line });
                        Some((x, y))
                    }
                    _ => None,
                };
            }
            ('^', "GB") | ('^', "GD") => {
                let w = parse_num::<i32>(&mut scan, line, "graphic width", f.first().copied());
                let h = parse_num::<i32>(&mut scan, line, "graphic height", f.get(1).copied());
                if let (Some((ox, oy)), Some(w), Some(h)) = (origin, w, h) {
                    scan.points.push(Point { x: ox + w, y: oy + h, line });
                }
            }
            ('^', "GF") => {
                let total = parse_num::<i32>(&mut scan, line, "graphic byte count", f.get(2).copied());
                let row = parse_num::<i32>(&mut scan, line, "graphic row bytes", f.get(3).copied());
                match (origin, total, row) {
                    (_, Some(_), Some(row)) if row <= 0 => {
                        scan.malformed.push((line, "graphic row bytes must be positive".into()));
                    }
                    (Some((ox, oy)), Some(total), Some(row)) => {
                        scan.points.push(Point {
                            x: ox + row * 8,
                            y: oy + total / row,
                            line,
                        });
                    }
                    _ => {}
                }
            }
            ('^', "PW") => {
                if let Some(w) = parse_num::<i32>(&mut scan, line, "print width", f.first().copied()) {
                    scan.width = Some((w, line));
                }
            }
            ('^', "LL") => {
                if let Some(h) = parse_num::<i32>(&mut scan, line, "label length", f.first().copied()) {
                    scan.height = Some((h, line));
                }
            }
            ('~', "SD") => {
                if let Some(d) = parse_num::<u32>(&mut scan, line, "darkness", f.first().copied()) {
                    scan.density = Some((d, line));
                }
            }
            _ => {}
        }
    }

    scan
}

/// Replace leading comma-separated fields of `params`, keeping the rest.
fn replace_fields(params: &str, values: &[i32]) -> String {
    let mut f: Vec<String> = fields(params).into_iter().map(str::to_string).collect();
    for (i, v) in values.iter().enumerate() {
        match f.get_mut(i) {
            Some(slot) => *slot = v.to_string(),
            None => f.push(v.to_string()),
        }
    }
    f.join(",")
}

/// Scale every coordinate and rewrite `^PW`/`^LL` to `target` dots.
pub(crate) fn rewrite(text: &str, sx: f64, sy: f64, target: (i32, i32)) -> String {
    let num = |s: Option<&&str>| s.and_then(|v| v.trim().parse::<i32>().ok());

    // (original origin, scaled origin)
    let mut origin: Option<((i32, i32), (i32, i32))> = None;
    let mut replacements: Vec<(usize, usize, String)> = Vec::new();

    for cmd in commands(text) {
        let f = fields(cmd.params);
        let span = (cmd.offset, cmd.offset + cmd.params.len());

        let new_params = match (cmd.prefix, cmd.name) {
            ('^', "FO") | ('^', "FT") => match (num(f.first()), num(f.get(1))) {
                (Some(x), Some(y)) => {
                    let scaled = (scale(x, sx), scale(y, sy));
                    origin = Some(((x, y), scaled));
                    Some(replace_fields(cmd.params, &[scaled.0, scaled.1]))
                }
                _ => None,
            },
            ('^', "GB") | ('^', "GD") => match (origin, num(f.first()), num(f.get(1))) {
                (Some(((ox, oy), (sox, soy))), Some(w), Some(h)) => {
                    // Scale the far corner, not the size, so rounding
                    // cannot push it past the target edge.
                    let nw = (scale(ox + w, sx) - sox).max(1);
                    let nh = (scale(oy + h, sy) - soy).max(1);
                    let mut values = vec![nw, nh];
                    match num(f.get(2)) {
                        Some(t) if cmd.name == "GB" => {
                            let thickness = if t >= w.min(h) { nw.min(nh) } else { t.min(nw.min(nh)).max(1) };
                            values.push(thickness);
                        }
                        _ => {}
                    }
                    Some(replace_fields(cmd.params, &values))
                }
                _ => None,
            },
            ('^', "PW") => Some(target.0.to_string()),
            ('^', "LL") => Some(target.1.to_string()),
            ('^', "XZ") => {
                origin = None;
                None
            }
            _ => None,
        };

        if let Some(p) = new_params {
            replacements.push((span.0, span.1, p));
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end, value) in replacements {
        out.push_str(&text[cursor..start]);
        out.push_str(&value);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "^XA\n^PW799\n^LL400\n~SD10\n^FO80,80^A0N,24,24^FH^FDHi, there^FS\n^FO8,8^GB160,80,2,B,0^FS\n^FO0,0^GFA,4,4,2,FFFF0000^FS\n^PQ1\n^XZ";

    #[test]
    fn test_commands() {
        let cmds = commands("^XA\n^FO10,20^FDa,b^FS\n~SD12");
        let names: Vec<&str> = cmds.iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["XA", "FO", "FD", "FS", "SD"]);
        assert_eq!(cmds[1].params, "10,20");
        assert_eq!(cmds[1].line, 2);
        assert_eq!(cmds[4].prefix, '~');
        assert_eq!(cmds[4].line, 3);
    }

    #[test]
    fn test_scan() {
        let scan = scan(SAMPLE);
        assert_eq!(scan.starts, 1);
        assert_eq!(scan.ends, 1);
        assert_eq!(scan.width, Some((799, 2)));
        assert_eq!(scan.height, Some((400, 3)));
        assert_eq!(scan.density, Some((10, 4)));
        let points: Vec<(i32, i32)> = scan.points.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(points, vec![(80, 80), (8, 8), (168, 88), (0, 0), (16, 2)]);
    }

    #[test]
    fn test_malformed_origin() {
        let scan = scan("^XA^FOten,5^FDx^FS^XZ");
        assert_eq!(scan.malformed.len(), 1);
        assert!(scan.points.is_empty());
    }

    #[test]
    fn test_rewrite_halves() {
        let out = rewrite(SAMPLE, 0.5, 0.5, (400, 200));
        assert!(out.contains("^PW400\n^LL200\n"));
        assert!(out.contains("^FO40,40^A0N,24,24^FH^FDHi, there^FS"));
        assert!(out.contains("^FO4,4^GB80,40,2,B,0^FS"));
        assert!(out.contains("^GFA,4,4,2,FFFF0000^FS"));
        assert!(out.ends_with("^PQ1\n^XZ"));
    }

    #[test]
    fn test_rewrite_keeps_filled_boxes_filled() {
        let out = rewrite("^XA^FO0,0^GB100,50,50^FS^XZ", 0.5, 0.5, (50, 25));
        assert!(out.contains("^GB50,25,25^FS"));
    }
}
