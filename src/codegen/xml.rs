//! # Vendor Label-Designer XML
//!
//! Emits the document format of the vendor's GUI label editor so a label
//! can be opened and adjusted by hand. The editor works in millimeters, so
//! no dot conversion happens here. These streams are never printable.
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Label Width="100" Height="50" Unit="mm" Dpi="203" Copies="1">
//!   <Text X="10" Y="10" Size="3" Rotation="0" Align="left">Order #39798</Text>
//!   <Barcode X="10" Y="20" Type="EAN13" Height="10" Module="2" Readable="true">7290011505853</Barcode>
//! </Label>
//! ```

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::barcode::Symbology;
use super::{CommandGenerator, CommandStream, Dots, Language, element_error};
use crate::error::{EtiquetaError, Result};
use crate::label::{Alignment, Element, LabelSpec};
use crate::printer::PrinterProfile;

/// Vendor XML generator.
#[derive(Debug, Clone)]
pub struct XmlGenerator {
    profile: PrinterProfile,
}

impl XmlGenerator {
    pub fn new(profile: PrinterProfile) -> Self {
        Self { profile }
    }
}

fn num(v: f64) -> String {
    format!("{}", v)
}

fn xml_error(e: std::io::Error) -> EtiquetaError {
    EtiquetaError::Generation(format!("XML write failed: {}", e))
}

/// Attributes and optional text content of one element node.
struct Node {
    name: &'static str,
    attrs: Vec<(&'static str, String)>,
    content: Option<String>,
}

fn node(index: usize, element: &Element) -> Result<Node> {
    let fail = |msg: String| element_error(index, element.kind(), msg);

    let node = match element {
        Element::Text(t) => {
            if t.text.is_empty() {
                return Err(fail("text is empty".into()));
            }
            let align = match t.alignment {
                Alignment::Left => "left",
                Alignment::Center => "center",
                Alignment::Right => "right",
            };
            let mut attrs = vec![
                ("X", num(t.x)),
                ("Y", num(t.y)),
                ("Size", num(t.size)),
                ("Rotation", t.rotation.to_string()),
                ("Align", align.to_string()),
            ];
            if let Some(font) = &t.font {
                attrs.push(("Font", font.clone()));
            }
            if let Some(width) = t.width {
                attrs.push(("Width", num(width)));
            }
            if t.bold {
                attrs.push(("Bold", "true".into()));
            }
            if t.italic {
                attrs.push(("Italic", "true".into()));
            }
            Node {
                name: "Text",
                attrs,
                content: Some(t.text.clone()),
            }
        }
        Element::Barcode(b) => {
            let symbology = Symbology::parse(&b.symbology).map_err(|e| fail(e.to_string()))?;
            symbology.check_data(&b.data).map_err(fail)?;
            Node {
                name: "Barcode",
                attrs: vec![
                    ("X", num(b.x)),
                    ("Y", num(b.y)),
                    ("Type", symbology.name().to_string()),
                    ("Height", num(b.height)),
                    ("Module", b.width.to_string()),
                    ("Readable", b.show_text.to_string()),
                    ("Rotation", b.rotation.to_string()),
                ],
                content: Some(b.data.clone()),
            }
        }
        Element::Rectangle(r) => {
            if !(r.width > 0.0 && r.height > 0.0) {
                return Err(fail(format!("size {}x{}mm must be positive", r.width, r.height)));
            }
            Node {
                name: "Rectangle",
                attrs: vec![
                    ("X", num(r.x)),
                    ("Y", num(r.y)),
                    ("Width", num(r.width)),
                    ("Height", num(r.height)),
                    ("LineWidth", num(r.line_width)),
                    ("Filled", r.filled.to_string()),
                ],
                content: None,
            }
        }
        Element::Line(l) => Node {
            name: "Line",
            attrs: vec![
                ("X1", num(l.x)),
                ("Y1", num(l.y)),
                ("X2", num(l.x2)),
                ("Y2", num(l.y2)),
                ("Width", num(l.width)),
            ],
            content: None,
        },
        Element::Image(i) => {
            if i.data.trim().is_empty() {
                return Err(fail("image data is empty".into()));
            }
            Node {
                name: "Image",
                attrs: vec![
                    ("X", num(i.x)),
                    ("Y", num(i.y)),
                    ("Width", num(i.width)),
                    ("Height", num(i.height)),
                    ("Encoding", "base64".into()),
                ],
                content: Some(i.data.clone()),
            }
        }
        Element::Unsupported { kind } => {
            return Err(fail(format!("unsupported element type '{}'", kind)));
        }
    };
    Ok(node)
}

impl CommandGenerator for XmlGenerator {
    fn language(&self) -> Language {
        Language::Xml
    }

    fn generate(&self, label: &LabelSpec) -> Result<CommandStream> {
        let (_, profile) = Dots::for_label(label, &self.profile)?;

        let nodes = label
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| node(i, e))
            .collect::<Result<Vec<_>>>()?;

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;

        let root_attrs = [
            ("Width", num(label.width_mm)),
            ("Height", num(label.height_mm)),
            ("Unit", "mm".to_string()),
            ("Dpi", profile.dpi.to_string()),
            ("Copies", label.copies.max(1).to_string()),
        ];
        let root = BytesStart::new("Label")
            .with_attributes(root_attrs.iter().map(|(k, v)| (*k, v.as_str())));
        writer.write_event(Event::Start(root)).map_err(xml_error)?;

        for n in &nodes {
            let start = BytesStart::new(n.name)
                .with_attributes(n.attrs.iter().map(|(k, v)| (*k, v.as_str())));
            match &n.content {
                Some(content) => {
                    writer.write_event(Event::Start(start)).map_err(xml_error)?;
                    writer
                        .write_event(Event::Text(BytesText::new(content)))
                        .map_err(xml_error)?;
                    writer
                        .write_event(Event::End(BytesEnd::new(n.name)))
                        .map_err(xml_error)?;
                }
                None => writer.write_event(Event::Empty(start)).map_err(xml_error)?,
            }
        }

        writer
            .write_event(Event::End(BytesEnd::new("Label")))
            .map_err(xml_error)?;

        let text = String::from_utf8(writer.into_inner())
            .map_err(|e| EtiquetaError::Generation(format!("XML is not UTF-8: {}", e)))?;

        Ok(CommandStream::new(Language::Xml, label.size(), profile.dpi, text))
    }
}

// ============================================================================
// TESTS
// ============================================================================
