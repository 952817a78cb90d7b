//! # Printer Command Languages
//!
//! This module provides low-level directive builders for the two label
//! printer languages the generators target, plus monochrome bitmap
//! conversion for embedded images.
//!
//! ## Module Structure
//!
//! - [`ezpl`]: Godex EZPL directives (header in millimeters, body in dots)
//! - [`zpl`]: Zebra ZPL directives (everything in dots)
//! - [`graphics`]: Image decoding, dithering and bit packing
//!
//! ## Usage Example
//!
//! ```
//! use etiqueta::protocol::zpl;
//!
//! let mut lines = vec![zpl::START.to_string()];
//! lines.push(zpl::print_width(799));
//! lines.push(zpl::label_length(400));
//! lines.push(format!("{}{}", zpl::field_origin(80, 80), zpl::field_data("HELLO")));
//! lines.push(zpl::END.to_string());
//!
//! let stream = lines.join("\n");
//! assert!(stream.starts_with("^XA"));
//! ```
//!
//! Builders return `String`s; the generators in [`crate::codegen`] decide
//! what goes where.

pub mod ezpl;
pub mod graphics;
pub mod zpl;
