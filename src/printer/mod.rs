//! # Printer Module
//!
//! This module provides printer-specific profiles and unit conversion.
//!
//! ## Modules
//!
//! - [`profile`]: Printer hardware profiles (resolution, speed, darkness)
//! - [`units`]: Millimeter ↔ dot conversion

pub mod profile;
pub mod units;

pub use profile::{PrintMode, PrinterFamily, PrinterProfile};
pub use units::{dots_to_mm, mm_to_dots};
