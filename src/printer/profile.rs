//! # Printer Profiles
//!
//! This module defines the hardware characteristics a generator needs to turn
//! millimeters into device commands.
//!
//! ## Printer Families
//!
//! | Family | Language | Default resolution |
//! |--------|----------|--------------------|
//! | Godex | EZPL | 203 DPI |
//! | Zebra | ZPL | 203 DPI |
//! | Zebra 300 | ZPL | 300 DPI |
//!
//! The default resolution is resolved here and nowhere else; generators only
//! ever read [`PrinterProfile::dpi`].
//!
//! ## Usage
//!
//! ```
//! use etiqueta::printer::{PrinterFamily, PrinterProfile};
//!
//! let profile = PrinterProfile::for_family(PrinterFamily::Godex);
//! assert_eq!(profile.dpi, 203);
//! println!("{} dots per mm", profile.dots_per_mm());
//! ```

use serde::{Deserialize, Serialize};

use super::units;
use crate::codegen::Language;
use crate::error::{EtiquetaError, Result};

/// Printer hardware family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterFamily {
    /// Godex desktop printers (EZPL), 203 DPI print head.
    #[default]
    Godex,
    /// Zebra printers (ZPL), 203 DPI print head.
    Zebra,
    /// Zebra printers (ZPL), 300 DPI print head.
    Zebra300,
}

impl PrinterFamily {
    /// Print-head resolution used when configuration does not specify one.
    pub fn default_dpi(self) -> u16 {
        match self {
            Self::Godex | Self::Zebra => 203,
            Self::Zebra300 => 300,
        }
    }

    /// Native command language of the family.
    pub fn language(self) -> Language {
        match self {
            Self::Godex => Language::Ezpl,
            Self::Zebra | Self::Zebra300 => Language::Zpl,
        }
    }

    /// Parse a family name (`godex`, `zebra`, `zebra300`).
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "godex" | "ezpl" => Ok(Self::Godex),
            "zebra" | "zpl" => Ok(Self::Zebra),
            "zebra300" | "zebra-300" | "zebra_300" => Ok(Self::Zebra300),
            other => Err(EtiquetaError::Config(format!(
                "Unknown printer family '{}'. Use 'godex', 'zebra' or 'zebra300'",
                other
            ))),
        }
    }
}

/// Media handling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintMode {
    /// Direct thermal (heat-sensitive media, no ribbon).
    #[default]
    Direct,
    /// Thermal transfer (ribbon).
    Transfer,
}

impl PrintMode {
    /// Parse a mode name (`direct`, `transfer`).
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" | "dt" => Ok(Self::Direct),
            "transfer" | "tt" => Ok(Self::Transfer),
            other => Err(EtiquetaError::Config(format!(
                "Unknown print mode '{}'. Use 'direct' or 'transfer'",
                other
            ))),
        }
    }
}

/// # Printer Profile
///
/// Read-only settings a generator needs for one printer.
///
/// - **dpi**: print-head resolution in dots per inch (always > 0)
/// - **speed**: print speed in inches per second (device clamps to its range)
/// - **darkness**: heat setting on the family's native scale
///   (EZPL `^H` 0-19, ZPL `~SD` 0-30)
/// - **print_mode**: direct thermal or thermal transfer
///
/// ```text
/// dots_per_mm = dpi / 25.4
///
/// For 203 DPI:
///   dots_per_mm = 203 / 25.4 ≈ 8
///   100mm label = 799 dots
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrinterProfile {
    /// Resolution in dots per inch
    pub dpi: u16,

    /// Print speed in inches per second
    pub speed: u8,

    /// Heat/darkness setting
    pub darkness: u8,

    /// Direct thermal or thermal transfer
    #[serde(default)]
    pub print_mode: PrintMode,
}

impl PrinterProfile {
    /// Default speed in inches per second
    pub const DEFAULT_SPEED: u8 = 3;

    /// Default darkness (mid-range on both EZPL and ZPL scales)
    pub const DEFAULT_DARKNESS: u8 = 10;

    /// Build a profile, rejecting a zero resolution.
    pub fn new(dpi: u16, speed: u8, darkness: u8, print_mode: PrintMode) -> Result<Self> {
        if dpi == 0 {
            return Err(EtiquetaError::Config("printer dpi must be > 0".into()));
        }
        Ok(Self {
            dpi,
            speed,
            darkness,
            print_mode,
        })
    }

    /// Profile with the family's default resolution and mid-range settings.
    pub fn for_family(family: PrinterFamily) -> Self {
        Self {
            dpi: family.default_dpi(),
            speed: Self::DEFAULT_SPEED,
            darkness: Self::DEFAULT_DARKNESS,
            print_mode: PrintMode::Direct,
        }
    }

    /// Calculate dots per millimeter
    ///
    /// ```
    /// use etiqueta::printer::PrinterProfile;
    ///
    /// let profile = PrinterProfile::default();
    /// assert!((profile.dots_per_mm() - 8.0).abs() < 0.1);
    /// ```
    #[inline]
    pub fn dots_per_mm(&self) -> f64 {
        self.dpi as f64 / units::MM_PER_INCH
    }

    /// Convert millimeters to dots at this profile's resolution.
    #[inline]
    pub fn mm_to_dots(&self, mm: f64) -> Result<i32> {
        units::mm_to_dots(mm, self.dpi)
    }

    /// Convert dots to millimeters at this profile's resolution.
    #[inline]
    pub fn dots_to_mm(&self, dots: i32) -> Result<f64> {
        units::dots_to_mm(dots, self.dpi)
    }
}

impl Default for PrinterProfile {
    fn default() -> Self {
        Self::for_family(PrinterFamily::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_default_dpi() {
        assert_eq!(PrinterFamily::Godex.default_dpi(), 203);
        assert_eq!(PrinterFamily::Zebra.default_dpi(), 203);
        assert_eq!(PrinterFamily::Zebra300.default_dpi(), 300);
    }

    #[test]
    fn test_family_language() {
        assert_eq!(PrinterFamily::Godex.language(), Language::Ezpl);
        assert_eq!(PrinterFamily::Zebra300.language(), Language::Zpl);
    }

    #[test]
    fn test_family_parse() {
        assert_eq!(PrinterFamily::parse("Godex").unwrap(), PrinterFamily::Godex);
        assert_eq!(PrinterFamily::parse("zebra").unwrap(), PrinterFamily::Zebra);
        assert_eq!(
            PrinterFamily::parse("zebra300").unwrap(),
            PrinterFamily::Zebra300
        );
        assert!(PrinterFamily::parse("brother").is_err());
    }

    #[test]
    fn test_zero_dpi_rejected() {
        assert!(PrinterProfile::new(0, 3, 10, PrintMode::Direct).is_err());
        assert!(PrinterProfile::new(300, 3, 10, PrintMode::Direct).is_ok());
    }

    #[test]
    fn test_default_is_godex_203() {
        let profile = PrinterProfile::default();
        assert_eq!(profile.dpi, 203);
        assert_eq!(profile.print_mode, PrintMode::Direct);
    }

    #[test]
    fn test_profile_mm_to_dots_uses_own_dpi() {
        let low = PrinterProfile::for_family(PrinterFamily::Zebra);
        let high = PrinterProfile::for_family(PrinterFamily::Zebra300);
        assert_eq!(low.mm_to_dots(10.0).unwrap(), 80);
        assert_eq!(high.mm_to_dots(10.0).unwrap(), 118);
    }

    #[test]
    fn test_print_mode_parse() {
        assert_eq!(PrintMode::parse("transfer").unwrap(), PrintMode::Transfer);
        assert_eq!(PrintMode::parse("DT").unwrap(), PrintMode::Direct);
        assert!(PrintMode::parse("laser").is_err());
    }
}
