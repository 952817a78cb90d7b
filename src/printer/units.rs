//! # Unit Conversion
//!
//! Millimeters are the unit of the label model; dots are the unit of the
//! printer. Every generator goes through these two functions with the dpi of
//! the [`PrinterProfile`](super::PrinterProfile) it was handed.
//!
//! ```text
//! dots = round(mm * dpi / 25.4)
//! mm   = round(dots * 25.4 / dpi, 0.1)
//! ```
//!
//! A round trip is exact to within `0.05 + 12.7 / dpi` millimeters; for
//! inputs given at 0.1mm resolution it stays within 0.1mm.

use crate::error::{EtiquetaError, Result};

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Convert millimeters to device dots at the given resolution.
///
/// ## Example
///
/// ```
/// use etiqueta::printer::mm_to_dots;
///
/// assert_eq!(mm_to_dots(10.0, 203).unwrap(), 80);
/// assert_eq!(mm_to_dots(25.4, 300).unwrap(), 300);
/// ```
///
/// ## Errors
///
/// [`EtiquetaError::InvalidGeometry`] if `mm` is NaN or infinite, or if
/// `dpi` is zero.
pub fn mm_to_dots(mm: f64, dpi: u16) -> Result<i32> {
    if !mm.is_finite() {
        return Err(EtiquetaError::InvalidGeometry(format!(
            "non-finite millimeter value: {}",
            mm
        )));
    }
    if dpi == 0 {
        return Err(EtiquetaError::InvalidGeometry("dpi must be > 0".into()));
    }

    let dots = (mm * dpi as f64 / MM_PER_INCH).round();
    if dots > i32::MAX as f64 || dots < i32::MIN as f64 {
        return Err(EtiquetaError::InvalidGeometry(format!(
            "{}mm at {} dpi overflows the dot range",
            mm, dpi
        )));
    }
    Ok(dots as i32)
}

/// Convert device dots to millimeters, rounded to the nearest 0.1mm.
///
/// ```
/// use etiqueta::printer::dots_to_mm;
///
/// assert_eq!(dots_to_mm(80, 203).unwrap(), 10.0);
/// ```
pub fn dots_to_mm(dots: i32, dpi: u16) -> Result<f64> {
    if dpi == 0 {
        return Err(EtiquetaError::InvalidGeometry("dpi must be > 0".into()));
    }
    let mm = dots as f64 * MM_PER_INCH / dpi as f64;
    Ok((mm * 10.0).round() / 10.0)
}

// ============================================================================
// TESTS
// ============================================================================
