//! Barcode symbology lookup.
//!
//! Symbology names are matched case-insensitively, ignoring `-`, `_` and
//! spaces, against one fixed table. Every language maps the table to its own
//! codes; a symbology a language has no code for fails generation rather
//! than falling back to a different barcode.

use crate::error::{EtiquetaError, Result};
use crate::protocol::zpl::ZplBarcode;

/// Barcode symbologies known to the generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    Code128,
    Code39,
    Ean13,
    Ean8,
    UpcA,
    Itf,
    Qr,
    DataMatrix,
}

/// `(normalized name, symbology)` lookup table.
const NAMES: &[(&str, Symbology)] = &[
    ("code128", Symbology::Code128),
    ("128", Symbology::Code128),
    ("code39", Symbology::Code39),
    ("39", Symbology::Code39),
    ("ean13", Symbology::Ean13),
    ("jan13", Symbology::Ean13),
    ("ean8", Symbology::Ean8),
    ("jan8", Symbology::Ean8),
    ("upca", Symbology::UpcA),
    ("itf", Symbology::Itf),
    ("interleaved2of5", Symbology::Itf),
    ("i2of5", Symbology::Itf),
    ("qr", Symbology::Qr),
    ("qrcode", Symbology::Qr),
    ("datamatrix", Symbology::DataMatrix),
];

impl Symbology {
    /// Look up a symbology by name.
    pub fn parse(name: &str) -> Result<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();

        NAMES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, s)| *s)
            .ok_or_else(|| EtiquetaError::Generation(format!("unknown barcode symbology '{}'", name)))
    }

    /// EZPL barcode type code (the letter/digit after `B`).
    pub fn ezpl_code(self) -> Option<&'static str> {
        match self {
            Symbology::Code39 => Some("A"),
            Symbology::Code128 => Some("1"),
            Symbology::Ean13 => Some("E"),
            Symbology::Ean8 => Some("F"),
            Symbology::UpcA => Some("H"),
            Symbology::Itf => Some("I"),
            Symbology::Qr | Symbology::DataMatrix => None,
        }
    }

    /// ZPL barcode command family.
    pub fn zpl_kind(self) -> ZplBarcode {
        match self {
            Symbology::Code128 => ZplBarcode::Code128,
            Symbology::Code39 => ZplBarcode::Code39,
            Symbology::Ean13 => ZplBarcode::Ean13,
            Symbology::Ean8 => ZplBarcode::Ean8,
            Symbology::UpcA => ZplBarcode::UpcA,
            Symbology::Itf => ZplBarcode::Interleaved2of5,
            Symbology::Qr => ZplBarcode::Qr,
            Symbology::DataMatrix => ZplBarcode::DataMatrix,
        }
    }

    /// Canonical display name.
    pub fn name(self) -> &'static str {
        match self {
            Symbology::Code128 => "Code128",
            Symbology::Code39 => "Code39",
            Symbology::Ean13 => "EAN13",
            Symbology::Ean8 => "EAN8",
            Symbology::UpcA => "UPCA",
            Symbology::Itf => "ITF",
            Symbology::Qr => "QR",
            Symbology::DataMatrix => "DataMatrix",
        }
    }

    /// Check that `data` is encodable. Returns a reason on failure.
    ///
    /// Check digits are not verified: the printers compute or accept them.
    pub fn check_data(self, data: &str) -> std::result::Result<(), String> {
        if data.is_empty() {
            return Err("barcode data is empty".into());
        }

        let digits = |lengths: &[usize]| -> std::result::Result<(), String> {
            if !data.chars().all(|c| c.is_ascii_digit()) {
                return Err(format!("{} data must be numeric: '{}'", self.name(), data));
            }
            if !lengths.contains(&data.len()) {
                return Err(format!(
                    "{} data must have {:?} digits, got {}",
                    self.name(),
                    lengths,
                    data.len()
                ));
            }
            Ok(())
        };

        match self {
            Symbology::Ean13 => digits(&[12, 13]),
            Symbology::Ean8 => digits(&[7, 8]),
            Symbology::UpcA => digits(&[11, 12]),
            Symbology::Itf => {
                if !data.chars().all(|c| c.is_ascii_digit()) {
                    return Err(format!("ITF data must be numeric: '{}'", data));
                }
                if data.len() % 2 != 0 {
                    return Err("ITF data must have an even number of digits".into());
                }
                Ok(())
            }
            Symbology::Code39 => {
                let valid = data.chars().all(|c| {
                    c.is_ascii_uppercase()
                        || c.is_ascii_digit()
                        || matches!(c, ' ' | '-' | '.' | '$' | '/' | '+' | '%')
                });
                if valid {
                    Ok(())
                } else {
                    Err(format!("Code39 cannot encode '{}'", data))
                }
            }
            Symbology::Code128 => {
                if data.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
                    Ok(())
                } else {
                    Err(format!("Code128 cannot encode '{}'", data))
                }
            }
            Symbology::Qr | Symbology::DataMatrix => Ok(()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!(Symbology::parse("Code128").unwrap(), Symbology::Code128);
        assert_eq!(Symbology::parse("EAN13").unwrap(), Symbology::Ean13);
        assert_eq!(Symbology::parse("ean-13").unwrap(), Symbology::Ean13);
        assert_eq!(Symbology::parse("UPC_A").unwrap(), Symbology::UpcA);
        assert_eq!(Symbology::parse("QR Code").unwrap(), Symbology::Qr);
    }

    #[test]
    fn test_unknown_symbology_fails() {
        let err = Symbology::parse("Aztec").unwrap_err();
        assert!(err.to_string().contains("Aztec"));
    }

    #[test]
    fn test_ezpl_table() {
        assert_eq!(Symbology::Code128.ezpl_code(), Some("1"));
        assert_eq!(Symbology::Ean13.ezpl_code(), Some("E"));
        assert_eq!(Symbology::Qr.ezpl_code(), None);
    }

    #[test]
    fn test_check_data() {
        assert!(Symbology::Ean13.check_data("7290011505853").is_ok());
        assert!(Symbology::Ean13.check_data("729001150585").is_ok());
        assert!(Symbology::Ean13.check_data("72900115").is_err());
        assert!(Symbology::Ean13.check_data("72900115058A3").is_err());
        assert!(Symbology::Code39.check_data("BOX-12").is_ok());
        assert!(Symbology::Code39.check_data("box").is_err());
        assert!(Symbology::Code128.check_data("Order #39798").is_ok());
        assert!(Symbology::Itf.check_data("123").is_err());
        assert!(Symbology::Qr.check_data("https://example.com").is_ok());
        assert!(Symbology::Qr.check_data("").is_err());
    }
}
