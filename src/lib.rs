//! # Etiqueta - Thermal Label Engine
//!
//! Etiqueta turns device-independent label descriptions into printer-native
//! command streams and delivers them to thermal label printers. It provides:
//!
//! - **Label model**: text, barcodes, rectangles, lines and images in millimeters
//! - **Command generation**: Godex EZPL, Zebra ZPL and vendor designer XML
//! - **Diagnostics**: bounds checking and rescaling of generated or raw streams
//! - **Delivery**: a priority-ordered fallback chain of channels (hot folder,
//!   vendor SDK, vendor CLI, raw socket, device node, OS spooler)
//! - **Batching**: many labels in one transmission, so the printer does not
//!   recalibrate between them
//!
//! ## Quick Start
//!
//! ```no_run
//! use etiqueta::{
//!     codegen::Language,
//!     label::{Barcode, LabelSpec, Text},
//!     orchestrator::PrintOrchestrator,
//!     printer::PrinterProfile,
//!     transport::SocketChannel,
//! };
//!
//! # async fn demo() -> etiqueta::Result<()> {
//! let label = LabelSpec::new(100.0, 50.0)
//!     .with(Text::new(10.0, 10.0, "Order #39798"))
//!     .with(Barcode::new(10.0, 20.0, "7290011505853", "EAN13"));
//!
//! let orchestrator = PrintOrchestrator::new(Language::Ezpl, PrinterProfile::default())?
//!     .with_channel(Box::new(SocketChannel::new("192.168.1.50", 9100)));
//!
//! let result = orchestrator.print_label(&label).await?;
//! println!("printed via {:?} in {}ms", result.channel_used, result.duration_ms);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`label`] | Device-independent label model |
//! | [`printer`] | Printer profiles and mm/dot conversion |
//! | [`protocol`] | EZPL and ZPL directive builders, graphics encoding |
//! | [`codegen`] | Label to command stream generators |
//! | [`diagnostics`] | Stream validation and rescaling |
//! | [`transport`] | Delivery channels |
//! | [`orchestrator`] | Fallback chain and job history |
//! | [`batch`] | Multi-label transmissions |
//! | [`config`] | Environment and JSON configuration |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! - Godex desktop printers (EZPL, 203 DPI)
//! - Zebra printers (ZPL, 203 or 300 DPI)

pub mod batch;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod label;
pub mod orchestrator;
pub mod printer;
pub mod protocol;
pub mod transport;

// Re-exports for convenience
pub use error::{EtiquetaError, Result};
pub use label::LabelSpec;
pub use orchestrator::{PrintOrchestrator, PrintResult};
pub use printer::PrinterProfile;
