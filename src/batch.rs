//! # Batch Accumulator
//!
//! Merges several labels into one transmission.
//!
//! Some thermal printers recalibrate the print head at the start of every
//! job, which leaves gaps or misalignment between labels sent one by one. A
//! batch is generated label by label and joined with a single newline into
//! one [`CommandStream`], which the orchestrator delivers with exactly one
//! `send`:
//!
//! ```text
//! ┌────────┐ ┌────────┐ ┌────────┐
//! │label 1 │ │label 2 │ │label 3 │   generate each
//! └───┬────┘ └───┬────┘ └───┬────┘
//!     └──────────┼──────────┘
//!                ▼
//!   ^L ... E \n ^L ... E \n ^L ... E    one stream, one send
//! ```
//!
//! Every label is generated before anything is joined; one failing label
//! fails the whole batch, so a partial batch can never reach a printer.

use crate::codegen::{CommandGenerator, CommandStream, Language};
use crate::error::{EtiquetaError, Result};
use crate::label::{LabelSize, LabelSpec};

/// Separator between label streams.
pub const SEPARATOR: &str = "\n";

/// Sizes closer than this are the same label stock.
const SIZE_EPSILON_MM: f64 = 1e-6;

fn same_size(a: LabelSize, b: LabelSize) -> bool {
    (a.width_mm - b.width_mm).abs() < SIZE_EPSILON_MM && (a.height_mm - b.height_mm).abs() < SIZE_EPSILON_MM
}

/// Collects labels destined for one physical job.
#[derive(Debug, Clone, Default)]
pub struct BatchAccumulator {
    labels: Vec<LabelSpec>,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: LabelSpec) -> &mut Self {
        self.labels.push(label);
        self
    }

    pub fn with(mut self, label: LabelSpec) -> Self {
        self.labels.push(label);
        self
    }

    pub fn labels(&self) -> &[LabelSpec] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    /// Generate the accumulated labels as one stream.
    pub fn generate(&self, generator: &dyn CommandGenerator) -> Result<CommandStream> {
        generate_batch(&self.labels, generator)
    }
}

impl FromIterator<LabelSpec> for BatchAccumulator {
    fn from_iter<I: IntoIterator<Item = LabelSpec>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().collect(),
        }
    }
}

/// Generate every label, then join the streams in order.
pub fn generate_batch(labels: &[LabelSpec], generator: &dyn CommandGenerator) -> Result<CommandStream> {
    if labels.is_empty() {
        return Err(EtiquetaError::Generation("batch contains no labels".into()));
    }

    let streams = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            generator.generate(label).map_err(|e| match e {
                EtiquetaError::Generation(msg) => {
                    EtiquetaError::Generation(format!("batch label {}: {}", i + 1, msg))
                }
                other => other,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    join_streams(streams)
}

/// Join already generated streams into one transmission unit.
///
/// All streams must share language, resolution and label size.
pub fn join_streams(streams: Vec<CommandStream>) -> Result<CommandStream> {
    let first = streams
        .first()
        .ok_or_else(|| EtiquetaError::Generation("batch contains no labels".into()))?;
    let (language, size, dpi) = (first.language(), first.size(), first.dpi());

    if language == Language::Xml {
        return Err(EtiquetaError::Generation(
            "XML documents cannot be batched into one transmission".into(),
        ));
    }

    for (i, stream) in streams.iter().enumerate().skip(1) {
        if stream.language() != language {
            return Err(EtiquetaError::Generation(format!(
                "batch label {} is {}, expected {}",
                i + 1,
                stream.language(),
                language
            )));
        }
        if stream.dpi() != dpi {
            return Err(EtiquetaError::Generation(format!(
                "batch label {} is generated for {} dpi, expected {}",
                i + 1,
                stream.dpi(),
                dpi
            )));
        }
        if !same_size(stream.size(), size) {
            return Err(EtiquetaError::Generation(format!(
                "batch label {} is {}, expected {}; a batch shares one label stock",
                i + 1,
                stream.size(),
                size
            )));
        }
    }

    let text = streams
        .into_iter()
        .map(CommandStream::into_text)
        .collect::<Vec<_>>()
        .join(SEPARATOR);
    Ok(CommandStream::new(language, size, dpi, text))
}

// ============================================================================
// TESTS
// ============================================================================
