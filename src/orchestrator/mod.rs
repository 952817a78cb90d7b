//! # Print Orchestrator
//!
//! Walks the configured delivery channels until one of them prints, and
//! keeps one [`PrintJob`] record per request.
//!
//! ## Fallback Chain
//!
//! ```text
//!  Idle ──► ChannelSelecting ──► Sending ──► Succeeded
//!                 ▲                 │
//!                 │   unavailable   │ failed / timed out
//!                 └─────────────────┘
//!                 │
//!                 └── chain exhausted ──► Failed
//! ```
//!
//! Channels are visited strictly in descending priority (ties keep their
//! configured order), one at a time:
//!
//! 1. **Unavailable** channels are skipped. A skip is recorded on the job but
//!    is not an attempt.
//! 2. **Send** runs under the channel's own timeout. An expired send is
//!    dropped, which kills the process or closes the socket it owns.
//! 3. **Success** ends the chain; lower channels are never touched.
//! 4. **Failure** is logged and the next channel is tried.
//!
//! Two channels never run concurrently for the same job, so a job cannot
//! print twice. Independent jobs may run concurrently on one orchestrator.
//!
//! ## Errors
//!
//! Generation and validation problems are returned as `Err` before a job is
//! created. Channel problems never are: they end up in the job record and in
//! a failed [`PrintResult`].

pub mod job;

pub use job::{ChannelAttempt, ChannelOutcome, JobFilter, JobStatus, JobStore, PrintJob};

use std::cmp::Reverse;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::batch;
use crate::codegen::{self, CommandGenerator, CommandStream, Language, TruncationPolicy};
use crate::config::EngineConfig;
use crate::diagnostics::{self, ValidationReport};
use crate::error::{EtiquetaError, Result};
use crate::label::{LabelSize, LabelSpec};
use crate::printer::PrinterProfile;
use crate::transport::{ChannelStatus, PrintChannel, check_availability, unavailable_reason};

/// Outcome of one print request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintResult {
    pub success: bool,
    pub job_id: Uuid,
    pub channel_used: Option<String>,
    pub duration_ms: u64,
    /// Aggregated per-channel reasons when `success` is false.
    pub error: Option<String>,
}

impl PrintResult {
    /// Turn a failed result into [`EtiquetaError::AllChannelsExhausted`].
    pub fn into_result(self) -> Result<Self> {
        match (self.success, &self.error) {
            (true, _) => Ok(self),
            (false, Some(reason)) => Err(EtiquetaError::AllChannelsExhausted(reason.clone())),
            (false, None) => Err(EtiquetaError::AllChannelsExhausted("no channel succeeded".into())),
        }
    }
}

/// Generates, checks and delivers labels through a channel fallback chain.
pub struct PrintOrchestrator {
    /// Sorted by descending priority.
    channels: Vec<Box<dyn PrintChannel>>,
    generator: Box<dyn CommandGenerator>,
    language: Language,
    profile: PrinterProfile,
    truncation: TruncationPolicy,
    validate: bool,
    auto_fit: bool,
    jobs: JobStore,
}

impl std::fmt::Debug for PrintOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrintOrchestrator")
            .field("channels", &self.channels.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("language", &self.language)
            .field("profile", &self.profile)
            .field("validate", &self.validate)
            .field("auto_fit", &self.auto_fit)
            .finish_non_exhaustive()
    }
}

impl PrintOrchestrator {
    /// Orchestrator with no channels, validation on and auto-fit off.
    ///
    /// Fails if `language` cannot be sent to a printer.
    pub fn new(language: Language, profile: PrinterProfile) -> Result<Self> {
        if !language.is_printable() {
            return Err(EtiquetaError::Config(format!("{} is not a printer language", language)));
        }
        let truncation = TruncationPolicy::default();
        Ok(Self {
            channels: Vec::new(),
            generator: codegen::generator_for(language, profile, truncation.clone()),
            language,
            profile,
            truncation,
            validate: true,
            auto_fit: false,
            jobs: JobStore::new(),
        })
    }

    /// Build from configuration. Configuration is not consulted again.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.check()?;
        let orchestrator = Self::new(config.language(), config.profile())?
            .with_truncation(config.truncation.clone())
            .with_validation(config.validate)
            .with_auto_fit(config.auto_fit)
            .with_channels(config.build_channels()?);

        info!(
            language = %orchestrator.language,
            dpi = orchestrator.profile.dpi,
            channels = ?orchestrator.channels.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "print orchestrator ready"
        );
        Ok(orchestrator)
    }

    pub fn with_channel(mut self, channel: Box<dyn PrintChannel>) -> Self {
        self.channels.push(channel);
        self.sort_channels();
        self
    }

    pub fn with_channels(mut self, channels: impl IntoIterator<Item = Box<dyn PrintChannel>>) -> Self {
        self.channels.extend(channels);
        self.sort_channels();
        self
    }

    pub fn with_truncation(mut self, truncation: TruncationPolicy) -> Self {
        self.generator = codegen::generator_for(self.language, self.profile, truncation.clone());
        self.truncation = truncation;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn with_auto_fit(mut self, auto_fit: bool) -> Self {
        self.auto_fit = auto_fit;
        self
    }

    /// Share a job history with another owner.
    pub fn with_job_store(mut self, jobs: JobStore) -> Self {
        self.jobs = jobs;
        self
    }

    fn sort_channels(&mut self) {
        // Stable: equal priorities keep their configured order.
        self.channels.sort_by_key(|c| Reverse(c.priority()));
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn profile(&self) -> &PrinterProfile {
        &self.profile
    }

    pub fn truncation(&self) -> &TruncationPolicy {
        &self.truncation
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    /// Channel names in the order they are tried.
    pub fn channel_order(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    // ========================================================================
    // GENERATION AND VALIDATION
    // ========================================================================

    /// Generate `label` in the configured language.
    pub fn generate(&self, label: &LabelSpec) -> Result<CommandStream> {
        self.generator.generate(label)
    }

    /// Generate `labels` as one batch stream.
    pub fn generate_batch(&self, labels: &[LabelSpec]) -> Result<CommandStream> {
        batch::generate_batch(labels, self.generator.as_ref())
    }

    /// Validate `stream` against `declared`, or against the size it was
    /// generated for.
    pub fn validate(&self, stream: &CommandStream, declared: Option<LabelSize>) -> Result<ValidationReport> {
        diagnostics::validate(stream, declared.unwrap_or_else(|| stream.size()))
    }

    /// Apply pre-print validation and auto-fit.
    fn prepare(&self, stream: CommandStream) -> Result<CommandStream> {
        if !stream.language().is_printable() {
            return Err(EtiquetaError::Generation(format!(
                "{} is not a printer language",
                stream.language()
            )));
        }
        if !self.validate {
            return Ok(stream);
        }

        let report = diagnostics::validate(&stream, stream.size())?;
        for warning in report.warnings() {
            warn!(line = warning.line, "{}", warning.message);
        }
        if report.is_valid {
            return Ok(stream);
        }
        if !self.auto_fit {
            return Err(EtiquetaError::Validation(report.error_summary()));
        }

        debug!(issues = report.errors().count(), "stream does not fit its label, rescaling");
        let fitted = diagnostics::rescale(&stream, stream.size())?;
        let report = diagnostics::validate(&fitted, fitted.size())?;
        if report.is_valid {
            info!(size = %fitted.size(), "stream rescaled to fit its label");
            Ok(fitted)
        } else {
            Err(EtiquetaError::Validation(format!(
                "still invalid after rescaling: {}",
                report.error_summary()
            )))
        }
    }

    // ========================================================================
    // PRINTING
    // ========================================================================

    /// Generate and print one label.
    pub async fn print_label(&self, label: &LabelSpec) -> Result<PrintResult> {
        let stream = self.generate(label)?;
        self.print_stream(stream).await
    }

    /// Generate every label, then print them as one transmission.
    pub async fn print_batch(&self, labels: &[LabelSpec]) -> Result<PrintResult> {
        let stream = self.generate_batch(labels)?;
        self.print_stream(stream).await
    }

    /// Print caller-supplied command text.
    pub async fn print_raw(&self, text: impl Into<String>, language: Language, size: LabelSize) -> Result<PrintResult> {
        let stream = CommandStream::from_raw(text, language, size, self.profile.dpi)?;
        self.print_stream(stream).await
    }

    /// Validate and deliver a stream through the fallback chain.
    ///
    /// Returns `Err` only for problems found before delivery. A chain that
    /// runs out of channels gives `Ok` with `success == false`.
    pub async fn print_stream(&self, stream: CommandStream) -> Result<PrintResult> {
        let stream = self.prepare(stream)?;

        let job = PrintJob::new(stream.label_count());
        let job_id = job.id;
        self.jobs.insert(job).await;

        let span = info_span!("print_job", %job_id, labels = stream.label_count(), language = %stream.language());
        Ok(self.run_chain(job_id, &stream).instrument(span).await)
    }

    async fn run_chain(&self, job_id: Uuid, stream: &CommandStream) -> PrintResult {
        let started = Instant::now();
        let mut reasons = Vec::new();

        debug!(channels = self.channels.len(), "selecting channel");

        for channel in &self.channels {
            let name = channel.name();
            let attempt_started = Instant::now();

            if let Err(e) = check_availability(channel.as_ref()).await {
                let reason = unavailable_reason(&e);
                debug!(channel = name, %reason, "channel unavailable, skipping");
                reasons.push(format!("{}: unavailable ({})", name, reason));
                self.record(job_id, name, ChannelOutcome::Skipped { reason }, attempt_started)
                    .await;
                continue;
            }

            self.track(job_id, |j| j.status = JobStatus::Sending).await;
            debug!(channel = name, timeout_ms = channel.timeout().as_millis() as u64, "sending");

            let sent = match tokio::time::timeout(channel.timeout(), channel.send(stream)).await {
                Ok(result) => result,
                Err(_) => Err(EtiquetaError::ChannelTimeout {
                    channel: name.to_string(),
                    timeout_ms: channel.timeout().as_millis() as u64,
                }),
            };

            match sent {
                Ok(()) => {
                    self.record(job_id, name, ChannelOutcome::Succeeded, attempt_started)
                        .await;
                    self.track(job_id, |j| {
                        j.status = JobStatus::Succeeded;
                        j.channel_used = Some(name.to_string());
                        j.completed_at = Some(Utc::now());
                    })
                    .await;

                    let duration_ms = started.elapsed().as_millis() as u64;
                    info!(channel = name, duration_ms, "printed");
                    return PrintResult {
                        success: true,
                        job_id,
                        channel_used: Some(name.to_string()),
                        duration_ms,
                        error: None,
                    };
                }
                Err(e) => {
                    let error = channel_failure(name, &e);
                    warn!(channel = name, error = %error, "channel failed, trying next");
                    reasons.push(format!("{}: {}", name, error));
                    self.record(job_id, name, ChannelOutcome::Failed { error }, attempt_started)
                        .await;
                }
            }
        }

        let aggregated = if reasons.is_empty() {
            "no channels configured".to_string()
        } else {
            reasons.join("; ")
        };
        let error = EtiquetaError::AllChannelsExhausted(aggregated).to_string();

        self.track(job_id, |j| {
            j.status = JobStatus::Failed;
            j.error = Some(error.clone());
            j.completed_at = Some(Utc::now());
        })
        .await;

        let duration_ms = started.elapsed().as_millis() as u64;
        warn!(duration_ms, %error, "print failed");
        PrintResult {
            success: false,
            job_id,
            channel_used: None,
            duration_ms,
            error: Some(error),
        }
    }

    async fn record(&self, job_id: Uuid, channel: &str, outcome: ChannelOutcome, started: Instant) {
        let attempt = ChannelAttempt {
            channel: channel.to_string(),
            outcome,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        self.track(job_id, |j| j.attempts.push(attempt)).await;
    }

    /// Update the job record. The history may be cleared while a job is in
    /// flight; delivery carries on without its record.
    async fn track(&self, job_id: Uuid, apply: impl FnOnce(&mut PrintJob)) {
        if let Err(e) = self.jobs.update(job_id, apply).await {
            debug!(error = %e, "job record gone, continuing without it");
        }
    }

    // ========================================================================
    // JOB HISTORY AND CHANNELS
    // ========================================================================

    pub async fn job_status(&self, id: Uuid) -> Result<PrintJob> {
        self.jobs.get(id).await
    }

    pub async fn list_jobs(&self, filter: &JobFilter) -> Vec<PrintJob> {
        self.jobs.list(filter).await
    }

    /// Drop the job history. Returns how many records were removed.
    pub async fn clear_job_history(&self) -> usize {
        let removed = self.jobs.clear().await;
        debug!(removed, "job history cleared");
        removed
    }

    /// Every configured channel with its current availability, in chain order.
    pub async fn channel_status(&self) -> Vec<ChannelStatus> {
        let mut statuses = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            statuses.push(ChannelStatus::probe(channel.as_ref()).await);
        }
        statuses
    }
}

/// The failure message without the channel name prefix, which the
/// aggregated reason adds itself.
fn channel_failure(name: &str, err: &EtiquetaError) -> String {
    match err {
        EtiquetaError::Channel { channel, message } if channel == name => message.clone(),
        EtiquetaError::ChannelTimeout { channel, timeout_ms } if channel == name => {
            format!("timed out after {}ms", timeout_ms)
        }
        other => other.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
