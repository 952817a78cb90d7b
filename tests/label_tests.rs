//! # Label Scenario Tests
//!
//! End-to-end checks across generation, validation, batching and the
//! delivery fallback chain. Channels are replaced by fakes that count their
//! `send()` calls, so no printer is needed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use etiqueta::codegen::{self, CommandStream, Language};
use etiqueta::diagnostics::{self, IssueKind};
use etiqueta::label::{Alignment, Barcode, LabelSpec, Line, Rectangle, Text};
use etiqueta::orchestrator::{ChannelOutcome, JobFilter, JobStatus, PrintOrchestrator};
use etiqueta::printer::{PrinterFamily, PrinterProfile, dots_to_mm, mm_to_dots};
use etiqueta::transport::{ChannelKind, PrintChannel, SocketChannel};
use etiqueta::{EtiquetaError, Result};
use pretty_assertions::assert_eq;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

#[derive(Clone, Copy)]
enum Mode {
    Unavailable,
    Failing,
    Working,
}

/// Channel double that records what it was asked to send.
struct CountingChannel {
    name: String,
    priority: i32,
    mode: Mode,
    sends: Arc<AtomicUsize>,
    last: Arc<std::sync::Mutex<Option<String>>>,
}

impl CountingChannel {
    fn new(name: &str, priority: i32, mode: Mode) -> Self {
        Self {
            name: name.to_string(),
            priority,
            mode,
            sends: Arc::new(AtomicUsize::new(0)),
            last: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    fn counters(&self) -> (Arc<AtomicUsize>, Arc<std::sync::Mutex<Option<String>>>) {
        (self.sends.clone(), self.last.clone())
    }
}

#[async_trait]
impl PrintChannel for CountingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Custom
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(1)
    }

    async fn availability(&self) -> Result<()> {
        match self.mode {
            Mode::Unavailable => Err(EtiquetaError::unavailable(&self.name, "not installed")),
            _ => Ok(()),
        }
    }

    async fn send(&self, stream: &CommandStream) -> Result<()> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(stream.text().to_string());
        match self.mode {
            Mode::Failing => Err(EtiquetaError::channel(&self.name, "connection refused")),
            _ => Ok(()),
        }
    }
}

fn order_label() -> LabelSpec {
    LabelSpec::new(100.0, 50.0)
        .with(Text::new(10.0, 10.0, "Order #39798"))
        .with(Barcode::new(10.0, 20.0, "7290011505853", "EAN13"))
}

fn packing_label(box_no: u32) -> LabelSpec {
    LabelSpec::new(100.0, 50.0)
        .with(Rectangle::new(1.0, 1.0, 98.0, 48.0).line_width(0.5))
        .with(Text::new(5.0, 4.0, format!("Box {} of 3", box_no)).bold().size(5.0))
        .with(Text::new(5.0, 12.0, "Customer: Cafe Aroma, Tel Aviv").align(Alignment::Left, 90.0))
        .with(Line::new(1.0, 18.0, 99.0, 18.0).width(0.3))
        .with(Barcode::new(5.0, 22.0, "PKG-39798-3", "Code128").height(12.0))
}

/// Frame lines drawn exactly on the bottom and right edges.
fn framed_label() -> LabelSpec {
    packing_label(1)
        .with(Line::new(0.0, 50.0, 100.0, 50.0))
        .with(Line::new(100.0, 0.0, 100.0, 50.0))
        .with(Line::new(0.0, 0.0, 100.0, 0.0).width(0.5))
        .with(Line::new(0.0, 0.0, 0.0, 50.0).width(0.5))
}

fn ezpl_orchestrator() -> PrintOrchestrator {
    PrintOrchestrator::new(Language::Ezpl, PrinterProfile::default()).unwrap()
}

// ============================================================================
// UNITS
// ============================================================================

#[test]
fn test_mm_dot_round_trip_within_tenth_mm() {
    for dpi in [203u16, 300] {
        for tenths in 0..=1500 {
            let mm = tenths as f64 / 10.0;
            let back = dots_to_mm(mm_to_dots(mm, dpi).unwrap(), dpi).unwrap();
            assert!((back - mm).abs() <= 0.1 + 1e-9, "{}mm at {} dpi -> {}mm", mm, dpi, back);
        }
    }
}

// ============================================================================
// GENERATION + VALIDATION
// ============================================================================

#[test]
fn test_order_label_ezpl_scenario() {
    let stream = codegen::generate(&order_label(), Language::Ezpl, &PrinterProfile::default()).unwrap();
    let lines: Vec<&str> = stream.text().lines().collect();

    assert!(lines.contains(&"^W100"), "width header missing:\n{}", stream.text());
    assert!(lines.iter().any(|l| l.starts_with("^Q50,")), "height header missing:\n{}", stream.text());
    let barcode = lines.iter().find(|l| l.starts_with("BE,")).unwrap();
    assert!(barcode.contains("7290011505853"));
    assert_eq!(stream.label_count(), 1);
}

#[test]
fn test_generated_streams_validate_clean() {
    let profiles = [
        (Language::Ezpl, PrinterProfile::for_family(PrinterFamily::Godex)),
        (Language::Zpl, PrinterProfile::for_family(PrinterFamily::Zebra)),
        (Language::Zpl, PrinterProfile::for_family(PrinterFamily::Zebra300)),
    ];
    for (language, profile) in profiles {
        for label in [order_label(), packing_label(1), framed_label()] {
            let stream = codegen::generate(&label, language, &profile).unwrap();
            let report = diagnostics::validate(&stream, label.size()).unwrap();
            assert!(
                report.issues.is_empty(),
                "{} at {} dpi reported {:?}",
                language,
                profile.dpi,
                report.issues
            );
        }
    }
}

#[test]
fn test_text_at_edge_fits_and_past_edge_overflows() {
    for language in [Language::Ezpl, Language::Zpl] {
        let inside = LabelSpec::new(100.0, 50.0).with(Text::new(99.0, 49.0, "edge"));
        let stream = codegen::generate(&inside, language, &PrinterProfile::default()).unwrap();
        let report = diagnostics::validate(&stream, inside.size()).unwrap();
        assert!(report.errors().next().is_none(), "{}: {:?}", language, report.issues);

        let outside = LabelSpec::new(100.0, 50.0).with(Text::new(101.0, 51.0, "gone"));
        let stream = codegen::generate(&outside, language, &PrinterProfile::default()).unwrap();
        let report = diagnostics::validate(&stream, outside.size()).unwrap();
        assert!(!report.is_valid);
        assert!(report.issues.iter().any(|i| i.kind == IssueKind::Overflow));
    }
}

#[test]
fn test_rescaled_stream_fits_smaller_label() {
    let stream = codegen::generate(&order_label(), Language::Zpl, &PrinterProfile::default()).unwrap();
    let small = etiqueta::label::LabelSize::new(60.0, 30.0);

    assert!(!diagnostics::validate(&stream, small).unwrap().is_valid);
    let fitted = diagnostics::rescale(&stream, small).unwrap();
    let report = diagnostics::validate(&fitted, small).unwrap();
    assert!(report.is_valid, "{:?}", report.issues);
    assert!(fitted.text().contains("^PW480"));
}

// ============================================================================
// ORCHESTRATION
// ============================================================================

#[tokio::test]
async fn test_batch_of_three_is_one_send() {
    let channel = CountingChannel::new("cli", 30, Mode::Working);
    let (sends, last) = channel.counters();
    let orchestrator = ezpl_orchestrator().with_channel(Box::new(channel));

    let labels: Vec<LabelSpec> = (1..=3).map(packing_label).collect();
    let result = orchestrator.print_batch(&labels).await.unwrap();

    assert!(result.success);
    assert_eq!(sends.load(Ordering::SeqCst), 1);
    let sent = last.lock().unwrap().clone().unwrap();
    assert_eq!(sent.lines().filter(|l| *l == "E").count(), 3);

    let job = orchestrator.job_status(result.job_id).await.unwrap();
    assert_eq!(job.label_count, 3);
}

#[tokio::test]
async fn test_batch_with_bad_label_sends_nothing() {
    let channel = CountingChannel::new("cli", 30, Mode::Working);
    let (sends, _) = channel.counters();
    let orchestrator = ezpl_orchestrator().with_channel(Box::new(channel));

    let labels = vec![
        packing_label(1),
        LabelSpec::new(100.0, 50.0).with(Barcode::new(5.0, 5.0, "12345", "Interleaved7of5")),
        packing_label(3),
    ];
    let err = orchestrator.print_batch(&labels).await.unwrap_err();
    assert!(matches!(err, EtiquetaError::Generation(_)));
    assert_eq!(sends.load(Ordering::SeqCst), 0);
    assert!(orchestrator.list_jobs(&JobFilter::default()).await.is_empty());
}

#[tokio::test]
async fn test_unavailable_channels_are_skipped() {
    let hot_folder = CountingChannel::new("hot-folder", 50, Mode::Unavailable);
    let sdk = CountingChannel::new("native-sdk", 40, Mode::Unavailable);
    let cli = CountingChannel::new("cli", 30, Mode::Working);
    let counters = [hot_folder.counters().0, sdk.counters().0, cli.counters().0];

    let orchestrator = ezpl_orchestrator().with_channels([
        Box::new(cli) as Box<dyn PrintChannel>,
        Box::new(hot_folder),
        Box::new(sdk),
    ]);

    let result = orchestrator.print_label(&order_label()).await.unwrap();
    assert!(result.success);
    assert_eq!(result.channel_used.as_deref(), Some("cli"));

    let total: usize = counters.iter().map(|c| c.load(Ordering::SeqCst)).sum();
    assert_eq!(total, 1);

    let job = orchestrator.job_status(result.job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Succeeded);
    assert_eq!(job.channel_used.as_deref(), Some("cli"));
    let visited: Vec<&str> = job.attempts.iter().map(|a| a.channel.as_str()).collect();
    assert_eq!(visited, vec!["hot-folder", "native-sdk", "cli"]);
    assert_eq!(job.attempts.iter().filter(|a| a.was_sent()).count(), 1);
}

#[tokio::test]
async fn test_all_channels_fail() {
    let orchestrator = ezpl_orchestrator().with_channels([
        Box::new(CountingChannel::new("native-sdk", 40, Mode::Unavailable)) as Box<dyn PrintChannel>,
        Box::new(CountingChannel::new("cli", 30, Mode::Failing)),
        Box::new(CountingChannel::new("socket", 20, Mode::Failing)),
    ]);

    let result = orchestrator.print_label(&order_label()).await.unwrap();
    assert!(!result.success);
    assert_eq!(result.channel_used, None);

    let job = orchestrator.job_status(result.job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error.clone().unwrap();
    assert!(!error.is_empty());
    for name in ["native-sdk", "cli", "socket"] {
        assert!(error.contains(name), "'{}' missing from: {}", name, error);
    }
    // Tried in priority order.
    assert!(error.find("native-sdk").unwrap() < error.find("cli").unwrap());
    assert!(matches!(job.attempts[1].outcome, ChannelOutcome::Failed { .. }));

    let failed = orchestrator
        .list_jobs(&JobFilter::default().status(JobStatus::Failed))
        .await;
    assert_eq!(failed.len(), 1);
}

#[tokio::test]
async fn test_socket_delivery_end_to_end() {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let printer = tokio::spawn(async move {
        let (mut conn, _) = listener.accept().await.unwrap();
        let mut received = String::new();
        conn.read_to_string(&mut received).await.unwrap();
        received
    });

    let orchestrator = PrintOrchestrator::new(Language::Zpl, PrinterProfile::for_family(PrinterFamily::Zebra))
        .unwrap()
        .with_channel(Box::new(
            CountingChannel::new("hot-folder", 50, Mode::Unavailable),
        ))
        .with_channel(Box::new(
            SocketChannel::new("127.0.0.1", port).with_grace(Duration::ZERO),
        ));

    let result = orchestrator.print_label(&order_label()).await.unwrap();
    assert_eq!(result.channel_used.as_deref(), Some("socket"));

    let received = printer.await.unwrap();
    assert!(received.starts_with("^XA"));
    assert!(received.trim_end().ends_with("^XZ"));
    assert!(received.contains("7290011505853"));
}
