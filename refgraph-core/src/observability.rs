/*!
Logging and metrics setup.

Every component logs through `tracing`. Applications that have no subscriber
of their own can call [`init_observability`]. With the `metrics` feature the
session also feeds a set of Prometheus counters kept in a process-wide
registry; [`SessionMetrics::gather_metrics`] renders them in the text
exposition format.
*/

#[cfg(feature = "metrics")]
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
#[cfg(feature = "metrics")]
use std::time::Instant;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{PersistError, Result};

/// Filter applied when `RUST_LOG` does not say otherwise.
pub const DEFAULT_DIRECTIVE: &str = "refgraph_core=info";

#[cfg(feature = "metrics")]
static METRICS: OnceLock<Option<SessionMetrics>> = OnceLock::new();

/// Counters fed by persistence sessions
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct SessionMetrics {
    pub beans_written_total: Counter,
    pub beans_read_total: Counter,
    pub anti_beans_total: Counter,
    pub frames_resolved_total: Counter,
    /// Number of roots per resolved frame
    pub frame_size: Histogram,
    /// Wall time from `start_*` to `end()`
    pub session_seconds: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
impl SessionMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let beans_written_total = counter(
            &registry,
            "refgraph_beans_written_total",
            "Beans written by persistence sessions",
        )?;
        let beans_read_total = counter(
            &registry,
            "refgraph_beans_read_total",
            "Beans read by persistence sessions",
        )?;
        let anti_beans_total = counter(
            &registry,
            "refgraph_anti_beans_total",
            "Anti-beans written in place of objects already serialized",
        )?;
        let frames_resolved_total = counter(
            &registry,
            "refgraph_frames_resolved_total",
            "Frames of mutually referencing items resolved while reading",
        )?;
        let frame_size = histogram(
            &registry,
            HistogramOpts::new("refgraph_frame_size", "Roots per resolved frame")
                .buckets(vec![2.0, 3.0, 4.0, 8.0, 16.0, 64.0, 256.0]),
        )?;
        let session_seconds = histogram(
            &registry,
            HistogramOpts::new(
                "refgraph_session_seconds",
                "Duration of persistence sessions in seconds",
            ),
        )?;

        Ok(Self {
            beans_written_total,
            beans_read_total,
            anti_beans_total,
            frames_resolved_total,
            frame_size,
            session_seconds,
            registry,
        })
    }

    /// The process-wide instance, created on first use.
    ///
    /// Returns `None` if the metrics could not be registered; the failure is
    /// logged once and sessions keep working without metrics.
    pub fn global() -> Option<&'static SessionMetrics> {
        METRICS
            .get_or_init(|| match Self::new() {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    tracing::warn!(error = %e, "session metrics disabled");
                    None
                }
            })
            .as_ref()
    }

    pub fn record_written(&self, anti_bean: bool) {
        self.beans_written_total.inc();
        if anti_bean {
            self.anti_beans_total.inc();
        }
    }

    pub fn record_read(&self) {
        self.beans_read_total.inc();
    }

    pub fn record_frame(&self, roots: usize) {
        self.frames_resolved_total.inc();
        self.frame_size.observe(roots as f64);
    }

    /// Gather metrics in Prometheus format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| PersistError::Observability(format!("failed to encode metrics: {e}")))?;

        String::from_utf8(buffer).map_err(|e| {
            PersistError::Observability(format!("metrics are not valid UTF-8: {e}"))
        })
    }
}

#[cfg(feature = "metrics")]
fn counter(registry: &Registry, name: &str, help: &str) -> Result<Counter> {
    let counter = Counter::new(name, help)
        .map_err(|e| PersistError::Observability(format!("failed to create {name}: {e}")))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| PersistError::Observability(format!("failed to register {name}: {e}")))?;
    Ok(counter)
}

#[cfg(feature = "metrics")]
fn histogram(registry: &Registry, opts: HistogramOpts) -> Result<Histogram> {
    let name = opts.common_opts.name.clone();
    let histogram = Histogram::with_opts(opts)
        .map_err(|e| PersistError::Observability(format!("failed to create {name}: {e}")))?;
    registry
        .register(Box::new(histogram.clone()))
        .map_err(|e| PersistError::Observability(format!("failed to register {name}: {e}")))?;
    Ok(histogram)
}

/// Measures one session from start to end
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct SessionTimer {
    start: Instant,
}

#[cfg(feature = "metrics")]
impl SessionTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn finish(self) {
        if let Some(metrics) = SessionMetrics::global() {
            metrics
                .session_seconds
                .observe(self.start.elapsed().as_secs_f64());
        }
    }
}

/// Installs a global `tracing` subscriber.
///
/// The filter comes from `RUST_LOG`, with [`DEFAULT_DIRECTIVE`] added. With
/// `json` the events are written as JSON lines, otherwise in the compact
/// human-readable format.
///
/// # Errors
/// * `PersistError::Observability` - If a global subscriber is already installed
pub fn init_observability(json: bool) -> Result<()> {
    #[cfg(feature = "metrics")]
    SessionMetrics::global();

    let directive = DEFAULT_DIRECTIVE
        .parse()
        .map_err(|e| PersistError::Observability(format!("invalid log directive: {e}")))?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    let result = if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false);
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer().compact();
        set_global_default(TracingRegistry::default().with(filter).with(fmt_layer))
    };
    result.map_err(|e| {
        PersistError::Observability(format!("failed to set global tracing subscriber: {e}"))
    })?;

    tracing::info!(json, "refgraph observability initialized");
    Ok(())
}

/// Human-readable logging with the default filter.
pub fn init_default_observability() -> Result<()> {
    init_observability(false)
}
