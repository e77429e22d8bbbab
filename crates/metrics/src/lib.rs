//! Metrics facade for Roll-DPoS consensus.
//!
//! Provides a [`MetricsRecorder`] trait with default no-op implementations.
//! A global singleton recorder is accessed via [`recorder()`], and
//! convenience free functions delegate to it.
//!
//! Callers record metrics via the free functions:
//!
//! ```ignore
//! rolldpos_metrics::record_consensus_result(true);
//! rolldpos_metrics::set_block_height(height);
//! ```
//!
//! At startup, install a backend (defaults to no-op):
//!
//! ```ignore
//! let registry = prometheus::Registry::new();
//! rolldpos_metrics::install_prometheus(&registry)?;
//! ```

use std::sync::OnceLock;

/// Domain-specific metrics recording trait.
///
/// All methods have default no-op implementations so backends only need to
/// override the metrics they care about.
#[allow(unused_variables)]
pub trait MetricsRecorder: Send + Sync + 'static {
    /// Record a consensus round outcome: `true` when agreement was reached,
    /// `false` when the round fell back to a timeout or dummy block.
    fn record_consensus_result(&self, reached: bool) {}

    /// Record a committed dummy block.
    fn record_dummy_block(&self) {}

    /// Set the committed block height gauge.
    fn set_block_height(&self, height: u64) {}

    /// Set the current epoch gauge.
    fn set_epoch(&self, epoch: u64) {}

    /// Set the event queue depth gauge.
    fn set_event_queue_depth(&self, depth: usize) {}
}

/// Built-in no-op recorder.
struct NoopRecorder;

impl MetricsRecorder for NoopRecorder {}

static RECORDER: OnceLock<Box<dyn MetricsRecorder>> = OnceLock::new();

/// Install a metrics backend. The first installation wins; later calls are
/// ignored.
pub fn install(recorder: impl MetricsRecorder) {
    let _ = RECORDER.set(Box::new(recorder));
}

/// The active recorder (no-op until a backend is installed).
pub fn recorder() -> &'static dyn MetricsRecorder {
    static NOOP: NoopRecorder = NoopRecorder;
    match RECORDER.get() {
        Some(r) => r.as_ref(),
        None => &NOOP,
    }
}

/// Record a consensus round outcome.
pub fn record_consensus_result(reached: bool) {
    recorder().record_consensus_result(reached);
}

/// Record a committed dummy block.
pub fn record_dummy_block() {
    recorder().record_dummy_block();
}

/// Set the committed block height gauge.
pub fn set_block_height(height: u64) {
    recorder().set_block_height(height);
}

/// Set the current epoch gauge.
pub fn set_epoch(epoch: u64) {
    recorder().set_epoch(epoch);
}

/// Set the event queue depth gauge.
pub fn set_event_queue_depth(depth: usize) {
    recorder().set_event_queue_depth(depth);
}

// ═══════════════════════════════════════════════════════════════════════
// Prometheus backend
// ═══════════════════════════════════════════════════════════════════════

/// Prometheus-backed recorder.
pub struct PrometheusRecorder {
    consensus_results: prometheus::IntCounterVec,
    dummy_blocks: prometheus::IntCounter,
    block_height: prometheus::IntGauge,
    epoch: prometheus::IntGauge,
    event_queue_depth: prometheus::IntGauge,
}

impl PrometheusRecorder {
    /// Create a recorder with all collectors registered in `registry`.
    pub fn new(registry: &prometheus::Registry) -> Result<Self, prometheus::Error> {
        let consensus_results = prometheus::IntCounterVec::new(
            prometheus::Opts::new("rolldpos_consensus", "Consensus round results"),
            &["result"],
        )?;
        let dummy_blocks = prometheus::IntCounter::new(
            "rolldpos_dummy_blocks",
            "Dummy blocks committed on agreement failure",
        )?;
        let block_height =
            prometheus::IntGauge::new("rolldpos_block_height", "Committed block height")?;
        let epoch = prometheus::IntGauge::new("rolldpos_epoch", "Current epoch number")?;
        let event_queue_depth =
            prometheus::IntGauge::new("rolldpos_event_queue_depth", "Consensus event queue depth")?;

        registry.register(Box::new(consensus_results.clone()))?;
        registry.register(Box::new(dummy_blocks.clone()))?;
        registry.register(Box::new(block_height.clone()))?;
        registry.register(Box::new(epoch.clone()))?;
        registry.register(Box::new(event_queue_depth.clone()))?;

        Ok(Self {
            consensus_results,
            dummy_blocks,
            block_height,
            epoch,
            event_queue_depth,
        })
    }
}

impl MetricsRecorder for PrometheusRecorder {
    fn record_consensus_result(&self, reached: bool) {
        let label = if reached { "reached" } else { "failed" };
        self.consensus_results.with_label_values(&[label]).inc();
    }

    fn record_dummy_block(&self) {
        self.dummy_blocks.inc();
    }

    fn set_block_height(&self, height: u64) {
        self.block_height.set(height as i64);
    }

    fn set_epoch(&self, epoch: u64) {
        self.epoch.set(epoch as i64);
    }

    fn set_event_queue_depth(&self, depth: usize) {
        self.event_queue_depth.set(depth as i64);
    }
}

/// Build and install a Prometheus-backed recorder.
pub fn install_prometheus(registry: &prometheus::Registry) -> Result<(), prometheus::Error> {
    install(PrometheusRecorder::new(registry)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prometheus_recorder_counts() {
        let registry = prometheus::Registry::new();
        let recorder = PrometheusRecorder::new(&registry).unwrap();

        recorder.record_consensus_result(true);
        recorder.record_consensus_result(true);
        recorder.record_consensus_result(false);
        recorder.set_block_height(42);

        assert_eq!(
            recorder
                .consensus_results
                .with_label_values(&["reached"])
                .get(),
            2
        );
        assert_eq!(
            recorder
                .consensus_results
                .with_label_values(&["failed"])
                .get(),
            1
        );
        assert_eq!(recorder.block_height.get(), 42);
    }

    #[test]
    fn test_free_functions_default_to_noop() {
        // No backend installed in this test binary: must not panic.
        record_consensus_result(true);
        set_event_queue_depth(3);
    }
}
