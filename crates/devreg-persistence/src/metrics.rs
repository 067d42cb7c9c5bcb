//! ---
//! devreg_section: "03-persistence-logging"
//! devreg_subsection: "module"
//! devreg_type: "source"
//! devreg_scope: "code"
//! devreg_description: "Persistence abstractions and storage bindings."
//! devreg_version: "v0.0.0-prealpha"
//! devreg_owner: "tbd"
//! ---
use std::sync::Arc;

use prometheus::{self, Histogram, HistogramOpts, IntCounter, Opts, Registry};

use crate::Result;

/// Metrics published by the snapshot store.
#[derive(Clone)]
pub struct PersistenceMetrics {
    snapshots_written: IntCounter,
    snapshot_failures: IntCounter,
    snapshot_bytes: IntCounter,
    load_duration: Histogram,
}

impl PersistenceMetrics {
    /// Register all persistence metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> Result<Self> {
        let snapshots_written = IntCounter::with_opts(Opts::new(
            "devreg_snapshots_written_total",
            "Total number of device snapshots successfully persisted",
        ))?;
        registry.register(Box::new(snapshots_written.clone()))?;

        let snapshot_failures = IntCounter::with_opts(Opts::new(
            "devreg_snapshot_failures_total",
            "Total number of device snapshot writes that failed",
        ))?;
        registry.register(Box::new(snapshot_failures.clone()))?;

        let snapshot_bytes = IntCounter::with_opts(Opts::new(
            "devreg_snapshot_bytes_total",
            "Total bytes written to device snapshots",
        ))?;
        registry.register(Box::new(snapshot_bytes.clone()))?;

        let histogram_opts = HistogramOpts::new(
            "devreg_snapshot_load_seconds",
            "Duration spent loading the device snapshot at startup",
        )
        .buckets(prometheus::exponential_buckets(0.001, 2.0, 12)?);
        let load_duration = Histogram::with_opts(histogram_opts)?;
        registry.register(Box::new(load_duration.clone()))?;

        Ok(Self {
            snapshots_written,
            snapshot_failures,
            snapshot_bytes,
            load_duration,
        })
    }

    /// Record a successful snapshot write of `bytes` bytes.
    pub fn record_snapshot_written(&self, bytes: u64) {
        self.snapshots_written.inc();
        self.snapshot_bytes.inc_by(bytes);
    }

    /// Record a failed snapshot write.
    pub fn record_snapshot_failed(&self) {
        self.snapshot_failures.inc();
    }

    /// Observe the duration spent loading a snapshot.
    pub fn observe_load_duration(&self, seconds: f64) {
        self.load_duration.observe(seconds);
    }
}

impl std::fmt::Debug for PersistenceMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceMetrics").finish_non_exhaustive()
    }
}
