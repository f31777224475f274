//! Progress reporting hook (SPEC_FULL §F.3), grounded in the original
//! loader's `LoaderProgressBar`. Ambient observability, not a mutation of
//! core semantics.

pub trait ProgressSink: Send + Sync {
    fn begin_phase(&self, name: &str, total: u64);
    fn advance(&self, n: u64);
    fn end_phase(&self) {}
}

/// Default: reports nothing.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn begin_phase(&self, _name: &str, _total: u64) {}
    fn advance(&self, _n: u64) {}
}

/// Counter-backed sink the CLI wires in, logging phase completion via `tracing`.
pub struct CountingProgress {
    done: std::sync::atomic::AtomicU64,
    total: std::sync::atomic::AtomicU64,
}

impl Default for CountingProgress {
    fn default() -> Self {
        Self {
            done: std::sync::atomic::AtomicU64::new(0),
            total: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

impl ProgressSink for CountingProgress {
    fn begin_phase(&self, name: &str, total: u64) {
        self.total.store(total, std::sync::atomic::Ordering::Relaxed);
        self.done.store(0, std::sync::atomic::Ordering::Relaxed);
        tracing::info!(phase = name, total, "phase started");
    }

    fn advance(&self, n: u64) {
        self.done.fetch_add(n, std::sync::atomic::Ordering::Relaxed);
    }

    fn end_phase(&self) {
        let done = self.done.load(std::sync::atomic::Ordering::Relaxed);
        let total = self.total.load(std::sync::atomic::Ordering::Relaxed);
        tracing::info!(done, total, "phase finished");
    }
}
