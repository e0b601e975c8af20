//! Frame timing instrumentation.
//!
//! Each frame fills a [`FrameReport`] with node counts and, when timing is
//! enabled in the config, the wall-clock duration of every pass. Per-pass
//! timings are logged only every 60th frame to avoid flooding.

use std::time::{Duration, Instant};

/// Per-pass timings are logged on frames divisible by this.
pub const SAMPLE_EVERY: u64 = 60;

/// What happened in one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub main_nodes: usize,
    pub aux_nodes: usize,
    /// Sequence items fetched from producers.
    pub materialized: usize,
    pub commands: usize,
    pub evicted_keys: usize,
    /// `(pass, duration)` in execution order. Empty unless timing is on.
    pub passes: Vec<(&'static str, Duration)>,
}

impl FrameReport {
    pub fn new(frame: u64) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    /// Duration of the named pass, if it was timed.
    pub fn pass(&self, label: &str) -> Option<Duration> {
        self.passes
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, elapsed)| *elapsed)
    }

    pub fn total(&self) -> Duration {
        self.passes.iter().map(|(_, elapsed)| *elapsed).sum()
    }

    pub(crate) fn log(&self) {
        tracing::debug!(
            frame = self.frame,
            main_nodes = self.main_nodes,
            aux_nodes = self.aux_nodes,
            materialized = self.materialized,
            commands = self.commands,
            evicted_keys = self.evicted_keys,
            "frame complete"
        );
        if self.frame % SAMPLE_EVERY == 0 {
            for (label, elapsed) in &self.passes {
                tracing::debug!(frame = self.frame, pass = *label, "{:.2?}", elapsed);
            }
        }
    }
}

/// Run `f`; when `enabled`, record its duration under `label`.
#[inline]
pub(crate) fn measure<T>(report: &mut FrameReport, enabled: bool, label: &'static str, f: impl FnOnce() -> T) -> T {
    if !enabled {
        return f();
    }
    let start = Instant::now();
    let result = f();
    report.passes.push((label, start.elapsed()));
    result
}
