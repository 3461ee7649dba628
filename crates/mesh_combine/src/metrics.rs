//! Combine statistics: a bounded timing history plus session counters.
//!
//! Compiled in with the `metrics` feature; [`COLLECT_METRICS`] switches
//! collection off at runtime. Without the feature every record call is a no-op.
//!
//! # Usage
//!
//! ```ignore
//! use mesh_combine::metrics::COLLECT_METRICS;
//!
//! // Pause collection while profiling something else.
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // CombineQueue records every completion automatically:
//! let snapshot = queue.metrics().snapshot();
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

use crate::error::CombineError;
use crate::queue::CombineCompletion;
use crate::types::OutputMesh;

/// Runtime switch, only consulted when the `metrics` feature is on.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Fixed-capacity FIFO of samples; the oldest sample falls off when full.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    samples: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: T) {
        while self.samples.len() >= self.capacity.max(1) {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.samples.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.samples.back()
    }
}

impl RollingWindow<u64> {
    pub fn sum(&self) -> u64 {
        self.samples.iter().sum()
    }

    /// Mean sample, 0.0 when empty.
    pub fn average(&self) -> f64 {
        match self.samples.len() {
            0 => 0.0,
            n => self.sum() as f64 / n as f64,
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let first = *self.samples.front()?;
        Some(
            self.samples
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }

    /// Summarize the window.
    pub fn stats(&self) -> TimingStats {
        let (min_us, max_us) = self.min_max().unwrap_or((0, 0));
        TimingStats {
            last_us: self.last().copied().unwrap_or(0),
            avg_us: self.average().round() as u64,
            min_us,
            max_us,
            sample_count: self.len() as u32,
        }
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128) // ~2 seconds of per-frame combines at 60fps
    }
}

/// Summary of a timing window, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimingStats {
    pub last_us: u64,
    pub avg_us: u64,
    pub min_us: u64,
    pub max_us: u64,
    pub sample_count: u32,
}

/// Point-in-time copy of [`CombineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub combine: TimingStats,
    pub total_combines: u64,
    pub total_failures: u64,
    pub total_meshes: u64,
    pub total_vertices: u64,
    pub total_indices: u64,
}

/// Cumulative combine statistics.
#[derive(Debug, Clone, Default)]
pub struct CombineMetrics {
    /// Rolling window of combine times in microseconds.
    pub combine_timings: RollingWindow<u64>,
    /// Successful combines this session.
    pub total_combines: u64,
    /// Failed or cancelled combines this session.
    pub total_failures: u64,
    /// Input meshes across successful combines.
    pub total_meshes: u64,
    /// Output vertices across successful combines.
    pub total_vertices: u64,
    /// Output indices across successful combines.
    pub total_indices: u64,
}

impl CombineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset timings. Cumulative counters are kept.
    pub fn reset(&mut self) {
        self.combine_timings.clear();
    }

    /// Record a combine timing.
    pub fn record_timing(&mut self, timing_us: u64) {
        if is_enabled() {
            self.combine_timings.push(timing_us);
        }
    }

    /// Record the outcome of one combine call.
    pub fn record(
        &mut self,
        result: &Result<OutputMesh, CombineError>,
        mesh_count: usize,
        timing_us: u64,
    ) {
        if !is_enabled() {
            return;
        }

        self.combine_timings.push(timing_us);
        match result {
            Ok(output) => {
                self.total_combines += 1;
                self.total_meshes += mesh_count as u64;
                self.total_vertices += output.vertex_count() as u64;
                self.total_indices += output.index_count() as u64;
            }
            Err(_) => self.total_failures += 1,
        }
    }

    /// Record a finished queue request.
    pub fn record_completion(&mut self, completion: &CombineCompletion) {
        self.record(&completion.result, completion.mesh_count, completion.timing_us);
    }

    pub fn avg_combine_timing_us(&self) -> f64 {
        self.combine_timings.average()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            combine: self.combine_timings.stats(),
            total_combines: self.total_combines,
            total_failures: self.total_failures,
            total_meshes: self.total_meshes,
            total_vertices: self.total_vertices,
            total_indices: self.total_indices,
        }
    }
}
