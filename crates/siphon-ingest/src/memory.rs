//! Memory watchdog
//!
//! Samples process memory utilization against a fixed heap ceiling chosen
//! from the host word size. Under pressure it shrinks the batch size (never
//! below the floor) and emits a rate-limited warning. It never pauses or
//! cancels in-flight work.

use crate::progress::ProgressReporter;
use crate::state::PipelineState;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Heap budget in MB used as the utilization denominator
pub const fn heap_ceiling_mb() -> f64 {
    if cfg!(target_pointer_width = "64") {
        1024.0
    } else {
        512.0
    }
}

/// Utilization at which the batch size is halved
const HIGH_WATERMARK_PERCENT: u64 = 70;

/// Utilization at which a warning is issued
const EXTREME_WATERMARK_PERCENT: u64 = 90;

/// Minimum interval between high-memory warnings
pub const WARNING_COOLDOWN: Duration = Duration::from_secs(30);

/// Source of process memory usage readings
pub trait MemorySampler: Send + Sync {
    /// Currently used process memory in MB
    fn used_mb(&self) -> f64;
}

/// Sampler backed by the operating system's view of this process
pub struct ProcessMemory;

impl MemorySampler for ProcessMemory {
    fn used_mb(&self) -> f64 {
        memory_stats::memory_stats()
            .map(|stats| stats.physical_mem as f64 / (1024.0 * 1024.0))
            .unwrap_or(0.0)
    }
}

/// Watches memory utilization and adapts the batch size
pub struct MemoryWatchdog {
    sampler: Box<dyn MemorySampler>,
    ceiling_mb: f64,
    warned_at: Mutex<Option<Instant>>,
}

impl MemoryWatchdog {
    pub fn new(sampler: Box<dyn MemorySampler>) -> Self {
        Self::with_ceiling(sampler, heap_ceiling_mb())
    }

    /// Override the heap ceiling; used by tests
    pub fn with_ceiling(sampler: Box<dyn MemorySampler>, ceiling_mb: f64) -> Self {
        Self {
            sampler,
            ceiling_mb,
            warned_at: Mutex::new(None),
        }
    }

    /// Sample utilization and apply the pressure policy.
    ///
    /// At or above 70% the batch size is halved (clamped to the floor) and a
    /// progress notice is emitted; this is always allowed. At or above 90% a
    /// warning is additionally issued, at most once per cooldown window.
    pub fn check(&self, state: &PipelineState, progress: &dyn ProgressReporter) {
        let used_mb = self.sampler.used_mb();
        let percent = (used_mb / self.ceiling_mb * 100.0).floor() as u64;

        if percent >= HIGH_WATERMARK_PERCENT {
            let (old, new) = state.halve_batch_size();
            if new < old {
                tracing::debug!(percent, old, new, "memory pressure, batch size reduced");
            }
            progress.update(&format!(
                "High memory usage ({}%). Reducing batch size to {}",
                percent, new
            ));
        }

        if percent >= EXTREME_WATERMARK_PERCENT {
            self.warn_extreme(used_mb, percent, state, progress);
        }
    }

    fn warn_extreme(
        &self,
        used_mb: f64,
        percent: u64,
        state: &PipelineState,
        progress: &dyn ProgressReporter,
    ) {
        let mut warned_at = self
            .warned_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Instant::now();
        if let Some(last) = *warned_at {
            if now.duration_since(last) < WARNING_COOLDOWN {
                return;
            }
        }
        *warned_at = Some(now);

        tracing::warn!(used_mb, percent, "high memory usage");
        progress.warn(&format!(
            "Warning: High memory usage. Memory usage at {:.2} MB ({}% of heap allocation for this process). {}",
            used_mb,
            percent,
            state.capacity_suggestions()
        ));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::progress::ProgressReporter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedSampler(f64);

    impl MemorySampler for FixedSampler {
        fn used_mb(&self) -> f64 {
            self.0
        }
    }

    #[derive(Default)]
    struct CountingProgress {
        updates: AtomicUsize,
        warnings: AtomicUsize,
    }

    impl ProgressReporter for CountingProgress {
        fn update(&self, _message: &str) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
        fn println(&self, _message: &str) {}
        fn warn(&self, _message: &str) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_high_usage_halves_batch_size() {
        // 768 of 1024 MB is 75% utilization
        let watchdog = MemoryWatchdog::with_ceiling(Box::new(FixedSampler(768.0)), 1024.0);
        let state = PipelineState::new(1000, 100, 2);
        let progress = CountingProgress::default();

        watchdog.check(&state, &progress);
        assert_eq!(state.batch_size(), 500);
        assert_eq!(progress.updates.load(Ordering::SeqCst), 1);
        assert_eq!(progress.warnings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_size_never_below_floor() {
        let watchdog = MemoryWatchdog::with_ceiling(Box::new(FixedSampler(768.0)), 1024.0);
        let state = PipelineState::new(1000, 100, 2);
        let progress = CountingProgress::default();

        for _ in 0..20 {
            watchdog.check(&state, &progress);
        }
        assert_eq!(state.batch_size(), 100);
    }

    #[tokio::test]
    async fn test_below_watermark_is_a_no_op() {
        let watchdog = MemoryWatchdog::with_ceiling(Box::new(FixedSampler(512.0)), 1024.0);
        let state = PipelineState::new(1000, 100, 2);
        let progress = CountingProgress::default();

        watchdog.check(&state, &progress);
        assert_eq!(state.batch_size(), 1000);
        assert_eq!(progress.updates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_warning_rate_limited_by_cooldown() {
        // 92% utilization on every sample
        let watchdog = MemoryWatchdog::with_ceiling(Box::new(FixedSampler(942.0)), 1024.0);
        let state = PipelineState::new(1000, 100, 2);
        let progress = Arc::new(CountingProgress::default());

        // Three samples within 10 seconds: exactly one warning
        watchdog.check(&state, progress.as_ref());
        tokio::time::advance(Duration::from_secs(5)).await;
        watchdog.check(&state, progress.as_ref());
        tokio::time::advance(Duration::from_secs(5)).await;
        watchdog.check(&state, progress.as_ref());
        assert_eq!(progress.warnings.load(Ordering::SeqCst), 1);

        // After the cooldown expires the next sample warns again
        tokio::time::advance(Duration::from_secs(31)).await;
        watchdog.check(&state, progress.as_ref());
        assert_eq!(progress.warnings.load(Ordering::SeqCst), 2);
    }
}
