//! Timing counters for the phases of a phrase search.
//!
//! Counters are atomics so a shared [`Searcher`](crate::searcher::Searcher)
//! can record them from many threads without locking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Call count and accumulated time of one phase.
#[derive(Debug, Default)]
pub struct PhaseStat {
    calls: AtomicU64,
    nanos: AtomicU64,
}

impl PhaseStat {
    /// Record one call that took `elapsed`.
    pub fn record(&self, elapsed: Duration) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Run `f`, recording how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.record(start.elapsed());
        result
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }

    /// Mean time per call, zero when never called.
    pub fn average(&self) -> Duration {
        match self.calls() {
            0 => Duration::ZERO,
            calls => self.total() / calls as u32,
        }
    }

    fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.nanos.store(0, Ordering::Relaxed);
    }
}

/// Per-phase counters collected by a searcher.
#[derive(Debug, Default)]
pub struct Stats {
    pub normalize_tokenize: PhaseStat,
    pub merge_minimize: PhaseStat,
    pub first_intersect: PhaseStat,
    pub second_intersect: PhaseStat,
    pub merge_results: PhaseStat,
    pub get_doc_ids: PhaseStat,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        for phase in self.phases() {
            phase.1.reset();
        }
    }

    fn phases(&self) -> [(&'static str, &PhaseStat); 6] {
        [
            ("normalize_tokenize", &self.normalize_tokenize),
            ("merge_minimize", &self.merge_minimize),
            ("first_intersect", &self.first_intersect),
            ("second_intersect", &self.second_intersect),
            ("merge_results", &self.merge_results),
            ("get_doc_ids", &self.get_doc_ids),
        ]
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, phase) in self.phases() {
            writeln!(
                f,
                "{name:<20} calls: {:>8}  total: {:>12.3?}  avg: {:>10.3?}",
                phase.calls(),
                phase.total(),
                phase.average()
            )?;
        }
        Ok(())
    }
}
