//! Per-cycle timing metrics for the simulation controller.
//!
//! [`CycleMetrics`] captures timing for a single cycle; [`RunMetrics`]
//! accumulates them over a whole run and is returned in the
//! [`RunReport`](crate::RunReport).

use std::time::Duration;

/// Timing collected during a single cycle.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleMetrics {
    /// Wall-clock time for the entire cycle, in microseconds.
    pub total_us: u64,
    /// Time spent inside the package's step, in microseconds.
    pub package_us: u64,
    /// Time spent applying refresh and static media, in microseconds.
    pub media_us: u64,
    /// Time spent diluting, in microseconds. Zero on cycles without
    /// dilution.
    pub dilution_us: u64,
}

/// Aggregated timing for one run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunMetrics {
    /// Cycles recorded.
    pub cycles: u64,
    /// Sum of [`CycleMetrics::total_us`].
    pub total_us: u64,
    /// Sum of [`CycleMetrics::package_us`].
    pub package_us: u64,
    /// Sum of [`CycleMetrics::media_us`].
    pub media_us: u64,
    /// Sum of [`CycleMetrics::dilution_us`].
    pub dilution_us: u64,
    /// Slowest single cycle, in microseconds.
    pub max_cycle_us: u64,
}

impl RunMetrics {
    /// Fold one cycle into the totals.
    pub fn record(&mut self, cycle: &CycleMetrics) {
        self.cycles += 1;
        self.total_us += cycle.total_us;
        self.package_us += cycle.package_us;
        self.media_us += cycle.media_us;
        self.dilution_us += cycle.dilution_us;
        self.max_cycle_us = self.max_cycle_us.max(cycle.total_us);
    }

    /// Mean wall-clock time per cycle, or zero before any cycle ran.
    pub fn mean_cycle(&self) -> Duration {
        match self.total_us.checked_div(self.cycles) {
            Some(us) => Duration::from_micros(us),
            None => Duration::ZERO,
        }
    }
}

pub(crate) fn micros(d: Duration) -> u64 {
    u64::try_from(d.as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = RunMetrics::default();
        assert_eq!(m.cycles, 0);
        assert_eq!(m.mean_cycle(), Duration::ZERO);
    }

    #[test]
    fn record_accumulates_and_tracks_max() {
        let mut m = RunMetrics::default();
        m.record(&CycleMetrics {
            total_us: 100,
            package_us: 60,
            media_us: 30,
            dilution_us: 0,
        });
        m.record(&CycleMetrics {
            total_us: 300,
            package_us: 200,
            media_us: 50,
            dilution_us: 10,
        });
        assert_eq!(m.cycles, 2);
        assert_eq!(m.total_us, 400);
        assert_eq!(m.package_us, 260);
        assert_eq!(m.media_us, 80);
        assert_eq!(m.dilution_us, 10);
        assert_eq!(m.max_cycle_us, 300);
        assert_eq!(m.mean_cycle(), Duration::from_micros(200));
    }
}
