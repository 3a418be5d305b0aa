//! Publish success-rate monitor.

use parking_lot::Mutex;

/// Minimum ratio of successful publishes for the service to be considered
/// healthy.
pub const MIN_HEALTHY_RATIO: f64 = 0.9;

#[derive(Debug, Default)]
struct State {
    count: u64,
    rate: f64,
}

/// Incremental running mean of publish outcomes.
///
/// Keeps O(1) state instead of a pair of counters, which stays numerically
/// stable over the expected regime and cannot overflow between resets.
#[derive(Debug, Default)]
pub struct SuccessRateMonitor {
    state: Mutex<State>,
}

impl SuccessRateMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one publish outcome.
    pub fn record(&self, ok: bool) {
        let val = if ok { 1.0 } else { 0.0 };
        let mut state = self.state.lock();
        state.count += 1;
        state.rate += (val - state.rate) / state.count as f64;
    }

    /// Proportion of successful publishes since the last reset, then reset.
    /// Returns 1.0 when nothing was recorded.
    pub fn read_and_reset(&self) -> f64 {
        let mut state = self.state.lock();
        if state.count == 0 {
            return 1.0;
        }
        let rate = state.rate;
        state.count = 0;
        state.rate = 0.0;
        rate
    }

    /// Number of outcomes recorded since the last reset.
    pub fn count(&self) -> u64 {
        self.state.lock().count
    }
}
