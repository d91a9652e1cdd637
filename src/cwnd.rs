//! Per-flow congestion-window estimation.
//!
//! This is a responsiveness heuristic, not a congestion-control
//! implementation: there is no RTT measurement and no slow-start or
//! AIMD state machine. Growth in bytes-in-flight is tracked
//! immediately, and lower observations decay the estimate toward the
//! new value, which is enough to bound the effective-window
//! calculation without pretending to know the sender's real cwnd.

use crate::{flow::FlowKey, FxDashMap};
use dashmap::mapref::entry::Entry;

/// Weight kept from the previous estimate when bytes-in-flight drops.
const DECAY_OLD: f64 = 0.75;
/// Weight given to the new, lower observation.
const DECAY_NEW: f64 = 0.25;

/// Heuristic per-flow congestion-window estimates.
#[derive(Debug, Default)]
pub struct CwndEstimator {
    estimates: FxDashMap<FlowKey, f64>,
}

impl CwndEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one observation into the flow's estimate and returns the
    /// updated value.
    ///
    /// The first observation for a flow seeds the estimate from its
    /// bytes-in-flight, or 0 when that field is unavailable. Later
    /// observations without bytes-in-flight leave the estimate
    /// untouched.
    pub fn update(&self, key: &FlowKey, bytes_in_flight: Option<u32>) -> f64 {
        match self.estimates.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if let Some(in_flight) = bytes_in_flight {
                    let in_flight = f64::from(in_flight);
                    let estimate = entry.get_mut();
                    *estimate = if in_flight > *estimate {
                        in_flight
                    } else {
                        DECAY_OLD * *estimate + DECAY_NEW * in_flight
                    };
                }
                *entry.get()
            }
            Entry::Vacant(entry) => *entry.insert(bytes_in_flight.map_or(0.0, f64::from)),
        }
    }

    /// Read-only variant for replay passes: the stored estimate, or
    /// the value seeding would have produced. Never writes.
    pub fn peek(&self, key: &FlowKey, bytes_in_flight: Option<u32>) -> f64 {
        match self.estimates.get(key) {
            Some(estimate) => *estimate,
            None => bytes_in_flight.map_or(0.0, f64::from),
        }
    }

    pub fn clear(&self) {
        self.estimates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn key() -> FlowKey {
        let src: SocketAddr = "10.0.0.1:443".parse().unwrap();
        let dst: SocketAddr = "10.0.0.2:52234".parse().unwrap();
        FlowKey::new(Some(0), src, dst)
    }

    #[test]
    fn seeds_from_first_bytes_in_flight() {
        let estimator = CwndEstimator::new();
        assert_eq!(estimator.update(&key(), Some(2000)), 2000.0);
    }

    #[test]
    fn seeds_zero_when_unavailable() {
        let estimator = CwndEstimator::new();
        assert_eq!(estimator.update(&key(), None), 0.0);
        // Growth from the zero seed is still immediate.
        assert_eq!(estimator.update(&key(), Some(1448)), 1448.0);
    }

    #[test]
    fn growth_tracks_the_maximum_exactly() {
        let estimator = CwndEstimator::new();
        let mut maximum = 0.0f64;
        for in_flight in [1448u32, 2896, 5792, 11584, 23168] {
            let estimate = estimator.update(&key(), Some(in_flight));
            maximum = maximum.max(f64::from(in_flight));
            assert_eq!(estimate, maximum);
        }
    }

    #[test]
    fn lower_observations_decay() {
        let estimator = CwndEstimator::new();
        estimator.update(&key(), Some(2000));
        assert_eq!(estimator.update(&key(), Some(500)), 1625.0);
    }

    #[test]
    fn missing_value_leaves_estimate_unchanged() {
        let estimator = CwndEstimator::new();
        estimator.update(&key(), Some(2000));
        assert_eq!(estimator.update(&key(), None), 2000.0);
        assert_eq!(estimator.peek(&key(), None), 2000.0);
    }

    #[test]
    fn peek_never_writes() {
        let estimator = CwndEstimator::new();
        assert_eq!(estimator.peek(&key(), Some(900)), 900.0);
        // Still unseeded: the next update seeds fresh.
        assert_eq!(estimator.update(&key(), Some(100)), 100.0);
    }

    #[test]
    fn clear_forgets_everything() {
        let estimator = CwndEstimator::new();
        estimator.update(&key(), Some(2000));
        estimator.clear();
        assert_eq!(estimator.update(&key(), Some(10)), 10.0);
    }
}
