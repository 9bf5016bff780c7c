//! Greedy weighted-cost scheduling.
//!
//! Each backend carries an estimate of how many seconds of queued work it
//! has. Estimates decay with wall-clock time between decisions. A request
//! goes to the backend with the lowest `estimate + duration * weight`, and
//! that backend's estimate becomes the cost it was chosen at.
//!
//! The estimates are never corrected by feedback from the backends; drift
//! is only worn down by decay.

use std::time::Instant;

use crate::dispatch::request::Request;
use crate::load_balancer::backend::{BackendId, ServiceClass};
use crate::load_balancer::registry::BackendRegistry;

/// The outcome of a scheduling decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub backend: BackendId,
    pub class: ServiceClass,
    /// Estimated seconds until the chosen backend finishes this request.
    pub expected_time: f64,
}

#[derive(Debug, Clone)]
struct ScheduleEntry {
    id: BackendId,
    class: ServiceClass,
    /// Seconds of queued work, never negative.
    estimate: f64,
}

impl ScheduleEntry {
    fn weighted_cost(&self, request: &Request) -> f64 {
        self.estimate + f64::from(request.duration) * f64::from(self.class.weight(request.kind))
    }
}

/// Per-backend work estimates plus the decay clock.
///
/// Selection takes `&mut self`, so the owner serializes decisions without a lock.
#[derive(Debug, Clone)]
pub struct GreedyScheduler {
    /// Ascending id order; the scan order is the tie-break order.
    entries: Vec<ScheduleEntry>,
    last_decay: Instant,
}

impl GreedyScheduler {
    /// Create a scheduler with every estimate at zero.
    pub fn new(registry: &BackendRegistry) -> Self {
        Self::starting_at(registry, Instant::now())
    }

    /// Create a scheduler whose decay clock starts at `start`.
    pub fn starting_at(registry: &BackendRegistry, start: Instant) -> Self {
        let entries = registry
            .iter()
            .map(|backend| ScheduleEntry {
                id: backend.id,
                class: backend.class,
                estimate: 0.0,
            })
            .collect();

        Self {
            entries,
            last_decay: start,
        }
    }

    /// Choose a backend for `request` using the current time.
    pub fn select(&mut self, request: &Request) -> Option<Selection> {
        self.select_at(request, Instant::now())
    }

    /// Choose a backend for `request` as of `now`.
    ///
    /// Returns `None` only when there are no backends at all.
    pub fn select_at(&mut self, request: &Request, now: Instant) -> Option<Selection> {
        self.decay(now);

        // min_by keeps the first of equal elements, so ties go to the lowest id.
        let (index, cost) = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (index, entry.weighted_cost(request)))
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let entry = &mut self.entries[index];
        entry.estimate = cost;

        Some(Selection {
            backend: entry.id,
            class: entry.class,
            expected_time: cost,
        })
    }

    /// Subtract the time elapsed since the last decay from every estimate,
    /// flooring at zero.
    pub fn decay(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_decay).as_secs_f64();
        self.last_decay = now;

        for entry in &mut self.entries {
            entry.estimate = (entry.estimate - elapsed).max(0.0);
        }
    }

    /// Current estimate for one backend.
    pub fn estimate(&self, id: BackendId) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.estimate)
    }

    /// Snapshot of all estimates in ascending id order.
    pub fn estimates(&self) -> Vec<(BackendId, f64)> {
        self.entries
            .iter()
            .map(|entry| (entry.id, entry.estimate))
            .collect()
    }
}
