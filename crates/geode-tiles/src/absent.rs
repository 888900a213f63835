//! Per-level record of resources that repeatedly failed to load.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Attempts after which a resource is treated as absent.
pub const DEFAULT_MAX_ABSENT_ATTEMPTS: u32 = 2;

/// Cool-down during which an absent resource is not retried.
pub const DEFAULT_MIN_CHECK_INTERVAL: Duration = Duration::from_millis(10_000);

#[derive(Clone, Copy, Debug)]
struct AbsentEntry {
    attempts: u32,
    last_attempt: Instant,
}

/// Failure counts keyed by resource number.
///
/// A resource is absent once it has failed at least `max_attempts` times and
/// the latest failure is younger than `min_check_interval`. When the interval
/// elapses the resource may be fetched again; the attempt count is kept, so
/// one more failure suppresses it again immediately, while a success
/// ([`AbsentResourceList::unmark`]) clears it.
///
/// Internally synchronized: completions may be recorded while other threads
/// query the list.
#[derive(Debug)]
pub struct AbsentResourceList {
    max_attempts: u32,
    min_check_interval: Duration,
    entries: DashMap<u64, AbsentEntry>,
}

impl Default for AbsentResourceList {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ABSENT_ATTEMPTS, DEFAULT_MIN_CHECK_INTERVAL)
    }
}

impl AbsentResourceList {
    pub fn new(max_attempts: u32, min_check_interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_check_interval,
            entries: DashMap::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn min_check_interval(&self) -> Duration {
        self.min_check_interval
    }

    /// Record a failed attempt at `now`. Returns the attempt count so far.
    pub fn mark_at(&self, resource: u64, now: Instant) -> u32 {
        let mut entry = self.entries.entry(resource).or_insert(AbsentEntry {
            attempts: 0,
            last_attempt: now,
        });
        entry.attempts = entry.attempts.saturating_add(1);
        entry.last_attempt = now;
        if entry.attempts == self.max_attempts {
            tracing::warn!(
                resource,
                attempts = entry.attempts,
                "resource marked absent after repeated failures"
            );
        }
        entry.attempts
    }

    pub fn mark(&self, resource: u64) -> u32 {
        self.mark_at(resource, Instant::now())
    }

    /// Forget all failures for a resource.
    pub fn unmark(&self, resource: u64) {
        self.entries.remove(&resource);
    }

    /// True while the resource is in its post-failure cool-down.
    pub fn is_absent_at(&self, resource: u64, now: Instant) -> bool {
        let Some(entry) = self.entries.get(&resource) else {
            return false;
        };
        entry.attempts >= self.max_attempts
            && now.saturating_duration_since(entry.last_attempt) < self.min_check_interval
    }

    pub fn is_absent(&self, resource: u64) -> bool {
        self.is_absent_at(resource, Instant::now())
    }

    /// Failures recorded for a resource.
    pub fn attempts(&self, resource: u64) -> u32 {
        self.entries.get(&resource).map_or(0, |e| e.attempts)
    }

    /// Number of resources with at least one recorded failure.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
