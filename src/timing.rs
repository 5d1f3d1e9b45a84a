//! The retransmission schedule.
//!
//! A [`TimingPolicy`] is a pure, immutable description of when a client
//! transaction retransmits and when it gives up. It is derived once, from
//! a [`Configuration`](crate::config::Configuration) snapshot, and handed
//! by value to each [`ClientTransaction`](crate::transaction::ClientTransaction)
//! at construction time -- never read live from global state.
use std::time::Duration;

use crate::constants;

/// An immutable retransmission schedule: `N` attempts, starting at `T0`
/// and doubling up to a cap of `T_max`, followed by one final grace period.
///
/// With the defaults (`N=6`, `T0=100ms`, `T_max=1600ms`) the resulting send
/// offsets from transaction start are `{0, 100, 300, 700, 1500, 3100, 4700}`
/// ms, and timeout is declared at `6300` ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingPolicy {
    max_retransmissions: u32,
    initial_interval: Duration,
    max_interval: Duration,
}
impl TimingPolicy {
    /// Builds a policy, clamping out-of-range inputs to the nearest valid
    /// value rather than failing: `N` is raised to at least 1, and `T0` is
    /// clamped into `[1, T_max]`. This keeps `Configuration`'s
    /// logged-and-ignored validation simple to apply upstream without this
    /// type itself needing a fallible constructor.
    pub fn new(max_retransmissions: u32, initial_interval: Duration, max_interval: Duration) -> Self {
        let max_retransmissions = max_retransmissions.max(1);
        let initial_interval = initial_interval
            .max(Duration::from_millis(1))
            .min(max_interval);
        let max_interval = max_interval.max(initial_interval);
        TimingPolicy {
            max_retransmissions,
            initial_interval,
            max_interval,
        }
    }

    /// `N`: the number of retransmissions after the initial send.
    pub fn max_retransmissions(&self) -> u32 {
        self.max_retransmissions
    }

    /// `T0`: the wait before the first retransmission.
    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    /// `T_max`: the cap every subsequent wait is clamped to.
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Doubles `wait`, clamped at `T_max` (the invariant `wait <= T_max`
    /// always holds).
    pub fn next_wait(&self, wait: Duration) -> Duration {
        (wait * 2).min(self.max_interval)
    }

    /// The full sequence of send offsets from transaction start, followed
    /// by the timeout offset.
    ///
    /// Used by tests and documentation; the transaction state machine
    /// itself never materializes this vector, it derives each wait
    /// incrementally.
    pub fn schedule_offsets(&self) -> (Vec<Duration>, Duration) {
        let mut offsets = Vec::with_capacity(self.max_retransmissions as usize + 1);
        let mut elapsed = Duration::from_millis(0);
        let mut wait = self.initial_interval;
        offsets.push(elapsed);
        for _ in 0..self.max_retransmissions {
            elapsed += wait;
            offsets.push(elapsed);
            wait = self.next_wait(wait);
        }
        let timeout = elapsed + self.next_wait(wait);
        (offsets, timeout)
    }
}
impl Default for TimingPolicy {
    fn default() -> Self {
        TimingPolicy::new(
            constants::DEFAULT_MAX_RETRANSMISSIONS,
            Duration::from_millis(constants::DEFAULT_ORIGINAL_WAIT_INTERVAL_MS),
            Duration::from_millis(constants::DEFAULT_MAX_WAIT_INTERVAL_MS),
        )
    }
}
