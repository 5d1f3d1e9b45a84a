//! The configuration surface: process-wide keys governing timing, sampled
//! into an immutable snapshot at transaction construction time rather than
//! read live, so behavior stays deterministic once a transaction is built.
use std::time::Duration;

use crate::constants;
use crate::timing::TimingPolicy;

/// A `MAX_RETRANSMISSIONS` / `ORIGINAL_WAIT_INTERVAL` / `MAX_WAIT_INTERVAL` /
/// `KEEP_CLIENT_TRANS_AFTER_A_RESPONSE` snapshot.
///
/// Invalid values passed to the setters are logged via `log::warn!` and the
/// previous (default, unless already overridden) value is kept.
#[derive(Debug, Clone, Copy)]
pub struct Configuration {
    max_retransmissions: u32,
    original_wait_interval: Duration,
    max_wait_interval: Duration,
    keep_client_trans_after_a_response: bool,
}
impl Configuration {
    /// `MAX_RETRANSMISSIONS`: must be `>= 1`.
    pub fn set_max_retransmissions(&mut self, value: u32) -> &mut Self {
        if value >= 1 {
            self.max_retransmissions = value;
        } else {
            log::warn!(
                "MAX_RETRANSMISSIONS must be >= 1, got {}; keeping {}",
                value,
                self.max_retransmissions
            );
        }
        self
    }

    /// `ORIGINAL_WAIT_INTERVAL`, in milliseconds: must be `>= 1` and
    /// `<= MAX_WAIT_INTERVAL`.
    pub fn set_original_wait_interval_ms(&mut self, value: u64) -> &mut Self {
        let candidate = Duration::from_millis(value);
        if value >= 1 && candidate <= self.max_wait_interval {
            self.original_wait_interval = candidate;
        } else {
            log::warn!(
                "ORIGINAL_WAIT_INTERVAL must be in [1ms, MAX_WAIT_INTERVAL], got {}; keeping {:?}",
                value,
                self.original_wait_interval
            );
        }
        self
    }

    /// `MAX_WAIT_INTERVAL`, in milliseconds: must be `>= ORIGINAL_WAIT_INTERVAL`.
    pub fn set_max_wait_interval_ms(&mut self, value: u64) -> &mut Self {
        let candidate = Duration::from_millis(value);
        if candidate >= self.original_wait_interval {
            self.max_wait_interval = candidate;
        } else {
            log::warn!(
                "MAX_WAIT_INTERVAL must be >= ORIGINAL_WAIT_INTERVAL, got {}ms; keeping {:?}",
                value,
                self.max_wait_interval
            );
        }
        self
    }

    /// `KEEP_CLIENT_TRANS_AFTER_A_RESPONSE`.
    pub fn set_keep_client_trans_after_a_response(&mut self, value: bool) -> &mut Self {
        self.keep_client_trans_after_a_response = value;
        self
    }

    /// Whether a transaction built from this snapshot should stay armed
    /// (and keep delivering responses) after its first match, instead of
    /// completing and unregistering.
    pub fn keep_client_trans_after_a_response(&self) -> bool {
        self.keep_client_trans_after_a_response
    }

    /// Derives the immutable [`TimingPolicy`] a new transaction should use.
    pub fn timing_policy(&self) -> TimingPolicy {
        TimingPolicy::new(
            self.max_retransmissions,
            self.original_wait_interval,
            self.max_wait_interval,
        )
    }
}
impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            max_retransmissions: constants::DEFAULT_MAX_RETRANSMISSIONS,
            original_wait_interval: Duration::from_millis(constants::DEFAULT_ORIGINAL_WAIT_INTERVAL_MS),
            max_wait_interval: Duration::from_millis(constants::DEFAULT_MAX_WAIT_INTERVAL_MS),
            keep_client_trans_after_a_response: constants::DEFAULT_KEEP_CLIENT_TRANS_AFTER_A_RESPONSE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_defaults() {
        let config = Configuration::default();
        let policy = config.timing_policy();
        assert_eq!(policy.max_retransmissions(), 6);
        assert_eq!(policy.initial_interval(), Duration::from_millis(100));
        assert_eq!(policy.max_interval(), Duration::from_millis(1600));
        assert!(!config.keep_client_trans_after_a_response());
    }

    #[test]
    fn invalid_values_are_ignored() {
        let mut config = Configuration::default();
        config.set_max_retransmissions(0);
        config.set_original_wait_interval_ms(0);
        config.set_max_wait_interval_ms(10); // less than original_wait_interval
        let policy = config.timing_policy();
        assert_eq!(policy.max_retransmissions(), 6);
        assert_eq!(policy.initial_interval(), Duration::from_millis(100));
        assert_eq!(policy.max_interval(), Duration::from_millis(1600));
    }

    #[test]
    fn valid_overrides_apply() {
        let mut config = Configuration::default();
        config
            .set_max_retransmissions(3)
            .set_original_wait_interval_ms(50)
            .set_max_wait_interval_ms(400)
            .set_keep_client_trans_after_a_response(true);
        let policy = config.timing_policy();
        assert_eq!(policy.max_retransmissions(), 3);
        assert_eq!(policy.initial_interval(), Duration::from_millis(50));
        assert_eq!(policy.max_interval(), Duration::from_millis(400));
        assert!(config.keep_client_trans_after_a_response());
    }
}
