//! Constant values related to STUN client transactions.
//!
//! The values here follow the schedule this engine actually realizes
//! (see [`crate::timing`]), which is the one a reference ICE agent's STUN
//! stack ships with rather than the 9-attempt retransmission count
//! sometimes quoted for RFC 3489.

/// Default maximum number of retransmissions (N).
///
/// A client that has not received a response after this many retries, plus
/// one final grace period, declares the transaction timed out.
pub const DEFAULT_MAX_RETRANSMISSIONS: u32 = 6;

/// Default initial retransmission interval (T0), in milliseconds.
///
/// > A client SHOULD retransmit a STUN request message starting with an
/// > interval of RTO ("Retransmission TimeOut"), doubling after each
/// > retransmission.
/// >
/// > ([RFC 5389 -- 7.2.1. Sending over UDP]
/// > (https://tools.ietf.org/html/rfc5389#section-7.2.1))
pub const DEFAULT_ORIGINAL_WAIT_INTERVAL_MS: u64 = 100;

/// Default cap on the retransmission interval (T_max), in milliseconds.
pub const DEFAULT_MAX_WAIT_INTERVAL_MS: u64 = 1600;

/// Default value of `KEEP_CLIENT_TRANS_AFTER_A_RESPONSE`.
///
/// When `false` (the default), a transaction completes on its first
/// matching response. When `true`, it stays armed and may keep delivering
/// responses to its collector until cancelled or the schedule is exhausted.
pub const DEFAULT_KEEP_CLIENT_TRANS_AFTER_A_RESPONSE: bool = false;
