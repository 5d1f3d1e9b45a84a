//! The access-layer contract: the capability the engine requires to
//! actually put a datagram on the wire. The UDP socket manager itself is
//! out of scope; this module only fixes the interface.
use std::fmt;

use crate::request::Request;
use crate::Result;

/// A transport-layer peer address: host-or-IP, port, and transport kind.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportAddress {
    host: String,
    port: u16,
    kind: TransportKind,
}
impl TransportAddress {
    /// Builds a UDP transport address (the only kind this engine supports).
    pub fn udp(host: impl Into<String>, port: u16) -> Self {
        TransportAddress {
            host: host.into(),
            port,
            kind: TransportKind::Udp,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }
}
impl fmt::Display for TransportAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{} ({:?})", self.host, self.port, self.kind)
    }
}

/// The transport kind a [`TransportAddress`] names.
///
/// UDP is the only variant this crate currently supports; the type stays
/// an enum, not a unit struct, so a future TCP-framed extension can add a
/// variant without breaking callers who match on it exhaustively with a
/// wildcard arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Udp,
}

/// An opaque handle identifying which local socket a transaction sends
/// from. The access layer resolves it to an actual socket; this crate
/// never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessPoint(String);
impl AccessPoint {
    pub fn new(descriptor: impl Into<String>) -> Self {
        AccessPoint(descriptor.into())
    }
}
impl fmt::Display for AccessPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The capability a [`ClientTransaction`](crate::transaction::ClientTransaction)
/// requires to transmit, both for its initial send and for every
/// retransmission.
///
/// `send` must be safe to call from the transaction's scheduling worker
/// and should not block indefinitely: the worker drives every armed
/// transaction's timers, so one slow `send` stalls all of them.
pub trait AccessLayer: Send + Sync {
    /// Sends `request` to `destination` from `access_point`.
    ///
    /// A failure here is either fatal (the first send, surfaced from
    /// `submit`) or merely logged and retried on schedule (a
    /// retransmission) -- which one applies is the caller's concern, not
    /// this trait's.
    fn send(
        &self,
        request: &Request,
        access_point: &AccessPoint,
        destination: &TransportAddress,
    ) -> Result<()>;
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;
    use trackable::error::ErrorKindExt;

    /// A test double that records every send attempt with a timestamp,
    /// optionally failing the first `fail_count` attempts -- used to drive
    /// schedule-timing and send-failure-resilience tests.
    pub struct RecordingAccessLayer {
        sends: Mutex<Vec<Instant>>,
        fail_first: Mutex<usize>,
    }
    impl RecordingAccessLayer {
        pub fn new() -> Self {
            RecordingAccessLayer {
                sends: Mutex::new(Vec::new()),
                fail_first: Mutex::new(0),
            }
        }

        pub fn fail_next(&self, count: usize) {
            *self.fail_first.lock().unwrap() = count;
        }

        pub fn send_timestamps(&self) -> Vec<Instant> {
            self.sends.lock().unwrap().clone()
        }

        pub fn send_count(&self) -> usize {
            self.sends.lock().unwrap().len()
        }
    }
    impl AccessLayer for RecordingAccessLayer {
        fn send(
            &self,
            _request: &Request,
            _access_point: &AccessPoint,
            _destination: &TransportAddress,
        ) -> Result<()> {
            self.sends.lock().unwrap().push(Instant::now());
            let mut fail_first = self.fail_first.lock().unwrap();
            if *fail_first > 0 {
                *fail_first -= 1;
                return Err(crate::ErrorKind::Transport
                    .cause("simulated transport failure")
                    .into());
            }
            Ok(())
        }
    }
}
