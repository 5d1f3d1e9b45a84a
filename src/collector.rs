//! The collector contract: the application-supplied sink that receives a
//! transaction's terminal outcome.
//!
//! Expressed as a small two-method capability rather than an inheritance
//! hierarchy.
use crate::request::ResponseEvent;

/// Receives the terminal outcome of one client transaction.
///
/// In the default mode, exactly one of `on_response`/`on_timeout` fires
/// per transaction. With `KEEP_CLIENT_TRANS_AFTER_A_RESPONSE` set,
/// `on_response` may fire more than once before `on_timeout` (or not at
/// all, if cancelled first).
///
/// Both methods are invoked on the registry's internal scheduling worker;
/// implementations must not block indefinitely.
pub trait ResponseCollector: Send + Sync {
    /// A matching response arrived.
    fn on_response(&self, event: ResponseEvent);

    /// The retransmission schedule was exhausted with no matching
    /// response.
    fn on_timeout(&self);
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// A test double recording every callback it received, in order --
    /// used to assert the "at most one terminal callback" property in the
    /// default mode.
    #[derive(Default)]
    pub struct RecordingCollector {
        responses: Mutex<Vec<ResponseEvent>>,
        timeouts: Mutex<u32>,
    }
    impl RecordingCollector {
        pub fn new() -> Self {
            RecordingCollector::default()
        }

        pub fn response_count(&self) -> usize {
            self.responses.lock().unwrap().len()
        }

        pub fn timeout_count(&self) -> u32 {
            *self.timeouts.lock().unwrap()
        }

        pub fn responses(&self) -> Vec<ResponseEvent> {
            self.responses.lock().unwrap().clone()
        }
    }
    impl ResponseCollector for RecordingCollector {
        fn on_response(&self, event: ResponseEvent) {
            self.responses.lock().unwrap().push(event);
        }

        fn on_timeout(&self) {
            *self.timeouts.lock().unwrap() += 1;
        }
    }
}
