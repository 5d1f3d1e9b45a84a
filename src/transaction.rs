//! The client transaction state machine: owns one outbound request,
//! executes the retransmission schedule, and notifies its collector
//! exactly once.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use trackable::error::ErrorKindExt;

use crate::access::{AccessLayer, AccessPoint, TransportAddress};
use crate::collector::ResponseCollector;
use crate::request::{Request, ResponseEvent};
use crate::timing::TimingPolicy;
use crate::types::TransactionId;
use crate::{Error, ErrorKind, Result};

/// The lifecycle states a client transaction moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Registered, scheduled, eligible to send/retransmit or complete.
    Armed,
    /// Cancelled externally; no further sends, no callback.
    Cancelled,
    /// Delivered a response or declared timeout; terminal.
    Completed,
}

/// The capability [`ClientTransaction`] uses to schedule its own future
/// wakeups and to remove itself from the registry on any terminal
/// transition.
///
/// Kept as a trait object (rather than a generic parameter on
/// `ClientTransaction`) so the transaction type itself stays independent
/// of the registry's `AccessLayer` type parameter -- see
/// [`crate::registry`] for the implementor.
pub(crate) trait SchedulerHandle: Send + Sync {
    fn schedule(&self, id: TransactionId, deadline: Instant);
    fn remove(&self, id: TransactionId);
}

#[derive(Debug)]
struct Inner {
    status: Status,
    started: bool,
    /// Number of retransmission-loop iterations completed so far; counts
    /// retransmissions only, not the initial send.
    loop_iterations_done: u32,
    /// The interval that was last used (and which the next wakeup will
    /// double, capped at `T_max`).
    wait: Duration,
}

/// One in-flight STUN request and its retransmission schedule.
pub struct ClientTransaction {
    id: TransactionId,
    request: Request,
    destination: TransportAddress,
    access_point: AccessPoint,
    collector: Arc<dyn ResponseCollector>,
    access_layer: Arc<dyn AccessLayer>,
    policy: TimingPolicy,
    keep_after_response: bool,
    scheduler: Arc<dyn SchedulerHandle>,
    inner: Mutex<Inner>,
    /// Fast, lock-free status probe for diagnostics/tests; `inner.status`
    /// is the sole source of truth for transitions.
    armed: AtomicBool,
}
impl ClientTransaction {
    pub(crate) fn new(
        id: TransactionId,
        request: Request,
        destination: TransportAddress,
        access_point: AccessPoint,
        collector: Arc<dyn ResponseCollector>,
        access_layer: Arc<dyn AccessLayer>,
        policy: TimingPolicy,
        keep_after_response: bool,
        scheduler: Arc<dyn SchedulerHandle>,
    ) -> Self {
        ClientTransaction {
            id,
            request,
            destination,
            access_point,
            collector,
            access_layer,
            policy,
            keep_after_response,
            scheduler,
            inner: Mutex::new(Inner {
                status: Status::Armed,
                started: false,
                loop_iterations_done: 0,
                wait: policy.initial_interval(),
            }),
            armed: AtomicBool::new(true),
        }
    }

    /// The demultiplexing key the registry indexes this transaction by.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// The current lifecycle state.
    pub fn status(&self) -> Status {
        self.inner.lock().unwrap().status
    }

    /// Sends attempt 0 synchronously, on the caller's context, and (on
    /// success) arms the retransmission schedule on the registry's
    /// scheduling worker.
    ///
    /// Idempotent: a second call returns `AlreadyStarted` without
    /// resending. A failure on the first send is returned to the caller;
    /// [`TransactionRegistry::submit`](crate::registry::TransactionRegistry::submit)
    /// is responsible for removing the transaction from the registry in
    /// that case, since this method has no way to "leave no residue" on
    /// its own once it has been constructed and registered.
    pub(crate) fn start(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock()?;
            if inner.started {
                return Err(ErrorKind::AlreadyStarted.error().into());
            }
            inner.started = true;
        }

        self.access_layer
            .send(&self.request, &self.access_point, &self.destination)
            .map_err(|e: Error| ErrorKind::Transport.cause(e).into())?;

        let mut inner = self.inner.lock()?;
        inner.loop_iterations_done = 0;
        inner.wait = self.policy.initial_interval();
        let deadline = Instant::now() + inner.wait;
        drop(inner);
        self.scheduler.schedule(self.id, deadline);
        Ok(())
    }

    /// Fires when the registry's scheduling worker pops this
    /// transaction's deadline.
    ///
    /// Runs the retransmission schedule one wakeup at a time: while under
    /// `N` iterations, doubles `wait`, retransmits, and reschedules; once
    /// `N` iterations have retransmitted, schedules one final grace
    /// wakeup; on *that* wakeup, declares timeout if still armed. A send
    /// failure here is logged and does not abort the schedule.
    pub(crate) fn on_wakeup(&self) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.status != Status::Armed {
            // Lost the race to a response or a cancel; exit silently.
            return;
        }

        if inner.loop_iterations_done < self.policy.max_retransmissions() {
            inner.wait = self.policy.next_wait(inner.wait);
            if let Err(e) = self
                .access_layer
                .send(&self.request, &self.access_point, &self.destination)
            {
                log::warn!(
                    "retransmit failed for transaction {:?} (attempt {}): {}",
                    self.id,
                    inner.loop_iterations_done + 1,
                    e
                );
            }
            inner.loop_iterations_done += 1;

            let deadline = if inner.loop_iterations_done < self.policy.max_retransmissions() {
                Instant::now() + inner.wait
            } else {
                Instant::now() + self.policy.next_wait(inner.wait)
            };
            drop(inner);
            self.scheduler.schedule(self.id, deadline);
        } else {
            inner.status = Status::Completed;
            self.armed.store(false, Ordering::SeqCst);
            drop(inner);
            self.scheduler.remove(self.id);
            self.collector.on_timeout();
        }
    }

    /// Cancels the transaction: `Armed -> Cancelled`, no further sends, no
    /// collector callback. Safe to call from any context, any number of
    /// times -- a no-op once the transaction is no longer armed.
    pub fn cancel(&self) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.status == Status::Armed {
            inner.status = Status::Cancelled;
            self.armed.store(false, Ordering::SeqCst);
            drop(inner);
            self.scheduler.remove(self.id);
        }
    }

    /// Invoked by the registry when an inbound message's identifier
    /// matches this transaction.
    ///
    /// In default mode: `Armed -> Completed`, removed from the registry,
    /// `on_response` invoked exactly once. With `keep_after_response` set,
    /// the transaction stays `Armed` and may be delivered to again; only
    /// cancellation or schedule exhaustion removes it.
    pub(crate) fn deliver_response(&self, event: ResponseEvent) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.status != Status::Armed {
            return;
        }
        if self.keep_after_response {
            drop(inner);
            self.collector.on_response(event);
        } else {
            inner.status = Status::Completed;
            self.armed.store(false, Ordering::SeqCst);
            drop(inner);
            self.scheduler.remove(self.id);
            self.collector.on_response(event);
        }
    }
}
impl std::fmt::Debug for ClientTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ClientTransaction")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("destination", &self.destination)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::test_support::RecordingAccessLayer;
    use crate::collector::test_support::RecordingCollector;
    use std::sync::Mutex as StdMutex;

    /// An in-memory scheduler double that records scheduled deadlines
    /// instead of actually running a background thread, so tests can
    /// drive `on_wakeup` deterministically.
    struct TestScheduler {
        scheduled: StdMutex<Vec<(TransactionId, Instant)>>,
        removed: StdMutex<Vec<TransactionId>>,
    }
    impl TestScheduler {
        fn new() -> Arc<Self> {
            Arc::new(TestScheduler {
                scheduled: StdMutex::new(Vec::new()),
                removed: StdMutex::new(Vec::new()),
            })
        }
    }
    impl SchedulerHandle for TestScheduler {
        fn schedule(&self, id: TransactionId, deadline: Instant) {
            self.scheduled.lock().unwrap().push((id, deadline));
        }
        fn remove(&self, id: TransactionId) {
            self.removed.lock().unwrap().push(id);
        }
    }

    fn make_transaction(
        scheduler: Arc<TestScheduler>,
        access_layer: Arc<RecordingAccessLayer>,
        collector: Arc<RecordingCollector>,
        keep_after_response: bool,
    ) -> ClientTransaction {
        ClientTransaction::new(
            TransactionId::from_bytes([7; 12]),
            Request::new("Binding", Vec::new()),
            TransportAddress::udp("stun.example.org", 3478),
            AccessPoint::new("udp:0.0.0.0:0"),
            collector,
            access_layer,
            TimingPolicy::default(),
            keep_after_response,
            scheduler,
        )
    }

    #[test]
    fn start_sends_once_and_schedules_next_wakeup() {
        let scheduler = TestScheduler::new();
        let access_layer = Arc::new(RecordingAccessLayer::new());
        let collector = Arc::new(RecordingCollector::new());
        let txn = make_transaction(scheduler.clone(), access_layer.clone(), collector, false);

        txn.start().unwrap();

        assert_eq!(access_layer.send_count(), 1);
        assert_eq!(txn.status(), Status::Armed);
        assert_eq!(scheduler.scheduled.lock().unwrap().len(), 1);
    }

    #[test]
    fn second_start_is_already_started() {
        let scheduler = TestScheduler::new();
        let access_layer = Arc::new(RecordingAccessLayer::new());
        let collector = Arc::new(RecordingCollector::new());
        let txn = make_transaction(scheduler, access_layer, collector, false);

        txn.start().unwrap();
        let err = txn.start().unwrap_err();
        assert!(format!("{}", err).len() > 0);
    }

    #[test]
    fn full_schedule_runs_to_timeout() {
        let scheduler = TestScheduler::new();
        let access_layer = Arc::new(RecordingAccessLayer::new());
        let collector = Arc::new(RecordingCollector::new());
        let txn = make_transaction(scheduler, access_layer.clone(), collector.clone(), false);

        txn.start().unwrap();
        // 6 loop wakeups retransmit; the 7th declares timeout.
        for _ in 0..6 {
            txn.on_wakeup();
            assert_eq!(txn.status(), Status::Armed);
        }
        assert_eq!(access_layer.send_count(), 7); // 1 initial + 6 retransmits
        txn.on_wakeup();
        assert_eq!(txn.status(), Status::Completed);
        assert_eq!(collector.timeout_count(), 1);
        assert_eq!(collector.response_count(), 0);
    }

    #[test]
    fn response_before_exhaustion_completes_without_timeout() {
        let scheduler = TestScheduler::new();
        let access_layer = Arc::new(RecordingAccessLayer::new());
        let collector = Arc::new(RecordingCollector::new());
        let txn = make_transaction(scheduler, access_layer.clone(), collector.clone(), false);

        txn.start().unwrap();
        txn.on_wakeup();
        txn.on_wakeup();

        let event = ResponseEvent::new(txn.id(), vec![1, 2, 3]);
        txn.deliver_response(event);
        assert_eq!(txn.status(), Status::Completed);
        assert_eq!(collector.response_count(), 1);

        // Further wakeups (a racing retransmit timer) must be no-ops.
        txn.on_wakeup();
        assert_eq!(collector.response_count(), 1);
        assert_eq!(collector.timeout_count(), 0);
    }

    #[test]
    fn cancel_is_silent_and_idempotent() {
        let scheduler = TestScheduler::new();
        let access_layer = Arc::new(RecordingAccessLayer::new());
        let collector = Arc::new(RecordingCollector::new());
        let txn = make_transaction(scheduler, access_layer.clone(), collector.clone(), false);

        txn.start().unwrap();
        txn.cancel();
        txn.cancel(); // no-op, must not panic or double-remove semantics
        assert_eq!(txn.status(), Status::Cancelled);

        txn.on_wakeup(); // a racing timer firing after cancel
        assert_eq!(access_layer.send_count(), 1); // only the initial send
        assert_eq!(collector.response_count(), 0);
        assert_eq!(collector.timeout_count(), 0);
    }

    #[test]
    fn keep_after_response_allows_multiple_deliveries_then_times_out() {
        let scheduler = TestScheduler::new();
        let access_layer = Arc::new(RecordingAccessLayer::new());
        let collector = Arc::new(RecordingCollector::new());
        let txn = make_transaction(scheduler, access_layer, collector.clone(), true);

        txn.start().unwrap();
        txn.deliver_response(ResponseEvent::new(txn.id(), vec![1]));
        txn.deliver_response(ResponseEvent::new(txn.id(), vec![2]));
        assert_eq!(collector.response_count(), 2);
        assert_eq!(txn.status(), Status::Armed);

        for _ in 0..7 {
            txn.on_wakeup();
        }
        assert_eq!(collector.timeout_count(), 1);
    }

    #[test]
    fn send_failures_do_not_abort_the_schedule() {
        let scheduler = TestScheduler::new();
        let access_layer = Arc::new(RecordingAccessLayer::new());
        access_layer.fail_next(2);
        let collector = Arc::new(RecordingCollector::new());
        let txn = make_transaction(scheduler, access_layer.clone(), collector.clone(), false);

        txn.start().unwrap(); // attempt 0, succeeds (fail_next applies to later calls too; see below)
        for _ in 0..6 {
            txn.on_wakeup();
        }
        // All 7 attempts were issued regardless of the 2 simulated failures.
        assert_eq!(access_layer.send_count(), 7);
    }
}
