//! The transaction registry: the process-wide map from transaction
//! identifier to live transaction, and the single shared scheduling
//! worker that drives every transaction's retransmission timers.
//!
//! A min-heap of deadlines behind a `Mutex`/`Condvar`, lazily skipping
//! entries for transactions that are no longer armed when popped, in
//! place of one OS thread per transaction.
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::access::{AccessLayer, AccessPoint, TransportAddress};
use crate::collector::ResponseCollector;
use crate::config::Configuration;
use crate::request::{Request, ResponseEvent};
use crate::transaction::{ClientTransaction, SchedulerHandle};
use crate::types::TransactionId;
use crate::Result;

#[derive(Debug, Eq, PartialEq)]
struct Wakeup {
    deadline: Instant,
    id: TransactionId,
}
impl Ord for Wakeup {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the earliest deadline first.
        other.deadline.cmp(&self.deadline)
    }
}
impl PartialOrd for Wakeup {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Shared<L> {
    access_layer: Arc<L>,
    transactions: Mutex<HashMap<TransactionId, Arc<ClientTransaction>>>,
    queue: Mutex<BinaryHeap<Wakeup>>,
    condvar: Condvar,
    shutdown: AtomicBool,
}
impl<L: AccessLayer + 'static> SchedulerHandle for Shared<L> {
    fn schedule(&self, id: TransactionId, deadline: Instant) {
        self.queue.lock().unwrap().push(Wakeup { deadline, id });
        // Wakes the worker whether it was sleeping on an empty queue or on
        // a deadline that is now later than this one.
        self.condvar.notify_all();
    }

    fn remove(&self, id: TransactionId) {
        self.transactions.lock().unwrap().remove(&id);
        // The heap keeps a stale entry for `id`; the worker discards it
        // with a no-op when `ClientTransaction::on_wakeup` finds the
        // transaction no longer armed (or no longer present at all).
    }
}
impl<L: AccessLayer + 'static> Shared<L> {
    fn fire(&self, id: TransactionId) {
        let txn = self.transactions.lock().unwrap().get(&id).cloned();
        if let Some(txn) = txn {
            txn.on_wakeup();
        }
    }

    fn worker_loop(self: Arc<Self>) {
        let mut queue = self.queue.lock().unwrap();
        loop {
            if self.shutdown.load(AtomicOrdering::SeqCst) {
                return;
            }
            match queue.peek() {
                None => {
                    queue = self.condvar.wait(queue).unwrap();
                }
                Some(next) => {
                    let now = Instant::now();
                    if next.deadline <= now {
                        let Wakeup { id, .. } = queue.pop().unwrap();
                        drop(queue);
                        self.fire(id);
                        queue = self.queue.lock().unwrap();
                    } else {
                        let wait = next.deadline - now;
                        let (q, _timeout_result) = self.condvar.wait_timeout(queue, wait).unwrap();
                        queue = q;
                    }
                }
            }
        }
    }
}

/// The process-wide demultiplexer for a client's in-flight STUN
/// transactions.
///
/// Owns a single background worker thread that drives every registered
/// transaction's retransmission schedule; callers never block on it other
/// than the synchronous first send `submit` performs.
pub struct TransactionRegistry<L: AccessLayer + 'static> {
    shared: Arc<Shared<L>>,
    config: Mutex<Configuration>,
    worker: Option<JoinHandle<()>>,
}
impl<L: AccessLayer + 'static> TransactionRegistry<L> {
    /// Builds a registry that sends through `access_layer`, with default
    /// configuration, and starts its scheduling worker thread.
    pub fn new(access_layer: L) -> Self {
        Self::with_config(access_layer, Configuration::default())
    }

    /// Builds a registry with an explicit initial [`Configuration`].
    pub fn with_config(access_layer: L, config: Configuration) -> Self {
        let shared = Arc::new(Shared {
            access_layer: Arc::new(access_layer),
            transactions: Mutex::new(HashMap::new()),
            queue: Mutex::new(BinaryHeap::new()),
            condvar: Condvar::new(),
            shutdown: AtomicBool::new(false),
        });
        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("stun-txn-scheduler".into())
            .spawn(move || worker_shared.worker_loop())
            .expect("failed to spawn transaction scheduler thread");
        TransactionRegistry {
            shared,
            config: Mutex::new(config),
            worker: Some(worker),
        }
    }

    /// Replaces the configuration snapshot future `submit` calls sample
    /// from. Does not affect transactions already in flight, since each
    /// one samples its own timing policy at construction time.
    pub fn set_config(&self, config: Configuration) {
        *self.config.lock().unwrap() = config;
    }

    /// Draws a fresh identifier, stamps `request`, constructs a
    /// transaction, registers it, and sends attempt 0.
    ///
    /// On failure (entropy exhaustion, or a first-send transport error)
    /// no residue is left in the registry.
    pub fn submit(
        &self,
        mut request: Request,
        destination: TransportAddress,
        access_point: AccessPoint,
        collector: Arc<dyn ResponseCollector>,
    ) -> Result<Arc<ClientTransaction>> {
        let id = TransactionId::new()?;
        request.stamp_transaction_id(id);

        let config = *self.config.lock().unwrap();
        let policy = config.timing_policy();
        let keep_after_response = config.keep_client_trans_after_a_response();

        let txn = Arc::new(ClientTransaction::new(
            id,
            request,
            destination,
            access_point,
            collector,
            self.shared.access_layer.clone(),
            policy,
            keep_after_response,
            self.shared.clone() as Arc<dyn SchedulerHandle>,
        ));

        self.shared
            .transactions
            .lock()
            .unwrap()
            .insert(id, txn.clone());

        if let Err(e) = txn.start() {
            self.shared.transactions.lock().unwrap().remove(&id);
            return Err(e);
        }

        Ok(txn)
    }

    /// Looks up `id`; if present, forwards `event` to that transaction's
    /// `deliver_response` and returns `true`. An unknown identifier (a
    /// stray response) returns `false` with no state change.
    pub fn deliver(&self, id: TransactionId, event: ResponseEvent) -> bool {
        let txn = self.shared.transactions.lock().unwrap().get(&id).cloned();
        match txn {
            Some(txn) => {
                txn.deliver_response(event);
                true
            }
            None => {
                log::debug!("stray response for unknown transaction {:?}", id);
                false
            }
        }
    }

    /// Cancels every currently registered transaction (used at shutdown).
    pub fn cancel_all(&self) {
        let txns: Vec<_> = self
            .shared
            .transactions
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect();
        for txn in txns {
            txn.cancel();
        }
    }

    /// The number of transactions currently registered (i.e. `Armed`).
    /// Exposed mainly for tests asserting the registry ends up clean.
    pub fn len(&self) -> usize {
        self.shared.transactions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl<L: AccessLayer + 'static> Drop for TransactionRegistry<L> {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, AtomicOrdering::SeqCst);
        self.shared.condvar.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
