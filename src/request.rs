//! The opaque request and response-event types the transaction engine
//! stamps and delivers.
//!
//! The byte-level STUN codec is out of scope here; a [`Request`] carries
//! just enough -- a method name, an attribute payload, and a
//! transaction-id slot -- for the engine to stamp an identifier before
//! first send and for tests/access layers to inspect what was sent.
use crate::types::TransactionId;

/// A STUN request message, as handed to
/// [`TransactionRegistry::submit`](crate::registry::TransactionRegistry::submit).
///
/// The transaction-id slot starts empty and is stamped exactly once, by
/// the engine, before the first transmission. Everything else is
/// immutable once constructed.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    attributes: Vec<u8>,
    transaction_id: Option<TransactionId>,
}
impl Request {
    /// Builds a new request for `method`, with an opaque attribute
    /// payload. The transaction-id slot is unset until the engine stamps
    /// it.
    pub fn new(method: impl Into<String>, attributes: Vec<u8>) -> Self {
        Request {
            method: method.into(),
            attributes,
            transaction_id: None,
        }
    }

    /// The request's STUN method (e.g. "Binding").
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The opaque attribute payload, as the access layer would serialize
    /// it onto the wire.
    pub fn attributes(&self) -> &[u8] {
        &self.attributes
    }

    /// The stamped transaction identifier, if any.
    ///
    /// `None` only until [`stamp_transaction_id`](Request::stamp_transaction_id)
    /// has been called; the engine always does so before the first send.
    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    /// Stamps the identifier the engine will use to demultiplex the
    /// response. Called exactly once, by
    /// [`TransactionRegistry::submit`](crate::registry::TransactionRegistry::submit),
    /// before the first transmission.
    pub(crate) fn stamp_transaction_id(&mut self, id: TransactionId) {
        self.transaction_id = Some(id);
    }
}

/// A decoded inbound message event, as the (out-of-scope) codec would hand
/// back to the registry after extracting the transaction identifier from
/// the STUN header.
#[derive(Debug, Clone)]
pub struct ResponseEvent {
    transaction_id: TransactionId,
    payload: Vec<u8>,
}
impl ResponseEvent {
    /// Builds an event carrying `transaction_id` and an opaque payload.
    pub fn new(transaction_id: TransactionId, payload: Vec<u8>) -> Self {
        ResponseEvent {
            transaction_id,
            payload,
        }
    }

    /// The identifier parsed from the inbound message's header; the
    /// registry's demux key.
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// The opaque response payload delivered to the collector.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamping_sets_the_slot_once() {
        let mut request = Request::new("Binding", Vec::new());
        assert!(request.transaction_id().is_none());
        let id = TransactionId::from_bytes([0; 12]);
        request.stamp_transaction_id(id);
        assert_eq!(request.transaction_id(), Some(id));
    }
}
