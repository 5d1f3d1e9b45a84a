//! The client-side transaction engine of a STUN stack, as used by an ICE
//! agent for NAT traversal.
//!
//! This crate owns the genuinely subtle part of a STUN client: driving the
//! RFC 3489-style timed retransmission schedule for one outbound request,
//! matching an inbound response to the right in-flight transaction by its
//! 96-bit transaction identifier, and tearing down correctly under
//! concurrent cancellation, response arrival, and timer expiry. The
//! byte-level STUN message codec, ICE candidate gathering, the UDP socket
//! manager, and server-side transactions are all out of scope -- see each
//! module's doc comment for the external interface this crate expects of
//! them.
//!
//! The pieces, leaf-first:
//!
//! - [`types::TransactionId`] -- the 96-bit demux key.
//! - [`timing::TimingPolicy`] / [`config::Configuration`] -- the
//!   retransmission schedule and the process-wide knobs that derive it.
//! - [`transaction::ClientTransaction`] -- the state machine that owns one
//!   request and notifies its collector exactly once.
//! - [`registry::TransactionRegistry`] -- the process-wide map from
//!   identifier to live transaction, and the scheduling worker that drives
//!   every transaction's timers.
#[macro_use]
extern crate trackable;

pub use access::{AccessLayer, AccessPoint, TransportAddress, TransportKind};
pub use collector::ResponseCollector;
pub use config::Configuration;
pub use error::{Error, ErrorKind};
pub use request::{Request, ResponseEvent};
pub use timing::TimingPolicy;
pub use transaction::{ClientTransaction, Status};
pub use types::TransactionId;
pub use registry::TransactionRegistry;

pub mod access;
pub mod collector;
pub mod config;
pub mod constants;
pub mod request;
pub mod timing;
pub mod transaction;
pub mod types;

mod error;
mod registry;

/// This crate's specific `Result` type.
pub type Result<T> = ::std::result::Result<T, Error>;
