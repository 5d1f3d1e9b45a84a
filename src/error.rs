use std::io;
use std::sync::PoisonError;
use trackable::error::{self, ErrorKindExt, TrackableError};

/// This crate specific `Error` type.
#[derive(Debug, Clone)]
pub struct Error(TrackableError<ErrorKind>);
derive_traits_for_trackable_error_newtype!(Error, ErrorKind);

impl From<io::Error> for Error {
    fn from(f: io::Error) -> Self {
        ErrorKind::Transport.cause(f).into()
    }
}
impl From<rand::Error> for Error {
    fn from(f: rand::Error) -> Self {
        ErrorKind::Other.cause(f).into()
    }
}
impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        ErrorKind::Other
            .cause("a transaction's internal lock was poisoned by a panicking holder")
            .into()
    }
}

/// Possible error kinds.
///
/// `Encode` and the first-send flavor of `Transport` abort
/// [`TransactionRegistry::submit`](crate::registry::TransactionRegistry::submit)
/// before the transaction is registered. `AlreadyStarted` guards
/// [`ClientTransaction::start`](crate::transaction::ClientTransaction::start)'s
/// idempotency. Retransmit-time transport errors are logged and never
/// surface as an `Error` value.
#[derive(Debug, Clone)]
pub enum ErrorKind {
    /// The request could not be serialized by the access layer.
    Encode,
    /// A synchronous send to the access layer failed.
    Transport,
    /// `start()` was called a second time on the same transaction.
    AlreadyStarted,
    /// Any other construction-time failure (e.g. entropy exhaustion).
    Other,
}
impl error::ErrorKind for ErrorKind {}
