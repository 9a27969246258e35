use std::{error::Error, fmt, io};

use log::error;

/// Typed failures surfaced by the storage core.
///
/// `LockTimeout` is the transaction-abort signal: the caller is
/// expected to abort its transaction when it sees one.
#[derive(Debug, Clone, PartialEq)]
pub enum DbError {
    /// No free slot left on the page.
    PageFull,
    /// The tuple does not fit the schema of its destination.
    SchemaMismatch(String),
    /// Delete hit a slot that holds no tuple.
    SlotEmpty,
    /// The tuple is not stored on the page it claims to be on.
    TupleNotFound,
    /// Every cached page is dirty, nothing can be evicted (NO-STEAL).
    NoCleanPage,
    /// Page read outside the backing file, or a corrupt file length.
    InvalidPage(String),
    /// Lock acquisition exhausted its retries.
    LockTimeout(String),
    /// The catalog has no table under this id or name.
    NoSuchTable(String),
    /// `next()` called on a drained iterator.
    NoSuchElement,
    /// Operator misuse caught at construction or state violation.
    IllegalArgument(String),
    Io(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DbError::PageFull => write!(f, "page full"),
            DbError::SchemaMismatch(msg) => {
                write!(f, "schema mismatch: {}", msg)
            }
            DbError::SlotEmpty => write!(f, "slot is already empty"),
            DbError::TupleNotFound => write!(f, "tuple not on page"),
            DbError::NoCleanPage => {
                write!(f, "all pages are dirty, eviction impossible")
            }
            DbError::InvalidPage(msg) => write!(f, "invalid page: {}", msg),
            DbError::LockTimeout(msg) => {
                write!(f, "acquire lock timeout: {}", msg)
            }
            DbError::NoSuchTable(msg) => write!(f, "no such table: {}", msg),
            DbError::NoSuchElement => write!(f, "no such element"),
            DbError::IllegalArgument(msg) => {
                write!(f, "illegal argument: {}", msg)
            }
            DbError::Io(msg) => write!(f, "io error: {}", msg),
        }
    }
}

impl Error for DbError {}

impl From<io::Error> for DbError {
    fn from(e: io::Error) -> Self {
        DbError::Io(e.to_string())
    }
}

impl DbError {
    pub fn show_backtrace(&self) {
        error!("{}\n{:?}", self, backtrace::Backtrace::new());
    }
}
