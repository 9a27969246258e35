use crate::{
    error::DbError, storage::schema::Schema, storage::tuple::WrappedTuple,
    types::DbResult,
};

/// The pull-based protocol every operator speaks.
///
/// `has_next` is idempotent: it may advance internal state to find the
/// next tuple, but repeated calls without an interleaved `next` return
/// the same answer. `next` past the end fails with `NoSuchElement`,
/// and `rewind` is equivalent to `close` followed by `open`.
///
/// Operators own their children exclusively, so an iterator tree is a
/// tree, never a DAG.
pub trait OpIterator {
    fn open(&mut self) -> DbResult;

    fn close(&mut self) -> DbResult;

    fn has_next(&mut self) -> Result<bool, DbError>;

    fn next(&mut self) -> Result<WrappedTuple, DbError>;

    fn rewind(&mut self) -> DbResult;

    /// Schema of the tuples this operator emits.
    fn get_schema(&self) -> Schema;
}
