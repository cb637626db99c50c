//! Error types for the tidepool core.
use thiserror::Error;

/// A mempool snapshot referenced a transaction it does not contain.
///
/// A snapshot that fails validation must not be built from; the caller
/// should fetch a fresh one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("{missing} missing from mempool, listed in depends of {owner}")] MissingDepends { owner: String, missing: String },
    #[error("{missing} missing from mempool, listed in spentby of {owner}")] MissingSpentBy { owner: String, missing: String },
}

/// Verdict detail when an assembled block fails the independent recheck.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("block weight {got} exceeds limit {limit}")] ExcessWeight { got: u64, limit: u64 },
    #[error("block sigops {got} exceeds limit {limit}")] ExcessSigops { got: u64, limit: u64 },
    #[error("{missing} required by {owner} but not included before it")] MissingDependency { owner: String, missing: String },
}

/// Failure talking to or decoding from the node behind a
/// [`NodeClient`](crate::traits::NodeClient).
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("transport: {0}")] Transport(String),
    #[error("rpc error: {0}")] Rpc(String),
    #[error("decode: {0}")] Decode(String),
}

#[derive(Error, Debug)]
pub enum TidepoolError {
    #[error(transparent)] Consistency(#[from] ConsistencyError),
    #[error(transparent)] Check(#[from] CheckError),
    #[error(transparent)] Node(#[from] NodeError),
}
