use crate::vote::Vote;
use thiserror::Error;

/// Protocol-violation errors, per the engine's error-handling design: all of
/// these are recoverable (the caller turns them into evidence and drops the
/// offending message); only a chain-service failure is a fatal assertion.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// `sender` already voted differently at this `(height, round)`.
    #[error("double voting by {0} at height {1} round {2}")]
    DoubleVoting(baton_core::crypto::Address, u64, u64),
    /// The vote does not belong to this lock-set, or the sender is not eligible.
    #[error("invalid vote: {0:?}")]
    InvalidVote(Vote),
    /// One of the seven admission rules for a proposal failed.
    #[error("invalid proposal at height {0} round {1}: {2}")]
    InvalidProposal(u64, u64, &'static str),
    /// A proposal or voting instruction references an unknown parent block.
    #[error("missing parent block {0}")]
    MissingParent(baton_core::crypto::Hash256),
}
