use crate::proposal::Proposal;
use crate::vote::Vote;
use baton_core::crypto::Hash256;
use baton_core::{BlockHeader, Height, Timestamp};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("block does not link to a known parent")]
    UnknownParent,
    #[error("block is structurally invalid: {0}")]
    Invalid(String),
    #[error("chain service failed to commit the block")]
    CommitFailed,
}

/// Everything the engine needs from the external chain service: head
/// tracking, parent linking and structural validation, and block
/// commitment. See the engine's external-interfaces section.
pub trait ChainService {
    /// Monotonic seconds.
    fn now(&self) -> Timestamp;
    /// The current chain head.
    fn head(&self) -> BlockHeader;
    /// This node's own validator address, if it is a validator.
    fn coinbase(&self) -> Option<baton_core::crypto::Address>;
    /// The block body this node would like to propose next.
    fn head_candidate(&self) -> BlockHeader;
    /// Resolves `block`'s parent and checks structural validity, returning
    /// the chain-linked block (which may differ in representation from the
    /// input, e.g. with cached derived fields filled in).
    fn link_block(&mut self, block: BlockHeader) -> Result<BlockHeader, ChainError>;
    /// Commits `block` as the new head. Must leave `head() == block` on success.
    fn commit_block(&mut self, block: BlockHeader) -> Result<(), ChainError>;
    /// The blockhash committed at `height`, if the chain has advanced that far.
    fn block_by_number(&self, height: Height) -> Option<Hash256>;
}

/// A one-shot timer the chain service arms on the engine's behalf.
pub trait AlarmClock {
    /// Schedules a wake-up `delay` seconds from now, tagged with
    /// `generation` so a stale firing (from a round that has since
    /// advanced) can be recognized and discarded.
    fn setup_alarm(&mut self, delay: Timestamp, generation: AlarmGeneration);
}

/// Identifies one armed round-timeout alarm. Two alarms compare equal iff
/// they were armed for the same `(height, round)` — since rounds only ever
/// move forward within a height, a later alarm for the same round can never
/// be armed after an earlier one fires, so this is sufficient to detect a
/// stale callback without needing object identity or a global counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AlarmGeneration {
    pub height: Height,
    pub round: baton_core::Round,
}

/// A message the engine wants delivered to every peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    Vote(Vote),
    Proposal(Proposal),
    BlockRequest(Hash256),
}

/// Fire-and-forget peer broadcast.
pub trait Broadcaster {
    fn broadcast(&mut self, message: OutboundMessage);
}
