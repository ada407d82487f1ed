//! The core BFT consensus engine: lock-set algebra, round/height managers,
//! proposer election, the top-level consensus state machine, protocol-
//! failure evidence and the block synchronizer.
//!
//! This crate treats chain storage, cryptographic signing/verification and
//! wire serialization as external, typed boundaries — see [`chain`] for the
//! traits the engine consumes rather than implements.

pub mod chain;
pub mod contract;
pub mod error;
pub mod evidence;
pub mod height;
pub mod lockset;
pub mod manager;
pub mod proposal;
pub mod round;
pub mod sync;
pub mod vote;

pub use chain::{AlarmClock, AlarmGeneration, Broadcaster, ChainError, ChainService, OutboundMessage};
pub use contract::ConsensusContract;
pub use error::ConsensusError;
pub use evidence::{Evidence, EvidenceCollector};
pub use height::HeightManager;
pub use lockset::LockSet;
pub use manager::{ConsensusManager, ConsensusParams};
pub use proposal::{BlockProposal, Proposal, VotingInstruction};
pub use round::RoundManager;
pub use sync::Synchronizer;
pub use vote::{Vote, VoteKind};
