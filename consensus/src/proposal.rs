use crate::lockset::LockSet;
use baton_core::crypto::{Address, Hash256, ToHash256};
use baton_core::{BlockHeader, Height, Round};
use serde::{Deserialize, Serialize};

/// A proposal for a specific block, carrying the lock-set that certifies
/// its parent and, for `round > 0`, the prior round's no-quorum lock-set
/// that justifies proposing again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProposal {
    pub sender: Address,
    pub height: Height,
    pub round: Round,
    pub block: BlockHeader,
    /// Quorum lock-set on the parent block, at `height - 1`.
    pub signing_lockset: LockSet,
    /// The `has_noquorum` lock-set of `round - 1`, present iff `round > 0`.
    pub round_lockset: Option<LockSet>,
}

impl BlockProposal {
    pub fn blockhash(&self) -> Hash256 {
        self.block.to_hash256()
    }
}

/// Directs validators to re-lock on the block a previous round's lock-set
/// came closest to committing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingInstruction {
    pub sender: Address,
    pub height: Height,
    pub round: Round,
    /// The `has_quorum_possible` lock-set of `round - 1`.
    pub lockset: LockSet,
}

impl VotingInstruction {
    pub fn blockhash(&self) -> Option<Hash256> {
        self.lockset.quorum_possible_blockhash()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proposal {
    Block(BlockProposal),
    Instruction(VotingInstruction),
}

impl Proposal {
    pub fn sender(&self) -> Address {
        match self {
            Proposal::Block(p) => p.sender,
            Proposal::Instruction(p) => p.sender,
        }
    }

    pub fn height(&self) -> Height {
        match self {
            Proposal::Block(p) => p.height,
            Proposal::Instruction(p) => p.height,
        }
    }

    pub fn round(&self) -> Round {
        match self {
            Proposal::Block(p) => p.round,
            Proposal::Instruction(p) => p.round,
        }
    }

    /// The lock-set that must be one round behind this proposal and justify
    /// advancing to it — `round_lockset` for a `BlockProposal` (absent at
    /// round 0), `lockset` for a `VotingInstruction`.
    pub fn round_justifying_lockset(&self) -> Option<&LockSet> {
        match self {
            Proposal::Block(p) => p.round_lockset.as_ref(),
            Proposal::Instruction(p) => Some(&p.lockset),
        }
    }

    pub fn blockhash(&self) -> Option<Hash256> {
        match self {
            Proposal::Block(p) => Some(p.blockhash()),
            Proposal::Instruction(p) => p.blockhash(),
        }
    }
}

impl ToHash256 for BlockProposal {
    fn to_hash256(&self) -> Hash256 {
        Hash256::hash(format!("blockproposal:{}:{}:{}", self.height, self.round, self.blockhash()))
    }
}
