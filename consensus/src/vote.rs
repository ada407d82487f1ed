use baton_core::crypto::{Address, Hash256, ToHash256};
use baton_core::{Height, Round};
use serde::{Deserialize, Serialize};

/// The content of a single vote: either an endorsement of a specific block,
/// or a nil abstention cast on timeout when the validator holds no lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VoteKind {
    Block(Hash256),
    Nil,
}

/// A signed vote. By the time this reaches the consensus core, `sender` has
/// already been recovered and verified at the wire boundary — the core
/// never re-derives it from a raw signature.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vote {
    pub sender: Address,
    pub height: Height,
    pub round: Round,
    pub kind: VoteKind,
}

impl Vote {
    pub fn block(sender: Address, height: Height, round: Round, blockhash: Hash256) -> Self {
        Vote {
            sender,
            height,
            round,
            kind: VoteKind::Block(blockhash),
        }
    }

    pub fn nil(sender: Address, height: Height, round: Round) -> Self {
        Vote {
            sender,
            height,
            round,
            kind: VoteKind::Nil,
        }
    }

    pub fn blockhash(&self) -> Option<Hash256> {
        match self.kind {
            VoteKind::Block(h) => Some(h),
            VoteKind::Nil => None,
        }
    }

    pub fn is_block_vote_for(&self, blockhash: Hash256) -> bool {
        self.blockhash() == Some(blockhash)
    }
}

impl ToHash256 for Vote {
    fn to_hash256(&self) -> Hash256 {
        let kind = match self.kind {
            VoteKind::Block(h) => format!("block:{h}"),
            VoteKind::Nil => "nil".to_owned(),
        };
        Hash256::hash(format!(
            "{}:{}:{}:{}",
            self.sender, self.height, self.round, kind
        ))
    }
}
