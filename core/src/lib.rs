//! Shared data-model types for the Baton BFT consensus engine and its
//! surrounding layers (storage adapters, chain-service implementations).

pub mod crypto;

use crypto::Hash256;
use serde::{Deserialize, Serialize};

/// The block number being decided: `head.number + 1`.
pub type Height = u64;
/// A numbered attempt, within a height, to reach agreement.
pub type Round = u64;
/// A UNIX timestamp measured in (fractional) seconds, as handed out by the
/// chain service's `now`. Fractional so that `timeout_base * timeout_factor
/// ^ round` (e.g. `1.0 * 1.2^round`) keeps its precision across rounds.
pub type Timestamp = f64;

/// The minimal shape of a block the consensus core needs to reason about.
/// Everything else about block contents (transactions, state root, ...) is
/// the chain service's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: Height,
    pub prevhash: Hash256,
}

impl crypto::ToHash256 for BlockHeader {
    fn to_hash256(&self) -> Hash256 {
        Hash256::hash(format!("{}:{}", self.number, self.prevhash))
    }
}
