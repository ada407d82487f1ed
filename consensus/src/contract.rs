use crate::proposal::Proposal;
use baton_core::crypto::{Address, Hash256};
use baton_core::{Height, Round};

/// The fixed validator set and the pure rules derived from it: who may
/// propose at a given `(height, round)`, and who is eligible to vote.
///
/// `num_eligible_votes` is a plain validator count (one vote per address),
/// not a weighted voting-power sum — see `original_source`'s `manager.py`,
/// where `num_eligible_votes(height) == len(self.validators)`.
#[derive(Debug, Clone)]
pub struct ConsensusContract {
    validators: Vec<Address>,
}

impl ConsensusContract {
    pub fn new(validators: Vec<Address>) -> Self {
        ConsensusContract { validators }
    }

    /// The deterministic proposer for `(height, round)`: a hash of the pair,
    /// reduced modulo the validator count. Any deterministic pseudo-random
    /// selection every validator agrees on satisfies the contract; this is
    /// one such rule.
    pub fn proposer(&self, height: Height, round: Round) -> Address {
        let digest = Hash256::hash(format!("{height}:{round}"));
        let index = u64::from_be_bytes(digest.as_ref()[0..8].try_into().unwrap()) as usize
            % self.validators.len();
        self.validators[index]
    }

    pub fn is_validator(&self, address: Address) -> bool {
        self.validators.contains(&address)
    }

    pub fn is_proposer(&self, proposal: &Proposal) -> bool {
        proposal.sender() == self.proposer(proposal.height(), proposal.round())
    }

    /// `N` at `height`; `0` at the genesis height.
    pub fn num_eligible_votes(&self, height: Height) -> usize {
        if height == 0 {
            0
        } else {
            self.validators.len()
        }
    }

    pub fn validators(&self) -> &[Address] {
        &self.validators
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::crypto::generate_keypair;

    fn validators(n: usize) -> Vec<Address> {
        (0..n)
            .map(|i| generate_keypair(format!("validator-{i}")).0.address())
            .collect()
    }

    #[test]
    fn proposer_is_deterministic() {
        let contract = ConsensusContract::new(validators(4));
        assert_eq!(contract.proposer(10, 2), contract.proposer(10, 2));
    }

    #[test]
    fn proposer_is_always_a_validator() {
        let contract = ConsensusContract::new(validators(4));
        for h in 0..20 {
            for r in 0..5 {
                assert!(contract.is_validator(contract.proposer(h, r)));
            }
        }
    }

    #[test]
    fn num_eligible_votes_is_zero_at_genesis() {
        let contract = ConsensusContract::new(validators(4));
        assert_eq!(contract.num_eligible_votes(0), 0);
        assert_eq!(contract.num_eligible_votes(1), 4);
    }
}
