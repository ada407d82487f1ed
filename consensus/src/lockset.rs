use crate::error::ConsensusError;
use crate::vote::{Vote, VoteKind};
use baton_core::crypto::{Address, Hash256};
use baton_core::{Height, Round};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The smallest number of votes that makes a set of `num_eligible_votes`
/// votes a supermajority: `ceil(2N/3)`.
fn quorum_threshold(num_eligible_votes: usize) -> usize {
    (2 * num_eligible_votes + 2) / 3
}

/// The votes observed at one `(height, round)`, plus the derived quorum
/// predicates. At most one vote is kept per sender.
///
/// Equality is by `(height, round, votes)` — since `votes` is keyed by
/// sender, this is exactly equality of the underlying multiset of votes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSet {
    height: Height,
    round: Round,
    num_eligible_votes: usize,
    votes: BTreeMap<Address, Vote>,
}

impl LockSet {
    pub fn new(height: Height, round: Round, num_eligible_votes: usize) -> Self {
        LockSet {
            height,
            round,
            num_eligible_votes,
            votes: BTreeMap::new(),
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    /// Inserts `vote`, unless it conflicts with an already-recorded vote
    /// from the same sender. `force_replace` allows a validator to resync
    /// its own prior vote (used only for self-authored votes).
    pub fn add(&mut self, vote: Vote, force_replace: bool) -> Result<bool, ConsensusError> {
        if vote.height != self.height || vote.round != self.round {
            return Err(ConsensusError::InvalidVote(vote));
        }
        match self.votes.get(&vote.sender) {
            Some(existing) if *existing == vote => Ok(false),
            Some(existing) if !force_replace => Err(ConsensusError::DoubleVoting(
                vote.sender,
                vote.height,
                vote.round,
            )),
            _ => {
                self.votes.insert(vote.sender, vote);
                Ok(true)
            }
        }
    }

    fn votes_for(&self, blockhash: Hash256) -> usize {
        self.votes
            .values()
            .filter(|v| v.blockhash() == Some(blockhash))
            .count()
    }

    /// Whether `blockhash` already has more than a third of the eligible
    /// votes — the threshold the source uses to decide whether a block can
    /// still be rescued by a voting instruction, rather than the reachable-
    /// swing-capacity count this crate previously (incorrectly) used.
    fn exceeds_one_third(&self, blockhash: Hash256) -> bool {
        self.votes_for(blockhash) * 3 > self.num_eligible_votes
    }

    pub fn is_valid(&self) -> bool {
        self.votes.len() >= quorum_threshold(self.num_eligible_votes)
    }

    /// The blockhash with a quorum of votes, if one exists.
    pub fn quorum_blockhash(&self) -> Option<Hash256> {
        if !self.is_valid() {
            return None;
        }
        let threshold = quorum_threshold(self.num_eligible_votes);
        self.candidates()
            .into_iter()
            .find(|&c| self.votes_for(c) >= threshold)
    }

    pub fn has_quorum(&self) -> bool {
        self.quorum_blockhash().is_some()
    }

    fn candidates(&self) -> Vec<Hash256> {
        let mut seen = self
            .votes
            .values()
            .filter_map(|v| v.blockhash())
            .collect::<Vec<_>>();
        seen.sort();
        seen.dedup();
        seen
    }

    pub fn has_noquorum(&self) -> bool {
        if !self.is_valid() || self.has_quorum() {
            return false;
        }
        self.candidates()
            .into_iter()
            .all(|c| !self.exceeds_one_third(c))
    }

    pub fn has_quorum_possible(&self) -> bool {
        if !self.is_valid() || self.has_quorum() {
            return false;
        }
        self.candidates()
            .into_iter()
            .any(|c| self.exceeds_one_third(c))
    }

    /// The blockhash a `VotingInstruction` built from this lock-set should
    /// re-lock validators onto: the candidate already past a third of the
    /// eligible votes with the most existing votes, ties broken by hash
    /// order so every validator computes the same answer from the same
    /// observed lock-set.
    pub fn quorum_possible_blockhash(&self) -> Option<Hash256> {
        if !self.has_quorum_possible() {
            return None;
        }
        self.candidates()
            .into_iter()
            .filter(|&c| self.exceeds_one_third(c))
            .max_by_key(|&c| (self.votes_for(c), std::cmp::Reverse(c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::crypto::generate_keypair;

    fn addr(seed: &str) -> Address {
        generate_keypair(seed).0.address()
    }

    #[test]
    fn exactly_one_predicate_holds_on_quorum() {
        let mut ls = LockSet::new(1, 0, 4);
        let bh = Hash256::hash("blk1");
        for who in ["a", "b", "c"] {
            ls.add(Vote::block(addr(who), 1, 0, bh), false).unwrap();
        }
        assert!(ls.is_valid());
        assert!(ls.has_quorum());
        assert!(!ls.has_noquorum());
        assert!(!ls.has_quorum_possible());
        assert_eq!(ls.quorum_blockhash(), Some(bh));
    }

    #[test]
    fn all_nil_is_noquorum() {
        let mut ls = LockSet::new(1, 0, 4);
        for who in ["a", "b", "c"] {
            ls.add(Vote::nil(addr(who), 1, 0), false).unwrap();
        }
        assert!(ls.is_valid());
        assert!(ls.has_noquorum());
        assert!(!ls.has_quorum());
        assert!(!ls.has_quorum_possible());
    }

    #[test]
    fn scattered_votes_are_quorum_possible() {
        // A,B -> blk1; C -> blk2; D -> nil. N=4, quorum=3.
        let mut ls = LockSet::new(1, 0, 4);
        let blk1 = Hash256::hash("blk1");
        let blk2 = Hash256::hash("blk2");
        ls.add(Vote::block(addr("a"), 1, 0, blk1), false).unwrap();
        ls.add(Vote::block(addr("b"), 1, 0, blk1), false).unwrap();
        ls.add(Vote::block(addr("c"), 1, 0, blk2), false).unwrap();
        ls.add(Vote::nil(addr("d"), 1, 0), false).unwrap();
        assert!(ls.is_valid());
        assert!(!ls.has_quorum());
        assert!(!ls.has_noquorum());
        assert!(ls.has_quorum_possible());
        assert_eq!(ls.quorum_possible_blockhash(), Some(blk1));
    }

    #[test]
    fn double_voting_is_rejected() {
        let mut ls = LockSet::new(5, 2, 4);
        let a = addr("a");
        let x = Hash256::hash("x");
        let y = Hash256::hash("y");
        ls.add(Vote::block(a, 5, 2, x), false).unwrap();
        let err = ls.add(Vote::block(a, 5, 2, y), false).unwrap_err();
        assert_eq!(err, ConsensusError::DoubleVoting(a, 5, 2));
    }

    #[test]
    fn repeated_identical_vote_is_idempotent() {
        let mut ls = LockSet::new(5, 2, 4);
        let a = addr("a");
        let x = Hash256::hash("x");
        assert!(ls.add(Vote::block(a, 5, 2, x), false).unwrap());
        assert!(!ls.add(Vote::block(a, 5, 2, x), false).unwrap());
    }

    #[test]
    fn force_replace_allows_resync() {
        let mut ls = LockSet::new(5, 2, 4);
        let a = addr("a");
        let x = Hash256::hash("x");
        let y = Hash256::hash("y");
        ls.add(Vote::block(a, 5, 2, x), false).unwrap();
        ls.add(Vote::block(a, 5, 2, y), true).unwrap();
        assert_eq!(ls.votes_for(y), 1);
        assert_eq!(ls.votes_for(x), 0);
    }

    #[test]
    fn wrong_height_round_is_invalid_vote() {
        let mut ls = LockSet::new(5, 2, 4);
        let err = ls
            .add(Vote::nil(addr("a"), 5, 3), false)
            .unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidVote(_)));
    }
}
