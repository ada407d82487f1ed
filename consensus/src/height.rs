use crate::chain::AlarmGeneration;
use crate::contract::ConsensusContract;
use crate::error::ConsensusError;
use crate::evidence::Evidence;
use crate::lockset::LockSet;
use crate::proposal::{BlockProposal, Proposal};
use crate::round::{RoundContext, RoundManager};
use crate::vote::Vote;
use baton_core::crypto::{Address, Hash256};
use baton_core::{BlockHeader, Height, Round, Timestamp};
use std::collections::BTreeMap;

/// The aggregate result of driving a height forward by one external event.
/// A single call may settle several rounds in a row (each timing out with
/// `has_noquorum` before the next starts), so these are vectors rather than
/// single optional values.
#[derive(Debug, Default)]
pub struct HeightOutput {
    pub broadcast_proposals: Vec<Proposal>,
    pub broadcast_votes: Vec<Vote>,
    pub evidence: Vec<Evidence>,
    /// The alarm the *currently* active round wants armed, if any — rounds
    /// that were settled and advanced past during this call do not get one,
    /// since only the active round can still time out.
    pub arm_alarm: Option<(AlarmGeneration, Timestamp)>,
}

/// Everything a height needs from its owner to process itself.
pub struct HeightContext<'a> {
    pub contract: &'a ConsensusContract,
    pub now: Timestamp,
    pub coinbase: Option<Address>,
    pub head: &'a BlockHeader,
    pub head_candidate: &'a BlockHeader,
    pub head_signing_lockset: &'a LockSet,
}

/// One height's worth of rounds, lazily created on first reference — never
/// eagerly indexed into, so a round number never silently springs a
/// default-constructed manager into existence via `[]`/`entry` outside this
/// one helper.
#[derive(Debug, Clone)]
pub struct HeightManager {
    height: Height,
    num_eligible_votes: usize,
    rounds: BTreeMap<Round, RoundManager>,
}

impl HeightManager {
    pub fn new(height: Height, num_eligible_votes: usize) -> Self {
        HeightManager {
            height,
            num_eligible_votes,
            rounds: BTreeMap::new(),
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    fn ensure_round(&mut self, round: Round) -> &mut RoundManager {
        let height = self.height;
        let n = self.num_eligible_votes;
        self.rounds
            .entry(round)
            .or_insert_with(|| RoundManager::new(height, round, n))
    }

    /// The round currently being attempted: the highest round created so
    /// far, or 0 before any round exists.
    pub fn round(&self) -> Round {
        self.rounds.keys().next_back().copied().unwrap_or(0)
    }

    /// The block lock held by the most recent round that cast one. A nil
    /// vote locks nothing — there is no block to repeat — so only `Block`
    /// votes count here; once a validator does lock on a block it must keep
    /// repeating that same vote in every later round until a
    /// `VotingInstruction` or quorum releases it.
    pub fn last_lock(&self) -> Option<&Vote> {
        self.rounds
            .values()
            .rev()
            .find_map(|r| r.lock().filter(|v| v.blockhash().is_some()))
    }

    /// The most recent round's lock-set that has reached the minimum size to
    /// be evaluated at all (`is_valid`), regardless of which predicate holds.
    pub fn last_valid_lockset(&self) -> Option<&LockSet> {
        self.rounds
            .values()
            .rev()
            .map(RoundManager::lockset)
            .find(|ls| ls.is_valid())
    }

    /// The most recent round's lock-set that actually reached quorum, if any.
    pub fn last_quorum_lockset(&self) -> Option<&LockSet> {
        self.rounds
            .values()
            .rev()
            .map(RoundManager::lockset)
            .find(|ls| ls.has_quorum())
    }

    /// The committed blockhash for this height, if a round has reached
    /// quorum. `Option<Hash256>` rather than a bare boolean so a caller never
    /// has to re-derive the hash from the lock-set after learning it exists.
    pub fn has_quorum_blockhash(&self) -> Option<Hash256> {
        self.last_quorum_lockset().and_then(LockSet::quorum_blockhash)
    }

    /// The block this node itself most recently voted for, if its current
    /// lock names one (as opposed to nil).
    pub fn last_voted_blockproposal(&self) -> Option<&BlockProposal> {
        let locked_hash = self.last_lock().and_then(Vote::blockhash)?;
        self.rounds.values().rev().find_map(|r| match r.proposal() {
            Some(Proposal::Block(bp)) if bp.blockhash() == locked_hash => Some(bp),
            _ => None,
        })
    }

    /// The lock-set of `round`, if that round has been created. Non-mutating
    /// — unlike `add_vote`/`add_proposal`, this never springs a round into
    /// existence, since it exists only to read back state after a failed
    /// insertion (e.g. the conflicting lock-set for double-voting evidence).
    pub fn round_lockset(&self, round: Round) -> Option<&LockSet> {
        self.rounds.get(&round).map(RoundManager::lockset)
    }

    /// The proposal (if any) seen so far in the currently active round.
    pub fn active_proposal(&self) -> Option<&Proposal> {
        self.rounds.get(&self.round()).and_then(RoundManager::proposal)
    }

    pub fn add_vote(
        &mut self,
        vote: Vote,
        force_replace: bool,
        evidence: &mut Vec<Evidence>,
    ) -> Result<bool, ConsensusError> {
        let round = vote.round;
        self.ensure_round(round).add_vote(vote, force_replace, evidence)
    }

    pub fn add_proposal(&mut self, proposal: Proposal) -> bool {
        let round = proposal.round();
        self.ensure_round(round).add_proposal(proposal)
    }

    /// Drives the active round forward, cascading into as many subsequent
    /// rounds as have already timed out with no chance of quorum (this
    /// happens when a height is caught up on a backlog of events all at
    /// once rather than driven tick by tick).
    pub fn process(&mut self, ctx: &HeightContext) -> HeightOutput {
        let mut out = HeightOutput::default();

        loop {
            let round = self.round();
            let previous_lockset = round
                .checked_sub(1)
                .and_then(|r| self.rounds.get(&r))
                .map(|r| r.lockset().copy());
            let last_lock = self.last_lock().cloned();

            let round_mgr = self.ensure_round(round);
            let round_ctx = RoundContext {
                contract: ctx.contract,
                now: ctx.now,
                coinbase: ctx.coinbase,
                head: ctx.head,
                head_candidate: ctx.head_candidate,
                head_signing_lockset: ctx.head_signing_lockset,
                last_lock: last_lock.as_ref(),
                previous_round_lockset: previous_lockset.as_ref(),
            };
            let round_out = round_mgr.process(&round_ctx);

            out.broadcast_proposals.extend(round_out.broadcast_proposal);
            out.broadcast_votes.extend(round_out.broadcast_vote);
            out.evidence.extend(round_out.evidence);

            // Per the height's `round` derivation (the round after the
            // highest-round *valid* lock-set, not merely a no-quorum one):
            // quorum and quorum-possible lock-sets conclude a round exactly
            // as much as a no-quorum one does. Gating this on no-quorum
            // alone left a quorum-possible round never advancing, so the
            // round+1 proposer never got a chance to see it and issue a
            // `VotingInstruction`.
            if round_mgr.lockset().is_valid() {
                self.ensure_round(round + 1);
                continue;
            }

            out.arm_alarm = round_out
                .arm_alarm_after
                .map(|delay| (round_mgr.alarm_generation(), ctx.now + delay));
            break;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::crypto::{generate_keypair, ToHash256};

    fn validators(n: usize) -> Vec<Address> {
        (0..n)
            .map(|i| generate_keypair(format!("v{i}")).0.address())
            .collect()
    }

    fn genesis() -> BlockHeader {
        BlockHeader {
            number: 0,
            prevhash: Hash256::zero(),
        }
    }

    #[test]
    fn quorum_of_votes_yields_blockhash() {
        let vs = validators(4);
        let mut hm = HeightManager::new(1, 4);
        let bh = Hash256::hash("blk");
        let mut evidence = Vec::new();
        for v in &vs[0..3] {
            hm.add_vote(Vote::block(*v, 1, 0, bh), false, &mut evidence)
                .unwrap();
        }
        assert_eq!(hm.has_quorum_blockhash(), Some(bh));
        assert!(evidence.is_empty());
    }

    #[test]
    fn all_nil_round_advances_and_arms_next_round_alarm() {
        let vs = validators(4);
        let contract = ConsensusContract::new(vs.clone());
        let head = genesis();
        let cand = BlockHeader {
            number: 1,
            prevhash: head.to_hash256(),
        };
        let signing = LockSet::new(0, 0, 0);
        let mut hm = HeightManager::new(1, 4);
        let mut evidence = Vec::new();
        for v in &vs {
            hm.add_vote(Vote::nil(*v, 1, 0), false, &mut evidence).unwrap();
        }
        assert!(hm.last_valid_lockset().unwrap().has_noquorum());

        let non_proposer = vs
            .iter()
            .copied()
            .find(|v| *v != contract.proposer(1, 0))
            .unwrap();
        let ctx = HeightContext {
            contract: &contract,
            now: 0.0,
            coinbase: Some(non_proposer),
            head: &head,
            head_candidate: &cand,
            head_signing_lockset: &signing,
        };
        // Round 0's lock-set is already `is_valid()` (has_noquorum) before
        // this node's own vote is even cast, since every validator's nil
        // vote was recorded directly — the cascade advances to round 1 on
        // this very first `process()` call and arms round 1's own timeout.
        let out = hm.process(&ctx);
        assert_eq!(hm.round(), 1);
        assert!(out.arm_alarm.is_some());
    }
}
