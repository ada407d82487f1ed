use crate::chain::AlarmGeneration;
use crate::contract::ConsensusContract;
use crate::error::ConsensusError;
use crate::evidence::Evidence;
use crate::lockset::LockSet;
use crate::proposal::{BlockProposal, Proposal, VotingInstruction};
use crate::vote::{Vote, VoteKind};
use baton_core::crypto::Address;
use baton_core::{BlockHeader, Height, Round, Timestamp};

/// Base round timeout, in seconds, before it is stretched by `TIMEOUT_FACTOR`.
const TIMEOUT_BASE: Timestamp = 1.0;
/// Each further round waits `TIMEOUT_FACTOR` times longer than the last, so a
/// slow network eventually outruns the timeout instead of looping forever.
const TIMEOUT_FACTOR: Timestamp = 1.2;

/// Borrowed context a round needs from its owning height/manager to process
/// itself, passed in by the caller rather than held as a back-reference —
/// see the design notes on avoiding cyclic ownership.
pub struct RoundContext<'a> {
    pub contract: &'a ConsensusContract,
    pub now: Timestamp,
    pub coinbase: Option<Address>,
    pub head: &'a BlockHeader,
    pub head_candidate: &'a BlockHeader,
    /// The quorum lock-set on `head`, needed to build a `BlockProposal`'s
    /// `signing_lockset`.
    pub head_signing_lockset: &'a LockSet,
    /// This round's own lock, if one was already set by an earlier call.
    pub last_lock: Option<&'a Vote>,
    /// The previous round's lock-set, if this is not round 0.
    pub previous_round_lockset: Option<&'a LockSet>,
}

/// The outcome of driving a round one step: any message to broadcast, any
/// evidence recorded, and whether the round wants an alarm armed.
#[derive(Debug, Default)]
pub struct RoundOutput {
    pub broadcast_proposal: Option<Proposal>,
    pub broadcast_vote: Option<Vote>,
    pub evidence: Vec<Evidence>,
    pub arm_alarm_after: Option<Timestamp>,
}

/// One numbered attempt, within a height, to reach agreement. Owns its own
/// lock-set and, once it has a proposal, the candidate itself.
#[derive(Debug, Clone)]
pub struct RoundManager {
    height: Height,
    round: Round,
    lockset: LockSet,
    proposal: Option<Proposal>,
    /// This validator's own lock for this round, once cast.
    lock: Option<Vote>,
    timeout_at: Option<Timestamp>,
    alarm_armed: bool,
}

impl RoundManager {
    pub fn new(height: Height, round: Round, num_eligible_votes: usize) -> Self {
        RoundManager {
            height,
            round,
            lockset: LockSet::new(height, round, num_eligible_votes),
            proposal: None,
            lock: None,
            timeout_at: None,
            alarm_armed: false,
        }
    }

    pub fn height(&self) -> Height {
        self.height
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn lockset(&self) -> &LockSet {
        &self.lockset
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        self.proposal.as_ref()
    }

    pub fn lock(&self) -> Option<&Vote> {
        self.lock.as_ref()
    }

    fn timeout_delay(&self) -> Timestamp {
        TIMEOUT_BASE * TIMEOUT_FACTOR.powi(self.round as i32)
    }

    /// Records `vote` in this round's lock-set. `InvalidVote` (wrong
    /// height/round) is swallowed into evidence here rather than propagated,
    /// since it reflects a malformed or misrouted message, not something the
    /// caller can act on beyond logging it. `DoubleVoting` propagates, since
    /// the height manager needs the conflicting lock-set to attach to the
    /// evidence it records.
    ///
    /// If this insertion is what makes the lock-set valid, and the round
    /// still has no proposal, and the now-valid lock-set is `has_noquorum`,
    /// the designated proposer failed to deliver within the round — every
    /// node that observes this (not just the proposer) records
    /// `FailedToPropose` evidence carrying the round's own lock-set.
    pub fn add_vote(
        &mut self,
        vote: Vote,
        force_replace: bool,
        evidence: &mut Vec<Evidence>,
    ) -> Result<bool, ConsensusError> {
        let was_valid = self.lockset.is_valid();
        match self.lockset.add(vote.clone(), force_replace) {
            Ok(added) => {
                if added
                    && !was_valid
                    && self.lockset.is_valid()
                    && self.proposal.is_none()
                    && self.lockset.has_noquorum()
                {
                    evidence.push(Evidence::FailedToPropose {
                        round_lockset: self.lockset.copy(),
                    });
                }
                Ok(added)
            }
            Err(ConsensusError::InvalidVote(v)) => {
                evidence.push(Evidence::InvalidVote { vote: v });
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Records `proposal` as this round's candidate. The first proposal seen
    /// wins; a later, differing proposal for the same round is dropped
    /// silently rather than treated as a crash-worthy invariant violation —
    /// a deliberate relaxation of the source's bare `assert p == self.proposal`.
    pub fn add_proposal(&mut self, proposal: Proposal) -> bool {
        match &self.proposal {
            None => {
                self.proposal = Some(proposal);
                true
            }
            Some(existing) => existing == &proposal,
        }
    }

    /// Arms the round's timeout alarm, once, the first time it is processed
    /// without already holding a proposal.
    fn setup_alarm(&mut self, ctx: &RoundContext) -> Option<Timestamp> {
        if self.alarm_armed {
            return None;
        }
        self.alarm_armed = true;
        self.timeout_at = Some(ctx.now + self.timeout_delay());
        Some(self.timeout_delay())
    }

    pub fn alarm_generation(&self) -> AlarmGeneration {
        AlarmGeneration {
            height: self.height,
            round: self.round,
        }
    }

    pub fn timed_out(&self, now: Timestamp) -> bool {
        matches!(self.timeout_at, Some(t) if now >= t)
    }

    /// Drives this round forward: proposes if this node is the proposer and
    /// has not yet done so, then votes if it has not yet voted and either a
    /// proposal has arrived or the round has timed out. A round never does
    /// both in the same `process` call from scratch — proposing does not by
    /// itself satisfy the vote step, since the proposal still has to be
    /// re-observed through `add_proposal`.
    pub fn process(&mut self, ctx: &RoundContext) -> RoundOutput {
        debug_assert!(
            self.proposal.is_none() || self.lock.is_some() || !self.lockset.has_quorum(),
            "a round with a quorum lockset but no local lock is a bookkeeping bug"
        );
        let mut out = RoundOutput::default();

        if self.proposal.is_none() {
            if let Some(proposal) = self.propose(ctx) {
                self.proposal = Some(proposal.clone());
                out.broadcast_proposal = Some(proposal);
            }
        }

        if let Some(arm_delay) = self.setup_alarm(ctx) {
            out.arm_alarm_after = Some(arm_delay);
        }

        if self.lock.is_none() {
            if let Some(vote) = self.vote(ctx) {
                // Self-observe the cast vote into this round's own lock-set,
                // the same way a peer's broadcast vote would be recorded —
                // otherwise `has_noquorum`/`has_quorum` could never see it,
                // a round with only this node voting nil would never look
                // settled, and this node would never raise its own
                // `FailedToPropose` evidence via `add_vote` below.
                let _ = self.add_vote(vote.clone(), true, &mut out.evidence);
                self.lock = Some(vote.clone());
                out.broadcast_vote = Some(vote);
            }
        }

        out
    }

    /// Builds this node's proposal, if it is the proposer and the round's
    /// justification conditions are met. Round 0 (or a `has_noquorum` prior
    /// round) proposes a new block; a `has_quorum_possible` prior round
    /// issues a voting instruction instead; anything else means this
    /// proposer has nothing valid to say yet.
    fn propose(&self, ctx: &RoundContext) -> Option<Proposal> {
        let is_proposer = ctx.coinbase == Some(ctx.contract.proposer(self.height, self.round));
        if !is_proposer {
            return None;
        }

        if self.round == 0 || ctx.previous_round_lockset.is_some_and(|ls| ls.has_noquorum()) {
            return Some(Proposal::Block(BlockProposal {
                sender: ctx.coinbase?,
                height: self.height,
                round: self.round,
                block: ctx.head_candidate.clone(),
                signing_lockset: ctx.head_signing_lockset.copy(),
                round_lockset: ctx.previous_round_lockset.map(LockSet::copy),
            }));
        }

        if let Some(prev) = ctx.previous_round_lockset {
            if prev.has_quorum_possible() {
                return Some(Proposal::Instruction(VotingInstruction {
                    sender: ctx.coinbase?,
                    height: self.height,
                    round: self.round,
                    lockset: prev.copy(),
                }));
            }
        }

        None
    }

    /// Casts this node's vote for the round, if one is due. A `VotingInstruction`
    /// is followed verbatim; a fresh `BlockProposal` is voted for directly
    /// unless a lock from an earlier round is already held, in which case the
    /// lock is repeated instead of abandoned. On timeout, an existing lock is
    /// likewise repeated; otherwise the node votes nil.
    fn vote(&self, ctx: &RoundContext) -> Option<Vote> {
        if let Some(lock) = ctx.last_lock {
            if let Some(Proposal::Instruction(instruction)) = &self.proposal {
                return Some(match instruction.blockhash() {
                    Some(bh) => Vote::block(ctx.coinbase?, self.height, self.round, bh),
                    None => Vote::nil(ctx.coinbase?, self.height, self.round),
                });
            }
            if self.proposal.is_some() || self.timed_out(ctx.now) {
                return Some(Vote {
                    sender: ctx.coinbase?,
                    height: self.height,
                    round: self.round,
                    kind: lock.kind,
                });
            }
            return None;
        }

        match &self.proposal {
            Some(Proposal::Instruction(instruction)) => Some(match instruction.blockhash() {
                Some(bh) => Vote::block(ctx.coinbase?, self.height, self.round, bh),
                None => Vote::nil(ctx.coinbase?, self.height, self.round),
            }),
            Some(Proposal::Block(block_proposal)) => Some(Vote::block(
                ctx.coinbase?,
                self.height,
                self.round,
                block_proposal.blockhash(),
            )),
            None if self.timed_out(ctx.now) => {
                Some(Vote::nil(ctx.coinbase?, self.height, self.round))
            }
            None => None,
        }
    }
}
