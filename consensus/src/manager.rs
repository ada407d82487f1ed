use crate::chain::{AlarmClock, AlarmGeneration, Broadcaster, ChainService, OutboundMessage};
use crate::contract::ConsensusContract;
use crate::error::ConsensusError;
use crate::evidence::{Evidence, EvidenceCollector};
use crate::height::{HeightContext, HeightManager};
use crate::lockset::LockSet;
use crate::proposal::{BlockProposal, Proposal};
use crate::sync::Synchronizer;
use crate::vote::Vote;
use baton_core::crypto::{Address, Hash256, ToHash256};
use baton_core::{BlockHeader, Height};
use baton_storage::KeyValueStore;
use std::collections::{BTreeMap, HashMap};

/// Knobs the source leaves as module-level constants or commented-out code.
/// `sync_missing_parents` wires in the synchronizer (left disabled in
/// `original_source`'s `process()`); see the design notes on that open
/// question.
#[derive(Debug, Clone)]
pub struct ConsensusParams {
    pub sync_missing_parents: bool,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        ConsensusParams {
            sync_missing_parents: true,
        }
    }
}

fn proposal_key(blockhash: Hash256) -> String {
    format!("blockproposal:{blockhash}")
}

/// The top-level consensus state machine: owns every height manager, the
/// in-memory set of block candidates awaiting commitment, the evidence log
/// and the synchronizer. Drives rounds forward, admits peer messages, and
/// commits blocks through the chain service.
pub struct ConsensusManager<C, KV> {
    chain: C,
    store: KV,
    contract: ConsensusContract,
    params: ConsensusParams,
    heights: BTreeMap<Height, HeightManager>,
    block_candidates: HashMap<Hash256, BlockProposal>,
    evidence: EvidenceCollector,
    synchronizer: Synchronizer,
}

impl<C, KV> ConsensusManager<C, KV>
where
    C: ChainService + Broadcaster + AlarmClock,
    KV: KeyValueStore,
{
    /// Builds a fresh manager atop the chain service's current head. At
    /// genesis (`head.number == 0`) this signs and ingests this node's own
    /// `VoteBlock(0, 0, head.hash)`, then ingests the signing lock-set of the
    /// head's stored proposal if one is persisted — mirroring
    /// `ConsensusManager.__init__` in the source, which performs this
    /// unconditionally at construction rather than on first `process()`.
    pub fn new(chain: C, store: KV, contract: ConsensusContract, params: ConsensusParams) -> Self {
        let mut manager = ConsensusManager {
            chain,
            store,
            contract,
            params,
            heights: BTreeMap::new(),
            block_candidates: HashMap::new(),
            evidence: EvidenceCollector::new(),
            synchronizer: Synchronizer::new(),
        };

        let head = manager.chain.head();
        if head.number == 0 {
            if let Some(coinbase) = manager.chain.coinbase() {
                let genesis_vote = Vote::block(coinbase, 0, 0, head.to_hash256());
                manager.add_vote(genesis_vote);
            }
        }

        if let Some(head_proposal) = manager.load_proposal(head.to_hash256()) {
            let votes: Vec<Vote> = head_proposal.signing_lockset.votes().cloned().collect();
            for v in votes {
                manager.add_vote(v);
            }
        }

        manager
    }

    pub fn height(&self) -> Height {
        self.chain.head().number + 1
    }

    pub fn coinbase(&self) -> Option<Address> {
        self.chain.coinbase()
    }

    pub fn contract(&self) -> &ConsensusContract {
        &self.contract
    }

    pub fn evidence(&self) -> &EvidenceCollector {
        &self.evidence
    }

    pub fn block_candidates(&self) -> impl Iterator<Item = &BlockProposal> {
        self.block_candidates.values()
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    fn ensure_height(&mut self, height: Height) -> &mut HeightManager {
        let n = self.contract.num_eligible_votes(height);
        self.heights
            .entry(height)
            .or_insert_with(|| HeightManager::new(height, n))
    }

    /// The quorum lock-set certifying the current head, used as a fresh
    /// `BlockProposal`'s `signing_lockset`. Falls back to an empty lock-set
    /// (at genesis, where `num_eligible_votes(0) == 0` makes an empty
    /// lock-set trivially valid and trivially a quorum of its own votes).
    fn last_committing_lockset(&self) -> LockSet {
        let height = self.height();
        let prev = height.saturating_sub(1);
        self.heights
            .get(&prev)
            .and_then(HeightManager::last_quorum_lockset)
            .cloned()
            .unwrap_or_else(|| LockSet::new(prev, 0, self.contract.num_eligible_votes(prev)))
    }

    fn store_proposal(&mut self, p: &BlockProposal) -> Result<(), baton_storage::Error> {
        let bytes = serde_json::to_vec(p).expect("BlockProposal always serializes");
        self.store.put(&proposal_key(p.blockhash()), bytes)
    }

    fn load_proposal(&self, blockhash: Hash256) -> Option<BlockProposal> {
        self.store
            .get(&proposal_key(blockhash))
            .ok()
            .flatten()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
    }

    fn has_stored_proposal(&self, blockhash: Hash256) -> bool {
        matches!(self.store.get(&proposal_key(blockhash)), Ok(Some(_)))
    }

    /// The proposal for `blockhash`, whether still an in-memory candidate or
    /// already persisted past commitment.
    pub fn get_blockproposal(&self, blockhash: Hash256) -> Option<BlockProposal> {
        self.block_candidates
            .get(&blockhash)
            .cloned()
            .or_else(|| self.load_proposal(blockhash))
    }

    /// Records `vote`, routing it to the height/round it belongs to. Forces a
    /// replace only when the vote is self-authored (recovery after a
    /// restart re-observing our own earlier vote), per the source's
    /// `is_own_vote` exception. Double-voting is converted to evidence and
    /// logged rather than propagated — see the engine's error-handling design.
    pub fn add_vote(&mut self, vote: Vote) -> bool {
        if !self.contract.is_validator(vote.sender) {
            self.evidence.record(Evidence::InvalidVote { vote });
            return false;
        }
        let is_own_vote = self.coinbase() == Some(vote.sender);
        let height = vote.height;
        let round = vote.round;
        let mut fresh_evidence = Vec::new();
        let hm = self.ensure_height(height);
        let result = hm.add_vote(vote.clone(), is_own_vote, &mut fresh_evidence);
        for e in fresh_evidence {
            self.evidence.record(e);
        }
        match result {
            Ok(added) => added,
            Err(ConsensusError::DoubleVoting(sender, h, r)) => {
                let conflicting = self
                    .heights
                    .get(&h)
                    .and_then(|hm| hm.round_lockset(r))
                    .cloned()
                    .unwrap_or_else(|| LockSet::new(h, r, self.contract.num_eligible_votes(h)));
                log::warn!("double voting by {sender} at height {h} round {r}");
                self.evidence.record(Evidence::DoubleVoting {
                    vote,
                    conflicting_lockset: conflicting,
                });
                false
            }
            Err(_) => false,
        }
    }

    fn reject_proposal(&mut self, proposal: &Proposal, reason: &'static str) -> ConsensusError {
        log::warn!(
            "invalid proposal at height {} round {}: {}",
            proposal.height(),
            proposal.round(),
            reason
        );
        self.evidence.record(Evidence::InvalidProposal {
            proposal: proposal.clone(),
        });
        ConsensusError::InvalidProposal(proposal.height(), proposal.round(), reason)
    }

    /// Admits `proposal`, applying the seven validation rules from the
    /// engine's consensus-manager design in order. Returns whether the
    /// proposal is new (and should be rebroadcast); any rule failure records
    /// evidence and returns `InvalidProposal`. A proposal whose height is
    /// already behind the current height is dropped silently (no evidence) —
    /// it is stale, not Byzantine.
    pub fn add_proposal(&mut self, proposal: Proposal) -> Result<bool, ConsensusError> {
        let height = proposal.height();
        let round = proposal.round();

        if height < self.height() {
            log::debug!("dropping proposal from the past at height {height}");
            return Ok(false);
        }

        if !(self.contract.is_validator(proposal.sender()) && self.contract.is_proposer(&proposal))
        {
            return Err(self.reject_proposal(&proposal, "sender is not the designated proposer"));
        }

        // The round-justifying lock-set (round_lockset for a BlockProposal,
        // the carried lockset for a VotingInstruction) only exists for
        // round > 0; round 0 has nothing prior to justify against.
        match proposal.round_justifying_lockset() {
            Some(lockset) => {
                if !lockset.is_valid() {
                    return Err(self.reject_proposal(&proposal, "round-justifying lockset is not valid"));
                }
                if lockset.height() != height {
                    return Err(self.reject_proposal(
                        &proposal,
                        "round-justifying lockset height does not match proposal height",
                    ));
                }
                if round.checked_sub(lockset.round()) != Some(1) {
                    return Err(self.reject_proposal(
                        &proposal,
                        "round-justifying lockset round does not precede proposal round",
                    ));
                }
            }
            None if round != 0 => {
                return Err(self.reject_proposal(&proposal, "missing round-justifying lockset"));
            }
            None => {}
        }

        let justifying_votes: Vec<Vote> = proposal
            .round_justifying_lockset()
            .map(|ls| ls.votes().cloned().collect())
            .unwrap_or_default();
        for v in justifying_votes {
            self.add_vote(v);
        }

        match proposal {
            Proposal::Block(mut bp) => {
                if bp.block.number != height {
                    return Err(self.reject_proposal(
                        &Proposal::Block(bp),
                        "block number does not match height",
                    ));
                }
                let noquorum_ok =
                    round == 0 || bp.round_lockset.as_ref().is_some_and(LockSet::has_noquorum);
                if !noquorum_ok {
                    return Err(self.reject_proposal(
                        &Proposal::Block(bp),
                        "round-justifying lockset does not show no-quorum",
                    ));
                }
                if height > self.height() {
                    log::debug!("proposal from the future at height {height}, dropping pending sync");
                    return Ok(false);
                }
                let linked = match self.chain.link_block(bp.block.clone()) {
                    Ok(linked) => linked,
                    Err(_) => {
                        return Err(self.reject_proposal(
                            &Proposal::Block(bp),
                            "chain service could not link block to its parent",
                        ))
                    }
                };
                bp.block = linked;
                self.add_block_proposal(bp.clone());
                Ok(self.ensure_height(height).add_proposal(Proposal::Block(bp)))
            }
            Proposal::Instruction(vi) => {
                if !vi.lockset.has_quorum_possible() {
                    return Err(self.reject_proposal(
                        &Proposal::Instruction(vi),
                        "lockset does not show quorum-possible",
                    ));
                }
                Ok(self
                    .ensure_height(height)
                    .add_proposal(Proposal::Instruction(vi)))
            }
        }
    }

    /// Ingests a linked `BlockProposal`'s signing lock-set and records it as a
    /// block candidate, unless it is already known (in memory or persisted).
    fn add_block_proposal(&mut self, proposal: BlockProposal) {
        let blockhash = proposal.blockhash();
        if self.block_candidates.contains_key(&blockhash) || self.has_stored_proposal(blockhash) {
            return;
        }
        debug_assert!(proposal.signing_lockset.has_quorum());
        debug_assert_eq!(
            proposal.signing_lockset.height(),
            proposal.height.saturating_sub(1)
        );
        let signing_votes: Vec<Vote> = proposal.signing_lockset.votes().cloned().collect();
        for v in signing_votes {
            self.add_vote(v);
        }
        self.block_candidates.insert(blockhash, proposal);
    }

    /// Commits every block candidate whose parent is the current head and
    /// whose height has reached quorum on it, recursing so a just-advanced
    /// head can unlock a further candidate in the same tick.
    fn commit(&mut self) {
        let head_hash = self.chain.head().to_hash256();
        let ready: Vec<BlockProposal> = self
            .block_candidates
            .values()
            .filter(|p| p.block.prevhash == head_hash)
            .cloned()
            .collect();

        for p in ready {
            let blockhash = p.blockhash();
            let quorum_hash = self
                .heights
                .get(&p.height)
                .and_then(HeightManager::has_quorum_blockhash);
            if quorum_hash == Some(blockhash) {
                self.store_proposal(&p)
                    .expect("storage backend failure persisting a committed proposal");
                self.chain
                    .commit_block(p.block.clone())
                    .expect("chain service failed to commit a quorum-certified block");
                log::debug!("committed block {blockhash} at height {}", p.height);
                self.commit();
                return;
            }
        }
    }

    /// Drops block candidates and height managers the chain has already
    /// passed.
    fn cleanup(&mut self) {
        let head_number = self.chain.head().number;
        self.block_candidates.retain(|_, p| p.height > head_number);
        self.heights.retain(|&h, _| h >= head_number);
    }

    /// Requests missing parent blocks referenced by candidates or the active
    /// round's voting instruction, at most once per hash until resolved.
    fn run_synchronizer(&mut self) {
        let mut missing: Vec<Hash256> = self
            .block_candidates
            .values()
            .map(|p| p.block.prevhash)
            .filter(|hash| self.get_blockproposal(*hash).is_none())
            .collect();

        if let Some(Proposal::Instruction(vi)) = self
            .heights
            .get(&self.height())
            .and_then(HeightManager::active_proposal)
        {
            if let Some(bh) = vi.blockhash() {
                if self.get_blockproposal(bh).is_none() {
                    missing.push(bh);
                }
            }
        }

        for hash in missing {
            if self.synchronizer.note_missing(hash) {
                self.chain.broadcast(OutboundMessage::BlockRequest(hash));
            }
        }

        let resolved: Vec<Hash256> = self
            .synchronizer
            .outstanding()
            .copied()
            .filter(|h| self.get_blockproposal(*h).is_some())
            .collect();
        for h in resolved {
            self.synchronizer.note_resolved(h);
        }
    }

    /// Drives the engine one tick: attempts a commit, drives the current
    /// height's propose/vote step, attempts another commit, cleans up
    /// retired state, optionally syncs missing parents, arms the next
    /// alarm, then logs every accumulated non-`FailedToPropose` evidence
    /// record — including ones logged on a prior tick, matching the
    /// source's unconditional log sweep.
    pub fn process(&mut self) {
        self.commit();

        let height = self.height();
        let contract = self.contract.clone();
        let now = self.chain.now();
        let coinbase = self.chain.coinbase();
        let head = self.chain.head();
        let head_candidate = self.chain.head_candidate();
        let head_signing_lockset = self.last_committing_lockset();
        let ctx = HeightContext {
            contract: &contract,
            now,
            coinbase,
            head: &head,
            head_candidate: &head_candidate,
            head_signing_lockset: &head_signing_lockset,
        };
        let out = self.ensure_height(height).process(&ctx);

        for proposal in out.broadcast_proposals {
            if let Proposal::Block(bp) = &proposal {
                self.add_block_proposal(bp.clone());
            }
            self.chain.broadcast(OutboundMessage::Proposal(proposal));
        }
        for vote in out.broadcast_votes {
            self.chain.broadcast(OutboundMessage::Vote(vote));
        }
        for evidence in out.evidence {
            self.evidence.record(evidence);
        }

        self.commit();
        self.cleanup();
        if self.params.sync_missing_parents {
            self.run_synchronizer();
        }

        if let Some((generation, fire_at)) = out.arm_alarm {
            let delay = (fire_at - self.chain.now()).max(0.0);
            self.chain.setup_alarm(delay, generation);
            log::debug!(
                "armed alarm for height {} round {} in {delay:.3}s",
                generation.height,
                generation.round
            );
        }

        for e in self.evidence.iter() {
            if !e.is_failed_to_propose() {
                log::warn!("protocol failure: {e:?}");
            }
        }
    }

    /// Alias for `process`, matching the source's `start = process`.
    pub fn start(&mut self) {
        self.process();
    }

    /// Runs `process` only if `generation` still names the active round —
    /// a stale alarm (from a round the height has since advanced past)
    /// is discarded instead.
    pub fn on_alarm(&mut self, generation: AlarmGeneration) {
        let height = self.height();
        let current_round = self.heights.get(&height).map(HeightManager::round);
        if generation.height == height && Some(generation.round) == current_round {
            self.process();
        } else {
            log::debug!(
                "discarding stale alarm for height {} round {}",
                generation.height,
                generation.round
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::crypto::generate_keypair;
    use baton_core::Timestamp;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone)]
    struct FakeChainState {
        now: Timestamp,
        head: BlockHeader,
        coinbase: Option<Address>,
        blocks_by_number: HashMap<Height, Hash256>,
        outbox: Vec<OutboundMessage>,
        alarms: Vec<(Timestamp, AlarmGeneration)>,
    }

    /// An in-memory stand-in for the external chain service: blocks are
    /// "linked" by trusting the caller's `prevhash`/`number` and "committed"
    /// by simply replacing `head`.
    #[derive(Clone)]
    struct FakeChain(Rc<RefCell<FakeChainState>>);

    impl FakeChain {
        fn new(coinbase: Option<Address>) -> Self {
            let genesis = BlockHeader {
                number: 0,
                prevhash: Hash256::zero(),
            };
            let mut blocks_by_number = HashMap::new();
            blocks_by_number.insert(0, genesis.to_hash256());
            FakeChain(Rc::new(RefCell::new(FakeChainState {
                now: 0.0,
                head: genesis,
                coinbase,
                blocks_by_number,
                outbox: Vec::new(),
                alarms: Vec::new(),
            })))
        }

        fn advance_time_to(&self, t: Timestamp) {
            self.0.borrow_mut().now = t;
        }

        fn outbox(&self) -> Vec<OutboundMessage> {
            self.0.borrow().outbox.clone()
        }

        fn drain_outbox(&self) -> Vec<OutboundMessage> {
            std::mem::take(&mut self.0.borrow_mut().outbox)
        }

        fn pending_alarm(&self) -> Option<(Timestamp, AlarmGeneration)> {
            self.0.borrow().alarms.last().copied()
        }
    }

    impl ChainService for FakeChain {
        fn now(&self) -> Timestamp {
            self.0.borrow().now
        }

        fn head(&self) -> BlockHeader {
            self.0.borrow().head.clone()
        }

        fn coinbase(&self) -> Option<Address> {
            self.0.borrow().coinbase
        }

        fn head_candidate(&self) -> BlockHeader {
            let head = self.head();
            BlockHeader {
                number: head.number + 1,
                prevhash: head.to_hash256(),
            }
        }

        fn link_block(&mut self, block: BlockHeader) -> Result<BlockHeader, crate::chain::ChainError> {
            Ok(block)
        }

        fn commit_block(&mut self, block: BlockHeader) -> Result<(), crate::chain::ChainError> {
            let mut state = self.0.borrow_mut();
            state
                .blocks_by_number
                .insert(block.number, block.to_hash256());
            state.head = block;
            Ok(())
        }

        fn block_by_number(&self, height: Height) -> Option<Hash256> {
            self.0.borrow().blocks_by_number.get(&height).copied()
        }
    }

    impl Broadcaster for FakeChain {
        fn broadcast(&mut self, message: OutboundMessage) {
            self.0.borrow_mut().outbox.push(message);
        }
    }

    impl AlarmClock for FakeChain {
        fn setup_alarm(&mut self, delay: Timestamp, generation: AlarmGeneration) {
            let fire_at = self.now() + delay;
            self.0.borrow_mut().alarms.push((fire_at, generation));
        }
    }

    fn validator_keys(n: usize) -> Vec<(Address, FakeChain)> {
        (0..n)
            .map(|i| {
                let address = generate_keypair(format!("validator-{i}")).0.address();
                (address, FakeChain::new(Some(address)))
            })
            .collect()
    }

    /// A small test harness wiring one `ConsensusManager` per validator over
    /// a shared validator list, so scenarios can drive every node's
    /// `process()` and manually relay broadcasts between them — there is no
    /// real network in these tests, only direct message delivery.
    struct Network {
        contract: ConsensusContract,
        nodes: Vec<ConsensusManager<FakeChain, baton_storage::MemoryStore>>,
        chains: Vec<FakeChain>,
    }

    impl Network {
        fn new(n: usize) -> Self {
            let keyed = validator_keys(n);
            let validators: Vec<Address> = keyed.iter().map(|(a, _)| *a).collect();
            let contract = ConsensusContract::new(validators);
            let mut nodes = Vec::new();
            let mut chains = Vec::new();
            for (_, chain) in &keyed {
                nodes.push(ConsensusManager::new(
                    chain.clone(),
                    baton_storage::MemoryStore::new(),
                    contract.clone(),
                    ConsensusParams::default(),
                ));
                chains.push(chain.clone());
            }
            Network {
                contract,
                nodes,
                chains,
            }
        }

        fn advance_time_to(&self, t: Timestamp) {
            for c in &self.chains {
                c.advance_time_to(t);
            }
        }

        /// Ticks every node once, then relays every broadcast message to
        /// every other node (simulating an eventually-delivered gossip
        /// network within a single synchronous step).
        fn tick(&mut self) {
            self.tick_excluding(&[]);
        }

        /// Like `tick`, but the nodes in `offline` are neither processed nor
        /// have their messages relayed — simulating them being down for the
        /// round.
        fn tick_excluding(&mut self, offline: &[usize]) {
            let mut outbound = Vec::new();
            for (i, node) in self.nodes.iter_mut().enumerate() {
                if offline.contains(&i) {
                    continue;
                }
                node.process();
                outbound.push((i, self.chains[i].drain_outbox()));
            }
            for (sender, messages) in outbound {
                for message in messages {
                    for (i, node) in self.nodes.iter_mut().enumerate() {
                        if i == sender || offline.contains(&i) {
                            continue;
                        }
                        match message.clone() {
                            OutboundMessage::Vote(v) => {
                                node.add_vote(v);
                            }
                            OutboundMessage::Proposal(p) => {
                                let _ = node.add_proposal(p);
                            }
                            OutboundMessage::BlockRequest(_) => {}
                        }
                    }
                }
            }
        }

        fn heads(&self) -> Vec<Height> {
            self.chains.iter().map(|c| c.head().number).collect()
        }
    }

    #[test]
    fn happy_path_round_zero_commits() {
        let mut net = Network::new(4);
        for _ in 0..5 {
            net.tick();
            if net.heads().iter().all(|&h| h == 1) {
                break;
            }
        }
        assert!(net.heads().iter().all(|&h| h == 1), "{:?}", net.heads());
    }

    #[test]
    fn timeout_advances_round_then_commits() {
        let mut net = Network::new(4);
        // Find the round-0 proposer and keep its outbox from ever being
        // delivered, simulating an offline proposer.
        let proposer = net.contract.proposer(1, 0);
        let offline = net
            .chains
            .iter()
            .position(|c| c.coinbase() == Some(proposer))
            .unwrap();

        // The offline proposer may also be drawn for a later round (the
        // proposer rule is a pure function of height/round, not guaranteed
        // distinct across rounds), so keep advancing to whichever alarm is
        // next due until the height commits or the attempt budget runs out.
        for _ in 0..10 {
            net.tick_excluding(&[offline]);
            if net.heads().iter().filter(|&&h| h == 1).count() >= 3 {
                break;
            }
            let next_alarm = net
                .chains
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != offline)
                .filter_map(|(_, c)| c.pending_alarm())
                .map(|(fire_at, _)| fire_at)
                .fold(f64::INFINITY, f64::min);
            if next_alarm.is_finite() {
                net.advance_time_to(next_alarm + 0.01);
            }
        }
        assert!(
            net.heads().iter().filter(|&&h| h == 1).count() >= 3,
            "{:?}",
            net.heads()
        );
    }

    #[test]
    fn double_vote_is_recorded_as_evidence_not_propagated() {
        let mut net = Network::new(4);
        let sender = net.contract.validators()[0];
        let x = Hash256::hash("x");
        let y = Hash256::hash("y");
        let node = &mut net.nodes[1];
        assert!(node.add_vote(Vote::block(sender, 5, 2, x)));
        assert!(!node.add_vote(Vote::block(sender, 5, 2, y)));
        assert_eq!(
            node.evidence()
                .iter()
                .filter(|e| matches!(e, Evidence::DoubleVoting { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn stale_future_proposal_is_dropped_silently() {
        let mut net = Network::new(4);
        let node = &mut net.nodes[0];
        let signing = LockSet::new(2, 0, 0);
        let sender = net.contract.proposer(3, 0);
        let proposal = Proposal::Block(BlockProposal {
            sender,
            height: 3,
            round: 0,
            block: BlockHeader {
                number: 3,
                prevhash: Hash256::zero(),
            },
            signing_lockset: signing,
            round_lockset: None,
        });
        let evidence_before = node.evidence().len();
        let result = node.add_proposal(proposal);
        assert_eq!(result, Ok(false));
        assert_eq!(node.evidence().len(), evidence_before);
    }

    #[test]
    fn genesis_self_vote_is_seeded_at_construction() {
        let net = Network::new(4);
        let node = &net.nodes[0];
        assert_eq!(node.height(), 1);
        let ls = node.last_committing_lockset();
        assert!(ls.has_quorum());
    }
}
