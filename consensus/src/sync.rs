use baton_core::crypto::Hash256;
use std::collections::HashSet;

/// Tracks which parent blocks this node has asked its peers for, so a
/// `MissingParent` observed while processing several proposals in a row
/// triggers exactly one `BlockRequest` broadcast instead of one per
/// proposal referencing the same hash.
#[derive(Debug, Default, Clone)]
pub struct Synchronizer {
    outstanding: HashSet<Hash256>,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers that `hash` is missing. Returns `true` the first time this
    /// hash is seen (the caller should broadcast a `BlockRequest`), `false`
    /// if a request is already outstanding for it.
    pub fn note_missing(&mut self, hash: Hash256) -> bool {
        self.outstanding.insert(hash)
    }

    /// Clears `hash` once the chain service has linked it in, so a later
    /// re-orphaning of the same hash requests it again instead of assuming
    /// the earlier request is still in flight.
    pub fn note_resolved(&mut self, hash: Hash256) {
        self.outstanding.remove(&hash);
    }

    pub fn is_outstanding(&self, hash: Hash256) -> bool {
        self.outstanding.contains(&hash)
    }

    pub fn outstanding(&self) -> impl Iterator<Item = &Hash256> {
        self.outstanding.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baton_core::crypto::Hash256;

    #[test]
    fn first_miss_requests_later_misses_do_not() {
        let mut sync = Synchronizer::new();
        let h = Hash256::hash("missing-parent");
        assert!(sync.note_missing(h));
        assert!(!sync.note_missing(h));
        assert!(sync.is_outstanding(h));
    }

    #[test]
    fn resolving_allows_a_fresh_request() {
        let mut sync = Synchronizer::new();
        let h = Hash256::hash("missing-parent");
        sync.note_missing(h);
        sync.note_resolved(h);
        assert!(!sync.is_outstanding(h));
        assert!(sync.note_missing(h));
    }
}
