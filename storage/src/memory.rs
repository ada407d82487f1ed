use super::{Error, KeyValueStore};
use std::collections::HashMap;

/// An in-memory store, used by the engine's own tests and suitable as a
/// drop-in backend for single-process deployments.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    db: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), Error> {
        self.db.insert(key.to_owned(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<(), Error> {
        self.db.remove(key);
        Ok(())
    }
}
