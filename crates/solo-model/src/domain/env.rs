use serde::{Deserialize, Serialize};

use crate::KeyValue;

/// Ordered environment handed to a worker's backing process.
///
/// Stored as a list so that later entries override earlier ones on lookup,
/// which is how controller-wide, launcher-level and bootstrap variables are layered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Env(pub Vec<KeyValue>);

impl Env {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over all entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.0.iter()
    }

    /// Get the effective value for a key (the last matching entry).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|kv| kv.key() == key)
            .map(|kv| kv.value())
    }

    /// Append an entry; it overrides earlier entries with the same key.
    pub fn push<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.0.push(KeyValue::new(key, value));
    }

    /// Layer `other` on top of `self`.
    pub fn merged(&self, other: &Env) -> Env {
        let mut out = self.0.clone();
        out.extend(other.0.iter().cloned());
        Env(out)
    }

    /// Effective entries with overrides resolved, in first-seen key order.
    ///
    /// Launchers use this so a process never receives the same variable twice.
    pub fn resolved(&self) -> Vec<KeyValue> {
        let mut out: Vec<KeyValue> = Vec::with_capacity(self.0.len());
        for kv in &self.0 {
            match out.iter_mut().find(|e| e.key() == kv.key()) {
                Some(slot) => *slot = kv.clone(),
                None => out.push(kv.clone()),
            }
        }
        out
    }
}

impl FromIterator<(String, String)> for Env {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().map(KeyValue::from).collect())
    }
}
