//! Identifier-based deduplication.

use std::collections::HashSet;

use crate::types::PostRecord;

/// Identifiers already recorded in this harvest session.
#[derive(Debug, Default, Clone)]
pub struct SeenSet {
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Mark an identifier as recorded. Returns `false` if it was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Keep the first record for each identifier, preserving order.
///
/// Records with an empty identifier are dropped.
pub fn dedup_by_identifier(records: Vec<PostRecord>) -> Vec<PostRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| !r.id.is_empty() && seen.insert(r.id.clone()))
        .collect()
}
