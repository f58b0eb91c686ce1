use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::SeedError;

/// Identifier field values of one persisted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordId(pub Map<String, Value>);

impl RecordId {
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Insert/draw counters for one `(parent, child)` key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub inserted: u64,
    pub consumed: u64,
}

/// Identifiers made available by producers (parent) for consumers (child).
///
/// Producers may insert the same identifier several times; only distinct
/// identifiers are handed out per draw.
#[derive(Debug, Default)]
pub struct IdentifierPool {
    entries: BTreeMap<String, BTreeMap<String, Vec<RecordId>>>,
    stats: BTreeMap<(String, String), PoolStats>,
}

impl IdentifierPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parent: &str, child: &str, id: &RecordId, copies: u64) {
        let ids = self
            .entries
            .entry(parent.to_string())
            .or_default()
            .entry(child.to_string())
            .or_default();
        for _ in 0..copies {
            ids.push(id.clone());
        }
        self.stats_mut(parent, child).inserted += copies;
    }

    /// Remove and return the first `n` distinct identifiers under the key.
    /// The pool is left untouched when fewer than `n` distinct ones remain.
    pub fn draw(&mut self, parent: &str, child: &str, n: u64) -> Result<Vec<RecordId>, SeedError> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let ids = self
            .entries
            .get_mut(parent)
            .and_then(|children| children.get_mut(child));
        let Some(ids) = ids else {
            return Err(insufficient(parent, child, n, 0));
        };

        let mut picked: Vec<usize> = Vec::new();
        for (position, id) in ids.iter().enumerate() {
            if picked.len() as u64 == n {
                break;
            }
            if picked.iter().all(|&taken| ids[taken] != *id) {
                picked.push(position);
            }
        }

        if (picked.len() as u64) < n {
            let available = distinct_count(ids);
            return Err(insufficient(parent, child, n, available));
        }

        let mut drawn = Vec::with_capacity(picked.len());
        for &position in picked.iter().rev() {
            drawn.push(ids.remove(position));
        }
        drawn.reverse();
        self.stats_mut(parent, child).consumed += n;
        Ok(drawn)
    }

    /// Number of identifiers (copies included) remaining under the key.
    pub fn remaining(&self, parent: &str, child: &str) -> u64 {
        self.entries
            .get(parent)
            .and_then(|children| children.get(child))
            .map_or(0, |ids| ids.len() as u64)
    }

    /// Number of distinct identifiers remaining under the key.
    pub fn distinct(&self, parent: &str, child: &str) -> u64 {
        self.entries
            .get(parent)
            .and_then(|children| children.get(child))
            .map_or(0, |ids| distinct_count(ids))
    }

    pub fn stats(&self) -> impl Iterator<Item = (&str, &str, PoolStats)> {
        self.stats
            .iter()
            .map(|((parent, child), stats)| (parent.as_str(), child.as_str(), *stats))
    }

    fn stats_mut(&mut self, parent: &str, child: &str) -> &mut PoolStats {
        self.stats
            .entry((parent.to_string(), child.to_string()))
            .or_default()
    }
}

fn distinct_count(ids: &[RecordId]) -> u64 {
    let mut seen: Vec<&RecordId> = Vec::new();
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen.len() as u64
}

fn insufficient(parent: &str, child: &str, requested: u64, available: u64) -> SeedError {
    SeedError::InsufficientPool {
        parent: parent.to_string(),
        child: child.to_string(),
        requested,
        available,
    }
}
