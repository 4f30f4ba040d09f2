//! Resource registry
//!
//! In-memory table of logical name -> resolved identifiers for every
//! resource touched during one assembly. Keys are the compound
//! (kind, logical name), so a queue and its dead-letter companion live
//! under the same name with different kinds instead of a colon-joined
//! string.

use crate::error::{AssembleError, Result};
use fastflow_cloud::{ResourceIds, ResourceKind};
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: BTreeMap<(ResourceKind, String), ResourceIds>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved identifier. Logical names are unique per kind,
    /// not globally.
    pub fn put(&mut self, name: &str, kind: ResourceKind, ids: ResourceIds) -> Result<()> {
        let key = (kind, name.to_string());
        if self.entries.contains_key(&key) {
            return Err(AssembleError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
        self.entries.insert(key, ids);
        Ok(())
    }

    /// Look up a resolved identifier. Callers must only query after the
    /// producing stage has run; anything else is an unresolved reference.
    pub fn get(&self, name: &str, kind: ResourceKind) -> Result<&ResourceIds> {
        self.entries.get(&(kind, name.to_string())).ok_or_else(|| {
            AssembleError::UnresolvedReference {
                kind,
                name: name.to_string(),
            }
        })
    }

    pub fn contains(&self, name: &str, kind: ResourceKind) -> bool {
        self.entries.contains_key(&(kind, name.to_string()))
    }

    /// All entries of one kind, sorted by logical name. Sorted output is
    /// what keeps the dead-letter fan-in of the error-handling unit
    /// deterministic.
    pub fn list_by_kind(&self, kind: ResourceKind) -> Vec<(&str, &ResourceIds)> {
        self.entries
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, name), ids)| (name.as_str(), ids))
            .collect()
    }

    pub fn list_all(&self) -> impl Iterator<Item = (ResourceKind, &str, &ResourceIds)> {
        self.entries
            .iter()
            .map(|((kind, name), ids)| (*kind, name.as_str(), ids))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
