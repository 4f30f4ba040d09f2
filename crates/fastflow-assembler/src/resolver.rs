//! Environment reference resolver
//!
//! A compute unit declares environment entries whose values are only
//! known once upstream resources exist. The assembler builds an
//! [`EnvBindings`] table per stage from the registry and the context, and
//! `resolve_env` produces a patched copy of the declared entries. The
//! declared specification is never mutated.
//!
//! Patching is keyed matching: an entry whose key is bound is rewritten,
//! anything else passes through untouched. An unmatched symbolic key is
//! not an error; unused placeholders are forward-compatible.

use fastflow_core::env_keys;
use fastflow_core::model::EnvEntry;
use std::collections::HashMap;

/// Symbolic key -> resolved value table for one compute unit.
#[derive(Debug, Default)]
pub struct EnvBindings {
    map: HashMap<String, String>,
}

impl EnvBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }
}

/// Patched environment plus the resource touches the unit declared,
/// which feed the policy synthesizer.
#[derive(Debug)]
pub struct ResolvedEnv {
    pub entries: Vec<EnvEntry>,
    /// Unit declared the secret-access placeholder.
    pub touched_secret: bool,
    /// Unit declared the delivery-target-access placeholder.
    pub touched_delivery: bool,
}

/// Produce a patched copy of `declared` with every bound key rewritten.
pub fn resolve_env(declared: &[EnvEntry], bindings: &EnvBindings) -> ResolvedEnv {
    let mut touched_secret = false;
    let mut touched_delivery = false;

    let entries = declared
        .iter()
        .map(|entry| {
            match entry.key.as_str() {
                env_keys::SECRET_ACCESS => touched_secret = true,
                env_keys::DELIVERY_TARGET_ACCESS => touched_delivery = true,
                _ => {}
            }
            match bindings.get(&entry.key) {
                Some(value) => {
                    tracing::debug!(key = %entry.key, "patched environment entry");
                    EnvEntry::new(&entry.key, value)
                }
                None => entry.clone(),
            }
        })
        .collect();

    ResolvedEnv {
        entries,
        touched_secret,
        touched_delivery,
    }
}
