//! Compute unit and trigger specification

use serde::{Deserialize, Serialize};

/// A triggerable unit of executable logic: entry path, declared
/// environment and zero or more triggers.
///
/// Environment entries may carry symbolic placeholder keys (see
/// [`crate::env_keys`]); the assembler rewrites those with resolved
/// identifiers in its own copy, the spec itself is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeUnitSpec {
    pub name: String,
    /// Runtime entry path of the unit's code.
    pub entry: String,
    #[serde(default)]
    pub env: Vec<EnvEntry>,
    #[serde(default)]
    pub vpc_access: bool,
    #[serde(default)]
    pub timeout_seconds: Option<u32>,
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
}

/// One declared environment entry. `value` stays empty for placeholder
/// keys that are only known after assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvEntry {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl EnvEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Trigger variants. Exactly one variant per trigger; an unknown `type`
/// tag is rejected at parse time, so the assembler only ever sees the
/// closed set below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TriggerSpec {
    /// Shard-iterating trigger on the shared upstream stream.
    Stream {
        #[serde(default = "default_stream_batch_size")]
        batch_size: u32,
        #[serde(default = "default_window_seconds")]
        window_seconds: u32,
    },
    /// Polling trigger on a queue declared in the same flow.
    Queue {
        queue: String,
        #[serde(default = "default_queue_batch_size")]
        batch_size: u32,
        #[serde(default = "default_window_seconds")]
        window_seconds: u32,
    },
    /// Cron-expression schedule.
    Schedule { cron: String },
}

impl TriggerSpec {
    /// Logical queue name for queue triggers.
    pub fn queue_name(&self) -> Option<&str> {
        match self {
            Self::Queue { queue, .. } => Some(queue),
            _ => None,
        }
    }
}

fn default_stream_batch_size() -> u32 {
    100
}

fn default_queue_batch_size() -> u32 {
    50
}

fn default_window_seconds() -> u32 {
    60
}
