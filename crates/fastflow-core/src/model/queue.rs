//! Queue specification

use serde::{Deserialize, Serialize};

/// A point-to-point queue, optionally paired with a dead-letter queue.
///
/// When `has_dead_letter` is set the assembler materializes two queues:
/// the main queue and a `<name>-dlq` companion that receives messages
/// exceeding the receive-count threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSpec {
    pub name: String,
    #[serde(default, alias = "dlq")]
    pub has_dead_letter: bool,
    /// Message retention for the dead-letter queue, in days.
    #[serde(default)]
    pub retention_days: Option<u32>,
}
