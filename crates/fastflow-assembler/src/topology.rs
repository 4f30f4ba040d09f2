//! Resolved topology output

use serde::Serialize;

/// Aggregate handed back to the provisioning layer once assembly
/// completes. Immutable; a failed assembly never returns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTopology {
    /// Compute unit identifiers, in creation order.
    pub function_names: Vec<String>,
    pub queue_arns: Vec<String>,
    pub dead_letter_queue_arns: Vec<String>,
    pub topic_arns: Vec<String>,
    pub stream_arns: Vec<String>,
    pub delivery_stream_arn: Option<String>,
}
