//! Project-level specification

use super::flow::FlowSpec;
use serde::{Deserialize, Serialize};

/// A project document: one shared upstream stream and the flows that
/// consume it. Each flow is assembled independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    pub name: String,
    pub stream: StreamSpec,
    #[serde(default)]
    pub flows: Vec<FlowSpec>,
}

/// The shared upstream stream. Owned by the caller; the assembler only
/// reads its identifier from the context.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSpec {
    pub name: String,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub retention_days: Option<u32>,
}
