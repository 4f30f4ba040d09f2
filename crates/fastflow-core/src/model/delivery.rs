//! Delivery target specification

use serde::{Deserialize, Serialize};

/// Buffering/partitioning sink that batches records and writes them to a
/// destination bucket under a templated key prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTargetSpec {
    /// Destination bucket name.
    pub bucket: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub error_output_prefix: Option<String>,
    #[serde(default)]
    pub buffering: Option<BufferingHints>,
    /// Partition objects by keys extracted from the records. Requires a
    /// non-empty transform pipeline.
    #[serde(default)]
    pub dynamic_partitioning: bool,
    #[serde(default)]
    pub transform: Vec<TransformStage>,
}

/// Buffering hints for the delivery target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferingHints {
    #[serde(default = "default_size_mbs")]
    pub size_mbs: u32,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u32,
}

impl Default for BufferingHints {
    fn default() -> Self {
        Self {
            size_mbs: default_size_mbs(),
            interval_seconds: default_interval_seconds(),
        }
    }
}

fn default_size_mbs() -> u32 {
    5
}

fn default_interval_seconds() -> u32 {
    300
}

/// One stage of the record transform pipeline, e.g. a metadata-extraction
/// query feeding dynamic partitioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformStage {
    pub parameter_name: String,
    pub parameter_value: String,
}
