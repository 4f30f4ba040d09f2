//! Top-level flow specification

use super::compute::ComputeUnitSpec;
use super::delivery::DeliveryTargetSpec;
use super::queue::QueueSpec;
use super::topic::TopicSpec;
use serde::{Deserialize, Serialize};

/// One declarative data flow: queuing tier, fan-out tier, delivery target
/// and the compute units wired between them.
///
/// The optional sections are validated by the assembler, not by serde, so a
/// missing mandatory section surfaces as `MissingRequiredSection` with the
/// section name instead of an opaque parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSpec {
    pub name: String,
    /// Ordinal flow-kind tag, `flowType` in the document.
    #[serde(rename = "flowType")]
    pub kind: FlowKind,
    #[serde(default)]
    pub delivery: Option<DeliveryTargetSpec>,
    #[serde(default)]
    pub ingestion: Option<IngestionSpec>,
    #[serde(default)]
    pub dequeuing: Option<Vec<DequeuingSpec>>,
    #[serde(default, rename = "onError")]
    pub error_handling: Option<ErrorHandlingSpec>,
}

/// How records enter the flow and how the delivery target is fed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FlowKind {
    /// Producers put records straight into the delivery target.
    DirectPut,
    /// The delivery target reads from the shared upstream stream.
    StreamSourced,
    /// Records arrive via the queuing tier only.
    QueueSourced,
    /// Queuing tier plus a delivery target fed by the dequeuing units.
    QueueSourcedWithDelivery,
}

impl TryFrom<u8> for FlowKind {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::DirectPut),
            1 => Ok(Self::StreamSourced),
            2 => Ok(Self::QueueSourced),
            3 => Ok(Self::QueueSourcedWithDelivery),
            other => Err(format!("unknown flowType ordinal: {other}")),
        }
    }
}

impl From<FlowKind> for u8 {
    fn from(kind: FlowKind) -> u8 {
        match kind {
            FlowKind::DirectPut => 0,
            FlowKind::StreamSourced => 1,
            FlowKind::QueueSourced => 2,
            FlowKind::QueueSourcedWithDelivery => 3,
        }
    }
}

/// Queuing tier: the queues and topics records fan out through, plus the
/// compute unit that drains the upstream stream into them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSpec {
    #[serde(default)]
    pub queues: Vec<QueueSpec>,
    #[serde(default)]
    pub topics: Vec<TopicSpec>,
    pub compute: ComputeUnitSpec,
}

/// One dequeuing compute unit draining a queue toward the delivery target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DequeuingSpec {
    pub compute: ComputeUnitSpec,
}

/// The error-handling compute unit, wired to every dead-letter queue of
/// the flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHandlingSpec {
    pub compute: ComputeUnitSpec,
}
