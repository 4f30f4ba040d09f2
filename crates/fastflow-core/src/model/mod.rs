//! Flow specification model
//!
//! The types in this module mirror the JSON specification document
//! field-for-field. They are deserialized once and never mutated; the
//! assembler works on resolved copies.

mod compute;
mod delivery;
mod flow;
mod project;
mod queue;
mod topic;

pub use compute::{ComputeUnitSpec, EnvEntry, TriggerSpec};
pub use delivery::{BufferingHints, DeliveryTargetSpec, TransformStage};
pub use flow::{DequeuingSpec, ErrorHandlingSpec, FlowKind, FlowSpec, IngestionSpec};
pub use project::{ProjectSpec, StreamSpec};
pub use queue::QueueSpec;
pub use topic::{SubscriptionSpec, TopicSpec};
