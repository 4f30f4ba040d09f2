//! fastflow specification model
//!
//! This crate defines the declarative flow specification consumed by the
//! topology assembler: queues, topics, a delivery target and the compute
//! units wired between them, together with the JSON loader for the
//! specification document.
//!
//! The model is a plain immutable tree. Nothing in here resolves
//! references or talks to a provisioning backend; that is the job of
//! `fastflow-assembler`.

pub mod env_keys;
pub mod error;
pub mod loader;
pub mod model;

pub use error::{Result, SpecError};
pub use loader::{load_flow_str, load_project_file, load_project_str};
pub use model::{
    BufferingHints, ComputeUnitSpec, DeliveryTargetSpec, DequeuingSpec, EnvEntry,
    ErrorHandlingSpec, FlowKind, FlowSpec, IngestionSpec, ProjectSpec, QueueSpec, StreamSpec,
    SubscriptionSpec, TopicSpec, TransformStage, TriggerSpec,
};
