//! fastflow topology assembler
//!
//! Takes a declarative flow specification and produces a fully wired
//! resource graph: queues, topics, a delivery target and compute units,
//! with cross-references between independently declared components
//! resolved and a least-privilege permission document synthesized per
//! compute unit.
//!
//! Assembly is a one-shot, synchronous pipeline:
//!
//! ```text
//! FlowSpec ──> validate ──> queuing tier ──> fan-out tier ──> delivery
//!          ──> ingestion compute ──> dequeuing compute ──> error compute
//!          ──> ResolvedTopology
//! ```
//!
//! Each stage creates resources through a [`fastflow_cloud::Provisioner`]
//! backend, records their identifiers in the [`registry::ResourceRegistry`],
//! and patches later consumers with what is now known. A consumer may only
//! reference resources produced in an earlier or the current stage; there
//! is no backtracking and no rollback.

pub mod assembler;
pub mod context;
pub mod error;
pub mod policy;
pub mod registry;
pub mod resolver;
pub mod topology;

pub use assembler::{assemble, assemble_project, FlowAssembler};
pub use context::AssemblyContext;
pub use error::{AssembleError, Result};
pub use policy::{delivery_role_policy, synthesize_policy, CapabilityGrant};
pub use registry::ResourceRegistry;
pub use topology::ResolvedTopology;
