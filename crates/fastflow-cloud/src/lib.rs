//! fastflow provisioning abstraction
//!
//! This crate is the seam between the topology assembler and whatever
//! actually creates cloud resources. The assembler only ever asks a
//! backend to "create this resource, give me its identifier"; everything
//! else (diffing against live state, retries, rollback) belongs to the
//! backend.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           fastflow-assembler             │
//! │   (registry / resolver / synthesizer)    │
//! └───────────────────┬─────────────────────┘
//!                     │ ResourceRequest
//! ┌───────────────────▼─────────────────────┐
//! │             fastflow-cloud               │
//! │        trait Provisioner { ... }         │
//! └───────┬─────────────────────┬───────────┘
//!         │                     │
//! ┌───────▼────────┐   ┌────────▼─────────┐
//! │   Planning     │   │  real backend     │
//! │  Provisioner   │   │  (external)       │
//! └────────────────┘   └──────────────────┘
//! ```

pub mod error;
pub mod policy;
pub mod provider;

pub use error::{ProvisionError, Result};
pub use policy::{Effect, PolicyDocument, PolicyStatement};
pub use provider::{
    CreatedResource, PlanningProvisioner, Provisioner, ResourceIds, ResourceKind, ResourceRequest,
};
