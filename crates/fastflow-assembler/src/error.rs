//! Assembly error taxonomy
//!
//! Every error aborts the remaining stages; no partial topology is ever
//! returned. Each variant carries the offending logical name so the
//! caller can correct the specification and re-run.

use fastflow_cloud::{ProvisionError, ResourceKind};
use fastflow_core::SpecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("missing required section: {0}")]
    MissingRequiredSection(&'static str),

    #[error("section '{section}' must declare at least one {element}")]
    EmptyRequiredList {
        section: &'static str,
        element: &'static str,
    },

    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: ResourceKind, name: String },

    #[error("unresolved reference to {kind} '{name}'")]
    UnresolvedReference { kind: ResourceKind, name: String },

    /// Unknown trigger tags and flow-kind ordinals are rejected by the
    /// loader, so assembly itself never produces this; callers validating
    /// documents built outside the loader report it.
    #[error("unsupported {field} variant: {tag}")]
    UnsupportedVariant { field: &'static str, tag: String },

    #[error("flow '{flow}': dynamic partitioning enabled without a transform pipeline")]
    DynamicPartitioningMisconfigured { flow: String },

    #[error("specification error: {0}")]
    Spec(#[from] SpecError),

    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),
}

pub type Result<T> = std::result::Result<T, AssembleError>;
