//! JSON specification loader
//!
//! Loads the flow specification document described in the model module.
//! Parsing is strict about variant tags (an unknown trigger `type` or
//! `flowType` ordinal fails here); structural invariants such as missing
//! sections are left to the assembler's validation pass so they surface
//! with their spec-level error kind.

use crate::error::{Result, SpecError};
use crate::model::{FlowSpec, ProjectSpec};
use std::fs;
use std::path::Path;

/// Load a project document from a file.
pub fn load_project_file<P: AsRef<Path>>(path: P) -> Result<ProjectSpec> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| SpecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_project_str(&content)
}

/// Parse a project document from a JSON string.
pub fn load_project_str(content: &str) -> Result<ProjectSpec> {
    let project: ProjectSpec = serde_json::from_str(content)?;
    tracing::debug!(
        project = %project.name,
        flows = project.flows.len(),
        "loaded project specification"
    );
    Ok(project)
}

/// Parse a single flow specification from a JSON string.
pub fn load_flow_str(content: &str) -> Result<FlowSpec> {
    Ok(serde_json::from_str(content)?)
}
