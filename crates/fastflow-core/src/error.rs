use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpecError {
    #[error("specification parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to read specification: {path}\nreason: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SpecError>;
