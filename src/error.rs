// src/error.rs

//! Error taxonomy for the pipeline.
//!
//! Fatal conditions are typed errors that unwind to the driver. Non-fatal
//! conditions (shape warnings, coercion defaults) are plain data carried in
//! the validation report and flatten stats instead.

use std::{fmt, path::PathBuf, time::Duration};
use thiserror::Error;

/// Failures of the HTTP fetch collaborator (and of the raw snapshot it owns).
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("connection to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("malformed payload from {source_name}: {reason}")]
    MalformedPayload { source_name: String, reason: String },

    #[error("raw snapshot {path:?}: {source}")]
    RawSnapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The input is not the expected entity collection at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuralValidationError {
    #[error("required field '{0}' not found in source schema")]
    MissingRequiredField(String),
}

/// Failures bringing up the compute session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("building thread pool for session '{name}': {source}")]
    ThreadPool {
        name: String,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },

    #[error("invalid memory hint '{0}' (expected e.g. 512m, 2g)")]
    InvalidMemoryHint(String),
}

/// Failures persisting the final table.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("destination {0:?} already exists")]
    AlreadyExists(PathBuf),

    #[error("writing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("building record batch for {path:?}: {source}")]
    Arrow {
        path: PathBuf,
        #[source]
        source: arrow::error::ArrowError,
    },

    #[error("encoding parquet {path:?}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },
}

/// Pipeline stage names, used in the terminal log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Session,
    Validate,
    Transform,
    Write,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Session => "session",
            Stage::Validate => "validate",
            Stage::Transform => "transform",
            Stage::Write => "write",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal error, tagged with the stage that raised it. The wrapped cause is
/// passed through unchanged.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("session failed: {0}")]
    Session(#[from] SessionError),

    #[error("validation failed: {0}")]
    Validation(#[from] StructuralValidationError),

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("write failed: {0}")]
    Write(#[from] WriteError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Fetch(_) => Stage::Fetch,
            PipelineError::Session(_) => Stage::Session,
            PipelineError::Validation(_) => Stage::Validate,
            PipelineError::Transform(_) => Stage::Transform,
            PipelineError::Write(_) => Stage::Write,
        }
    }
}
