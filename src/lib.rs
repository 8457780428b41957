pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod process;
pub mod schema;
pub mod session;
pub mod write;

pub use error::{PipelineError, Stage};
pub use pipeline::{run, RunSummary};
