use thiserror::Error;

/// Errors raised while setting up the pipeline.
///
/// Running the pipeline never fails: collaborator errors degrade to the
/// documented defaults at each call site.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
