use thiserror::Error;

/// Errors that can occur when talking to the language model or summarizer
#[derive(Error, Debug)]
pub enum LlmError {
    /// Request never got an answer (connection refused, timeout, TLS, ...)
    #[error("Failed to reach language model service: {0}")]
    Transport(String),

    /// Service answered with a non-success HTTP status
    #[error("Language model service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Service answered, but without any completion text
    #[error("Language model returned an empty response")]
    EmptyResponse,

    /// Completion text could not be interpreted (e.g. not a boolean)
    #[error("Malformed model output: {0:?}")]
    MalformedOutput(String),

    /// The operation is not offered by this backend
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    /// Any other service-side failure
    #[error("Service error: {0}")]
    Service(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::Service(format!("undecodable response: {}", err))
        } else if let Some(status) = err.status() {
            LlmError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
