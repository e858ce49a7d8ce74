use thiserror::Error;

/// Errors that can occur in a conversation store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backing storage could not be read or written
    #[error("Conversation store unavailable: {0}")]
    Unavailable(String),

    /// Stored data exists but could not be decoded
    #[error("Stored conversation for {user_id} is corrupt: {reason}")]
    Corrupt { user_id: String, reason: String },
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
