//! # History Crate
//!
//! Per-user conversation history for the movie Q&A pipeline.
//!
//! A conversation is bounded twice: by size (most recent N turns) and by
//! time (expires as a whole after a TTL). Re-submitting identical content for
//! the same user updates the stored turn instead of duplicating it.
//!
//! ## Components
//!
//! - **types**: `Turn`, `Role`, `TurnId`
//! - **store**: `ConversationStore` trait, `HistoryLimits`, in-memory store
//! - **file_store**: JSON-file store used by the CLI
//! - **digest**: one-line summary of a conversation

pub mod digest;
pub mod error;
pub mod file_store;
pub mod store;
pub mod types;

pub use digest::digest;
pub use error::{Result, StoreError};
pub use file_store::FileConversationStore;
pub use store::{
    Conversation, ConversationStore, DEFAULT_CAPACITY, DEFAULT_TTL, HistoryLimits,
    InMemoryConversationStore,
};
pub use types::{Role, Turn, TurnId, render_turns};
