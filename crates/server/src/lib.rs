//! Server crate for the movie Q&A assistant.
//!
//! This crate contains the orchestrator that takes one user question through
//! history lookup, intent checking, context building, answer generation and
//! persistence.

pub mod config;
pub mod orchestrator;

pub use config::{DEFAULT_REDIRECT, DEFAULT_REQUEST_TIMEOUT, OrchestratorConfig};
pub use orchestrator::{QueryError, QueryOrchestrator, QueryResult, QueryStage};
