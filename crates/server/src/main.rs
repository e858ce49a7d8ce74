//! Simple test harness for the query orchestrator.
//!
//! Runs a short scripted conversation against the local sample catalog and
//! an OpenAI-compatible chat endpoint.
//!
//! Environment:
//! - `REEL_LLM_ENDPOINT` (default `http://localhost:11434/v1`)
//! - `REEL_LLM_MODEL` (default `llama3.1`)
//! - `REEL_LLM_API_KEY` (optional)
//! - `REEL_CATALOG` (default `data/movies.dat`)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use catalog::CatalogIndex;
use history::InMemoryConversationStore;
use llm_client::{ChatSummarizer, OpenAiChatClient};
use server::{OrchestratorConfig, QueryOrchestrator};

const USER_ID: &str = "harness";

const QUESTIONS: &[&str] = &[
    "Tell me about Inception",
    "What happens at the end?",
    "Any other films about dreams and reality?",
    "What's the weather like tomorrow?",
];

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,server=debug,pipeline=debug")
            }),
        )
        .init();

    info!("Starting query orchestrator test harness");

    let path = PathBuf::from(env_or("REEL_CATALOG", "data/movies.dat"));
    info!("Loading catalog from {}...", path.display());
    let catalog = Arc::new(
        CatalogIndex::load_from_file(&path)
            .with_context(|| format!("Failed to load catalog from {}", path.display()))?,
    );
    info!("Catalog loaded: {} movies", catalog.len());

    let mut chat = OpenAiChatClient::new(
        env_or("REEL_LLM_ENDPOINT", "http://localhost:11434/v1"),
        env_or("REEL_LLM_MODEL", "llama3.1"),
    )
    .context("Failed to build chat client")?;
    if let Ok(key) = std::env::var("REEL_LLM_API_KEY") {
        chat = chat.with_api_key(key);
    }
    info!("Using chat model {}", chat.model());

    let summarizer = Arc::new(ChatSummarizer::new(chat.clone()));
    let orchestrator = QueryOrchestrator::new(
        Arc::new(chat),
        catalog,
        summarizer,
        Arc::new(InMemoryConversationStore::new()),
        OrchestratorConfig::default(),
    );

    for question in QUESTIONS {
        info!("> {}", question);
        match orchestrator.process_query(USER_ID, question).await {
            Ok(result) => {
                info!(
                    "[{} context, {} chars, {:.2?}]",
                    result.context_used.kind,
                    result.context_used.len(),
                    result.elapsed
                );
                info!("{}", result.response_text);
            }
            Err(e) => info!("Query failed at stage {}: {}", e.stage(), e),
        }
    }

    info!("Harness finished");
    Ok(())
}
