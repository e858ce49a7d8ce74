use anyhow::{bail, Context, Result};
use catalog::{CatalogIndex, HttpMovieCatalog, MovieCatalog};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use history::{ConversationStore, FileConversationStore, HistoryLimits, Role, Turn};
use llm_client::{ChatSummarizer, OpenAiChatClient};
use pipeline::{chunk_plot, ChunkConfig};
use server::{OrchestratorConfig, QueryError, QueryOrchestrator, QueryResult};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};

/// reel-chat - ask questions about movies
#[derive(Parser)]
#[command(name = "reel-chat")]
#[command(about = "Movie Q&A assistant grounded in a movie catalog", long_about = None)]
struct Cli {
    /// Movie catalog: an http(s) URL for the search service, or a local .dat file
    #[arg(long, env = "REEL_CATALOG", default_value = "data/movies.dat", global = true)]
    catalog: String,

    #[command(flatten)]
    llm: LlmArgs,

    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LlmArgs {
    /// OpenAI-compatible API base URL
    #[arg(
        long,
        env = "REEL_LLM_ENDPOINT",
        default_value = "https://api.openai.com/v1",
        global = true
    )]
    llm_endpoint: String,

    #[arg(long, env = "REEL_LLM_MODEL", default_value = "gpt-4o-mini", global = true)]
    llm_model: String,

    #[arg(long, env = "REEL_LLM_API_KEY", hide_env_values = true, global = true)]
    llm_api_key: Option<String>,

    /// Check intent on every question, not only on fresh conversations
    #[arg(long, global = true)]
    always_check_intent: bool,

    /// Upper bound for answering one question
    #[arg(long, default_value = "60", global = true)]
    timeout_secs: u64,
}

#[derive(Args)]
struct StoreArgs {
    /// Directory for per-user conversation files
    #[arg(long, env = "REEL_HISTORY_DIR", default_value = ".reel-chat/history", global = true)]
    history_dir: PathBuf,

    /// Turns kept per conversation
    #[arg(long, default_value_t = history::DEFAULT_CAPACITY, global = true)]
    history_capacity: usize,

    /// Hours a conversation survives without new turns
    #[arg(long, default_value = "24", global = true)]
    history_ttl_hours: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask {
        #[arg(long)]
        user: String,

        question: String,
    },

    /// Interactive conversation (/history, /clear, /quit)
    Chat {
        #[arg(long)]
        user: String,
    },

    /// Show a user's stored conversation
    History {
        #[arg(long)]
        user: String,

        /// Print a one-paragraph digest instead of the turns
        #[arg(long)]
        digest: bool,
    },

    /// Forget a user's conversation
    Clear {
        #[arg(long)]
        user: String,
    },

    /// Show how a plot file would be chunked
    Chunks {
        file: PathBuf,

        #[arg(long, default_value = "3600")]
        window: usize,

        #[arg(long, default_value = "140")]
        overlap: usize,
    },

    /// Catalog similarity search
    Search {
        query: String,

        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Ask { ref user, ref question } => {
            let orchestrator = build_orchestrator(&cli).await?;
            handle_ask(&orchestrator, user, question).await?
        }
        Commands::Chat { ref user } => {
            let orchestrator = build_orchestrator(&cli).await?;
            let store = open_store(&cli.store)?;
            handle_chat(&orchestrator, store.as_ref(), user).await?
        }
        Commands::History { ref user, digest } => {
            let store = open_store(&cli.store)?;
            handle_history(store.as_ref(), user, digest).await?
        }
        Commands::Clear { ref user } => {
            let store = open_store(&cli.store)?;
            handle_clear(store.as_ref(), user).await?
        }
        Commands::Chunks {
            ref file,
            window,
            overlap,
        } => handle_chunks(file, window, overlap)?,
        Commands::Search { ref query, limit } => {
            let catalog = open_catalog(&cli.catalog).await?;
            handle_search(catalog.as_ref(), query, limit).await?
        }
    }

    Ok(())
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn open_catalog(source: &str) -> Result<Arc<dyn MovieCatalog>> {
    if is_url(source) {
        let catalog = HttpMovieCatalog::new(source).context("Failed to build catalog client")?;
        return Ok(Arc::new(catalog));
    }

    let path = PathBuf::from(source);
    let start = Instant::now();
    let index = tokio::task::spawn_blocking(move || CatalogIndex::load_from_file(&path))
        .await
        .context("Catalog loading task failed")?
        .with_context(|| format!("Failed to load catalog from {}", source))?;
    eprintln!(
        "{} Loaded {} movies in {:?}",
        "✓".green(),
        index.len(),
        start.elapsed()
    );
    Ok(Arc::new(index))
}

fn open_store(args: &StoreArgs) -> Result<Arc<FileConversationStore>> {
    let limits = HistoryLimits::new(
        args.history_capacity,
        Duration::from_secs(args.history_ttl_hours.saturating_mul(3600)),
    );
    let store = FileConversationStore::open(&args.history_dir, limits).with_context(|| {
        format!(
            "Failed to open history directory {}",
            args.history_dir.display()
        )
    })?;
    Ok(Arc::new(store))
}

async fn build_orchestrator(cli: &Cli) -> Result<QueryOrchestrator> {
    let catalog = open_catalog(&cli.catalog).await?;
    let store = open_store(&cli.store)?;

    let mut chat = OpenAiChatClient::new(&cli.llm.llm_endpoint, &cli.llm.llm_model)
        .context("Failed to build chat client")?;
    if let Some(key) = &cli.llm.llm_api_key {
        chat = chat.with_api_key(key);
    }
    let summarizer = Arc::new(ChatSummarizer::new(chat.clone()));

    let config = OrchestratorConfig::default()
        .with_skip_intent_on_followup(!cli.llm.always_check_intent)
        .with_request_timeout(Duration::from_secs(cli.llm.timeout_secs.max(1)));

    Ok(QueryOrchestrator::new(
        Arc::new(chat),
        catalog,
        summarizer,
        store,
        config,
    ))
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Run one question, cancelling it on Ctrl-C
async fn ask(
    orchestrator: &QueryOrchestrator,
    user: &str,
    question: &str,
) -> std::result::Result<QueryResult, QueryError> {
    orchestrator
        .process_query_until(user, question, interrupted())
        .await
}

/// Handle the 'ask' command
async fn handle_ask(orchestrator: &QueryOrchestrator, user: &str, question: &str) -> Result<()> {
    let result = ask(orchestrator, user, question).await?;
    print_answer(&result);
    Ok(())
}

/// Read the next REPL line; `None` on end of input or interrupt.
///
/// Once a question has installed the Ctrl-C handler the default exit is
/// gone, so the prompt has to watch for it too.
async fn read_prompt<R, F>(lines: &mut Lines<R>, interrupt: F) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = interrupt => {
            println!();
            Ok(None)
        }
    }
}

/// Handle the 'chat' command
async fn handle_chat(
    orchestrator: &QueryOrchestrator,
    store: &dyn ConversationStore,
    user: &str,
) -> Result<()> {
    println!(
        "{}",
        format!("Chatting as {}. /history, /clear, /quit", user)
            .bold()
            .blue()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = read_prompt(&mut lines, interrupted()).await? else {
            break;
        };
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => handle_history(store, user, false).await?,
            "/clear" => handle_clear(store, user).await?,
            question => match ask(orchestrator, user, question).await {
                Ok(result) => print_answer(&result),
                // Keep the session alive; the next question starts a new run
                Err(e) => eprintln!("{} {}", "✗".red(), e),
            },
        }
    }
    Ok(())
}

/// Handle the 'history' command
async fn handle_history(store: &dyn ConversationStore, user: &str, digest: bool) -> Result<()> {
    let turns = store
        .recent(user)
        .await
        .with_context(|| format!("Failed to read history for {}", user))?;

    if digest {
        println!("{}", history::digest(&turns));
        return Ok(());
    }

    if turns.is_empty() {
        println!("No conversation stored for {}", user);
        return Ok(());
    }

    println!("{}", format!("Conversation with {}:", user).bold().blue());
    for turn in &turns {
        print_turn(turn);
    }
    Ok(())
}

/// Handle the 'clear' command
async fn handle_clear(store: &dyn ConversationStore, user: &str) -> Result<()> {
    let removed = store
        .clear(user)
        .await
        .with_context(|| format!("Failed to clear history for {}", user))?;
    if removed {
        println!("{} Cleared conversation for {}", "✓".green(), user);
    } else {
        println!("No conversation stored for {}", user);
    }
    Ok(())
}

/// Handle the 'chunks' command
fn handle_chunks(file: &Path, window: usize, overlap: usize) -> Result<()> {
    let config = ChunkConfig::new(window, overlap)?;
    let plot = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let plot = plot.trim();
    if plot.is_empty() {
        bail!("{} is empty", file.display());
    }

    let chunks = chunk_plot(plot, &config);
    println!(
        "{}",
        format!(
            "{} chars -> {} chunks (window {}, overlap {})",
            plot.chars().count(),
            chunks.len(),
            config.window,
            config.overlap
        )
        .bold()
        .blue()
    );
    for chunk in &chunks {
        let preview: String = chunk.text.chars().take(60).collect();
        println!(
            "{}. [{}..{}) {}",
            (chunk.index + 1).to_string().green(),
            chunk.start,
            chunk.end,
            preview.replace('\n', " ")
        );
    }
    Ok(())
}

/// Handle the 'search' command
async fn handle_search(catalog: &dyn MovieCatalog, query: &str, limit: usize) -> Result<()> {
    let movies = catalog
        .search_similar(query)
        .await
        .context("Similarity search failed")?;

    println!("{}", format!("Search results for '{}':", query).bold().blue());
    if movies.is_empty() {
        println!("No matches");
    }
    for (rank, movie) in movies.iter().take(limit).enumerate() {
        let preview: String = movie.plot.chars().take(80).collect();
        println!(
            "{}. {} [{}] {}",
            (rank + 1).to_string().green(),
            movie.name.bold(),
            movie.id,
            preview
        );
    }
    Ok(())
}

fn print_turn(turn: &Turn) {
    let role = match turn.role {
        Role::User => turn.role.to_string().cyan(),
        Role::Assistant => turn.role.to_string().green(),
    };
    println!("{}: {}", role, turn.content);
}

fn print_answer(result: &QueryResult) {
    println!("{}", result.response_text);
    println!(
        "{}",
        format!(
            "[{} context, {} chars, {:.2?}]",
            result.context_used.kind,
            result.context_used.len(),
            result.elapsed
        )
        .dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "reel-chat",
            "ask",
            "--user",
            "alice",
            "what happens at the end of Inception?",
        ])
        .unwrap();

        match cli.command {
            Commands::Ask { user, question } => {
                assert_eq!(user, "alice");
                assert_eq!(question, "what happens at the end of Inception?");
            }
            _ => panic!("expected ask"),
        }
        assert_eq!(cli.llm.timeout_secs, 60);
        assert_eq!(cli.store.history_capacity, 10);
        assert!(!cli.llm.always_check_intent);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "reel-chat",
            "history",
            "--user",
            "bob",
            "--digest",
            "--history-capacity",
            "4",
            "--always-check-intent",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::History { digest: true, .. }));
        assert_eq!(cli.store.history_capacity, 4);
        assert!(cli.llm.always_check_intent);
    }

    #[test]
    fn test_is_url() {
        assert!(is_url("http://localhost:5000"));
        assert!(is_url("https://movies.example.com/api"));
        assert!(!is_url("data/movies.dat"));
    }

    #[tokio::test]
    async fn test_prompt_reads_lines_until_eof() {
        let mut lines = BufReader::new(&b"hello\n/quit\n"[..]).lines();
        let never = std::future::pending::<()>;

        assert_eq!(read_prompt(&mut lines, never()).await.unwrap().as_deref(), Some("hello"));
        assert_eq!(read_prompt(&mut lines, never()).await.unwrap().as_deref(), Some("/quit"));
        assert_eq!(read_prompt(&mut lines, never()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_prompt_interrupt_ends_session() {
        // stdin that never produces a line
        let (reader, _writer) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        let line = read_prompt(&mut lines, std::future::ready(())).await.unwrap();
        assert_eq!(line, None);
    }

    #[test]
    fn test_chunks_rejects_bad_overlap() {
        assert!(handle_chunks(Path::new("unused.txt"), 100, 100).is_err());
    }
}
