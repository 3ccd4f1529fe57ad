//! Coding agent - interactive LLM assistant for a local project
//!
//! Reads user input from the console, lets the model read, search and edit
//! files through tools, and keeps each session's history in SQLite.

mod config;
mod console;
mod llm;
mod runtime;
mod store;
mod system_prompt;
mod tools;

use config::{AgentConfig, ConfigError};
use console::{spawn_input_reader, Console};
use llm::{LoggingBackend, OpenAiResponsesBackend};
use runtime::{OrchestratorConfig, ProductionOrchestrator};
use std::io::BufReader;
use std::sync::Arc;
use store::{ConversationStore, InMemoryStore, SessionId, SqliteStore};
use tokio_util::sync::CancellationToken;
use tools::ToolRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// `AGENT_DB_PATH` value selecting the volatile store
const IN_MEMORY_DB: &str = ":memory:";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with answers on stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coding_agent=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::Missing(var)) => {
            eprintln!("Error: {var} environment variable is not set");
            eprintln!("Set it with: export {var}=your_api_key_here");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn ConversationStore> = if config.db_path.as_os_str() == IN_MEMORY_DB {
        tracing::info!("Using in-memory session store; history is lost on exit");
        Arc::new(InMemoryStore::new())
    } else {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::info!(path = %config.db_path.display(), "Opening session store");
        Arc::new(SqliteStore::open(&config.db_path)?)
    };

    let backend = OpenAiResponsesBackend::new(
        config.api_key.clone(),
        config.model.clone(),
        &config.base_url,
        config.request_timeout,
    )?;
    let backend = LoggingBackend::new(Arc::new(backend));

    let orchestrator: ProductionOrchestrator = runtime::TurnOrchestrator::new(
        store,
        backend,
        ToolRegistry::standard(),
        OrchestratorConfig {
            instructions: system_prompt::build_system_prompt(&config.working_dir),
            max_tool_rounds: config.max_tool_rounds,
            working_dir: config.working_dir.clone(),
        },
    );

    let session = config.session_id.clone().unwrap_or_else(SessionId::generate);
    tracing::info!(session = %session, model = %config.model, "Starting console");

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down");
                shutdown.cancel();
            }
        });
    }

    let input = spawn_input_reader(BufReader::new(std::io::stdin()), shutdown.clone());
    let mut console = Console::new(orchestrator, session, std::io::stdout());
    console.run(input, &shutdown).await?;
    tracing::info!(session = %console.session(), "Console closed");

    Ok(())
}
