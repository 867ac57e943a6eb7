//! Entrypoint for orc-server
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use futures::StreamExt;
use orc_application::{
    AskRequest, ConversationStore, NoQueryEngine, NoSearchBackend, Orchestrator, QueryEngine,
    SearchBackend, StrategyRegistry, StreamFrame, StreamOptions, SummarizeHistoryUseCase,
};
use orc_domain::{Credentials, Question};
use orc_infrastructure::{
    ConfigLoader, DataDictionary, FileConfig, FileConversationStore, FileTemplateStore,
    HttpQueryEngine, HttpSearchBackend, JsonSchemaToolConverter, JsonlConversationLogger,
    MemoryConversationStore, OpenAiGateway, StoreBackend, ToolBackends, builtin_registry,
};
use orc_presentation::{Cli, Command, ConsoleChat, ConsoleFormatter, OutputFormat};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("invalid configuration: {e}"))?
    };
    config.validate()?;

    let _log_guard = init_logging(cli.verbose, config.logging.dir.as_deref());
    info!("Starting orc");

    let strategy = cli
        .strategy
        .clone()
        .unwrap_or_else(|| config.orchestration.strategy.clone());
    let orchestrator = build_orchestrator(&config, &strategy).await?;
    info!(strategy = %orchestrator.strategy(), "Orchestrator ready");

    match cli.command.unwrap_or(Command::Chat {
        conversation_id: None,
    }) {
        Command::Serve { bind } => {
            let addr = bind.unwrap_or_else(|| config.server.bind.clone());
            orc_presentation::serve(orchestrator, &addr)
                .await
                .with_context(|| format!("server on {addr} failed"))?;
        }
        Command::Ask {
            question,
            conversation_id,
            stream,
            output,
        } => {
            let Some(question) = Question::try_new(question) else {
                bail!("Question cannot be empty");
            };
            let request = AskRequest::new(question, Credentials::anonymous())
                .with_conversation_id(conversation_id);
            if stream {
                ask_streaming(&orchestrator, request).await?;
            } else {
                let envelope = orchestrator.answer(request).await;
                print!("{}", ConsoleFormatter::render(&envelope, output));
                if output != OutputFormat::Json {
                    eprintln!("conversation: {}", envelope.conversation_id);
                } else {
                    println!();
                }
            }
        }
        Command::Chat { conversation_id } => {
            ConsoleChat::new(orchestrator)
                .with_conversation_id(conversation_id)
                .run()
                .await?;
        }
    }

    Ok(())
}

/// Stderr at the `-v` level (or `RUST_LOG` without `-v`), plus a daily
/// rolling file when a log directory is configured.
fn init_logging(verbose: u8, dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "orc.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();
    guard
}

// ==================== Dependency Injection ====================

async fn build_orchestrator(config: &FileConfig, strategy: &str) -> Result<Orchestrator> {
    let gateway = Arc::new(OpenAiGateway::from_config(&config.model)?);

    let store: Arc<dyn ConversationStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryConversationStore::new()),
        StoreBackend::File => {
            let dir = config
                .store
                .path
                .clone()
                .context("store.path is required for the file backend")?;
            Arc::new(FileConversationStore::open(dir).await?)
        }
    };

    let search: Arc<dyn SearchBackend> = match HttpSearchBackend::from_config(&config.search)? {
        Some(backend) => Arc::new(backend),
        None => {
            warn!("No search endpoint configured; retrieval tools will fail");
            Arc::new(NoSearchBackend)
        }
    };
    let query: Arc<dyn QueryEngine> = match HttpQueryEngine::from_config(&config.query)? {
        Some(engine) => Arc::new(engine),
        None => Arc::new(NoQueryEngine),
    };
    let dictionary = match &config.data_dictionary.path {
        Some(path) => DataDictionary::load(path)
            .await
            .with_context(|| format!("loading data dictionary {}", path.display()))?,
        None => DataDictionary::default(),
    };

    let tools = builtin_registry(
        ToolBackends {
            search,
            query,
            dictionary: Arc::new(dictionary),
        },
        &config.search,
    );
    let templates = Arc::new(FileTemplateStore::new(&config.prompts.dir));
    let registry =
        StrategyRegistry::new(templates.clone()).with_model_params(config.model.model_params());
    if registry.blueprint(strategy).is_err() {
        bail!(
            "Unknown strategy '{}' (available: {})",
            strategy,
            registry.names().join(", ")
        );
    }

    let summarizer =
        SummarizeHistoryUseCase::new(gateway.clone()).with_params(config.model.model_params());
    let mut orchestrator = Orchestrator::new(
        gateway,
        Arc::new(tools),
        Arc::new(JsonSchemaToolConverter),
        store,
        templates,
    )
    .with_registry(registry)
    .with_summarizer(summarizer)
    .with_strategy(strategy)
    .with_params(config.execution_params());

    if let Some(path) = &config.logging.conversation_log
        && let Some(logger) = JsonlConversationLogger::open(path)
    {
        info!(path = %logger.path().display(), "Logging conversations");
        orchestrator = orchestrator.with_conversation_logger(Arc::new(logger));
    }

    Ok(orchestrator)
}

/// Print content as it arrives; errors go to stderr.
async fn ask_streaming(orchestrator: &Orchestrator, request: AskRequest) -> Result<()> {
    let frames = orchestrator.answer_stream(request, StreamOptions::default());
    futures::pin_mut!(frames);
    let mut stdout = std::io::stdout();

    while let Some(frame) = frames.next().await {
        match frame {
            StreamFrame::ConversationId { conversation_id } => {
                eprintln!("conversation: {conversation_id}");
            }
            StreamFrame::Content { content, is_final } => {
                write!(stdout, "{content}")?;
                if is_final {
                    writeln!(stdout)?;
                }
                stdout.flush()?;
            }
            StreamFrame::Heartbeat { .. } => {}
            StreamFrame::Error { error } => eprintln!("Error: {error}"),
        }
    }
    Ok(())
}
