//! CLI entrypoint for the CKM consultation board
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use ckm_application::{
    ConsultationSession, IntakeParser, NoProgress, ProgressNotifier, TurnOutput,
};
use ckm_domain::IntakeState;
use ckm_infrastructure::{
    ConfigLoader, FileConfig, IntakeParserKind, JsonlConversationLogger, OllamaClient,
    StructuredCaseParser,
};
use ckm_presentation::{
    Cli, ConsoleFormatter, ConsultRepl, JsonFormatter, OutputConfig, OutputFormat,
    OutputFormatter, ProgressReporter, ReplConfig, SimpleProgress,
};
use clap::Parser;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    // Load configuration
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("failed to load configuration")?
    };

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_tracing(cli.verbose, &config);
    info!("Starting ckm-board");

    for issue in config.validate() {
        if !issue.is_error() {
            warn!("{}", issue.message);
            eprintln!("Warning: {}", issue.message);
        }
    }
    let board = config.to_board_config()?;

    let output = OutputConfig {
        format: cli
            .output
            .or(config.output.format.map(OutputFormat::from))
            .unwrap_or(OutputFormat::Text),
        color: config.output.color,
    };
    if !output.color {
        colored::control::set_override(false);
    }

    // === Dependency Injection ===
    let client = Arc::new(OllamaClient::new(&config.providers.ollama)?);
    info!("Using Ollama at {}", client.base_url());

    let (parser_kind, _) = config.intake.parse_parser();
    let parser: Arc<dyn IntakeParser> = match parser_kind {
        IntakeParserKind::Structured => Arc::new(StructuredCaseParser::new()),
        IntakeParserKind::Llm => client.clone(),
    };

    let progress: Arc<dyn ProgressNotifier> = if cli.quiet || !config.repl.show_progress {
        Arc::new(NoProgress)
    } else if output.format == OutputFormat::Json || cli.paste.is_some() {
        Arc::new(SimpleProgress)
    } else {
        Arc::new(ProgressReporter::new())
    };

    let mut session = ConsultationSession::new(client.clone(), client, parser, board)
        .with_progress(progress);

    if config.logging.conversation_log {
        match config
            .logging
            .transcript_dir()
            .and_then(JsonlConversationLogger::in_dir)
        {
            Some(logger) => {
                info!("Conversation log: {}", logger.path().display());
                session = session.with_logger(Arc::new(logger));
            }
            None => warn!("Conversation log disabled: no writable log directory"),
        }
    }

    // One-shot paste mode
    if let Some(path) = &cli.paste {
        let text = read_paste(path)?;
        let result = run_paste(&mut session, &text).await?;
        println!("{}", format_turn(output.format, &result));
        return Ok(());
    }

    let repl_config = ReplConfig::default()
        .with_history_file(config.repl.history_file.as_deref())
        .with_progress(!cli.quiet && config.repl.show_progress);
    let mut repl = ConsultRepl::new(session)
        .with_output(output)
        .with_config(repl_config);
    repl.run().await?;

    Ok(())
}

/// Console tracing at the requested verbosity, plus a daily rolling file when
/// a log directory is configured
fn init_tracing(verbose: u8, config: &FileConfig) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match config.logging.tracing_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "ckm-board.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(EnvFilter::new(level))
                .with(console)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(EnvFilter::new(level))
                .with(console)
                .init();
            None
        }
    }
}

fn read_paste(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read case from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Drive paste mode through confirmation and return the board's answer
async fn run_paste<A, S>(session: &mut ConsultationSession<A, S>, text: &str) -> Result<TurnOutput>
where
    A: ckm_application::AssessmentProvider + 'static,
    S: ckm_application::SynthesisProvider + 'static,
{
    session.handle_turn("2").await?;
    if session.intake().state() != IntakeState::AwaitingPaste {
        bail!("paste mode is unavailable");
    }

    let parsed = session.handle_turn(text).await?;
    if session.intake().state() != IntakeState::AwaitingConfirm {
        // Parse failure; the output carries the reason
        return Ok(parsed);
    }
    Ok(session.handle_turn("confirm").await?)
}

fn format_turn(format: OutputFormat, output: &TurnOutput) -> String {
    match format {
        OutputFormat::Text => ConsoleFormatter.format_turn(output),
        OutputFormat::Json => JsonFormatter.format_turn(output),
    }
}
