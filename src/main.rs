use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use orhen::ai::{DemoSearch, ProviderClient, RemoteBackend, Search};
use orhen::attachments::attachment_from_path;
use orhen::config::AppConfig;
use orhen::instructions::instructions_value;
use orhen::orchestrator::{Orchestrator, RejectReason, SubmitOutcome};
use orhen::server::{self, AppState};
use orhen::session::ChatSession;
use orhen::storage::{FileStorage, KeyValueStorage, MemoryStorage, SESSION_MARKER_KEY};
use orhen::store::ConversationStore;
use orhen::types::{InputMode, Role};

#[derive(Parser)]
#[command(name = "orhen", version, about = "Chat with Gemini from the terminal or over HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP backend (/chat, /search, /voice)
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,
    },
    /// Interactive chat in the terminal
    Chat {
        /// Talk to a running `orhen serve` instead of Gemini directly
        #[arg(long)]
        server_url: Option<String>,

        /// Where the conversation is persisted
        #[arg(long)]
        storage_dir: Option<PathBuf>,

        /// Continue the previously persisted conversation
        #[arg(long)]
        resume: bool,

        /// Send the assistant instructions bundle with every request
        #[arg(long)]
        send_instructions: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; real env vars still apply.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("orhen=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            let addr: SocketAddr = config
                .bind
                .parse()
                .with_context(|| format!("invalid bind address {}", config.bind))?;
            let state = Arc::new(AppState::from_config(&config));
            server::serve(addr, state).await?;
        }
        Command::Chat {
            server_url,
            storage_dir,
            resume,
            send_instructions,
        } => {
            if server_url.is_some() {
                config.server_url = server_url;
            }
            if storage_dir.is_some() {
                config.storage_dir = storage_dir;
            }
            config.send_instructions |= send_instructions;
            run_chat(&config, resume).await?;
        }
    }

    Ok(())
}

async fn run_chat(config: &AppConfig, resume: bool) -> Result<()> {
    let durable: Arc<dyn KeyValueStorage> = Arc::new(match &config.storage_dir {
        Some(dir) => FileStorage::new(dir.clone()),
        None => FileStorage::default_location(),
    });
    let tab = MemoryStorage::new();
    if resume {
        tab.set(SESSION_MARKER_KEY, "active")?;
    }
    let store = Arc::new(
        ConversationStore::hydrate(durable, &tab).context("failed to load conversation")?,
    );

    let search: Arc<dyn Search> = match &config.server_url {
        Some(url) => Arc::new(RemoteBackend::new(url.clone())),
        None => Arc::new(DemoSearch),
    };
    let mut orchestrator = Orchestrator::new(
        store,
        Arc::new(ProviderClient::from_config(config)),
        search,
    );
    if config.send_instructions {
        orchestrator = orchestrator.with_instructions(instructions_value());
    }
    let session = ChatSession::new(orchestrator);

    if session.store().is_chat_mode() {
        print_transcript(&session);
    } else {
        println!("How can I help you today? (/search, /attach, /clear, /quit)");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit" | "/exit", _) => break,
            ("/clear", _) => {
                session.reset();
                println!("Conversation cleared.");
            }
            ("/attach", path) => attach(&session, path.trim()),
            ("/search", query) => {
                session.store().set_input_mode(InputMode::Search);
                session.store().set_draft(query);
                report(&session, session.submit().await);
            }
            _ => {
                session.store().set_input_mode(InputMode::Normal);
                session.store().set_draft(line);
                report(&session, session.submit().await);
            }
        }
    }

    session.shutdown();
    Ok(())
}

fn attach(session: &ChatSession, path: &str) {
    if path.is_empty() {
        println!("usage: /attach <path>");
        return;
    }
    match attachment_from_path(Path::new(path)) {
        Ok(attachment) => {
            println!("attached {} ({})", attachment.name, attachment.mime_type);
            session.store().add_pending_attachment(attachment);
        }
        Err(err) => eprintln!("{err}"),
    }
}

fn report(session: &ChatSession, outcome: SubmitOutcome) {
    let results = session.store().snapshot().search_results;
    match outcome {
        SubmitOutcome::Answered(reply) => {
            for result in &results {
                println!("  [{}] {}", result.title, result.url);
            }
            println!("{}", reply.content);
        }
        SubmitOutcome::Failed { message, .. } => eprintln!("{}", message.content),
        SubmitOutcome::Rejected(RejectReason::InFlight) => {
            println!("Still waiting for the previous reply.")
        }
        SubmitOutcome::Rejected(RejectReason::EmptyInput) | SubmitOutcome::Superseded => {}
    }
    if !results.is_empty() {
        session.store().set_search_results(Vec::new());
    }
}

fn print_transcript(session: &ChatSession) {
    for message in session.store().messages() {
        let speaker = match message.role {
            Role::User => "you",
            Role::Assistant => "orhen",
            Role::System => continue,
        };
        println!("{speaker}: {}", message.content);
    }
}
