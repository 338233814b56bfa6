//! Spectra CLI binary entry point.

use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use spectra::auth::store::FileTokenStore;
use spectra::auth::{CredentialSource, StoredCredentials};
use spectra::cli::{render_entry, AuthCommands, ChatArgs, Cli, Commands, SessionCommands, PROFILE};
use spectra::client::{AgentClient, BackendClient, RunRequest};
use spectra::config::SpectraConfig;
use spectra::error::{Result, SpectraError};
use spectra::session::SessionService;
use spectra::types::LogEntry;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match SpectraConfig::load() {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        eprintln!("Hint: {}", e.recovery_suggestion().hint());
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SPECTRA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(command: Commands, config: SpectraConfig) -> Result<()> {
    match command {
        Commands::Auth(auth_args) => match auth_args.command {
            AuthCommands::Login(args) => spectra::cli::auth::handle_login(&config, &args.token),
            AuthCommands::Status => spectra::cli::auth::handle_status(&config),
            AuthCommands::Logout => spectra::cli::auth::handle_logout(&config),
        },
        Commands::Session(session_args) => match session_args.command {
            SessionCommands::Start(args) => handle_session_start(config, args.record).await,
            SessionCommands::End => handle_session_end(config).await,
        },
        Commands::Chat(chat_args) => handle_chat(config, chat_args).await,
    }
}

fn stored_credentials(config: &SpectraConfig) -> Arc<dyn CredentialSource> {
    let store = Arc::new(FileTokenStore::new(config.token_dir.clone()));
    Arc::new(StoredCredentials::new(store, PROFILE))
}

async fn handle_session_start(config: SpectraConfig, record: bool) -> Result<()> {
    let credentials = stored_credentials(&config);
    let sessions = SessionService::new(config, credentials)?;

    let outcome = sessions.start_session(record).await;
    if !outcome.success {
        return Err(SpectraError::InvalidState(outcome.message));
    }
    println!("✅ {}", outcome.message);
    println!("⏳ Waiting for the browser to come up...");

    let Some(session_id) = sessions.wait_ready(&outcome).await else {
        return Err(SpectraError::InvalidState("backend returned no session id".to_string()));
    };

    let state = sessions.state();
    println!("Session: {session_id}");
    if let Some(namespace) = state.namespace {
        println!("Namespace: {namespace}");
    }
    if let Some(passwd) = state.vnc_passwd {
        println!("VNC password: {passwd}");
    }
    Ok(())
}

/// A fresh process holds no session state, so this goes straight to the backend.
async fn handle_session_end(config: SpectraConfig) -> Result<()> {
    let credentials = stored_credentials(&config).credentials().await?;
    let backend = BackendClient::new(config)?;

    let response = backend.end_session(credentials.bearer()).await?;
    println!(
        "✅ {}",
        response
            .message
            .as_deref()
            .unwrap_or("Session ended successfully")
    );
    Ok(())
}

async fn handle_chat(config: SpectraConfig, args: ChatArgs) -> Result<()> {
    let credentials = stored_credentials(&config);
    let agent = AgentClient::new(config, credentials)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    println!("{}", render_entry(&LogEntry::user(args.prompt.as_str())));

    let request = RunRequest::builder()
        .session_id(args.session)
        .message(args.prompt)
        .build();
    let mut entries = agent.run_sse(request, cancel.clone());
    while let Some(entry) = entries.next().await {
        println!("{}", render_entry(&entry));
    }

    if cancel.is_cancelled() {
        eprintln!("Interrupted");
    }
    Ok(())
}
