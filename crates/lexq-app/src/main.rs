//! lexq application binary - composition root.
//!
//! 1. Load configuration from TOML, then overlay environment variables
//! 2. Build the remote collaborators (secrets, credential exchange, QA, tracing)
//! 3. Open the SQLite history store
//! 4. Either serve the HTTP API or run one turn from an event file

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::AsyncReadExt;

use lexq_api::auth::generate_token;
use lexq_api::routes;
use lexq_api::state::AppState;
use lexq_chat::{DialogEvent, TurnHandler, TurnServices, TurnSettings};
use lexq_clients::{
    EnvSecretStore, FileSecretStore, HttpQaClientFactory, HttpRunTracerFactory, TokenVendingClient,
};
use lexq_core::config::{LexqConfig, SecretBackend};
use lexq_core::error::LexqError;
use lexq_core::services::{HistoryStore, SecretStore};
use lexq_storage::{Database, SqliteHistoryStore};

use cli::{expand_home, CliArgs, Command};

/// Wire every collaborator of a turn from the configuration.
fn build_handler(
    config: &LexqConfig,
) -> Result<(TurnHandler, Arc<SqliteHistoryStore>), LexqError> {
    let secrets: Arc<dyn SecretStore> = match config.secrets.backend {
        SecretBackend::Env => Arc::new(EnvSecretStore),
        SecretBackend::File => {
            let path = config.secrets.file_path.as_deref().ok_or_else(|| {
                LexqError::Config("secrets.file_path is not set".to_string())
            })?;
            Arc::new(FileSecretStore::new(expand_home(path)))
        }
    };
    tracing::info!(backend = ?config.secrets.backend, "Secret store ready");

    let credentials = Arc::new(TokenVendingClient::new(&config.credentials)?);
    let qa = Arc::new(HttpQaClientFactory::new(&config.qa));
    let tracer = Arc::new(HttpRunTracerFactory::new(config.run_tracing.clone()));
    tracing::info!(
        application_id = %config.qa.application_id,
        run_tracing = config.run_tracing.enabled,
        "Remote clients configured"
    );

    let db_path = expand_home(&config.history.database_path);
    let db = Arc::new(Database::new(&db_path)?);
    let history = Arc::new(SqliteHistoryStore::new(db, &config.history.table_name)?);
    tracing::info!(
        path = %db_path.display(),
        table = %history.table_name(),
        "History store opened"
    );

    let services = TurnServices {
        secrets,
        credentials,
        qa,
        history: Arc::clone(&history) as Arc<dyn HistoryStore>,
        tracer,
    };
    let handler = TurnHandler::new(services, TurnSettings::from_config(config));
    Ok((handler, history))
}

async fn read_event(source: &str) -> Result<serde_json::Value, LexqError> {
    let raw = if source == "-" {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(source).await?
    };
    Ok(serde_json::from_str(&raw)?)
}

async fn run_invoke(config: &LexqConfig, source: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (handler, _history) = build_handler(config)?;
    let event = DialogEvent::from_json(read_event(source).await?)?;
    let response = handler.handle_event(&event).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_serve(mut config: LexqConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (handler, history) = build_handler(&config)?;

    let api_token = if config.general.api_token.trim().is_empty() {
        let token = generate_token();
        tracing::warn!(token = %token, "No api_token configured; generated one for this run");
        token
    } else {
        std::mem::take(&mut config.general.api_token)
    };

    let state = AppState::new(config, handler, history, api_token);
    routes::start_server(state).await?;
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<(), LexqError> {
    if path.exists() && !force {
        return Err(LexqError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    LexqConfig::default().save(path)
}

fn validate(config: &LexqConfig) -> Result<(), LexqError> {
    config.validate().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config_file = args.resolve_config_path();

    let config_exists = config_file.exists();

    // A config file that exists but does not parse is fatal; only a missing
    // file falls back to defaults.
    let mut config = LexqConfig::load_or_default(&config_file)?;
    config.apply_env_overrides();
    config.general.port = args.resolve_port(config.general.port);

    // Logs go to stderr so `invoke` output stays parseable.
    let filter = args.resolve_log_filter(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting lexq v{}", env!("CARGO_PKG_VERSION"));
    if config_exists {
        tracing::info!(path = %config_file.display(), "Configuration loaded");
    } else {
        tracing::warn!(path = %config_file.display(), "No config file; using defaults");
    }

    match args.command() {
        Command::InitConfig { force } => {
            init_config(&config_file, force)?;
            Ok(())
        }
        Command::Invoke { event } => {
            validate(&config)?;
            run_invoke(&config, &event).await
        }
        Command::Serve => {
            validate(&config)?;
            run_serve(config).await
        }
    }
}
