//! annot-api - metaphor annotation service
//!
//! `serve` (the default) runs the HTTP API. `create-user` and `issue-token`
//! bootstrap accounts and bearer tokens from the command line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use annot_api::api::auth::{issue_token, AuthConfig};
use annot_api::{build_router, db, AppState};
use annot_common::config::TomlConfig;
use annot_common::models::{NewUser, UserRole};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for annot-api
#[derive(Parser, Debug)]
#[command(name = "annot-api")]
#[command(about = "Metaphor annotation service")]
#[command(version)]
struct Args {
    /// Explicit config file (otherwise ~/.config/annot/config.toml, /etc/annot/config.toml)
    #[arg(short, long, env = "ANNOT_CONFIG")]
    config: Option<PathBuf>,

    /// Folder holding the database
    #[arg(short, long, env = "ANNOT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Bind address, overrides the config file
        #[arg(short, long, env = "ANNOT_BIND_ADDRESS")]
        bind: Option<String>,
    },
    /// Create a user account
    CreateUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// editor or reviewer
        #[arg(long, default_value = "editor")]
        role: UserRole,
    },
    /// Print a bearer token for an existing user
    IssueToken {
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("annot_api={0},annot_common={0},tower_http=info", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting annot-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = config.resolve_root_folder(args.root_folder.as_deref());
    let db_path = config.database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = annot_common::db::init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let auth = AuthConfig::from(&config.auth);

    match args.command.unwrap_or(Command::Serve { bind: None }) {
        Command::Serve { bind } => {
            if auth.is_development() {
                info!("No jwt_secret configured: development mode, acting user read from X-User-Id");
            }

            let bind_address = bind.unwrap_or_else(|| config.bind_address.clone());
            let state = AppState::new(pool, auth)
                .with_max_upload_bytes(config.max_upload_bytes)
                .with_cors_origin(config.cors_origin.clone());
            let app = build_router(state);

            let listener = tokio::net::TcpListener::bind(&bind_address)
                .await
                .with_context(|| format!("Failed to bind to {}", bind_address))?;
            info!("annot-api listening on http://{}", bind_address);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;

            info!("Server shutdown complete");
        }
        Command::CreateUser { name, email, role } => {
            let user = db::users::create_user(
                &pool,
                &NewUser {
                    name,
                    email,
                    google_id: None,
                    avatar: None,
                    role,
                },
            )
            .await?;
            println!("{}", user.id);
        }
        Command::IssueToken { email } => {
            let user = db::users::find_user_by_email(&pool, &email)
                .await?
                .with_context(|| format!("No user with email {}", email))?;
            let token = issue_token(&auth, &user).map_err(|e| anyhow::anyhow!("{}", e))?;
            println!("{}", token);
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
