//! Messaging service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (request id, trace, timeout, metrics)
//!                         │
//!                         ▼
//!                     security::auth ──▶ observability::request_log
//!                         │
//!                         ▼
//!                     security::access_window ──▶ security::rate_limit
//!                         │
//!                         ▼
//!                     api (conversations, messages, users)
//!                         │
//!                         ▼
//!                     models ──▶ SQLite
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures_util::FutureExt;
use sqlx::FromRow;
use tokio::net::TcpListener;
use uuid::Uuid;

use messaging_app::api::representation::UserView;
use messaging_app::config::{load_config, AppConfig};
use messaging_app::db::{self, with_db_connection, DatabaseConnection, DbError, ExecuteQuery};
use messaging_app::models::{user, NewUser, Role, User};
use messaging_app::observability::{logging, metrics};
use messaging_app::HttpServer;

#[derive(Parser)]
#[command(name = "messaging-app")]
#[command(about = "Conversations and messages between users", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured database URL
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending database migrations
    Migrate,
    /// Create a user
    CreateUser {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long, default_value = "guest")]
        role: Role,
    },
    /// List every user
    Users,
    /// Show one user
    User { id: Uuid },
    /// Change a user's email
    SetEmail { id: Uuid, email: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    logging::init(&config.observability.log_level);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await?,
        Commands::Migrate => {
            let pool = db::connect(&config.database).await?;
            db::migrate(&pool).await?;
            pool.close().await;
            println!("Migrations applied");
        }
        Commands::CreateUser {
            first_name,
            last_name,
            email,
            phone,
            role,
        } => {
            let pool = db::init(&config.database).await?;
            let mut conn = pool.acquire().await?;
            let created = user::insert(
                &mut conn,
                NewUser {
                    first_name,
                    last_name,
                    email,
                    phone_number: phone,
                    role,
                },
            )
            .await?;
            println!("{}\t{}\t{}", created.user_id, created.email, created.role);
        }
        Commands::Users => {
            let users = DatabaseConnection::new(&config.database.url)
                .scope(|conn| async move { user::list(conn).await.map_err(DbError::from) }.boxed())
                .await?;
            for u in users {
                println!("{}\t{}\t{} {}\t{}", u.user_id, u.email, u.first_name, u.last_name, u.role);
            }
        }
        Commands::User { id } => {
            let rows = ExecuteQuery::new(&config.database.url, "SELECT * FROM users WHERE user_id = ?", id)
                .run()
                .await?;
            match rows.first() {
                Some(row) => {
                    let found = User::from_row(row)?;
                    println!("{}", serde_json::to_string_pretty(&UserView::from(found))?);
                }
                None => {
                    eprintln!("No user with id {id}");
                    std::process::exit(1);
                }
            }
        }
        Commands::SetEmail { id, email } => {
            let updated = with_db_connection(&config.database.url, |conn| {
                async move {
                    db::transactional(conn, |tx| {
                        async move { user::set_email(tx, id, &email).await.map_err(DbError::from) }.boxed()
                    })
                    .await
                }
                .boxed()
            })
            .await?;
            if updated {
                println!("Updated email for {id}");
            } else {
                eprintln!("No user with id {id}");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "messaging-app starting");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let pool = db::init(&config.database).await?;
    tracing::info!(
        database = %config.database.url,
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config, pool.clone());
    server.run(listener).await?;

    pool.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
