//! `storeadmind`: the store administration server.
//!
//! Usage:
//!   storeadmind serve -c <context-name-or-path> [--listen <addr>]
//!   storeadmind hash-password <password>
//!   storeadmind init -c <context-name-or-path> --data-dir <dir> --password <pw>
//!
//! The context name resolves to `/etc/storeadmin/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod auth_middleware;
mod bootstrap;
mod config;
mod login;
mod routes;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use storeadmin_blob::{AssetStorage, BlobStore, FileStore};
use storeadmin_catalog::service::CatalogService;
use storeadmin_catalog::CatalogModule;
use storeadmin_core::Module;
use storeadmin_gateway::Gateway;
use storeadmin_matching::ItemServices;
use storeadmin_sql::{SQLStore, SqliteStore};
use tracing::info;

use auth_middleware::JwtState;
use config::ServerConfig;
use routes::AppState;

/// Store administration server.
#[derive(Parser, Debug)]
#[command(name = "storeadmind", about = "Store administration server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        /// Context name or path to config file.
        #[arg(short = 'c', long = "config", required = true)]
        config: String,

        /// Listen address.
        #[arg(long = "listen", default_value = "0.0.0.0:8080")]
        listen: String,
    },

    /// Print the argon2id hash of a password for `admin.password_hash`.
    #[command(name = "hash-password")]
    HashPassword {
        password: String,
    },

    /// Write a new config file with a hashed password and a random JWT secret.
    Init {
        /// Context name or path to config file.
        #[arg(short = 'c', long = "config", required = true)]
        config: String,

        #[arg(long, default_value = "admin")]
        username: String,

        #[arg(long)]
        password: String,

        #[arg(long = "data-dir")]
        data_dir: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve { config, listen } => serve(&config, &listen).await,
        Commands::HashPassword { password } => {
            println!("{}", bootstrap::hash_password(&password)?);
            Ok(())
        }
        Commands::Init {
            config,
            username,
            password,
            data_dir,
        } => bootstrap::write_initial_config(
            &ServerConfig::resolve_path(&config),
            &username,
            &password,
            &data_dir,
        ),
    }
}

async fn serve(config_name: &str, listen: &str) -> anyhow::Result<()> {
    // Load server configuration.
    let config_path = ServerConfig::resolve_path(config_name);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    // Verify configuration is valid.
    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = storeadmin_core::ServiceConfig {
        data_dir: Some(data_dir.clone()),
        listen: listen.to_string(),
        ..Default::default()
    };

    let sql: Arc<dyn SQLStore> = Arc::new(
        SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    let blob: Arc<dyn BlobStore> = Arc::new(
        FileStore::open(&core_config.resolve_blob_dir())
            .map_err(|e| anyhow::anyhow!("failed to open blob store: {}", e))?,
    );
    let assets = Arc::new(AssetStorage::new(blob, &server_config.storage.public_url));

    // Item-matching services.
    let endpoints = server_config
        .matching
        .services
        .iter()
        .map(|s| (s.name.as_str(), s.endpoint.as_str()));
    let item_services = ItemServices::from_endpoints(endpoints, server_config.matching_timeout())
        .map_err(|e| anyhow::anyhow!("failed to build item service clients: {}", e))?;
    info!("Item services: {:?}", item_services.names());

    let gateway = Gateway::new(sql)?;
    let service = CatalogService::new(
        gateway,
        Arc::clone(&assets),
        server_config.storage.image_bucket.clone(),
        item_services.names(),
    )?;
    let catalog = CatalogModule::new(service, item_services, server_config.outbox.to_config());
    catalog.start();
    info!("Catalog module initialized");

    let app_state = AppState {
        jwt_state: Arc::new(JwtState::from_secret(&server_config.jwt.secret)),
        server_config: Arc::new(server_config),
        assets,
    };
    let app = routes::build_router(app_state, vec![catalog.routes()]);

    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("storeadmind listening on {}", listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await?;

    catalog.shutdown();
    Ok(())
}
