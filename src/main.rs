use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use questlog::config::{DB_FILE_NAME, ServerConfig};
use questlog::import::{CatalogFile, import_catalog};
use questlog::progress::ProgressEngine;
use questlog::server::{AppState, create_router};
use questlog::store::{SqliteStore, Store};
use questlog::types::ProgressKey;

#[derive(Parser)]
#[command(name = "questlog")]
#[command(about = "Game completion progress tracking server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Load users, games, additions and ownership from a TOML catalog
    Import {
        /// Catalog file to import
        file: PathBuf,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Recompute derived completion and status for one library entry
    Recalculate {
        #[arg(long)]
        user: String,

        #[arg(long)]
        game: String,

        #[arg(long)]
        platform: String,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags below override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

fn open_store(db_path: &Path) -> anyhow::Result<SqliteStore> {
    if !db_path.exists() {
        bail!(
            "Database not found at {}. Run 'questlog init' first.",
            db_path.display()
        );
    }
    Ok(SqliteStore::new(db_path)?)
}

fn run_init(data_dir: PathBuf) -> anyhow::Result<()> {
    fs::create_dir_all(&data_dir)?;

    let db_path = data_dir.join(DB_FILE_NAME);
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    println!("Initialized database at {}", db_path.display());
    Ok(())
}

fn run_import(file: PathBuf, data_dir: PathBuf) -> anyhow::Result<()> {
    let store = open_store(&data_dir.join(DB_FILE_NAME))?;
    let catalog = CatalogFile::load(&file)?;
    let summary = import_catalog(&store, catalog)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_recalculate(key: ProgressKey, data_dir: PathBuf) -> anyhow::Result<()> {
    let store = Arc::new(open_store(&data_dir.join(DB_FILE_NAME))?);

    if store.get_game(&key.game_id)?.is_none() {
        bail!("Game '{}' not found", key.game_id);
    }
    if store.get_platform(&key.platform_id)?.is_none() {
        bail!("Platform '{}' not found", key.platform_id);
    }

    let engine = ProgressEngine::from_store(store);
    let result = engine.recalculate(&key)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn run_serve(
    config_file: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = match config_file {
        Some(path) => ServerConfig::from_file(&path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }

    let store = open_store(&config.db_path())?;
    store.initialize()?;

    let state = Arc::new(AppState::new(Arc::new(store)));
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("questlog=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => run_init(data_dir)?,
        Commands::Import { file, data_dir } => run_import(file, data_dir)?,
        Commands::Recalculate {
            user,
            game,
            platform,
            data_dir,
        } => run_recalculate(ProgressKey::new(user, game, platform), data_dir)?,
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
        } => run_serve(config, host, port, data_dir).await?,
    }

    Ok(())
}
