use tracing::{error, info};

use filedepot::file::FileStorage;
use filedepot::{Config, Database, FileRepository, FileService, WebServer};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = filedepot::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        filedepot::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> filedepot::Result<()> {
    config.validate()?;

    info!("filedepot starting");

    let db = Database::open(&config.database.path, config.database.max_connections).await?;
    let storage = FileStorage::new(&config.files.storage_path)
        .await
        .map_err(|e| filedepot::DepotError::Config(format!("storage directory: {e}")))?;
    info!("File storage initialized at: {}", config.files.storage_path);

    let files = FileService::new(
        FileRepository::new(db.pool().clone()),
        storage,
        config.files.max_file_size,
    );

    WebServer::new(&config.server, files)?.run().await?;

    Ok(())
}
