use log::{error, info};
use service::{config::Config, logging::Logger};

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    let storage_config = config.storage();
    info!("Migrating {} storage...", storage_config.backend());

    match service::open_storage(&storage_config, &config.pool()).await {
        Ok(_) => info!("Storage is ready"),
        Err(e) => {
            error!("Failed to open storage: {e}");
            std::process::exit(1);
        }
    }
}
