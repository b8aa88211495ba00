use log::{error, info};
use mcwatch::Config;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            shutdown.cancel();
        }
    });

    if let Err(e) = mcwatch::monitor_server(&config, token).await {
        error!("Monitor failed: {e}");
        std::process::exit(1);
    }
}
