//! Macro-relay: replay recorded input macros on request from remote clients.

mod config;
mod error;
mod server;
#[cfg(test)]
mod tests;

pub(crate) use error::{AppError, Result as AppResult};

use crate::{
    config::Config,
    server::{ConsoleAuthorizer, Server, enigo_injector_factory},
};

use std::sync::Arc;

use macro_relay_core::MacroStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "macro_relay=debug,macro_relay_core=debug";

/// Application entry point.
fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:?}", e);
            std::process::exit(1);
        }
    };

    let store = match MacroStore::open(&config.storage.macros_dir) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to open macro store: {:?}", e);
            std::process::exit(1);
        }
    };

    // One thread drives every socket; macro runs go to the blocking pool.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {:?}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve(config, store)) {
        error!(error = ?e, "Server error");
        std::process::exit(1);
    }

    info!("Macro-relay shut down successfully");
}

async fn serve(config: Config, store: MacroStore) -> AppResult<()> {
    let server = Server::bind(
        config.server,
        store,
        Arc::new(ConsoleAuthorizer),
        enigo_injector_factory(),
    )
    .await?;

    info!(addr = %server.local_addr()?, "Server listening");

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Cannot listen for ctrl-c, running until killed");
                std::future::pending::<()>().await;
            }
        })
        .await
}
