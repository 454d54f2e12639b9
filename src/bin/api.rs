use std::sync::Arc;

use lambda_runtime::{Error, run, service_fn};
use summarize::api::handler;
use summarize::core::config::AppConfig;
use summarize::core::state::AppState;
use tracing::error;

#[tokio::main]
async fn main() -> Result<(), Error> {
    summarize::setup_logging();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;
    let state = Arc::new(AppState::initialize(config).await.map_err(|e| {
        error!("Startup error: {}", e);
        Error::from(e)
    })?);

    run(service_fn(move |event| handler(Arc::clone(&state), event))).await
}
