use std::sync::Arc;

use tracing::info;

use casebench::api::{AppState, start_server};
use casebench::config::{Config, DEFAULT_CONFIG_PATH};
use casebench::logs::{LogBuffer, init_tracing};
use casebench::store::Stores;
use casebench::testcase::TestCaseService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    let log_buffer = LogBuffer::new(config.logs.buffer_capacity);
    let _log_guard = init_tracing(&config.logs, log_buffer.clone())?;
    info!(config_path = %config_path, port = config.server.port, "starting casebench");

    let stores = Stores::from_config(&config.storage).await?;
    let service = Arc::new(TestCaseService::new(stores, config.sandbox.clone()));

    let state = AppState::new(service, log_buffer, config.logs.clone());
    start_server(state, config.server.port).await
}
