use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::LogsConfig;
use crate::logs::LogBuffer;
use crate::testcase::TestCaseService;

pub(crate) mod error;
pub(crate) mod handler;
pub(crate) mod logs;
pub(crate) mod types;

use handler::{
    create_test_case, create_test_case_for_all_environments, delete_test_case, get_test_case,
    list_project_environment_test_cases, list_project_test_cases, run_test_case,
    update_test_case,
};

#[derive(Clone)]
pub struct AppState {
    pub(crate) service: Arc<TestCaseService>,
    pub(crate) log_buffer: LogBuffer,
    pub(crate) logs_config: LogsConfig,
}

impl AppState {
    pub fn new(service: Arc<TestCaseService>, log_buffer: LogBuffer, logs_config: LogsConfig) -> Self {
        Self {
            service,
            log_buffer,
            logs_config,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/testcases", post(create_test_case))
        .route(
            "/testcases/{id}",
            get(get_test_case)
                .patch(update_test_case)
                .delete(delete_test_case),
        )
        .route("/testcases/{id}/run", post(run_test_case))
        .route(
            "/projects/{project_id}/testcases",
            get(list_project_test_cases).post(create_test_case_for_all_environments),
        )
        .route(
            "/projects/{project_id}/environments/{environment_id}/testcases",
            get(list_project_environment_test_cases),
        )
        .route("/logs", get(logs::get_logs))
        .route("/logs/stream", get(logs::stream_logs))
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("unable to listen to shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
