use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::api::AppState;
use crate::api::error::ApiError;
use crate::api::types::{Message, RunRequest};
use crate::testcase::{NewTestCase, TestCasePatch, TestCaseTemplate};

/// POST /testcases
pub async fn create_test_case(
    State(state): State<AppState>,
    Json(definition): Json<NewTestCase>,
) -> Result<impl IntoResponse, ApiError> {
    let test_case = state.service.create(definition).await?;

    Ok((
        StatusCode::CREATED,
        Json(Message {
            message: "test case created".to_string(),
            item: Some(test_case),
        }),
    ))
}

/// POST /projects/{project_id}/testcases
pub async fn create_test_case_for_all_environments(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(template): Json<TestCaseTemplate>,
) -> Result<impl IntoResponse, ApiError> {
    let test_cases = state
        .service
        .create_for_all_environments(&project_id, template)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(Message {
            message: format!(
                "{} test cases created for project '{}'",
                test_cases.len(),
                project_id
            ),
            item: Some(test_cases),
        }),
    ))
}

/// GET /projects/{project_id}/testcases
pub async fn list_project_test_cases(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let test_cases = state.service.list_by_project(&project_id).await?;
    Ok((StatusCode::OK, Json(test_cases)))
}

/// GET /projects/{project_id}/environments/{environment_id}/testcases
pub async fn list_project_environment_test_cases(
    State(state): State<AppState>,
    Path((project_id, environment_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let test_cases = state
        .service
        .list_by_project_and_environment(&project_id, &environment_id)
        .await?;
    Ok((StatusCode::OK, Json(test_cases)))
}

/// GET /testcases/{id}
pub async fn get_test_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state.service.get(&id).await?;
    Ok((StatusCode::OK, Json(view)))
}

/// PATCH /testcases/{id}
pub async fn update_test_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TestCasePatch>,
) -> Result<impl IntoResponse, ApiError> {
    let test_case = state.service.update(&id, patch).await?;

    Ok((
        StatusCode::OK,
        Json(Message {
            message: "test case updated".to_string(),
            item: Some(test_case),
        }),
    ))
}

/// POST /testcases/{id}/run
pub async fn run_test_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RunRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let test_case = state.service.run(&id, &request.initiated_by).await?;
    let status = test_case
        .recent_run
        .map(|status| status.to_string())
        .unwrap_or_default();

    Ok((
        StatusCode::OK,
        Json(Message {
            message: format!("test case run finished: {}", status),
            item: Some(test_case),
        }),
    ))
}

/// DELETE /testcases/{id}
pub async fn delete_test_case(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.service.delete(&id).await?;

    Ok((
        StatusCode::OK,
        Json(Message::<()> {
            message: format!("test case '{}' deleted", id),
            item: None,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::to_bytes;
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::{LogsConfig, SandboxConfig};
    use crate::logs::LogBuffer;
    use crate::project::{Environment, Project};
    use crate::store::{
        InMemoryCommentStore, InMemoryEnvironmentStore, InMemoryProjectStore,
        InMemoryTestCaseStore, Stores,
    };
    use crate::testcase::TestCaseService;

    fn test_app() -> axum::Router {
        let stores = Stores {
            test_cases: Arc::new(InMemoryTestCaseStore::new()),
            projects: Arc::new(InMemoryProjectStore::with_seed(vec![Project {
                id: "p1".to_string(),
                name: "shop".to_string(),
                environments: vec!["e1".to_string(), "e2".to_string(), "e3".to_string()],
            }])),
            environments: Arc::new(InMemoryEnvironmentStore::with_seed(vec![Environment {
                id: "e1".to_string(),
                name: "staging".to_string(),
            }])),
            comments: Arc::new(InMemoryCommentStore::new()),
        };
        let service = Arc::new(TestCaseService::new(stores, SandboxConfig::default()));
        router(AppState::new(service, LogBuffer::new(100), LogsConfig::default()))
    }

    async fn response_json(resp: axum::response::Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(app: &axum::Router, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(path);
        if body.is_some() {
            req = req.header("content-type", "application/json");
        }
        let req = req
            .body(body.map(|b| b.to_string()).unwrap_or_default())
            .unwrap();

        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        (status, response_json(resp).await)
    }

    async fn create(app: &axum::Router, body: Value) -> String {
        let (status, json) = send(app, "POST", "/testcases", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        json["item"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn create_without_schema_uses_smoke_schema() {
        let app = test_app();
        let (status, json) = send(
            &app,
            "POST",
            "/testcases",
            Some(json!({"name": "login", "environment": "e1", "linkedProject": "p1"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["item"]["testSchema"]["kind"], "Suite");
        assert_eq!(json["item"]["testRuns"], json!([]));
        assert_eq!(json["item"]["recentRun"], Value::Null);
    }

    #[tokio::test]
    async fn create_with_malformed_schema_is_400() {
        let app = test_app();
        let (status, json) = send(
            &app,
            "POST",
            "/testcases",
            Some(json!({
                "name": "broken",
                "environment": "e1",
                "linkedProject": "p1",
                "testSchema": {"kind": "Equals", "params": [1]}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["message"].as_str().unwrap().contains("Equals"));
    }

    #[tokio::test]
    async fn get_returns_view_with_resolved_environment() {
        let app = test_app();
        let id = create(&app, json!({"name": "login", "environment": "e1", "linkedProject": "p1"})).await;

        let (status, json) = send(&app, "GET", &format!("/testcases/{id}"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["testCase"]["id"], id.as_str());
        assert_eq!(json["environment"]["name"], "staging");
        assert_eq!(json["project"]["name"], "shop");
        assert_eq!(json["comments"], json!([]));
    }

    #[tokio::test]
    async fn get_unknown_is_404() {
        let app = test_app();
        let (status, _) = send(&app, "GET", "/testcases/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn fan_out_creates_one_per_environment() {
        let app = test_app();
        let (status, json) = send(
            &app,
            "POST",
            "/projects/p1/testcases",
            Some(json!({"name": "checkout"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["item"].as_array().unwrap().len(), 3);

        let (_, listed) = send(&app, "GET", "/projects/p1/environments/e2/testcases", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["environment"], "e2");
    }

    #[tokio::test]
    async fn fan_out_unknown_project_is_404() {
        let app = test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/projects/nope/testcases",
            Some(json!({"name": "checkout"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn run_appends_record_and_reports_status() {
        let app = test_app();
        let id = create(
            &app,
            json!({
                "name": "math",
                "environment": "e1",
                "linkedProject": "p1",
                "testSchema": {
                    "kind": "Suite",
                    "params": ["S", {"script": "()"}],
                    "children": [{
                        "kind": "Test",
                        "params": ["T", {"script": "()"}],
                        "children": [
                            {"kind": "Expect", "params": [{"script": "1 + 1"}], "returns": "pipe"},
                            {"kind": "Equals", "params": [2]}
                        ]
                    }]
                }
            }),
        )
        .await;

        let (status, json) = send(
            &app,
            "POST",
            &format!("/testcases/{id}/run"),
            Some(json!({"initiatedBy": "user-1"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "test case run finished: pass");
        assert_eq!(json["item"]["recentRun"], "pass");
        assert_eq!(json["item"]["testRuns"][0]["initiatedBy"], "user-1");
    }

    #[tokio::test]
    async fn run_unknown_is_404() {
        let app = test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/testcases/missing/run",
            Some(json!({"initiatedBy": "user-1"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_updates_name() {
        let app = test_app();
        let id = create(&app, json!({"name": "login", "environment": "e1", "linkedProject": "p1"})).await;

        let (status, json) = send(
            &app,
            "PATCH",
            &format!("/testcases/{id}"),
            Some(json!({"name": "logout"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["item"]["name"], "logout");
        assert_eq!(json["item"]["environment"], "e1");
    }

    #[tokio::test]
    async fn delete_removes_test_case() {
        let app = test_app();
        let id = create(&app, json!({"name": "login", "environment": "e1", "linkedProject": "p1"})).await;

        let (status, _) = send(&app, "DELETE", &format!("/testcases/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "GET", &format!("/testcases/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_by_project_is_empty_for_unknown_project() {
        let app = test_app();
        let (status, json) = send(&app, "GET", "/projects/other/testcases", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([]));
    }
}
