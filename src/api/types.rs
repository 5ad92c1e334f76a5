use serde::{Deserialize, Serialize};

#[derive(Serialize, Clone)]
pub struct Message<T> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<T>,
}

/// Body of `POST /testcases/{id}/run`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub initiated_by: String,
}
