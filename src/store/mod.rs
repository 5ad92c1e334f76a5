use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::project::{Comment, Environment, Project};
use crate::testcase::{RunRecord, TestCase};

pub mod in_memory;

pub use in_memory::{
    InMemoryCommentStore, InMemoryEnvironmentStore, InMemoryProjectStore, InMemoryTestCaseStore,
};

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("MongoDB error: {0}")]
    MongoDb(#[from] mongodb::error::Error),
    #[error("{0}")]
    Other(String),
}

pub type DynTestCaseStore = Arc<dyn TestCaseStore + Send + Sync>;
pub type DynProjectStore = Arc<dyn ProjectStore + Send + Sync>;
pub type DynEnvironmentStore = Arc<dyn EnvironmentStore + Send + Sync>;
pub type DynCommentStore = Arc<dyn CommentStore + Send + Sync>;

#[async_trait]
pub trait TestCaseStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<TestCase, StoreError>;
    async fn insert(&self, test_case: &TestCase) -> Result<(), StoreError>;
    /// Overwrites the editable fields of an existing test case. `testRuns` and
    /// `recentRun` keep their stored values. Returns the stored test case.
    async fn save(&self, test_case: &TestCase) -> Result<TestCase, StoreError>;
    /// Atomically prepends `record` to `testRuns` and sets `recentRun`,
    /// returning the updated test case.
    async fn push_run(&self, id: &str, record: &RunRecord) -> Result<TestCase, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
    async fn list_by_project(&self, project_id: &str) -> Result<Vec<TestCase>, StoreError>;
    async fn list_by_project_and_environment(
        &self,
        project_id: &str,
        environment_id: &str,
    ) -> Result<Vec<TestCase>, StoreError>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Project, StoreError>;
}

#[async_trait]
pub trait EnvironmentStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Environment, StoreError>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Comments for `ids`, in the same order. Unknown ids are skipped.
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Comment>, StoreError>;
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Every store the test case service reads or writes.
#[derive(Clone)]
pub struct Stores {
    pub test_cases: DynTestCaseStore,
    pub projects: DynProjectStore,
    pub environments: DynEnvironmentStore,
    pub comments: DynCommentStore,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            test_cases: Arc::new(InMemoryTestCaseStore::new()),
            projects: Arc::new(InMemoryProjectStore::new()),
            environments: Arc::new(InMemoryEnvironmentStore::new()),
            comments: Arc::new(InMemoryCommentStore::new()),
        }
    }

    pub async fn from_config(config: &StorageConfig) -> anyhow::Result<Self> {
        match config {
            StorageConfig::InMemory => Ok(Self::in_memory()),
            StorageConfig::MongoDb(cfg) => {
                let client = crate::mongodb::db_client("casebench".to_string(), &cfg.connection)
                    .await
                    .context("failed to create MongoDB client")?;
                Ok(crate::mongodb::stores(client.database(&cfg.db_name), cfg))
            }
        }
    }
}
