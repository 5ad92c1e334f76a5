use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CommentStore, EnvironmentStore, ProjectStore, StoreError, TestCaseStore};
use crate::project::{Comment, Environment, Project};
use crate::testcase::history::record_run;
use crate::testcase::{RunRecord, TestCase};

/// Keeps test cases in insertion order so listings are stable.
#[derive(Default)]
pub struct InMemoryTestCaseStore {
    test_cases: RwLock<Vec<TestCase>>,
}

impl InMemoryTestCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(test_cases: Vec<TestCase>) -> Self {
        Self {
            test_cases: RwLock::new(test_cases),
        }
    }

    pub async fn len(&self) -> usize {
        self.test_cases.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.test_cases.read().await.is_empty()
    }
}

#[async_trait]
impl TestCaseStore for InMemoryTestCaseStore {
    async fn get(&self, id: &str) -> Result<TestCase, StoreError> {
        self.test_cases
            .read()
            .await
            .iter()
            .find(|tc| tc.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, test_case: &TestCase) -> Result<(), StoreError> {
        let mut test_cases = self.test_cases.write().await;
        if test_cases.iter().any(|tc| tc.id == test_case.id) {
            return Err(StoreError::Other(format!(
                "test case '{}' already exists",
                test_case.id
            )));
        }
        test_cases.push(test_case.clone());
        Ok(())
    }

    async fn save(&self, test_case: &TestCase) -> Result<TestCase, StoreError> {
        let mut test_cases = self.test_cases.write().await;
        let existing = test_cases
            .iter_mut()
            .find(|tc| tc.id == test_case.id)
            .ok_or_else(|| StoreError::NotFound(test_case.id.clone()))?;

        existing.name = test_case.name.clone();
        existing.environment = test_case.environment.clone();
        existing.linked_project = test_case.linked_project.clone();
        existing.test_schema = test_case.test_schema.clone();
        existing.comments = test_case.comments.clone();
        Ok(existing.clone())
    }

    async fn push_run(&self, id: &str, record: &RunRecord) -> Result<TestCase, StoreError> {
        let mut test_cases = self.test_cases.write().await;
        let test_case = test_cases
            .iter_mut()
            .find(|tc| tc.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record_run(test_case, record.clone());
        Ok(test_case.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut test_cases = self.test_cases.write().await;
        let before = test_cases.len();
        test_cases.retain(|tc| tc.id != id);
        if test_cases.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<TestCase>, StoreError> {
        Ok(self
            .test_cases
            .read()
            .await
            .iter()
            .filter(|tc| tc.linked_project == project_id)
            .cloned()
            .collect())
    }

    async fn list_by_project_and_environment(
        &self,
        project_id: &str,
        environment_id: &str,
    ) -> Result<Vec<TestCase>, StoreError> {
        Ok(self
            .test_cases
            .read()
            .await
            .iter()
            .filter(|tc| tc.linked_project == project_id && tc.environment == environment_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<String, Project>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(projects: Vec<Project>) -> Self {
        Self {
            projects: RwLock::new(projects.into_iter().map(|p| (p.id.clone(), p)).collect()),
        }
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn get(&self, id: &str) -> Result<Project, StoreError> {
        self.projects
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[derive(Default)]
pub struct InMemoryEnvironmentStore {
    environments: RwLock<HashMap<String, Environment>>,
}

impl InMemoryEnvironmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(environments: Vec<Environment>) -> Self {
        Self {
            environments: RwLock::new(
                environments.into_iter().map(|e| (e.id.clone(), e)).collect(),
            ),
        }
    }
}

#[async_trait]
impl EnvironmentStore for InMemoryEnvironmentStore {
    async fn get(&self, id: &str) -> Result<Environment, StoreError> {
        self.environments
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

#[derive(Default)]
pub struct InMemoryCommentStore {
    comments: RwLock<HashMap<String, Comment>>,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(comments: Vec<Comment>) -> Self {
        Self {
            comments: RwLock::new(comments.into_iter().map(|c| (c.id.clone(), c)).collect()),
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.comments.read().await.contains_key(id)
    }
}

#[async_trait]
impl CommentStore for InMemoryCommentStore {
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Comment>, StoreError> {
        let comments = self.comments.read().await;
        Ok(ids.iter().filter_map(|id| comments.get(id).cloned()).collect())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.comments
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
