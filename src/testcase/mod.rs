use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::project::{Comment, Environment, Project};
use crate::schema::{Node, NodeDocument, SchemaError};
use crate::testing::RunStatus;

pub mod error;
pub mod fanout;
pub mod history;
pub mod service;

pub use error::EngineError;
pub use history::RunRecord;
pub use service::TestCaseService;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub environment: String,
    pub linked_project: String,
    pub test_schema: NodeDocument,
    /// Newest first.
    #[serde(default)]
    pub test_runs: Vec<RunRecord>,
    #[serde(default)]
    pub recent_run: Option<RunStatus>,
    /// Owned comment ids, deleted together with the test case.
    #[serde(default)]
    pub comments: Vec<String>,
}

impl TestCase {
    /// Validates the stored schema and returns the evaluable tree.
    pub fn schema(&self) -> Result<Node, SchemaError> {
        Node::try_from(&self.test_schema)
    }
}

/// Payload for creating a single test case. A missing schema is replaced
/// with the smoke schema built from `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestCase {
    pub name: String,
    pub environment: String,
    pub linked_project: String,
    #[serde(default)]
    pub test_schema: Option<NodeDocument>,
    #[serde(default)]
    pub comments: Vec<String>,
}

impl NewTestCase {
    pub fn into_test_case(self) -> Result<TestCase, SchemaError> {
        let test_schema = self
            .test_schema
            .unwrap_or_else(|| NodeDocument::smoke(&self.name));
        Node::try_from(&test_schema)?;

        Ok(TestCase {
            id: Uuid::new_v4().to_string(),
            name: self.name,
            environment: self.environment,
            linked_project: self.linked_project,
            test_schema,
            test_runs: vec![],
            recent_run: None,
            comments: self.comments,
        })
    }
}

/// Payload replicated once per project environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseTemplate {
    pub name: String,
    #[serde(default)]
    pub test_schema: Option<NodeDocument>,
}

/// Shallow field overwrite. Run history is append-only and cannot be patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TestCasePatch {
    pub name: Option<String>,
    pub environment: Option<String>,
    pub linked_project: Option<String>,
    pub test_schema: Option<NodeDocument>,
    pub comments: Option<Vec<String>>,
}

impl TestCasePatch {
    pub fn apply(self, test_case: &mut TestCase) -> Result<(), SchemaError> {
        if let Some(schema) = &self.test_schema {
            Node::try_from(schema)?;
        }

        if let Some(name) = self.name {
            test_case.name = name;
        }
        if let Some(environment) = self.environment {
            test_case.environment = environment;
        }
        if let Some(linked_project) = self.linked_project {
            test_case.linked_project = linked_project;
        }
        if let Some(test_schema) = self.test_schema {
            test_case.test_schema = test_schema;
        }
        if let Some(comments) = self.comments {
            test_case.comments = comments;
        }

        Ok(())
    }
}

/// A test case joined with the documents it references, for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseView {
    pub test_case: TestCase,
    pub comments: Vec<Comment>,
    pub environment: Option<Environment>,
    pub project: Option<Project>,
}
