use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::SandboxConfig;
use crate::store::{StoreError, Stores};
use crate::testcase::error::{EngineError, Result};
use crate::testcase::history::{self, RunRecord};
use crate::testcase::{NewTestCase, TestCase, TestCasePatch, TestCaseTemplate, TestCaseView, fanout};
use crate::testing::Evaluator;

/// Test case lifecycle on top of the configured stores.
pub struct TestCaseService {
    stores: Stores,
    sandbox: SandboxConfig,
}

impl TestCaseService {
    pub fn new(stores: Stores, sandbox: SandboxConfig) -> Self {
        Self { stores, sandbox }
    }

    pub async fn create(&self, definition: NewTestCase) -> Result<TestCase> {
        let test_case = definition.into_test_case()?;
        self.stores.test_cases.insert(&test_case).await?;

        info!(
            test_case_id = %test_case.id,
            project_id = %test_case.linked_project,
            environment_id = %test_case.environment,
            "test case created"
        );
        Ok(test_case)
    }

    /// Creates one copy of `template` per environment of the project.
    pub async fn create_for_all_environments(
        &self,
        project_id: &str,
        template: TestCaseTemplate,
    ) -> Result<Vec<TestCase>> {
        let project = self.stores.projects.get(project_id).await.map_err(|err| match err {
            StoreError::NotFound(_) => EngineError::ProjectNotFound(project_id.to_string()),
            other => EngineError::Store(other),
        })?;

        let test_cases = fanout::fan_out(&project, &template)?;
        for test_case in &test_cases {
            self.stores.test_cases.insert(test_case).await?;
        }

        info!(
            project_id,
            count = test_cases.len(),
            "test case created for all project environments"
        );
        Ok(test_cases)
    }

    /// Returns the test case with its comments, environment and project
    /// resolved. References that no longer resolve come back empty.
    pub async fn get(&self, id: &str) -> Result<TestCaseView> {
        let test_case = self.find(id).await?;

        let comments = self.stores.comments.get_many(&test_case.comments).await?;
        let environment = optional(self.stores.environments.get(&test_case.environment).await)?;
        let project = optional(self.stores.projects.get(&test_case.linked_project).await)?;

        Ok(TestCaseView {
            test_case,
            comments,
            environment,
            project,
        })
    }

    pub async fn list_by_project(&self, project_id: &str) -> Result<Vec<TestCase>> {
        Ok(self.stores.test_cases.list_by_project(project_id).await?)
    }

    pub async fn list_by_project_and_environment(
        &self,
        project_id: &str,
        environment_id: &str,
    ) -> Result<Vec<TestCase>> {
        Ok(self
            .stores
            .test_cases
            .list_by_project_and_environment(project_id, environment_id)
            .await?)
    }

    pub async fn update(&self, id: &str, patch: TestCasePatch) -> Result<TestCase> {
        let mut test_case = self.find(id).await?;
        patch.apply(&mut test_case)?;

        let stored = self
            .stores
            .test_cases
            .save(&test_case)
            .await
            .map_err(|err| test_case_error(id, err))?;

        info!(test_case_id = id, "test case updated");
        Ok(stored)
    }

    /// Evaluates the stored schema and appends the outcome to the run history.
    ///
    /// Failing and erroring runs are recorded like passing ones. A schema that
    /// does not validate aborts the run without a record.
    pub async fn run(&self, id: &str, initiated_by: &str) -> Result<TestCase> {
        let span = info_span!("run", test_case_id = id);

        async move {
            let test_case = self.find(id).await?;
            let root = test_case.schema()?;

            debug!(
                assertions = root.assertion_count(),
                depth = root.depth(),
                "evaluating test schema"
            );
            let outcome = Evaluator::new(&self.sandbox).evaluate(&root);

            let record = RunRecord::new(
                outcome,
                initiated_by,
                history::next_timestamp(&test_case.test_runs),
            );
            info!(status = %record.status, initiated_by, result = %record.result, "test case run finished");

            self.stores
                .test_cases
                .push_run(id, &record)
                .await
                .map_err(|err| test_case_error(id, err))
        }
        .instrument(span)
        .await
    }

    /// Deletes the test case and every comment it owns.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let test_case = self.find(id).await?;

        for comment_id in &test_case.comments {
            match self.stores.comments.delete(comment_id).await {
                Ok(()) => {}
                Err(StoreError::NotFound(_)) => {
                    warn!(test_case_id = id, comment_id = %comment_id, "owned comment already deleted");
                }
                Err(err) => return Err(err.into()),
            }
        }

        self.stores
            .test_cases
            .delete(id)
            .await
            .map_err(|err| test_case_error(id, err))?;

        info!(
            test_case_id = id,
            comments = test_case.comments.len(),
            "test case deleted"
        );
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<TestCase> {
        self.stores
            .test_cases
            .get(id)
            .await
            .map_err(|err| test_case_error(id, err))
    }
}

fn test_case_error(id: &str, err: StoreError) -> EngineError {
    match err {
        StoreError::NotFound(_) => EngineError::TestCaseNotFound(id.to_string()),
        other => EngineError::Store(other),
    }
}

fn optional<T>(result: std::result::Result<T, StoreError>) -> std::result::Result<Option<T>, StoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::project::{Comment, Environment, Project};
    use crate::schema::{NodeDocument, Param};
    use crate::store::{
        InMemoryCommentStore, InMemoryEnvironmentStore, InMemoryProjectStore, InMemoryTestCaseStore,
    };
    use crate::testing::RunStatus;

    fn service_with(comments: Arc<InMemoryCommentStore>) -> TestCaseService {
        let stores = Stores {
            test_cases: Arc::new(InMemoryTestCaseStore::new()),
            projects: Arc::new(InMemoryProjectStore::with_seed(vec![Project {
                id: "p1".to_string(),
                name: "shop".to_string(),
                environments: vec!["e1".to_string(), "e2".to_string()],
            }])),
            environments: Arc::new(InMemoryEnvironmentStore::with_seed(vec![Environment {
                id: "e1".to_string(),
                name: "staging".to_string(),
            }])),
            comments,
        };
        TestCaseService::new(stores, SandboxConfig::default())
    }

    fn service() -> TestCaseService {
        service_with(Arc::new(InMemoryCommentStore::new()))
    }

    fn new_test_case(schema: Option<NodeDocument>) -> NewTestCase {
        NewTestCase {
            name: "checkout".to_string(),
            environment: "e1".to_string(),
            linked_project: "p1".to_string(),
            test_schema: schema,
            comments: vec![],
        }
    }

    #[tokio::test]
    async fn run_records_failing_outcome() {
        let service = service();
        let schema = NodeDocument::suite(
            "S",
            vec![NodeDocument::test(
                "T",
                vec![
                    NodeDocument::expect(Param::callback("1 + 1")),
                    NodeDocument::equals(Param::value(3)),
                ],
            )],
        );
        let created = service.create(new_test_case(Some(schema))).await.unwrap();

        let updated = service.run(&created.id, "user-1").await.unwrap();

        assert_eq!(updated.recent_run, Some(RunStatus::Fail));
        assert_eq!(updated.test_runs.len(), 1);
        assert_eq!(updated.test_runs[0].initiated_by, "user-1");
        assert_eq!(updated.test_runs[0].result, "expected 3 but received 2");
    }

    #[tokio::test]
    async fn run_unknown_test_case_is_not_found() {
        let err = service().run("missing", "user-1").await.unwrap_err();
        assert!(matches!(err, EngineError::TestCaseNotFound(id) if id == "missing"));
    }

    #[tokio::test]
    async fn fan_out_to_unknown_project_fails() {
        let template = TestCaseTemplate {
            name: "x".to_string(),
            test_schema: None,
        };
        let err = service()
            .create_for_all_environments("nope", template)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn get_resolves_references_and_tolerates_missing_ones() {
        let comments = Arc::new(InMemoryCommentStore::with_seed(vec![Comment {
            id: "c1".to_string(),
            user_id: "u1".to_string(),
            body: "needs data".to_string(),
            replies: vec![],
        }]));
        let service = service_with(comments);
        let mut definition = new_test_case(None);
        definition.environment = "deleted-env".to_string();
        definition.comments = vec!["c1".to_string(), "c-gone".to_string()];
        let created = service.create(definition).await.unwrap();

        let view = service.get(&created.id).await.unwrap();

        assert_eq!(view.comments.len(), 1);
        assert!(view.environment.is_none());
        assert_eq!(view.project.map(|p| p.name), Some("shop".to_string()));
    }

    #[tokio::test]
    async fn delete_tolerates_already_deleted_comments() {
        let comments = Arc::new(InMemoryCommentStore::new());
        let service = service_with(comments.clone());
        let mut definition = new_test_case(None);
        definition.comments = vec!["c-gone".to_string()];
        let created = service.create(definition).await.unwrap();

        service.delete(&created.id).await.unwrap();

        assert!(matches!(
            service.get(&created.id).await,
            Err(EngineError::TestCaseNotFound(_))
        ));
    }
}
