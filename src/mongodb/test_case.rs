use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc, to_bson};
use mongodb::options::ReturnDocument;
use serde::Serialize;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::store::{StoreError, TestCaseStore};
use crate::testcase::history::restamp;
use crate::testcase::{RunRecord, TestCase};

const MAX_PUSH_ATTEMPTS: usize = 16;

fn bson_of<T: Serialize>(value: &T) -> Result<Bson, StoreError> {
    to_bson(value).map_err(|e| StoreError::Other(e.to_string()))
}

pub struct MongoDbTestCaseStore {
    db: mongodb::Database,
    collection_name: String,
}

impl MongoDbTestCaseStore {
    pub fn new(db: mongodb::Database, collection_name: String) -> Self {
        Self {
            db,
            collection_name,
        }
    }

    fn collection(&self) -> mongodb::Collection<TestCase> {
        self.db.collection(&self.collection_name)
    }

    async fn find_all(&self, filter: Document) -> Result<Vec<TestCase>, StoreError> {
        let mut cursor = self
            .collection()
            .find(filter)
            .sort(doc! { "_id": 1 })
            .await?;
        let mut test_cases = Vec::new();

        while let Some(test_case) = cursor.try_next().await? {
            test_cases.push(test_case);
        }

        Ok(test_cases)
    }
}

#[async_trait]
impl TestCaseStore for MongoDbTestCaseStore {
    async fn get(&self, id: &str) -> Result<TestCase, StoreError> {
        self.collection()
            .find_one(doc! { "id": id })
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn insert(&self, test_case: &TestCase) -> Result<(), StoreError> {
        self.collection().insert_one(test_case).await?;
        Ok(())
    }

    async fn save(&self, test_case: &TestCase) -> Result<TestCase, StoreError> {
        // run history is only ever written by push_run
        let update = doc! {
            "$set": {
                "name": test_case.name.as_str(),
                "environment": test_case.environment.as_str(),
                "linkedProject": test_case.linked_project.as_str(),
                "testSchema": bson_of(&test_case.test_schema)?,
                "comments": bson_of(&test_case.comments)?,
            }
        };

        self.collection()
            .find_one_and_update(doc! { "id": &test_case.id }, update)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| StoreError::NotFound(test_case.id.clone()))
    }

    async fn push_run(&self, id: &str, record: &RunRecord) -> Result<TestCase, StoreError> {
        for _ in 0..MAX_PUSH_ATTEMPTS {
            let current = self.get(id).await?;
            let newest = current.test_runs.first();

            let mut record = record.clone();
            restamp(&mut record, newest);

            // only commits if no other run landed since `current` was read
            let filter = match newest {
                Some(newest) => doc! {
                    "id": id,
                    "testRuns.0.createdAt": bson_of(&newest.created_at)?,
                },
                None => doc! { "id": id, "testRuns.0": { "$exists": false } },
            };
            let update = doc! {
                "$push": { "testRuns": { "$each": [bson_of(&record)?], "$position": 0 } },
                "$set": { "recentRun": bson_of(&record.status)? },
            };

            let updated = self
                .collection()
                .find_one_and_update(filter, update)
                .return_document(ReturnDocument::After)
                .await?;
            if let Some(updated) = updated {
                return Ok(updated);
            }
            debug!(test_case_id = id, "run history changed underneath, retrying");
        }

        Err(StoreError::Other(format!(
            "test case '{}' run history kept changing, gave up after {} attempts",
            id, MAX_PUSH_ATTEMPTS
        )))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = self.collection().delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_by_project(&self, project_id: &str) -> Result<Vec<TestCase>, StoreError> {
        self.find_all(doc! { "linkedProject": project_id }).await
    }

    async fn list_by_project_and_environment(
        &self,
        project_id: &str,
        environment_id: &str,
    ) -> Result<Vec<TestCase>, StoreError> {
        self.find_all(doc! { "linkedProject": project_id, "environment": environment_id })
            .await
    }
}
