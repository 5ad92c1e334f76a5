//! Read access to the project, environment and comment collections.

use std::collections::HashMap;

use async_trait::async_trait;
use mongodb::bson::doc;
use tokio_stream::StreamExt;

use crate::project::{Comment, Environment, Project};
use crate::store::{CommentStore, EnvironmentStore, ProjectStore, StoreError};

pub struct MongoDbProjectStore {
    db: mongodb::Database,
    collection_name: String,
}

impl MongoDbProjectStore {
    pub fn new(db: mongodb::Database, collection_name: String) -> Self {
        Self {
            db,
            collection_name,
        }
    }
}

#[async_trait]
impl ProjectStore for MongoDbProjectStore {
    async fn get(&self, id: &str) -> Result<Project, StoreError> {
        self.db
            .collection::<Project>(&self.collection_name)
            .find_one(doc! { "id": id })
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

pub struct MongoDbEnvironmentStore {
    db: mongodb::Database,
    collection_name: String,
}

impl MongoDbEnvironmentStore {
    pub fn new(db: mongodb::Database, collection_name: String) -> Self {
        Self {
            db,
            collection_name,
        }
    }
}

#[async_trait]
impl EnvironmentStore for MongoDbEnvironmentStore {
    async fn get(&self, id: &str) -> Result<Environment, StoreError> {
        self.db
            .collection::<Environment>(&self.collection_name)
            .find_one(doc! { "id": id })
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

pub struct MongoDbCommentStore {
    db: mongodb::Database,
    collection_name: String,
}

impl MongoDbCommentStore {
    pub fn new(db: mongodb::Database, collection_name: String) -> Self {
        Self {
            db,
            collection_name,
        }
    }

    fn collection(&self) -> mongodb::Collection<Comment> {
        self.db.collection(&self.collection_name)
    }
}

#[async_trait]
impl CommentStore for MongoDbCommentStore {
    async fn get_many(&self, ids: &[String]) -> Result<Vec<Comment>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let mut cursor = self
            .collection()
            .find(doc! { "id": { "$in": ids.to_vec() } })
            .await?;
        let mut by_id = HashMap::new();

        while let Some(comment) = cursor.try_next().await? {
            by_id.insert(comment.id.clone(), comment);
        }

        // $in does not preserve order
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = self.collection().delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}
