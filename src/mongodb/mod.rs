use std::sync::Arc;

use mongodb::{Client, Database, options::ClientOptions};

use crate::config::MongoDbConfig;
use crate::store::Stores;

pub mod directory;
pub mod test_case;

pub use directory::{MongoDbCommentStore, MongoDbEnvironmentStore, MongoDbProjectStore};
pub use test_case::MongoDbTestCaseStore;

pub async fn db_client(name: String, conn_str: &str) -> anyhow::Result<Client> {
    let mut opts = ClientOptions::parse(conn_str).await?;
    opts.app_name = Some(name);

    Ok(Client::with_options(opts)?)
}

/// Builds the store bundle backed by the collections named in `cfg`.
pub fn stores(db: Database, cfg: &MongoDbConfig) -> Stores {
    Stores {
        test_cases: Arc::new(MongoDbTestCaseStore::new(db.clone(), cfg.test_cases.clone())),
        projects: Arc::new(MongoDbProjectStore::new(db.clone(), cfg.projects.clone())),
        environments: Arc::new(MongoDbEnvironmentStore::new(
            db.clone(),
            cfg.environments.clone(),
        )),
        comments: Arc::new(MongoDbCommentStore::new(db, cfg.comments.clone())),
    }
}
