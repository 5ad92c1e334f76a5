use thiserror::Error;

use crate::schema::SchemaError;
use crate::store::StoreError;

/// Failures that abort a test case operation. Failing or erroring tests are
/// not errors here; they end up in the run record.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Test case '{0}' not found")]
    TestCaseNotFound(String),

    #[error("Project '{0}' not found")]
    ProjectNotFound(String),

    #[error("Invalid test schema: {0}")]
    Validation(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
