use thiserror::Error;

/// A schema document that cannot be turned into an evaluable tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown node kind '{kind}' at {path}: not built in and no matching custom function")]
    UnknownKind { kind: String, path: String },

    #[error("'{kind}' at {path} expects {expected} params, got {found}")]
    ArityMismatch {
        kind: String,
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("'{kind}' at {path} requires a callback at param {position}")]
    MissingCallback {
        kind: String,
        path: String,
        position: usize,
    },

    #[error("'{kind}' at {path} requires a string description as its first param")]
    InvalidDescription { kind: String, path: String },

    #[error("'{kind}' at {path} pipes its result but is not followed by an Equals node")]
    UnpairedPipe { kind: String, path: String },

    #[error("Equals at {path} has no preceding Expect to compare against")]
    OrphanEquals { path: String },

    #[error("Expect at {path} must return the pipe-sentinel")]
    ExpectWithoutPipe { path: String },

    #[error("'{kind}' at {path} cannot return the pipe-sentinel")]
    UnexpectedPipe { kind: String, path: String },

    #[error("'{kind}' at {path} cannot have children")]
    UnexpectedChildren { kind: String, path: String },

    #[error("'{kind}' cannot be the root of a schema")]
    InvalidRoot { kind: String },
}
