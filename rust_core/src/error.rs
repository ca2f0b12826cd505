// rust_core/src/error.rs
// One error type for the whole core. Most "failures" in this system are not
// errors at all (a missing card, an empty collection, no legal team); those are
// modelled as Option or defaults. What is left lands here.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("game client error: {0}")]
    Client(String),
}

impl CoreError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        CoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
