use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not find config file at given path ({0})")]
    ConfigNotFound(PathBuf),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("\"{0}\" is not a valid ip address")]
    InvalidAddress(String),

    #[error("query port is required but missing, please provide it using --query-port")]
    QueryPortRequired,

    #[error("failed to fetch bot names: {0}")]
    NameFetch(String),

    #[error("failed to fetch bot names, server responded with HTTP/{0}")]
    NameApiStatus(u16),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("mysql: {0}")]
    MySql(#[from] sqlx::Error),

    #[error("failed to read password: {0}")]
    Prompt(#[source] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
