use std::path::PathBuf;

use rds::RdsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
  #[error(transparent)]
  Rds(#[from] RdsError),
  #[error("invalid setting `{name}`: {reason}")]
  InvalidSetting { name: &'static str, reason: String },
  #[error("error writing {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("error serializing session snapshot: {0}")]
  Snapshot(#[from] serde_json::Error),
}

impl SessionError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    SessionError::Io {
      path: path.into(),
      source,
    }
  }
}
