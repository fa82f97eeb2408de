//! Error taxonomy for `opcon-core`.
//!
//! Every backend failure is translated into one of these kinds before it
//! crosses the store trait boundary; nothing here is fatal to the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("an active scenario named {0:?} already exists")]
  DuplicateName(String),

  #[error("not found: {0}")]
  NotFound(i64),

  #[error("a scenario must contain at least one drone")]
  EmptyDroneList,

  #[error("malformed input: {0}")]
  MalformedInput(String),

  #[error("storage failure: {0}")]
  Storage(String),

  #[error("filesystem failure: {0}")]
  Filesystem(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
