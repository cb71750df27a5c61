//! Error type for `lectern-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] lectern_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown proposal status: {0:?}")]
  UnknownStatus(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Domain outcomes pass through unchanged; everything else is an opaque
/// storage failure to the layers above.
impl From<Error> for lectern_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      other => lectern_core::Error::Storage(Box::new(other)),
    }
  }
}
