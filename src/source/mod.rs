//! Read-only access to the blog database.
//!
//! The migration only needs three queries, captured by [`ContentSource`]. [`MysqlSource`]
//! talks to a live Typecho database; [`SnapshotSource`] serves the same rows from memory
//! or from a JSON dump.

mod mysql;
mod snapshot;

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{PostRecord, TaxonomyTerm};

pub use mysql::MysqlSource;
pub use snapshot::{Association, SnapshotSource};

/// Queries the migration issues against the blog database.
pub trait ContentSource {
  /// Every category term.
  fn list_categories(&self) -> Result<Vec<TaxonomyTerm>, SourceError>;

  /// Every post and post draft, newest first.
  fn list_posts(&self) -> Result<Vec<PostRecord>, SourceError>;

  /// Tags and categories linked to a post, ordered by term identifier.
  fn list_associations(&self, post_id: u64) -> Result<Vec<TaxonomyTerm>, SourceError>;
}

/// Errors raised while reading from a [`ContentSource`].
#[derive(Debug, Error)]
pub enum SourceError {
  /// The database rejected a query or the connection failed.
  #[error("database query failed")]
  Query(#[from] sqlx::Error),
  /// A row held a value the migration does not understand.
  #[error("unexpected {column} value `{value}` in row {id}")]
  Decode {
    /// Column that held the value.
    column: &'static str,
    /// Offending value.
    value: String,
    /// Row identifier.
    id: u64,
  },
  /// The table prefix contains characters that are not allowed in table names.
  #[error("invalid table prefix `{0}`")]
  InvalidPrefix(String),
  /// The async runtime backing the database driver could not be started.
  #[error("failed to start database runtime")]
  Runtime(#[source] std::io::Error),
  /// A snapshot file could not be read.
  #[error("failed to read snapshot {}", .path.display())]
  SnapshotRead {
    /// Snapshot path.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// A snapshot file is not valid JSON.
  #[error("failed to parse snapshot {}", .path.display())]
  SnapshotParse {
    /// Snapshot path.
    path: PathBuf,
    /// Underlying parse error.
    #[source]
    source: serde_json::Error,
  },
}
