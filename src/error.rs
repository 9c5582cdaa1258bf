//! Errors that drop a single post from a migration run.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::SourceError;

/// Reasons a post could not be migrated. None of these stop the run.
#[derive(Debug, Error)]
pub enum PostError {
  /// The post's tags and categories could not be read.
  #[error("taxonomy lookup failed for post {post_id}")]
  Taxonomy {
    /// Post identifier.
    post_id: u64,
    /// Underlying data source error.
    #[source]
    source: SourceError,
  },
  /// The post has no category, so it has no output directory.
  #[error("post {post_id} has no category")]
  MissingCategory {
    /// Post identifier.
    post_id: u64,
  },
  /// An embedded upload could not be copied next to the document.
  #[error("failed to copy asset {} to {}", .source_path.display(), .destination.display())]
  AssetCopy {
    /// Upload path the body referenced.
    source_path: PathBuf,
    /// Destination inside the post's asset directory.
    destination: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// An output directory could not be created.
  #[error("failed to create directory {}", .path.display())]
  CreateDir {
    /// Directory that could not be created.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// The rendered document could not be written.
  #[error("failed to write document {}", .path.display())]
  WriteDocument {
    /// Document path.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// A category or title cannot be used as a single directory name.
  #[error("`{segment}` is not a usable directory name")]
  UnsafeSegment {
    /// Offending path segment.
    segment: String,
  },
  /// A stored timestamp cannot be represented as a date.
  #[error("post {post_id} has an out-of-range timestamp {seconds}")]
  Timestamp {
    /// Post identifier.
    post_id: u64,
    /// Offending epoch seconds.
    seconds: i64,
  },
}
