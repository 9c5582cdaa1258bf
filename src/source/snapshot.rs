//! In-memory content source, optionally loaded from a JSON dump of the blog tables.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ContentSource, SourceError};
use crate::models::{ContentKind, PostRecord, TaxonomyTerm, TermKind};

/// Link between a post and a taxonomy term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Association {
  /// Post identifier.
  pub post_id: u64,
  /// Term identifier.
  pub term_id: u64,
}

/// Rows of the contents, metas and relationships tables held in memory.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SnapshotSource {
  /// Every taxonomy term.
  #[serde(default)]
  pub terms: Vec<TaxonomyTerm>,
  /// Every content row, including kinds that are not migrated.
  #[serde(default)]
  pub posts: Vec<PostRecord>,
  /// Post to term links.
  #[serde(default)]
  pub associations: Vec<Association>,
}

impl SnapshotSource {
  /// Load a snapshot from a JSON file.
  pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| SourceError::SnapshotRead {
      path: path.to_path_buf(),
      source,
    })?;

    serde_json::from_str(&contents).map_err(|source| SourceError::SnapshotParse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Add a term.
  pub fn with_term(mut self, term: TaxonomyTerm) -> Self {
    self.terms.push(term);
    self
  }

  /// Add a content row.
  pub fn with_post(mut self, post: PostRecord) -> Self {
    self.posts.push(post);
    self
  }

  /// Link a post to a term.
  pub fn with_association(mut self, post_id: u64, term_id: u64) -> Self {
    self.associations.push(Association { post_id, term_id });
    self
  }
}

impl ContentSource for SnapshotSource {
  fn list_categories(&self) -> Result<Vec<TaxonomyTerm>, SourceError> {
    Ok(
      self
        .terms
        .iter()
        .filter(|term| term.kind == TermKind::Category)
        .cloned()
        .collect(),
    )
  }

  fn list_posts(&self) -> Result<Vec<PostRecord>, SourceError> {
    let mut posts: Vec<PostRecord> = self
      .posts
      .iter()
      .filter(|post| ContentKind::MIGRATED.contains(&post.kind))
      .cloned()
      .collect();
    posts.sort_by(|a, b| b.created.cmp(&a.created));
    Ok(posts)
  }

  fn list_associations(&self, post_id: u64) -> Result<Vec<TaxonomyTerm>, SourceError> {
    let mut terms: Vec<TaxonomyTerm> = self
      .associations
      .iter()
      .filter(|link| link.post_id == post_id)
      .filter_map(|link| self.terms.iter().find(|term| term.id == link.term_id))
      .cloned()
      .collect();
    terms.sort_by_key(|term| term.id);
    Ok(terms)
  }
}
