//! Records read from the blog database and the values produced while migrating them.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One blog entry as stored in the contents table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PostRecord {
  /// Unique, stable content identifier (`cid`).
  pub id: u64,
  /// Display title. May contain characters that are unsafe in paths.
  #[serde(default)]
  pub title: String,
  /// Slug stored alongside the post. Rendered documents use the identifier instead.
  #[serde(default)]
  pub slug: Option<String>,
  /// Creation time in epoch seconds.
  pub created: i64,
  /// Last modification time in epoch seconds.
  pub modified: i64,
  /// Mixed markdown/HTML body.
  #[serde(default)]
  pub text: String,
  /// Publication status.
  pub status: PostStatus,
  /// Content kind. Only posts and post drafts are migrated.
  pub kind: ContentKind,
}

impl PostRecord {
  /// A post is a draft when it is not published or when it is a saved draft revision.
  pub fn is_draft(&self) -> bool {
    self.status != PostStatus::Publish || self.kind == ContentKind::PostDraft
  }
}

/// Publication status of a post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum PostStatus {
  /// Publicly visible.
  Publish,
  /// Hidden from listings.
  Hidden,
  /// Visible to the author only.
  Private,
  /// Awaiting review.
  Waiting,
  /// Any other status value stored by the blog engine.
  Other(String),
}

impl PostStatus {
  /// Database spelling of the status.
  pub fn as_str(&self) -> &str {
    match self {
      Self::Publish => "publish",
      Self::Hidden => "hidden",
      Self::Private => "private",
      Self::Waiting => "waiting",
      Self::Other(value) => value,
    }
  }
}

impl From<String> for PostStatus {
  fn from(value: String) -> Self {
    match value.as_str() {
      "publish" => Self::Publish,
      "hidden" => Self::Hidden,
      "private" => Self::Private,
      "waiting" => Self::Waiting,
      _ => Self::Other(value),
    }
  }
}

impl From<PostStatus> for String {
  fn from(value: PostStatus) -> Self {
    value.as_str().to_string()
  }
}

impl fmt::Display for PostStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Kind of a row in the contents table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
  /// Regular post.
  Post,
  /// Draft revision of a post.
  PostDraft,
  /// Standalone page.
  Page,
  /// Draft revision of a page.
  PageDraft,
  /// Uploaded file record.
  Attachment,
}

impl ContentKind {
  /// Kinds the migration reads.
  pub const MIGRATED: [ContentKind; 2] = [ContentKind::Post, ContentKind::PostDraft];

  /// Database spelling of the kind.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Post => "post",
      Self::PostDraft => "post_draft",
      Self::Page => "page",
      Self::PageDraft => "page_draft",
      Self::Attachment => "attachment",
    }
  }
}

impl FromStr for ContentKind {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "post" => Ok(Self::Post),
      "post_draft" => Ok(Self::PostDraft),
      "page" => Ok(Self::Page),
      "page_draft" => Ok(Self::PageDraft),
      "attachment" => Ok(Self::Attachment),
      other => Err(other.to_string()),
    }
  }
}

/// Whether a taxonomy term is a tag or a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
  /// Free-form tag.
  Tag,
  /// Category. The first one attached to a post decides its output directory.
  Category,
}

impl TermKind {
  /// Database spelling of the kind.
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Tag => "tag",
      Self::Category => "category",
    }
  }
}

impl FromStr for TermKind {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value {
      "tag" => Ok(Self::Tag),
      "category" => Ok(Self::Category),
      other => Err(other.to_string()),
    }
  }
}

/// A tag or category from the metas table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaxonomyTerm {
  /// Term identifier (`mid`).
  pub id: u64,
  /// Display name.
  pub name: String,
  /// Tag or category.
  pub kind: TermKind,
  /// Parent term, if the term is nested. Only the direct name is used when migrating.
  #[serde(default)]
  pub parent: Option<u64>,
}

/// Tags and categories attached to one post, in association order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostTaxonomy {
  /// Tag names.
  pub tags: Vec<String>,
  /// Category names.
  pub categories: Vec<String>,
}

impl PostTaxonomy {
  /// Split a post's associated terms by kind, keeping their order.
  pub fn from_terms<'a>(terms: impl IntoIterator<Item = &'a TaxonomyTerm>) -> Self {
    let mut taxonomy = Self::default();
    for term in terms {
      match term.kind {
        TermKind::Tag => taxonomy.tags.push(term.name.clone()),
        TermKind::Category => taxonomy.categories.push(term.name.clone()),
      }
    }
    taxonomy
  }

  /// The category a post is filed under.
  pub fn primary_category(&self) -> Option<&str> {
    self.categories.first().map(String::as_str)
  }
}

/// Result of running one post through the pipeline.
#[derive(Debug, Clone)]
pub struct TransformedDocument {
  /// Path of the written document file.
  pub document_path: PathBuf,
  /// Asset files copied next to the document.
  pub assets: Vec<PathBuf>,
  /// Full rendered document text.
  pub rendered: String,
}

/// A post that was written successfully.
#[derive(Debug, Clone)]
pub struct MigratedPost {
  /// Post identifier.
  pub id: u64,
  /// Raw post title.
  pub title: String,
  /// Path of the written document.
  pub document_path: PathBuf,
  /// Number of relocated assets.
  pub asset_count: usize,
}

/// A post that was dropped from the run.
#[derive(Debug, Clone)]
pub struct SkippedPost {
  /// Post identifier.
  pub id: u64,
  /// Raw post title.
  pub title: String,
  /// Error chain explaining why the post was skipped.
  pub reason: String,
}

/// Outcome of a full migration run.
#[derive(Debug, Clone, Default)]
pub struct MigrationReport {
  /// Posts written, in processing order.
  pub migrated: Vec<MigratedPost>,
  /// Posts skipped, in processing order.
  pub skipped: Vec<SkippedPost>,
}

impl MigrationReport {
  /// Whether every post was migrated.
  pub fn is_clean(&self) -> bool {
    self.skipped.is_empty()
  }
}
