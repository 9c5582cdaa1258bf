//! Output layout for migrated posts.
//!
//! Every post lands in `<root>/<category>/<title>/` with its document file and an asset
//! directory beside it. Titles are stripped of characters that are unsafe in file names
//! before they become a path segment; categories are used as stored. Either one must
//! still name a single directory, so `.`, `..` and names containing separators are refused.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::PostError;

/// Characters removed from titles before they are used as a directory name.
pub const FORBIDDEN_TITLE_CHARS: [char; 9] = [':', '\\', '/', '*', '?', '"', '<', '>', '|'];

/// Strip path-unsafe characters from a title and trim surrounding whitespace.
///
/// A title made only of forbidden characters yields an empty segment, which places the
/// document directly in the category directory.
pub fn sanitize_title(title: &str) -> String {
  title
    .chars()
    .filter(|c| !FORBIDDEN_TITLE_CHARS.contains(c))
    .collect::<String>()
    .trim()
    .to_string()
}

/// Resolved on-disk locations for a single post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLayout {
  /// Directory holding the document and its assets.
  pub post_dir: PathBuf,
  /// Directory relocated assets are copied into.
  pub assets_dir: PathBuf,
  /// Path of the rendered document.
  pub document_path: PathBuf,
}

impl PostLayout {
  /// Derive the layout for a post from its primary category and raw title.
  pub fn resolve(
    output_root: &Path,
    category: &str,
    title: &str,
    images_dir: &str,
    document_file: &str,
  ) -> Result<Self, PostError> {
    let title = sanitize_title(title);
    let mut post_dir = output_root.join(single_segment(category)?);
    if !title.is_empty() {
      post_dir.push(single_segment(&title)?);
    }

    Ok(Self {
      assets_dir: post_dir.join(images_dir),
      document_path: post_dir.join(document_file),
      post_dir,
    })
  }

  /// Create the post directory. Existing directories are reused.
  pub fn ensure_post_dir(&self) -> Result<(), PostError> {
    fs::create_dir_all(&self.post_dir).map_err(|source| PostError::CreateDir {
      path: self.post_dir.clone(),
      source,
    })
  }
}

fn single_segment(segment: &str) -> Result<&str, PostError> {
  let mut components = Path::new(segment).components();
  match (components.next(), components.next()) {
    (Some(Component::Normal(_)), None) => Ok(segment),
    _ => Err(PostError::UnsafeSegment {
      segment: segment.to_string(),
    }),
  }
}
