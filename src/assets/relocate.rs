use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use same_file::is_same_file;
use tracing::debug;

use super::patterns::{ReferencePattern, absolute_upload_pattern, bare_upload_pattern};
use crate::error::PostError;

/// Body text after relocation together with the asset files it now depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocatedBody {
  /// Rewritten body.
  pub text: String,
  /// Asset files copied into the post's asset directory.
  pub assets: Vec<PathBuf>,
}

/// Copies uploads referenced by a post body next to the post and rewrites absolute links.
pub struct AssetRelocator<'a> {
  uploads_root: &'a Path,
  images_dir: &'a str,
  body_marker: &'a str,
  bare: &'a dyn ReferencePattern,
  absolute: &'a dyn ReferencePattern,
}

impl<'a> AssetRelocator<'a> {
  /// Create a relocator using the standard upload patterns.
  ///
  /// Bare upload paths are resolved against `uploads_root`. Rewritten links point at
  /// `<images_dir>/<file>`. The first occurrence of `body_marker` is removed from every
  /// body; an empty marker disables that step.
  pub fn new(uploads_root: &'a Path, images_dir: &'a str, body_marker: &'a str) -> Self {
    Self {
      uploads_root,
      images_dir,
      body_marker,
      bare: bare_upload_pattern(),
      absolute: absolute_upload_pattern(),
    }
  }

  /// Replace the patterns used to find bare and absolute references.
  pub fn with_patterns(
    mut self,
    bare: &'a dyn ReferencePattern,
    absolute: &'a dyn ReferencePattern,
  ) -> Self {
    self.bare = bare;
    self.absolute = absolute;
    self
  }

  /// Copy every bare upload into `assets_dir`, then point absolute upload URLs at the copies.
  ///
  /// Any failed copy aborts the post. Files copied before the failure are left in place.
  pub fn relocate(&self, body: &str, assets_dir: &Path) -> Result<RelocatedBody, PostError> {
    let assets = self.copy_bare_references(body, assets_dir)?;
    let text = self.rewrite_absolute_references(body);
    let text = if self.body_marker.is_empty() {
      text
    } else {
      text.replacen(self.body_marker, "", 1)
    };

    Ok(RelocatedBody { text, assets })
  }

  fn copy_bare_references(&self, body: &str, assets_dir: &Path) -> Result<Vec<PathBuf>, PostError> {
    let mut seen = BTreeSet::new();
    let mut copied = Vec::new();

    for reference in self.bare.find_references(body) {
      if !seen.insert(reference.matched) {
        continue;
      }

      let Some(name) = reference.asset_name() else {
        debug!(reference = reference.matched, "ignored upload outside its bucket");
        continue;
      };

      let source_path = self.uploads_root.join(reference.matched);
      let destination = assets_dir.join(name);
      copy_asset(&source_path, &destination).map_err(|source| PostError::AssetCopy {
        source_path: source_path.clone(),
        destination: destination.clone(),
        source,
      })?;
      debug!(
        source = %source_path.display(),
        destination = %destination.display(),
        "copied asset"
      );
      copied.push(destination);
    }

    Ok(copied)
  }

  fn rewrite_absolute_references(&self, body: &str) -> String {
    let mut text = body.to_string();
    let mut seen = BTreeSet::new();

    for reference in self.absolute.find_references(body) {
      if !seen.insert(reference.matched) {
        continue;
      }

      let Some(name) = reference.asset_name() else {
        continue;
      };

      let relative = format!("{}/{}", self.images_dir.trim_end_matches('/'), name);
      debug!(from = reference.matched, to = %relative, "rewrote asset link");
      text = text.replace(reference.matched, &relative);
    }

    text
  }
}

/// Copy `source` to `destination`, creating parent directories and overwriting stale copies.
fn copy_asset(source: &Path, destination: &Path) -> std::io::Result<()> {
  if let Some(parent) = destination.parent() {
    fs::create_dir_all(parent)?;
  }

  if destination.exists() && is_same_file(source, destination)? {
    return Ok(());
  }

  fs::copy(source, destination).map(|_| ())
}
