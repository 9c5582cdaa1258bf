//! Migration driver: reads every post, transforms it and writes it to the content tree.

use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::assets::AssetRelocator;
use crate::config::MigrationConfig;
use crate::error::PostError;
use crate::front_matter::{FrontMatter, TimestampZone, write_document};
use crate::layout::PostLayout;
use crate::models::{
  MigratedPost, MigrationReport, PostRecord, PostTaxonomy, SkippedPost, TransformedDocument,
};
use crate::source::ContentSource;

/// Runs posts through relocation, layout and front matter rendering.
pub struct Migrator<'a> {
  config: &'a MigrationConfig,
  zone: TimestampZone,
}

impl<'a> Migrator<'a> {
  /// Create a migrator for the provided configuration.
  pub fn new(config: &'a MigrationConfig) -> Result<Self> {
    Ok(Self {
      zone: config.timestamp_zone()?,
      config,
    })
  }

  /// Migrate every post the source returns.
  ///
  /// Failing to list categories or posts aborts the run. Anything that goes wrong with a
  /// single post is logged and recorded in the report, and the run moves on.
  pub fn run<S: ContentSource>(&self, source: &S) -> Result<MigrationReport> {
    let categories = source
      .list_categories()
      .context("failed to list categories")?;
    info!(count = categories.len(), "loaded categories");

    let output_root = &self.config.output_root;
    fs::create_dir_all(output_root)
      .with_context(|| format!("failed to create {}", output_root.display()))?;

    let posts = source.list_posts().context("failed to list posts")?;
    info!(count = posts.len(), "loaded posts");

    let mut report = MigrationReport::default();
    for (index, post) in posts.iter().enumerate() {
      let outcome = source
        .list_associations(post.id)
        .map_err(|err| PostError::Taxonomy { post_id: post.id, source: err })
        .and_then(|terms| self.migrate_post(post, &PostTaxonomy::from_terms(&terms)));

      match outcome {
        Ok(document) => {
          info!(
            index,
            id = post.id,
            title = %post.title,
            path = %document.document_path.display(),
            assets = document.assets.len(),
            "migrated post"
          );
          report.migrated.push(MigratedPost {
            id: post.id,
            title: post.title.clone(),
            document_path: document.document_path,
            asset_count: document.assets.len(),
          });
        }
        Err(err) => {
          let reason = format!("{:#}", anyhow::Error::new(err));
          warn!(index, id = post.id, title = %post.title, %reason, "skipped post");
          report.skipped.push(SkippedPost {
            id: post.id,
            title: post.title.clone(),
            reason,
          });
        }
      }
    }

    info!(
      migrated = report.migrated.len(),
      skipped = report.skipped.len(),
      "migration finished"
    );
    Ok(report)
  }

  /// Transform a single post and write its document and assets.
  pub fn migrate_post(
    &self,
    post: &PostRecord,
    taxonomy: &PostTaxonomy,
  ) -> Result<TransformedDocument, PostError> {
    let category = taxonomy
      .primary_category()
      .ok_or(PostError::MissingCategory { post_id: post.id })?;
    let front = FrontMatter::from_post(post, taxonomy, self.zone)?;

    let layout = PostLayout::resolve(
      &self.config.output_root,
      category,
      &post.title,
      &self.config.images_dir,
      &self.config.document_file,
    )?;
    layout.ensure_post_dir()?;

    let relocator = AssetRelocator::new(
      &self.config.uploads_root,
      &self.config.images_dir,
      &self.config.body_marker,
    );
    let body = relocator.relocate(&post.text, &layout.assets_dir)?;

    let rendered = self.config.document_template().render(&front, &body.text);
    write_document(&layout.document_path, &rendered)?;

    Ok(TransformedDocument {
      document_path: layout.document_path,
      assets: body.assets,
      rendered,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{ContentKind, PostStatus, TaxonomyTerm, TermKind};
  use crate::source::{SnapshotSource, SourceError};
  use std::path::Path;
  use tempfile::tempdir;

  fn config(root: &Path) -> MigrationConfig {
    MigrationConfig {
      output_root: root.join("content/posts"),
      uploads_root: root.to_path_buf(),
      utc_offset: Some("+00:00".into()),
      ..MigrationConfig::default()
    }
  }

  fn post(id: u64, title: &str, created: i64, text: &str) -> PostRecord {
    PostRecord {
      id,
      title: title.into(),
      slug: Some(format!("stored-{id}")),
      created,
      modified: created,
      text: text.into(),
      status: PostStatus::Publish,
      kind: ContentKind::Post,
    }
  }

  fn term(id: u64, name: &str, kind: TermKind) -> TaxonomyTerm {
    TaxonomyTerm { id, name: name.into(), kind, parent: None }
  }

  fn write_upload(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
  }

  fn example_source() -> SnapshotSource {
    SnapshotSource::default()
      .with_term(term(1, "Tech", TermKind::Category))
      .with_term(term(2, "rust", TermKind::Tag))
      .with_post(post(
        42,
        "Hello/World",
        1_700_000_000,
        "<!--markdown-->see usr/uploads/2024/01/x.png",
      ))
      .with_association(42, 1)
  }

  #[test]
  fn migrates_post_into_category_and_title_directory() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write_upload(root, "usr/uploads/2024/01/x.png", b"image");
    let config = config(root);

    let report = Migrator::new(&config).unwrap().run(&example_source()).unwrap();

    let post_dir = root.join("content/posts/Tech/HelloWorld");
    assert!(report.is_clean());
    assert_eq!(report.migrated.len(), 1);
    assert_eq!(report.migrated[0].document_path, post_dir.join("index.md"));
    assert_eq!(report.migrated[0].asset_count, 1);

    let document = fs::read_to_string(post_dir.join("index.md")).unwrap();
    assert!(document.contains("\nslug: 42\n"));
    assert!(document.contains("\ndraft: false\n"));
    assert!(document.contains("\ntitle: \"Hello/World\"\n"));
    assert!(document.contains("\ncategories: [\"Tech\"]\n"));
    assert!(document.contains("\ntags: []\n"));
    assert!(document.ends_with("<!--more-->\nsee usr/uploads/2024/01/x.png\n"));
    assert_eq!(fs::read(post_dir.join("images/x.png")).unwrap(), b"image");
  }

  #[test]
  fn rerunning_produces_identical_output() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write_upload(root, "usr/uploads/2024/01/x.png", b"image");
    let config = config(root);
    let source = example_source();
    let migrator = Migrator::new(&config).unwrap();
    let document_path = root.join("content/posts/Tech/HelloWorld/index.md");
    let asset_path = root.join("content/posts/Tech/HelloWorld/images/x.png");

    migrator.run(&source).unwrap();
    let first = (fs::read(&document_path).unwrap(), fs::read(&asset_path).unwrap());
    migrator.run(&source).unwrap();
    let second = (fs::read(&document_path).unwrap(), fs::read(&asset_path).unwrap());

    assert_eq!(first, second);
  }

  #[test]
  fn absolute_links_are_rewritten_in_written_document() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write_upload(root, "wp-content/uploads/2020/05/shot.jpeg", b"jpeg");
    let config = config(root);
    let source = SnapshotSource::default()
      .with_term(term(1, "Notes", TermKind::Category))
      .with_post(post(
        7,
        "Shots",
        1_600_000_000,
        "![s](https://blog.example.com/wp-content/uploads/2020/05/shot.jpeg)",
      ))
      .with_association(7, 1);

    Migrator::new(&config).unwrap().run(&source).unwrap();

    let post_dir = root.join("content/posts/Notes/Shots");
    let document = fs::read_to_string(post_dir.join("index.md")).unwrap();
    assert!(document.contains("![s](images/shot.jpeg)"));
    assert!(!document.contains("blog.example.com"));
    assert!(post_dir.join("images/shot.jpeg").exists());
  }

  #[test]
  fn post_without_category_is_skipped_and_run_continues() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let config = config(root);
    let source = SnapshotSource::default()
      .with_term(term(1, "Tech", TermKind::Category))
      .with_term(term(2, "rust", TermKind::Tag))
      .with_post(post(1, "Orphan", 200, "text"))
      .with_post(post(2, "Filed", 100, "text"))
      .with_association(1, 2)
      .with_association(2, 1);

    let report = Migrator::new(&config).unwrap().run(&source).unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, 1);
    assert_eq!(report.skipped[0].reason, "post 1 has no category");
    assert_eq!(report.migrated.len(), 1);
    assert!(root.join("content/posts/Tech/Filed/index.md").exists());
  }

  #[test]
  fn missing_asset_skips_only_that_post() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let config = config(root);
    let source = SnapshotSource::default()
      .with_term(term(1, "Tech", TermKind::Category))
      .with_post(post(1, "Good", 200, "plain text"))
      .with_post(post(2, "Broken", 100, "usr/uploads/2024/01/missing.png"))
      .with_association(1, 1)
      .with_association(2, 1);

    let report = Migrator::new(&config).unwrap().run(&source).unwrap();

    assert_eq!(report.migrated.len(), 1);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.starts_with("failed to copy asset"));
    assert!(root.join("content/posts/Tech/Good/index.md").exists());
    assert!(!root.join("content/posts/Tech/Broken/index.md").exists());
  }

  #[test]
  fn dot_titles_are_skipped_without_touching_the_category() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let config = config(root);
    let source = SnapshotSource::default()
      .with_term(term(1, "Tech", TermKind::Category))
      .with_post(post(1, "..", 200, "up"))
      .with_post(post(2, "Kept", 100, "text"))
      .with_association(1, 1)
      .with_association(2, 1);

    let report = Migrator::new(&config).unwrap().run(&source).unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, "`..` is not a usable directory name");
    assert!(!root.join("content/posts/index.md").exists());
    assert!(!root.join("content/posts/Tech/index.md").exists());
    assert!(root.join("content/posts/Tech/Kept/index.md").exists());
  }

  struct FlakyTaxonomy {
    inner: SnapshotSource,
    failing_post: u64,
  }

  impl ContentSource for FlakyTaxonomy {
    fn list_categories(&self) -> Result<Vec<TaxonomyTerm>, SourceError> {
      self.inner.list_categories()
    }

    fn list_posts(&self) -> Result<Vec<PostRecord>, SourceError> {
      self.inner.list_posts()
    }

    fn list_associations(&self, post_id: u64) -> Result<Vec<TaxonomyTerm>, SourceError> {
      if post_id == self.failing_post {
        return Err(SourceError::Query(sqlx::Error::PoolTimedOut));
      }
      self.inner.list_associations(post_id)
    }
  }

  #[test]
  fn taxonomy_failure_skips_post_with_reason() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let config = config(root);
    let source = FlakyTaxonomy {
      inner: SnapshotSource::default()
        .with_term(term(1, "Tech", TermKind::Category))
        .with_post(post(1, "First", 200, "a"))
        .with_post(post(2, "Second", 100, "b"))
        .with_association(1, 1)
        .with_association(2, 1),
      failing_post: 1,
    };

    let report = Migrator::new(&config).unwrap().run(&source).unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert!(
      report.skipped[0]
        .reason
        .starts_with("taxonomy lookup failed for post 1: database query failed")
    );
    assert_eq!(report.migrated[0].id, 2);
  }

  #[test]
  fn drafts_are_flagged_in_front_matter() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let config = config(root);
    let draft = PostRecord {
      kind: ContentKind::PostDraft,
      ..post(9, "Draft", 100, "wip")
    };
    let taxonomy = PostTaxonomy {
      tags: vec!["a".into(), "b".into()],
      categories: vec!["Tech".into(), "Life".into()],
    };

    let document = Migrator::new(&config)
      .unwrap()
      .migrate_post(&draft, &taxonomy)
      .unwrap();

    assert_eq!(document.document_path, root.join("content/posts/Tech/Draft/index.md"));
    assert!(document.rendered.contains("\ndraft: true\n"));
    assert!(document.rendered.contains("\ntags: [\"a\",\"b\"]\n"));
    assert!(document.rendered.contains("\ncategories: [\"Tech\",\"Life\"]\n"));
  }

  #[test]
  fn invalid_offset_is_rejected_up_front() {
    let config = MigrationConfig {
      utc_offset: Some("noon".into()),
      ..MigrationConfig::default()
    };
    assert!(Migrator::new(&config).is_err());
  }
}
