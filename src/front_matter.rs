//! Hugo front matter for migrated posts.

use std::fs;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat};

use crate::error::PostError;
use crate::models::{PostRecord, PostTaxonomy};

/// Separator placed between the front matter and the body.
pub const SUMMARY_DIVIDER: &str = "<!--more-->";

/// Time zone that stored epoch timestamps are rendered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampZone {
  /// The process's local time zone.
  #[default]
  Local,
  /// A fixed UTC offset.
  Fixed(FixedOffset),
}

impl TimestampZone {
  /// Convert epoch seconds into a zoned timestamp.
  pub fn timestamp(&self, seconds: i64) -> Option<DateTime<FixedOffset>> {
    let utc = DateTime::from_timestamp(seconds, 0)?;
    Some(match self {
      Self::Local => utc.with_timezone(&Local).fixed_offset(),
      Self::Fixed(offset) => utc.with_timezone(offset),
    })
  }
}

/// Metadata rendered at the top of a migrated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
  /// Raw post title.
  pub title: String,
  /// Publication date.
  pub date: DateTime<FixedOffset>,
  /// Last modification date.
  pub lastmod: DateTime<FixedOffset>,
  /// Whether the post is unpublished.
  pub draft: bool,
  /// Tag names.
  pub tags: Vec<String>,
  /// Category names.
  pub categories: Vec<String>,
  /// Slug; always the post identifier.
  pub slug: String,
}

impl FrontMatter {
  /// Build the metadata for a post and its taxonomy.
  pub fn from_post(
    post: &PostRecord,
    taxonomy: &PostTaxonomy,
    zone: TimestampZone,
  ) -> Result<Self, PostError> {
    let convert = |seconds: i64| {
      zone
        .timestamp(seconds)
        .ok_or(PostError::Timestamp { post_id: post.id, seconds })
    };

    Ok(Self {
      title: post.title.clone(),
      date: convert(post.created)?,
      lastmod: convert(post.modified)?,
      draft: post.is_draft(),
      tags: taxonomy.tags.clone(),
      categories: taxonomy.categories.clone(),
      slug: post.id.to_string(),
    })
  }
}

/// Site-wide values that every document carries.
#[derive(Debug, Clone, Copy)]
pub struct DocumentTemplate<'a> {
  /// Author display name.
  pub author: &'a str,
  /// Author home page.
  pub author_link: &'a str,
  /// License notice.
  pub license: &'a str,
}

impl DocumentTemplate<'_> {
  /// Render the front matter followed by the body.
  pub fn render(&self, front: &FrontMatter, body: &str) -> String {
    format!(
      r#"---
title: "{title}"
subtitle: ""
date: {date}
lastmod: {lastmod}
draft: {draft}
author: "{author}"
authorLink: "{author_link}"
description: ""
license: "{license}"
tags: {tags}
categories: {categories}
comment:
  enable: true
password: ""
message: "请输入密码"
slug: {slug}
---
{divider}
{body}
"#,
      title = front.title,
      date = render_timestamp(&front.date),
      lastmod = render_timestamp(&front.lastmod),
      draft = front.draft,
      author = self.author,
      author_link = self.author_link,
      license = self.license,
      tags = render_list(&front.tags),
      categories = render_list(&front.categories),
      slug = front.slug,
      divider = SUMMARY_DIVIDER,
      body = body,
    )
  }
}

/// Write a rendered document, replacing any previous contents.
pub fn write_document(path: &Path, rendered: &str) -> Result<(), PostError> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).map_err(|source| PostError::CreateDir {
      path: parent.to_path_buf(),
      source,
    })?;
  }

  fs::write(path, rendered).map_err(|source| PostError::WriteDocument {
    path: path.to_path_buf(),
    source,
  })
}

fn render_timestamp(value: &DateTime<FixedOffset>) -> String {
  value.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn render_list(values: &[String]) -> String {
  let quoted: Vec<String> = values.iter().map(|value| format!("\"{value}\"")).collect();
  format!("[{}]", quoted.join(","))
}
