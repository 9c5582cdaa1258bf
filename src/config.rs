//! Run configuration loaded from `migrate.config.json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use serde::Deserialize;

use crate::front_matter::{DocumentTemplate, TimestampZone};

/// File name searched for in the working directory when no configuration path is given.
pub const DEFAULT_CONFIG_FILE: &str = "migrate.config.json";

/// License notice attached to every migrated post.
pub const DEFAULT_LICENSE: &str =
  "本站使用「署名 4.0 国际」创作共享协议，可自由转载、引用，但需署名作者且注明文章出处";

/// Connection settings for the Typecho database.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
  /// Server host name or address.
  pub host: String,
  /// Server port.
  pub port: u16,
  /// User name.
  pub user: String,
  /// Password.
  pub password: String,
  /// Database (schema) name.
  pub name: String,
  /// Prefix shared by the Typecho tables.
  pub table_prefix: String,
}

impl Default for DatabaseConfig {
  fn default() -> Self {
    Self {
      host: "127.0.0.1".into(),
      port: 3306,
      user: "root".into(),
      password: String::new(),
      name: "typecho".into(),
      table_prefix: "typecho_".into(),
    }
  }
}

/// Everything a migration run needs besides the data itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
  /// Database connection settings.
  pub database: DatabaseConfig,
  /// Directory posts are written below.
  pub output_root: PathBuf,
  /// Directory bare upload paths in post bodies are resolved against.
  pub uploads_root: PathBuf,
  /// File name of each post's document.
  pub document_file: String,
  /// Name of the per-post asset directory, also used as the rewritten link prefix.
  pub images_dir: String,
  /// Author name written into every document.
  pub author: String,
  /// Author link written into every document.
  pub author_link: String,
  /// License notice written into every document.
  pub license: String,
  /// Marker removed from the start of post bodies.
  pub body_marker: String,
  /// Fixed UTC offset such as `+08:00`. Dates use the local time zone when unset.
  pub utc_offset: Option<String>,
}

impl Default for MigrationConfig {
  fn default() -> Self {
    Self {
      database: DatabaseConfig::default(),
      output_root: PathBuf::from("content/posts"),
      uploads_root: PathBuf::from("."),
      document_file: "index.md".into(),
      images_dir: "images".into(),
      author: "SoulChild".into(),
      author_link: "https://www.soulchild.cn".into(),
      license: DEFAULT_LICENSE.into(),
      body_marker: "<!--markdown-->".into(),
      utc_offset: None,
    }
  }
}

impl MigrationConfig {
  /// Load configuration from `dir`, falling back to defaults when no file exists.
  pub fn discover(dir: &Path) -> Result<Self> {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    if candidate.exists() {
      Self::from_path(&candidate)
    } else {
      Ok(Self::default())
    }
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> Result<Self> {
    let content = fs::read_to_string(path)
      .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: Self = serde_json::from_str(&content)
      .with_context(|| format!("failed to parse config {}", path.display()))?;
    config.timestamp_zone()?;
    Ok(config)
  }

  /// Time zone used for rendered dates.
  pub fn timestamp_zone(&self) -> Result<TimestampZone> {
    match self.utc_offset.as_deref() {
      None => Ok(TimestampZone::Local),
      Some(value) => FixedOffset::from_str(value)
        .map(TimestampZone::Fixed)
        .map_err(|err| anyhow!("invalid utc_offset `{value}`: {err}")),
    }
  }

  /// Site-wide values rendered into every document.
  pub fn document_template(&self) -> DocumentTemplate<'_> {
    DocumentTemplate {
      author: &self.author,
      author_link: &self.author_link,
      license: &self.license,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn discover_defaults_when_file_is_missing() {
    let temp = tempdir().unwrap();
    let config = MigrationConfig::discover(temp.path()).unwrap();

    assert_eq!(config.output_root, PathBuf::from("content/posts"));
    assert_eq!(config.database.port, 3306);
    assert_eq!(config.database.table_prefix, "typecho_");
    assert_eq!(config.timestamp_zone().unwrap(), TimestampZone::Local);
  }

  #[test]
  fn partial_files_keep_remaining_defaults() {
    let temp = tempdir().unwrap();
    fs::write(
      temp.path().join(DEFAULT_CONFIG_FILE),
      r#"{"output_root": "site/posts", "database": {"host": "db", "password": "secret"}, "utc_offset": "+08:00"}"#,
    )
    .unwrap();

    let config = MigrationConfig::discover(temp.path()).unwrap();
    assert_eq!(config.output_root, PathBuf::from("site/posts"));
    assert_eq!(config.database.host, "db");
    assert_eq!(config.database.password, "secret");
    assert_eq!(config.database.name, "typecho");
    assert_eq!(config.images_dir, "images");
    assert_eq!(
      config.timestamp_zone().unwrap(),
      TimestampZone::Fixed(FixedOffset::east_opt(8 * 3600).unwrap())
    );
  }

  #[test]
  fn rejects_invalid_offsets() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("custom.json");
    fs::write(&path, r#"{"utc_offset": "eight"}"#).unwrap();

    assert!(MigrationConfig::from_path(&path).is_err());
  }

  #[test]
  fn rejects_malformed_json() {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join(DEFAULT_CONFIG_FILE), "{").unwrap();

    let err = MigrationConfig::discover(temp.path()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config"));
  }

  #[test]
  fn document_template_borrows_site_values() {
    let config = MigrationConfig::default();
    let template = config.document_template();
    assert_eq!(template.author, "SoulChild");
    assert_eq!(template.license, DEFAULT_LICENSE);
  }
}
