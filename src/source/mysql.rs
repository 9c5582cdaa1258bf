//! Typecho database access over MySQL.

use std::str::FromStr;

use sqlx::mysql::{
  MySql, MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow,
};
use sqlx::query::Query;
use sqlx::Row;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use super::{ContentSource, SourceError};
use crate::config::DatabaseConfig;
use crate::models::{ContentKind, PostRecord, PostStatus, TaxonomyTerm, TermKind};

/// Blocking [`ContentSource`] backed by a single pooled MySQL connection.
///
/// The connection is closed when the source is dropped.
pub struct MysqlSource {
  runtime: Runtime,
  pool: MySqlPool,
  tables: TableNames,
}

impl MysqlSource {
  /// Connect to the database described by `config`.
  pub fn connect(config: &DatabaseConfig) -> Result<Self, SourceError> {
    let tables = TableNames::with_prefix(&config.table_prefix)?;
    let runtime = Builder::new_current_thread()
      .enable_all()
      .build()
      .map_err(SourceError::Runtime)?;

    let options = MySqlConnectOptions::new()
      .host(&config.host)
      .port(config.port)
      .username(&config.user)
      .password(&config.password)
      .database(&config.name)
      .charset("utf8mb4");
    let pool = runtime.block_on(
      MySqlPoolOptions::new()
        .max_connections(1)
        .connect_with(options),
    )?;
    debug!(host = %config.host, port = config.port, database = %config.name, "connected");

    Ok(Self { runtime, pool, tables })
  }

  fn fetch(&self, query: Query<'_, MySql, MySqlArguments>) -> Result<Vec<MySqlRow>, SourceError> {
    Ok(self.runtime.block_on(query.fetch_all(&self.pool))?)
  }
}

impl Drop for MysqlSource {
  fn drop(&mut self) {
    self.runtime.block_on(self.pool.close());
  }
}

impl ContentSource for MysqlSource {
  fn list_categories(&self) -> Result<Vec<TaxonomyTerm>, SourceError> {
    let sql = format!(
      "SELECT CAST(mid AS SIGNED) AS mid, name, type, CAST(parent AS SIGNED) AS parent \
       FROM {} WHERE type = ? ORDER BY mid",
      self.tables.metas
    );
    let rows = self.fetch(sqlx::query(&sql).bind(TermKind::Category.as_str()))?;
    rows.iter().map(term_from_row).collect()
  }

  fn list_posts(&self) -> Result<Vec<PostRecord>, SourceError> {
    let [post, draft] = ContentKind::MIGRATED;
    let sql = format!(
      "SELECT CAST(cid AS SIGNED) AS cid, title, slug, CAST(created AS SIGNED) AS created, \
       CAST(modified AS SIGNED) AS modified, text, type, status \
       FROM {} WHERE type IN (?, ?) ORDER BY created DESC",
      self.tables.contents
    );
    let rows = self.fetch(sqlx::query(&sql).bind(post.as_str()).bind(draft.as_str()))?;
    rows.iter().map(post_from_row).collect()
  }

  fn list_associations(&self, post_id: u64) -> Result<Vec<TaxonomyTerm>, SourceError> {
    let sql = format!(
      "SELECT CAST(m.mid AS SIGNED) AS mid, m.name, m.type, CAST(m.parent AS SIGNED) AS parent \
       FROM {} AS r JOIN {} AS m ON r.mid = m.mid \
       WHERE r.cid = ? AND m.type IN (?, ?) ORDER BY m.mid",
      self.tables.relationships, self.tables.metas
    );
    let rows = self.fetch(
      sqlx::query(&sql)
        .bind(post_id)
        .bind(TermKind::Tag.as_str())
        .bind(TermKind::Category.as_str()),
    )?;
    rows.iter().map(term_from_row).collect()
  }
}

/// Fully qualified Typecho table names.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TableNames {
  contents: String,
  metas: String,
  relationships: String,
}

impl TableNames {
  fn with_prefix(prefix: &str) -> Result<Self, SourceError> {
    if !prefix
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
      return Err(SourceError::InvalidPrefix(prefix.to_string()));
    }

    Ok(Self {
      contents: format!("{prefix}contents"),
      metas: format!("{prefix}metas"),
      relationships: format!("{prefix}relationships"),
    })
  }
}

fn unsigned(row: &MySqlRow, column: &'static str, id: u64) -> Result<u64, SourceError> {
  let value: i64 = row.try_get(column)?;
  u64::try_from(value).map_err(|_| SourceError::Decode {
    column,
    value: value.to_string(),
    id,
  })
}

fn post_from_row(row: &MySqlRow) -> Result<PostRecord, SourceError> {
  let id = unsigned(row, "cid", 0)?;
  let kind: Option<String> = row.try_get("type")?;
  let kind = kind.unwrap_or_else(|| ContentKind::Post.as_str().to_string());
  let kind = ContentKind::from_str(&kind).map_err(|value| SourceError::Decode {
    column: "type",
    value,
    id,
  })?;
  let status: Option<String> = row.try_get("status")?;

  Ok(PostRecord {
    id,
    title: row.try_get::<Option<String>, _>("title")?.unwrap_or_default(),
    slug: row.try_get("slug")?,
    created: row.try_get("created")?,
    modified: row.try_get("modified")?,
    text: row.try_get::<Option<String>, _>("text")?.unwrap_or_default(),
    status: status.map(PostStatus::from).unwrap_or(PostStatus::Publish),
    kind,
  })
}

fn term_from_row(row: &MySqlRow) -> Result<TaxonomyTerm, SourceError> {
  let id = unsigned(row, "mid", 0)?;
  let kind: String = row.try_get("type")?;
  let kind = TermKind::from_str(&kind).map_err(|value| SourceError::Decode {
    column: "type",
    value,
    id,
  })?;
  let parent: Option<i64> = row.try_get("parent")?;

  Ok(TaxonomyTerm {
    id,
    name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
    kind,
    parent: parent.and_then(|value| u64::try_from(value).ok()).filter(|value| *value != 0),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builds_prefixed_table_names() {
    let tables = TableNames::with_prefix("typecho_").unwrap();
    assert_eq!(tables, TableNames {
      contents: "typecho_contents".into(),
      metas: "typecho_metas".into(),
      relationships: "typecho_relationships".into(),
    });
  }

  #[test]
  fn allows_empty_prefix() {
    assert_eq!(TableNames::with_prefix("").unwrap().metas, "metas");
  }

  #[test]
  fn rejects_prefixes_that_could_escape_identifiers() {
    for prefix in ["typecho`; DROP", "a b_", "x-y_", "t."] {
      assert!(matches!(
        TableNames::with_prefix(prefix),
        Err(SourceError::InvalidPrefix(_))
      ));
    }
  }
}
