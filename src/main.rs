use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use typecho_migrate::{MigrationConfig, Migrator, MysqlSource, SnapshotSource};

#[derive(Parser, Debug)]
#[command(
  name = "typecho-migrate",
  version,
  about = "Migrate Typecho posts into a Hugo content tree"
)]
struct Cli {
  /// Configuration file (defaults to ./migrate.config.json when present)
  #[arg(long)]
  config: Option<PathBuf>,

  /// Directory posts are written below
  #[arg(long)]
  output: Option<PathBuf>,

  /// Directory bare upload paths are resolved against
  #[arg(long)]
  uploads: Option<PathBuf>,

  /// Read posts from a JSON snapshot instead of the database
  #[arg(long)]
  snapshot: Option<PathBuf>,

  /// Database host
  #[arg(long)]
  host: Option<String>,

  /// Database port
  #[arg(long)]
  port: Option<u16>,

  /// Database user
  #[arg(long)]
  user: Option<String>,

  /// Database password
  #[arg(long)]
  password: Option<String>,

  /// Database name
  #[arg(long)]
  database: Option<String>,

  /// Prefix of the Typecho tables
  #[arg(long)]
  table_prefix: Option<String>,

  /// Enable debug logging
  #[arg(long)]
  debug: bool,
}

impl Cli {
  fn load_config(&self) -> Result<MigrationConfig> {
    let mut config = match &self.config {
      Some(path) => MigrationConfig::from_path(path)?,
      None => {
        let cwd = std::env::current_dir().context("failed to resolve working directory")?;
        MigrationConfig::discover(&cwd)?
      }
    };

    if let Some(output) = &self.output {
      config.output_root = output.clone();
    }
    if let Some(uploads) = &self.uploads {
      config.uploads_root = uploads.clone();
    }

    let database = &mut config.database;
    if let Some(host) = &self.host {
      database.host = host.clone();
    }
    if let Some(port) = self.port {
      database.port = port;
    }
    if let Some(user) = &self.user {
      database.user = user.clone();
    }
    if let Some(password) = &self.password {
      database.password = password.clone();
    }
    if let Some(name) = &self.database {
      database.name = name.clone();
    }
    if let Some(prefix) = &self.table_prefix {
      database.table_prefix = prefix.clone();
    }

    Ok(config)
  }
}

fn init_tracing(debug: bool) -> Result<()> {
  let filter = if debug {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(debug)
    .compact()
    .try_init()
    .map_err(|err| anyhow!(err))
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.debug)?;

  let config = cli.load_config()?;
  let migrator = Migrator::new(&config)?;

  let report = match &cli.snapshot {
    Some(path) => {
      let source = SnapshotSource::load_from_path(path)?;
      migrator.run(&source)?
    }
    None => {
      let source = MysqlSource::connect(&config.database).with_context(|| {
        format!(
          "failed to connect to {}:{}/{}",
          config.database.host, config.database.port, config.database.name
        )
      })?;
      migrator.run(&source)?
    }
  };

  info!(
    migrated = report.migrated.len(),
    skipped = report.skipped.len(),
    output = %config.output_root.display(),
    "done"
  );

  Ok(())
}
