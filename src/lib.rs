#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod assets;
pub mod config;
pub mod error;
pub mod front_matter;
pub mod layout;
pub mod migration;
pub mod models;
pub mod source;

pub use config::MigrationConfig;
pub use error::PostError;
pub use migration::Migrator;
pub use models::MigrationReport;
pub use source::{ContentSource, MysqlSource, SnapshotSource, SourceError};
