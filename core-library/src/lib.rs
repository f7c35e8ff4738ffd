//! # Library Management Module
//!
//! Owns the external reference database: which local pointer files stand for
//! which remote documents.
//!
//! ## Overview
//!
//! - SQLite pool, schema and migrations ([`db`])
//! - [`ExternalFileRepository`] over the `external_files` table
//! - [`ResourceType`] describing each kind of linked resource

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{LibraryError, Result};
pub use models::{ExternalReference, ResourceType};
pub use repositories::{ExternalFileRepository, SqliteExternalFileRepository};
