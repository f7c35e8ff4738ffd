//! # Repository Pattern Implementation
//!
//! Repository traits with SQLite implementations over `sqlx`. All operations
//! return [`Result`](crate::Result).
//!
//! - `ExternalFileRepository` - pointer file paths mapped to remote resource ids

pub mod external_file;

pub use external_file::{ExternalFileRepository, SqliteExternalFileRepository};
