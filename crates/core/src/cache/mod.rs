//! SQLite-backed key-value cache for content snapshots.
//!
//! This module provides a persistent, string-keyed store using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - JSON values with typed and untyped accessors
//! - Automatic schema migrations
//! - WAL mode for concurrent readers
//! - A full reset for the startup `reset_cache` toggle

pub mod connection;
pub mod entries;
pub mod keys;
pub mod migrations;
pub mod records;

pub use crate::Error;

pub use connection::CacheDb;
pub use records::{PageRecord, SiteContent, SiteRecord};
