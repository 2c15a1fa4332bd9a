//! Core types and shared functionality for cachegate.
//!
//! This crate provides:
//! - Key-value cache store with SQLite backend
//! - Data-availability decision over cached site content
//! - Unified error types
//! - Configuration structures

pub mod availability;
pub mod cache;
pub mod config;
pub mod error;

pub use availability::{Availability, RequiredReason, check_availability};
pub use cache::{CacheDb, PageRecord, SiteContent, SiteRecord};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
