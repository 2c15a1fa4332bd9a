//! Client code for cachegate.
//!
//! This crate provides the network-facing pieces of the bootstrap sequence:
//! the transport-level reachability probe and the document database
//! connection manager.

pub mod database;
pub mod probe;

pub use database::{ConnectError, ConnectionSettings, ConnectionState, DatabaseConnector, MongoConnectionManager};
pub use probe::{ProbeOutcome, ReachabilityProbe, TcpProbe};
