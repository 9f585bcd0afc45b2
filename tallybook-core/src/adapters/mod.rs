//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the entry, user and balance ports (local backend)
//! - REST client for the same ports (remote backend)
//! - JSON file and in-memory storage for the session port

pub mod duckdb;
pub mod rest;
pub mod session_file;
