//! Brandkit persistence layer
//!
//! Repository traits with PostgreSQL implementations, plus in-memory
//! implementations behind the `memory` feature.

pub mod db;

pub use db::*;
