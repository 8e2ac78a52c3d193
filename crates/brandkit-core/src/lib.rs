//! Brandkit Core Library
//!
//! This crate provides the domain models, roles and permission checks, color math,
//! error types, and configuration shared across all Brandkit components.

pub mod colors;
pub mod config;
pub mod encryption;
pub mod error;
pub mod models;
pub mod permissions;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use colors::{ColorData, ColorType, Rgb};
pub use config::{BaseConfig, BrandkitConfig, Config};
pub use encryption::EncryptionService;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use permissions::{check_asset_permission, Actor, AssetAction, PermissionDecision};
pub use storage_types::StorageBackend;
