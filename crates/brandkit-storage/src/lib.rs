//! Brandkit Storage Library
//!
//! Storage abstraction plus local filesystem and S3-compatible (AWS S3,
//! Cloudflare R2) backends.
//!
//! # Storage key format
//!
//! Every object belongs to a client and lives under `clients/{client_id}/`:
//!
//! - asset originals: `clients/{client_id}/assets/{asset_id}/{filename}`
//! - conversions: `clients/{client_id}/assets/{asset_id}/converted/{stem}[-dark].{format}`
//! - inspiration images: `clients/{client_id}/inspiration/{section_id}/{image_id}-{filename}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in
//! the [`keys`] module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use brandkit_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::{S3Options, S3Storage};
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
