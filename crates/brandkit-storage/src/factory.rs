#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::{S3Options, S3Storage};
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use brandkit_core::Config;
use std::sync::Arc;

/// Create the storage backend selected by `STORAGE_BACKEND`.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let backend = config.storage_backend();

    match backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket()
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config.s3_region().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
            })?;

            let options = S3Options {
                bucket,
                region,
                endpoint: config.s3_endpoint().map(String::from),
                access_key_id: config.aws_access_key_id().map(String::from),
                secret_access_key: config.aws_secret_access_key().map(String::from),
            };
            Ok(Arc::new(S3Storage::new(options, backend).await?))
        }

        #[cfg(feature = "storage-s3")]
        StorageBackend::R2 => {
            let bucket = config
                .s3_bucket()
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;

            let mut options = match (config.r2_account_id(), config.s3_endpoint()) {
                (_, Some(endpoint)) => S3Options {
                    bucket,
                    region: "auto".to_string(),
                    endpoint: Some(endpoint.to_string()),
                    access_key_id: None,
                    secret_access_key: None,
                },
                (Some(account_id), None) => S3Options::r2(bucket, account_id),
                (None, None) => {
                    return Err(StorageError::ConfigError(
                        "R2_ACCOUNT_ID or S3_ENDPOINT not configured".to_string(),
                    ))
                }
            };
            options.access_key_id = config.aws_access_key_id().map(String::from);
            options.secret_access_key = config.aws_secret_access_key().map(String::from);

            Ok(Arc::new(S3Storage::new(options, backend).await?))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 | StorageBackend::R2 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config
                .local_storage_path()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
                })?;
            let base_url = config
                .local_storage_base_url()
                .map(String::from)
                .unwrap_or_else(|| format!("{}/uploads", config.public_base_url()));

            Ok(Arc::new(LocalStorage::new(base_path, base_url).await?))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
