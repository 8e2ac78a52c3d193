use std::sync::Arc;

use brandkit_core::models::{AssetCategory, BrandAsset, ConvertedAsset, NewConvertedAsset};
use brandkit_core::AppError;
use brandkit_db::AssetRepository;
use brandkit_storage::{keys, Storage};

use super::{ConversionError, FontConverter, FontFormat, LogoConverter, LogoFormat, LogoOptions};

pub const MIN_RENDITION_SIZE: u32 = 16;
pub const MAX_RENDITION_SIZE: u32 = 4096;

/// What a caller asked `/file` for
#[derive(Debug, Clone, Default)]
pub struct FileRequest {
    pub format: Option<String>,
    pub dark_variant: bool,
    pub size: Option<u32>,
}

impl FileRequest {
    fn wants_original(&self) -> bool {
        self.format.is_none() && !self.dark_variant && self.size.is_none()
    }
}

/// A file ready to be streamed back
#[derive(Debug)]
pub enum ServedFile {
    /// Object already in storage (original or cached rendition)
    Stored {
        storage_key: String,
        mime_type: String,
        file_name: String,
    },
    /// Sized renditions are generated per request and never persisted
    Generated {
        data: Vec<u8>,
        mime_type: String,
        file_name: String,
    },
}

impl ServedFile {
    pub fn file_name(&self) -> &str {
        match self {
            ServedFile::Stored { file_name, .. } | ServedFile::Generated { file_name, .. } => {
                file_name
            }
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            ServedFile::Stored { mime_type, .. } | ServedFile::Generated { mime_type, .. } => {
                mime_type
            }
        }
    }
}

enum Target {
    Logo(LogoFormat),
    Font(FontFormat),
}

impl Target {
    fn extension(&self) -> &'static str {
        match self {
            Target::Logo(f) => f.extension(),
            Target::Font(f) => f.extension(),
        }
    }

    fn mime_type(&self) -> &'static str {
        match self {
            Target::Logo(f) => f.mime_type(),
            Target::Font(f) => f.mime_type(),
        }
    }
}

/// Resolves asset file requests to the original or a converted rendition,
/// converting on demand and caching unsized renditions as `ConvertedAsset` rows.
#[derive(Clone)]
pub struct AssetConverter {
    storage: Arc<dyn Storage>,
    assets: Arc<dyn AssetRepository>,
    fonts: FontConverter,
}

impl AssetConverter {
    pub fn new(
        storage: Arc<dyn Storage>,
        assets: Arc<dyn AssetRepository>,
        fonts: FontConverter,
    ) -> Self {
        Self {
            storage,
            assets,
            fonts,
        }
    }

    #[tracing::instrument(skip(self, asset), fields(asset_id = %asset.id, client_id = %asset.client_id))]
    pub async fn resolve(
        &self,
        asset: &BrandAsset,
        request: &FileRequest,
    ) -> Result<ServedFile, AppError> {
        let (storage_key, original_name, original_mime) = file_parts(asset)?;

        if request.wants_original() {
            return Ok(ServedFile::Stored {
                storage_key: storage_key.to_string(),
                mime_type: original_mime.to_string(),
                file_name: original_name.to_string(),
            });
        }

        if let Some(size) = request.size {
            if !(MIN_RENDITION_SIZE..=MAX_RENDITION_SIZE).contains(&size) {
                return Err(AppError::InvalidInput(format!(
                    "size must be between {} and {}",
                    MIN_RENDITION_SIZE, MAX_RENDITION_SIZE
                )));
            }
        }

        let target = self.target_for(asset, request.format.as_deref())?;
        let file_name = rendition_name(original_name, &target, request);

        if request.size.is_some() {
            let data = self.convert(asset, &target, request).await?;
            return Ok(ServedFile::Generated {
                data,
                mime_type: target.mime_type().to_string(),
                file_name,
            });
        }

        let converted = self
            .cached_or_convert(asset, &target, request.dark_variant)
            .await?;
        Ok(ServedFile::Stored {
            storage_key: converted.storage_key,
            mime_type: converted.mime_type,
            file_name,
        })
    }

    /// Produce (or refresh) the cached renditions for every requested format
    pub async fn convert_all(
        &self,
        asset: &BrandAsset,
        formats: &[String],
        dark_variant: bool,
    ) -> Result<Vec<ConvertedAsset>, AppError> {
        file_parts(asset)?;
        let mut results = Vec::with_capacity(formats.len());
        for format in formats {
            let target = self.target_for(asset, Some(format))?;
            results.push(self.cached_or_convert(asset, &target, dark_variant).await?);
        }
        Ok(results)
    }

    /// Delete cached renditions and their storage objects
    pub async fn remove_renditions(&self, asset: &BrandAsset) -> Result<usize, AppError> {
        let removed = self.assets.delete_converted_for_asset(asset.id).await?;
        for converted in &removed {
            if let Err(e) = self.storage.delete(&converted.storage_key).await {
                tracing::warn!(
                    error = %e,
                    storage_key = %converted.storage_key,
                    "Failed to delete converted file from storage"
                );
            }
        }
        Ok(removed.len())
    }

    async fn cached_or_convert(
        &self,
        asset: &BrandAsset,
        target: &Target,
        dark_variant: bool,
    ) -> Result<ConvertedAsset, AppError> {
        let format = target.extension();
        if let Some(existing) = self
            .assets
            .get_converted(asset.id, format, dark_variant)
            .await?
        {
            if self.storage.exists(&existing.storage_key).await? {
                tracing::debug!(format, dark_variant, "Serving cached rendition");
                return Ok(existing);
            }
            tracing::warn!(
                storage_key = %existing.storage_key,
                "Cached rendition missing from storage, regenerating"
            );
        }

        let request = FileRequest {
            format: Some(format.to_string()),
            dark_variant,
            size: None,
        };
        let data = self.convert(asset, target, &request).await?;
        let original_name = asset.file_name.as_deref().unwrap_or("file");
        let key = keys::converted_key(
            asset.client_id,
            asset.id,
            original_name,
            format,
            dark_variant,
            None,
        );
        let file_size = data.len() as i64;
        self.storage.upload(&key, data, target.mime_type()).await?;

        let converted = self
            .assets
            .upsert_converted(NewConvertedAsset {
                original_asset_id: asset.id,
                format: format.to_string(),
                is_dark_variant: dark_variant,
                storage_key: key,
                mime_type: target.mime_type().to_string(),
                file_size,
            })
            .await?;

        tracing::info!(
            format,
            dark_variant,
            file_size,
            storage_key = %converted.storage_key,
            "Rendition stored"
        );
        Ok(converted)
    }

    async fn convert(
        &self,
        asset: &BrandAsset,
        target: &Target,
        request: &FileRequest,
    ) -> Result<Vec<u8>, AppError> {
        let (storage_key, original_name, original_mime) = file_parts(asset)?;
        let source = self.storage.download(storage_key).await?;

        match target {
            Target::Font(target) => {
                if request.dark_variant || request.size.is_some() {
                    return Err(AppError::InvalidInput(
                        "Fonts do not support dark variants or sizes".to_string(),
                    ));
                }
                let source_format = FontFormat::detect(original_name, original_mime)
                    .ok_or_else(|| {
                        ConversionError::UnsupportedSource("Unrecognized font file".to_string())
                    })?;
                Ok(self.fonts.convert(&source, source_format, *target).await?)
            }
            Target::Logo(target) => {
                let source_format = LogoFormat::from_mime(original_mime).ok_or_else(|| {
                    ConversionError::UnsupportedSource(format!(
                        "Cannot convert files of type {}",
                        original_mime
                    ))
                })?;
                let target = *target;
                let options = LogoOptions {
                    dark_variant: request.dark_variant,
                    max_dimension: request.size,
                };
                let converted = tokio::task::spawn_blocking(move || {
                    LogoConverter::convert(&source, source_format, target, options)
                })
                .await
                .map_err(|e| AppError::Internal(format!("Conversion task failed: {}", e)))??;
                Ok(converted)
            }
        }
    }

    fn target_for(&self, asset: &BrandAsset, format: Option<&str>) -> Result<Target, AppError> {
        let (_, original_name, original_mime) = file_parts(asset)?;
        match asset.category {
            AssetCategory::Font => {
                let format = match format {
                    Some(f) => f.parse::<FontFormat>()?,
                    None => FontFormat::detect(original_name, original_mime).ok_or_else(|| {
                        AppError::UnsupportedMediaType("Unrecognized font file".to_string())
                    })?,
                };
                Ok(Target::Font(format))
            }
            AssetCategory::Color => Err(AppError::BadRequest(
                "Color assets have no file to convert".to_string(),
            )),
            AssetCategory::Logo | AssetCategory::Other => {
                let format = match format {
                    Some(f) => f.parse::<LogoFormat>()?,
                    None => LogoFormat::from_mime(original_mime).ok_or_else(|| {
                        AppError::UnsupportedMediaType(format!(
                            "Cannot convert files of type {}",
                            original_mime
                        ))
                    })?,
                };
                Ok(Target::Logo(format))
            }
        }
    }
}

fn file_parts(asset: &BrandAsset) -> Result<(&str, &str, &str), AppError> {
    let storage_key = asset
        .storage_key
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Asset has no file".to_string()))?;
    let file_name = asset.file_name.as_deref().unwrap_or("file");
    let mime_type = asset
        .mime_type
        .as_deref()
        .unwrap_or("application/octet-stream");
    Ok((storage_key, file_name, mime_type))
}

fn rendition_name(original: &str, target: &Target, request: &FileRequest) -> String {
    let stem = original
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(original);
    let dark = if request.dark_variant { "-dark" } else { "" };
    let size = request
        .size
        .map(|s| format!("-{}", s))
        .unwrap_or_default();
    format!("{}{}{}.{}", stem, dark, size, target.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandkit_core::models::{NewBrandAsset, Visibility};
    use brandkit_db::memory::InMemoryAssetRepository;
    use brandkit_storage::LocalStorage;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::time::Duration;
    use uuid::Uuid;

    fn png_bytes() -> Vec<u8> {
        let img = RgbaImage::from_pixel(64, 32, Rgba([10, 20, 30, 255]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    async fn setup(dir: &tempfile::TempDir) -> (AssetConverter, Arc<dyn AssetRepository>, BrandAsset) {
        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost/uploads".to_string())
                .await
                .unwrap(),
        );
        let assets: Arc<dyn AssetRepository> = Arc::new(InMemoryAssetRepository::default());

        let client_id = Uuid::new_v4();
        let asset_id = Uuid::new_v4();
        let key = keys::asset_key(client_id, asset_id, "logo.png");
        let data = png_bytes();
        storage.upload(&key, data.clone(), "image/png").await.unwrap();
        let asset = assets
            .create(NewBrandAsset {
                id: asset_id,
                client_id,
                name: "Logo".to_string(),
                category: AssetCategory::Logo,
                visibility: Visibility::Shared,
                data: serde_json::json!({}),
                file_name: Some("logo.png".to_string()),
                mime_type: Some("image/png".to_string()),
                file_size: Some(data.len() as i64),
                storage_key: Some(key),
                uploaded_by: None,
            })
            .await
            .unwrap();

        let converter = AssetConverter::new(
            storage,
            assets.clone(),
            FontConverter::new("fontforge", Duration::from_secs(5)),
        );
        (converter, assets, asset)
    }

    #[tokio::test]
    async fn original_is_served_without_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let (converter, _, asset) = setup(&dir).await;

        let served = converter.resolve(&asset, &FileRequest::default()).await.unwrap();
        match served {
            ServedFile::Stored { storage_key, mime_type, file_name } => {
                assert_eq!(Some(storage_key), asset.storage_key);
                assert_eq!(mime_type, "image/png");
                assert_eq!(file_name, "logo.png");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn converted_rendition_is_cached_under_client_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let (converter, assets, asset) = setup(&dir).await;
        let request = FileRequest {
            format: Some("webp".to_string()),
            dark_variant: true,
            size: None,
        };

        let first = converter.resolve(&asset, &request).await.unwrap();
        let second = converter.resolve(&asset, &request).await.unwrap();
        assert_eq!(first.file_name(), "logo-dark.webp");

        let rows = assets.list_converted(asset.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0]
            .storage_key
            .starts_with(&format!("clients/{}/", asset.client_id)));
        match second {
            ServedFile::Stored { storage_key, .. } => assert_eq!(storage_key, rows[0].storage_key),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn sized_rendition_is_generated_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let (converter, assets, asset) = setup(&dir).await;
        let request = FileRequest {
            format: Some("png".to_string()),
            dark_variant: false,
            size: Some(32),
        };

        let served = converter.resolve(&asset, &request).await.unwrap();
        assert!(matches!(served, ServedFile::Generated { .. }));
        assert_eq!(served.file_name(), "logo-32.png");
        assert!(assets.list_converted(asset.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (converter, _, asset) = setup(&dir).await;
        let request = FileRequest {
            size: Some(1),
            ..Default::default()
        };
        let err = converter.resolve(&asset, &request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn remove_renditions_clears_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (converter, assets, asset) = setup(&dir).await;
        converter
            .convert_all(&asset, &["png".to_string(), "gif".to_string()], false)
            .await
            .unwrap();
        assert_eq!(assets.list_converted(asset.id).await.unwrap().len(), 2);

        assert_eq!(converter.remove_renditions(&asset).await.unwrap(), 2);
        assert!(assets.list_converted(asset.id).await.unwrap().is_empty());
    }
}
