use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use brandkit_core::AppError;
use brandkit_services::ServedFile;
use brandkit_storage::Storage;
use futures::StreamExt;

/// Served files never run script, whatever type they were uploaded as
const FILE_CONTENT_SECURITY_POLICY: &str = "default-src 'none'; sandbox";

/// Raster images a browser may display inline. Fonts (`font/*`) are also allowed.
const INLINE_IMAGE_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/avif",
    "image/bmp",
    "image/x-icon",
    "image/vnd.microsoft.icon",
];

fn renders_inline_safely(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.starts_with("font/") || INLINE_IMAGE_TYPES.contains(&essence.as_str())
}

/// How the browser should treat the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

fn content_disposition(disposition: Disposition, file_name: &str) -> String {
    let kind = match disposition {
        Disposition::Inline => "inline",
        Disposition::Attachment => "attachment",
    };
    let ascii: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    format!(
        "{}; filename=\"{}\"; filename*=UTF-8''{}",
        kind,
        ascii,
        urlencoding::encode(file_name)
    )
}

/// Stream a stored object, or send generated bytes, with download headers
pub async fn serve_file(
    storage: &dyn Storage,
    file: ServedFile,
    disposition: Disposition,
    cache_control: &str,
) -> Result<Response, AppError> {
    // HTML, SVG and anything else that can carry script is only ever downloaded
    let disposition = if renders_inline_safely(file.mime_type()) {
        disposition
    } else {
        Disposition::Attachment
    };
    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CACHE_CONTROL, cache_control)
        .header(header::CONTENT_SECURITY_POLICY, FILE_CONTENT_SECURITY_POLICY)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition(disposition, file.file_name()),
        );

    let response = match file {
        ServedFile::Stored {
            storage_key,
            mime_type,
            ..
        } => {
            let stream = storage.download_stream(&storage_key).await.map_err(|e| {
                tracing::error!(error = %e, storage_key = %storage_key, "Failed to retrieve file from storage");
                AppError::from(e)
            })?;
            let body_stream = stream.map(|result| {
                result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
            });
            builder
                .header(header::CONTENT_TYPE, mime_type)
                .body(Body::from_stream(body_stream))
        }
        ServedFile::Generated {
            data, mime_type, ..
        } => builder
            .header(header::CONTENT_TYPE, mime_type)
            .header(header::CONTENT_LENGTH, data.len())
            .body(Body::from(data)),
    };

    response.map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_raster_images_and_fonts_render_inline() {
        assert!(renders_inline_safely("image/png"));
        assert!(renders_inline_safely("IMAGE/JPEG; charset=binary"));
        assert!(renders_inline_safely("font/woff2"));
        assert!(!renders_inline_safely("image/svg+xml"));
        assert!(!renders_inline_safely("text/html"));
        assert!(!renders_inline_safely("application/xhtml+xml"));
        assert!(!renders_inline_safely(""));
    }

    #[tokio::test]
    async fn html_is_forced_to_attachment() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = brandkit_storage::LocalStorage::new(dir.path(), "http://localhost/media".to_string())
            .await
            .unwrap();
        let file = ServedFile::Generated {
            data: b"<script>alert(1)</script>".to_vec(),
            mime_type: "text/html".to_string(),
            file_name: "brief.html".to_string(),
        };

        let response = serve_file(&storage, file, Disposition::Inline, "private")
            .await
            .unwrap();
        let headers = response.headers();
        assert!(headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .starts_with("attachment;"));
        assert_eq!(
            headers[header::CONTENT_SECURITY_POLICY],
            FILE_CONTENT_SECURITY_POLICY
        );
    }

    #[test]
    fn disposition_escapes_non_ascii_names() {
        let value = content_disposition(Disposition::Attachment, "logo ñ.png");
        assert!(value.starts_with("attachment; filename=\"logo__.png\""));
        assert!(value.ends_with("UTF-8''logo%20%C3%B1.png"));
    }
}
