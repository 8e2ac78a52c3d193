use std::collections::HashMap;

use axum::extract::Multipart;
use brandkit_core::AppError;

/// File part of a multipart upload
#[derive(Debug)]
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub file_name: String,
    pub content_type: String,
}

/// A parsed multipart form: one `file` field plus any text fields
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn require_file(&mut self) -> Result<UploadedFile, AppError> {
        self.file
            .take()
            .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))
    }
}

/// Read the whole form, enforcing `max_size` on the file part
pub async fn read_upload_form(
    mut multipart: Multipart,
    max_size: usize,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let field_name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if field_name == "file" {
            if form.file.is_some() {
                return Err(AppError::InvalidInput(
                    "Multiple file fields are not allowed; send exactly one field named 'file'"
                        .to_string(),
                ));
            }
            let file_name = field
                .file_name()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "upload".to_string());
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read file data: {}", e)))?;
            validate_file_size(data.len(), max_size)?;
            form.file = Some(UploadedFile {
                data: data.to_vec(),
                file_name,
                content_type,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::InvalidInput(format!("Failed to read field {}: {}", field_name, e)))?;
            form.fields.insert(field_name, value);
        }
    }

    Ok(form)
}

pub fn validate_file_size(file_size: usize, max_size: usize) -> Result<(), AppError> {
    if file_size == 0 {
        return Err(AppError::InvalidInput("File is empty".to_string()));
    }
    if file_size > max_size {
        return Err(AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max_size / 1024 / 1024
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limits() {
        assert!(validate_file_size(10, 100).is_ok());
        assert!(matches!(
            validate_file_size(0, 100),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_file_size(101, 100),
            Err(AppError::PayloadTooLarge(_))
        ));
    }
}
