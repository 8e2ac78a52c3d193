//! Client-scoped key generation and validation shared by all backends.

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

const MAX_FILENAME_LEN: usize = 200;

/// Prefix owning every object of a client.
pub fn client_prefix(client_id: Uuid) -> String {
    format!("clients/{}/", client_id)
}

/// Make a filename safe to embed in a key.
///
/// Keeps ASCII alphanumerics, `.`, `_` and `-`; anything else becomes `_`.
/// Leading dots are dropped so a name can never be `.` or `..`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    let mut result: String = if trimmed.len() > MAX_FILENAME_LEN {
        // keep the extension when truncating
        match trimmed.rsplit_once('.') {
            Some((stem, ext)) if ext.len() < 16 => {
                let keep = MAX_FILENAME_LEN.saturating_sub(ext.len() + 1);
                format!("{}.{}", &stem[..keep.min(stem.len())], ext)
            }
            _ => trimmed[..MAX_FILENAME_LEN].to_string(),
        }
    } else {
        trimmed.to_string()
    };

    if result.is_empty() || result.chars().all(|c| c == '_') {
        result = "file".to_string();
    }
    result
}

/// `clients/{client_id}/assets/{asset_id}/{filename}`
pub fn asset_key(client_id: Uuid, asset_id: Uuid, filename: &str) -> String {
    format!(
        "{}assets/{}/{}",
        client_prefix(client_id),
        asset_id,
        sanitize_filename(filename)
    )
}

/// `clients/{client_id}/assets/{asset_id}/converted/{stem}[-dark][-{size}].{format}`
pub fn converted_key(
    client_id: Uuid,
    asset_id: Uuid,
    original_filename: &str,
    format: &str,
    dark_variant: bool,
    size: Option<u32>,
) -> String {
    let sanitized = sanitize_filename(original_filename);
    let stem = sanitized
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(&sanitized);
    let dark = if dark_variant { "-dark" } else { "" };
    let size = size.map(|s| format!("-{}", s)).unwrap_or_default();
    format!(
        "{}assets/{}/converted/{}{}{}.{}",
        client_prefix(client_id),
        asset_id,
        stem,
        dark,
        size,
        format.to_lowercase()
    )
}

/// `clients/{client_id}/inspiration/{section_id}/{image_id}-{filename}`
pub fn inspiration_key(client_id: Uuid, section_id: Uuid, image_id: Uuid, filename: &str) -> String {
    format!(
        "{}inspiration/{}/{}-{}",
        client_prefix(client_id),
        section_id,
        image_id,
        sanitize_filename(filename)
    )
}

/// Reject keys that are empty, absolute, or contain traversal segments.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Reject keys that do not live under the given client's prefix.
pub fn ensure_client_scope(storage_key: &str, client_id: Uuid) -> StorageResult<()> {
    validate_key(storage_key)?;
    if !storage_key.starts_with(&client_prefix(client_id)) {
        return Err(StorageError::InvalidKey(format!(
            "Storage key is outside client {}",
            client_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_keys_are_client_scoped() {
        let client = Uuid::new_v4();
        let asset = Uuid::new_v4();
        let key = asset_key(client, asset, "Primary Logo.png");
        assert_eq!(key, format!("clients/{}/assets/{}/Primary_Logo.png", client, asset));
        assert!(ensure_client_scope(&key, client).is_ok());
        assert!(ensure_client_scope(&key, Uuid::new_v4()).is_err());
    }

    #[test]
    fn converted_key_includes_variant_and_size() {
        let client = Uuid::new_v4();
        let asset = Uuid::new_v4();
        let key = converted_key(client, asset, "logo.svg", "PNG", true, Some(512));
        assert!(key.ends_with("/converted/logo-dark-512.png"));
        let plain = converted_key(client, asset, "logo.png", "webp", false, None);
        assert!(plain.ends_with("/converted/logo.webp"));
    }

    #[test]
    fn sanitize_strips_paths_and_dots() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..hidden"), "hidden");
        assert_eq!(sanitize_filename("résumé final.pdf"), "r_sum__final.pdf");
        assert_eq!(sanitize_filename("...."), "file");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn sanitize_truncates_but_keeps_extension() {
        let long = format!("{}.woff2", "a".repeat(400));
        let sanitized = sanitize_filename(&long);
        assert_eq!(sanitized.len(), MAX_FILENAME_LEN);
        assert!(sanitized.ends_with(".woff2"));
    }

    #[test]
    fn validate_rejects_traversal() {
        assert!(validate_key("clients/a/../b").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("clients/a/assets/b/logo.png").is_ok());
    }

    #[test]
    fn scope_check_requires_full_prefix() {
        let client = Uuid::new_v4();
        let sneaky = format!("clients/{}x/assets/logo.png", client);
        assert!(ensure_client_scope(&sneaky, client).is_err());
    }
}
