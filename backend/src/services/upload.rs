//! Photo storage on the local filesystem

use axum::body::Bytes;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A file received in a multipart body, not yet written
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Clone)]
pub struct UploadService {
    dir: PathBuf,
}

/// Lowercase alphanumeric extension of an uploaded file name, if any
fn safe_extension(file_name: Option<&str>) -> Option<String> {
    let ext = Path::new(file_name?).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Stored file name: `<field>-<uuid>.<ext>`
fn stored_name(field: &str, file_name: Option<&str>) -> String {
    let field: String = field
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    match safe_extension(file_name) {
        Some(ext) => format!("{}-{}.{}", field, Uuid::new_v4(), ext),
        None => format!("{}-{}", field, Uuid::new_v4()),
    }
}

impl UploadService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reject anything that is not a non-empty image
    pub fn validate(file: &PendingFile) -> AppResult<()> {
        if file.bytes.is_empty() {
            return Err(AppError::field(&file.field, "Uploaded file is empty"));
        }
        let is_image = file
            .content_type
            .as_deref()
            .map_or(false, |ct| ct.starts_with("image/"));
        if !is_image {
            return Err(AppError::field(&file.field, "Only image uploads are accepted"));
        }
        Ok(())
    }

    /// Write a file and return its public path (`uploads/<name>`)
    pub async fn save(&self, file: &PendingFile) -> AppResult<String> {
        let name = stored_name(&file.field, file.file_name.as_deref());
        let path = self.dir.join(&name);

        tokio::fs::write(&path, &file.bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(file = %name, bytes = file.bytes.len(), "Stored upload");
        Ok(format!("uploads/{}", name))
    }

    /// Best-effort removal of files written for a request that later failed
    pub async fn discard(&self, public_paths: &[String]) {
        for public in public_paths {
            let Some(name) = public.strip_prefix("uploads/") else {
                continue;
            };
            if let Err(e) = tokio::fs::remove_file(self.dir.join(name)).await {
                tracing::warn!(file = %name, "Failed to remove orphaned upload: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: Option<&str>, bytes: &'static [u8]) -> PendingFile {
        PendingFile {
            field: "attendancePhoto".into(),
            file_name: Some("IMG_001.JPG".into()),
            content_type: content_type.map(str::to_string),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn test_stored_name_keeps_safe_extension() {
        let name = stored_name("photo_abc_before", Some("IMG_001.JPG"));
        assert!(name.starts_with("photo_abc_before-"));
        assert!(name.ends_with(".jpg"));
        assert!(!stored_name("x", Some("evil.php/../a")).contains(".."));
        assert!(!stored_name("../x", None).contains('/'));
    }

    #[test]
    fn test_validate_rejects_non_images() {
        assert!(UploadService::validate(&file(Some("image/jpeg"), b"\xff\xd8")).is_ok());
        assert!(UploadService::validate(&file(Some("text/plain"), b"hi")).is_err());
        assert!(UploadService::validate(&file(None, b"hi")).is_err());
        assert!(UploadService::validate(&file(Some("image/png"), b"")).is_err());
    }
}
