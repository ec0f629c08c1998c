//! Local image storage
//!
//! Files live under `<upload_dir>/<animal_id>/<uuid>.<ext>` and are served
//! from `<public_base_url>/<animal_id>/<uuid>.<ext>`.

use crate::config::StorageConfig;
use crate::errors::{AppError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Accepted content types and the extension stored for each
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
];

/// A file written by `ImageStore::save`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub url: String,
    pub file_path: String,
}

/// Upload directory plus the URL it is served under
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl ImageStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.upload_dir.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            max_bytes: config.max_upload_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File extension for an accepted content type
    pub fn extension_for(content_type: &str) -> Option<&'static str> {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        IMAGE_TYPES
            .iter()
            .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
            .map(|(_, ext)| *ext)
    }

    /// Check type and size without touching the disk
    pub fn check(&self, content_type: &str, len: usize) -> Result<&'static str> {
        let ext = Self::extension_for(content_type).ok_or_else(|| {
            AppError::field("image", "Upload a PNG, JPEG or WebP image")
        })?;
        if len == 0 {
            return Err(AppError::field("image", "The uploaded file is empty"));
        }
        if len > self.max_bytes {
            return Err(AppError::PayloadTooLarge { size: len, limit: self.max_bytes });
        }
        Ok(ext)
    }

    /// Write an image for an animal
    pub async fn save(&self, animal_id: Uuid, content_type: &str, bytes: &[u8]) -> Result<StoredImage> {
        let ext = self.check(content_type, bytes.len())?;
        let file_name = format!("{}.{}", Uuid::new_v4(), ext);

        let dir = self.root.join(animal_id.to_string());
        fs::create_dir_all(&dir).await?;

        let path = dir.join(&file_name);
        fs::write(&path, bytes).await.map_err(|e| AppError::Storage {
            message: format!("Failed to write {}: {}", path.display(), e),
        })?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "Image stored");

        Ok(StoredImage {
            url: format!("{}/{}/{}", self.public_base_url, animal_id, file_name),
            file_path: path.to_string_lossy().into_owned(),
        })
    }

    /// Unlink a stored file. Returns false when it was already gone.
    pub async fn remove(&self, file_path: &str) -> Result<bool> {
        let path = Path::new(file_path);
        if !path.starts_with(&self.root) {
            return Err(AppError::Storage {
                message: format!("Refusing to remove {} outside the upload directory", file_path),
            });
        }

        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %file_path, "Image file already missing");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
