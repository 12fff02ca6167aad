//! Image persistence behind a trait so handlers never care whether files
//! land on local disk or somewhere else.

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist image bytes and return the public URL.
    async fn store(&self, bytes: Vec<u8>, folder: &str, extension: &str) -> Result<String>;

    /// Remove a previously stored image. Returns false when the URL does
    /// not belong to this store or the file is already gone.
    async fn delete(&self, url: &str) -> Result<bool>;
}

/// Map an upload's content type to a file extension. The configured
/// allow-list decides what is accepted; types we cannot name a file
/// extension for are rejected even when listed.
pub fn extension_for(content_type: &mime::Mime, allowed: &[String]) -> Result<&'static str> {
    let essence = content_type.essence_str();
    let unsupported =
        || AppError::Validation(format!("Unsupported image type: {}", content_type));

    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(essence)) {
        return Err(unsupported());
    }

    match essence {
        "image/jpeg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/webp" => Ok("webp"),
        "image/gif" => Ok("gif"),
        _ => Err(unsupported()),
    }
}

pub fn check_size(len: usize, max_bytes: usize) -> Result<()> {
    if len == 0 {
        return Err(AppError::Validation("Image file is empty".to_string()));
    }
    if len > max_bytes {
        return Err(AppError::Validation(format!(
            "Image exceeds the {} byte limit",
            max_bytes
        )));
    }
    Ok(())
}

/// Stores images under a local directory, served statically by the app.
pub struct LocalImageStore {
    root: PathBuf,
    base_url: String,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, bytes: Vec<u8>, folder: &str, extension: &str) -> Result<String> {
        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let dir = self.root.join(folder);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create upload dir: {}", e)))?;

        let path = dir.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write image: {}", e)))?;

        Ok(format!("{}/{}/{}", self.base_url, folder, file_name))
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        let relative = match url.strip_prefix(&self.base_url) {
            Some(rest) => rest.trim_start_matches('/'),
            None => return Ok(false),
        };

        // Reject anything trying to walk out of the upload root
        if relative.split('/').any(|part| part == "..") {
            return Ok(false);
        }

        let path = self.root.join(relative);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Internal(format!("Failed to delete image: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_allowed() -> Vec<String> {
        vec![
            "image/jpeg".to_string(),
            "image/png".to_string(),
            "image/webp".to_string(),
        ]
    }

    #[test]
    fn test_extension_allow_list() {
        let allowed = default_allowed();
        assert_eq!(extension_for(&mime::IMAGE_JPEG, &allowed).unwrap(), "jpg");
        assert_eq!(extension_for(&mime::IMAGE_PNG, &allowed).unwrap(), "png");
        assert!(extension_for(&mime::TEXT_PLAIN, &allowed).is_err());
        assert!(extension_for(&"image/gif".parse::<mime::Mime>().unwrap(), &allowed).is_err());
    }

    #[test]
    fn test_allow_list_is_configurable() {
        let gif_only = vec!["image/gif".to_string()];
        assert_eq!(
            extension_for(&"image/gif".parse::<mime::Mime>().unwrap(), &gif_only).unwrap(),
            "gif"
        );
        assert!(extension_for(&mime::IMAGE_JPEG, &gif_only).is_err());
        // Listed but unmappable types still fail closed
        let odd = vec!["image/tiff".to_string()];
        assert!(extension_for(&"image/tiff".parse::<mime::Mime>().unwrap(), &odd).is_err());
    }

    #[test]
    fn test_size_limits() {
        assert!(check_size(0, 100).is_err());
        assert!(check_size(50, 100).is_ok());
        assert!(check_size(101, 100).is_err());
    }

    #[tokio::test]
    async fn test_store_and_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/uploads");

        let url = store
            .store(vec![1, 2, 3], "listings", "jpg")
            .await
            .unwrap();
        assert!(url.starts_with("/uploads/listings/"));
        assert!(url.ends_with(".jpg"));

        assert!(store.delete(&url).await.unwrap());
        // Second delete is a no-op
        assert!(!store.delete(&url).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_ignores_foreign_urls() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(dir.path(), "/uploads");

        assert!(!store
            .delete("https://lh3.googleusercontent.com/photo.jpg")
            .await
            .unwrap());
        assert!(!store.delete("/uploads/../etc/passwd").await.unwrap());
    }
}
