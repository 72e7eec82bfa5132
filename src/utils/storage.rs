use std::path::PathBuf;

use crate::utils::error::AppError;

/// Local-disk file store for proof images and ticket QR codes.
///
/// Stored files are addressed by a URL path relative to the server root
/// (`/uploads/<bucket>/<file>`), which is what gets persisted on payment
/// and booking rows.
#[derive(Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes `bytes` under `<root>/<bucket>/<file_name>`, creating the
    /// bucket directory on first use, and returns the public URL path.
    pub async fn store(
        &self,
        bucket: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        let dir = self.root.join(bucket);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::InternalServerError(format!("Failed to create upload directory: {e}"))
        })?;

        let path = dir.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::InternalServerError(format!("Failed to store file: {e}")))?;

        Ok(format!("/uploads/{bucket}/{file_name}"))
    }

    /// Resolves a previously returned `/uploads/...` URL back to the disk
    /// path, rejecting anything that escapes the upload root.
    pub fn resolve(&self, url: &str) -> Result<PathBuf, AppError> {
        let rel = url.trim_start_matches('/');
        let rel = rel
            .strip_prefix("uploads/")
            .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

        if rel.split('/').any(|seg| seg.is_empty() || seg == "..") {
            return Err(AppError::NotFound("File not found".to_string()));
        }

        Ok(self.root.join(rel))
    }

    pub async fn read(&self, url: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(url)?;
        tokio::fs::read(&path)
            .await
            .map_err(|_| AppError::NotFound("File not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_maps_url_under_root() {
        let store = FileStore::new("/srv/uploads");
        let path = store.resolve("/uploads/qrcodes/payment_x.png").unwrap();
        assert_eq!(path, PathBuf::from("/srv/uploads/qrcodes/payment_x.png"));
    }

    #[test]
    fn resolve_rejects_traversal() {
        let store = FileStore::new("/srv/uploads");
        assert!(store.resolve("/uploads/../etc/passwd").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
    }
}
