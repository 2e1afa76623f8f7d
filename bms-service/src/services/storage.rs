//! Uploaded file storage.

use super::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use std::path::PathBuf;

/// MIME types accepted for receipts, with the extension they are stored under.
pub const RECEIPT_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("application/pdf", "pdf"),
];

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    RECEIPT_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Store the bytes under `folder/name` and return the public URL path.
    async fn put(&self, folder: &str, name: &str, bytes: &[u8]) -> ServiceResult<String>;
}

/// Files on local disk under the public upload directory, served at `/uploads`.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !segment.starts_with('.')
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, folder: &str, name: &str, bytes: &[u8]) -> ServiceResult<String> {
        if !is_safe_segment(folder) || !is_safe_segment(name) {
            return Err(ServiceError::validation("Invalid upload path"));
        }
        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| anyhow::anyhow!("failed to create upload directory: {}", e))?;
        tokio::fs::write(dir.join(name), bytes)
            .await
            .map_err(|e| anyhow::anyhow!("failed to write upload: {}", e))?;

        tracing::info!(folder = %folder, file_name = %name, size = bytes.len(), "File stored");
        Ok(format!("/uploads/{}/{}", folder, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_maps_mime_to_extension() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("application/pdf; charset=binary"), Some("pdf"));
        assert_eq!(extension_for("text/html"), None);
    }

    #[test]
    fn rejects_traversal_segments() {
        assert!(is_safe_segment("receipts"));
        assert!(!is_safe_segment(".."));
        assert!(!is_safe_segment("a/b"));
    }

    #[tokio::test]
    async fn local_storage_writes_under_root() {
        let root = std::env::temp_dir().join(format!("bms-upload-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(&root);

        let url = storage.put("receipts", "r.pdf", b"%PDF-1.4").await.unwrap();

        assert_eq!(url, "/uploads/receipts/r.pdf");
        let written = tokio::fs::read(root.join("receipts/r.pdf")).await.unwrap();
        assert_eq!(written, b"%PDF-1.4");
        tokio::fs::remove_dir_all(root).await.ok();
    }
}
