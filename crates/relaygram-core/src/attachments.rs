//! File attachments.
//!
//! Files are uploaded to a content-addressed host and the message carries
//! only a [`FilePayload`] reference. The host is a trait; [`MemoryFileHost`]
//! keeps blobs in memory for tests and the demo.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::constants::{ALLOWED_FILE_TYPES, MAX_FILE_SIZE, MAX_IMAGE_SIZE};
use crate::error::{CoreResult, ResourceError};
use crate::models::FilePayload;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Media type from a file extension. Unknown extensions map to `application/octet-stream`.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("txt") | Some("text") | Some("md") => "text/plain",
        _ => FALLBACK_MIME,
    }
}

pub fn is_image(mime_type: &str) -> bool {
    mime_type.starts_with("image/")
}

pub fn validate_attachment(name: &str, size: u64, mime_type: &str) -> Result<(), ResourceError> {
    if !ALLOWED_FILE_TYPES.contains(&mime_type) {
        return Err(ResourceError::UnsupportedType(format!("{name} ({mime_type})")));
    }
    let max = if is_image(mime_type) {
        MAX_IMAGE_SIZE
    } else {
        MAX_FILE_SIZE
    };
    if size > max {
        return Err(ResourceError::TooLarge { size, max });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub cid: String,
    pub url: String,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

#[async_trait]
pub trait FileHost: Send + Sync {
    async fn upload(
        &self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, ResourceError>;
}

#[derive(Clone, Default)]
pub struct MemoryFileHost {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryFileHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn download(&self, cid: &str) -> Option<Vec<u8>> {
        self.blobs.read().get(cid).cloned()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl FileHost for MemoryFileHost {
    async fn upload(
        &self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedFile, ResourceError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ResourceError::Upload("file host unavailable".to_string()));
        }
        let cid = hex::encode(Sha256::digest(&bytes));
        let size = bytes.len() as u64;
        self.blobs.write().insert(cid.clone(), bytes);
        Ok(UploadedFile {
            url: format!("memory://{cid}"),
            cid,
            name: name.to_string(),
            size,
            mime_type: mime_type.to_string(),
        })
    }
}

/// Read, validate, and upload a file. The returned payload is ready to send.
pub async fn prepare_attachment(
    host: &dyn FileHost,
    path: &Path,
    caption: Option<String>,
) -> CoreResult<FilePayload> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ResourceError::Read(format!("not a file path: {}", path.display())))?
        .to_string();
    let mime_type = mime_for_path(path);

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|err| ResourceError::Read(format!("{}: {}", path.display(), err)))?;
    if !metadata.is_file() {
        return Err(ResourceError::Read(format!("not a file: {}", path.display())).into());
    }
    validate_attachment(&name, metadata.len(), mime_type)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|err| ResourceError::Read(format!("{}: {}", path.display(), err)))?;
    let uploaded = host.upload(&name, mime_type, bytes).await.map_err(|err| {
        tracing::error!("Attachment upload failed for {}: {}", name, err);
        err
    })?;
    tracing::info!(cid = %uploaded.cid, size = uploaded.size, "Attachment uploaded");

    Ok(FilePayload {
        cid: uploaded.cid,
        name: uploaded.name,
        size: uploaded.size,
        mime_type: uploaded.mime_type,
        caption: caption
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use tempfile::tempdir;

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("a.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("doc.pdf")), "application/pdf");
        assert_eq!(mime_for_path(Path::new("notes.txt")), "text/plain");
        assert_eq!(mime_for_path(Path::new("archive.zip")), FALLBACK_MIME);
        assert_eq!(mime_for_path(Path::new("noext")), FALLBACK_MIME);
    }

    #[test]
    fn size_limits_depend_on_type() {
        assert!(validate_attachment("a.png", MAX_IMAGE_SIZE, "image/png").is_ok());
        assert_eq!(
            validate_attachment("a.png", MAX_IMAGE_SIZE + 1, "image/png"),
            Err(ResourceError::TooLarge {
                size: MAX_IMAGE_SIZE + 1,
                max: MAX_IMAGE_SIZE
            })
        );
        assert!(validate_attachment("a.pdf", MAX_IMAGE_SIZE + 1, "application/pdf").is_ok());
        assert!(matches!(
            validate_attachment("a.pdf", MAX_FILE_SIZE + 1, "application/pdf"),
            Err(ResourceError::TooLarge { .. })
        ));
        assert!(matches!(
            validate_attachment("a.zip", 10, "application/zip"),
            Err(ResourceError::UnsupportedType(_))
        ));
    }

    #[tokio::test]
    async fn prepare_uploads_and_builds_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        std::fs::write(&path, b"hello world").unwrap();
        let host = MemoryFileHost::new();

        let payload = prepare_attachment(&host, &path, Some("  greeting ".into()))
            .await
            .unwrap();

        assert_eq!(payload.name, "hello.txt");
        assert_eq!(payload.size, 11);
        assert_eq!(payload.mime_type, "text/plain");
        assert_eq!(payload.caption.as_deref(), Some("greeting"));
        assert_eq!(host.download(&payload.cid).as_deref(), Some(&b"hello world"[..]));
    }

    #[tokio::test]
    async fn prepare_rejects_before_upload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tool.exe");
        std::fs::write(&path, b"MZ").unwrap();
        let host = MemoryFileHost::new();

        let err = prepare_attachment(&host, &path, None).await.unwrap_err();
        assert!(matches!(err, CoreError::Resource(ResourceError::UnsupportedType(_))));
        assert!(host.is_empty());

        let missing = dir.path().join("missing.txt");
        let err = prepare_attachment(&host, &missing, None).await.unwrap_err();
        assert!(matches!(err, CoreError::Resource(ResourceError::Read(_))));
    }

    #[tokio::test]
    async fn upload_failure_surfaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        let host = MemoryFileHost::new();
        host.set_failing(true);

        let err = prepare_attachment(&host, &path, None).await.unwrap_err();
        assert!(matches!(err, CoreError::Resource(ResourceError::Upload(_))));
    }
}
