//! File uploads
//!
//! Files land in one directory, served at `/uploads/*`, and are named
//! `<prefix>-<user>-<unix millis>.<ext>` where the extension always comes
//! from the accepted content type.

use std::path::{Path, PathBuf};

use chrono::Utc;
use dreamx_core::{DomainError, Snowflake};
use tracing::{debug, info, instrument, warn};

use crate::dto::UploadResponse;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Public path prefix uploads are served under
pub const UPLOADS_PATH: &str = "/uploads";

/// Content type and canonical extension pairs
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

const ATTACHMENT_TYPES: &[(&str, &str)] = &[
    ("application/pdf", "pdf"),
    ("text/plain", "txt"),
    ("video/mp4", "mp4"),
];

/// What an upload is for; decides the name prefix and allowed types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Avatar,
    Attachment,
}

impl UploadKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Avatar => "profile",
            Self::Attachment => "chat",
        }
    }

    fn allowed(self) -> impl Iterator<Item = &'static (&'static str, &'static str)> {
        let extra: &'static [(&'static str, &'static str)] = match self {
            Self::Avatar => &[],
            Self::Attachment => ATTACHMENT_TYPES,
        };
        IMAGE_TYPES.iter().chain(extra.iter())
    }

    /// Canonical extension for an accepted upload
    ///
    /// A generic or missing content type falls back to the file name's
    /// extension (`jpeg` counts as `jpg`).
    pub fn extension_for(self, content_type: Option<&str>, file_name: Option<&str>) -> Option<&'static str> {
        let content_type = content_type
            .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

        match content_type {
            Some(ct) => self.allowed().find(|(t, _)| *t == ct).map(|(_, ext)| *ext),
            None => {
                let ext = Path::new(file_name?).extension()?.to_str()?.to_ascii_lowercase();
                let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };
                self.allowed().find(|(_, e)| *e == ext).map(|(_, e)| *e)
            }
        }
    }
}

/// A file received from a multipart form
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Upload storage service
pub struct UploadService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> UploadService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    fn dir(&self) -> PathBuf {
        PathBuf::from(&self.ctx.config().storage.upload_dir)
    }

    /// Validate and write a file, returning its public URL
    #[instrument(skip(self, file), fields(size = file.bytes.len()))]
    pub async fn store(&self, user_id: Snowflake, kind: UploadKind, file: IncomingFile) -> ServiceResult<UploadResponse> {
        if file.bytes.is_empty() {
            return Err(DomainError::InvalidUpload("file is empty".into()).into());
        }
        let max = self.ctx.config().storage.max_file_size_bytes();
        if file.bytes.len() > max {
            return Err(DomainError::InvalidUpload(format!(
                "file exceeds {} MB",
                self.ctx.config().storage.max_file_size_mb
            ))
            .into());
        }

        let ext = kind
            .extension_for(file.content_type.as_deref(), file.file_name.as_deref())
            .ok_or_else(|| {
                DomainError::InvalidUpload(format!(
                    "unsupported file type {}",
                    file.content_type.as_deref().unwrap_or("unknown")
                ))
            })?;

        let name = format!("{}-{}-{}.{ext}", kind.prefix(), user_id, Utc::now().timestamp_millis());
        let dir = self.dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServiceError::internal(format!("cannot create upload dir: {e}")))?;
        tokio::fs::write(dir.join(&name), &file.bytes)
            .await
            .map_err(|e| ServiceError::internal(format!("cannot write upload: {e}")))?;

        info!(user_id = %user_id, file = %name, "Upload stored");
        Ok(UploadResponse { url: format!("{UPLOADS_PATH}/{name}") })
    }

    /// Delete a previously stored upload; failures are only logged
    pub async fn remove(&self, url: &str) {
        let Some(name) = url.strip_prefix(UPLOADS_PATH).and_then(|rest| rest.strip_prefix('/')) else {
            return;
        };
        if name.is_empty() || name.contains('/') || name.contains("..") {
            return;
        }

        match tokio::fs::remove_file(self.dir().join(name)).await {
            Ok(()) => debug!(file = %name, "Upload removed"),
            Err(e) => warn!(file = %name, error = %e, "Could not remove upload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{harness_with, test_config};

    fn png(bytes: usize) -> IncomingFile {
        IncomingFile {
            file_name: Some("me.PNG".into()),
            content_type: Some("image/png".into()),
            bytes: vec![7; bytes],
        }
    }

    #[test]
    fn test_extension_rules() {
        assert_eq!(UploadKind::Avatar.extension_for(Some("image/jpeg"), Some("x.jpeg")), Some("jpg"));
        assert_eq!(UploadKind::Avatar.extension_for(Some("IMAGE/WEBP; q=1"), None), Some("webp"));
        assert_eq!(UploadKind::Avatar.extension_for(Some("application/pdf"), Some("a.pdf")), None);
        assert_eq!(UploadKind::Attachment.extension_for(Some("application/pdf"), None), Some("pdf"));
        assert_eq!(UploadKind::Attachment.extension_for(None, Some("notes.TXT")), Some("txt"));
        assert_eq!(
            UploadKind::Attachment.extension_for(Some("application/octet-stream"), Some("clip.mp4")),
            Some("mp4")
        );
        assert_eq!(UploadKind::Attachment.extension_for(None, Some("noext")), None);
        assert_eq!(UploadKind::Attachment.extension_for(Some("application/zip"), Some("a.zip")), None);
    }

    #[tokio::test]
    async fn test_store_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness_with(test_config(&[("UPLOAD_DIR", dir.path().to_str().unwrap())])).await;
        let uploads = UploadService::new(&h.ctx);
        let user = Snowflake::new(42);

        let stored = uploads.store(user, UploadKind::Avatar, png(16)).await.unwrap();
        assert!(stored.url.starts_with("/uploads/profile-42-"));
        assert!(stored.url.ends_with(".png"));

        let name = stored.url.trim_start_matches("/uploads/");
        assert!(dir.path().join(name).exists());

        uploads.remove(&stored.url).await;
        assert!(!dir.path().join(name).exists());

        // outside the uploads path is ignored
        uploads.remove("/etc/passwd").await;
        uploads.remove("/uploads/../secret").await;
    }

    #[tokio::test]
    async fn test_rejects_oversized_empty_and_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness_with(test_config(&[
            ("UPLOAD_DIR", dir.path().to_str().unwrap()),
            ("MAX_FILE_SIZE_MB", "1"),
        ]))
        .await;
        let uploads = UploadService::new(&h.ctx);
        let user = Snowflake::new(1);

        let err = uploads.store(user, UploadKind::Avatar, png(1024 * 1024 + 1)).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_UPLOAD");

        let err = uploads.store(user, UploadKind::Avatar, png(0)).await.unwrap_err();
        assert_eq!(err.status_code(), 400);

        let pdf = IncomingFile {
            file_name: Some("cv.pdf".into()),
            content_type: Some("application/pdf".into()),
            bytes: vec![1; 8],
        };
        assert!(uploads.store(user, UploadKind::Avatar, pdf.clone()).await.is_err());
        let stored = uploads.store(user, UploadKind::Attachment, pdf).await.unwrap();
        assert!(stored.url.starts_with("/uploads/chat-1-"));
    }
}
