//! Multipart upload extractor
//!
//! Reads the `file` part of a `multipart/form-data` body into memory. Size
//! is capped by the body limit layer; content checks happen in the upload
//! service.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
};
use dreamx_service::IncomingFile;

use crate::response::ApiError;

/// Form field carrying the file
pub const FILE_FIELD: &str = "file";

#[derive(Debug)]
pub struct FileUpload(pub IncomingFile);

#[async_trait]
impl<S> FromRequest<S> for FileUpload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid_body(e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::invalid_body(e.body_text()))?
        {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }

            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::invalid_body(e.body_text()))?;

            return Ok(FileUpload(IncomingFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            }));
        }

        Err(ApiError::invalid_body(format!("Missing '{FILE_FIELD}' field")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;

    const BOUNDARY: &str = "XdreamxBoundary";

    fn multipart_request(field: &str) -> Request {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"me.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             PNGDATA\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::builder()
            .method("POST")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_reads_file_field() {
        let FileUpload(file) = FileUpload::from_request(multipart_request("file"), &()).await.unwrap();
        assert_eq!(file.file_name.as_deref(), Some("me.png"));
        assert_eq!(file.content_type.as_deref(), Some("image/png"));
        assert_eq!(file.bytes, b"PNGDATA");
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let err = FileUpload::from_request(multipart_request("avatar"), &()).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_REQUEST_BODY");
    }
}
