use axum::extract::multipart::MultipartError;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::config::S3Config;
use crate::errors::AppError;

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
/// Room for multipart boundaries and part headers around the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
const TOO_LARGE_MESSAGE: &str = "Uploaded file exceeds the 5 MB limit";

/// Body limit for the upload routes. Without it axum stops reading at 2 MB.
pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)
}

/// Object storage for uploaded media (profile pictures, institution logos).
#[derive(Clone)]
pub struct MediaStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl MediaStore {
    /// Constructs an S3 client configured for MinIO (local) or AWS (production).
    pub async fn connect(config: &S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "omeiat-static",
        );

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        MediaStore {
            client: aws_sdk_s3::Client::new(&s3_config),
            bucket: config.bucket.clone(),
        }
    }

    /// Uploads an image under `<prefix>/<owner>/<random>.<ext>` and returns the key.
    pub async fn put_image(
        &self,
        prefix: &str,
        owner: Uuid,
        content_type: &str,
        body: Bytes,
    ) -> Result<String, AppError> {
        let ext = check_image(content_type, &body)?;
        let key = format!("{prefix}/{owner}/{}.{ext}", Uuid::new_v4());
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

        info!("Uploaded media to s3://{}/{}", self.bucket, key);
        Ok(key)
    }
}

/// Validates an uploaded image and returns the file extension to store it under.
pub fn check_image(content_type: &str, body: &[u8]) -> Result<&'static str, AppError> {
    let ext = image_extension(content_type).ok_or_else(|| {
        AppError::Validation(format!("Unsupported image type '{content_type}'"))
    })?;
    if body.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".to_string()));
    }
    if body.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::Validation(TOO_LARGE_MESSAGE.to_string()));
    }
    Ok(ext)
}

fn upload_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation(TOO_LARGE_MESSAGE.to_string())
    } else {
        AppError::Validation(format!("Malformed upload: {e}"))
    }
}

/// Pulls the first file part named `field_name` out of a multipart body.
pub async fn read_upload(
    multipart: &mut axum::extract::Multipart,
    field_name: &str,
) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(field_name) {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field.bytes().await.map_err(upload_error)?;
        return Ok((content_type, body));
    }
    Err(AppError::Validation(format!(
        "Missing file field '{field_name}'"
    )))
}

fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::extract::Multipart;
    use axum::http::{header, Request};
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;

    const BOUNDARY: &str = "omeiat-upload-boundary";

    async fn accept_picture(mut multipart: Multipart) -> Result<StatusCode, AppError> {
        let (content_type, body) = read_upload(&mut multipart, "picture").await?;
        check_image(&content_type, &body)?;
        Ok(StatusCode::NO_CONTENT)
    }

    fn upload_request(size: usize) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"picture\"; filename=\"me.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend(std::iter::repeat(0x89u8).take(size));
        body.extend(format!("\r\n--{BOUNDARY}--\r\n").into_bytes());
        Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn upload_router() -> Router {
        Router::new().route("/upload", post(accept_picture).layer(upload_body_limit()))
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("image/jpeg"), Some("jpg"));
        assert_eq!(image_extension("application/pdf"), None);
    }

    #[test]
    fn test_check_image() {
        assert_eq!(check_image("image/webp", b"data").unwrap(), "webp");
        assert!(check_image("image/png", b"").is_err());
        assert!(check_image("text/plain", b"data").is_err());
    }

    #[tokio::test]
    async fn test_three_megabyte_picture_accepted() {
        let response = upload_router()
            .oneshot(upload_request(3 * 1024 * 1024))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_oversized_picture_reports_limit() {
        let response = upload_router()
            .oneshot(upload_request(6 * 1024 * 1024))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains(TOO_LARGE_MESSAGE), "{text}");
    }
}
