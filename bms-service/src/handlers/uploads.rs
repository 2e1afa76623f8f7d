use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::UploadResponse,
    middleware::AuthContext,
    models::Permission,
    services::storage::extension_for,
    AppState,
};

const RECEIPT_FOLDER: &str = "receipts";

/// Reading past the route's body limit surfaces as a multipart error with a
/// 413 status; keep that status instead of folding it into a 400.
fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!("Uploaded file is too large"))
    } else {
        AppError::BadRequest(anyhow::anyhow!("Invalid multipart body: {}", err.body_text()))
    }
}

fn receipt_extension(content_type: &str) -> Result<&'static str, AppError> {
    extension_for(content_type).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Unsupported file type {}; allowed: JPEG, PNG, WebP, PDF",
            content_type
        ))
    })
}

fn check_receipt_size(len: usize, max_bytes: usize) -> Result<(), AppError> {
    if len > max_bytes {
        return Err(AppError::PayloadTooLarge(anyhow::anyhow!(
            "File exceeds the {} MB limit",
            max_bytes / (1024 * 1024)
        )));
    }
    if len == 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!("Uploaded file is empty")));
    }
    Ok(())
}

/// Store a receipt image or PDF from the multipart field `file`.
pub async fn upload_receipt(
    State(state): State<AppState>,
    auth: AuthContext,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    auth.require(Permission::BillingWrite)?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let extension = receipt_extension(&content_type)?;

        let data = field.bytes().await.map_err(multipart_error)?;
        check_receipt_size(data.len(), state.config.uploads.max_bytes)?;

        let file_name = format!("{}.{}", Uuid::new_v4(), extension);
        let url = state.storage.put(RECEIPT_FOLDER, &file_name, &data).await?;

        tracing::info!(
            organization_id = %auth.org_id(),
            file_name = %file_name,
            size = data.len(),
            "Receipt uploaded"
        );

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                url,
                file_name,
                content_type,
                size: data.len(),
            }),
        ));
    }

    Err(AppError::BadRequest(anyhow::anyhow!("No file uploaded")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::DefaultBodyLimit,
        http::{header, Request},
        response::IntoResponse,
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    const BOUNDARY: &str = "receipt-boundary";

    /// Reads every field the way `upload_receipt` does.
    async fn drain(mut multipart: Multipart) -> Result<StatusCode, AppError> {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            field.bytes().await.map_err(multipart_error)?;
        }
        Ok(StatusCode::OK)
    }

    fn multipart_request(content_type: &str, payload: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"r.bin\"\r\n\
             Content-Type: {ct}\r\n\r\n",
            b = BOUNDARY,
            ct = content_type
        )
        .into_bytes();
        body.extend_from_slice(payload);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        Request::post("/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn body_over_route_limit_is_payload_too_large() {
        let app = Router::new()
            .route("/", post(drain))
            .layer(DefaultBodyLimit::max(1024));

        let res = app
            .oneshot(multipart_request("image/png", &vec![7u8; 8 * 1024]))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn body_within_route_limit_is_read() {
        let app = Router::new()
            .route("/", post(drain))
            .layer(DefaultBodyLimit::max(64 * 1024));

        let res = app
            .oneshot(multipart_request("image/png", b"PNGDATA"))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn file_over_cap_is_payload_too_large() {
        let cap = 10 * 1024 * 1024;
        assert!(check_receipt_size(cap, cap).is_ok());
        let err = check_receipt_size(cap + 1, cap).unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn empty_file_is_rejected() {
        let err = check_receipt_size(0, 1024).unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn only_allow_listed_types_are_accepted() {
        assert_eq!(receipt_extension("application/pdf").unwrap(), "pdf");
        assert_eq!(receipt_extension("image/jpeg").unwrap(), "jpg");
        for rejected in ["text/html", "image/svg+xml", "application/octet-stream"] {
            let err = receipt_extension(rejected).unwrap_err();
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
    }
}
