//! Report upload endpoint.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_path: String,
}

/// Store the first file field of a multipart body
pub async fn upload_handler(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServiceResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|e| ServiceError::InvalidRequest {
        message: e.body_text(),
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidRequest {
            message: e.body_text(),
        })?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let data = field.bytes().await.map_err(|e| ServiceError::InvalidRequest {
            message: e.body_text(),
        })?;

        let path = state.store.save(&filename, &data).await?;
        metrics::counter!("omega_uploads_total").increment(1);
        info!(filename = %filename, size = data.len(), "Report uploaded");

        return Ok(Json(UploadResponse {
            message: "File uploaded successfully".to_string(),
            file_path: path.display().to_string(),
        }));
    }

    Err(ServiceError::InvalidRequest {
        message: "No file provided".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{MAX_UPLOAD_BYTES, StubChain, test_router};
    use crate::storage::UploadStore;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::Value;
    use std::sync::Arc;

    fn server(dir: &std::path::Path) -> TestServer {
        let app = test_router(UploadStore::new(dir), Arc::new(StubChain::default()));
        TestServer::new(app).unwrap()
    }

    fn file_form(name: &str, content: &[u8]) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(content.to_vec())
                .file_name(name)
                .mime_type("application/octet-stream"),
        )
    }

    #[tokio::test]
    async fn test_upload_stores_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());
        let content = b"%PDF-1.4 lab results \xff\xfe".to_vec();

        let response = server
            .post("/upload/")
            .multipart(file_form("report.pdf", &content))
            .await;

        response.assert_status(StatusCode::OK);
        let body: Value = response.json();
        assert_eq!(body["message"], "File uploaded successfully");
        let file_path = body["file_path"].as_str().unwrap();
        assert_eq!(
            std::path::Path::new(file_path),
            dir.path().join("report.pdf")
        );
        assert_eq!(std::fs::read(file_path).unwrap(), content);
    }

    #[tokio::test]
    async fn test_reupload_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        server
            .post("/upload/")
            .multipart(file_form("report.pdf", b"old contents"))
            .await
            .assert_status(StatusCode::OK);
        let response = server
            .post("/upload/")
            .multipart(file_form("report.pdf", b"new"))
            .await;

        let body: Value = response.json();
        assert_eq!(
            std::fs::read(body["file_path"].as_str().unwrap()).unwrap(),
            b"new"
        );
    }

    #[tokio::test]
    async fn test_upload_without_file_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        let form = MultipartForm::new().add_text("note", "no file here");
        let response = server.post("/upload/").multipart(form).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["detail"], "Invalid request: No file provided");
    }

    #[tokio::test]
    async fn test_upload_skips_leading_text_fields() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        let form = MultipartForm::new()
            .add_text("patient", "anonymous")
            .add_part("file", Part::bytes(b"CBC normal".to_vec()).file_name("cbc.txt"));
        let response = server.post("/upload/").multipart(form).await;

        response.assert_status(StatusCode::OK);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("cbc.txt")).unwrap(),
            "CBC normal"
        );
    }

    #[tokio::test]
    async fn test_upload_directory_components_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        let server = server(&uploads);

        let response = server
            .post("/upload/")
            .multipart(file_form("../outside.txt", b"x"))
            .await;

        response.assert_status(StatusCode::OK);
        assert!(uploads.join("outside.txt").exists());
        assert!(!dir.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn test_non_multipart_body_is_internal_error() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        let response = server.post("/upload/").text("raw bytes").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert!(!body["detail"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_over_size_cap_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());
        let content = vec![b'x'; MAX_UPLOAD_BYTES + 4096];

        let response = server
            .post("/upload/")
            .multipart(file_form("scan.bin", &content))
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert!(body["detail"].is_string());
        assert!(!dir.path().join("scan.bin").exists());
    }
}
