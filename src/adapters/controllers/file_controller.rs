use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::QueryRejection,
        Path, Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    adapters::dto::file_dto::{MessageResponse, UploadFileResponse},
    application::{error::ApplicationError, services::StorageHandler},
    domain::models::file::{FileFilter, FileRecord, FileUpdate, FileUpload},
};

const FILE_FIELD: &str = "file";

pub struct FileController;

impl FileController {
    /// POST /upload
    /// Multipart body with a `file` part carrying a file name.
    pub async fn upload_file(
        State(storage): State<Arc<dyn StorageHandler>>,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Json<UploadFileResponse>, ApplicationError> {
        let mut multipart = multipart.map_err(|e| {
            warn!("Error parsing request form: {}", e);
            ApplicationError::BadRequest(e.body_text())
        })?;

        let mut upload: Option<(String, Vec<u8>)> = None;

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            warn!("Invalid multipart data: {}", e);
            ApplicationError::BadRequest(format!("invalid multipart data: {}", e))
        })? {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }

            let filename = field
                .file_name()
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    warn!("Multipart 'file' field has no file name");
                    ApplicationError::BadRequest("'file' field has no file name".to_string())
                })?;

            let bytes = field.bytes().await.map_err(|e| {
                warn!("Cannot read file bytes: {}", e);
                ApplicationError::BadRequest(format!("error reading file: {}", e))
            })?;

            upload = Some((filename, bytes.to_vec()));
            break;
        }

        let (filename, content) = upload.ok_or_else(|| {
            warn!("Missing required 'file' field in upload");
            ApplicationError::BadRequest("no form field with key 'file' found".to_string())
        })?;

        let file_upload = FileUpload::new(filename, content.len(), Utc::now());
        let id = storage.create(file_upload, content).await?;

        info!("File uploaded successfully: {}", id);
        Ok(Json(UploadFileResponse {
            message: "File uploaded successfully".to_string(),
            id,
        }))
    }

    /// GET /file/{id}
    /// Raw bytes, no JSON wrapper.
    pub async fn download_file(
        State(storage): State<Arc<dyn StorageHandler>>,
        Path(file_id): Path<String>,
    ) -> Result<Response, ApplicationError> {
        let id = parse_file_id(&file_id)?;
        let file_bytes = storage.read(id).await?;

        info!("File successfully retrieved: {}", id);
        Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            file_bytes,
        )
            .into_response())
    }

    /// DELETE /file/{id}
    pub async fn delete_file(
        State(storage): State<Arc<dyn StorageHandler>>,
        Path(file_id): Path<String>,
    ) -> Result<Json<MessageResponse>, ApplicationError> {
        let id = parse_file_id(&file_id)?;
        storage.delete(id).await?;

        info!("File successfully deleted: {}", id);
        Ok(Json(MessageResponse::new("File successfully deleted")))
    }

    /// PUT /file/{id}
    /// Body: JSON object with any of `name`, `timestamp`, `extension`,
    /// `size`, `hidden`.
    pub async fn update_file_info(
        State(storage): State<Arc<dyn StorageHandler>>,
        Path(file_id): Path<String>,
        body: Bytes,
    ) -> Result<Json<MessageResponse>, ApplicationError> {
        let id = parse_file_id(&file_id)?;

        let update = FileUpdate::from_json(&body).map_err(|e| {
            warn!("Error decoding request body: {}", e);
            ApplicationError::BadRequest(format!("invalid update body: {}", e))
        })?;

        if update.is_empty() {
            info!("Empty update for file {}, nothing to change", id);
        }
        storage.update_fields(id, update).await?;

        info!("File updated successfully: {}", id);
        Ok(Json(MessageResponse::new("File updated successfully")))
    }

    /// GET /files?field=value...
    pub async fn get_files(
        State(storage): State<Arc<dyn StorageHandler>>,
        query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    ) -> Result<Json<Vec<FileRecord>>, ApplicationError> {
        let Query(pairs) = query.map_err(|e| {
            warn!("Invalid query string: {}", e);
            ApplicationError::BadRequest(e.body_text())
        })?;

        let filter = FileFilter::from_query_pairs(pairs);
        debug!("Listing files with {} filter field(s)", filter.fields().len());
        let files = storage.query(filter).await?;

        info!("Files retrieved successfully: {} match(es)", files.len());
        Ok(Json(files))
    }
}

fn parse_file_id(raw: &str) -> Result<Uuid, ApplicationError> {
    Uuid::parse_str(raw).map_err(|e| {
        warn!("Invalid file id provided: {}, error: {}", raw, e);
        ApplicationError::BadRequest(format!("invalid file id '{}': {}", raw, e))
    })
}
