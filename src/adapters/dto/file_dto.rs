use serde::Serialize;
use sqlx::{postgres::PgRow, types::Json, FromRow, Row};
use uuid::Uuid;

use crate::{application::dto::file_dto::FileDTO, domain::models::file::FileRecord};

/// A row of the file collection: the record id plus its JSONB document.
#[derive(Debug)]
pub struct FileRow {
    pub id: Uuid,
    pub document: FileDTO,
}

impl FromRow<'_, PgRow> for FileRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        let Json(document): Json<FileDTO> = row.try_get("document")?;
        Ok(FileRow {
            id: row.try_get("id")?,
            document,
        })
    }
}

impl From<FileRow> for FileRecord {
    fn from(value: FileRow) -> Self {
        value.document.into_record(value.id)
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadFileResponse {
    pub message: String,
    pub id: Uuid,
}
