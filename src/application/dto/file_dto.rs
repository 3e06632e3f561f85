use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::file::{FileRecord, FileUpload};

/// Stored form of a file record. The record id lives outside the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDTO {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub extension: String,
    pub size: i64,
    #[serde(rename = "fileBytes")]
    pub file_bytes: Uuid,
    pub hidden: bool,
}

impl FileDTO {
    pub fn new(upload: FileUpload, blob_id: Uuid) -> Self {
        Self {
            name: upload.name,
            timestamp: upload.timestamp,
            extension: upload.extension,
            size: upload.size,
            file_bytes: blob_id,
            hidden: upload.hidden,
        }
    }

    pub fn into_record(self, id: Uuid) -> FileRecord {
        FileRecord {
            id,
            name: self.name,
            timestamp: self.timestamp,
            extension: self.extension,
            size: self.size,
            blob_id: self.file_bytes,
            hidden: self.hidden,
        }
    }
}
