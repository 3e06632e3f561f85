use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    application::error::ApplicationError,
    domain::models::file::{FileFilter, FileRecord, FileUpdate, FileUpload},
};

/// Persistence for file records and the blobs they reference.
///
/// Implementations call straight through to the backing store: no retries,
/// and no transaction spans a record together with its blob.
#[async_trait]
pub trait StorageHandler: Send + Sync {
    async fn ping(&self) -> Result<(), ApplicationError>;

    /// Bytes of the blob referenced by record `id`.
    async fn read(&self, id: Uuid) -> Result<Vec<u8>, ApplicationError>;

    /// Writes the blob, then the record pointing at it. Returns the record id.
    async fn create(&self, upload: FileUpload, content: Vec<u8>) -> Result<Uuid, ApplicationError>;

    /// Removes the record, then its blob.
    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError>;

    async fn update_fields(&self, id: Uuid, update: FileUpdate) -> Result<(), ApplicationError>;

    async fn query(&self, filter: FileFilter) -> Result<Vec<FileRecord>, ApplicationError>;
}
