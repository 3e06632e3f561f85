use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    adapters::dto::file_dto::FileRow,
    application::{dto::file_dto::FileDTO, error::ApplicationError, services::StorageHandler},
    domain::{
        config::settings::StoreSettings,
        models::file::{FileFilter, FileRecord, FileUpdate, FileUpload},
    },
    services::StorageError,
};

/// Storage handler over PostgreSQL. Records are JSONB documents in the file
/// collection; blob bytes are split into fixed-size chunks across a header
/// table and a chunk table.
pub struct PgStorageHandler {
    pool: PgPool,
    schema: String,
    files_table: String,
    fs_table: String,
    chunks_table: String,
    chunk_size: usize,
}

impl PgStorageHandler {
    /// Table names come from `StoreSettings`, which only admits plain
    /// identifiers.
    pub fn new(pool: PgPool, settings: &StoreSettings) -> Self {
        let qualify = |table: &str| format!("{}.{}", settings.database, table);
        Self {
            pool,
            schema: settings.database.clone(),
            files_table: qualify(&settings.file_collection),
            fs_table: qualify(&settings.fs_collection),
            chunks_table: qualify(&settings.chunk_collection),
            chunk_size: settings.chunk_size,
        }
    }

    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        let statements = [
            format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    document JSONB NOT NULL
                )",
                self.files_table
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    filename TEXT NOT NULL,
                    length BIGINT NOT NULL,
                    chunk_size INTEGER NOT NULL,
                    upload_date TIMESTAMPTZ NOT NULL
                )",
                self.fs_table
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    files_id UUID NOT NULL REFERENCES {}(id) ON DELETE CASCADE,
                    n INTEGER NOT NULL,
                    data BYTEA NOT NULL,
                    PRIMARY KEY (files_id, n)
                )",
                self.chunks_table, self.fs_table
            ),
        ];

        for statement in &statements {
            query(statement).execute(&self.pool).await?;
        }

        info!("Storage tables ready in schema '{}'", self.schema);
        Ok(())
    }

    async fn put_blob(&self, filename: &str, content: &[u8]) -> Result<Uuid, StorageError> {
        let blob_id = Uuid::new_v4();
        let header_sql = format!(
            "INSERT INTO {} (id, filename, length, chunk_size, upload_date)
             VALUES ($1, $2, $3, $4, $5)",
            self.fs_table
        );
        let chunk_sql = format!(
            "INSERT INTO {} (files_id, n, data) VALUES ($1, $2, $3)",
            self.chunks_table
        );

        let mut tx = self.pool.begin().await?;

        query(&header_sql)
            .bind(blob_id)
            .bind(filename)
            .bind(content.len() as i64)
            .bind(self.chunk_size as i32)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        for (n, chunk) in content.chunks(self.chunk_size).enumerate() {
            query(&chunk_sql)
                .bind(blob_id)
                .bind(n as i32)
                .bind(chunk)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            "Stored blob {} ({} bytes, chunk size {})",
            blob_id,
            content.len(),
            self.chunk_size
        );
        Ok(blob_id)
    }

    async fn get_blob(&self, blob_id: Uuid) -> Result<Vec<u8>, StorageError> {
        let length_sql = format!("SELECT length FROM {} WHERE id = $1", self.fs_table);
        let length: i64 = query_as::<_, (i64,)>(&length_sql)
            .bind(blob_id)
            .fetch_optional(&self.pool)
            .await?
            .map(|(length,)| length)
            .ok_or_else(|| StorageError::NotFound(format!("blob {}", blob_id)))?;

        let chunks_sql = format!(
            "SELECT n, data FROM {} WHERE files_id = $1 ORDER BY n",
            self.chunks_table
        );
        let chunks: Vec<(i32, Vec<u8>)> = query_as(&chunks_sql)
            .bind(blob_id)
            .fetch_all(&self.pool)
            .await?;

        assemble_chunks(blob_id, chunks, length)
    }

    async fn delete_blob(&self, blob_id: Uuid) -> Result<(), StorageError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", self.fs_table);
        let result = query(&sql).bind(blob_id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("blob {}", blob_id)));
        }
        Ok(())
    }

    async fn find_record(&self, id: Uuid) -> Result<FileRow, StorageError> {
        let sql = format!("SELECT id, document FROM {} WHERE id = $1", self.files_table);
        query_as::<_, FileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl StorageHandler for PgStorageHandler {
    async fn ping(&self) -> Result<(), ApplicationError> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn read(&self, id: Uuid) -> Result<Vec<u8>, ApplicationError> {
        let record = self.find_record(id).await?;
        let bytes = self.get_blob(record.document.file_bytes).await?;
        Ok(bytes)
    }

    async fn create(&self, upload: FileUpload, content: Vec<u8>) -> Result<Uuid, ApplicationError> {
        let blob_id = self.put_blob(&upload.name, &content).await?;

        let id = Uuid::new_v4();
        let document =
            serde_json::to_value(FileDTO::new(upload, blob_id)).map_err(StorageError::from)?;
        let sql = format!(
            "INSERT INTO {} (id, document) VALUES ($1, $2)",
            self.files_table
        );

        query(&sql)
            .bind(id)
            .bind(document)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(id)
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 RETURNING id, document",
            self.files_table
        );
        let deleted = query_as::<_, FileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        info!("Deleted file record {} ({})", deleted.id, deleted.document.name);

        // A failure here leaves the blob orphaned; the record is already gone.
        self.delete_blob(deleted.document.file_bytes).await?;
        Ok(())
    }

    async fn update_fields(&self, id: Uuid, update: FileUpdate) -> Result<(), ApplicationError> {
        let patch = serde_json::to_value(&update).map_err(StorageError::from)?;
        let sql = format!(
            "UPDATE {} SET document = document || $2 WHERE id = $1",
            self.files_table
        );

        let result = query(&sql)
            .bind(id)
            .bind(patch)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id.to_string()).into());
        }
        Ok(())
    }

    async fn query(&self, filter: FileFilter) -> Result<Vec<FileRecord>, ApplicationError> {
        let sql = format!(
            "SELECT id, document FROM {} WHERE document @> $1
             ORDER BY (document->>'timestamp')::timestamptz, id",
            self.files_table
        );

        let rows: Vec<FileRow> = query_as::<_, FileRow>(&sql)
            .bind(filter.to_document())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(FileRecord::from).collect())
    }
}

/// Joins chunk rows back into the blob, checking that no chunk is missing
/// and that the total length matches the header.
fn assemble_chunks(
    blob_id: Uuid,
    chunks: Vec<(i32, Vec<u8>)>,
    expected_len: i64,
) -> Result<Vec<u8>, StorageError> {
    let corrupt = |reason: String| StorageError::CorruptBlob {
        blob_id: blob_id.to_string(),
        reason,
    };

    let mut bytes = Vec::with_capacity(usize::try_from(expected_len).unwrap_or(0));
    for (expected_n, (n, data)) in chunks.into_iter().enumerate() {
        if n as usize != expected_n {
            return Err(corrupt(format!("expected chunk {}, found {}", expected_n, n)));
        }
        bytes.extend_from_slice(&data);
    }

    if bytes.len() as i64 != expected_len {
        return Err(corrupt(format!(
            "expected {} bytes, found {}",
            expected_len,
            bytes.len()
        )));
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    async fn handler_with_chunk_size(pool: PgPool, chunk_size: usize) -> PgStorageHandler {
        let settings = StoreSettings {
            database_url: String::new(),
            database: "content".to_string(),
            file_collection: "files".to_string(),
            fs_collection: "fs_files".to_string(),
            chunk_collection: "fs_chunks".to_string(),
            chunk_size,
            max_connections: 1,
        };
        let handler = PgStorageHandler::new(pool, &settings);
        handler.ensure_schema().await.unwrap();
        handler
    }

    fn upload_of(name: &str, content: &[u8]) -> FileUpload {
        FileUpload::new(name.to_string(), content.len(), Utc::now())
    }

    fn filter(items: &[(&str, &str)]) -> FileFilter {
        FileFilter::from_query_pairs(
            items
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    async fn names(handler: &PgStorageHandler, items: &[(&str, &str)]) -> Vec<String> {
        let mut names: Vec<String> = handler
            .query(filter(items))
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.name)
            .collect();
        names.sort();
        names
    }

    async fn record(handler: &PgStorageHandler, id: Uuid) -> FileRecord {
        handler
            .query(filter(&[]))
            .await
            .unwrap()
            .into_iter()
            .find(|record| record.id == id)
            .unwrap()
    }

    async fn count(pool: &PgPool, table: &str) -> i64 {
        let (count,): (i64,) = query_as(&format!("SELECT COUNT(*) FROM content.{}", table))
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    #[sqlx::test(migrations = false)]
    async fn multi_chunk_blob_downloads_byte_identical(pool: PgPool) {
        let handler = handler_with_chunk_size(pool.clone(), 7).await;
        let content: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

        let id = handler
            .create(upload_of("big.bin", &content), content.clone())
            .await
            .unwrap();

        assert_eq!(count(&pool, "fs_chunks").await, 143);
        assert_eq!(handler.read(id).await.unwrap(), content);

        let stored = record(&handler, id).await;
        assert_eq!(stored.name, "big.bin");
        assert_eq!(stored.extension, ".bin");
        assert_eq!(stored.size, 1000);
        assert!(!stored.hidden);
    }

    #[sqlx::test(migrations = false)]
    async fn empty_file_round_trips(pool: PgPool) {
        let handler = handler_with_chunk_size(pool.clone(), 7).await;

        let id = handler.create(upload_of("empty", b""), Vec::new()).await.unwrap();

        assert_eq!(count(&pool, "fs_chunks").await, 0);
        assert!(handler.read(id).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = false)]
    async fn query_matches_size_numerically_and_other_fields_as_strings(pool: PgPool) {
        let handler = handler_with_chunk_size(pool, 64).await;
        for (name, len) in [("a.txt", 1000), ("b.txt", 10), ("c.png", 1000)] {
            let content = vec![b'x'; len];
            handler.create(upload_of(name, &content), content).await.unwrap();
        }

        assert_eq!(names(&handler, &[]).await, ["a.txt", "b.txt", "c.png"]);
        assert_eq!(names(&handler, &[("size", "1000")]).await, ["a.txt", "c.png"]);
        assert_eq!(
            names(&handler, &[("size", "1000"), ("extension", ".txt")]).await,
            ["a.txt"]
        );
        assert_eq!(
            names(&handler, &[("size", "abc"), ("extension", ".txt")]).await,
            ["a.txt", "b.txt"]
        );
        assert!(names(&handler, &[("hidden", "false")]).await.is_empty());
        assert!(names(&handler, &[("name", "missing")]).await.is_empty());
    }

    #[sqlx::test(migrations = false)]
    async fn query_orders_by_timestamp_instant(pool: PgPool) {
        let handler = handler_with_chunk_size(pool, 64).await;
        let whole = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 42).unwrap();
        let fractional = whole + Duration::milliseconds(890);

        for (name, timestamp) in [("later", fractional), ("earlier", whole)] {
            let upload = FileUpload::new(name.to_string(), 1, timestamp);
            handler.create(upload, b"x".to_vec()).await.unwrap();
        }

        let order: Vec<String> = handler
            .query(filter(&[]))
            .await
            .unwrap()
            .into_iter()
            .map(|record| record.name)
            .collect();
        assert_eq!(order, ["earlier", "later"]);
    }

    #[sqlx::test(migrations = false)]
    async fn update_merges_only_supplied_fields(pool: PgPool) {
        let handler = handler_with_chunk_size(pool, 64).await;
        let id = handler
            .create(upload_of("notes.txt", b"hello"), b"hello".to_vec())
            .await
            .unwrap();
        let before = record(&handler, id).await;

        handler.update_fields(id, FileUpdate::default()).await.unwrap();
        assert_eq!(record(&handler, id).await, before);

        let update = FileUpdate::from_json(br#"{"hidden": true, "name": "renamed.txt"}"#).unwrap();
        handler.update_fields(id, update).await.unwrap();

        let after = record(&handler, id).await;
        assert_eq!(after.name, "renamed.txt");
        assert!(after.hidden);
        assert_eq!(after.size, before.size);
        assert_eq!(after.extension, before.extension);
        assert_eq!(after.blob_id, before.blob_id);
        assert_eq!(handler.read(id).await.unwrap(), b"hello");
    }

    #[sqlx::test(migrations = false)]
    async fn deleted_file_is_gone_for_every_operation(pool: PgPool) {
        let handler = handler_with_chunk_size(pool.clone(), 2).await;
        let id = handler
            .create(upload_of("gone.txt", b"bye bye"), b"bye bye".to_vec())
            .await
            .unwrap();

        handler.delete(id).await.unwrap();

        assert_eq!(count(&pool, "files").await, 0);
        assert_eq!(count(&pool, "fs_files").await, 0);
        assert_eq!(count(&pool, "fs_chunks").await, 0);

        let not_found = |err: ApplicationError| {
            matches!(err, ApplicationError::InternalError(ref msg) if msg.contains("not found"))
        };
        assert!(not_found(handler.read(id).await.unwrap_err()));
        assert!(not_found(handler.delete(id).await.unwrap_err()));
        let update = FileUpdate::from_json(br#"{"hidden": true}"#).unwrap();
        assert!(not_found(handler.update_fields(id, update).await.unwrap_err()));
    }

    fn chunk_rows(content: &[u8], size: usize) -> Vec<(i32, Vec<u8>)> {
        content
            .chunks(size)
            .enumerate()
            .map(|(n, chunk)| (n as i32, chunk.to_vec()))
            .collect()
    }

    #[test]
    fn chunks_reassemble_into_the_stored_bytes() {
        let content: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let rows = chunk_rows(&content, 64);
        assert_eq!(rows.len(), 16);

        let bytes = assemble_chunks(Uuid::new_v4(), rows, 1000).unwrap();
        assert_eq!(bytes, content);
    }

    #[test]
    fn empty_blob_has_no_chunks() {
        let bytes = assemble_chunks(Uuid::new_v4(), Vec::new(), 0).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn missing_chunk_is_reported() {
        let mut rows = chunk_rows(b"abcdefghij", 3);
        rows.remove(1);

        let err = assemble_chunks(Uuid::new_v4(), rows, 10).unwrap_err();
        assert!(matches!(err, StorageError::CorruptBlob { .. }));
    }

    #[test]
    fn truncated_blob_is_reported() {
        let rows = chunk_rows(b"abcdef", 4);

        let err = assemble_chunks(Uuid::new_v4(), rows, 9).unwrap_err();
        assert!(matches!(err, StorageError::CorruptBlob { ref reason, .. } if reason.contains("9")));
    }
}
