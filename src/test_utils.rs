//! In-memory collaborators for router tests.
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    adapters::{router::build_router, state::AppState},
    application::{
        dto::file_dto::FileDTO,
        error::ApplicationError,
        services::{AuthValidator, StorageHandler},
    },
    domain::models::file::{FileFilter, FileRecord, FileUpdate, FileUpload},
    services::{AuthError, StorageError},
};

pub fn test_server(
    storage: Arc<InMemoryStorageHandler>,
    auth: Arc<StaticAuthValidator>,
) -> TestServer {
    let app_state = AppState {
        storage_handler: storage,
        auth_validator: auth,
    };
    TestServer::new(build_router(app_state)).unwrap()
}

pub fn sample_upload(name: &str) -> FileUpload {
    FileUpload::new(name.to_string(), 0, Utc::now())
}

/// Storage fake with document-store semantics: equality filters over the
/// stored document, shallow field updates.
#[derive(Default)]
pub struct InMemoryStorageHandler {
    files: Mutex<HashMap<Uuid, (FileRecord, Vec<u8>)>>,
    calls: AtomicUsize,
    fail: bool,
}

impl InMemoryStorageHandler {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn record(&self, id: Uuid) -> Option<FileRecord> {
        self.files
            .lock()
            .unwrap()
            .get(&id)
            .map(|(record, _)| record.clone())
    }

    /// Seeds a file without counting as a call.
    pub fn insert(&self, mut upload: FileUpload, content: Vec<u8>) -> Uuid {
        upload.size = content.len() as i64;
        let id = Uuid::new_v4();
        let record = FileDTO::new(upload, Uuid::new_v4()).into_record(id);
        self.files.lock().unwrap().insert(id, (record, content));
        id
    }

    fn enter(&self) -> Result<(), ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StorageError::Database("connection refused".to_string()).into());
        }
        Ok(())
    }
}

fn matches_filter(record: &FileRecord, filter: &FileFilter) -> bool {
    let stored = FileDTO {
        name: record.name.clone(),
        timestamp: record.timestamp,
        extension: record.extension.clone(),
        size: record.size,
        file_bytes: record.blob_id,
        hidden: record.hidden,
    };
    let document = serde_json::to_value(stored).unwrap();
    filter
        .fields()
        .iter()
        .all(|(key, value)| document.get(key) == Some(value))
}

#[async_trait]
impl StorageHandler for InMemoryStorageHandler {
    async fn ping(&self) -> Result<(), ApplicationError> {
        self.enter()
    }

    async fn read(&self, id: Uuid) -> Result<Vec<u8>, ApplicationError> {
        self.enter()?;
        self.files
            .lock()
            .unwrap()
            .get(&id)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| StorageError::NotFound(id.to_string()).into())
    }

    async fn create(&self, upload: FileUpload, content: Vec<u8>) -> Result<Uuid, ApplicationError> {
        self.enter()?;
        let id = Uuid::new_v4();
        let record = FileDTO::new(upload, Uuid::new_v4()).into_record(id);
        self.files.lock().unwrap().insert(id, (record, content));
        Ok(id)
    }

    async fn delete(&self, id: Uuid) -> Result<(), ApplicationError> {
        self.enter()?;
        self.files
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()).into())
    }

    async fn update_fields(&self, id: Uuid, update: FileUpdate) -> Result<(), ApplicationError> {
        self.enter()?;
        let mut files = self.files.lock().unwrap();
        let (record, _) = files
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        if let Some(name) = update.name {
            record.name = name;
        }
        if let Some(timestamp) = update.timestamp {
            record.timestamp = timestamp;
        }
        if let Some(extension) = update.extension {
            record.extension = extension;
        }
        if let Some(size) = update.size {
            record.size = size;
        }
        if let Some(hidden) = update.hidden {
            record.hidden = hidden;
        }
        Ok(())
    }

    async fn query(&self, filter: FileFilter) -> Result<Vec<FileRecord>, ApplicationError> {
        self.enter()?;
        Ok(self
            .files
            .lock()
            .unwrap()
            .values()
            .map(|(record, _)| record)
            .filter(|record| matches_filter(record, &filter))
            .cloned()
            .collect())
    }
}

pub enum AuthBehavior {
    Accept,
    Reject,
    Unavailable,
}

pub struct StaticAuthValidator {
    behavior: AuthBehavior,
    calls: AtomicUsize,
}

impl StaticAuthValidator {
    fn new(behavior: AuthBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn accepting() -> Self {
        Self::new(AuthBehavior::Accept)
    }

    pub fn rejecting() -> Self {
        Self::new(AuthBehavior::Reject)
    }

    pub fn unavailable() -> Self {
        Self::new(AuthBehavior::Unavailable)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthValidator for StaticAuthValidator {
    async fn validate(&self, _token: &str) -> Result<(), ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            AuthBehavior::Accept => Ok(()),
            AuthBehavior::Reject => Err(AuthError::Rejected("invalid token".to_string()).into()),
            AuthBehavior::Unavailable => {
                Err(AuthError::Unavailable("connection refused".to_string()).into())
            }
        }
    }
}
