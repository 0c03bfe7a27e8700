//! File service for filedepot.
//!
//! Orchestrates the blob store and the metadata store. Neither store knows
//! about the other; this is the only place where both are touched.
//!
//! # Ordering
//!
//! The two stores share no transaction, so each direction commits its last
//! step in the metadata store:
//! - upload writes the blob, then inserts the record
//! - delete removes the blob, then deletes the record
//!
//! A failure between the two steps leaves at most one dangling artifact
//! (an orphaned blob after a failed insert, or a record pointing at a
//! removed blob after a failed delete). Nothing is retried or rolled back.

use tracing::{error, info, warn};

use crate::error::Step;
use crate::{DepotError, Result};

use super::metadata::{FileRecord, MetadataStore, NewFile, StoreError};
use super::storage::{bytes_stream, BlobStore, ByteStream};
use super::validation::validate;

/// Request data for file upload.
pub struct UploadRequest<'a> {
    /// File name.
    pub name: String,
    /// Declared size in bytes.
    pub size: u64,
    /// File content.
    pub content: ByteStream<'a>,
}

impl<'a> UploadRequest<'a> {
    /// Create a new upload request from a byte stream and its declared size.
    pub fn new(name: impl Into<String>, size: u64, content: ByteStream<'a>) -> Self {
        Self {
            name: name.into(),
            size,
            content,
        }
    }
}

impl UploadRequest<'static> {
    /// Create an upload request from an in-memory buffer.
    pub fn from_bytes(name: impl Into<String>, content: impl Into<bytes::Bytes>) -> Self {
        let content = content.into();
        Self::new(name, content.len() as u64, bytes_stream(content))
    }
}

/// Result of a file download.
#[derive(Debug)]
pub struct DownloadResult {
    /// File metadata.
    pub metadata: FileRecord,
    /// File content.
    pub content: Vec<u8>,
}

/// File service for managing uploads, downloads and deletions.
#[derive(Debug)]
pub struct FileService<M, B> {
    metadata: M,
    storage: B,
    max_file_size: u64,
}

impl<M: MetadataStore, B: BlobStore> FileService<M, B> {
    /// Create a new FileService.
    pub fn new(metadata: M, storage: B, max_file_size: u64) -> Self {
        Self {
            metadata,
            storage,
            max_file_size,
        }
    }

    /// Get the blob store.
    pub fn storage(&self) -> &B {
        &self.storage
    }

    /// List all file records.
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        self.metadata.list_all().await.map_err(|e| {
            error!(step = %Step::Lookup, error = %e, "list failed");
            DepotError::store(Step::Lookup, e)
        })
    }

    /// Get a file record by name.
    pub async fn get(&self, name: &str) -> Result<FileRecord> {
        match self.metadata.find_by_name(name).await {
            Ok(file) => Ok(file),
            Err(StoreError::NotFound(_)) => Err(DepotError::NotFound(name.to_string())),
            Err(e) => {
                error!(name, step = %Step::Lookup, error = %e, "lookup failed");
                Err(DepotError::store(Step::Lookup, e))
            }
        }
    }

    /// Get a file record together with its content.
    pub async fn download(&self, name: &str) -> Result<DownloadResult> {
        let metadata = self.get(name).await?;

        let content = self.storage.read(name).await.map_err(|e| {
            error!(name, step = %Step::BlobRead, error = %e, "record has no readable blob");
            DepotError::storage(Step::BlobRead, e)
        })?;

        Ok(DownloadResult { metadata, content })
    }

    /// Upload a file.
    ///
    /// Steps, each aborting on failure:
    /// 1. duplicate check (an existing record is a conflict)
    /// 2. validation of name and declared size
    /// 3. blob write
    /// 4. metadata insert
    pub async fn upload(&self, request: UploadRequest<'_>) -> Result<FileRecord> {
        let UploadRequest {
            name,
            size,
            content,
        } = request;

        match self.metadata.find_by_name(&name).await {
            Err(StoreError::NotFound(_)) => {}
            Ok(existing) => {
                warn!(name = %name, id = existing.id, "upload rejected: file exists");
                return Err(DepotError::Conflict(name));
            }
            Err(e) => {
                error!(name = %name, step = %Step::DuplicateCheck, error = %e, "upload failed");
                return Err(DepotError::store(Step::DuplicateCheck, e));
            }
        }

        let candidate = NewFile::new(name, size);
        if let Err(e) = validate(&candidate, self.max_file_size) {
            warn!(name = %candidate.name, size, error = %e, "upload rejected");
            return Err(e.into());
        }

        let path = match self.storage.write(&candidate.name, content).await {
            Ok(path) => path,
            Err(e) => {
                error!(name = %candidate.name, step = %Step::BlobWrite, error = %e, "upload failed");
                return Err(DepotError::storage(Step::BlobWrite, e));
            }
        };

        let file = match self.metadata.create(&candidate, &path).await {
            Ok(file) => file,
            Err(StoreError::Conflict(name)) => {
                warn!(name = %name, path = %path, "lost insert race; blob left orphaned");
                return Err(DepotError::Conflict(name));
            }
            Err(e) => {
                error!(
                    name = %candidate.name,
                    step = %Step::MetadataCommit,
                    path = %path,
                    error = %e,
                    "upload failed; blob left orphaned"
                );
                return Err(DepotError::store(Step::MetadataCommit, e));
            }
        };

        info!(name = %file.name, id = file.id, size = file.size, "file uploaded");
        Ok(file)
    }

    /// Delete a file.
    ///
    /// Steps, each aborting on failure:
    /// 1. existence check (a missing record is NotFound; the blob store is
    ///    not touched)
    /// 2. blob remove (a missing blob is an error)
    /// 3. metadata delete
    pub async fn delete(&self, name: &str) -> Result<()> {
        match self.metadata.find_by_name(name).await {
            Ok(_) => {}
            Err(StoreError::NotFound(_)) => {
                return Err(DepotError::NotFound(name.to_string()));
            }
            Err(e) => {
                error!(name, step = %Step::ExistenceCheck, error = %e, "delete failed");
                return Err(DepotError::store(Step::ExistenceCheck, e));
            }
        }

        if let Err(e) = self.storage.remove(name).await {
            error!(name, step = %Step::BlobRemove, error = %e, "delete failed; record kept");
            return Err(DepotError::storage(Step::BlobRemove, e));
        }

        if let Err(e) = self.metadata.delete_by_name(name).await {
            error!(
                name,
                step = %Step::MetadataRemove,
                error = %e,
                "delete failed; record left without blob"
            );
            return Err(DepotError::store(Step::MetadataRemove, e));
        }

        info!(name, "file deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;
    use futures::StreamExt;
    use tempfile::TempDir;

    use super::*;
    use crate::db::Database;
    use crate::file::{FileRepository, FileStorage, StorageError, ValidationError};

    const MAX: u64 = 10 * 1024 * 1024;

    // ------------------------------------------------------------------
    // In-memory stores with failure injection
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MemoryMetadata {
        records: Mutex<Vec<FileRecord>>,
        next_id: AtomicI64,
        fail_find: bool,
        fail_create: bool,
        conflict_on_create: bool,
        fail_delete: bool,
    }

    fn db_failure() -> StoreError {
        StoreError::Database(sqlx::Error::PoolTimedOut)
    }

    #[async_trait]
    impl MetadataStore for MemoryMetadata {
        async fn list_all(&self) -> std::result::Result<Vec<FileRecord>, StoreError> {
            if self.fail_find {
                return Err(db_failure());
            }
            Ok(self.records.lock().unwrap().clone())
        }

        async fn find_by_name(&self, name: &str) -> std::result::Result<FileRecord, StoreError> {
            if self.fail_find {
                return Err(db_failure());
            }
            self.records
                .lock()
                .unwrap()
                .iter()
                .find(|f| f.name == name)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(name.to_string()))
        }

        async fn create(
            &self,
            file: &NewFile,
            path: &str,
        ) -> std::result::Result<FileRecord, StoreError> {
            if self.fail_create {
                return Err(db_failure());
            }
            if self.conflict_on_create {
                return Err(StoreError::Conflict(file.name.clone()));
            }
            let now = Utc::now();
            let record = FileRecord {
                id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
                name: file.name.clone(),
                path: path.to_string(),
                size: file.size as i64,
                created_at: now,
                updated_at: now,
            };
            self.records.lock().unwrap().push(record.clone());
            Ok(record)
        }

        async fn delete_by_name(&self, name: &str) -> std::result::Result<bool, StoreError> {
            if self.fail_delete {
                return Err(db_failure());
            }
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|f| f.name != name);
            Ok(records.len() < before)
        }
    }

    #[derive(Default)]
    struct MemoryBlobs {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
        calls: AtomicUsize,
        fail_write: bool,
        fail_remove: bool,
    }

    impl MemoryBlobs {
        fn insert(&self, name: &str, content: &[u8]) {
            self.blobs
                .lock()
                .unwrap()
                .insert(name.to_string(), content.to_vec());
        }

        fn contains(&self, name: &str) -> bool {
            self.blobs.lock().unwrap().contains_key(name)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BlobStore for MemoryBlobs {
        async fn write(
            &self,
            name: &str,
            mut stream: ByteStream<'_>,
        ) -> std::result::Result<String, StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_write {
                return Err(StorageError::Io(io::Error::other("disk full")));
            }
            let mut content = Vec::new();
            while let Some(chunk) = stream.next().await {
                content.extend_from_slice(&chunk?);
            }
            self.insert(name, &content);
            Ok(format!("mem://{name}"))
        }

        async fn read(&self, name: &str) -> std::result::Result<Vec<u8>, StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.blobs
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(name.to_string()))
        }

        async fn remove(&self, name: &str) -> std::result::Result<(), StorageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_remove {
                return Err(StorageError::Io(io::Error::other("permission denied")));
            }
            self.blobs
                .lock()
                .unwrap()
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| StorageError::NotFound(name.to_string()))
        }
    }

    fn memory_service(
        metadata: MemoryMetadata,
        blobs: MemoryBlobs,
    ) -> FileService<MemoryMetadata, MemoryBlobs> {
        FileService::new(metadata, blobs, MAX)
    }

    async fn real_service() -> (TempDir, FileService<FileRepository, FileStorage>) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let storage = FileStorage::new(temp_dir.path().join("files")).await.unwrap();
        let service = FileService::new(FileRepository::new(db.pool().clone()), storage, MAX);
        (temp_dir, service)
    }

    // ------------------------------------------------------------------
    // Upload
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_upload_happy_path() {
        let (_temp_dir, service) = real_service().await;
        let content = vec![b'x'; 1024];

        let file = service
            .upload(UploadRequest::from_bytes("report.csv", content.clone()))
            .await
            .unwrap();

        assert!(file.id > 0);
        assert_eq!(file.name, "report.csv");
        assert_eq!(file.size, 1024);
        assert!(!file.path.is_empty());

        let found = service.get("report.csv").await.unwrap();
        assert_eq!(found, file);
        assert_eq!(service.storage().read("report.csv").await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_upload_duplicate_leaves_original_untouched() {
        let (_temp_dir, service) = real_service().await;
        let original = service
            .upload(UploadRequest::from_bytes("a.txt", "original"))
            .await
            .unwrap();

        let result = service
            .upload(UploadRequest::from_bytes("a.txt", "replacement!"))
            .await;

        assert!(matches!(result, Err(DepotError::Conflict(name)) if name == "a.txt"));
        assert_eq!(service.get("a.txt").await.unwrap(), original);
        assert_eq!(service.storage().read("a.txt").await.unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_upload_validation_failure_writes_nothing() {
        let service = memory_service(MemoryMetadata::default(), MemoryBlobs::default());

        let empty = service
            .upload(UploadRequest::new("a.txt", 0, bytes_stream("")))
            .await;
        let too_large = service
            .upload(UploadRequest::new("b.txt", MAX, bytes_stream("x")))
            .await;
        let traversal = service
            .upload(UploadRequest::from_bytes("../c.txt", "x"))
            .await;

        assert!(matches!(
            empty,
            Err(DepotError::Validation(ValidationError::FileEmpty))
        ));
        assert!(matches!(
            too_large,
            Err(DepotError::Validation(ValidationError::FileTooLarge { .. }))
        ));
        assert!(matches!(
            traversal,
            Err(DepotError::Validation(ValidationError::InvalidName(_)))
        ));
        assert_eq!(service.storage().calls(), 0);
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_empty_name() {
        let service = memory_service(MemoryMetadata::default(), MemoryBlobs::default());

        let result = service
            .upload(UploadRequest::from_bytes("", "content"))
            .await;

        assert!(matches!(
            result,
            Err(DepotError::Validation(ValidationError::NameRequired))
        ));
    }

    #[tokio::test]
    async fn test_upload_lookup_failure_is_not_a_conflict() {
        let metadata = MemoryMetadata {
            fail_find: true,
            ..Default::default()
        };
        let service = memory_service(metadata, MemoryBlobs::default());

        let result = service
            .upload(UploadRequest::from_bytes("a.txt", "data"))
            .await;

        assert!(matches!(
            result,
            Err(DepotError::Store {
                step: Step::DuplicateCheck,
                ..
            })
        ));
        assert_eq!(service.storage().calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_blob_write_failure_creates_no_record() {
        let blobs = MemoryBlobs {
            fail_write: true,
            ..Default::default()
        };
        let service = memory_service(MemoryMetadata::default(), blobs);

        let result = service
            .upload(UploadRequest::from_bytes("a.txt", "data"))
            .await;

        assert!(matches!(
            result,
            Err(DepotError::Storage {
                step: Step::BlobWrite,
                ..
            })
        ));
        assert!(matches!(
            service.get("a.txt").await,
            Err(DepotError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_metadata_failure_orphans_blob() {
        let metadata = MemoryMetadata {
            fail_create: true,
            ..Default::default()
        };
        let service = memory_service(metadata, MemoryBlobs::default());

        let result = service
            .upload(UploadRequest::from_bytes("a.txt", "data"))
            .await;

        assert!(matches!(
            result,
            Err(DepotError::Store {
                step: Step::MetadataCommit,
                ..
            })
        ));
        assert!(service.storage().contains("a.txt"));
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upload_lost_insert_race_is_conflict() {
        let metadata = MemoryMetadata {
            conflict_on_create: true,
            ..Default::default()
        };
        let service = memory_service(metadata, MemoryBlobs::default());

        let result = service
            .upload(UploadRequest::from_bytes("a.txt", "data"))
            .await;

        assert!(matches!(result, Err(DepotError::Conflict(name)) if name == "a.txt"));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_same_name() {
        let (_temp_dir, service) = real_service().await;

        let (first, second) = tokio::join!(
            service.upload(UploadRequest::from_bytes("same.txt", "first")),
            service.upload(UploadRequest::from_bytes("same.txt", "second"))
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(DepotError::Conflict(_))))
                .count(),
            1
        );
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_delete_happy_path() {
        let (_temp_dir, service) = real_service().await;
        service
            .upload(UploadRequest::from_bytes("a.txt", "data"))
            .await
            .unwrap();

        service.delete("a.txt").await.unwrap();

        assert!(!service.storage().exists("a.txt").await);
        assert!(matches!(
            service.get("a.txt").await,
            Err(DepotError::NotFound(name)) if name == "a.txt"
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_does_not_touch_blobs() {
        let service = memory_service(MemoryMetadata::default(), MemoryBlobs::default());

        let result = service.delete("ghost.txt").await;

        assert!(matches!(result, Err(DepotError::NotFound(name)) if name == "ghost.txt"));
        assert_eq!(service.storage().calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_lookup_failure() {
        let metadata = MemoryMetadata {
            fail_find: true,
            ..Default::default()
        };
        let service = memory_service(metadata, MemoryBlobs::default());

        let result = service.delete("a.txt").await;

        assert!(matches!(
            result,
            Err(DepotError::Store {
                step: Step::ExistenceCheck,
                ..
            })
        ));
        assert_eq!(service.storage().calls(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_blob_keeps_record() {
        let (_temp_dir, service) = real_service().await;
        service
            .upload(UploadRequest::from_bytes("a.txt", "data"))
            .await
            .unwrap();
        std::fs::remove_file(service.storage().base_path().join("a.txt")).unwrap();

        let result = service.delete("a.txt").await;

        assert!(matches!(
            result,
            Err(DepotError::Storage {
                step: Step::BlobRemove,
                source: StorageError::NotFound(_),
            })
        ));
        assert!(service.get("a.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_blob_failure_keeps_record() {
        let blobs = MemoryBlobs {
            fail_remove: true,
            ..Default::default()
        };
        let service = memory_service(MemoryMetadata::default(), blobs);
        service
            .upload(UploadRequest::from_bytes("a.txt", "data"))
            .await
            .unwrap();

        let result = service.delete("a.txt").await;

        assert!(matches!(
            result,
            Err(DepotError::Storage {
                step: Step::BlobRemove,
                ..
            })
        ));
        assert!(service.storage().contains("a.txt"));
        assert!(service.get("a.txt").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_metadata_failure_leaves_record_without_blob() {
        let metadata = MemoryMetadata {
            fail_delete: true,
            ..Default::default()
        };
        let service = memory_service(metadata, MemoryBlobs::default());
        service
            .upload(UploadRequest::from_bytes("a.txt", "data"))
            .await
            .unwrap();

        let result = service.delete("a.txt").await;

        assert!(matches!(
            result,
            Err(DepotError::Store {
                step: Step::MetadataRemove,
                ..
            })
        ));
        assert!(!service.storage().contains("a.txt"));
        assert!(service.get("a.txt").await.is_ok());
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_download() {
        let (_temp_dir, service) = real_service().await;
        service
            .upload(UploadRequest::from_bytes("notes.txt", "hello"))
            .await
            .unwrap();

        let result = service.download("notes.txt").await.unwrap();

        assert_eq!(result.metadata.name, "notes.txt");
        assert_eq!(result.content, b"hello");
    }

    #[tokio::test]
    async fn test_download_not_found() {
        let (_temp_dir, service) = real_service().await;

        let result = service.download("ghost.txt").await;

        assert!(matches!(result, Err(DepotError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list() {
        let (_temp_dir, service) = real_service().await;
        for name in ["one.txt", "two.txt"] {
            service
                .upload(UploadRequest::from_bytes(name, "data"))
                .await
                .unwrap();
        }

        let names: Vec<String> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();

        assert_eq!(names, vec!["one.txt", "two.txt"]);
    }

    #[tokio::test]
    async fn test_read_lookup_failures_carry_step() {
        let metadata = MemoryMetadata {
            fail_find: true,
            ..Default::default()
        };
        let service = memory_service(metadata, MemoryBlobs::default());

        assert!(matches!(
            service.list().await,
            Err(DepotError::Store {
                step: Step::Lookup,
                ..
            })
        ));
        assert!(matches!(
            service.get("a.txt").await,
            Err(DepotError::Store {
                step: Step::Lookup,
                ..
            })
        ));
        assert!(matches!(
            service.download("a.txt").await,
            Err(DepotError::Store {
                step: Step::Lookup,
                ..
            })
        ));
        assert_eq!(service.storage().calls(), 0);
    }
}
