//! Per-tenant document storage.
//!
//! Each tenant owns one database per doctype. Databases are created lazily by
//! the first write; reading from one that was never written reports
//! [`StoreError::NoDatabase`]. Every document carries a revision token that
//! must be echoed back on update (optimistic concurrency).

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use taskgate_core::{JobId, TenantId};
use taskgate_jobs::{JOBS_DOCTYPE, JobRecord};

/// A stored document with its current revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDoc {
    pub id: String,
    pub rev: String,
    /// JSON body.
    pub body: String,
}

/// Document store abstraction.
pub trait DocumentStore: Send + Sync {
    /// Whether the tenant's database for `doc_type` has been provisioned.
    fn exists_database(&self, tenant_id: TenantId, doc_type: &str) -> bool;

    /// Insert a new document, returning its first revision.
    fn create(&self, tenant_id: TenantId, doc_type: &str, id: &str, body: String) -> Result<String, StoreError>;

    /// Get a document by ID.
    fn get(&self, tenant_id: TenantId, doc_type: &str, id: &str) -> Result<StoredDoc, StoreError>;

    /// Every document of the database, in insertion order.
    fn scan_all(&self, tenant_id: TenantId, doc_type: &str) -> Result<Vec<StoredDoc>, StoreError>;

    /// Replace a document if `rev` is still current, returning the new revision.
    fn update(
        &self,
        tenant_id: TenantId,
        doc_type: &str,
        id: &str,
        rev: &str,
        body: String,
    ) -> Result<String, StoreError>;
}

/// Document store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("database does not exist: {0}")]
    NoDatabase(String),
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("document already exists: {0}")]
    AlreadyExists(String),
    #[error("revision conflict on {id}: expected {expected}, current {current}")]
    Conflict {
        id: String,
        expected: String,
        current: String,
    },
    #[error("malformed document: {0}")]
    Decode(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Typed access to job documents on top of any [`DocumentStore`].
pub trait JobDocuments {
    /// Persist a new job and record its revision on the record.
    fn insert_job(&self, job: &mut JobRecord) -> Result<(), StoreError>;

    fn load_job(&self, tenant_id: TenantId, job_id: JobId) -> Result<JobRecord, StoreError>;

    /// Write back a job loaded earlier, bumping its revision.
    fn save_job(&self, job: &mut JobRecord) -> Result<(), StoreError>;

    fn all_jobs(&self, tenant_id: TenantId) -> Result<Vec<JobRecord>, StoreError>;
}

impl<S: DocumentStore + ?Sized> JobDocuments for S {
    fn insert_job(&self, job: &mut JobRecord) -> Result<(), StoreError> {
        let rev = self.create(job.tenant_id, JOBS_DOCTYPE, &job.id.to_string(), encode(job)?)?;
        job.rev = Some(rev);
        Ok(())
    }

    fn load_job(&self, tenant_id: TenantId, job_id: JobId) -> Result<JobRecord, StoreError> {
        decode_job(&self.get(tenant_id, JOBS_DOCTYPE, &job_id.to_string())?)
    }

    fn save_job(&self, job: &mut JobRecord) -> Result<(), StoreError> {
        let id = job.id.to_string();
        let rev = job.rev.clone().ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let new_rev = self.update(job.tenant_id, JOBS_DOCTYPE, &id, &rev, encode(job)?)?;
        job.rev = Some(new_rev);
        Ok(())
    }

    fn all_jobs(&self, tenant_id: TenantId) -> Result<Vec<JobRecord>, StoreError> {
        self.scan_all(tenant_id, JOBS_DOCTYPE)?
            .iter()
            .map(decode_job)
            .collect()
    }
}

fn encode(job: &JobRecord) -> Result<String, StoreError> {
    serde_json::to_string(job).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Decode a job document; the store's revision wins over the one in the body.
pub fn decode_job(doc: &StoredDoc) -> Result<JobRecord, StoreError> {
    let mut job: JobRecord =
        serde_json::from_str(&doc.body).map_err(|e| StoreError::Decode(format!("{}: {}", doc.id, e)))?;
    job.rev = Some(doc.rev.clone());
    Ok(job)
}

#[derive(Debug, Default)]
struct Database {
    order: Vec<String>,
    docs: HashMap<String, StoredDoc>,
}

/// In-memory document store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    databases: RwLock<HashMap<(TenantId, String), Database>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn db_name(tenant_id: TenantId, doc_type: &str) -> String {
    format!("{tenant_id}/{doc_type}")
}

fn next_rev(generation: u64) -> String {
    format!("{}-{}", generation, Uuid::now_v7().simple())
}

fn rev_generation(rev: &str) -> u64 {
    rev.split_once('-')
        .and_then(|(n, _)| n.parse().ok())
        .unwrap_or(0)
}

impl DocumentStore for InMemoryDocumentStore {
    fn exists_database(&self, tenant_id: TenantId, doc_type: &str) -> bool {
        self.databases
            .read()
            .contains_key(&(tenant_id, doc_type.to_string()))
    }

    fn create(&self, tenant_id: TenantId, doc_type: &str, id: &str, body: String) -> Result<String, StoreError> {
        let mut dbs = self.databases.write();
        let db = dbs.entry((tenant_id, doc_type.to_string())).or_default();
        if db.docs.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }

        let rev = next_rev(1);
        db.order.push(id.to_string());
        db.docs.insert(
            id.to_string(),
            StoredDoc {
                id: id.to_string(),
                rev: rev.clone(),
                body,
            },
        );
        Ok(rev)
    }

    fn get(&self, tenant_id: TenantId, doc_type: &str, id: &str) -> Result<StoredDoc, StoreError> {
        let dbs = self.databases.read();
        let db = dbs
            .get(&(tenant_id, doc_type.to_string()))
            .ok_or_else(|| StoreError::NoDatabase(db_name(tenant_id, doc_type)))?;
        db.docs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn scan_all(&self, tenant_id: TenantId, doc_type: &str) -> Result<Vec<StoredDoc>, StoreError> {
        let dbs = self.databases.read();
        let db = dbs
            .get(&(tenant_id, doc_type.to_string()))
            .ok_or_else(|| StoreError::NoDatabase(db_name(tenant_id, doc_type)))?;
        Ok(db
            .order
            .iter()
            .filter_map(|id| db.docs.get(id))
            .cloned()
            .collect())
    }

    fn update(
        &self,
        tenant_id: TenantId,
        doc_type: &str,
        id: &str,
        rev: &str,
        body: String,
    ) -> Result<String, StoreError> {
        let mut dbs = self.databases.write();
        let db = dbs
            .get_mut(&(tenant_id, doc_type.to_string()))
            .ok_or_else(|| StoreError::NoDatabase(db_name(tenant_id, doc_type)))?;
        let doc = db
            .docs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if doc.rev != rev {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected: rev.to_string(),
                current: doc.rev.clone(),
            });
        }

        doc.rev = next_rev(rev_generation(rev) + 1);
        doc.body = body;
        Ok(doc.rev.clone())
    }
}
