//! The data source contract.
//!
//! Defines the required operations every adapter implements and the optional
//! capabilities consumers feature-detect before calling. Adapters are
//! interchangeable: the render pipeline only ever sees `dyn DataSource`.

use crate::error::DataResult;
use crate::metadata::{
    AppDefinition, FileUpload, ObjectSchema, PageDefinition, UploadProgress, UploadedFile,
    ViewConfig,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use trellis_schema::{QueryParams, QueryResult};

/// A backend the pipeline can read records from.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Reads a collection. No matches yields empty `data`, never an error.
    async fn find(&self, resource: &str, params: &QueryParams) -> DataResult<QueryResult>;

    /// Reads one record. `None` means not found, distinct from a failure.
    async fn find_one(
        &self,
        resource: &str,
        id: &str,
        params: &QueryParams,
    ) -> DataResult<Option<Value>>;

    async fn create(&self, resource: &str, record: Value) -> DataResult<Value>;

    /// Merges `patch` into the record and returns the result.
    async fn update(&self, resource: &str, id: &str, patch: Value) -> DataResult<Value>;

    /// Returns whether a record was removed.
    async fn delete(&self, resource: &str, id: &str) -> DataResult<bool>;

    fn bulk(&self) -> Option<&dyn BulkOperations> {
        None
    }

    fn schemas(&self) -> Option<&dyn SchemaProvider> {
        None
    }

    fn views(&self) -> Option<&dyn ViewProvider> {
        None
    }

    fn apps(&self) -> Option<&dyn AppProvider> {
        None
    }

    fn uploads(&self) -> Option<&dyn FileUploader> {
        None
    }

    /// Which optional capabilities this source exposes.
    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet {
            bulk: self.bulk().is_some(),
            schemas: self.schemas().is_some(),
            views: self.views().is_some(),
            apps: self.apps().is_some(),
            uploads: self.uploads().is_some(),
        }
    }

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }
}

// ---- Optional capabilities ----

/// One operation of a bulk request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum BulkOp {
    Create { record: Value },
    Update { id: String, patch: Value },
    Delete { id: String },
}

#[async_trait]
pub trait BulkOperations: Send + Sync {
    /// Applies each operation independently; one failure does not roll back
    /// the others.
    async fn bulk(&self, resource: &str, ops: Vec<BulkOp>) -> Vec<DataResult<Value>>;
}

#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn object_schema(&self, resource: &str) -> DataResult<Option<ObjectSchema>>;
}

#[async_trait]
pub trait ViewProvider: Send + Sync {
    async fn view(&self, view_id: &str) -> DataResult<Option<ViewConfig>>;

    async fn update_view_config(&self, config: ViewConfig) -> DataResult<ViewConfig>;
}

#[async_trait]
pub trait AppProvider: Send + Sync {
    async fn app(&self, app_id: &str) -> DataResult<Option<AppDefinition>>;

    async fn page(&self, page_id: &str) -> DataResult<Option<PageDefinition>>;
}

/// Receives upload progress. Must not block.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, progress: UploadProgress);
}

impl<F> ProgressListener for F
where
    F: Fn(UploadProgress) + Send + Sync,
{
    fn on_progress(&self, progress: UploadProgress) {
        self(progress)
    }
}

#[async_trait]
pub trait FileUploader: Send + Sync {
    async fn upload_file(
        &self,
        file: FileUpload,
        progress: Option<&dyn ProgressListener>,
    ) -> DataResult<UploadedFile>;

    /// Uploads sequentially by default.
    async fn upload_files(
        &self,
        files: Vec<FileUpload>,
        progress: Option<&dyn ProgressListener>,
    ) -> DataResult<Vec<UploadedFile>> {
        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            uploaded.push(self.upload_file(file, progress).await?);
        }
        Ok(uploaded)
    }
}

// ---- Capability detection ----

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Bulk,
    Schemas,
    Views,
    Apps,
    Uploads,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Self::Bulk,
        Self::Schemas,
        Self::Views,
        Self::Apps,
        Self::Uploads,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bulk => "bulk",
            Self::Schemas => "schemas",
            Self::Views => "views",
            Self::Apps => "apps",
            Self::Uploads => "uploads",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub bulk: bool,
    pub schemas: bool,
    pub views: bool,
    pub apps: bool,
    pub uploads: bool,
}

impl CapabilitySet {
    pub const fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::Bulk => self.bulk,
            Capability::Schemas => self.schemas,
            Capability::Views => self.views,
            Capability::Apps => self.apps,
            Capability::Uploads => self.uploads,
        }
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |c| self.contains(*c))
    }
}
