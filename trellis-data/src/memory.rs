//! In-memory data source.
//!
//! Holds collections, schemas, views, apps, pages and uploaded files in
//! process memory. Used by the previewer, tests and as a reference adapter:
//! every optional capability is implemented.

use crate::engine;
use crate::error::{DataError, DataResult};
use crate::metadata::{
    AppDefinition, FileUpload, ObjectSchema, PageDefinition, UploadProgress, UploadedFile,
    ViewConfig,
};
use crate::source::{
    AppProvider, BulkOp, BulkOperations, DataSource, FileUploader, ProgressListener,
    SchemaProvider, ViewProvider,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};
use trellis_schema::{QueryParams, QueryResult};
use uuid::Uuid;

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Seed document for [`InMemoryDataSource`].
///
/// ```json
/// {
///   "collections": { "orders": [{ "id": "1", "status": "open" }] },
///   "schemas": [{ "name": "orders", "fields": [] }],
///   "views": [], "apps": [], "pages": []
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixtures {
    pub collections: HashMap<String, Vec<Value>>,
    pub schemas: Vec<ObjectSchema>,
    pub views: Vec<ViewConfig>,
    pub apps: Vec<AppDefinition>,
    pub pages: Vec<PageDefinition>,
}

pub struct InMemoryDataSource {
    collections: RwLock<HashMap<String, Vec<Value>>>,
    schemas: RwLock<HashMap<String, ObjectSchema>>,
    views: RwLock<HashMap<String, ViewConfig>>,
    apps: RwLock<HashMap<String, AppDefinition>>,
    pages: RwLock<HashMap<String, PageDefinition>>,
    files: RwLock<HashMap<String, UploadedFile>>,
    chunk_size: usize,
}

impl Default for InMemoryDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::from_fixtures(Fixtures::default())
    }

    pub fn from_fixtures(fixtures: Fixtures) -> Self {
        Self {
            collections: RwLock::new(fixtures.collections),
            schemas: RwLock::new(index_by(fixtures.schemas, |s| s.name.clone())),
            views: RwLock::new(index_by(fixtures.views, |v| v.id.clone())),
            apps: RwLock::new(index_by(fixtures.apps, |a| a.id.clone())),
            pages: RwLock::new(index_by(fixtures.pages, |p| p.id.clone())),
            files: RwLock::new(HashMap::new()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn from_value(value: Value) -> DataResult<Self> {
        let fixtures: Fixtures = serde_json::from_value(value)?;
        Ok(Self::from_fixtures(fixtures))
    }

    pub fn from_json_str(json: &str) -> DataResult<Self> {
        let fixtures: Fixtures = serde_json::from_str(json)?;
        Ok(Self::from_fixtures(fixtures))
    }

    /// Loads fixtures from a JSON file.
    pub fn load(path: &Path) -> DataResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DataError::Transport(format!("failed to read fixtures {}: {e}", path.display()))
        })?;
        let source = Self::from_json_str(&content)?;
        info!(path = %path.display(), "Loaded data fixtures");
        Ok(source)
    }

    /// Upload progress granularity in bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub async fn insert_collection(&self, resource: impl Into<String>, records: Vec<Value>) {
        self.collections.write().await.insert(resource.into(), records);
    }

    pub async fn insert_schema(&self, schema: ObjectSchema) {
        self.schemas.write().await.insert(schema.name.clone(), schema);
    }

    /// Snapshot of a collection.
    pub async fn records(&self, resource: &str) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(resource)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces relation ids with the referenced records.
    async fn expand(&self, resource: &str, records: &mut [Value], relations: &[String]) -> DataResult<()> {
        if relations.is_empty() {
            return Ok(());
        }
        let schemas = self.schemas.read().await;
        let collections = self.collections.read().await;

        for relation in relations {
            let target = schemas
                .get(resource)
                .and_then(|schema| schema.relation(relation))
                .ok_or_else(|| {
                    DataError::InvalidQuery(format!("`{relation}` is not a relation of {resource}"))
                })?;
            let Some(targets) = collections.get(target) else {
                continue;
            };
            for record in records.iter_mut() {
                let Some(slot) = record.get_mut(relation.as_str()) else {
                    continue;
                };
                let Some(id) = id_string(slot) else {
                    continue;
                };
                if let Some(related) = targets.iter().find(|r| has_id(r, &id)) {
                    *slot = related.clone();
                }
            }
        }
        Ok(())
    }
}

fn index_by<T>(items: Vec<T>, key: impl Fn(&T) -> String) -> HashMap<String, T> {
    items.into_iter().map(|item| (key(&item), item)).collect()
}

/// String form of an id value.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn has_id(record: &Value, id: &str) -> bool {
    record.get("id").and_then(id_string).is_some_and(|own| own == id)
}

fn as_object(record: Value) -> DataResult<Map<String, Value>> {
    match record {
        Value::Object(map) => Ok(map),
        other => Err(DataError::Serialization(format!(
            "record must be a JSON object, got {other}"
        ))),
    }
}

#[async_trait]
impl DataSource for InMemoryDataSource {
    async fn find(&self, resource: &str, params: &QueryParams) -> DataResult<QueryResult> {
        let mut result = {
            let collections = self.collections.read().await;
            let records = collections.get(resource).map(Vec::as_slice).unwrap_or_default();
            engine::execute(records, params)?
        };
        self.expand(resource, &mut result.data, &params.expand).await?;
        result.data = std::mem::take(&mut result.data)
            .into_iter()
            .map(|record| engine::project(record, &params.select))
            .collect();
        debug!(resource, returned = result.data.len(), "find");
        Ok(result)
    }

    async fn find_one(
        &self,
        resource: &str,
        id: &str,
        params: &QueryParams,
    ) -> DataResult<Option<Value>> {
        engine::validate(params)?;
        let found = {
            let collections = self.collections.read().await;
            collections
                .get(resource)
                .and_then(|records| records.iter().find(|r| has_id(r, id)))
                .cloned()
        };
        let Some(record) = found else {
            debug!(resource, id, "find_one: not found");
            return Ok(None);
        };
        let mut single = [record];
        self.expand(resource, &mut single, &params.expand).await?;
        let [record] = single;
        Ok(Some(engine::project(record, &params.select)))
    }

    async fn create(&self, resource: &str, record: Value) -> DataResult<Value> {
        let mut fields = as_object(record)?;
        let id = match fields.get("id").and_then(id_string) {
            Some(id) => id,
            None => {
                let id = Uuid::now_v7().to_string();
                fields.insert("id".to_string(), Value::String(id.clone()));
                id
            }
        };

        let mut collections = self.collections.write().await;
        let records = collections.entry(resource.to_string()).or_default();
        if records.iter().any(|r| has_id(r, &id)) {
            return Err(DataError::Conflict {
                resource: resource.to_string(),
                id,
            });
        }
        let record = Value::Object(fields);
        records.push(record.clone());
        debug!(resource, id = %id, "create");
        Ok(record)
    }

    async fn update(&self, resource: &str, id: &str, patch: Value) -> DataResult<Value> {
        let patch = as_object(patch)?;
        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(resource)
            .and_then(|records| records.iter_mut().find(|r| has_id(r, id)))
            .ok_or_else(|| DataError::not_found(resource, id))?;

        if let Value::Object(fields) = record {
            for (key, value) in patch {
                if key != "id" {
                    fields.insert(key, value);
                }
            }
        }
        debug!(resource, id, "update");
        Ok(record.clone())
    }

    async fn delete(&self, resource: &str, id: &str) -> DataResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(resource) else {
            return Ok(false);
        };
        let before = records.len();
        records.retain(|r| !has_id(r, id));
        let removed = records.len() < before;
        debug!(resource, id, removed, "delete");
        Ok(removed)
    }

    fn bulk(&self) -> Option<&dyn BulkOperations> {
        Some(self)
    }

    fn schemas(&self) -> Option<&dyn SchemaProvider> {
        Some(self)
    }

    fn views(&self) -> Option<&dyn ViewProvider> {
        Some(self)
    }

    fn apps(&self) -> Option<&dyn AppProvider> {
        Some(self)
    }

    fn uploads(&self) -> Option<&dyn FileUploader> {
        Some(self)
    }
}

#[async_trait]
impl BulkOperations for InMemoryDataSource {
    async fn bulk(&self, resource: &str, ops: Vec<BulkOp>) -> Vec<DataResult<Value>> {
        let mut results = Vec::with_capacity(ops.len());
        for op in ops {
            let result = match op {
                BulkOp::Create { record } => self.create(resource, record).await,
                BulkOp::Update { id, patch } => self.update(resource, &id, patch).await,
                BulkOp::Delete { id } => self
                    .delete(resource, &id)
                    .await
                    .map(|removed| serde_json::json!({ "id": id, "deleted": removed })),
            };
            results.push(result);
        }
        results
    }
}

#[async_trait]
impl SchemaProvider for InMemoryDataSource {
    async fn object_schema(&self, resource: &str) -> DataResult<Option<ObjectSchema>> {
        Ok(self.schemas.read().await.get(resource).cloned())
    }
}

#[async_trait]
impl ViewProvider for InMemoryDataSource {
    async fn view(&self, view_id: &str) -> DataResult<Option<ViewConfig>> {
        Ok(self.views.read().await.get(view_id).cloned())
    }

    async fn update_view_config(&self, config: ViewConfig) -> DataResult<ViewConfig> {
        if config.id.trim().is_empty() {
            return Err(DataError::InvalidQuery("view config without id".into()));
        }
        self.views
            .write()
            .await
            .insert(config.id.clone(), config.clone());
        Ok(config)
    }
}

#[async_trait]
impl AppProvider for InMemoryDataSource {
    async fn app(&self, app_id: &str) -> DataResult<Option<AppDefinition>> {
        Ok(self.apps.read().await.get(app_id).cloned())
    }

    async fn page(&self, page_id: &str) -> DataResult<Option<PageDefinition>> {
        Ok(self.pages.read().await.get(page_id).cloned())
    }
}

#[async_trait]
impl FileUploader for InMemoryDataSource {
    async fn upload_file(
        &self,
        file: FileUpload,
        progress: Option<&dyn ProgressListener>,
    ) -> DataResult<UploadedFile> {
        let total = file.bytes.len() as u64;
        if let Some(listener) = progress {
            if total == 0 {
                listener.on_progress(UploadProgress { loaded: 0, total });
            }
            let mut loaded = 0u64;
            for chunk in file.bytes.chunks(self.chunk_size) {
                loaded += chunk.len() as u64;
                listener.on_progress(UploadProgress { loaded, total });
                tokio::task::yield_now().await;
            }
        }

        let id = Uuid::now_v7().to_string();
        let uploaded = UploadedFile {
            url: format!("memory://files/{id}/{}", file.name),
            id: id.clone(),
            name: file.name,
            size: total,
            content_type: file.content_type,
        };
        self.files.write().await.insert(id, uploaded.clone());
        debug!(file = %uploaded.name, size = total, "upload");
        Ok(uploaded)
    }
}
