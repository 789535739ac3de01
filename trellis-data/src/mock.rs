//! Test doubles for data sources.

use crate::error::{DataError, DataResult};
use crate::metadata::UploadProgress;
use crate::source::{DataSource, ProgressListener};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use trellis_schema::{QueryParams, QueryResult};

/// Fails every call with a transport error carrying `message`.
#[derive(Debug)]
pub struct FailingDataSource {
    message: String,
    calls: AtomicUsize,
}

impl FailingDataSource {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> DataResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(DataError::Transport(self.message.clone()))
    }
}

#[async_trait]
impl DataSource for FailingDataSource {
    async fn find(&self, _resource: &str, _params: &QueryParams) -> DataResult<QueryResult> {
        self.fail()
    }

    async fn find_one(&self, _resource: &str, _id: &str, _params: &QueryParams) -> DataResult<Option<Value>> {
        self.fail()
    }

    async fn create(&self, _resource: &str, _record: Value) -> DataResult<Value> {
        self.fail()
    }

    async fn update(&self, _resource: &str, _id: &str, _patch: Value) -> DataResult<Value> {
        self.fail()
    }

    async fn delete(&self, _resource: &str, _id: &str) -> DataResult<bool> {
        self.fail()
    }
}

/// Wraps a source and holds every `find`/`find_one` until [`release`] is
/// called. Writes pass straight through.
///
/// [`release`]: GatedDataSource::release
pub struct GatedDataSource {
    inner: Arc<dyn DataSource>,
    open: watch::Sender<bool>,
    started: watch::Sender<usize>,
    completed: AtomicUsize,
}

impl GatedDataSource {
    pub fn new(inner: Arc<dyn DataSource>) -> Self {
        Self {
            inner,
            open: watch::Sender::new(false),
            started: watch::Sender::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    /// Lets held and future reads through.
    pub fn release(&self) {
        self.open.send_replace(true);
    }

    pub fn is_released(&self) -> bool {
        *self.open.borrow()
    }

    /// Reads that have reached the gate.
    pub fn started(&self) -> usize {
        *self.started.borrow()
    }

    /// Reads that passed the gate and returned.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` reads have reached the gate.
    pub async fn wait_for_started(&self, count: usize) {
        let mut rx = self.started.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|started| *started >= count).await;
    }

    async fn pass(&self) -> DataResult<()> {
        self.started.send_modify(|n| *n += 1);
        let mut rx = self.open.subscribe();
        rx.wait_for(|open| *open)
            .await
            .map(|_| ())
            .map_err(|_| DataError::Transport("gate dropped".into()))
    }
}

#[async_trait]
impl DataSource for GatedDataSource {
    async fn find(&self, resource: &str, params: &QueryParams) -> DataResult<QueryResult> {
        self.pass().await?;
        let result = self.inner.find(resource, params).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn find_one(&self, resource: &str, id: &str, params: &QueryParams) -> DataResult<Option<Value>> {
        self.pass().await?;
        let result = self.inner.find_one(resource, id, params).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn create(&self, resource: &str, record: Value) -> DataResult<Value> {
        self.inner.create(resource, record).await
    }

    async fn update(&self, resource: &str, id: &str, patch: Value) -> DataResult<Value> {
        self.inner.update(resource, id, patch).await
    }

    async fn delete(&self, resource: &str, id: &str) -> DataResult<bool> {
        self.inner.delete(resource, id).await
    }
}

/// Records every progress report.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<UploadProgress>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UploadProgress> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ProgressListener for RecordingProgress {
    fn on_progress(&self, progress: UploadProgress) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(progress);
    }
}
