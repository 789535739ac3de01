//! Data source contract for Trellis.
//!
//! A [`DataSource`] answers `find`/`find_one` reads and CRUD writes for named
//! resources. Optional capabilities (bulk writes, object schemas, views, app
//! and page definitions, file uploads) are exposed through accessor methods
//! returning `Option<&dyn _>`, so callers feature-detect before use:
//!
//! ```
//! use trellis_data::{Capability, DataSource, InMemoryDataSource};
//!
//! let source = InMemoryDataSource::new();
//! assert!(source.supports(Capability::Uploads));
//! assert!(source.uploads().is_some());
//! ```
//!
//! [`InMemoryDataSource`] is the reference adapter. The [`engine`] module holds
//! the query evaluation it uses, for adapters that filter records locally.

pub mod engine;
mod error;
mod memory;
mod metadata;
pub mod mock;
mod source;

pub use error::{DataError, DataResult};
pub use memory::{Fixtures, InMemoryDataSource};
pub use metadata::{
    AppDefinition, FieldDef, FieldType, FileUpload, NavigationItem, ObjectSchema, PageDefinition,
    UploadProgress, UploadedFile, ViewConfig,
};
pub use source::{
    AppProvider, BulkOp, BulkOperations, Capability, CapabilitySet, DataSource, FileUploader,
    ProgressListener, SchemaProvider, ViewProvider,
};
