//! The document-manager module.
//!
//! Owns every side effect of the document lifecycle: it dispatches intents
//! to the core reducer, calls the external [`DocumentEngine`], and dispatches
//! the result once the engine Task settles.
//!
//! ```text
//! open_document ──► StartLoadingDocument ──► engine.open_document ─┬─ Ok  ──► SetDocumentLoaded ──► document_opened
//!                                                                  ├─ Err ──► SetDocumentError  ──► document_error
//!                                                                  └─ abort ► SetDocumentError (cancelled)
//! retry_document (error only) ──► RetryLoadingDocument ──► engine.open_document ...
//! close_document ──► abort pending load ──► CloseDocument ──► engine.close_document ──► document_closed
//! ```
//!
//! Load options are kept per document so a retry can reuse them. Pending
//! engine Tasks and loaded engine handles are tracked per document and
//! released on close, however the close was dispatched, and on destroy.

use std::sync::Arc;

use folio_registry::{ModuleBase, ModuleManifest, ModulePackage};

mod capability;
mod engine;
mod error;
mod manager;
mod request;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use capability::{DocumentManagerCapability, DocumentScope};
pub use engine::{CloseTask, DocumentEngine, DocumentSource, EngineOpenOptions, LoadProgress, OpenTask};
pub use error::DocumentManagerError;
pub use manager::{DocumentManager, ManagerTask};
pub use request::{ActiveDocumentChange, DocumentManagerConfig, OpenRequest, OpenedDocument, RetryOptions};

/// Module id and capability name of the document manager.
pub const DOCUMENT_MANAGER_ID: &str = "document-manager";

pub fn manifest() -> ModuleManifest {
	ModuleManifest::new(DOCUMENT_MANAGER_ID)
		.name("Document Manager")
		.version(env!("CARGO_PKG_VERSION"))
		.provides("documents")
		.default_config(serde_json::json!({ "max_documents": null }))
}

/// Package for registering the document manager over `engine`.
pub fn package(engine: Arc<dyn DocumentEngine>) -> ModulePackage {
	ModulePackage::new(manifest(), move |base: ModuleBase, config: DocumentManagerConfig| Ok(DocumentManager::new(base, engine, config)))
}

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod tests;
