use std::fmt;
use std::sync::Arc;

use folio_primitives::{DocumentError, DocumentHandle, DocumentId};
use folio_task::Task;
use serde::{Deserialize, Serialize};

/// Bytes received so far while the engine loads a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProgress {
	pub loaded: u64,
	pub total: Option<u64>,
}

impl LoadProgress {
	pub fn new(loaded: u64, total: Option<u64>) -> Self {
		Self { loaded, total }
	}

	/// Completed fraction, when the total size is known.
	pub fn fraction(&self) -> Option<f32> {
		match self.total {
			Some(0) | None => None,
			Some(total) => Some((self.loaded as f64 / total as f64).clamp(0.0, 1.0) as f32),
		}
	}
}

/// Where a document's bytes come from.
#[derive(Clone, PartialEq, Eq)]
pub enum DocumentSource {
	Url(String),
	Buffer(Arc<[u8]>),
}

impl fmt::Debug for DocumentSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
			Self::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
		}
	}
}

/// Options the engine needs to open one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOpenOptions {
	pub password: Option<String>,
}

pub type OpenTask = Task<DocumentHandle, DocumentError, LoadProgress>;
pub type CloseTask = Task<(), DocumentError>;

/// The external document engine.
///
/// Every operation returns a [`Task`]; the engine settles it from its own
/// callbacks and should stop work when the Task is aborted.
pub trait DocumentEngine: Send + Sync {
	fn open_document_url(&self, document_id: &DocumentId, url: &str, options: &EngineOpenOptions) -> OpenTask;

	fn open_document_buffer(&self, document_id: &DocumentId, buffer: Arc<[u8]>, options: &EngineOpenOptions) -> OpenTask;

	fn close_document(&self, document: &DocumentHandle) -> CloseTask;

	/// Dispatches to the matching `open_*` method.
	fn open_document(&self, document_id: &DocumentId, source: &DocumentSource, options: &EngineOpenOptions) -> OpenTask {
		match source {
			DocumentSource::Url(url) => self.open_document_url(document_id, url, options),
			DocumentSource::Buffer(buffer) => self.open_document_buffer(document_id, Arc::clone(buffer), options),
		}
	}
}
