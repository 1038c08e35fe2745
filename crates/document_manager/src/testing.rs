//! Scripted engine for tests. Open and close Tasks stay pending until the
//! test settles them.

use std::sync::Arc;

use folio_primitives::{DocumentError, DocumentHandle, DocumentId, EngineDocument};
use folio_task::Task;
use parking_lot::Mutex;

use crate::{CloseTask, DocumentEngine, DocumentSource, EngineOpenOptions, LoadProgress, OpenTask};

/// Engine-side document produced by [`MockEngine`].
#[derive(Debug)]
pub struct MockDocument {
	id: String,
	pages: u32,
}

impl MockDocument {
	pub fn new(id: impl Into<String>, pages: u32) -> Self {
		Self { id: id.into(), pages }
	}
}

impl EngineDocument for MockDocument {
	fn id(&self) -> &str {
		&self.id
	}

	fn page_count(&self) -> u32 {
		self.pages
	}
}

/// One recorded `open_document_*` call.
#[derive(Debug, Clone)]
pub struct MockOpen {
	pub document_id: DocumentId,
	pub source: DocumentSource,
	pub options: EngineOpenOptions,
	pub task: OpenTask,
}

/// One recorded `close_document` call.
#[derive(Debug, Clone)]
pub struct MockClose {
	pub engine_id: String,
	pub task: CloseTask,
}

#[derive(Debug, Default)]
pub struct MockEngine {
	opens: Mutex<Vec<MockOpen>>,
	closes: Mutex<Vec<MockClose>>,
	auto_close: bool,
}

impl MockEngine {
	/// Close Tasks resolve immediately.
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			auto_close: true,
			..Self::default()
		})
	}

	/// Close Tasks stay pending like open Tasks.
	pub fn manual_close() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn opens(&self) -> Vec<MockOpen> {
		self.opens.lock().clone()
	}

	pub fn open_count(&self) -> usize {
		self.opens.lock().len()
	}

	/// The most recent open Task for `document_id`.
	pub fn open_task(&self, document_id: &str) -> Option<OpenTask> {
		self.opens.lock().iter().rev().find(|open| open.document_id == document_id).map(|open| open.task.clone())
	}

	/// Resolves the latest open of `document_id` with a `pages`-page document.
	pub fn resolve_open(&self, document_id: &str, pages: u32) -> bool {
		let Some(task) = self.open_task(document_id) else {
			return false;
		};
		task.resolve(Arc::new(MockDocument::new(format!("engine-{document_id}"), pages)))
	}

	pub fn fail_open(&self, document_id: &str, error: DocumentError) -> bool {
		self.open_task(document_id).is_some_and(|task| task.fail(error))
	}

	pub fn report_progress(&self, document_id: &str, progress: LoadProgress) -> bool {
		self.open_task(document_id).is_some_and(|task| task.emit_progress(progress))
	}

	pub fn closes(&self) -> Vec<MockClose> {
		self.closes.lock().clone()
	}

	/// Engine ids of every closed document, in call order.
	pub fn closed_ids(&self) -> Vec<String> {
		self.closes.lock().iter().map(|close| close.engine_id.clone()).collect()
	}

	fn record_open(&self, document_id: &DocumentId, source: DocumentSource, options: &EngineOpenOptions) -> OpenTask {
		let task = Task::new();
		self.opens.lock().push(MockOpen {
			document_id: document_id.clone(),
			source,
			options: options.clone(),
			task: task.clone(),
		});
		task
	}
}

impl DocumentEngine for MockEngine {
	fn open_document_url(&self, document_id: &DocumentId, url: &str, options: &EngineOpenOptions) -> OpenTask {
		self.record_open(document_id, DocumentSource::Url(url.to_string()), options)
	}

	fn open_document_buffer(&self, document_id: &DocumentId, buffer: Arc<[u8]>, options: &EngineOpenOptions) -> OpenTask {
		self.record_open(document_id, DocumentSource::Buffer(buffer), options)
	}

	fn close_document(&self, document: &DocumentHandle) -> CloseTask {
		let task = if self.auto_close { Task::resolved(()) } else { Task::new() };
		self.closes.lock().push(MockClose {
			engine_id: document.id().to_string(),
			task: task.clone(),
		});
		task
	}
}
