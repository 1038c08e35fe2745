use std::fmt;
use std::sync::Arc;

use folio_events::{ScopedEvent, Subscription};
use folio_primitives::{DocumentError, DocumentHandle, DocumentId};
use folio_registry::ModuleError;
use folio_store::DocumentState;
use folio_task::{CompletionProgress, Task};

use crate::manager::{Inner, ManagerTask};
use crate::{ActiveDocumentChange, DocumentManagerError, LoadProgress, OpenRequest, OpenedDocument, RetryOptions};

/// Public surface of the document manager.
///
/// Operations without an explicit id target the active document. Global
/// events carry the document id; [`for_document`](Self::for_document)
/// returns a surface whose events are pre-filtered and omit it.
#[derive(Clone)]
pub struct DocumentManagerCapability {
	inner: Arc<Inner>,
}

impl DocumentManagerCapability {
	pub(crate) fn new(inner: Arc<Inner>) -> Self {
		Self { inner }
	}

	/// Starts loading a document. The entry appears in core state as
	/// `loading` before this returns, unless the request is refused.
	pub fn open_document(&self, request: OpenRequest) -> ManagerTask<OpenedDocument, LoadProgress> {
		self.inner.open(request)
	}

	pub fn open_document_url(&self, url: impl Into<String>) -> ManagerTask<OpenedDocument, LoadProgress> {
		self.open_document(OpenRequest::url(url))
	}

	pub fn open_document_buffer(&self, bytes: impl Into<Arc<[u8]>>) -> ManagerTask<OpenedDocument, LoadProgress> {
		self.open_document(OpenRequest::buffer(bytes))
	}

	/// Reloads a document in the error state with its stored options plus
	/// `options`. Any other status is refused. A document restored from a
	/// snapshot has no stored options and fails with
	/// [`DocumentManagerError::SourceRequired`] unless `options.source` is set.
	pub fn retry_document(&self, document_id: &str, options: RetryOptions) -> ManagerTask<OpenedDocument, LoadProgress> {
		self.inner.retry(document_id, options)
	}

	/// Closes a document in any status, aborting an in-flight load and
	/// closing the engine document if it was loaded.
	pub fn close_document(&self, document_id: &str) -> ManagerTask<()> {
		self.inner.close(document_id)
	}

	pub fn close_active_document(&self) -> ManagerTask<()> {
		match self.active_document_id() {
			Some(id) => self.close_document(id.as_str()),
			None => ManagerTask::resolved(()),
		}
	}

	pub fn close_all_documents(&self) -> ManagerTask<Vec<()>, CompletionProgress> {
		self.inner.close_all()
	}

	/// Sets or clears the active document.
	pub fn set_active_document(&self, document_id: Option<&str>) -> Result<(), ModuleError> {
		self.inner.set_active(document_id)
	}

	/// Replaces the tab order. Returns false unless `order` is a permutation
	/// of the open documents that differs from the current order.
	pub fn reorder_documents(&self, order: Vec<DocumentId>) -> bool {
		self.inner.reorder(order)
	}

	/// Moves a document to `to_index`, clamped to the last position.
	pub fn move_document(&self, document_id: &str, to_index: usize) -> Result<bool, ModuleError> {
		self.inner.move_document(document_id, to_index)
	}

	pub fn document(&self, document_id: &str) -> Option<DocumentState> {
		self.inner.base.core_state().document(document_id).cloned()
	}

	/// Open documents in tab order.
	pub fn documents(&self) -> Vec<DocumentState> {
		self.inner.base.core_state().ordered_documents().cloned().collect()
	}

	pub fn active_document(&self) -> Option<DocumentState> {
		self.inner.base.core_state().active_document().cloned()
	}

	pub fn active_document_id(&self) -> Option<DocumentId> {
		self.inner.base.active_document_id()
	}

	pub fn document_count(&self) -> usize {
		self.inner.base.core_state().document_count()
	}

	/// Number of engine loads in flight.
	pub fn pending_load_count(&self) -> usize {
		self.inner.pending_count()
	}

	pub fn on_document_opened(&self, listener: impl Fn(&ScopedEvent<DocumentId, DocumentHandle>) + Send + Sync + 'static) -> Subscription {
		self.inner.events.opened.on_global(listener)
	}

	pub fn on_document_closed(&self, listener: impl Fn(&DocumentId) + Send + Sync + 'static) -> Subscription {
		self.inner.events.closed.on_global(move |event| listener(&event.scope))
	}

	pub fn on_document_error(&self, listener: impl Fn(&ScopedEvent<DocumentId, DocumentError>) + Send + Sync + 'static) -> Subscription {
		self.inner.events.error.on_global(listener)
	}

	pub fn on_loading_progress(&self, listener: impl Fn(&ScopedEvent<DocumentId, LoadProgress>) + Send + Sync + 'static) -> Subscription {
		self.inner.events.progress.on_global(listener)
	}

	/// Replays the latest change to each new listener.
	pub fn on_active_document_changed(&self, listener: impl Fn(&ActiveDocumentChange) + Send + Sync + 'static) -> Subscription {
		self.inner.events.active.on(listener)
	}

	/// Surface bound to one open document.
	pub fn for_document(&self, document_id: &str) -> Result<DocumentScope, ModuleError> {
		let document_id = self.inner.base.require_document(document_id)?.id;
		let epoch = self.inner.epoch(&document_id);
		Ok(DocumentScope {
			document_id,
			epoch,
			inner: Arc::clone(&self.inner),
		})
	}

	/// Surface bound to the document active right now.
	pub fn for_active_document(&self) -> Result<DocumentScope, ModuleError> {
		let document_id = self.inner.base.resolve_document_id(None)?;
		self.for_document(document_id.as_str())
	}
}

impl fmt::Debug for DocumentManagerCapability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentManagerCapability").field("module", self.inner.base.id()).finish_non_exhaustive()
	}
}

/// Document-manager surface bound to one open of one document.
///
/// Listeners registered here are dropped when the document closes. Once it
/// has closed the scope is stale: reopening the same id does not revive it,
/// operations report the document as gone and new listeners are never
/// called.
#[derive(Clone)]
pub struct DocumentScope {
	document_id: DocumentId,
	epoch: u64,
	inner: Arc<Inner>,
}

impl DocumentScope {
	pub fn document_id(&self) -> &DocumentId {
		&self.document_id
	}

	/// Whether the document this scope was created for is still open.
	pub fn is_open(&self) -> bool {
		self.inner.is_current(&self.document_id, self.epoch)
	}

	/// Current core entry; `None` once closed.
	pub fn state(&self) -> Option<DocumentState> {
		if !self.is_open() {
			return None;
		}
		self.inner.base.core_state().document(self.document_id.as_str()).cloned()
	}

	pub fn close(&self) -> ManagerTask<()> {
		if !self.is_open() {
			return Task::failed(DocumentManagerError::NotFound(self.document_id.clone()));
		}
		self.inner.close(self.document_id.as_str())
	}

	pub fn retry(&self, options: RetryOptions) -> ManagerTask<OpenedDocument, LoadProgress> {
		if !self.is_open() {
			return Task::failed(DocumentManagerError::NotFound(self.document_id.clone()));
		}
		self.inner.retry(self.document_id.as_str(), options)
	}

	pub fn activate(&self) -> Result<(), ModuleError> {
		self.require_open()?;
		self.inner.set_active(Some(self.document_id.as_str()))
	}

	pub fn move_to(&self, to_index: usize) -> Result<bool, ModuleError> {
		self.require_open()?;
		self.inner.move_document(self.document_id.as_str(), to_index)
	}

	pub fn on_opened(&self, listener: impl Fn(&DocumentHandle) + Send + Sync + 'static) -> Subscription {
		self.subscribe(|id| self.inner.events.opened.on_scope(id, listener))
	}

	pub fn on_closed(&self, listener: impl Fn() + Send + Sync + 'static) -> Subscription {
		self.subscribe(|id| self.inner.events.closed.on_scope(id, move |_| listener()))
	}

	pub fn on_error(&self, listener: impl Fn(&DocumentError) + Send + Sync + 'static) -> Subscription {
		self.subscribe(|id| self.inner.events.error.on_scope(id, listener))
	}

	pub fn on_loading_progress(&self, listener: impl Fn(&LoadProgress) + Send + Sync + 'static) -> Subscription {
		self.subscribe(|id| self.inner.events.progress.on_scope(id, listener))
	}

	fn require_open(&self) -> Result<(), ModuleError> {
		if self.is_open() {
			return Ok(());
		}
		Err(ModuleError::UnknownDocument {
			document_id: self.document_id.clone(),
			module: self.inner.base.id().clone(),
		})
	}

	fn subscribe(&self, attach: impl FnOnce(DocumentId) -> Subscription) -> Subscription {
		self.inner
			.while_current(&self.document_id, self.epoch, || attach(self.document_id.clone()))
			.unwrap_or_else(Subscription::noop)
	}
}

impl fmt::Debug for DocumentScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentScope").field("document_id", &self.document_id).finish_non_exhaustive()
	}
}
