use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use folio_events::{BehaviorEmitter, ScopedEmitter};
use folio_primitives::{DocumentError, DocumentErrorCode, DocumentHandle, DocumentId};
use folio_registry::{Capability, Module, ModuleBase, ModuleError};
use folio_store::{CoreAction, DocumentStatus};
use folio_task::{Task, TaskError, TaskResult};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{
	ActiveDocumentChange, DocumentEngine, DocumentManagerCapability, DocumentManagerConfig, DocumentManagerError, EngineOpenOptions, LoadProgress, OpenRequest,
	OpenTask, OpenedDocument, RetryOptions,
};

/// Task returned by document-manager operations.
pub type ManagerTask<T, P = ()> = Task<T, DocumentManagerError, P>;

pub(crate) struct Events {
	pub(crate) opened: ScopedEmitter<DocumentId, DocumentHandle>,
	pub(crate) closed: ScopedEmitter<DocumentId, ()>,
	pub(crate) error: ScopedEmitter<DocumentId, DocumentError>,
	pub(crate) progress: ScopedEmitter<DocumentId, LoadProgress>,
	pub(crate) active: BehaviorEmitter<ActiveDocumentChange>,
}

impl Events {
	fn new() -> Self {
		Self {
			opened: ScopedEmitter::new(),
			closed: ScopedEmitter::new(),
			error: ScopedEmitter::new(),
			progress: ScopedEmitter::new(),
			active: BehaviorEmitter::new(),
		}
	}

	fn clear_scope(&self, document_id: &DocumentId) {
		self.opened.clear_scope(document_id);
		self.closed.clear_scope(document_id);
		self.error.clear_scope(document_id);
		self.progress.clear_scope(document_id);
	}
}

/// State shared by the module and every capability handle.
///
/// `requests` holds the load options of each open document for retries.
/// `pending` holds the engine Task of each in-flight load; `loaded` the
/// engine handle of each loaded document. `epochs` holds the generation
/// handed to [`DocumentScope`](crate::DocumentScope)s of each open document.
/// All four are keyed by document id and emptied when the document closes.
pub(crate) struct Inner {
	pub(crate) base: ModuleBase,
	engine: Arc<dyn DocumentEngine>,
	config: DocumentManagerConfig,
	requests: Mutex<FxHashMap<DocumentId, OpenRequest>>,
	pending: Mutex<FxHashMap<DocumentId, OpenTask>>,
	loaded: Mutex<FxHashMap<DocumentId, DocumentHandle>>,
	epochs: Mutex<FxHashMap<DocumentId, u64>>,
	next_epoch: AtomicU64,
	pub(crate) events: Events,
	destroyed: AtomicBool,
}

impl Inner {
	fn is_destroyed(&self) -> bool {
		self.destroyed.load(Ordering::Acquire)
	}

	pub(crate) fn pending_count(&self) -> usize {
		self.pending.lock().len()
	}

	/// Generation of the current open of `document_id`, assigned on first use.
	pub(crate) fn epoch(&self, document_id: &DocumentId) -> u64 {
		*self
			.epochs
			.lock()
			.entry(document_id.clone())
			.or_insert_with(|| self.next_epoch.fetch_add(1, Ordering::Relaxed))
	}

	pub(crate) fn is_current(&self, document_id: &DocumentId, epoch: u64) -> bool {
		self.epochs.lock().get(document_id) == Some(&epoch)
	}

	/// Runs `f` only while `epoch` is still current. A concurrent close waits
	/// for `f`, so scope listeners never outlive their document.
	pub(crate) fn while_current<R>(&self, document_id: &DocumentId, epoch: u64, f: impl FnOnce() -> R) -> Option<R> {
		let epochs = self.epochs.lock();
		(epochs.get(document_id) == Some(&epoch)).then(f)
	}

	pub(crate) fn open(self: &Arc<Self>, request: OpenRequest) -> ManagerTask<OpenedDocument, LoadProgress> {
		if self.is_destroyed() {
			return Task::failed(DocumentManagerError::Closed);
		}
		let document_id = request.document_id.clone().unwrap_or_else(DocumentId::generate);
		let core = self.base.core_state();
		if core.documents.contains_key(&document_id) {
			return Task::failed(DocumentManagerError::AlreadyOpen(document_id));
		}
		if let Some(max) = self.config.max_documents
			&& core.document_count() >= max
		{
			self.base.logger().warn("open", format_args!("refusing {document_id}: {max} documents already open"));
			return Task::failed(DocumentManagerError::TooManyDocuments { max });
		}

		self.base.dispatch_core(CoreAction::StartLoadingDocument {
			document_id: document_id.clone(),
			name: request.name.clone(),
			scale: request.scale,
			rotation: request.rotation,
			password_protected: request.password.is_some(),
			activate: request.activate,
		});
		self.requests.lock().insert(document_id.clone(), request);
		self.base.logger().debug("open", format_args!("loading {document_id}"));
		self.load(document_id)
	}

	/// Starts an engine load for an entry already in the loading state.
	fn load(self: &Arc<Self>, document_id: DocumentId) -> ManagerTask<OpenedDocument, LoadProgress> {
		let request = self.requests.lock().get(&document_id).cloned();
		let Some(request) = request else {
			return Task::failed(DocumentManagerError::NotFound(document_id));
		};
		let options = EngineOpenOptions {
			password: request.password.clone(),
		};
		let engine_task = self.engine.open_document(&document_id, &request.source, &options);
		let outer: ManagerTask<OpenedDocument, LoadProgress> = Task::new();

		let superseded = self.pending.lock().insert(document_id.clone(), engine_task.clone());
		if let Some(previous) = superseded {
			previous.abort("superseded by a newer load");
		}

		let weak = Arc::downgrade(self);
		{
			let weak = weak.clone();
			let id = document_id.clone();
			let outer = outer.clone();
			engine_task.on_progress(move |progress| {
				if let Some(inner) = weak.upgrade() {
					inner.report_progress(&id, *progress);
				}
				outer.emit_progress(*progress);
			});
		}
		{
			let engine_task = engine_task.clone();
			outer.on_abort(move |reason| {
				engine_task.abort(reason.clone());
			});
		}
		{
			let settled = engine_task.clone();
			let outer = outer.clone();
			engine_task.on_settled(move |result| match weak.upgrade() {
				Some(inner) => inner.finish_load(&document_id, &settled, result, &outer),
				None => {
					outer.abort("document manager dropped");
				}
			});
		}
		outer
	}

	fn report_progress(&self, document_id: &DocumentId, progress: LoadProgress) {
		if let Some(fraction) = progress.fraction() {
			self.base.dispatch_core(CoreAction::UpdateDocumentLoadingProgress {
				document_id: document_id.clone(),
				progress: fraction,
			});
		}
		self.events.progress.emit(document_id.clone(), progress);
	}

	fn finish_load(&self, document_id: &DocumentId, task: &OpenTask, result: &TaskResult<DocumentHandle, DocumentError>, outer: &ManagerTask<OpenedDocument, LoadProgress>) {
		let current = {
			let mut pending = self.pending.lock();
			match pending.get(document_id) {
				Some(entry) if entry.ptr_eq(task) => pending.remove(document_id).is_some(),
				_ => false,
			}
		};
		tracing::trace!(document = %document_id, current, ok = result.is_ok(), "document_manager.load_settled");
		let loading = self.base.core_state().document(document_id.as_str()).is_some_and(|doc| doc.status == DocumentStatus::Loading);
		let live = current && loading;

		match result {
			Ok(document) if live => {
				self.loaded.lock().insert(document_id.clone(), Arc::clone(document));
				self.base.dispatch_core(CoreAction::SetDocumentLoaded {
					document_id: document_id.clone(),
					document: Arc::clone(document),
				});
				self.base.logger().info("open", format_args!("loaded {document_id} ({} pages)", document.page_count()));
				self.events.opened.emit(document_id.clone(), Arc::clone(document));
				outer.resolve(OpenedDocument {
					document_id: document_id.clone(),
					document: Arc::clone(document),
				});
			}
			Ok(document) => {
				// Load finished after the entry went away; release the engine document.
				self.close_quietly(document);
				outer.abort("document closed while loading");
			}
			Err(TaskError::Failed(error)) => {
				if live {
					self.record_error(document_id, error.clone());
				}
				outer.fail(DocumentManagerError::Engine(error.clone()));
			}
			Err(TaskError::Aborted(reason)) => {
				if live {
					self.record_error(document_id, DocumentError::new(DocumentErrorCode::Cancelled, reason.message()));
				}
				outer.abort(reason.clone());
			}
		}
	}

	fn record_error(&self, document_id: &DocumentId, error: DocumentError) {
		self.base.logger().warn("open", format_args!("failed to load {document_id}: {error}"));
		self.base.dispatch_core(CoreAction::SetDocumentError {
			document_id: document_id.clone(),
			error: error.clone(),
		});
		self.events.error.emit(document_id.clone(), error);
	}

	pub(crate) fn retry(self: &Arc<Self>, document_id: &str, options: RetryOptions) -> ManagerTask<OpenedDocument, LoadProgress> {
		if self.is_destroyed() {
			return Task::failed(DocumentManagerError::Closed);
		}
		let core = self.base.core_state();
		let Some(doc) = core.document(document_id) else {
			return Task::failed(DocumentManagerError::NotFound(DocumentId::new(document_id)));
		};
		if doc.status != DocumentStatus::Error {
			return Task::failed(DocumentManagerError::NotRetryable {
				document_id: doc.id.clone(),
				status: doc.status,
			});
		}
		let id = doc.id.clone();
		let password_protected = {
			let mut requests = self.requests.lock();
			let request = match requests.entry(id.clone()) {
				Entry::Occupied(entry) => entry.into_mut(),
				Entry::Vacant(entry) => {
					// Restored from a snapshot: rebuild the request from the core entry.
					let Some(source) = options.source.clone() else {
						return Task::failed(DocumentManagerError::SourceRequired(id));
					};
					let mut request = OpenRequest::new(source).id(id.clone()).scale(doc.scale).rotation(doc.rotation);
					request.name = doc.name.clone();
					entry.insert(request)
				}
			};
			if let Some(source) = options.source {
				request.source = source;
			}
			if let Some(password) = options.password {
				request.password = Some(password);
			}
			if options.scale.is_some() {
				request.scale = options.scale;
			}
			if options.rotation.is_some() {
				request.rotation = options.rotation;
			}
			request.password.is_some()
		};

		self.base.dispatch_core(CoreAction::RetryLoadingDocument {
			document_id: id.clone(),
			password_protected: Some(password_protected),
		});
		if let Some(scale) = options.scale {
			self.base.dispatch_core(CoreAction::SetScale {
				document_id: Some(id.clone()),
				scale,
			});
		}
		if let Some(rotation) = options.rotation {
			self.base.dispatch_core(CoreAction::SetRotation {
				document_id: Some(id.clone()),
				rotation,
			});
		}
		self.base.logger().debug("retry", format_args!("retrying {id}"));
		self.load(id)
	}

	pub(crate) fn close(&self, document_id: &str) -> ManagerTask<()> {
		if self.is_destroyed() {
			return Task::failed(DocumentManagerError::Closed);
		}
		let Some(id) = self.base.core_state().document(document_id).map(|doc| doc.id.clone()) else {
			return Task::failed(DocumentManagerError::NotFound(DocumentId::new(document_id)));
		};
		let pending = self.pending.lock().remove(&id);
		let handle = self.loaded.lock().remove(&id);
		self.base.dispatch_core(CoreAction::CloseDocument { document_id: id.clone() });
		if let Some(task) = pending {
			task.abort("document closed");
		}
		match handle {
			Some(handle) => self.close_engine(&handle),
			None => Task::resolved(()),
		}
	}

	/// Aborting the returned Task does not reach the engine: once the close is
	/// dispatched the engine document has no other owner and must be released.
	fn close_engine(&self, handle: &DocumentHandle) -> ManagerTask<()> {
		let engine_task = self.engine.close_document(handle);
		let outer: ManagerTask<()> = Task::new();
		let result = outer.clone();
		engine_task.on_settled(move |settled| match settled {
			Ok(()) => {
				result.resolve(());
			}
			Err(TaskError::Failed(error)) => {
				result.fail(DocumentManagerError::Engine(error.clone()));
			}
			Err(TaskError::Aborted(reason)) => {
				result.abort(reason.clone());
			}
		});
		outer
	}

	fn close_quietly(&self, handle: &DocumentHandle) {
		let logger = self.base.logger().clone();
		let id = handle.id().to_string();
		self.engine.close_document(handle).wait(
			|_| {},
			move |err| logger.warn("close", format_args!("engine failed to close {id}: {err}")),
		);
	}

	pub(crate) fn close_all(&self) -> ManagerTask<Vec<()>, folio_task::CompletionProgress> {
		let ids: Vec<DocumentId> = self.base.core_state().document_order.clone();
		Task::all(ids.iter().map(|id| self.close(id.as_str())).collect())
	}

	/// Cleans up after a close, whoever dispatched it.
	fn forget(&self, document_id: &DocumentId) {
		let pending = self.pending.lock().remove(document_id);
		let handle = self.loaded.lock().remove(document_id);
		self.requests.lock().remove(document_id);
		self.epochs.lock().remove(document_id);
		if let Some(task) = pending {
			task.abort("document closed");
		}
		if let Some(handle) = handle {
			self.close_quietly(&handle);
		}
		self.base.logger().info("close", format_args!("closed {document_id}"));
		self.events.closed.emit(document_id.clone(), ());
		self.events.clear_scope(document_id);
	}

	pub(crate) fn set_active(&self, document_id: Option<&str>) -> Result<(), ModuleError> {
		let document_id = match document_id {
			Some(id) => Some(self.base.require_document(id)?.id),
			None => None,
		};
		self.base.dispatch_core(CoreAction::SetActiveDocument { document_id });
		Ok(())
	}

	pub(crate) fn reorder(&self, order: Vec<DocumentId>) -> bool {
		let before = self.base.core_state();
		let after = self.base.dispatch_core(CoreAction::ReorderDocuments { order });
		!Arc::ptr_eq(&before, &after.core_arc())
	}

	pub(crate) fn move_document(&self, document_id: &str, to_index: usize) -> Result<bool, ModuleError> {
		let document_id = self.base.require_document(document_id)?.id;
		let before = self.base.core_state();
		let after = self.base.dispatch_core(CoreAction::MoveDocument { document_id, to_index });
		Ok(!Arc::ptr_eq(&before, &after.core_arc()))
	}
}

/// The document-manager module.
pub struct DocumentManager {
	inner: Arc<Inner>,
}

impl DocumentManager {
	pub fn new(base: ModuleBase, engine: Arc<dyn DocumentEngine>, config: DocumentManagerConfig) -> Self {
		let events = Events::new();
		base.own_channel(events.opened.clone());
		base.own_channel(events.closed.clone());
		base.own_channel(events.error.clone());
		base.own_channel(events.progress.clone());
		base.own_channel(events.active.clone());
		Self {
			inner: Arc::new(Inner {
				base,
				engine,
				config,
				requests: Mutex::new(FxHashMap::default()),
				pending: Mutex::new(FxHashMap::default()),
				loaded: Mutex::new(FxHashMap::default()),
				epochs: Mutex::new(FxHashMap::default()),
				next_epoch: AtomicU64::new(0),
				events,
				destroyed: AtomicBool::new(false),
			}),
		}
	}

	pub fn capability(&self) -> DocumentManagerCapability {
		DocumentManagerCapability::new(Arc::clone(&self.inner))
	}

	pub fn config(&self) -> &DocumentManagerConfig {
		&self.inner.config
	}
}

#[async_trait]
impl Module for DocumentManager {
	fn base(&self) -> &ModuleBase {
		&self.inner.base
	}

	fn build_capability(&self) -> Capability {
		Arc::new(self.capability())
	}

	fn initialize(&self) -> Result<(), ModuleError> {
		let core = self.inner.base.core_state();
		self.inner.events.active.emit(ActiveDocumentChange {
			previous: None,
			current: core.active_document_id.clone(),
		});
		Ok(())
	}

	async fn destroy(&self) {
		let inner = &self.inner;
		inner.destroyed.store(true, Ordering::Release);
		let pending: Vec<OpenTask> = inner.pending.lock().drain().map(|(_, task)| task).collect();
		for task in pending {
			task.abort("document manager destroyed");
		}
		let loaded: Vec<(DocumentId, DocumentHandle)> = inner.loaded.lock().drain().collect();
		for (document_id, handle) in loaded {
			if let Err(err) = inner.engine.close_document(&handle).await {
				inner.base.logger().warn("destroy", format_args!("engine failed to close {document_id}: {err}"));
			}
		}
		inner.requests.lock().clear();
		inner.epochs.lock().clear();
		inner.base.teardown();
	}

	fn on_document_closed(&self, document_id: &DocumentId) {
		self.inner.forget(document_id);
	}

	fn on_active_document_changed(&self, previous: Option<&DocumentId>, current: Option<&DocumentId>) {
		self.inner.events.active.emit(ActiveDocumentChange {
			previous: previous.cloned(),
			current: current.cloned(),
		});
	}
}
