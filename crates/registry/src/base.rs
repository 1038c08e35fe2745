use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use folio_events::{Clear, Subscription};
use folio_primitives::{DocumentId, ModuleId, ModuleLogger};
use folio_store::{Action, CoreAction, CoreState, DocumentState, Store, StoreState};
use parking_lot::Mutex;

use crate::{ModuleError, ModuleRegistry};

/// Shared plumbing handed to every module factory.
///
/// Reads go through the store snapshot; writes are dispatches. Module
/// dispatches are scoped to the module's own region. Subscriptions and
/// channels registered here are released by [`teardown`](Self::teardown).
pub struct ModuleBase {
	id: ModuleId,
	registry: Weak<ModuleRegistry>,
	store: Arc<Store>,
	logger: ModuleLogger,
	subscriptions: Mutex<Vec<Subscription>>,
	channels: Mutex<Vec<Box<dyn Clear>>>,
}

impl ModuleBase {
	pub(crate) fn new(id: ModuleId, registry: Weak<ModuleRegistry>, store: Arc<Store>, logger: ModuleLogger) -> Self {
		Self {
			id,
			registry,
			store,
			logger,
			subscriptions: Mutex::new(Vec::new()),
			channels: Mutex::new(Vec::new()),
		}
	}

	pub fn id(&self) -> &ModuleId {
		&self.id
	}

	pub fn logger(&self) -> &ModuleLogger {
		&self.logger
	}

	pub fn store(&self) -> &Arc<Store> {
		&self.store
	}

	/// This module's region, if it registered one of type `S`.
	pub fn state<S: Any + Send + Sync>(&self) -> Option<Arc<S>> {
		self.store.module_state::<S>(self.id.as_str())
	}

	/// Like [`state`](Self::state), but a missing region is an error.
	pub fn require_state<S: Any + Send + Sync>(&self) -> Result<Arc<S>, ModuleError> {
		self.state::<S>().ok_or_else(|| ModuleError::StateMismatch { module: self.id.clone() })
	}

	pub fn core_state(&self) -> Arc<CoreState> {
		self.store.core()
	}

	pub fn store_state(&self) -> Arc<StoreState> {
		self.store.get_state()
	}

	/// Dispatches to this module's reducer only.
	pub fn dispatch(&self, action: impl Into<Action>) -> Arc<StoreState> {
		self.store.dispatch_to_module(self.id.as_str(), action)
	}

	/// Dispatches through the core reducer and every module reducer.
	pub fn dispatch_core(&self, action: CoreAction) -> Arc<StoreState> {
		self.store.dispatch(action)
	}

	/// The owning registry. `None` once it has been dropped.
	pub fn registry(&self) -> Option<Arc<ModuleRegistry>> {
		self.registry.upgrade()
	}

	/// Capability of another module, by id or provided capability name.
	///
	/// During construction only dependencies already built are visible.
	pub fn capability<C: Any + Send + Sync>(&self, name: &str) -> Option<Arc<C>> {
		self.registry()?.capability::<C>(name)
	}

	/// Like [`capability`](Self::capability) for hard dependencies.
	pub fn require_capability<C: Any + Send + Sync>(&self, name: &str) -> Result<Arc<C>, ModuleError> {
		self.capability::<C>(name).ok_or_else(|| ModuleError::MissingCapability {
			module: self.id.clone(),
			capability: name.to_string(),
		})
	}

	/// Keeps `subscription` until teardown.
	pub fn track(&self, subscription: Subscription) {
		self.subscriptions.lock().push(subscription);
	}

	/// Clears `channel` at teardown.
	pub fn own_channel(&self, channel: impl Clear + 'static) {
		self.channels.lock().push(Box::new(channel));
	}

	pub fn active_document_id(&self) -> Option<DocumentId> {
		self.store.core().active_document_id.clone()
	}

	/// Resolves `document_id`, or the active document when `None`.
	pub fn resolve_document_id(&self, document_id: Option<&str>) -> Result<DocumentId, ModuleError> {
		match document_id {
			Some(id) => Ok(self.require_document(id)?.id),
			None => self.active_document_id().ok_or_else(|| ModuleError::message(format!("module `{}`: no active document", self.id))),
		}
	}

	/// Core entry of `document_id`, or [`ModuleError::UnknownDocument`].
	pub fn require_document(&self, document_id: &str) -> Result<DocumentState, ModuleError> {
		self.store.core().document(document_id).cloned().ok_or_else(|| ModuleError::UnknownDocument {
			document_id: DocumentId::new(document_id),
			module: self.id.clone(),
		})
	}

	/// Detaches tracked subscriptions and clears owned channels.
	///
	/// Idempotent.
	pub fn teardown(&self) {
		let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
		for sub in subscriptions {
			sub.unsubscribe();
		}
		let channels = std::mem::take(&mut *self.channels.lock());
		for channel in &channels {
			channel.clear();
		}
		tracing::debug!(module = %self.id, "module.teardown");
	}
}

impl fmt::Debug for ModuleBase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModuleBase").field("id", &self.id).finish_non_exhaustive()
	}
}
