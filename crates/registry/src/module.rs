use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use folio_primitives::{DocumentId, Rotation};
use folio_store::{CoreState, StoreState};

use crate::{ModuleBase, ModuleError};

/// A module's public surface, narrowed to a concrete type at the call site
/// with [`ModuleRegistry::capability`](crate::ModuleRegistry::capability).
pub type Capability = Arc<dyn Any + Send + Sync>;

/// Contract every module fulfills.
///
/// Lifecycle hooks are driven by diffing the core region across dispatches
/// and run in dependency order. They default to no-ops.
#[async_trait]
pub trait Module: Any + Send + Sync {
	fn base(&self) -> &ModuleBase;

	/// Builds the capability object. Called once, right after construction.
	fn build_capability(&self) -> Capability;

	/// Runs once after every module has been constructed, in dependency order.
	fn initialize(&self) -> Result<(), ModuleError> {
		Ok(())
	}

	/// Releases the module. Overrides must finish with `self.base().teardown()`.
	async fn destroy(&self) {
		self.base().teardown();
	}

	fn on_document_loading_started(&self, _document_id: &DocumentId) {}

	fn on_document_loaded(&self, _document_id: &DocumentId) {}

	fn on_document_closed(&self, _document_id: &DocumentId) {}

	fn on_document_error(&self, _document_id: &DocumentId) {}

	fn on_active_document_changed(&self, _previous: Option<&DocumentId>, _current: Option<&DocumentId>) {}

	fn on_rotation_changed(&self, _document_id: &DocumentId, _rotation: Rotation) {}

	fn on_scale_changed(&self, _document_id: &DocumentId, _scale: f32) {}

	/// The core region changed. Runs after the per-document hooks.
	fn on_core_store_updated(&self, _previous: &CoreState, _next: &CoreState) {}

	/// This module's own region changed.
	fn on_store_updated(&self, _previous: &StoreState, _next: &StoreState) {}
}
