use std::any::Any;
use std::sync::Arc;

use folio_primitives::ModuleId;
use indexmap::IndexMap;

use crate::{CoreState, ModuleState};

/// One immutable snapshot of the whole tree.
///
/// Regions untouched by a dispatch are shared with the previous snapshot,
/// so `Arc::ptr_eq` on a region tells whether it changed.
#[derive(Debug, Clone)]
pub struct StoreState {
	pub(crate) core: Arc<CoreState>,
	pub(crate) modules: Arc<IndexMap<ModuleId, ModuleState>>,
}

impl StoreState {
	pub(crate) fn new(core: CoreState, modules: IndexMap<ModuleId, ModuleState>) -> Self {
		Self {
			core: Arc::new(core),
			modules: Arc::new(modules),
		}
	}

	pub fn core(&self) -> &CoreState {
		&self.core
	}

	/// Shared handle to the core region.
	pub fn core_arc(&self) -> Arc<CoreState> {
		Arc::clone(&self.core)
	}

	/// Typed state of a module region. `None` if the module has no region or
	/// its state is not an `S`.
	pub fn module<S: Any + Send + Sync>(&self, id: &str) -> Option<Arc<S>> {
		self.modules.get(id).cloned()?.downcast::<S>().ok()
	}

	pub fn module_raw(&self, id: &str) -> Option<&ModuleState> {
		self.modules.get(id)
	}

	pub fn module_ids(&self) -> impl Iterator<Item = &ModuleId> {
		self.modules.keys()
	}

	pub fn core_changed(&self, previous: &StoreState) -> bool {
		!Arc::ptr_eq(&self.core, &previous.core)
	}

	/// Whether the region of `id` differs from the one in `previous`.
	pub fn module_changed(&self, previous: &StoreState, id: &str) -> bool {
		match (self.modules.get(id), previous.modules.get(id)) {
			(Some(a), Some(b)) => !Arc::ptr_eq(a, b),
			(None, None) => false,
			_ => true,
		}
	}
}
