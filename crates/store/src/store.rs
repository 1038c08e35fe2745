use std::sync::Arc;

use arc_swap::ArcSwap;
use folio_events::{Emitter, Subscription};
use folio_primitives::ModuleId;
use indexmap::IndexMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{Action, CoreState, ModuleReducer, ModuleState, StoreState, core_reducer};

/// What a dispatch did: the action plus the states on either side.
///
/// For [`Store::on_action`] handlers `previous` and `next` may be the same
/// snapshot.
#[derive(Debug, Clone)]
pub struct StoreChange {
	pub action: Action,
	pub previous: Arc<StoreState>,
	pub next: Arc<StoreState>,
}

impl StoreChange {
	pub fn changed(&self) -> bool {
		!Arc::ptr_eq(&self.previous, &self.next)
	}
}

/// Builds a [`Store`] from an initial core region and module reducers.
#[derive(Debug, Default)]
pub struct StoreBuilder {
	core: CoreState,
	modules: IndexMap<ModuleId, ModuleReducer>,
}

impl StoreBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn core_state(mut self, core: CoreState) -> Self {
		self.core = core;
		self
	}

	/// Adds a module region. A second reducer for the same id replaces the first.
	pub fn module(mut self, id: impl Into<ModuleId>, reducer: ModuleReducer) -> Self {
		self.modules.insert(id.into(), reducer);
		self
	}

	pub fn build(self) -> Store {
		let regions: IndexMap<ModuleId, ModuleState> = self.modules.iter().map(|(id, reducer)| (id.clone(), reducer.initial_state())).collect();
		Store {
			state: ArcSwap::from_pointee(StoreState::new(self.core, regions)),
			reducers: self.modules,
			dispatch_lock: Mutex::new(()),
			changes: Emitter::new(),
			action_handlers: Mutex::new(FxHashMap::default()),
		}
	}
}

/// The process-wide state container.
///
/// Reads are lock-free snapshots. Dispatches are serialized; no lock is held
/// while listeners run, so a listener may dispatch again. The nested dispatch
/// completes, listeners included, before the outer one returns.
pub struct Store {
	state: ArcSwap<StoreState>,
	reducers: IndexMap<ModuleId, ModuleReducer>,
	dispatch_lock: Mutex<()>,
	changes: Emitter<StoreChange>,
	action_handlers: Mutex<FxHashMap<&'static str, Emitter<StoreChange>>>,
}

impl Store {
	pub fn builder() -> StoreBuilder {
		StoreBuilder::new()
	}

	/// Runs the core reducer and every module reducer.
	///
	/// Returns the resulting snapshot, which is the previous one when no
	/// reducer changed anything.
	pub fn dispatch(&self, action: impl Into<Action>) -> Arc<StoreState> {
		let action = action.into();
		self.apply(action, |state, action| {
			let core = core_reducer(&state.core, action).map(Arc::new);
			let mut modules: Option<IndexMap<ModuleId, ModuleState>> = None;
			for (id, reducer) in &self.reducers {
				let Some(current) = state.modules.get(id) else {
					continue;
				};
				if let Some(next) = reducer.reduce(current, action) {
					modules.get_or_insert_with(|| (*state.modules).clone()).insert(id.clone(), next);
				}
			}
			if core.is_none() && modules.is_none() {
				return None;
			}
			Some(StoreState {
				core: core.unwrap_or_else(|| Arc::clone(&state.core)),
				modules: modules.map(Arc::new).unwrap_or_else(|| Arc::clone(&state.modules)),
			})
		})
	}

	/// Runs only the reducer of module `id`. The core region is untouched.
	pub fn dispatch_to_module(&self, id: &str, action: impl Into<Action>) -> Arc<StoreState> {
		let action = action.into();
		self.apply(action, |state, action| {
			let (key, reducer) = self.reducers.get_key_value(id)?;
			let next = reducer.reduce(state.modules.get(id)?, action)?;
			let mut modules = (*state.modules).clone();
			modules.insert(key.clone(), next);
			Some(StoreState {
				core: Arc::clone(&state.core),
				modules: Arc::new(modules),
			})
		})
	}

	/// Replaces the core region wholesale, e.g. from a snapshot.
	///
	/// The snapshot is normalized by [`CoreState::restored`] first. Subscribers
	/// see the change under the `store/restore_core` kind.
	pub fn restore_core(&self, core: CoreState) -> Arc<StoreState> {
		let core = Arc::new(core.restored());
		self.apply(Action::signal(RESTORE_CORE), move |state, _| {
			Some(StoreState {
				core,
				modules: Arc::clone(&state.modules),
			})
		})
	}

	fn apply(&self, action: Action, reduce: impl FnOnce(&StoreState, &Action) -> Option<StoreState>) -> Arc<StoreState> {
		let (previous, next) = {
			let _guard = self.dispatch_lock.lock();
			let previous = self.state.load_full();
			let next = match reduce(&previous, &action) {
				Some(next) => {
					let next = Arc::new(next);
					self.state.store(Arc::clone(&next));
					next
				}
				None => Arc::clone(&previous),
			};
			(previous, next)
		};
		let change = StoreChange {
			action,
			previous,
			next: Arc::clone(&next),
		};
		tracing::trace!(kind = change.action.kind(), changed = change.changed(), "store.dispatch");
		if change.changed() {
			self.changes.emit(change.clone());
		}
		let handlers = self.action_handlers.lock().get(change.action.kind()).cloned();
		if let Some(handlers) = handlers {
			handlers.emit(change);
		}
		next
	}

	/// Listens to every state-changing dispatch.
	pub fn subscribe(&self, listener: impl Fn(&StoreChange) + Send + Sync + 'static) -> Subscription {
		self.changes.on(listener)
	}

	/// Listens to every dispatch of `kind`, whether or not it changed state.
	///
	/// Handlers run after [`subscribe`](Self::subscribe) listeners.
	pub fn on_action(&self, kind: &'static str, handler: impl Fn(&StoreChange) + Send + Sync + 'static) -> Subscription {
		let emitter = self.action_handlers.lock().entry(kind).or_default().clone();
		emitter.on(handler)
	}

	pub fn get_state(&self) -> Arc<StoreState> {
		self.state.load_full()
	}

	pub fn core(&self) -> Arc<CoreState> {
		self.state.load().core_arc()
	}

	pub fn module_state<S: std::any::Any + Send + Sync>(&self, id: &str) -> Option<Arc<S>> {
		self.state.load().module::<S>(id)
	}

	pub fn has_module(&self, id: &str) -> bool {
		self.reducers.contains_key(id)
	}

	/// Serializes the current tree as `{ "core": .., "plugins": { id: .. } }`.
	///
	/// Engine handles are skipped.
	pub fn snapshot(&self) -> serde_json::Result<serde_json::Value> {
		let state = self.state.load_full();
		let mut plugins = serde_json::Map::new();
		for (id, reducer) in &self.reducers {
			if let Some(region) = state.modules.get(id) {
				plugins.insert(id.to_string(), reducer.snapshot(region)?);
			}
		}
		Ok(serde_json::json!({
			"core": serde_json::to_value(&*state.core)?,
			"plugins": plugins,
		}))
	}

	/// Drops every subscriber and action handler.
	pub fn clear_listeners(&self) {
		self.changes.clear();
		self.action_handlers.lock().clear();
	}
}

impl std::fmt::Debug for Store {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Store")
			.field("modules", &self.reducers.keys().collect::<Vec<_>>())
			.field("subscribers", &self.changes.listener_count())
			.finish_non_exhaustive()
	}
}

/// Kind of the synthetic action reported by [`Store::restore_core`].
pub const RESTORE_CORE: &str = "store/restore_core";
