use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::Action;

/// Type-erased state of one module region.
pub type ModuleState = Arc<dyn Any + Send + Sync>;

type ReduceFn = dyn Fn(&ModuleState, &Action) -> Option<ModuleState> + Send + Sync;
type SnapshotFn = dyn Fn(&ModuleState) -> serde_json::Result<serde_json::Value> + Send + Sync;

/// A module's initial state and its reducer, erased over the state type.
///
/// The typed reducer sees `&S` and returns `Some(next)` only when the action
/// changed something.
#[derive(Clone)]
pub struct ModuleReducer {
	initial: ModuleState,
	reduce: Arc<ReduceFn>,
	snapshot: Arc<SnapshotFn>,
}

impl ModuleReducer {
	pub fn new<S, F>(initial: S, reducer: F) -> Self
	where
		S: Serialize + Send + Sync + 'static,
		F: Fn(&S, &Action) -> Option<S> + Send + Sync + 'static,
	{
		Self {
			initial: Arc::new(initial),
			reduce: Arc::new(move |state: &ModuleState, action: &Action| {
				let state = state.downcast_ref::<S>()?;
				reducer(state, action).map(|next| Arc::new(next) as ModuleState)
			}),
			snapshot: Arc::new(|state: &ModuleState| match state.downcast_ref::<S>() {
				Some(state) => serde_json::to_value(state),
				None => Ok(serde_json::Value::Null),
			}),
		}
	}

	pub fn initial_state(&self) -> ModuleState {
		Arc::clone(&self.initial)
	}

	pub(crate) fn reduce(&self, state: &ModuleState, action: &Action) -> Option<ModuleState> {
		(self.reduce)(state, action)
	}

	pub(crate) fn snapshot(&self, state: &ModuleState) -> serde_json::Result<serde_json::Value> {
		(self.snapshot)(state)
	}
}

impl fmt::Debug for ModuleReducer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModuleReducer").finish_non_exhaustive()
	}
}
