//! Process-wide state container.
//!
//! One tree holds a `core` region, owned by the core reducer (document
//! registry, tab order, active document), and a `plugins` region with one
//! sub-tree per module. Dispatch is synchronous; reducers are pure and return
//! `None` when an action leaves their state untouched, so unchanged regions
//! keep their allocation and listeners compare by pointer.
//!
//! ```text
//! dispatch(action)
//!   ├─► core_reducer(core, action)          ─┐
//!   ├─► module reducer A(plugins[A], action) ├─► all None ─► same Arc, no listener fires
//!   └─► module reducer B(plugins[B], action) ─┘   any Some ─► new StoreState, listeners(prev, next)
//!   └─► on_action(kind) handlers (always)
//! ```

/// Action envelope shared by core and module reducers.
pub mod action;
/// Core region: document lifecycle, order and active document.
pub mod lifecycle;
/// Type-erased module reducers.
pub mod reducer;
/// Immutable state snapshots.
pub mod state;
/// The store itself.
pub mod store;

pub use action::Action;
pub use lifecycle::{CoreAction, CoreState, DocumentState, DocumentStatus, core_reducer, select_after_removal};
pub use reducer::{ModuleReducer, ModuleState};
pub use state::StoreState;
pub use store::{RESTORE_CORE, Store, StoreBuilder, StoreChange};

#[cfg(test)]
mod invariants;
