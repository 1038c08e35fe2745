//! Core-region diffing that drives module lifecycle hooks.

use std::collections::VecDeque;
use std::sync::Arc;

use folio_primitives::{DocumentId, Rotation};
use folio_store::{CoreState, DocumentStatus, StoreChange};
use parking_lot::Mutex;

use crate::Module;

/// One observed document transition between two core snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
	LoadingStarted(DocumentId),
	Loaded(DocumentId),
	Error(DocumentId),
	Closed(DocumentId),
	ActiveChanged {
		previous: Option<DocumentId>,
		current: Option<DocumentId>,
	},
	ScaleChanged {
		document_id: DocumentId,
		scale: f32,
	},
	RotationChanged {
		document_id: DocumentId,
		rotation: Rotation,
	},
}

/// Transitions from `previous` to `next`.
///
/// Closes come first (in old tab order), then per-document changes in new
/// tab order, then the active-document change.
pub fn diff_core(previous: &CoreState, next: &CoreState) -> Vec<LifecycleEvent> {
	let mut events = Vec::new();
	for id in &previous.document_order {
		if !next.documents.contains_key(id) {
			events.push(LifecycleEvent::Closed(id.clone()));
		}
	}
	for doc in next.ordered_documents() {
		let id = &doc.id;
		let Some(old) = previous.documents.get(id) else {
			match doc.status {
				DocumentStatus::Loading => events.push(LifecycleEvent::LoadingStarted(id.clone())),
				DocumentStatus::Loaded => {
					events.push(LifecycleEvent::LoadingStarted(id.clone()));
					events.push(LifecycleEvent::Loaded(id.clone()));
				}
				DocumentStatus::Error => events.push(LifecycleEvent::Error(id.clone())),
			}
			continue;
		};
		if old.status != doc.status {
			events.push(match doc.status {
				DocumentStatus::Loading => LifecycleEvent::LoadingStarted(id.clone()),
				DocumentStatus::Loaded => LifecycleEvent::Loaded(id.clone()),
				DocumentStatus::Error => LifecycleEvent::Error(id.clone()),
			});
		}
		if old.scale != doc.scale {
			events.push(LifecycleEvent::ScaleChanged {
				document_id: id.clone(),
				scale: doc.scale,
			});
		}
		if old.rotation != doc.rotation {
			events.push(LifecycleEvent::RotationChanged {
				document_id: id.clone(),
				rotation: doc.rotation,
			});
		}
	}
	if previous.active_document_id != next.active_document_id {
		events.push(LifecycleEvent::ActiveChanged {
			previous: previous.active_document_id.clone(),
			current: next.active_document_id.clone(),
		});
	}
	events
}

fn deliver(module: &dyn Module, event: &LifecycleEvent) {
	match event {
		LifecycleEvent::LoadingStarted(id) => module.on_document_loading_started(id),
		LifecycleEvent::Loaded(id) => module.on_document_loaded(id),
		LifecycleEvent::Error(id) => module.on_document_error(id),
		LifecycleEvent::Closed(id) => module.on_document_closed(id),
		LifecycleEvent::ActiveChanged { previous, current } => module.on_active_document_changed(previous.as_ref(), current.as_ref()),
		LifecycleEvent::ScaleChanged { document_id, scale } => module.on_scale_changed(document_id, *scale),
		LifecycleEvent::RotationChanged { document_id, rotation } => module.on_rotation_changed(document_id, *rotation),
	}
}

/// Fans one store change out to `modules`, which are in dependency order.
pub(crate) fn dispatch_hooks(modules: &[Arc<dyn Module>], change: &StoreChange) {
	let (previous, next) = (&change.previous, &change.next);
	if next.core_changed(previous) {
		let events = diff_core(previous.core(), next.core());
		for event in &events {
			tracing::trace!(?event, "registry.lifecycle");
			for module in modules {
				deliver(module.as_ref(), event);
			}
		}
		for module in modules {
			module.on_core_store_updated(previous.core(), next.core());
		}
	}
	for module in modules {
		if next.module_changed(previous, module.base().id().as_str()) {
			module.on_store_updated(previous, next);
		}
	}
}

#[derive(Debug, Default)]
struct Backlog {
	changes: VecDeque<StoreChange>,
	draining: bool,
}

/// Serializes hook delivery.
///
/// A change dispatched from inside a hook is queued until every module has
/// seen the change that triggered it, so no module observes transitions out
/// of order.
#[derive(Debug, Default)]
pub(crate) struct HookQueue {
	backlog: Mutex<Backlog>,
}

impl HookQueue {
	/// Queues `change`. Returns true when the caller must drain the queue.
	pub(crate) fn push(&self, change: StoreChange) -> bool {
		let mut backlog = self.backlog.lock();
		backlog.changes.push_back(change);
		!std::mem::replace(&mut backlog.draining, true)
	}

	/// The next queued change. `None` ends the drain.
	pub(crate) fn pop(&self) -> Option<StoreChange> {
		let mut backlog = self.backlog.lock();
		let change = backlog.changes.pop_front();
		if change.is_none() {
			backlog.draining = false;
		}
		change
	}

	/// Delivers `change` and everything queued behind it to the modules
	/// `modules` returns at delivery time.
	pub(crate) fn deliver(&self, change: &StoreChange, modules: impl Fn() -> Vec<Arc<dyn Module>>) {
		if !self.push(change.clone()) {
			tracing::trace!(action = ?change.action, "registry.lifecycle_deferred");
			return;
		}
		while let Some(change) = self.pop() {
			dispatch_hooks(&modules(), &change);
		}
	}
}
