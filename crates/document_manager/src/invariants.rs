use std::sync::Arc;

use folio_primitives::DocumentId;
use folio_store::CoreAction;
use folio_task::TaskStage;

use crate::OpenRequest;
use crate::testing::MockEngine;
use crate::tests::{failure, fixture, fixture_with};

/// Must refuse an open beyond `max_documents` before any state change.
///
/// - Enforced in: `Inner::open`
/// - Failure symptom: A `loading` entry flickers into core state and the
///   engine starts a load that is then thrown away.
#[test]
fn test_capacity_checked_before_dispatch() {
	let f = fixture_with(MockEngine::new(), Some(2));
	f.documents.open_document(OpenRequest::url("u").id("a"));
	f.documents.open_document(OpenRequest::url("u").id("b"));
	let before = f.registry.store().get_state();
	let refused = f.documents.open_document(OpenRequest::url("u").id("c"));
	assert!(failure(&refused).is_some());
	assert!(Arc::ptr_eq(&before, &f.registry.store().get_state()));
	assert_eq!(f.engine.open_count(), 2);
}

/// Must release per-document working state when a document closes, however
/// the close was dispatched.
///
/// - Enforced in: `Inner::forget`
/// - Failure symptom: Engine loads keep running for closed documents and
///   their handles are never closed.
#[test]
fn test_close_releases_pending_loads() {
	let f = fixture();
	for id in ["a", "b"] {
		f.documents.open_document(OpenRequest::url("u").id(id));
	}
	assert_eq!(f.documents.pending_load_count(), 2);
	f.documents.close_document("a");
	f.registry.store().dispatch(CoreAction::CloseDocument { document_id: DocumentId::new("b") });
	assert_eq!(f.documents.pending_load_count(), 0);
	assert!(f.engine.opens().iter().all(|open| open.task.stage() == TaskStage::Aborted));
}

/// Must settle the caller's Task after core state reflects the outcome.
///
/// - Enforced in: `Inner::finish_load`
/// - Failure symptom: A caller reacting to the resolved Task reads a
///   document still marked `loading`.
#[test]
fn test_task_settles_after_state() {
	let f = fixture();
	let task = f.documents.open_document(OpenRequest::url("u").id("a"));
	let documents = f.documents.clone();
	let observed = Arc::new(parking_lot::Mutex::new(None));
	let slot = Arc::clone(&observed);
	task.wait(move |_| *slot.lock() = documents.document("a").map(|d| d.status), |_| {});
	f.engine.resolve_open("a", 1);
	assert_eq!(*observed.lock(), Some(folio_store::DocumentStatus::Loaded));
}
