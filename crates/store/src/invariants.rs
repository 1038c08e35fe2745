use std::collections::HashSet;
use std::sync::Arc;

use folio_primitives::{DocumentError, DocumentErrorCode, DocumentId, Rotation};
use proptest::prelude::*;

use crate::tests::{FakeDoc, open};
use crate::{CoreAction, CoreState, Store};

const POOL: [&str; 4] = ["d0", "d1", "d2", "d3"];

fn core_action(op: u8, a: usize, b: usize) -> CoreAction {
	let id = DocumentId::new(POOL[a % POOL.len()]);
	match op % 9 {
		0 => open(id.as_str(), b % 2 == 0),
		1 => CoreAction::SetDocumentLoaded {
			document: Arc::new(FakeDoc::new(id.as_str(), 3)),
			document_id: id,
		},
		2 => CoreAction::SetDocumentError {
			document_id: id,
			error: DocumentError::new(DocumentErrorCode::Network, "offline"),
		},
		3 => CoreAction::RetryLoadingDocument {
			document_id: id,
			password_protected: None,
		},
		4 => CoreAction::CloseDocument { document_id: id },
		5 => CoreAction::SetActiveDocument {
			document_id: (b % 3 != 0).then_some(id),
		},
		6 => CoreAction::MoveDocument { document_id: id, to_index: b },
		7 => CoreAction::ReorderDocuments {
			order: POOL.iter().rev().take(b % (POOL.len() + 1)).map(|s| DocumentId::new(*s)).collect(),
		},
		_ => CoreAction::SetRotation {
			document_id: None,
			rotation: Rotation::Degree90,
		},
	}
}

/// A snapshot of `core` with a duplicated tab, a tab for a missing document
/// and a dangling active id.
fn corrupted(core: &CoreState, a: usize) -> CoreState {
	let mut core = core.clone();
	if let Some(first) = core.document_order.first().cloned() {
		core.document_order.push(first);
	}
	core.document_order.insert(a % (core.document_order.len() + 1), DocumentId::new("ghost"));
	core.active_document_id = Some(DocumentId::new("nowhere"));
	core
}

fn check(core: &CoreState) -> Result<(), TestCaseError> {
	let unique: HashSet<&DocumentId> = core.document_order.iter().collect();
	prop_assert_eq!(unique.len(), core.document_order.len());
	prop_assert_eq!(core.documents.len(), core.document_order.len());
	for id in &core.document_order {
		prop_assert!(core.documents.contains_key(id));
	}
	if let Some(active) = &core.active_document_id {
		prop_assert!(core.document_order.contains(active));
	}
	for doc in core.documents.values() {
		prop_assert_eq!(doc.document.is_some(), doc.is_loaded());
		prop_assert_eq!(doc.error.is_some(), doc.status == crate::DocumentStatus::Error);
	}
	Ok(())
}

proptest! {
	/// Must keep `document_order` duplicate-free and a key set of `documents`.
	///
	/// - Enforced in: `core_reducer`, `CoreState::restored`
	/// - Failure symptom: Tabs rendered for documents that no longer exist, or
	///   one document shown twice.
	#[test]
	fn order_and_active_stay_consistent(ops in prop::collection::vec((any::<u8>(), 0usize..8, 0usize..8), 1..60)) {
		let store = Store::builder().build();
		for (op, a, b) in ops {
			if op % 10 == 9 {
				store.restore_core(corrupted(&store.core(), a));
			} else {
				store.dispatch(core_action(op, a, b));
			}
			check(&store.core())?;
		}
	}
}

/// Must return the previous snapshot when no reducer changes anything.
///
/// - Enforced in: `Store::dispatch`
/// - Failure symptom: Every module re-renders on unrelated actions.
#[test]
fn unchanged_dispatch_keeps_snapshot() {
	let store = Store::builder().build();
	let before = store.get_state();
	let after = store.dispatch(CoreAction::CloseDocument {
		document_id: DocumentId::new("missing"),
	});
	assert!(Arc::ptr_eq(&before, &after));
}

/// Must not hold the dispatch lock while listeners run.
///
/// - Enforced in: `Store::apply`
/// - Failure symptom: Deadlock when a subscriber dispatches a follow-up action.
#[test]
fn listeners_may_dispatch() {
	let store = Arc::new(Store::builder().build());
	let inner = Arc::clone(&store);
	let _sub = store.subscribe(move |change| {
		if change.action.is(crate::lifecycle::kinds::START_LOADING_DOCUMENT) {
			inner.dispatch(CoreAction::SetDocumentError {
				document_id: DocumentId::new("d0"),
				error: DocumentError::new(DocumentErrorCode::Unknown, "boom"),
			});
		}
	});
	store.dispatch(open("d0", false));
	assert_eq!(store.core().document("d0").map(|d| d.status), Some(crate::DocumentStatus::Error));
}
