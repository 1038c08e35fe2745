use folio_primitives::DocumentId;

use super::{CoreAction, CoreState, DocumentState, DocumentStatus};
use crate::Action;

/// Reduces core actions. Returns `None` when `state` is unchanged.
///
/// Actions that are not [`CoreAction`]s, and core actions that are invalid
/// for the current state (duplicate open, transition out of the wrong status,
/// unknown id), leave the state untouched.
pub fn core_reducer(state: &CoreState, action: &Action) -> Option<CoreState> {
	let action = action.payload::<CoreAction>()?;
	match action {
		CoreAction::StartLoadingDocument {
			document_id,
			name,
			scale,
			rotation,
			password_protected,
			activate,
		} => {
			if state.documents.contains_key(document_id) {
				return None;
			}
			let mut next = state.clone();
			next.documents.insert(
				document_id.clone(),
				DocumentState {
					id: document_id.clone(),
					name: name.clone(),
					status: DocumentStatus::Loading,
					scale: scale.unwrap_or(state.default_scale),
					rotation: rotation.unwrap_or(state.default_rotation),
					password_protected: *password_protected,
					load_progress: None,
					document: None,
					error: None,
				},
			);
			next.document_order.push(document_id.clone());
			if *activate {
				next.active_document_id = Some(document_id.clone());
			}
			Some(next)
		}
		CoreAction::UpdateDocumentLoadingProgress { document_id, progress } => {
			let doc = state.documents.get(document_id)?;
			let progress = progress.clamp(0.0, 1.0);
			if doc.status != DocumentStatus::Loading || doc.load_progress == Some(progress) {
				return None;
			}
			update_document(state, document_id, |doc| doc.load_progress = Some(progress))
		}
		CoreAction::SetDocumentLoaded { document_id, document } => {
			if state.documents.get(document_id)?.status != DocumentStatus::Loading {
				return None;
			}
			let mut next = update_document(state, document_id, |doc| {
				doc.status = DocumentStatus::Loaded;
				doc.load_progress = None;
				doc.error = None;
				doc.document = Some(document.clone());
			})?;
			if next.active_document_id.is_none() {
				next.active_document_id = Some(document_id.clone());
			}
			Some(next)
		}
		CoreAction::SetDocumentError { document_id, error } => {
			if state.documents.get(document_id)?.status != DocumentStatus::Loading {
				return None;
			}
			update_document(state, document_id, |doc| {
				doc.status = DocumentStatus::Error;
				doc.load_progress = None;
				doc.document = None;
				doc.error = Some(error.clone());
			})
		}
		CoreAction::RetryLoadingDocument {
			document_id,
			password_protected,
		} => {
			if state.documents.get(document_id)?.status != DocumentStatus::Error {
				return None;
			}
			update_document(state, document_id, |doc| {
				doc.status = DocumentStatus::Loading;
				doc.error = None;
				doc.load_progress = None;
				if let Some(protected) = password_protected {
					doc.password_protected = *protected;
				}
			})
		}
		CoreAction::CloseDocument { document_id } => {
			if !state.documents.contains_key(document_id) {
				return None;
			}
			let mut next = state.clone();
			next.active_document_id = select_after_removal(&state.document_order, state.active_document_id.as_ref(), document_id);
			next.documents.remove(document_id);
			next.document_order.retain(|id| id != document_id);
			Some(next)
		}
		CoreAction::SetActiveDocument { document_id } => {
			if state.active_document_id == *document_id {
				return None;
			}
			if let Some(id) = document_id
				&& !state.document_order.contains(id)
			{
				return None;
			}
			let mut next = state.clone();
			next.active_document_id = document_id.clone();
			Some(next)
		}
		CoreAction::ReorderDocuments { order } => {
			if *order == state.document_order || !is_permutation(&state.document_order, order) {
				return None;
			}
			let mut next = state.clone();
			next.document_order = order.clone();
			Some(next)
		}
		CoreAction::MoveDocument { document_id, to_index } => {
			let from = state.document_order.iter().position(|id| id == document_id)?;
			let to = (*to_index).min(state.document_order.len() - 1);
			if from == to {
				return None;
			}
			let mut next = state.clone();
			let id = next.document_order.remove(from);
			next.document_order.insert(to, id);
			Some(next)
		}
		CoreAction::SetScale { document_id, scale } => {
			if !scale.is_finite() || *scale <= 0.0 {
				return None;
			}
			let id = target_document(state, document_id.as_ref())?;
			if state.documents.get(id)?.scale == *scale {
				return None;
			}
			update_document(state, id, |doc| doc.scale = *scale)
		}
		CoreAction::SetRotation { document_id, rotation } => {
			let id = target_document(state, document_id.as_ref())?;
			if state.documents.get(id)?.rotation == *rotation {
				return None;
			}
			update_document(state, id, |doc| doc.rotation = *rotation)
		}
		CoreAction::SetDefaultScale { scale } => {
			if !scale.is_finite() || *scale <= 0.0 || state.default_scale == *scale {
				return None;
			}
			let mut next = state.clone();
			next.default_scale = *scale;
			Some(next)
		}
		CoreAction::SetDefaultRotation { rotation } => {
			if state.default_rotation == *rotation {
				return None;
			}
			let mut next = state.clone();
			next.default_rotation = *rotation;
			Some(next)
		}
	}
}

/// Picks the active item after `removed` leaves `order`.
///
/// Only applies when `removed` is the active item: the left neighbour wins,
/// then the right one, then nothing. Otherwise `active` is kept.
pub fn select_after_removal<K: Clone + PartialEq>(order: &[K], active: Option<&K>, removed: &K) -> Option<K> {
	if active != Some(removed) {
		return active.cloned();
	}
	let index = order.iter().position(|id| id == removed)?;
	if index > 0 {
		return order.get(index - 1).cloned();
	}
	order.get(index + 1).cloned()
}

fn target_document<'a>(state: &'a CoreState, id: Option<&'a DocumentId>) -> Option<&'a DocumentId> {
	id.or(state.active_document_id.as_ref())
}

fn update_document(state: &CoreState, id: &DocumentId, update: impl FnOnce(&mut DocumentState)) -> Option<CoreState> {
	let mut next = state.clone();
	update(next.documents.get_mut(id)?);
	Some(next)
}

fn is_permutation(current: &[DocumentId], proposed: &[DocumentId]) -> bool {
	if current.len() != proposed.len() {
		return false;
	}
	let mut sorted_current: Vec<&str> = current.iter().map(DocumentId::as_str).collect();
	let mut sorted_proposed: Vec<&str> = proposed.iter().map(DocumentId::as_str).collect();
	sorted_current.sort_unstable();
	sorted_proposed.sort_unstable();
	sorted_current == sorted_proposed
}
