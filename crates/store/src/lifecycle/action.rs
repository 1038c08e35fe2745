use folio_primitives::{DocumentError, DocumentHandle, DocumentId, Rotation};

use crate::Action;

/// Kind tags of core actions, for [`Store::on_action`](crate::Store::on_action).
pub mod kinds {
	pub const START_LOADING_DOCUMENT: &str = "core/start_loading_document";
	pub const UPDATE_DOCUMENT_LOADING_PROGRESS: &str = "core/update_document_loading_progress";
	pub const SET_DOCUMENT_LOADED: &str = "core/set_document_loaded";
	pub const SET_DOCUMENT_ERROR: &str = "core/set_document_error";
	pub const RETRY_LOADING_DOCUMENT: &str = "core/retry_loading_document";
	pub const CLOSE_DOCUMENT: &str = "core/close_document";
	pub const SET_ACTIVE_DOCUMENT: &str = "core/set_active_document";
	pub const REORDER_DOCUMENTS: &str = "core/reorder_documents";
	pub const MOVE_DOCUMENT: &str = "core/move_document";
	pub const SET_SCALE: &str = "core/set_scale";
	pub const SET_ROTATION: &str = "core/set_rotation";
	pub const SET_DEFAULT_SCALE: &str = "core/set_default_scale";
	pub const SET_DEFAULT_ROTATION: &str = "core/set_default_rotation";
}

/// Actions understood by the core reducer.
#[derive(Debug, Clone)]
pub enum CoreAction {
	/// `absent → loading`. Ignored if the id is already open.
	StartLoadingDocument {
		document_id: DocumentId,
		name: Option<String>,
		scale: Option<f32>,
		rotation: Option<Rotation>,
		password_protected: bool,
		/// Make the new document active immediately.
		activate: bool,
	},
	UpdateDocumentLoadingProgress {
		document_id: DocumentId,
		progress: f32,
	},
	/// `loading → loaded`. The first loaded document becomes active if none is.
	SetDocumentLoaded {
		document_id: DocumentId,
		document: DocumentHandle,
	},
	/// `loading → error`.
	SetDocumentError {
		document_id: DocumentId,
		error: DocumentError,
	},
	/// `error → loading`.
	RetryLoadingDocument {
		document_id: DocumentId,
		password_protected: Option<bool>,
	},
	/// `* → absent`. Selects a replacement if the closed document was active.
	CloseDocument {
		document_id: DocumentId,
	},
	SetActiveDocument {
		document_id: Option<DocumentId>,
	},
	/// Replaces the tab order with a permutation of the current one.
	ReorderDocuments {
		order: Vec<DocumentId>,
	},
	MoveDocument {
		document_id: DocumentId,
		to_index: usize,
	},
	/// Targets the active document when `document_id` is `None`.
	SetScale {
		document_id: Option<DocumentId>,
		scale: f32,
	},
	/// Targets the active document when `document_id` is `None`.
	SetRotation {
		document_id: Option<DocumentId>,
		rotation: Rotation,
	},
	SetDefaultScale {
		scale: f32,
	},
	SetDefaultRotation {
		rotation: Rotation,
	},
}

impl CoreAction {
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::StartLoadingDocument { .. } => kinds::START_LOADING_DOCUMENT,
			Self::UpdateDocumentLoadingProgress { .. } => kinds::UPDATE_DOCUMENT_LOADING_PROGRESS,
			Self::SetDocumentLoaded { .. } => kinds::SET_DOCUMENT_LOADED,
			Self::SetDocumentError { .. } => kinds::SET_DOCUMENT_ERROR,
			Self::RetryLoadingDocument { .. } => kinds::RETRY_LOADING_DOCUMENT,
			Self::CloseDocument { .. } => kinds::CLOSE_DOCUMENT,
			Self::SetActiveDocument { .. } => kinds::SET_ACTIVE_DOCUMENT,
			Self::ReorderDocuments { .. } => kinds::REORDER_DOCUMENTS,
			Self::MoveDocument { .. } => kinds::MOVE_DOCUMENT,
			Self::SetScale { .. } => kinds::SET_SCALE,
			Self::SetRotation { .. } => kinds::SET_ROTATION,
			Self::SetDefaultScale { .. } => kinds::SET_DEFAULT_SCALE,
			Self::SetDefaultRotation { .. } => kinds::SET_DEFAULT_ROTATION,
		}
	}
}

impl From<CoreAction> for Action {
	fn from(action: CoreAction) -> Self {
		Action::new(action.kind(), action)
	}
}
