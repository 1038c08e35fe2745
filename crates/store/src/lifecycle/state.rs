use folio_primitives::{DocumentError, DocumentErrorCode, DocumentHandle, DocumentId, Rotation};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Loading status of one open document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
	Loading,
	Loaded,
	Error,
}

impl DocumentStatus {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Loading => "loading",
			Self::Loaded => "loaded",
			Self::Error => "error",
		}
	}
}

/// Core-state entry for one open document.
///
/// `document` is present only while `status` is [`DocumentStatus::Loaded`];
/// `error` only while it is [`DocumentStatus::Error`]. The engine handle is
/// live and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentState {
	pub id: DocumentId,
	pub name: Option<String>,
	pub status: DocumentStatus,
	pub scale: f32,
	pub rotation: Rotation,
	pub password_protected: bool,
	/// Fraction in `0.0..=1.0` reported by the engine while loading.
	pub load_progress: Option<f32>,
	#[serde(skip)]
	pub document: Option<DocumentHandle>,
	pub error: Option<DocumentError>,
}

impl DocumentState {
	pub fn is_loaded(&self) -> bool {
		self.status == DocumentStatus::Loaded
	}

	/// Page count of the loaded engine document.
	pub fn page_count(&self) -> Option<u32> {
		self.document.as_ref().map(|doc| doc.page_count())
	}
}

/// The runtime-owned region of the state tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreState {
	pub documents: FxHashMap<DocumentId, DocumentState>,
	/// Tab order, independent of map iteration order.
	pub document_order: Vec<DocumentId>,
	pub active_document_id: Option<DocumentId>,
	pub default_scale: f32,
	pub default_rotation: Rotation,
}

impl Default for CoreState {
	fn default() -> Self {
		Self {
			documents: FxHashMap::default(),
			document_order: Vec::new(),
			active_document_id: None,
			default_scale: 1.0,
			default_rotation: Rotation::Degree0,
		}
	}
}

impl CoreState {
	pub fn document(&self, id: &str) -> Option<&DocumentState> {
		self.documents.get(id)
	}

	pub fn active_document(&self) -> Option<&DocumentState> {
		self.active_document_id.as_ref().and_then(|id| self.documents.get(id))
	}

	/// Documents in tab order.
	pub fn ordered_documents(&self) -> impl Iterator<Item = &DocumentState> {
		self.document_order.iter().filter_map(|id| self.documents.get(id))
	}

	pub fn document_count(&self) -> usize {
		self.document_order.len()
	}

	/// Normalizes a snapshot for installation as live state.
	///
	/// Engine handles cannot survive a snapshot, so every document that was
	/// not already an error comes back as one and has to be retried with its
	/// source. `document_order` is made duplicate-free and exactly the key set
	/// of `documents` (unlisted documents are appended in id order), a dangling
	/// active id is cleared, and unusable scales fall back to the defaults.
	pub fn restored(mut self) -> Self {
		if !valid_scale(self.default_scale) {
			self.default_scale = 1.0;
		}
		let default_scale = self.default_scale;
		for (id, doc) in &mut self.documents {
			doc.id = id.clone();
			doc.document = None;
			doc.load_progress = None;
			if doc.status != DocumentStatus::Error || doc.error.is_none() {
				doc.status = DocumentStatus::Error;
				doc.error = Some(DocumentError::new(DocumentErrorCode::Cancelled, "document was restored without an engine handle"));
			}
			if !valid_scale(doc.scale) {
				doc.scale = default_scale;
			}
		}

		let mut listed: FxHashSet<DocumentId> = FxHashSet::default();
		let documents = &self.documents;
		self.document_order.retain(|id| documents.contains_key(id) && listed.insert(id.clone()));
		let mut unlisted: Vec<DocumentId> = self.documents.keys().filter(|id| !listed.contains(*id)).cloned().collect();
		unlisted.sort_by(|a, b| a.as_str().cmp(b.as_str()));
		self.document_order.extend(unlisted);

		if self.active_document_id.as_ref().is_some_and(|id| !self.documents.contains_key(id)) {
			self.active_document_id = None;
		}
		self
	}
}

fn valid_scale(scale: f32) -> bool {
	scale.is_finite() && scale > 0.0
}
