use std::sync::Arc;

use folio_primitives::{DocumentHandle, DocumentId, Rotation};
use serde::{Deserialize, Serialize};

use crate::DocumentSource;

/// A request to open one document.
///
/// The manager keeps it after a failed load so a retry can reuse it.
#[derive(Debug, Clone)]
pub struct OpenRequest {
	pub source: DocumentSource,
	/// Generated when absent.
	pub document_id: Option<DocumentId>,
	pub name: Option<String>,
	pub password: Option<String>,
	pub scale: Option<f32>,
	pub rotation: Option<Rotation>,
	/// Make the document active as soon as it starts loading.
	pub activate: bool,
}

impl OpenRequest {
	pub fn new(source: DocumentSource) -> Self {
		Self {
			source,
			document_id: None,
			name: None,
			password: None,
			scale: None,
			rotation: None,
			activate: false,
		}
	}

	pub fn url(url: impl Into<String>) -> Self {
		Self::new(DocumentSource::Url(url.into()))
	}

	pub fn buffer(bytes: impl Into<Arc<[u8]>>) -> Self {
		Self::new(DocumentSource::Buffer(bytes.into()))
	}

	#[must_use]
	pub fn id(mut self, document_id: impl Into<DocumentId>) -> Self {
		self.document_id = Some(document_id.into());
		self
	}

	#[must_use]
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	#[must_use]
	pub fn password(mut self, password: impl Into<String>) -> Self {
		self.password = Some(password.into());
		self
	}

	#[must_use]
	pub fn scale(mut self, scale: f32) -> Self {
		self.scale = Some(scale);
		self
	}

	#[must_use]
	pub fn rotation(mut self, rotation: Rotation) -> Self {
		self.rotation = Some(rotation);
		self
	}

	#[must_use]
	pub fn activate(mut self, activate: bool) -> Self {
		self.activate = activate;
		self
	}
}

/// Overrides applied to the stored request when retrying.
///
/// Documents restored from a snapshot have no stored request; retrying one
/// needs `source`, and the rest of the request comes from its core entry.
#[derive(Debug, Clone, Default)]
pub struct RetryOptions {
	pub source: Option<DocumentSource>,
	pub password: Option<String>,
	pub scale: Option<f32>,
	pub rotation: Option<Rotation>,
}

impl RetryOptions {
	pub fn with_password(password: impl Into<String>) -> Self {
		Self {
			password: Some(password.into()),
			..Self::default()
		}
	}

	pub fn with_source(source: DocumentSource) -> Self {
		Self {
			source: Some(source),
			..Self::default()
		}
	}
}

/// Result of a successful open.
#[derive(Debug, Clone)]
pub struct OpenedDocument {
	pub document_id: DocumentId,
	pub document: DocumentHandle,
}

/// Module configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentManagerConfig {
	/// Upper bound on concurrently open documents, in any status.
	pub max_documents: Option<usize>,
}

/// Change of the active document, as replayed to late subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDocumentChange {
	pub previous: Option<DocumentId>,
	pub current: Option<DocumentId>,
}
