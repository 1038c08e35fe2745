use folio_primitives::{DocumentError, DocumentId};
use folio_store::DocumentStatus;
use thiserror::Error;

/// Failure of a document-manager Task.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentManagerError {
	#[error("cannot open more than {max} documents")]
	TooManyDocuments { max: usize },

	#[error("document `{0}` is already open")]
	AlreadyOpen(DocumentId),

	#[error("document `{0}` is not open")]
	NotFound(DocumentId),

	#[error("document `{0}` has no stored source; retry it with one")]
	SourceRequired(DocumentId),

	#[error("document `{document_id}` cannot be retried while {}", .status.as_str())]
	NotRetryable { document_id: DocumentId, status: DocumentStatus },

	#[error(transparent)]
	Engine(#[from] DocumentError),

	#[error("document manager has been destroyed")]
	Closed,
}
