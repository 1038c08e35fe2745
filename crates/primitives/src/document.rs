use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A live document object owned by the external document engine.
///
/// Handles are opaque to the runtime. They are stored in core state while a
/// document is loaded and never serialized.
pub trait EngineDocument: fmt::Debug + Send + Sync {
	/// Engine-side identifier of the document.
	fn id(&self) -> &str;

	/// Number of pages in the document.
	fn page_count(&self) -> u32;
}

/// Shared handle to an engine document.
pub type DocumentHandle = Arc<dyn EngineDocument>;

/// Machine-readable classification of a document failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentErrorCode {
	Unknown,
	NotFound,
	WrongFormat,
	Password,
	Security,
	Network,
	NotSupported,
	Cancelled,
}

impl DocumentErrorCode {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Unknown => "unknown",
			Self::NotFound => "not_found",
			Self::WrongFormat => "wrong_format",
			Self::Password => "password",
			Self::Security => "security",
			Self::Network => "network",
			Self::NotSupported => "not_supported",
			Self::Cancelled => "cancelled",
		}
	}
}

impl fmt::Display for DocumentErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Structured reason a document failed to open, close or reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct DocumentError {
	pub code: DocumentErrorCode,
	pub message: String,
	/// Engine-specific detail, when the engine provides one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
}

impl DocumentError {
	pub fn new(code: DocumentErrorCode, message: impl Into<String>) -> Self {
		Self {
			code,
			message: message.into(),
			reason: None,
		}
	}

	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());
		self
	}

	/// Returns true when the failure can be fixed by supplying a password.
	pub fn is_password_error(&self) -> bool {
		self.code == DocumentErrorCode::Password
	}
}
