use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Arc<str>);

		impl $name {
			/// Creates an identifier from any string-like value.
			pub fn new(id: impl Into<Arc<str>>) -> Self {
				Self(id.into())
			}

			/// Returns the identifier as a string slice.
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}

		impl From<&str> for $name {
			fn from(id: &str) -> Self {
				Self(Arc::from(id))
			}
		}

		impl From<String> for $name {
			fn from(id: String) -> Self {
				Self(Arc::from(id))
			}
		}

		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}

		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}

		impl PartialEq<str> for $name {
			fn eq(&self, other: &str) -> bool {
				&*self.0 == other
			}
		}

		impl PartialEq<&str> for $name {
			fn eq(&self, other: &&str) -> bool {
				&*self.0 == *other
			}
		}
	};
}

string_id! {
	/// Stable identifier of an open document.
	///
	/// Supplied by the caller when opening a document, or generated.
	DocumentId
}

string_id! {
	/// Unique identifier of a registered module, taken from its manifest.
	ModuleId
}

impl DocumentId {
	/// Generates a fresh random identifier.
	pub fn generate() -> Self {
		Self::from(uuid::Uuid::new_v4().to_string())
	}
}
