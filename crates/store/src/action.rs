use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A dispatched intent: a kind tag plus a plain-data payload.
///
/// Payloads are typed; reducers and handlers recover them with
/// [`payload`](Self::payload). Kinds are namespaced by convention
/// (`core/close_document`, `zoom/set_scale`).
#[derive(Clone)]
pub struct Action {
	kind: &'static str,
	payload: Arc<dyn Any + Send + Sync>,
}

impl Action {
	pub fn new<P: Any + Send + Sync>(kind: &'static str, payload: P) -> Self {
		Self {
			kind,
			payload: Arc::new(payload),
		}
	}

	/// An action with no payload.
	pub fn signal(kind: &'static str) -> Self {
		Self::new(kind, ())
	}

	pub fn kind(&self) -> &'static str {
		self.kind
	}

	pub fn is(&self, kind: &str) -> bool {
		self.kind == kind
	}

	/// Returns the payload if it has type `P`.
	pub fn payload<P: Any>(&self) -> Option<&P> {
		self.payload.downcast_ref::<P>()
	}
}

impl fmt::Debug for Action {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Action").field("kind", &self.kind).finish_non_exhaustive()
	}
}
