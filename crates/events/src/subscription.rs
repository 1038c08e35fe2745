use std::fmt;

type Detach = Box<dyn FnOnce() + Send + Sync>;

/// Handle returned by every `on(..)` registration.
///
/// Dropping a subscription leaves the listener attached. Call
/// [`unsubscribe`](Self::unsubscribe) to detach it.
pub struct Subscription {
	detach: Option<Detach>,
}

impl Subscription {
	/// Wraps a detach callback.
	pub fn new(detach: impl FnOnce() + Send + Sync + 'static) -> Self {
		Self {
			detach: Some(Box::new(detach)),
		}
	}

	/// A subscription with nothing to detach.
	pub fn noop() -> Self {
		Self { detach: None }
	}

	/// Combines several subscriptions into one that detaches them all.
	pub fn all(subscriptions: Vec<Subscription>) -> Self {
		Self::new(move || {
			for sub in subscriptions {
				sub.unsubscribe();
			}
		})
	}

	/// Detaches the listener. Safe to call after the channel was cleared.
	pub fn unsubscribe(mut self) {
		if let Some(detach) = self.detach.take() {
			detach();
		}
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("attached", &self.detach.is_some()).finish()
	}
}
