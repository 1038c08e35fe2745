use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::emitter::Listener;
use crate::{Clear, Emitter, Subscription};

/// Replaying channel: caches the last emitted value and delivers it to each
/// new listener immediately on subscription.
pub struct BehaviorEmitter<T> {
	inner: Emitter<T>,
	last: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for BehaviorEmitter<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
			last: Arc::clone(&self.last),
		}
	}
}

impl<T> Default for BehaviorEmitter<T> {
	fn default() -> Self {
		Self {
			inner: Emitter::default(),
			last: Arc::new(Mutex::new(None)),
		}
	}
}

impl<T: fmt::Debug + 'static> fmt::Debug for BehaviorEmitter<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BehaviorEmitter")
			.field("inner", &self.inner)
			.field("last", &*self.last.lock())
			.finish()
	}
}

impl<T: Clone + Send + 'static> BehaviorEmitter<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribes a listener, replaying the cached value first if one exists.
	pub fn on(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
		let listener: Listener<T> = Arc::new(listener);
		let subscription = self.inner.on_shared(Arc::clone(&listener));
		let cached = self.last.lock().clone();
		if let Some(value) = cached {
			listener(&value);
		}
		subscription
	}

	/// Caches `value` and delivers it to every current listener.
	pub fn emit(&self, value: T) {
		*self.last.lock() = Some(value.clone());
		self.inner.emit_ref(&value);
	}

	/// Returns the cached value, if anything was emitted since the last clear.
	pub fn value(&self) -> Option<T> {
		self.last.lock().clone()
	}

	/// Drops every listener and forgets the cached value.
	pub fn clear(&self) {
		self.inner.clear();
		*self.last.lock() = None;
	}

	pub fn listener_count(&self) -> usize {
		self.inner.listener_count()
	}
}

impl<T: Clone + Send + 'static> Clear for BehaviorEmitter<T> {
	fn clear(&self) {
		BehaviorEmitter::clear(self);
	}
}
