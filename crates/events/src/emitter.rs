use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::{Clear, Subscription};

pub(crate) type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Listeners<T> {
	next_id: u64,
	entries: Vec<(u64, Listener<T>)>,
}

impl<T> Default for Listeners<T> {
	fn default() -> Self {
		Self {
			next_id: 0,
			entries: Vec::new(),
		}
	}
}

/// Transient channel: delivers only to currently subscribed listeners.
pub struct Emitter<T> {
	listeners: Arc<Mutex<Listeners<T>>>,
}

impl<T> Clone for Emitter<T> {
	fn clone(&self) -> Self {
		Self {
			listeners: Arc::clone(&self.listeners),
		}
	}
}

impl<T> Default for Emitter<T> {
	fn default() -> Self {
		Self {
			listeners: Arc::new(Mutex::new(Listeners::default())),
		}
	}
}

impl<T: 'static> fmt::Debug for Emitter<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Emitter").field("listeners", &self.listener_count()).finish()
	}
}

impl<T: 'static> Emitter<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Subscribes a listener; it receives every later emission.
	pub fn on(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
		self.on_shared(Arc::new(listener))
	}

	pub(crate) fn on_shared(&self, listener: Listener<T>) -> Subscription {
		let id = {
			let mut guard = self.listeners.lock();
			let id = guard.next_id;
			guard.next_id = guard.next_id.wrapping_add(1);
			guard.entries.push((id, listener));
			id
		};
		let weak: Weak<Mutex<Listeners<T>>> = Arc::downgrade(&self.listeners);
		Subscription::new(move || {
			if let Some(listeners) = weak.upgrade() {
				listeners.lock().entries.retain(|(entry_id, _)| *entry_id != id);
			}
		})
	}

	/// Delivers `value` to every listener in subscription order.
	pub fn emit(&self, value: T) {
		self.emit_ref(&value);
	}

	pub(crate) fn emit_ref(&self, value: &T) {
		let snapshot: Vec<Listener<T>> = self.listeners.lock().entries.iter().map(|(_, l)| Arc::clone(l)).collect();
		for listener in snapshot {
			listener(value);
		}
	}

	/// Drops every listener.
	pub fn clear(&self) {
		self.listeners.lock().entries.clear();
	}

	pub fn listener_count(&self) -> usize {
		self.listeners.lock().entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.listener_count() == 0
	}
}

impl<T: 'static> Clear for Emitter<T> {
	fn clear(&self) {
		Emitter::clear(self);
	}
}
