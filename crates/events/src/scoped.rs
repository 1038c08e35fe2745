use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::{Clear, Emitter, Subscription};

/// Global form of a scoped event: the payload plus the scope it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedEvent<K, T> {
	pub scope: K,
	pub event: T,
}

/// Keyed channel with a global stream and per-scope streams.
///
/// Global listeners see [`ScopedEvent`] values carrying the scope key. Scope
/// listeners see only payloads emitted for their key, without the key.
pub struct ScopedEmitter<K, T> {
	global: Emitter<ScopedEvent<K, T>>,
	scopes: Arc<Mutex<FxHashMap<K, Emitter<T>>>>,
}

impl<K, T> Clone for ScopedEmitter<K, T> {
	fn clone(&self) -> Self {
		Self {
			global: self.global.clone(),
			scopes: Arc::clone(&self.scopes),
		}
	}
}

impl<K, T> Default for ScopedEmitter<K, T> {
	fn default() -> Self {
		Self {
			global: Emitter::default(),
			scopes: Arc::new(Mutex::new(FxHashMap::default())),
		}
	}
}

impl<K: 'static, T: 'static> fmt::Debug for ScopedEmitter<K, T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ScopedEmitter")
			.field("global", &self.global)
			.field("scopes", &self.scopes.lock().len())
			.finish()
	}
}

impl<K, T> ScopedEmitter<K, T>
where
	K: Clone + Eq + Hash + Send + 'static,
	T: Clone + 'static,
{
	pub fn new() -> Self {
		Self::default()
	}

	/// Emits `event` for `scope`: global listeners first, then scope listeners.
	pub fn emit(&self, scope: K, event: T) {
		let scoped = self.scopes.lock().get(&scope).cloned();
		self.global.emit(ScopedEvent {
			scope,
			event: event.clone(),
		});
		if let Some(emitter) = scoped {
			emitter.emit(event);
		}
	}

	/// Subscribes to every scope; events carry their scope key.
	pub fn on_global(&self, listener: impl Fn(&ScopedEvent<K, T>) + Send + Sync + 'static) -> Subscription {
		self.global.on(listener)
	}

	/// Subscribes to one scope; events arrive without the key.
	pub fn on_scope(&self, scope: K, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
		let emitter = self.scopes.lock().entry(scope).or_default().clone();
		emitter.on(listener)
	}

	/// Drops every listener of one scope, e.g. when the scoped entity closes.
	pub fn clear_scope(&self, scope: &K) {
		if let Some(emitter) = self.scopes.lock().remove(scope) {
			emitter.clear();
		}
	}

	/// Drops every global and scope listener.
	pub fn clear(&self) {
		self.global.clear();
		let scopes: Vec<Emitter<T>> = self.scopes.lock().drain().map(|(_, e)| e).collect();
		for emitter in scopes {
			emitter.clear();
		}
	}

	pub fn scope_count(&self) -> usize {
		self.scopes.lock().len()
	}
}

impl<K, T> Clear for ScopedEmitter<K, T>
where
	K: Clone + Eq + Hash + Send + Sync + 'static,
	T: Clone + 'static,
{
	fn clear(&self) {
		ScopedEmitter::clear(self);
	}
}
