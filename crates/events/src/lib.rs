//! Typed publish/subscribe channels.
//!
//! Modules expose observable changes through these channels without knowing
//! who consumes them. Two variants exist:
//!
//! - [`Emitter`] delivers only to listeners subscribed at emission time.
//! - [`BehaviorEmitter`] caches the last value and replays it to each new
//!   listener as it subscribes.
//!
//! [`ScopedEmitter`] layers keyed delivery on top, so a capability can offer a
//! global stream (each event carries its scope key) and per-scope streams
//! (pre-filtered, key omitted) from one source.
//!
//! Delivery is synchronous within `emit`, in subscription order. No lock is
//! held while listeners run, so a listener may subscribe, unsubscribe or emit
//! re-entrantly.

mod behavior;
mod emitter;
mod scoped;
mod subscription;

pub use behavior::BehaviorEmitter;
pub use emitter::Emitter;
pub use scoped::{ScopedEmitter, ScopedEvent};
pub use subscription::Subscription;

/// Channels whose listeners can be dropped in bulk.
///
/// Module teardown holds its channels as `Box<dyn Clear>` and clears them all.
pub trait Clear: Send + Sync {
	/// Drops every listener (and any cached value).
	fn clear(&self);
}
