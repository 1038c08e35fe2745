use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{AbortReason, TaskError, TaskResult};

type SettleCallback<T, E> = Box<dyn FnOnce(&TaskResult<T, E>) + Send>;
type ProgressListener<P> = Arc<dyn Fn(&P) + Send + Sync>;
type AbortHook = Box<dyn FnOnce(&AbortReason) + Send>;

/// Coarse lifecycle stage of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStage {
	Pending,
	Resolved,
	Failed,
	Aborted,
}

enum State<T, E, P> {
	Pending {
		on_settle: Vec<SettleCallback<T, E>>,
		on_progress: Vec<ProgressListener<P>>,
		on_abort: Vec<AbortHook>,
	},
	Settled(Arc<TaskResult<T, E>>),
}

struct Inner<T, E, P> {
	state: Mutex<State<T, E, P>>,
	cancel: CancellationToken,
}

/// Cancelable, progress-reporting, single-settlement asynchronous result.
///
/// `Task` is a shared handle: the producer keeps one clone to settle it, the
/// consumer keeps another to observe or abort it.
pub struct Task<T, E, P = ()> {
	inner: Arc<Inner<T, E, P>>,
}

impl<T, E, P> Clone for Task<T, E, P> {
	fn clone(&self) -> Self {
		Self {
			inner: Arc::clone(&self.inner),
		}
	}
}

/// Non-owning handle to a [`Task`], used by combinators so members and
/// aggregates do not keep each other alive.
pub(crate) struct WeakTask<T, E, P = ()> {
	inner: Weak<Inner<T, E, P>>,
}

impl<T, E, P> Clone for WeakTask<T, E, P> {
	fn clone(&self) -> Self {
		Self {
			inner: Weak::clone(&self.inner),
		}
	}
}

impl<T, E, P> WeakTask<T, E, P> {
	pub(crate) fn upgrade(&self) -> Option<Task<T, E, P>> {
		self.inner.upgrade().map(|inner| Task { inner })
	}
}

impl<T, E, P> fmt::Debug for Task<T, E, P>
where
	T: Send + Sync + 'static,
	E: Send + Sync + 'static,
	P: 'static,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Task").field("stage", &self.stage()).finish()
	}
}

impl<T, E, P> Default for Task<T, E, P>
where
	T: Send + Sync + 'static,
	E: Send + Sync + 'static,
	P: 'static,
{
	fn default() -> Self {
		Self::new()
	}
}

impl<T, E, P> Task<T, E, P>
where
	T: Send + Sync + 'static,
	E: Send + Sync + 'static,
	P: 'static,
{
	/// Creates a pending task.
	pub fn new() -> Self {
		Self {
			inner: Arc::new(Inner {
				state: Mutex::new(State::Pending {
					on_settle: Vec::new(),
					on_progress: Vec::new(),
					on_abort: Vec::new(),
				}),
				cancel: CancellationToken::new(),
			}),
		}
	}

	/// Creates a task already resolved with `value`.
	pub fn resolved(value: T) -> Self {
		let task = Self::new();
		task.resolve(value);
		task
	}

	/// Creates a task already failed with `error`.
	pub fn failed(error: E) -> Self {
		let task = Self::new();
		task.fail(error);
		task
	}

	/// Resolves the task. Returns false if it had already settled.
	pub fn resolve(&self, value: T) -> bool {
		self.settle(Ok(value))
	}

	/// Fails the task. Returns false if it had already settled.
	pub fn fail(&self, error: E) -> bool {
		self.settle(Err(TaskError::Failed(error)))
	}

	/// Aborts the task on behalf of a consumer.
	///
	/// Settles the task as [`TaskError::Aborted`], cancels the abort signal
	/// and runs the producer's abort hooks so it can stop work and release
	/// resources. Returns false if the task had already settled.
	pub fn abort(&self, reason: impl Into<AbortReason>) -> bool {
		let reason = reason.into();
		let result = Arc::new(Err(TaskError::Aborted(reason.clone())));
		let (callbacks, hooks) = {
			let mut state = self.inner.state.lock();
			match std::mem::replace(&mut *state, State::Settled(Arc::clone(&result))) {
				State::Pending { on_settle, on_abort, .. } => (on_settle, on_abort),
				settled @ State::Settled(_) => {
					*state = settled;
					return false;
				}
			}
		};

		tracing::trace!(reason = %reason, hooks = hooks.len(), "task.abort");
		self.inner.cancel.cancel();
		for hook in hooks {
			hook(&reason);
		}
		for callback in callbacks {
			callback(&result);
		}
		true
	}

	fn settle(&self, result: TaskResult<T, E>) -> bool {
		let result = Arc::new(result);
		let callbacks = {
			let mut state = self.inner.state.lock();
			match std::mem::replace(&mut *state, State::Settled(Arc::clone(&result))) {
				State::Pending { on_settle, .. } => on_settle,
				settled @ State::Settled(_) => {
					*state = settled;
					return false;
				}
			}
		};

		for callback in callbacks {
			callback(&result);
		}
		true
	}

	/// Delivers a progress event to current listeners. Ignored once settled.
	pub fn emit_progress(&self, progress: P) -> bool {
		let listeners = match &*self.inner.state.lock() {
			State::Pending { on_progress, .. } => on_progress.clone(),
			State::Settled(_) => return false,
		};
		for listener in listeners {
			listener(&progress);
		}
		true
	}

	/// Registers a progress listener. Past events are not replayed.
	pub fn on_progress(&self, listener: impl Fn(&P) + Send + Sync + 'static) {
		if let State::Pending { on_progress, .. } = &mut *self.inner.state.lock() {
			on_progress.push(Arc::new(listener));
		}
	}

	/// Registers a callback for settlement, firing immediately if already settled.
	pub fn on_settled(&self, callback: impl FnOnce(&TaskResult<T, E>) + Send + 'static) {
		let settled = {
			let mut state = self.inner.state.lock();
			match &mut *state {
				State::Pending { on_settle, .. } => {
					on_settle.push(Box::new(callback));
					return;
				}
				State::Settled(result) => Arc::clone(result),
			}
		};
		callback(&settled);
	}

	/// Registers success and failure callbacks; exactly one of them runs once.
	pub fn wait(&self, on_success: impl FnOnce(&T) + Send + 'static, on_failure: impl FnOnce(&TaskError<E>) + Send + 'static) {
		self.on_settled(move |result| match result {
			Ok(value) => on_success(value),
			Err(err) => on_failure(err),
		});
	}

	/// Registers a producer hook run when a consumer aborts the task.
	///
	/// Runs immediately if the task was already aborted; never runs if the
	/// task settled any other way.
	pub fn on_abort(&self, hook: impl FnOnce(&AbortReason) + Send + 'static) {
		let reason = {
			let mut state = self.inner.state.lock();
			match &mut *state {
				State::Pending { on_abort, .. } => {
					on_abort.push(Box::new(hook));
					return;
				}
				State::Settled(result) => match &**result {
					Err(TaskError::Aborted(reason)) => reason.clone(),
					_ => return,
				},
			}
		};
		hook(&reason);
	}

	/// Token cancelled when a consumer aborts, for producers that `select!`
	/// on cancellation instead of registering hooks.
	pub fn abort_signal(&self) -> CancellationToken {
		self.inner.cancel.clone()
	}

	pub fn stage(&self) -> TaskStage {
		match &*self.inner.state.lock() {
			State::Pending { .. } => TaskStage::Pending,
			State::Settled(result) => match &**result {
				Ok(_) => TaskStage::Resolved,
				Err(TaskError::Failed(_)) => TaskStage::Failed,
				Err(TaskError::Aborted(_)) => TaskStage::Aborted,
			},
		}
	}

	pub fn is_pending(&self) -> bool {
		self.stage() == TaskStage::Pending
	}

	/// Returns the outcome if the task has settled.
	pub fn outcome(&self) -> Option<Arc<TaskResult<T, E>>> {
		match &*self.inner.state.lock() {
			State::Pending { .. } => None,
			State::Settled(result) => Some(Arc::clone(result)),
		}
	}

	pub(crate) fn downgrade(&self) -> WeakTask<T, E, P> {
		WeakTask {
			inner: Arc::downgrade(&self.inner),
		}
	}

	/// Returns true if both handles refer to the same task.
	pub fn ptr_eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}
}
