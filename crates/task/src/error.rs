use std::borrow::Cow;
use std::fmt;

/// Why a consumer aborted a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbortReason {
	message: Cow<'static, str>,
}

impl AbortReason {
	pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
		Self { message: message.into() }
	}

	pub fn message(&self) -> &str {
		&self.message
	}

	/// Reason used when every producer handle was dropped before settlement.
	pub(crate) fn dropped() -> Self {
		Self::new("task dropped before settlement")
	}
}

impl fmt::Display for AbortReason {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.message)
	}
}

impl From<&'static str> for AbortReason {
	fn from(message: &'static str) -> Self {
		Self::new(message)
	}
}

impl From<String> for AbortReason {
	fn from(message: String) -> Self {
		Self::new(message)
	}
}

/// Failed settlement of a task.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TaskError<E> {
	/// The producer reported a failure.
	#[error("{0}")]
	Failed(E),
	/// A consumer aborted the task before it settled.
	#[error("aborted: {0}")]
	Aborted(AbortReason),
}

impl<E> TaskError<E> {
	pub fn is_aborted(&self) -> bool {
		matches!(self, Self::Aborted(_))
	}

	/// Returns the producer error, if this is not an abort.
	pub fn failure(&self) -> Option<&E> {
		match self {
			Self::Failed(err) => Some(err),
			Self::Aborted(_) => None,
		}
	}

	/// Maps the producer error, keeping aborts as they are.
	pub fn map<F>(self, f: impl FnOnce(E) -> F) -> TaskError<F> {
		match self {
			Self::Failed(err) => TaskError::Failed(f(err)),
			Self::Aborted(reason) => TaskError::Aborted(reason),
		}
	}
}

/// Final outcome of a task.
pub type TaskResult<T, E> = Result<T, TaskError<E>>;
