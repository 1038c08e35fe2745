use std::future::{Future, IntoFuture};
use std::pin::Pin;

use tokio::sync::oneshot;

use crate::{AbortReason, Task, TaskError, TaskResult};

type TaskFuture<T, E> = Pin<Box<dyn Future<Output = TaskResult<T, E>> + Send + 'static>>;

impl<T, E, P> Task<T, E, P>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
	P: 'static,
{
	/// Adapts the task to a single-shot future of its outcome.
	///
	/// For callers that need neither progress nor cancellation. Dropping the
	/// future does not abort the task.
	pub fn to_future(&self) -> impl Future<Output = TaskResult<T, E>> + Send + 'static {
		let (tx, rx) = oneshot::channel();
		self.on_settled(move |result| {
			let _ = tx.send(result.clone());
		});
		async move { rx.await.unwrap_or_else(|_| Err(TaskError::Aborted(AbortReason::dropped()))) }
	}
}

impl<T, E, P> IntoFuture for Task<T, E, P>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
	P: 'static,
{
	type Output = TaskResult<T, E>;
	type IntoFuture = TaskFuture<T, E>;

	fn into_future(self) -> Self::IntoFuture {
		Box::pin(self.to_future())
	}
}
