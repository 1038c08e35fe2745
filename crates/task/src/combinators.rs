use std::sync::Arc;

use parking_lot::Mutex;

use crate::task::WeakTask;
use crate::{AbortReason, Task, TaskError, TaskResult};

/// Progress of an aggregate task: how many members have settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompletionProgress {
	pub completed: usize,
	pub total: usize,
}

struct Collect<R> {
	slots: Vec<Option<R>>,
	completed: usize,
}

impl<R> Collect<R> {
	fn new(total: usize) -> Self {
		Self {
			slots: (0..total).map(|_| None).collect(),
			completed: 0,
		}
	}

	/// Stores one member outcome; returns every outcome once all have arrived.
	fn record(&mut self, index: usize, value: R) -> (CompletionProgress, Option<Vec<R>>) {
		if self.slots[index].is_none() {
			self.completed += 1;
		}
		self.slots[index] = Some(value);
		let total = self.slots.len();
		let progress = CompletionProgress {
			completed: self.completed,
			total,
		};
		if self.completed == total {
			(progress, Some(self.slots.iter_mut().filter_map(Option::take).collect()))
		} else {
			(progress, None)
		}
	}
}

impl<T, E, P> Task<T, E, P>
where
	T: Clone + Send + Sync + 'static,
	E: Clone + Send + Sync + 'static,
	P: 'static,
{
	/// Resolves with every member's value, in input order, once all succeed.
	///
	/// Fails with the first member failure. Members still pending at that
	/// point are aborted, so no work continues for a result nobody can
	/// observe. Aborting the aggregate aborts every member still alive.
	///
	/// Members keep the aggregate alive until they settle; the aggregate and
	/// sibling members only hold them weakly.
	pub fn all(tasks: Vec<Task<T, E, P>>) -> Task<Vec<T>, E, CompletionProgress> {
		let combined = Task::new();
		let total = tasks.len();
		if total == 0 {
			combined.resolve(Vec::new());
			return combined;
		}

		let collect = Arc::new(Mutex::new(Collect::new(total)));
		let siblings: Vec<WeakTask<T, E, P>> = tasks.iter().map(Task::downgrade).collect();
		for (index, task) in tasks.iter().enumerate() {
			let combined = combined.clone();
			let collect = Arc::clone(&collect);
			let siblings = siblings.clone();
			task.on_settled(move |result| match result {
				Ok(value) => {
					let (progress, done) = collect.lock().record(index, value.clone());
					combined.emit_progress(progress);
					if let Some(values) = done {
						combined.resolve(values);
					}
				}
				Err(err) => {
					let settled = match err.clone() {
						TaskError::Failed(e) => combined.fail(e),
						TaskError::Aborted(reason) => combined.abort(reason),
					};
					if settled {
						for sibling in siblings.iter().filter_map(WeakTask::upgrade).filter(Task::is_pending) {
							sibling.abort(AbortReason::new("sibling task failed"));
						}
					}
				}
			});
		}

		combined.on_abort(move |reason| {
			for task in siblings.iter().filter_map(WeakTask::upgrade) {
				task.abort(reason.clone());
			}
		});
		combined
	}

	/// Resolves with every member's outcome, in input order, once all settle.
	///
	/// Never fails on a member failure. Aborting the aggregate aborts every
	/// member still alive.
	pub fn all_settled(tasks: Vec<Task<T, E, P>>) -> Task<Vec<TaskResult<T, E>>, E, CompletionProgress> {
		let combined = Task::new();
		let total = tasks.len();
		if total == 0 {
			combined.resolve(Vec::new());
			return combined;
		}

		let collect = Arc::new(Mutex::new(Collect::new(total)));
		for (index, task) in tasks.iter().enumerate() {
			let combined = combined.clone();
			let collect = Arc::clone(&collect);
			task.on_settled(move |result| {
				let (progress, done) = collect.lock().record(index, result.clone());
				combined.emit_progress(progress);
				if let Some(outcomes) = done {
					combined.resolve(outcomes);
				}
			});
		}

		let members: Vec<WeakTask<T, E, P>> = tasks.iter().map(Task::downgrade).collect();
		combined.on_abort(move |reason| {
			for task in members.iter().filter_map(WeakTask::upgrade) {
				task.abort(reason.clone());
			}
		});
		combined
	}
}
