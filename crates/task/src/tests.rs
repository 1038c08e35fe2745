use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use super::*;

type TestTask = Task<u32, String, u8>;

fn outcome_log(task: &TestTask) -> Arc<Mutex<Vec<String>>> {
	let log = Arc::new(Mutex::new(Vec::new()));
	let ok = Arc::clone(&log);
	let err = Arc::clone(&log);
	task.wait(move |v| ok.lock().push(format!("ok:{v}")), move |e| err.lock().push(format!("err:{e}")));
	log
}

#[test]
fn resolve_then_fail_keeps_first_outcome() {
	let task = TestTask::new();
	let log = outcome_log(&task);

	assert!(task.resolve(1));
	assert!(!task.fail("late".into()));
	assert!(!task.resolve(2));

	assert_eq!(log.lock().as_slice(), ["ok:1"]);
	assert_eq!(task.stage(), TaskStage::Resolved);
}

#[test]
fn fail_then_resolve_keeps_failure() {
	let task = TestTask::new();
	let log = outcome_log(&task);

	assert!(task.fail("boom".into()));
	assert!(!task.resolve(1));
	assert!(!task.abort("too late"));

	assert_eq!(log.lock().as_slice(), ["err:boom"]);
	assert_eq!(task.stage(), TaskStage::Failed);
}

#[test]
fn wait_after_settlement_fires_once_with_original_outcome() {
	let task = TestTask::new();
	task.resolve(9);
	task.fail("ignored".into());

	let log = outcome_log(&task);
	assert_eq!(log.lock().as_slice(), ["ok:9"]);
}

#[test]
fn abort_settles_as_aborted_and_notifies_producer() {
	let task = TestTask::new();
	let log = outcome_log(&task);
	let released = Arc::new(Mutex::new(None));
	let sink = Arc::clone(&released);
	task.on_abort(move |reason| *sink.lock() = Some(reason.message().to_string()));
	let signal = task.abort_signal();

	assert!(task.abort("closed"));
	assert!(!task.abort("again"));
	assert!(!task.resolve(1));

	assert_eq!(log.lock().as_slice(), ["err:aborted: closed"]);
	assert_eq!(released.lock().as_deref(), Some("closed"));
	assert!(signal.is_cancelled());
	assert_eq!(task.stage(), TaskStage::Aborted);
}

#[test]
fn abort_after_resolution_is_noop_and_skips_hooks() {
	let task = TestTask::new();
	let hooks = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&hooks);
	task.on_abort(move |_| {
		counter.fetch_add(1, Ordering::SeqCst);
	});

	task.resolve(3);
	assert!(!task.abort("late"));

	assert_eq!(hooks.load(Ordering::SeqCst), 0);
	assert!(!task.abort_signal().is_cancelled());
}

#[test]
fn abort_hook_registered_after_abort_runs_immediately() {
	let task = TestTask::new();
	task.abort("gone");
	let ran = Arc::new(AtomicUsize::new(0));
	let counter = Arc::clone(&ran);
	task.on_abort(move |_| {
		counter.fetch_add(1, Ordering::SeqCst);
	});
	assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn progress_reaches_only_listeners_present_while_pending() {
	let task = TestTask::new();
	let seen = Arc::new(Mutex::new(Vec::new()));

	assert!(task.emit_progress(1));
	let sink = Arc::clone(&seen);
	task.on_progress(move |p| sink.lock().push(*p));
	task.emit_progress(2);
	task.resolve(0);
	assert!(!task.emit_progress(3));

	assert_eq!(seen.lock().as_slice(), [2]);
}

#[test]
fn all_resolves_in_input_order_with_progress() {
	let tasks: Vec<TestTask> = (0..3).map(|_| Task::new()).collect();
	let combined = Task::all(tasks.clone());
	let progress = Arc::new(Mutex::new(Vec::new()));
	let sink = Arc::clone(&progress);
	combined.on_progress(move |p: &CompletionProgress| sink.lock().push(p.completed));

	tasks[2].resolve(30);
	tasks[0].resolve(10);
	assert!(combined.is_pending());
	tasks[1].resolve(20);

	assert_eq!(combined.outcome().as_deref(), Some(&Ok(vec![10, 20, 30])));
	assert_eq!(progress.lock().as_slice(), [1, 2, 3]);
}

#[test]
fn all_fails_on_first_failure_and_aborts_pending_siblings() {
	let tasks: Vec<TestTask> = (0..3).map(|_| Task::new()).collect();
	let combined = Task::all(tasks.clone());

	tasks[0].resolve(1);
	tasks[1].resolve(2);
	tasks[2].fail("bad page".into());

	assert_eq!(combined.outcome().as_deref(), Some(&Err(TaskError::Failed("bad page".to_string()))));

	let tasks: Vec<TestTask> = (0..3).map(|_| Task::new()).collect();
	let combined = Task::all(tasks.clone());
	tasks[1].fail("early".into());

	assert_eq!(combined.stage(), TaskStage::Failed);
	assert_eq!(tasks[0].stage(), TaskStage::Aborted);
	assert_eq!(tasks[2].stage(), TaskStage::Aborted);
}

#[test]
fn all_of_nothing_resolves_immediately() {
	let combined = Task::all(Vec::<TestTask>::new());
	assert_eq!(combined.outcome().as_deref(), Some(&Ok(Vec::new())));
}

#[test]
fn aborting_aggregate_aborts_members() {
	let tasks: Vec<TestTask> = (0..2).map(|_| Task::new()).collect();
	let combined = Task::all(tasks.clone());
	tasks[0].resolve(1);

	combined.abort("user cancelled");

	assert_eq!(tasks[0].stage(), TaskStage::Resolved);
	assert_eq!(tasks[1].stage(), TaskStage::Aborted);
	assert_eq!(combined.stage(), TaskStage::Aborted);
}

#[test]
fn all_settled_collects_every_outcome() {
	let tasks: Vec<TestTask> = (0..2).map(|_| Task::new()).collect();
	let combined = Task::all_settled(tasks.clone());

	tasks[1].fail("nope".into());
	assert!(combined.is_pending());
	tasks[0].resolve(4);

	let outcome = combined.outcome().expect("settled");
	let Ok(outcomes) = &*outcome else {
		panic!("all_settled never fails: {outcome:?}");
	};
	assert_eq!(outcomes[0], Ok(4));
	assert_eq!(outcomes[1], Err(TaskError::Failed("nope".to_string())));
}

#[tokio::test]
async fn awaiting_a_task_yields_its_outcome() {
	let task = TestTask::new();
	let producer = task.clone();
	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(5)).await;
		producer.resolve(42);
	});

	assert_eq!(task.await, Ok(42));
}

#[tokio::test]
async fn awaiting_a_dropped_task_reports_abort() {
	let task = TestTask::new();
	let fut = task.to_future();
	drop(task);

	let err = fut.await.expect_err("dropped task cannot resolve");
	assert!(err.is_aborted());
}

#[tokio::test]
async fn producer_observes_abort_signal() {
	let task = TestTask::new();
	let signal = task.abort_signal();
	let producer = task.clone();
	let worker = tokio::spawn(async move {
		tokio::select! {
			_ = signal.cancelled() => "cancelled",
			_ = tokio::time::sleep(Duration::from_secs(5)) => {
				producer.resolve(1);
				"finished"
			}
		}
	});

	task.abort("stop");
	assert_eq!(worker.await.ok(), Some("cancelled"));
}

#[tokio::test]
async fn dropping_every_member_releases_the_aggregate() {
	let tasks: Vec<TestTask> = (0..2).map(|_| Task::new()).collect();
	let combined = Task::all(tasks.clone());
	let fut = combined.to_future();
	drop(combined);
	drop(tasks);

	let outcome = tokio::time::timeout(Duration::from_secs(1), fut).await.expect("aggregate released");
	assert!(outcome.expect_err("no member resolved").is_aborted());
}

#[tokio::test]
async fn awaiting_an_aggregate_by_value_still_resolves() {
	let member = TestTask::new();
	let combined = Task::all(vec![member.clone()]);
	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(5)).await;
		member.resolve(7);
	});

	assert_eq!(combined.await, Ok(vec![7]));
}
