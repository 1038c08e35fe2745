use std::sync::Arc;

use folio_primitives::{DocumentError, DocumentErrorCode, DocumentId, Rotation};
use folio_registry::{ModuleError, ModuleRegistry, RegistryConfig};
use folio_store::{CoreAction, DocumentStatus};
use folio_task::{TaskError, TaskStage};
use parking_lot::Mutex;
use serde_json::json;

use super::*;
use crate::testing::{MockDocument, MockEngine};

pub(crate) struct Fixture {
	pub(crate) registry: Arc<ModuleRegistry>,
	pub(crate) engine: Arc<MockEngine>,
	pub(crate) documents: DocumentManagerCapability,
}

pub(crate) fn fixture_with(engine: Arc<MockEngine>, max_documents: Option<usize>) -> Fixture {
	let mut config = RegistryConfig::new();
	if let Some(max) = max_documents {
		config = config.module(DOCUMENT_MANAGER_ID, json!({ "max_documents": max }));
	}
	let registry = ModuleRegistry::builder()
		.config(config)
		.register(package(engine.clone()))
		.build()
		.expect("registry builds");
	let documents = DocumentManagerCapability::clone(&registry.capability::<DocumentManagerCapability>(DOCUMENT_MANAGER_ID).expect("capability"));
	Fixture { registry, engine, documents }
}

pub(crate) fn fixture() -> Fixture {
	fixture_with(MockEngine::new(), None)
}

pub(crate) fn failure<T, P>(task: &ManagerTask<T, P>) -> Option<DocumentManagerError>
where
	T: Send + Sync + 'static,
	P: 'static,
{
	task.outcome().and_then(|outcome| match &*outcome {
		Err(TaskError::Failed(err)) => Some(err.clone()),
		_ => None,
	})
}

fn status(f: &Fixture, id: &str) -> Option<DocumentStatus> {
	f.documents.document(id).map(|doc| doc.status)
}

#[test]
fn capacity_limit_refuses_second_open_without_loading_entry() {
	let f = fixture_with(MockEngine::new(), Some(1));
	let seen = Arc::new(Mutex::new(Vec::<String>::new()));
	let record = Arc::clone(&seen);
	let _sub = f.registry.store().subscribe(move |change| {
		let mut seen = record.lock();
		for id in change.next.core().documents.keys() {
			if !seen.iter().any(|s| s == id.as_str()) {
				seen.push(id.to_string());
			}
		}
	});

	let first = f.documents.open_document(OpenRequest::url("https://a.test/one.pdf").id("one"));
	let second = f.documents.open_document(OpenRequest::url("https://a.test/two.pdf").id("two"));

	assert_eq!(first.stage(), TaskStage::Pending);
	assert_eq!(failure(&second), Some(DocumentManagerError::TooManyDocuments { max: 1 }));
	assert_eq!(*seen.lock(), vec!["one".to_string()]);
	assert_eq!(f.documents.document_count(), 1);
	assert_eq!(f.engine.open_count(), 1);
}

#[test]
fn open_then_load_marks_loaded_activates_and_emits() {
	let f = fixture();
	let global = Arc::new(Mutex::new(Vec::new()));
	let scoped = Arc::new(Mutex::new(Vec::new()));
	let g = Arc::clone(&global);
	let _sub = f.documents.on_document_opened(move |event| g.lock().push((event.scope.to_string(), event.event.page_count())));

	let task = f.documents.open_document(OpenRequest::url("https://a.test/doc.pdf").id("doc").name("doc.pdf").scale(1.25));
	assert_eq!(status(&f, "doc"), Some(DocumentStatus::Loading));
	assert_eq!(f.documents.active_document_id(), None);

	let scope = f.documents.for_document("doc").expect("doc is open");
	let s = Arc::clone(&scoped);
	let _scoped = scope.on_opened(move |document| s.lock().push(document.page_count()));

	assert!(f.engine.resolve_open("doc", 12));

	let state = f.documents.document("doc").expect("still open");
	assert_eq!(state.status, DocumentStatus::Loaded);
	assert_eq!(state.page_count(), Some(12));
	assert_eq!(state.scale, 1.25);
	assert_eq!(state.name.as_deref(), Some("doc.pdf"));
	assert_eq!(f.documents.active_document_id().as_ref().map(DocumentId::as_str), Some("doc"));
	assert_eq!(*global.lock(), vec![("doc".to_string(), 12)]);
	assert_eq!(*scoped.lock(), vec![12]);
	assert_eq!(task.stage(), TaskStage::Resolved);
	assert_eq!(f.documents.pending_load_count(), 0);
}

#[test]
fn generated_ids_are_used_when_none_given() {
	let f = fixture();
	f.documents.open_document_buffer(vec![1u8, 2, 3]);
	let opens = f.engine.opens();
	assert_eq!(opens.len(), 1);
	assert_eq!(opens[0].source, DocumentSource::Buffer(Arc::from(vec![1u8, 2, 3])));
	let docs = f.documents.documents();
	assert_eq!(docs.len(), 1);
	assert_eq!(docs[0].id, opens[0].document_id);
}

#[test]
fn duplicate_id_is_refused() {
	let f = fixture();
	f.documents.open_document(OpenRequest::url("u").id("a"));
	let again = f.documents.open_document(OpenRequest::url("u").id("a"));
	assert_eq!(failure(&again), Some(DocumentManagerError::AlreadyOpen(DocumentId::new("a"))));
	assert_eq!(f.engine.open_count(), 1);
}

#[test]
fn engine_failure_is_recorded_and_retry_reuses_options() {
	let f = fixture();
	let errors = Arc::new(Mutex::new(Vec::new()));
	let e = Arc::clone(&errors);
	let _sub = f.documents.on_document_error(move |event| e.lock().push((event.scope.to_string(), event.event.code)));

	let task = f.documents.open_document(OpenRequest::url("https://a.test/locked.pdf").id("locked"));
	let error = DocumentError::new(DocumentErrorCode::Password, "password required");
	assert!(f.engine.fail_open("locked", error.clone()));

	let state = f.documents.document("locked").expect("kept in error state");
	assert_eq!(state.status, DocumentStatus::Error);
	assert_eq!(state.error.as_ref(), Some(&error));
	assert_eq!(failure(&task), Some(DocumentManagerError::Engine(error)));
	assert_eq!(*errors.lock(), vec![("locked".to_string(), DocumentErrorCode::Password)]);

	let retry = f.documents.retry_document(
		"locked",
		RetryOptions {
			password: Some("hunter2".into()),
			rotation: Some(Rotation::Degree90),
			..RetryOptions::default()
		},
	);
	let state = f.documents.document("locked").expect("still open");
	assert_eq!(state.status, DocumentStatus::Loading);
	assert!(state.password_protected);
	assert_eq!(state.rotation, Rotation::Degree90);

	let opens = f.engine.opens();
	assert_eq!(opens.len(), 2);
	assert_eq!(opens[1].source, DocumentSource::Url("https://a.test/locked.pdf".into()));
	assert_eq!(opens[1].options.password.as_deref(), Some("hunter2"));

	assert!(f.engine.resolve_open("locked", 2));
	assert_eq!(retry.stage(), TaskStage::Resolved);
	assert_eq!(status(&f, "locked"), Some(DocumentStatus::Loaded));
}

#[test]
fn retry_is_rejected_unless_in_error() {
	let f = fixture();
	f.documents.open_document(OpenRequest::url("u").id("a"));
	let retry = f.documents.retry_document("a", RetryOptions::default());
	assert_eq!(
		failure(&retry),
		Some(DocumentManagerError::NotRetryable {
			document_id: DocumentId::new("a"),
			status: DocumentStatus::Loading,
		})
	);

	f.engine.resolve_open("a", 1);
	let retry = f.documents.retry_document("a", RetryOptions::default());
	assert!(matches!(failure(&retry), Some(DocumentManagerError::NotRetryable { status: DocumentStatus::Loaded, .. })));

	let retry = f.documents.retry_document("ghost", RetryOptions::default());
	assert_eq!(failure(&retry), Some(DocumentManagerError::NotFound(DocumentId::new("ghost"))));
	assert_eq!(f.engine.open_count(), 1);
}

#[test]
fn closing_loaded_document_closes_engine_side() {
	let f = fixture();
	let closed = Arc::new(Mutex::new(Vec::new()));
	let c = Arc::clone(&closed);
	let _sub = f.documents.on_document_closed(move |id| c.lock().push(id.to_string()));

	f.documents.open_document(OpenRequest::url("u").id("a"));
	f.engine.resolve_open("a", 3);
	let scope = f.documents.for_document("a").expect("open");
	let scoped_closes = Arc::new(Mutex::new(0));
	let sc = Arc::clone(&scoped_closes);
	let _scoped = scope.on_closed(move || *sc.lock() += 1);

	let task = f.documents.close_document("a");

	assert_eq!(task.stage(), TaskStage::Resolved);
	assert_eq!(f.engine.closed_ids(), vec!["engine-a".to_string()]);
	assert_eq!(*closed.lock(), vec!["a".to_string()]);
	assert_eq!(*scoped_closes.lock(), 1);
	assert!(scope.state().is_none());
	assert_eq!(f.documents.document_count(), 0);
	assert_eq!(f.documents.active_document_id(), None);
}

#[test]
fn scoped_listeners_do_not_survive_reopen() {
	let f = fixture();
	f.documents.open_document(OpenRequest::url("u").id("a"));
	let scope = f.documents.for_document("a").expect("open");
	let hits = Arc::new(Mutex::new(0));
	let h = Arc::clone(&hits);
	let _sub = scope.on_opened(move |_| *h.lock() += 1);
	f.documents.close_document("a");

	f.documents.open_document(OpenRequest::url("u").id("a"));
	f.engine.resolve_open("a", 1);
	assert_eq!(*hits.lock(), 0);
}

#[test]
fn stale_scope_stays_detached_after_reopen() {
	let f = fixture();
	f.documents.open_document(OpenRequest::url("u").id("a"));
	let stale = f.documents.for_document("a").expect("open");
	f.documents.close_document("a");
	assert!(!stale.is_open());

	let hits = Arc::new(Mutex::new(0));
	let h = Arc::clone(&hits);
	let _sub = stale.on_opened(move |_| *h.lock() += 1);
	f.documents.open_document(OpenRequest::url("u").id("a"));
	f.engine.resolve_open("a", 1);

	assert_eq!(*hits.lock(), 0);
	assert!(stale.state().is_none());
	assert!(matches!(failure(&stale.close()), Some(DocumentManagerError::NotFound(_))));
	assert!(matches!(stale.activate(), Err(ModuleError::UnknownDocument { .. })));
	assert_eq!(status(&f, "a"), Some(DocumentStatus::Loaded));

	let fresh = f.documents.for_document("a").expect("reopened");
	assert!(fresh.is_open());
	assert!(fresh.state().is_some());
}

#[test]
fn closing_while_loading_aborts_engine_load() {
	let f = fixture();
	let open = f.documents.open_document(OpenRequest::url("u").id("a"));
	let engine_task = f.engine.open_task("a").expect("engine load started");

	let close = f.documents.close_document("a");

	assert_eq!(close.stage(), TaskStage::Resolved);
	assert_eq!(engine_task.stage(), TaskStage::Aborted);
	assert_eq!(open.stage(), TaskStage::Aborted);
	assert!(f.documents.document("a").is_none());
	assert!(f.engine.closed_ids().is_empty());
	assert_eq!(f.documents.pending_load_count(), 0);
}

#[test]
fn aborting_open_task_cancels_engine_and_records_error() {
	let f = fixture();
	let open = f.documents.open_document(OpenRequest::url("u").id("a"));
	let engine_task = f.engine.open_task("a").expect("engine load started");

	assert!(open.abort("user cancelled"));

	assert_eq!(engine_task.stage(), TaskStage::Aborted);
	let state = f.documents.document("a").expect("kept for retry");
	assert_eq!(state.status, DocumentStatus::Error);
	assert_eq!(state.error.map(|e| e.code), Some(DocumentErrorCode::Cancelled));
}

#[test]
fn external_close_aborts_pending_load() {
	let f = fixture();
	f.documents.open_document(OpenRequest::url("u").id("a"));
	let engine_task = f.engine.open_task("a").expect("engine load started");
	f.registry.store().dispatch(CoreAction::CloseDocument {
		document_id: DocumentId::new("a"),
	});
	assert_eq!(engine_task.stage(), TaskStage::Aborted, "close hook aborts the pending load");
	assert!(!f.engine.resolve_open("a", 1));
	assert!(f.documents.document("a").is_none());
}

#[test]
fn external_close_of_loaded_document_releases_engine_handle() {
	let f = fixture();
	f.documents.open_document(OpenRequest::url("u").id("a"));
	f.engine.resolve_open("a", 1);
	f.registry.store().dispatch(CoreAction::CloseDocument {
		document_id: DocumentId::new("a"),
	});
	assert_eq!(f.engine.closed_ids(), vec!["engine-a".to_string()]);
}

#[test]
fn progress_updates_state_and_streams() {
	let f = fixture();
	let open = f.documents.open_document(OpenRequest::url("u").id("a"));
	let task_progress = Arc::new(Mutex::new(Vec::new()));
	let tp = Arc::clone(&task_progress);
	open.on_progress(move |p| tp.lock().push(p.loaded));
	let global = Arc::new(Mutex::new(Vec::new()));
	let g = Arc::clone(&global);
	let _sub = f.documents.on_loading_progress(move |event| g.lock().push(event.event.loaded));

	assert!(f.engine.report_progress("a", LoadProgress::new(25, Some(100))));

	assert_eq!(f.documents.document("a").and_then(|d| d.load_progress), Some(0.25));
	assert_eq!(*task_progress.lock(), vec![25]);
	assert_eq!(*global.lock(), vec![25]);
}

#[test]
fn active_document_changes_replay_latest() {
	let f = fixture();
	f.documents.open_document(OpenRequest::url("u").id("a"));
	f.documents.open_document(OpenRequest::url("u").id("b"));
	f.engine.resolve_open("a", 1);
	f.engine.resolve_open("b", 1);
	f.documents.set_active_document(Some("b")).expect("b is open");

	let seen = Arc::new(Mutex::new(Vec::new()));
	let s = Arc::clone(&seen);
	let _sub = f.documents.on_active_document_changed(move |change| s.lock().push(change.clone()));
	assert_eq!(
		*seen.lock(),
		vec![ActiveDocumentChange {
			previous: Some(DocumentId::new("a")),
			current: Some(DocumentId::new("b")),
		}]
	);

	f.documents.close_active_document();
	assert_eq!(seen.lock().last().and_then(|c| c.current.clone()), Some(DocumentId::new("a")));
}

#[test]
fn close_all_closes_every_document() {
	let f = fixture();
	for id in ["a", "b", "c"] {
		f.documents.open_document(OpenRequest::url("u").id(id));
	}
	f.engine.resolve_open("a", 1);
	f.engine.resolve_open("c", 1);

	let task = f.documents.close_all_documents();
	assert_eq!(task.stage(), TaskStage::Resolved);
	assert_eq!(f.documents.document_count(), 0);
	assert_eq!(f.engine.closed_ids(), vec!["engine-a".to_string(), "engine-c".to_string()]);
}

#[test]
fn close_all_failure_leaves_sibling_engine_closes_running() {
	let f = fixture_with(MockEngine::manual_close(), None);
	for id in ["a", "b"] {
		f.documents.open_document(OpenRequest::url("u").id(id));
		f.engine.resolve_open(id, 1);
	}

	let all = f.documents.close_all_documents();
	let closes = f.engine.closes();
	assert_eq!(closes.len(), 2);
	closes[0].task.fail(DocumentError::new(DocumentErrorCode::Unknown, "engine busy"));

	assert!(matches!(failure(&all), Some(DocumentManagerError::Engine(_))));
	assert_eq!(closes[1].task.stage(), TaskStage::Pending);
	assert!(closes[1].task.resolve(()));
	assert_eq!(f.documents.document_count(), 0);
}

#[test]
fn ordering_operations_validate_ids() {
	let f = fixture();
	for id in ["a", "b", "c"] {
		f.documents.open_document(OpenRequest::url("u").id(id));
	}
	assert!(f.documents.reorder_documents(vec![DocumentId::new("c"), DocumentId::new("a"), DocumentId::new("b")]));
	assert!(!f.documents.reorder_documents(vec![DocumentId::new("c")]));
	assert_eq!(f.documents.move_document("c", 10), Ok(true));
	let order: Vec<String> = f.documents.documents().iter().map(|d| d.id.to_string()).collect();
	assert_eq!(order, vec!["a", "b", "c"]);

	assert_eq!(
		f.documents.set_active_document(Some("ghost")),
		Err(ModuleError::UnknownDocument {
			document_id: DocumentId::new("ghost"),
			module: DOCUMENT_MANAGER_ID.into(),
		})
	);
	assert!(matches!(f.documents.for_document("ghost"), Err(ModuleError::UnknownDocument { .. })));
	assert!(f.documents.for_active_document().is_err());
}

#[tokio::test]
async fn open_task_can_be_awaited() {
	let f = fixture();
	let task = f.documents.open_document(OpenRequest::url("u").id("a"));
	f.engine.resolve_open("a", 7);
	let opened = task.await.expect("loaded");
	assert_eq!(opened.document_id, "a");
	assert_eq!(opened.document.page_count(), 7);
}

#[tokio::test]
async fn destroy_aborts_pending_and_closes_loaded() {
	let f = fixture();
	let pending = f.documents.open_document(OpenRequest::url("u").id("slow"));
	f.documents.open_document(OpenRequest::url("u").id("ready"));
	f.engine.resolve_open("ready", 1);

	f.registry.destroy().await;

	assert_eq!(pending.stage(), TaskStage::Aborted);
	assert_eq!(f.engine.closed_ids(), vec!["engine-ready".to_string()]);
	let after = f.documents.open_document(OpenRequest::url("u").id("late"));
	assert_eq!(failure(&after), Some(DocumentManagerError::Closed));
}

#[test]
fn restored_documents_retry_with_a_supplied_source() {
	let snapshot = folio_store::Store::builder().build();
	snapshot.dispatch(CoreAction::StartLoadingDocument {
		document_id: DocumentId::new("r"),
		name: Some("r.pdf".to_string()),
		scale: Some(1.5),
		rotation: None,
		password_protected: false,
		activate: false,
	});
	snapshot.dispatch(CoreAction::SetDocumentLoaded {
		document_id: DocumentId::new("r"),
		document: Arc::new(MockDocument::new("engine-r", 2)),
	});

	let engine = MockEngine::new();
	let registry = ModuleRegistry::builder()
		.initial_state((*snapshot.core()).clone())
		.register(package(engine.clone()))
		.build()
		.expect("registry builds");
	let documents = DocumentManagerCapability::clone(&registry.capability::<DocumentManagerCapability>(DOCUMENT_MANAGER_ID).expect("capability"));
	assert_eq!(documents.document("r").map(|doc| doc.status), Some(DocumentStatus::Error));

	let refused = documents.retry_document("r", RetryOptions::default());
	assert_eq!(failure(&refused), Some(DocumentManagerError::SourceRequired(DocumentId::new("r"))));
	assert_eq!(engine.open_count(), 0);

	let source = DocumentSource::Url("https://a.test/r.pdf".to_string());
	let task = documents.retry_document("r", RetryOptions::with_source(source.clone()));
	assert_eq!(documents.document("r").map(|doc| doc.status), Some(DocumentStatus::Loading));
	assert_eq!(engine.opens()[0].source, source);

	assert!(engine.resolve_open("r", 2));
	assert_eq!(task.stage(), TaskStage::Resolved);
	let doc = documents.document("r").expect("still open");
	assert_eq!(doc.status, DocumentStatus::Loaded);
	assert_eq!(doc.scale, 1.5);
	assert_eq!(doc.name.as_deref(), Some("r.pdf"));
}
