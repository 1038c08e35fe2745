use std::sync::Arc;

use async_trait::async_trait;
use folio_primitives::{DocumentId, ModuleId};
use folio_store::CoreAction;
use serde_json::Value;

use crate::registry::plan;
use crate::tests::{FakeDoc, new_log, open, recorder, take};
use crate::{Capability, Module, ModuleBase, ModuleManifest, ModulePackage, ModuleRegistry};

fn ids(manifests: &[ModuleManifest], order: &[usize]) -> Vec<String> {
	order.iter().map(|&index| manifests[index].id.to_string()).collect()
}

/// Must construct a module only after every resolved dependency.
///
/// - Enforced in: `plan`
/// - Failure symptom: A factory sees `None` for a declared dependency's
///   capability.
#[test]
fn test_dependencies_precede_dependents() {
	let manifests = vec![
		ModuleManifest::new("annotation").requires("selection").requires("history"),
		ModuleManifest::new("history"),
		ModuleManifest::new("selection").requires("interaction"),
		ModuleManifest::new("interaction"),
	];
	let refs: Vec<&ModuleManifest> = manifests.iter().collect();
	let plan = plan(&refs).expect("acyclic");
	assert_eq!(ids(&manifests, &plan.order), vec!["history", "interaction", "selection", "annotation"]);
}

/// Must break ordering ties by registration order.
///
/// - Enforced in: `plan`
/// - Failure symptom: Hook delivery order changes between runs.
#[test]
fn test_ties_follow_registration_order() {
	let manifests: Vec<ModuleManifest> = ["d", "c", "b", "a"].into_iter().map(ModuleManifest::new).collect();
	let refs: Vec<&ModuleManifest> = manifests.iter().collect();
	let plan = plan(&refs).expect("acyclic");
	assert_eq!(plan.order, vec![0, 1, 2, 3]);
}

/// Must treat a self-dependency as a cycle.
///
/// - Enforced in: `plan`
/// - Failure symptom: A factory runs before its own capability exists.
#[test]
fn test_self_dependency_is_a_cycle() {
	let manifests = [ModuleManifest::new("loop").requires("loop")];
	let refs: Vec<&ModuleManifest> = manifests.iter().collect();
	assert!(matches!(
		plan(&refs),
		Err(crate::RegistryError::DependencyCycle { modules }) if modules == vec![ModuleId::new("loop")]
	));
}

/// Must treat optional dependencies as ordering hints that never fail a build.
///
/// - Enforced in: `plan`
/// - Failure symptom: Two modules that merely use each other when present
///   cannot be registered together.
#[test]
fn test_optional_cycles_keep_the_first_registered_edge() {
	let manifests = vec![
		ModuleManifest::new("a").optional("b"),
		ModuleManifest::new("b").optional("a"),
		ModuleManifest::new("c").requires("a").optional("c"),
	];
	let refs: Vec<&ModuleManifest> = manifests.iter().collect();
	let plan = plan(&refs).expect("optional cycles are not fatal");
	assert_eq!(ids(&manifests, &plan.order), vec!["b", "a", "c"]);

	let log = new_log();
	let registry = ModuleRegistry::builder()
		.register(recorder(ModuleManifest::new("a").optional("b"), &log))
		.register(recorder(ModuleManifest::new("b").optional("a"), &log))
		.build()
		.expect("registry builds");
	assert_eq!(registry.module_ids(), vec![ModuleId::new("b"), ModuleId::new("a")]);
}

/// Must still reject a cycle made only of `requires` edges when optional
/// edges are also present.
///
/// - Enforced in: `plan`
/// - Failure symptom: A module is constructed before a hard dependency.
#[test]
fn test_required_cycles_stay_fatal_alongside_optional_edges() {
	let manifests = vec![
		ModuleManifest::new("a").requires("b").optional("c"),
		ModuleManifest::new("b").requires("a"),
		ModuleManifest::new("c"),
	];
	let refs: Vec<&ModuleManifest> = manifests.iter().collect();
	assert!(matches!(
		plan(&refs),
		Err(crate::RegistryError::DependencyCycle { modules }) if modules == vec![ModuleId::new("a"), ModuleId::new("b")]
	));
}

/// Must never hand out a registry whose build failed.
///
/// - Enforced in: `ModuleRegistryBuilder::build`
/// - Failure symptom: Host code reaches modules that were never initialized.
#[test]
fn test_failed_build_returns_no_registry() {
	let log = new_log();
	let result = crate::ModuleRegistry::builder()
		.register(recorder(ModuleManifest::new("a").requires("missing"), &log))
		.build();
	assert!(result.is_err());
}

/// Closes every document as soon as it loads.
#[derive(Debug)]
struct Closer {
	base: ModuleBase,
}

#[async_trait]
impl Module for Closer {
	fn base(&self) -> &ModuleBase {
		&self.base
	}

	fn build_capability(&self) -> Capability {
		Arc::new(())
	}

	fn on_document_loaded(&self, document_id: &DocumentId) {
		self.base.dispatch_core(CoreAction::CloseDocument {
			document_id: document_id.clone(),
		});
	}
}

/// Must deliver a change to every module before any change dispatched from
/// one of its hooks.
///
/// - Enforced in: `HookQueue::deliver`
/// - Failure symptom: A later module sees `closed` before `loaded` for the
///   same document and ends up tracking a document that no longer exists.
#[test]
fn test_hook_dispatches_are_delivered_after_the_current_change() {
	let log = new_log();
	let registry = ModuleRegistry::builder()
		.register(recorder(ModuleManifest::new("tracker").requires("closer"), &log))
		.register(ModulePackage::new(ModuleManifest::new("closer"), |base: ModuleBase, _config: Value| Ok(Closer { base })))
		.build()
		.expect("registry builds");
	let store = registry.store();
	store.dispatch(open("d1"));
	take(&log);

	store.dispatch(CoreAction::SetDocumentLoaded {
		document_id: DocumentId::new("d1"),
		document: Arc::new(FakeDoc),
	});

	assert_eq!(
		take(&log),
		vec!["tracker:loaded d1", "tracker:active -->d1", "tracker:closed d1", "tracker:active d1->-"]
	);
	assert!(store.core().document("d1").is_none());
}
