use std::any::Any;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use folio_events::Subscription;
use folio_primitives::{Logger, ModuleId, ModuleLogger, TracingLogger};
use folio_store::{CoreState, Store};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::config::{RegistryConfig, effective};
use crate::lifecycle::HookQueue;
use crate::package::{Built, FactoryError};
use crate::{Capability, Module, ModuleBase, ModuleManifest, ModulePackage, RegistryError};

struct Entry {
	manifest: ModuleManifest,
	built: Built,
	capability: Capability,
}

/// Wired module instances plus the store they share.
///
/// Only obtainable from [`ModuleRegistryBuilder::build`], which either
/// returns a fully constructed and initialized registry or an error.
pub struct ModuleRegistry {
	store: Arc<Store>,
	/// In dependency order.
	entries: RwLock<IndexMap<ModuleId, Entry>>,
	/// Capability name to providing module.
	provided: FxHashMap<String, ModuleId>,
	lifecycle: Mutex<Option<Subscription>>,
	hooks: HookQueue,
	destroyed: AtomicBool,
}

impl ModuleRegistry {
	pub fn builder() -> ModuleRegistryBuilder {
		ModuleRegistryBuilder::new()
	}

	pub fn store(&self) -> &Arc<Store> {
		&self.store
	}

	pub fn get_module(&self, id: &str) -> Option<Arc<dyn Module>> {
		self.entries.read().get(id).map(|entry| Arc::clone(&entry.built.module))
	}

	/// The module instance of `id`, as its concrete type.
	pub fn module<M: Module>(&self, id: &str) -> Option<Arc<M>> {
		let concrete = self.entries.read().get(id).map(|entry| Arc::clone(&entry.built.concrete))?;
		concrete.downcast::<M>().ok()
	}

	/// The untyped capability of a module id or provided capability name.
	pub fn provides(&self, name: &str) -> Option<Capability> {
		let entries = self.entries.read();
		let entry = match entries.get(name) {
			Some(entry) => entry,
			None => entries.get(self.provided.get(name)?)?,
		};
		Some(Arc::clone(&entry.capability))
	}

	/// The capability of `name`, narrowed to `C`.
	pub fn capability<C: Any + Send + Sync>(&self, name: &str) -> Option<Arc<C>> {
		self.provides(name)?.downcast::<C>().ok()
	}

	pub fn manifest(&self, id: &str) -> Option<ModuleManifest> {
		self.entries.read().get(id).map(|entry| entry.manifest.clone())
	}

	/// Module ids in dependency order.
	pub fn module_ids(&self) -> Vec<ModuleId> {
		self.entries.read().keys().cloned().collect()
	}

	pub fn is_destroyed(&self) -> bool {
		self.destroyed.load(Ordering::Acquire)
	}

	fn modules(&self) -> Vec<Arc<dyn Module>> {
		self.entries.read().values().map(|entry| Arc::clone(&entry.built.module)).collect()
	}

	/// Destroys every module in reverse dependency order, awaiting each.
	///
	/// Later calls are no-ops.
	pub async fn destroy(&self) {
		if self.destroyed.swap(true, Ordering::AcqRel) {
			return;
		}
		let lifecycle = self.lifecycle.lock().take();
		if let Some(sub) = lifecycle {
			sub.unsubscribe();
		}
		let modules = self.modules();
		for module in modules.iter().rev() {
			module.destroy().await;
			tracing::debug!(module = %module.base().id(), "registry.destroy");
		}
		self.entries.write().clear();
		self.store.clear_listeners();
	}

	/// Synchronous teardown after a failed build.
	fn abandon(&self) {
		self.destroyed.store(true, Ordering::Release);
		for module in self.modules().iter().rev() {
			module.base().teardown();
		}
		self.entries.write().clear();
		self.store.clear_listeners();
	}
}

impl fmt::Debug for ModuleRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModuleRegistry")
			.field("modules", &self.module_ids())
			.field("destroyed", &self.is_destroyed())
			.finish_non_exhaustive()
	}
}

/// Collects packages and host settings, then builds a [`ModuleRegistry`].
pub struct ModuleRegistryBuilder {
	packages: Vec<ModulePackage>,
	config: RegistryConfig,
	logger: Arc<dyn Logger>,
	core: Option<CoreState>,
}

impl Default for ModuleRegistryBuilder {
	fn default() -> Self {
		Self {
			packages: Vec::new(),
			config: RegistryConfig::default(),
			logger: Arc::new(TracingLogger),
			core: None,
		}
	}
}

impl ModuleRegistryBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn register(mut self, package: ModulePackage) -> Self {
		self.packages.push(package);
		self
	}

	#[must_use]
	pub fn register_all(mut self, packages: impl IntoIterator<Item = ModulePackage>) -> Self {
		self.packages.extend(packages);
		self
	}

	#[must_use]
	pub fn config(mut self, config: RegistryConfig) -> Self {
		self.config = config;
		self
	}

	#[must_use]
	pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
		self.logger = logger;
		self
	}

	/// Starts from a restored core region, normalized by
	/// [`CoreState::restored`]. Engine handles are not restorable, so loaded
	/// documents come back in the error state.
	#[must_use]
	pub fn initial_state(mut self, core: CoreState) -> Self {
		self.core = Some(core);
		self
	}

	/// Resolves the dependency graph, constructs every module bottom-up, then
	/// initializes them in the same order.
	///
	/// Any failure tears down what was built and returns the error.
	pub fn build(self) -> Result<Arc<ModuleRegistry>, RegistryError> {
		let Self {
			packages,
			config,
			logger,
			core,
		} = self;
		let manifests: Vec<&ModuleManifest> = packages.iter().map(|package| &package.manifest).collect();
		let plan = plan(&manifests)?;

		let mut store = Store::builder().core_state(core.map(CoreState::restored).unwrap_or_default());
		for &index in &plan.order {
			let package = &packages[index];
			if let Some(reducer) = &package.reducer {
				store = store.module(package.manifest.id.clone(), reducer.clone());
			}
		}
		let store = Arc::new(store.build());

		let registry = Arc::new(ModuleRegistry {
			store: Arc::clone(&store),
			entries: RwLock::new(IndexMap::with_capacity(packages.len())),
			provided: plan.provided,
			lifecycle: Mutex::new(None),
			hooks: HookQueue::default(),
			destroyed: AtomicBool::new(false),
		});

		let mut slots: Vec<Option<ModulePackage>> = packages.into_iter().map(Some).collect();
		for index in plan.order {
			let Some(package) = slots[index].take() else {
				continue;
			};
			let ModulePackage {
				manifest,
				factory,
				config: package_config,
				..
			} = package;
			let id = manifest.id.clone();
			let merged = effective(&manifest.default_config, &package_config, config.section(id.as_str()));
			let base = ModuleBase::new(id.clone(), Arc::downgrade(&registry), Arc::clone(&store), ModuleLogger::new(id.clone(), Arc::clone(&logger)));
			let built = match factory(base, merged) {
				Ok(built) => built,
				Err(err) => {
					tracing::warn!(module = %id, "registry.construct_failed");
					registry.abandon();
					return Err(match err {
						FactoryError::Config(source) => RegistryError::InvalidConfig { module: id, source },
						FactoryError::Module(source) => RegistryError::Construction { module: id, source },
					});
				}
			};
			let capability = built.module.build_capability();
			tracing::debug!(module = %id, "registry.construct");
			registry.entries.write().insert(id, Entry { manifest, built, capability });
		}

		for module in registry.modules() {
			if let Err(source) = module.initialize() {
				let module = module.base().id().clone();
				tracing::warn!(module = %module, "registry.initialize_failed");
				registry.abandon();
				return Err(RegistryError::Initialization { module, source });
			}
		}

		let weak = Arc::downgrade(&registry);
		let sub = store.subscribe(move |change| {
			if let Some(registry) = weak.upgrade() {
				registry.hooks.deliver(change, || registry.modules());
			}
		});
		*registry.lifecycle.lock() = Some(sub);
		tracing::info!(modules = registry.entries.read().len(), "registry.ready");
		Ok(registry)
	}
}

impl fmt::Debug for ModuleRegistryBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModuleRegistryBuilder").field("packages", &self.packages).finish_non_exhaustive()
	}
}

/// Construction order plus the capability-name index.
#[derive(Debug)]
pub(crate) struct Plan {
	pub(crate) order: Vec<usize>,
	pub(crate) provided: FxHashMap<String, ModuleId>,
}

/// Orders manifests so every dependency precedes its dependents.
///
/// Kahn's algorithm; among ready modules the earliest registered goes first.
/// Only `requires` cycles are fatal. Optional edges are added in registration
/// order, skipping any that would close a cycle.
pub(crate) fn plan(manifests: &[&ModuleManifest]) -> Result<Plan, RegistryError> {
	let mut ids: FxHashMap<&str, usize> = FxHashMap::default();
	for (index, manifest) in manifests.iter().enumerate() {
		if ids.insert(manifest.id.as_str(), index).is_some() {
			return Err(RegistryError::DuplicateModule(manifest.id.clone()));
		}
	}

	let mut provided: FxHashMap<String, ModuleId> = FxHashMap::default();
	for manifest in manifests {
		for name in &manifest.provides {
			if !ids.contains_key(name.as_str()) {
				provided.entry(name.clone()).or_insert_with(|| manifest.id.clone());
			}
		}
	}
	let lookup = |name: &str| -> Option<usize> { ids.get(name).copied().or_else(|| provided.get(name).and_then(|id| ids.get(id.as_str()).copied())) };

	let mut deps: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); manifests.len()];
	for (index, manifest) in manifests.iter().enumerate() {
		for name in &manifest.requires {
			let dep = lookup(name).ok_or_else(|| RegistryError::MissingDependency {
				module: manifest.id.clone(),
				dependency: name.clone(),
			})?;
			deps[index].insert(dep);
		}
	}
	let cycle = |stuck: Vec<usize>| RegistryError::DependencyCycle {
		modules: stuck.into_iter().map(|index| manifests[index].id.clone()).collect(),
	};
	topological(&deps).map_err(cycle)?;

	// Optional edges only order modules; one that would close a cycle is dropped.
	for (index, manifest) in manifests.iter().enumerate() {
		for name in &manifest.optional {
			let Some(dep) = lookup(name) else {
				continue;
			};
			if dep == index || reaches(&deps, dep, index) {
				tracing::debug!(module = %manifest.id, dependency = %name, "registry.optional_cycle_skipped");
				continue;
			}
			deps[index].insert(dep);
		}
	}
	let order = topological(&deps).map_err(cycle)?;
	Ok(Plan { order, provided })
}

/// Kahn's algorithm with ties broken by index. On a cycle, returns the
/// indices that never became ready.
fn topological(deps: &[BTreeSet<usize>]) -> Result<Vec<usize>, Vec<usize>> {
	let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); deps.len()];
	let mut pending: Vec<usize> = deps.iter().map(BTreeSet::len).collect();
	for (index, set) in deps.iter().enumerate() {
		for &dep in set {
			dependents[dep].push(index);
		}
	}

	let mut ready: BTreeSet<usize> = (0..deps.len()).filter(|&index| pending[index] == 0).collect();
	let mut order = Vec::with_capacity(deps.len());
	while let Some(index) = ready.pop_first() {
		order.push(index);
		for &dependent in &dependents[index] {
			pending[dependent] -= 1;
			if pending[dependent] == 0 {
				ready.insert(dependent);
			}
		}
	}

	if order.len() < deps.len() {
		return Err((0..deps.len()).filter(|&index| pending[index] > 0).collect());
	}
	Ok(order)
}

/// Whether `from` depends on `to`, directly or transitively.
fn reaches(deps: &[BTreeSet<usize>], from: usize, to: usize) -> bool {
	let mut seen = vec![false; deps.len()];
	let mut stack = vec![from];
	while let Some(index) = stack.pop() {
		if index == to {
			return true;
		}
		if !std::mem::replace(&mut seen[index], true) {
			stack.extend(deps[index].iter().copied());
		}
	}
	false
}
