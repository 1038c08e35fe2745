use std::any::Any;
use std::fmt;
use std::sync::Arc;

use folio_store::{Action, ModuleReducer};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Module, ModuleBase, ModuleError, ModuleManifest};

pub(crate) enum FactoryError {
	Config(serde_json::Error),
	Module(ModuleError),
}

/// The constructed module, as a trait object and as `Any` for typed lookup.
pub(crate) struct Built {
	pub(crate) module: Arc<dyn Module>,
	pub(crate) concrete: Arc<dyn Any + Send + Sync>,
}

type Factory = Box<dyn FnOnce(ModuleBase, Value) -> Result<Built, FactoryError> + Send>;

/// Everything the registry needs to build one module: manifest, factory,
/// and optionally a state region with its reducer.
pub struct ModulePackage {
	pub(crate) manifest: ModuleManifest,
	pub(crate) factory: Factory,
	pub(crate) reducer: Option<ModuleReducer>,
	pub(crate) config: Value,
}

impl ModulePackage {
	/// `factory` receives the module's base and its merged config,
	/// deserialized into `C`.
	pub fn new<M, C, F>(manifest: ModuleManifest, factory: F) -> Self
	where
		M: Module,
		C: DeserializeOwned + 'static,
		F: FnOnce(ModuleBase, C) -> Result<M, ModuleError> + Send + 'static,
	{
		Self {
			manifest,
			factory: Box::new(move |base, config| {
				let config = serde_json::from_value::<C>(config).map_err(FactoryError::Config)?;
				let module = Arc::new(factory(base, config).map_err(FactoryError::Module)?);
				Ok(Built {
					module: Arc::clone(&module) as Arc<dyn Module>,
					concrete: module,
				})
			}),
			reducer: None,
			config: Value::Null,
		}
	}

	/// Gives the module a state region under its id.
	#[must_use]
	pub fn with_state<S, R>(mut self, initial: S, reducer: R) -> Self
	where
		S: Serialize + Send + Sync + 'static,
		R: Fn(&S, &Action) -> Option<S> + Send + Sync + 'static,
	{
		self.reducer = Some(ModuleReducer::new(initial, reducer));
		self
	}

	/// Package-level config, layered over the manifest defaults.
	#[must_use]
	pub fn with_config(mut self, config: Value) -> Self {
		self.config = config;
		self
	}

	pub fn manifest(&self) -> &ModuleManifest {
		&self.manifest
	}
}

impl fmt::Debug for ModulePackage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModulePackage")
			.field("id", &self.manifest.id)
			.field("stateful", &self.reducer.is_some())
			.finish_non_exhaustive()
	}
}
