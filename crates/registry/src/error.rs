use folio_primitives::{DocumentId, ModuleId};
use thiserror::Error;

/// Fatal errors raised while building a registry.
///
/// None of these are recovered: the registry is never handed out when one
/// occurs.
#[derive(Debug, Error)]
pub enum RegistryError {
	#[error("module `{0}` is registered twice")]
	DuplicateModule(ModuleId),

	#[error("module `{module}` requires `{dependency}`, which is not registered")]
	MissingDependency { module: ModuleId, dependency: String },

	#[error("dependency cycle between modules: {}", join(.modules))]
	DependencyCycle { modules: Vec<ModuleId> },

	#[error("invalid config for module `{module}`: {source}")]
	InvalidConfig {
		module: ModuleId,
		#[source]
		source: serde_json::Error,
	},

	#[error("module `{module}` failed to construct: {source}")]
	Construction {
		module: ModuleId,
		#[source]
		source: ModuleError,
	},

	#[error("module `{module}` failed to initialize: {source}")]
	Initialization {
		module: ModuleId,
		#[source]
		source: ModuleError,
	},

	#[error("registry config parse error: {0}")]
	ConfigParse(#[from] toml::de::Error),
}

/// Errors raised by module code at call time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
	/// The caller named a document the module has no state for. This is a
	/// caller bug and is reported synchronously.
	#[error("document `{document_id}` is not known to module `{module}`")]
	UnknownDocument { document_id: DocumentId, module: ModuleId },

	#[error("module `{module}` needs capability `{capability}`, which is unavailable")]
	MissingCapability { module: ModuleId, capability: String },

	#[error("module `{module}` has no state region of the expected type")]
	StateMismatch { module: ModuleId },

	#[error("{0}")]
	Message(String),
}

impl ModuleError {
	pub fn message(message: impl Into<String>) -> Self {
		Self::Message(message.into())
	}
}

fn join(modules: &[ModuleId]) -> String {
	modules.iter().map(ModuleId::as_str).collect::<Vec<_>>().join(", ")
}
