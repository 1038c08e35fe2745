use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde_json::Value;

use crate::RegistryError;

/// Host-supplied module configuration, keyed by module id.
///
/// ```toml
/// [modules.document-manager]
/// max_documents = 4
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryConfig {
	#[serde(default)]
	modules: FxHashMap<String, Value>,
}

impl RegistryConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_toml_str(input: &str) -> Result<Self, RegistryError> {
		Ok(toml::from_str(input)?)
	}

	/// Sets (or deep-merges into) the section for `module`.
	#[must_use]
	pub fn module(mut self, module: impl Into<String>, config: Value) -> Self {
		let slot = self.modules.entry(module.into()).or_insert(Value::Null);
		merge(slot, config);
		self
	}

	pub fn section(&self, module: &str) -> Option<&Value> {
		self.modules.get(module)
	}
}

/// Deep-merges `overlay` into `base`.
///
/// Objects merge key by key; any other overlay value replaces the base
/// value. A `null` overlay leaves the base untouched.
pub fn merge(base: &mut Value, overlay: Value) {
	match (base, overlay) {
		(_, Value::Null) => {}
		(Value::Object(base), Value::Object(overlay)) => {
			for (key, value) in overlay {
				merge(base.entry(key).or_insert(Value::Null), value);
			}
		}
		(base, overlay) => *base = overlay,
	}
}

/// Effective config: defaults, then package config, then host config.
pub(crate) fn effective(defaults: &Value, package: &Value, host: Option<&Value>) -> Value {
	let mut config = defaults.clone();
	merge(&mut config, package.clone());
	if let Some(host) = host {
		merge(&mut config, host.clone());
	}
	if config.is_null() {
		config = Value::Object(serde_json::Map::new());
	}
	config
}
