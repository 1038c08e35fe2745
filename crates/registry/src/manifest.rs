use folio_primitives::ModuleId;
use serde::{Deserialize, Serialize};

/// Static description of a module package.
///
/// `requires` and `optional` entries name either a module id or a capability
/// listed in another manifest's `provides`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleManifest {
	pub id: ModuleId,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub version: Option<String>,
	#[serde(default)]
	pub provides: Vec<String>,
	#[serde(default)]
	pub requires: Vec<String>,
	#[serde(default)]
	pub optional: Vec<String>,
	#[serde(default)]
	pub default_config: serde_json::Value,
}

impl ModuleManifest {
	pub fn new(id: impl Into<ModuleId>) -> Self {
		Self {
			id: id.into(),
			name: None,
			version: None,
			provides: Vec::new(),
			requires: Vec::new(),
			optional: Vec::new(),
			default_config: serde_json::Value::Null,
		}
	}

	#[must_use]
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	#[must_use]
	pub fn version(mut self, version: impl Into<String>) -> Self {
		self.version = Some(version.into());
		self
	}

	#[must_use]
	pub fn provides(mut self, capability: impl Into<String>) -> Self {
		self.provides.push(capability.into());
		self
	}

	#[must_use]
	pub fn requires(mut self, dependency: impl Into<String>) -> Self {
		self.requires.push(dependency.into());
		self
	}

	#[must_use]
	pub fn optional(mut self, dependency: impl Into<String>) -> Self {
		self.optional.push(dependency.into());
		self
	}

	#[must_use]
	pub fn default_config(mut self, config: serde_json::Value) -> Self {
		self.default_config = config;
		self
	}
}
