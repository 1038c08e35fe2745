//! Module registry and module base contract.
//!
//! # Purpose
//!
//! * Turns module packages (manifest, factory, optional state region) into
//!   wired instances sharing one [`Store`](folio_store::Store).
//! * Gives every module a [`ModuleBase`]: scoped state access, dispatch,
//!   logging, dependency lookup and teardown bookkeeping.
//! * Drives lifecycle hooks from core-region diffs so modules keep
//!   per-document bookkeeping in lockstep without their own diffing.
//!
//! # Mental model
//!
//! * A manifest names what a module `provides` and what it `requires`
//!   (hard) or uses if present (`optional`).
//! * The registry orders modules so dependencies come first, then builds them
//!   in that order. A factory can already see the capabilities of every
//!   dependency.
//! * A capability is an untyped `Arc<dyn Any>`, narrowed at the call site.
//!
//! # Key types
//!
//! | Type | Meaning | Constraints | Constructed / mutated in |
//! |---|---|---|---|
//! | [`ModuleManifest`] | Static id, provides, requires, defaults | Ids unique; `requires` acyclic | host code |
//! | [`ModulePackage`] | Manifest + factory + reducer | Factory runs exactly once | host code |
//! | [`Module`] | Instance contract and hooks | `destroy` overrides call `teardown` | module crates |
//! | [`ModuleBase`] | Shared module plumbing | Dispatch is scoped to own region | [`ModuleRegistryBuilder::build`] |
//! | [`ModuleRegistry`] | Wired instances + store | Never exposed partially built | [`ModuleRegistryBuilder::build`] |
//! | [`RegistryConfig`] | Host config per module id | Deep-merged over defaults | host code / TOML |
//!
//! # Invariants
//!
//! * Must construct a module only after all of its resolved dependencies.
//! * Must break ordering ties by registration order.
//! * Must not return a registry when any construction or initialization fails.
//! * Must destroy modules in reverse dependency order.
//! * Must run lifecycle hooks in dependency order, closes before loads.
//! * Must deliver a change to every module before any change dispatched from
//!   one of its hooks.
//!
//! # Lifecycle
//!
//! 1. [`ModuleRegistry::builder`], then `register` each package.
//! 2. `build`: resolve, merge config, construct bottom-up, build capabilities,
//!    initialize bottom-up, attach lifecycle hooks.
//! 3. Host obtains capabilities with [`ModuleRegistry::capability`].
//! 4. [`ModuleRegistry::destroy`] awaits each module's `destroy`, last built
//!    first.
//!
//! # Failure modes & recovery
//!
//! * Duplicate id, missing hard dependency, cycle, bad config, factory error,
//!   initialize error: fatal [`RegistryError`]; modules built so far are torn
//!   down.
//! * Capability misuse at runtime: [`ModuleError::UnknownDocument`], returned
//!   synchronously to the caller.

/// Module base plumbing.
pub mod base;
/// Host configuration and JSON deep merge.
pub mod config;
/// Registry and module errors.
pub mod error;
/// Lifecycle diffing.
pub mod lifecycle;
/// Module manifests.
pub mod manifest;
/// Module contract.
pub mod module;
/// Module packages.
pub mod package;
/// The registry and its builder.
pub mod registry;

pub use base::ModuleBase;
pub use config::RegistryConfig;
pub use error::{ModuleError, RegistryError};
pub use lifecycle::{LifecycleEvent, diff_core};
pub use manifest::ModuleManifest;
pub use module::{Capability, Module};
pub use package::ModulePackage;
pub use registry::{ModuleRegistry, ModuleRegistryBuilder};

#[cfg(test)]
mod invariants;
