//! Injected logging contract.
//!
//! Every module logs through a [`Logger`] handed to it by the registry, tagging
//! messages with its own id as `source`. The default [`TracingLogger`] forwards
//! to `tracing` with `source` and `category` as structured fields.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ModuleId;

/// Severity of a log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Debug,
	Info,
	Warn,
	Error,
}

/// Boundary marker for performance spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerfPhase {
	Start,
	End,
}

impl PerfPhase {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Start => "start",
			Self::End => "end",
		}
	}
}

/// Logger injected into the registry and shared by every module.
pub trait Logger: Send + Sync {
	/// Returns true if messages at `level` would be recorded.
	fn is_enabled(&self, level: LogLevel) -> bool;

	/// Records one message.
	fn log(&self, level: LogLevel, source: &str, category: &str, args: fmt::Arguments<'_>);

	/// Records a performance span boundary.
	fn perf(&self, source: &str, category: &str, event: &str, phase: PerfPhase, args: fmt::Arguments<'_>);

	fn debug(&self, source: &str, category: &str, args: fmt::Arguments<'_>) {
		if self.is_enabled(LogLevel::Debug) {
			self.log(LogLevel::Debug, source, category, args);
		}
	}

	fn info(&self, source: &str, category: &str, args: fmt::Arguments<'_>) {
		if self.is_enabled(LogLevel::Info) {
			self.log(LogLevel::Info, source, category, args);
		}
	}

	fn warn(&self, source: &str, category: &str, args: fmt::Arguments<'_>) {
		if self.is_enabled(LogLevel::Warn) {
			self.log(LogLevel::Warn, source, category, args);
		}
	}

	fn error(&self, source: &str, category: &str, args: fmt::Arguments<'_>) {
		if self.is_enabled(LogLevel::Error) {
			self.log(LogLevel::Error, source, category, args);
		}
	}
}

/// Forwards to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
	fn is_enabled(&self, level: LogLevel) -> bool {
		match level {
			LogLevel::Debug => tracing::enabled!(tracing::Level::DEBUG),
			LogLevel::Info => tracing::enabled!(tracing::Level::INFO),
			LogLevel::Warn => tracing::enabled!(tracing::Level::WARN),
			LogLevel::Error => tracing::enabled!(tracing::Level::ERROR),
		}
	}

	fn log(&self, level: LogLevel, source: &str, category: &str, args: fmt::Arguments<'_>) {
		match level {
			LogLevel::Debug => tracing::debug!(source, category, "{args}"),
			LogLevel::Info => tracing::info!(source, category, "{args}"),
			LogLevel::Warn => tracing::warn!(source, category, "{args}"),
			LogLevel::Error => tracing::error!(source, category, "{args}"),
		}
	}

	fn perf(&self, source: &str, category: &str, event: &str, phase: PerfPhase, args: fmt::Arguments<'_>) {
		tracing::trace!(source, category, event, phase = phase.as_str(), "{args}");
	}
}

/// Discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
	fn is_enabled(&self, _level: LogLevel) -> bool {
		false
	}

	fn log(&self, _level: LogLevel, _source: &str, _category: &str, _args: fmt::Arguments<'_>) {}

	fn perf(&self, _source: &str, _category: &str, _event: &str, _phase: PerfPhase, _args: fmt::Arguments<'_>) {}
}

/// A [`Logger`] bound to one module id, used as `source` for every message.
#[derive(Clone)]
pub struct ModuleLogger {
	source: ModuleId,
	inner: Arc<dyn Logger>,
}

impl fmt::Debug for ModuleLogger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ModuleLogger").field("source", &self.source).finish_non_exhaustive()
	}
}

impl ModuleLogger {
	pub fn new(source: ModuleId, inner: Arc<dyn Logger>) -> Self {
		Self { source, inner }
	}

	pub fn source(&self) -> &ModuleId {
		&self.source
	}

	pub fn is_enabled(&self, level: LogLevel) -> bool {
		self.inner.is_enabled(level)
	}

	pub fn debug(&self, category: &str, args: fmt::Arguments<'_>) {
		self.inner.debug(self.source.as_str(), category, args);
	}

	pub fn info(&self, category: &str, args: fmt::Arguments<'_>) {
		self.inner.info(self.source.as_str(), category, args);
	}

	pub fn warn(&self, category: &str, args: fmt::Arguments<'_>) {
		self.inner.warn(self.source.as_str(), category, args);
	}

	pub fn error(&self, category: &str, args: fmt::Arguments<'_>) {
		self.inner.error(self.source.as_str(), category, args);
	}

	pub fn perf(&self, category: &str, event: &str, phase: PerfPhase, args: fmt::Arguments<'_>) {
		self.inner.perf(self.source.as_str(), category, event, phase, args);
	}
}
