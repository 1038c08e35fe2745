//! Core types shared by every folio crate: identifiers, engine document
//! handles, structured document errors and the injected logger.

/// Engine document handles and structured load errors.
pub mod document;
/// Identifier types for documents and modules.
pub mod ids;
/// Injected logger contract and its tracing-backed default.
pub mod log;
/// Page rotation.
pub mod rotation;

pub use document::{DocumentError, DocumentErrorCode, DocumentHandle, EngineDocument};
pub use ids::{DocumentId, ModuleId};
pub use log::{LogLevel, Logger, ModuleLogger, NoopLogger, PerfPhase, TracingLogger};
pub use rotation::{InvalidRotation, Rotation};
