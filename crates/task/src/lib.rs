//! Single-settlement asynchronous results.
//!
//! A [`Task`] starts pending and settles exactly once: resolved with a value,
//! failed with an error, or aborted by a consumer. While pending it may report
//! progress. Every operation that talks to the document engine returns one.
//!
//! ```text
//!            emit_progress(p)*
//!          ┌────────────────┐
//!          ▼                │
//!      ┌─────────┐──────────┘
//!      │ Pending │──resolve(v)──► Resolved(v)
//!      └─────────┘──fail(e)─────► Failed(e)
//!                 └─abort(r)────► Aborted(r)   (+ producer abort hooks, abort signal)
//! ```
//!
//! Settlement callbacks registered after settlement fire immediately with the
//! original outcome. Progress listeners see only future events. Late calls to
//! `resolve`, `fail` or `abort` are no-ops that return `false`.

mod combinators;
mod error;
mod future;
mod task;

pub use combinators::CompletionProgress;
pub use error::{AbortReason, TaskError, TaskResult};
pub use task::{Task, TaskStage};

#[cfg(test)]
mod tests;
