//! Document lifecycle owned by the core reducer.
//!
//! ```text
//!  absent ──StartLoading──► loading ──SetLoaded──► loaded
//!                              │  ▲
//!                     SetError │  │ RetryLoading
//!                              ▼  │
//!                             error
//!  loading | loaded | error ──CloseDocument──► absent
//! ```
//!
//! Each transition is driven by exactly one [`CoreAction`]. Only
//! [`core_reducer`] mutates `documents`, `document_order` and
//! `active_document_id`.

mod action;
mod reducer;
mod state;

pub use action::{CoreAction, kinds};
pub use reducer::{core_reducer, select_after_removal};
pub use state::{CoreState, DocumentState, DocumentStatus};
