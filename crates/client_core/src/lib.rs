//! Client-side synchronization core for the audit workflow.
//!
//! Server state is mirrored into a single [`Store`]. Writes and fetches go
//! through four-phase [`SubmitAction`]s, per-role [`PollScheduler`]s keep the
//! mirror fresh behind [`SyncGate`]s, and the [`Coordinator`] starts and stops
//! them as the session changes.

pub mod action;
pub mod api;
pub mod asm;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod poll;
pub mod store;
pub mod submit;
pub mod transport;
pub mod wizard;

#[cfg(test)]
#[path = "tests/test_utils.rs"]
pub(crate) mod test_utils;

pub use action::{Action, ActionType, Operation, Phase};
pub use api::AuditApi;
pub use asm::AsmRegistry;
pub use config::{load_settings, ClientSettings};
pub use coordinator::{Coordinator, CoordinatorHandle};
pub use error::{InvariantError, SyncError, TransportError};
pub use gate::SyncGate;
pub use poll::PollScheduler;
pub use store::{AppState, Store, SyncSnapshot};
pub use submit::{SubmitAction, SubmitOutcome, Submission, SyncClient};
pub use transport::{HttpTransport, Transport};
pub use wizard::{AuditWizardStage, DosSetupStage, StageTable, Viewport, WizardStageMachine};
