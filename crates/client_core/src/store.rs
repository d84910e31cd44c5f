//! Process-wide client store.
//!
//! All mutation goes through [`Store::dispatch`], which applies [`reduce`] and
//! then broadcasts the action to listeners. Readers get owned snapshots.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{
    asm::{AsmRole, AsmState},
    domain::{ActorRole, AuditBoardMember, ContestId, CountyId, CvrId, Dashboard, ElectionType},
    protocol::{
        AsmStateResponse, AuditBoardSignInRequest, ContestSummary,
        CountyDashboardRefreshResponse, CountyStatus, DosDashboardRefreshResponse, LoginResponse,
        RoundSummary,
    },
};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, warn};

use crate::{
    action::{Action, Operation},
    asm::AsmRegistry,
    error::{InvariantError, SyncError},
};

const ACTION_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct Session {
    pub logged_in: bool,
    pub dashboard: Option<Dashboard>,
    pub active_role: Option<ActorRole>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CountyView {
    pub id: Option<CountyId>,
    pub general_information: BTreeMap<String, String>,
    pub audit_board: Vec<AuditBoardMember>,
    /// Members from the last sign-in request, adopted once the server accepts it.
    pub pending_audit_board: Option<Vec<AuditBoardMember>>,
    pub contest_ids: Vec<ContestId>,
    pub contests: Vec<ContestSummary>,
    pub contests_under_audit: BTreeMap<String, String>,
    pub ballot_manifest: Option<UploadedFile>,
    pub cvr_export: Option<UploadedFile>,
    pub estimated_ballots_to_audit: Option<u32>,
    pub ballots_remaining_in_round: Option<u32>,
    pub audited_ballot_count: Option<u32>,
    pub ballot_under_audit: Option<CvrId>,
    pub current_round: Option<RoundSummary>,
    pub rounds: Vec<RoundSummary>,
    pub county_ui_events: Vec<String>,
    pub audit_board_ui_events: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DosView {
    pub risk_limit: Option<f64>,
    pub election_type: Option<ElectionType>,
    pub election_date: Option<DateTime<Utc>>,
    pub seed: Option<String>,
    pub county_status: BTreeMap<String, CountyStatus>,
    pub audited_contests: BTreeMap<String, String>,
    pub contests: Vec<ContestSummary>,
    pub ui_events: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub session: Session,
    pub asm: AsmRegistry,
    pub county: CountyView,
    pub dos: DosView,
    /// Outstanding invocations per operation.
    pub in_flight: BTreeMap<Operation, usize>,
    pub sync_errors: BTreeMap<Operation, SyncError>,
    pub faults: BTreeMap<Operation, InvariantError>,
}

/// The read-only projection consulted by sync gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub logged_in: bool,
    pub dashboard: Option<Dashboard>,
    pub active_role: Option<ActorRole>,
    pub county_id: Option<CountyId>,
    pub asm: BTreeMap<AsmRole, AsmState>,
}

impl SyncSnapshot {
    pub fn asm_state(&self, role: AsmRole) -> AsmState {
        self.asm.get(&role).copied().unwrap_or(role.initial())
    }
}

impl AppState {
    pub fn scope(&self, role: AsmRole) -> Option<CountyId> {
        match role {
            AsmRole::County | AsmRole::AuditBoard => self.county.id,
            AsmRole::Dos => None,
        }
    }

    pub fn asm_state(&self, role: AsmRole) -> AsmState {
        self.asm.state(role, self.scope(role))
    }

    pub fn sync_snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            logged_in: self.session.logged_in,
            dashboard: self.session.dashboard,
            active_role: self.session.active_role,
            county_id: self.county.id,
            asm: AsmRole::ALL
                .into_iter()
                .map(|role| (role, self.asm_state(role)))
                .collect(),
        }
    }

    pub fn is_in_flight(&self, operation: Operation) -> bool {
        self.in_flight.contains_key(&operation)
    }

    /// First invariant fault affecting a dashboard's view.
    pub fn view_fault(&self, dashboard: Dashboard) -> Option<&InvariantError> {
        self.faults
            .iter()
            .find(|(operation, _)| operation.view() == Some(dashboard))
            .map(|(_, fault)| fault)
    }

    fn reset(&mut self) {
        self.session = Session::default();
        self.asm.clear();
        self.county = CountyView::default();
        self.dos = DosView::default();
        self.sync_errors.clear();
        self.faults.clear();
    }
}

pub fn reduce(state: &mut AppState, action: &Action) {
    match action {
        Action::Send { operation, payload } => {
            *state.in_flight.entry(*operation).or_default() += 1;
            if *operation == Operation::AuditBoardSignIn {
                state.county.pending_audit_board =
                    serde_json::from_value::<AuditBoardSignInRequest>(payload.clone())
                        .ok()
                        .map(|req| req.members);
            }
        }
        Action::Ok { operation, data } => {
            settle(state, *operation);
            match apply_ok(state, *operation, data) {
                Ok(()) => {
                    state.sync_errors.remove(operation);
                    state.faults.remove(operation);
                }
                Err(fault) => {
                    error!(%operation, %fault, "rejected server response");
                    state.faults.insert(*operation, fault);
                }
            }
        }
        Action::Fail { operation, error } => {
            settle(state, *operation);
            state
                .sync_errors
                .insert(*operation, SyncError::Application(error.clone()));
        }
        Action::NetworkFail { operation, error } => {
            settle(state, *operation);
            state
                .sync_errors
                .insert(*operation, SyncError::Transport(error.clone()));
        }
        Action::SelectDashboard(dashboard) => {
            state.session.dashboard = Some(*dashboard);
            state.session.active_role = dashboard.roles().first().copied();
        }
        Action::Logout => state.reset(),
        Action::PollStart(_) | Action::PollStop(_) | Action::BoardSignInSync => {}
    }
}

fn settle(state: &mut AppState, operation: Operation) {
    if let Some(count) = state.in_flight.get_mut(&operation) {
        *count -= 1;
        if *count == 0 {
            state.in_flight.remove(&operation);
        }
    }
}

fn parse<T: DeserializeOwned>(operation: Operation, data: &Value) -> Result<T, InvariantError> {
    serde_json::from_value(data.clone()).map_err(|err| InvariantError::MalformedBody {
        operation,
        reason: err.to_string(),
    })
}

fn parse_optional_state(
    role: AsmRole,
    value: Option<&str>,
) -> Result<Option<AsmState>, InvariantError> {
    value
        .map(|raw| role.parse_state(raw))
        .transpose()
        .map_err(InvariantError::from)
}

/// Applies a successful response. Everything is parsed before anything is
/// written so a bad body leaves the previous data intact.
fn apply_ok(state: &mut AppState, operation: Operation, data: &Value) -> Result<(), InvariantError> {
    match operation {
        Operation::Login => {
            let res: LoginResponse = parse(operation, data)?;
            state.session.logged_in = true;
            state.session.dashboard = Some(res.role);
            state.session.active_role = res.role.roles().first().copied();
            if res.county_id.is_some() {
                state.county.id = res.county_id;
            }
        }
        Operation::CountyDashboardRefresh => {
            let res: CountyDashboardRefreshResponse = parse(operation, data)?;
            let county_state = parse_optional_state(AsmRole::County, res.asm_state.as_deref())?;
            let board_state =
                parse_optional_state(AsmRole::AuditBoard, res.audit_board_asm_state.as_deref())?;

            let view = &mut state.county;
            view.id = Some(res.id);
            view.general_information = res.general_information;
            view.audit_board = res.audit_board.unwrap_or_default();
            view.contest_ids = res.contests;
            view.contests_under_audit = res.contests_under_audit;
            view.ballot_manifest = res.ballot_manifest_filename.map(|file_name| UploadedFile {
                file_name,
                hash: res.ballot_manifest_hash,
            });
            view.cvr_export = res.cvr_export_filename.map(|file_name| UploadedFile {
                file_name,
                hash: res.cvr_export_hash,
            });
            view.estimated_ballots_to_audit = res.estimated_ballots_to_audit;
            view.ballots_remaining_in_round = res.ballots_remaining_in_round;
            view.audited_ballot_count = res.audited_ballot_count;
            view.ballot_under_audit = res.ballot_under_audit_id;
            view.current_round = res.current_round;
            view.rounds = res.rounds;

            if let Some(county_state) = county_state {
                state.asm.set_state(AsmRole::County, Some(res.id), county_state)?;
            }
            if let Some(board_state) = board_state {
                state
                    .asm
                    .set_state(AsmRole::AuditBoard, Some(res.id), board_state)?;
            }
        }
        Operation::FetchCountyAsmState => {
            let res: AsmStateResponse = parse(operation, data)?;
            let next = AsmRole::County.parse_state(&res.current_state)?;
            let scope = state.scope(AsmRole::County);
            state.asm.set_state(AsmRole::County, scope, next)?;
            state.county.county_ui_events = res.enabled_ui_events;
        }
        Operation::FetchAuditBoardAsmState => {
            let res: AsmStateResponse = parse(operation, data)?;
            let next = AsmRole::AuditBoard.parse_state(&res.current_state)?;
            let scope = state.scope(AsmRole::AuditBoard);
            state.asm.set_state(AsmRole::AuditBoard, scope, next)?;
            state.county.audit_board_ui_events = res.enabled_ui_events;
        }
        Operation::FetchCountyContests => {
            state.county.contests = parse(operation, data)?;
        }
        Operation::DosDashboardRefresh => {
            let res: DosDashboardRefreshResponse = parse(operation, data)?;
            let next = AsmRole::Dos.parse_state(&res.asm_state)?;

            let view = &mut state.dos;
            view.risk_limit = res.risk_limit;
            view.election_type = res.election_type;
            view.election_date = res.election_date;
            view.seed = res.seed;
            view.county_status = res.county_status;
            view.audited_contests = res.audited_contests;

            state.asm.set_state(AsmRole::Dos, None, next)?;
        }
        Operation::FetchDosAsmState => {
            let res: AsmStateResponse = parse(operation, data)?;
            let next = AsmRole::Dos.parse_state(&res.current_state)?;
            state.asm.set_state(AsmRole::Dos, None, next)?;
            state.dos.ui_events = res.enabled_ui_events;
        }
        Operation::FetchDosContests => {
            state.dos.contests = parse(operation, data)?;
        }
        Operation::AuditBoardSignIn => {
            if let Some(members) = state.county.pending_audit_board.take() {
                state.county.audit_board = members;
            }
            state.session.active_role = Some(ActorRole::AuditBoard);
        }
        // Acknowledgements only; the follow-up refresh carries the new data.
        Operation::Logout
        | Operation::BallotNotFound
        | Operation::UploadAuditCvr
        | Operation::UploadBallotManifest
        | Operation::UploadCvrExport
        | Operation::SetRiskLimit
        | Operation::SetElectionInfo => {}
    }
    Ok(())
}

struct StoreInner {
    state: watch::Sender<AppState>,
    actions: broadcast::Sender<Action>,
    dispatch_lock: Mutex<()>,
}

/// Cheap, cloneable handle to the shared store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self::with_state(AppState::default())
    }

    pub fn with_state(state: AppState) -> Self {
        let (state, _) = watch::channel(state);
        let (actions, _) = broadcast::channel(ACTION_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(StoreInner {
                state,
                actions,
                dispatch_lock: Mutex::new(()),
            }),
        }
    }

    /// Applies the action and then notifies listeners, in one serialized step.
    pub fn dispatch(&self, action: Action) {
        let _guard = self
            .inner
            .dispatch_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!(tag = %action.tag(), "dispatch");
        self.inner.state.send_modify(|state| reduce(state, &action));
        let _ = self.inner.actions.send(action);
    }

    pub fn snapshot(&self) -> AppState {
        self.inner.state.borrow().clone()
    }

    pub fn sync_snapshot(&self) -> SyncSnapshot {
        self.inner.state.borrow().sync_snapshot()
    }

    /// Runs `f` against the current state. `f` must not dispatch.
    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Action> {
        self.inner.actions.subscribe()
    }

    pub fn watch(&self) -> watch::Receiver<AppState> {
        self.inner.state.subscribe()
    }
}

pub(crate) fn log_lagged(listener: &str, skipped: u64) {
    warn!(listener, skipped, "action listener lagged; events dropped");
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
