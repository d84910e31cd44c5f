//! Root coordinator.
//!
//! Owns one [`PollScheduler`] per actor role, wires them to the store's
//! start/stop signals, and runs the reactive syncs that follow successful
//! writes and session changes.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use futures::StreamExt;
use shared::{
    asm::AsmRole,
    domain::{ActorRole, Dashboard},
};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, info};

use crate::{
    action::{Action, Operation},
    api::AuditApi,
    config::ClientSettings,
    gate::{SyncGate, BOARD_ATTENDED_STATES, BOARD_WAITING_STATES},
    poll::{fixed_delay, tick_task, PollScheduler, TickTask},
    store::{log_lagged, Store},
};

// Yields to the board poller and to rounds being worked on locally.
const COUNTY_GATE: SyncGate = SyncGate::dashboard(Dashboard::County)
    .unless_asm_in(AsmRole::AuditBoard, BOARD_ATTENDED_STATES);
const AUDIT_BOARD_GATE: SyncGate =
    SyncGate::dashboard(Dashboard::County).when_asm_in(AsmRole::AuditBoard, BOARD_WAITING_STATES);
const STATE_ADMIN_GATE: SyncGate = SyncGate::dashboard(Dashboard::Sos);

fn county_tasks() -> Vec<TickTask<AuditApi>> {
    vec![
        tick_task(|api: &AuditApi, _| {
            api.county_dashboard_refresh();
            Ok(())
        }),
        tick_task(|api: &AuditApi, _| {
            api.fetch_audit_board_asm_state();
            Ok(())
        }),
        tick_task(|api: &AuditApi, _| {
            api.fetch_county_asm_state();
            Ok(())
        }),
        tick_task(|api: &AuditApi, snapshot| {
            if let Some(county) = snapshot.county_id {
                api.fetch_county_contests(county);
            }
            Ok(())
        }),
    ]
}

fn audit_board_tasks() -> Vec<TickTask<AuditApi>> {
    vec![
        tick_task(|api: &AuditApi, _| {
            api.county_dashboard_refresh();
            Ok(())
        }),
        tick_task(|api: &AuditApi, _| {
            api.fetch_audit_board_asm_state();
            Ok(())
        }),
        tick_task(|api: &AuditApi, _| {
            api.fetch_county_asm_state();
            Ok(())
        }),
    ]
}

fn state_admin_tasks() -> Vec<TickTask<AuditApi>> {
    vec![
        tick_task(|api: &AuditApi, _| {
            api.dos_dashboard_refresh();
            Ok(())
        }),
        tick_task(|api: &AuditApi, _| {
            api.fetch_dos_asm_state();
            Ok(())
        }),
        tick_task(|api: &AuditApi, _| {
            api.fetch_dos_contests();
            Ok(())
        }),
    ]
}

pub struct Coordinator;

impl Coordinator {
    /// Builds the schedulers and starts every listener. Polling itself begins
    /// on the first `PollStart` signal, normally after a successful login.
    pub fn spawn(api: AuditApi, settings: &ClientSettings) -> CoordinatorHandle {
        let store = api.store().clone();
        let delay = fixed_delay(settings.poll_delay());
        let mut schedulers = BTreeMap::new();
        let mut tasks = Vec::new();

        for role in ActorRole::ALL {
            let (gate, ticks) = match role {
                ActorRole::County => (COUNTY_GATE, county_tasks()),
                ActorRole::AuditBoard => (AUDIT_BOARD_GATE, audit_board_tasks()),
                ActorRole::StateAdmin => (STATE_ADMIN_GATE, state_admin_tasks()),
            };
            let scheduler =
                PollScheduler::new(role, store.clone(), api.clone(), ticks, gate, delay.clone());
            tasks.push(scheduler.listen(store.subscribe()));
            schedulers.insert(role, scheduler);
        }

        tasks.push(tokio::spawn(react(api.clone(), store.subscribe())));

        let injector = if settings.debug {
            let (tx, rx) = mpsc::unbounded_channel();
            tasks.push(tokio::spawn(debug_source(store.clone(), store.subscribe(), rx)));
            info!("debug event source enabled");
            Some(tx)
        } else {
            None
        };

        CoordinatorHandle {
            api,
            schedulers,
            tasks,
            injector,
        }
    }
}

pub struct CoordinatorHandle {
    api: AuditApi,
    schedulers: BTreeMap<ActorRole, PollScheduler<AuditApi>>,
    tasks: Vec<JoinHandle<()>>,
    injector: Option<mpsc::UnboundedSender<Action>>,
}

impl CoordinatorHandle {
    pub fn api(&self) -> &AuditApi {
        &self.api
    }

    pub fn store(&self) -> &Store {
        self.api.store()
    }

    /// Signals the role's scheduler to start. Repeated starts are no-ops.
    pub fn start(&self, role: ActorRole) {
        self.store().dispatch(Action::PollStart(role));
    }

    pub fn stop(&self, role: ActorRole) {
        self.store().dispatch(Action::PollStop(role));
    }

    pub fn is_running(&self, role: ActorRole) -> bool {
        self.schedulers
            .get(&role)
            .is_some_and(PollScheduler::is_running)
    }

    /// Feeds an action through the debug event source.
    pub fn inject(&self, action: Action) -> Result<()> {
        let injector = self
            .injector
            .as_ref()
            .ok_or_else(|| anyhow!("debug event source is disabled"))?;
        injector
            .send(action)
            .map_err(|_| anyhow!("debug event source has shut down"))
    }

    /// Stops every scheduler and ends the listeners. Requests already in
    /// flight still settle into the store.
    pub fn shutdown(self) {
        for scheduler in self.schedulers.values() {
            scheduler.stop();
        }
        for task in &self.tasks {
            task.abort();
        }
        info!("coordinator shut down");
    }
}

async fn react(api: AuditApi, rx: broadcast::Receiver<Action>) {
    let mut actions = BroadcastStream::new(rx);
    while let Some(item) = actions.next().await {
        match item {
            Ok(action) => on_action(&api, &action),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => log_lagged("coordinator", skipped),
        }
    }
}

fn on_action(api: &AuditApi, action: &Action) {
    let operation = match action {
        Action::Ok { operation, .. } => *operation,
        Action::BoardSignInSync => {
            sync_audit_board(api);
            return;
        }
        Action::Logout => {
            for role in ActorRole::ALL {
                api.store().dispatch(Action::PollStop(role));
            }
            return;
        }
        _ => return,
    };

    match operation {
        Operation::Login => {
            let Some(dashboard) = api.store().read(|state| state.session.dashboard) else {
                return;
            };
            info!(?dashboard, "session opened");
            refresh_dashboard(api, dashboard);
            for role in dashboard.roles() {
                api.store().dispatch(Action::PollStart(*role));
            }
        }
        Operation::AuditBoardSignIn => sync_audit_board(api),
        Operation::UploadBallotManifest | Operation::UploadCvrExport => {
            api.county_dashboard_refresh();
            api.fetch_county_asm_state();
        }
        Operation::UploadAuditCvr | Operation::BallotNotFound => {
            api.county_dashboard_refresh();
            api.fetch_audit_board_asm_state();
        }
        Operation::CountyDashboardRefresh => {
            let missing = api.store().read(|state| {
                state
                    .county
                    .id
                    .filter(|_| state.county.contests.is_empty())
            });
            if let Some(county) = missing {
                api.fetch_county_contests(county);
            }
        }
        Operation::SetRiskLimit | Operation::SetElectionInfo => {
            api.dos_dashboard_refresh();
        }
        _ => {}
    }
}

fn refresh_dashboard(api: &AuditApi, dashboard: Dashboard) {
    match dashboard {
        Dashboard::County => api.county_dashboard_refresh(),
        Dashboard::Sos => api.dos_dashboard_refresh(),
    };
}

fn sync_audit_board(api: &AuditApi) {
    api.county_dashboard_refresh();
    api.fetch_audit_board_asm_state();
    api.fetch_county_asm_state();
}

async fn debug_source(
    store: Store,
    rx: broadcast::Receiver<Action>,
    mut injected: mpsc::UnboundedReceiver<Action>,
) {
    let mut actions = BroadcastStream::new(rx);
    loop {
        tokio::select! {
            item = actions.next() => match item {
                Some(Ok(action)) => debug!(tag = %action.tag(), ?action, "action"),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    log_lagged("debug source", skipped)
                }
                None => break,
            },
            action = injected.recv() => match action {
                Some(action) => {
                    info!(tag = %action.tag(), "injecting action");
                    store.dispatch(action);
                }
                None => break,
            },
        }
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
