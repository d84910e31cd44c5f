use shared::{
    asm::{AsmRole, AsmState, AuditBoardAsmState},
    domain::Dashboard,
};

use crate::store::SyncSnapshot;

/// Audit-board states in which the board is idle and waiting on the state
/// administrator. Outside them the board may have unsaved local input.
pub const BOARD_WAITING_STATES: &[AsmState] = &[
    AsmState::AuditBoard(AuditBoardAsmState::WaitingForRoundStart),
    AsmState::AuditBoard(AuditBoardAsmState::WaitingForRoundStartNoAuditBoard),
];

/// Audit-board states owned by the board poller (waiting) or by local input
/// (round in progress, sign-off). The county poller stays out of all of them.
pub const BOARD_ATTENDED_STATES: &[AsmState] = &[
    AsmState::AuditBoard(AuditBoardAsmState::WaitingForRoundStart),
    AsmState::AuditBoard(AuditBoardAsmState::WaitingForRoundStartNoAuditBoard),
    AsmState::AuditBoard(AuditBoardAsmState::RoundInProgress),
    AsmState::AuditBoard(AuditBoardAsmState::RoundInProgressNoAuditBoard),
    AsmState::AuditBoard(AuditBoardAsmState::WaitingForRoundSignOff),
    AsmState::AuditBoard(AuditBoardAsmState::WaitingForRoundSignOffNoAuditBoard),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsmFilter {
    pub role: AsmRole,
    pub states: &'static [AsmState],
    /// Open when the state is outside `states` instead of inside.
    pub exclude: bool,
}

impl AsmFilter {
    fn admits(&self, state: AsmState) -> bool {
        self.states.contains(&state) != self.exclude
    }
}

/// Decides, per poll tick, whether a sync cycle runs. Pure over the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncGate {
    dashboard: Dashboard,
    asm: Option<AsmFilter>,
}

impl SyncGate {
    pub const fn dashboard(dashboard: Dashboard) -> Self {
        Self {
            dashboard,
            asm: None,
        }
    }

    pub const fn when_asm_in(self, role: AsmRole, states: &'static [AsmState]) -> Self {
        Self {
            asm: Some(AsmFilter {
                role,
                states,
                exclude: false,
            }),
            ..self
        }
    }

    pub const fn unless_asm_in(self, role: AsmRole, states: &'static [AsmState]) -> Self {
        Self {
            asm: Some(AsmFilter {
                role,
                states,
                exclude: true,
            }),
            ..self
        }
    }

    pub fn should_sync(&self, snapshot: &SyncSnapshot) -> bool {
        if !snapshot.logged_in || snapshot.dashboard != Some(self.dashboard) {
            return false;
        }
        match self.asm {
            Some(filter) => filter.admits(snapshot.asm_state(filter.role)),
            None => true,
        }
    }
}

#[cfg(test)]
#[path = "tests/gate_tests.rs"]
mod tests;
