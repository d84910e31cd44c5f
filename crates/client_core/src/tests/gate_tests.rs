use std::collections::BTreeMap;

use shared::{asm::CountyAsmState, domain::CountyId};

use super::*;

fn snapshot(logged_in: bool, dashboard: Option<Dashboard>, board: AsmState) -> SyncSnapshot {
    let mut asm = BTreeMap::new();
    asm.insert(AsmRole::AuditBoard, board);
    asm.insert(
        AsmRole::County,
        AsmState::County(CountyAsmState::CountyAuditUnderway),
    );
    SyncSnapshot {
        logged_in,
        dashboard,
        active_role: None,
        county_id: Some(CountyId(1)),
        asm,
    }
}

fn waiting() -> AsmState {
    AsmState::AuditBoard(AuditBoardAsmState::WaitingForRoundStart)
}

#[test]
fn closed_when_logged_out() {
    let gate = SyncGate::dashboard(Dashboard::County);
    assert!(!gate.should_sync(&snapshot(false, Some(Dashboard::County), waiting())));
}

#[test]
fn closed_on_other_dashboard() {
    let gate = SyncGate::dashboard(Dashboard::Sos);
    assert!(!gate.should_sync(&snapshot(true, Some(Dashboard::County), waiting())));
    assert!(!gate.should_sync(&snapshot(true, None, waiting())));
}

#[test]
fn board_gate_follows_waiting_states() {
    let gate = SyncGate::dashboard(Dashboard::County)
        .when_asm_in(AsmRole::AuditBoard, BOARD_WAITING_STATES);

    assert!(gate.should_sync(&snapshot(true, Some(Dashboard::County), waiting())));
    assert!(gate.should_sync(&snapshot(
        true,
        Some(Dashboard::County),
        AsmState::AuditBoard(AuditBoardAsmState::WaitingForRoundStartNoAuditBoard),
    )));
    assert!(!gate.should_sync(&snapshot(
        true,
        Some(Dashboard::County),
        AsmState::AuditBoard(AuditBoardAsmState::RoundInProgress),
    )));
}

#[test]
fn same_snapshot_same_answer() {
    let gate = SyncGate::dashboard(Dashboard::County)
        .when_asm_in(AsmRole::AuditBoard, BOARD_WAITING_STATES);
    let snap = snapshot(true, Some(Dashboard::County), waiting());
    assert_eq!(gate.should_sync(&snap), gate.should_sync(&snap));
}

#[test]
fn missing_machine_reads_as_sentinel() {
    let gate = SyncGate::dashboard(Dashboard::County)
        .when_asm_in(AsmRole::AuditBoard, BOARD_WAITING_STATES);
    let mut snap = snapshot(true, Some(Dashboard::County), waiting());
    snap.asm.clear();
    assert!(!gate.should_sync(&snap));
}

#[test]
fn county_gate_stays_out_of_attended_board_states() {
    let gate = SyncGate::dashboard(Dashboard::County)
        .unless_asm_in(AsmRole::AuditBoard, BOARD_ATTENDED_STATES);

    for state in BOARD_ATTENDED_STATES {
        assert!(!gate.should_sync(&snapshot(true, Some(Dashboard::County), *state)));
    }
    for state in [
        AuditBoardAsmState::AuditInitialState,
        AuditBoardAsmState::AuditComplete,
        AuditBoardAsmState::UnableToAudit,
    ] {
        assert!(gate.should_sync(&snapshot(
            true,
            Some(Dashboard::County),
            AsmState::AuditBoard(state),
        )));
    }
}
