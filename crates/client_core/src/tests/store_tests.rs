use super::*;
use crate::test_utils::{asm_body, drain_tags};
use serde_json::json;
use shared::{
    asm::{AuditBoardAsmState, CountyAsmState, DosAsmState},
    error::ApiError,
};

fn ok(operation: Operation, data: Value) -> Action {
    Action::Ok { operation, data }
}

fn county_login() -> Action {
    ok(Operation::Login, json!({ "role": "county", "county_id": 7 }))
}

fn county_refresh() -> Value {
    json!({
        "id": 7,
        "asm_state": "COUNTY_AUDIT_UNDERWAY",
        "audit_board_asm_state": "WAITING_FOR_ROUND_START",
        "general_information": { "name": "Adams" },
        "audit_board": [
            { "first_name": "Ada", "last_name": "Byron", "political_party": "Unaffiliated" }
        ],
        "ballot_manifest_filename": "manifest.csv",
        "ballot_manifest_hash": "abc",
        "contests": [11, 12],
        "ballots_remaining_in_round": 4,
        "current_round": { "number": 1, "expected_count": 10, "actual_count": 6 }
    })
}

#[test]
fn login_opens_session_for_dashboard() {
    let mut state = AppState::default();
    reduce(&mut state, &county_login());

    assert!(state.session.logged_in);
    assert_eq!(state.session.dashboard, Some(Dashboard::County));
    assert_eq!(state.session.active_role, Some(ActorRole::County));
    assert_eq!(state.county.id, Some(CountyId(7)));
}

#[test]
fn county_refresh_fills_view_and_both_machines() {
    let mut state = AppState::default();
    reduce(&mut state, &county_login());
    reduce(&mut state, &ok(Operation::CountyDashboardRefresh, county_refresh()));

    assert_eq!(
        state.asm_state(AsmRole::County),
        AsmState::County(CountyAsmState::CountyAuditUnderway)
    );
    assert_eq!(
        state.asm_state(AsmRole::AuditBoard),
        AsmState::AuditBoard(AuditBoardAsmState::WaitingForRoundStart)
    );
    let view = &state.county;
    assert_eq!(view.contest_ids, vec![ContestId(11), ContestId(12)]);
    assert_eq!(view.audit_board.len(), 1);
    assert_eq!(
        view.ballot_manifest,
        Some(UploadedFile {
            file_name: "manifest.csv".into(),
            hash: Some("abc".into()),
        })
    );
    assert_eq!(view.cvr_export, None);
    assert_eq!(view.ballots_remaining_in_round, Some(4));
    assert_eq!(view.current_round.as_ref().map(|r| r.actual_count), Some(6));
}

#[test]
fn asm_fetch_replaces_state_and_ui_events() {
    let mut state = AppState::default();
    let body = json!({
        "current_state": "DOS_AUDIT_ONGOING",
        "enabled_ui_events": ["DOS_START_ROUND"]
    });
    reduce(&mut state, &ok(Operation::FetchDosAsmState, body));

    assert_eq!(
        state.asm_state(AsmRole::Dos),
        AsmState::Dos(DosAsmState::DosAuditOngoing)
    );
    assert_eq!(state.dos.ui_events, vec!["DOS_START_ROUND".to_string()]);
}

#[test]
fn unknown_state_is_a_fault_and_leaves_machine_alone() {
    let mut state = AppState::default();
    reduce(
        &mut state,
        &ok(Operation::FetchAuditBoardAsmState, asm_body("ROUND_IN_PROGRESS")),
    );
    reduce(
        &mut state,
        &ok(Operation::FetchAuditBoardAsmState, asm_body("TIME_TRAVEL")),
    );

    assert_eq!(
        state.asm_state(AsmRole::AuditBoard),
        AsmState::AuditBoard(AuditBoardAsmState::RoundInProgress)
    );
    assert_eq!(
        state.faults.get(&Operation::FetchAuditBoardAsmState),
        Some(&InvariantError::UnknownAsmState {
            role: AsmRole::AuditBoard,
            value: "TIME_TRAVEL".into(),
        })
    );
    assert!(state.view_fault(Dashboard::County).is_some());
    assert!(state.view_fault(Dashboard::Sos).is_none());

    reduce(
        &mut state,
        &ok(Operation::FetchAuditBoardAsmState, asm_body("AUDIT_COMPLETE")),
    );
    assert!(state.faults.is_empty());
}

#[test]
fn bad_refresh_body_keeps_previous_view() {
    let mut state = AppState::default();
    reduce(&mut state, &county_login());
    reduce(&mut state, &ok(Operation::CountyDashboardRefresh, county_refresh()));

    let mut bad = county_refresh();
    bad["contests"] = json!([99]);
    bad["audit_board_asm_state"] = json!("NOT_A_STATE");
    reduce(&mut state, &ok(Operation::CountyDashboardRefresh, bad));

    assert_eq!(state.county.contest_ids, vec![ContestId(11), ContestId(12)]);
    assert!(matches!(
        state.faults.get(&Operation::CountyDashboardRefresh),
        Some(InvariantError::UnknownAsmState { .. })
    ));

    reduce(
        &mut state,
        &ok(Operation::CountyDashboardRefresh, json!({ "asm_state": 3 })),
    );
    assert!(matches!(
        state.faults.get(&Operation::CountyDashboardRefresh),
        Some(InvariantError::MalformedBody { .. })
    ));
}

#[test]
fn failures_are_recorded_without_touching_data() {
    let mut state = AppState::default();
    reduce(&mut state, &county_login());
    reduce(&mut state, &ok(Operation::CountyDashboardRefresh, county_refresh()));

    reduce(
        &mut state,
        &Action::Fail {
            operation: Operation::CountyDashboardRefresh,
            error: ApiError::new(500, "boom"),
        },
    );
    reduce(
        &mut state,
        &Action::NetworkFail {
            operation: Operation::FetchCountyAsmState,
            error: "request timed out".into(),
        },
    );

    assert_eq!(state.county.contest_ids.len(), 2);
    assert!(matches!(
        state.sync_errors.get(&Operation::CountyDashboardRefresh),
        Some(SyncError::Application(err)) if err.status == 500
    ));
    assert!(state.sync_errors[&Operation::FetchCountyAsmState].is_connectivity());

    reduce(&mut state, &ok(Operation::CountyDashboardRefresh, county_refresh()));
    assert!(!state
        .sync_errors
        .contains_key(&Operation::CountyDashboardRefresh));
}

#[test]
fn in_flight_counts_outstanding_sends() {
    let mut state = AppState::default();
    let send = Action::Send {
        operation: Operation::SetRiskLimit,
        payload: json!({ "risk_limit": 0.05 }),
    };
    reduce(&mut state, &send);
    reduce(&mut state, &send);
    assert_eq!(state.in_flight.get(&Operation::SetRiskLimit), Some(&2));

    reduce(&mut state, &ok(Operation::SetRiskLimit, json!({})));
    reduce(
        &mut state,
        &Action::NetworkFail {
            operation: Operation::SetRiskLimit,
            error: "connection failed".into(),
        },
    );
    assert!(!state.is_in_flight(Operation::SetRiskLimit));

    // A stray terminal event never underflows.
    reduce(&mut state, &ok(Operation::SetRiskLimit, json!({})));
    assert!(state.in_flight.is_empty());
}

#[test]
fn logout_resets_session_and_machines() {
    let mut state = AppState::default();
    reduce(&mut state, &county_login());
    reduce(&mut state, &ok(Operation::CountyDashboardRefresh, county_refresh()));
    reduce(&mut state, &Action::Logout);

    assert!(!state.session.logged_in);
    assert_eq!(state.session.dashboard, None);
    assert_eq!(state.county.id, None);
    assert!(state.asm.is_empty());
    assert!(state.asm_state(AsmRole::County).is_initial());
}

#[test]
fn board_sign_in_adopts_members_once_accepted() {
    let mut state = AppState::default();
    reduce(&mut state, &county_login());
    reduce(
        &mut state,
        &Action::Send {
            operation: Operation::AuditBoardSignIn,
            payload: json!({ "members": [
                { "first_name": "Ada", "last_name": "Byron", "political_party": "Whig" },
                { "first_name": "Grace", "last_name": "Hopper", "political_party": "Navy" }
            ] }),
        },
    );
    assert!(state.county.audit_board.is_empty());

    reduce(&mut state, &ok(Operation::AuditBoardSignIn, json!({})));
    assert_eq!(state.county.audit_board.len(), 2);
    assert!(state.county.pending_audit_board.is_none());
    assert_eq!(state.session.active_role, Some(ActorRole::AuditBoard));
    assert_eq!(state.sync_snapshot().active_role, Some(ActorRole::AuditBoard));
}

#[test]
fn snapshot_reports_sentinels_for_unknown_machines() {
    let snapshot = AppState::default().sync_snapshot();
    assert!(!snapshot.logged_in);
    for role in AsmRole::ALL {
        assert_eq!(snapshot.asm_state(role), role.initial());
    }
}

#[test]
fn dispatch_reduces_before_broadcasting() {
    let store = Store::new();
    let mut rx = store.subscribe();
    let mut watch = store.watch();

    store.dispatch(county_login());
    store.dispatch(Action::PollStart(ActorRole::County));

    assert!(watch.has_changed().unwrap_or(false));
    assert!(watch.borrow_and_update().session.logged_in);
    assert_eq!(
        drain_tags(&mut rx),
        vec!["LOGIN_OK", "COUNTY_DASHBOARD_POLL_START"]
    );
    assert!(store.read(|state| state.session.logged_in));
    assert_eq!(store.sync_snapshot().county_id, Some(CountyId(7)));
}

#[test]
fn dispatch_without_listeners_is_fine() {
    let store = Store::new();
    store.dispatch(Action::SelectDashboard(Dashboard::Sos));
    let state = store.snapshot();
    assert_eq!(state.session.dashboard, Some(Dashboard::Sos));
    assert_eq!(state.session.active_role, Some(ActorRole::StateAdmin));
}
