use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use client_core::{
    AppState, AuditApi, ClientSettings, Coordinator, HttpTransport, Operation, Store,
    SubmitOutcome, SyncClient,
};
use serde_json::{json, Value};
use shared::{
    asm::{AsmRole, AsmState, AuditBoardAsmState, CountyAsmState},
    domain::{ActorRole, AuditBoardMember},
};
use tokio::net::TcpListener;

const SESSION_COOKIE: &str = "rla_session=county-4";

#[derive(Clone)]
struct ServerState {
    board_state: Arc<Mutex<&'static str>>,
    dashboard_hits: Arc<AtomicUsize>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|cookies| cookies.contains(SESSION_COOKIE))
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "result": "not authenticated" })),
    )
}

async fn auth_admin(Json(body): Json<Value>) -> impl IntoResponse {
    if body["password"] != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            HeaderMap::new(),
            Json(json!({ "result": "bad credentials" })),
        );
    }
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        format!("{SESSION_COOKIE}; Path=/")
            .parse()
            .expect("cookie header"),
    );
    (
        StatusCode::OK,
        headers,
        Json(json!({ "role": "county", "county_id": 4 })),
    )
}

async fn county_dashboard(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.dashboard_hits.fetch_add(1, Ordering::SeqCst);
    let board = *state.board_state.lock().expect("board state");
    (
        StatusCode::OK,
        Json(json!({
            "id": 4,
            "asm_state": "COUNTY_AUDIT_UNDERWAY",
            "audit_board_asm_state": board,
            "contests": [21]
        })),
    )
}

async fn county_asm(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::OK,
        Json(json!({ "current_state": "COUNTY_AUDIT_UNDERWAY", "enabled_ui_events": [] })),
    )
}

async fn board_asm(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    let board = *state.board_state.lock().expect("board state");
    (
        StatusCode::OK,
        Json(json!({ "current_state": board, "enabled_ui_events": [] })),
    )
}

async fn county_contests(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    if query.get("id").map(String::as_str) != Some("4") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "result": "unknown county" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!([{ "id": 21, "name": "County Commissioner", "county_id": 4 }])),
    )
}

async fn board_sign_in(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return unauthorized();
    }
    if body["members"].as_array().map_or(0, Vec::len) != 2 {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "result": "an audit board needs two members" })),
        );
    }
    *state.board_state.lock().expect("board state") = "WAITING_FOR_ROUND_START";
    (StatusCode::OK, Json(json!({})))
}

async fn spawn_audit_server() -> Result<(String, ServerState)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let state = ServerState {
        board_state: Arc::new(Mutex::new("AUDIT_INITIAL_STATE")),
        dashboard_hits: Arc::new(AtomicUsize::new(0)),
    };
    let app = Router::new()
        .route("/auth-admin", post(auth_admin))
        .route("/county-dashboard", get(county_dashboard))
        .route("/county-asm-state", get(county_asm))
        .route("/audit-board-asm-state", get(board_asm))
        .route("/contest/county", get(county_contests))
        .route("/audit-board-sign-in", post(board_sign_in))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}"), state))
}

fn settings(server_url: &str) -> ClientSettings {
    ClientSettings {
        server_url: server_url.to_string(),
        poll_delay_ms: 50,
        request_timeout_ms: 2_000,
        debug: true,
    }
}

fn api_for(settings: &ClientSettings) -> AuditApi {
    let transport = HttpTransport::new(&settings.server_url, settings.request_timeout())
        .expect("transport");
    AuditApi::new(SyncClient::new(Arc::new(transport), Store::new()))
}

async fn wait_for(store: &Store, what: &str, pred: impl Fn(&AppState) -> bool) {
    let mut rx = store.watch();
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if pred(&rx.borrow_and_update()) {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

fn member(first_name: &str) -> AuditBoardMember {
    AuditBoardMember {
        first_name: first_name.into(),
        last_name: "Example".into(),
        political_party: "Unaffiliated".into(),
    }
}

#[tokio::test]
async fn login_and_board_sign_in_sync_end_to_end() {
    let (server_url, server) = spawn_audit_server().await.expect("spawn server");
    let settings = settings(&server_url);
    let handle = Coordinator::spawn(api_for(&settings), &settings);

    let outcome = handle
        .api()
        .login("clerk", "secret")
        .expect("login")
        .outcome()
        .await;
    assert!(matches!(outcome, SubmitOutcome::Ok(_)), "{outcome:?}");

    wait_for(handle.store(), "county contests", |state| {
        state.asm_state(AsmRole::County) == AsmState::County(CountyAsmState::CountyAuditUnderway)
            && state.county.contests.len() == 1
    })
    .await;
    assert!(handle.is_running(ActorRole::County));

    let outcome = handle
        .api()
        .audit_board_sign_in(vec![member("Ada"), member("Grace")])
        .expect("sign in")
        .outcome()
        .await;
    assert!(matches!(outcome, SubmitOutcome::Ok(_)), "{outcome:?}");

    wait_for(handle.store(), "board waiting for round", |state| {
        state.asm_state(AsmRole::AuditBoard)
            == AsmState::AuditBoard(AuditBoardAsmState::WaitingForRoundStart)
    })
    .await;

    let hits = server.dashboard_hits.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(server.dashboard_hits.load(Ordering::SeqCst) > hits);

    handle.shutdown();
}

#[tokio::test]
async fn rejected_writes_surface_server_message() {
    let (server_url, _server) = spawn_audit_server().await.expect("spawn server");
    let settings = settings(&server_url);
    let api = api_for(&settings);

    api.login("clerk", "secret")
        .expect("login")
        .outcome()
        .await;
    let outcome = api
        .audit_board_sign_in(vec![member("Ada")])
        .expect("sign in")
        .outcome()
        .await;

    match outcome {
        SubmitOutcome::Fail(err) => {
            assert_eq!(err.status, 403);
            assert_eq!(err.message, "an audit board needs two members");
        }
        other => panic!("expected FAIL, got {other:?}"),
    }
    let state = api.store().snapshot();
    assert!(state.sync_errors.contains_key(&Operation::AuditBoardSignIn));
}

#[tokio::test]
async fn unauthenticated_fetch_is_an_application_failure() {
    let (server_url, _server) = spawn_audit_server().await.expect("spawn server");
    let api = api_for(&settings(&server_url));

    match api.county_dashboard_refresh().outcome().await {
        SubmitOutcome::Fail(err) => assert!(err.is_auth_failure()),
        other => panic!("expected FAIL, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_network_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = api_for(&settings(&format!("http://{addr}")));
    let outcome = api.fetch_county_asm_state().outcome().await;

    assert!(matches!(outcome, SubmitOutcome::NetworkFail(_)), "{outcome:?}");
    let state = api.store().snapshot();
    assert!(state.sync_errors[&Operation::FetchCountyAsmState].is_connectivity());
    assert!(state.asm_state(AsmRole::County).is_initial());
}
