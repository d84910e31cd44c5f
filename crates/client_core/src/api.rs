//! Server operations, one [`SubmitAction`] per endpoint.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::{json, Value};
use shared::{
    domain::{AuditBoardMember, CountyId, CvrId},
    protocol::{
        AuditBoardSignInRequest, AuditCvrSubmission, BallotNotFoundRequest, ElectionInfoRequest,
        FileUploadRequest, LoginRequest, RiskLimitRequest,
    },
};

use crate::{
    action::{Action, Operation},
    store::Store,
    submit::{SubmitAction, Submission, SyncClient},
    transport::Method,
};

pub const LOGIN: SubmitAction = SubmitAction::new(Operation::Login, Method::Post, "/auth-admin");
pub const LOGOUT: SubmitAction =
    SubmitAction::new(Operation::Logout, Method::Post, "/unauthenticate");

pub const COUNTY_DASHBOARD_REFRESH: SubmitAction = SubmitAction::new(
    Operation::CountyDashboardRefresh,
    Method::Get,
    "/county-dashboard",
);
pub const FETCH_COUNTY_ASM_STATE: SubmitAction = SubmitAction::new(
    Operation::FetchCountyAsmState,
    Method::Get,
    "/county-asm-state",
);
pub const FETCH_AUDIT_BOARD_ASM_STATE: SubmitAction = SubmitAction::new(
    Operation::FetchAuditBoardAsmState,
    Method::Get,
    "/audit-board-asm-state",
);
pub const FETCH_COUNTY_CONTESTS: SubmitAction = SubmitAction::new(
    Operation::FetchCountyContests,
    Method::Get,
    "/contest/county",
);

pub const DOS_DASHBOARD_REFRESH: SubmitAction = SubmitAction::new(
    Operation::DosDashboardRefresh,
    Method::Get,
    "/dos-dashboard",
);
pub const FETCH_DOS_ASM_STATE: SubmitAction =
    SubmitAction::new(Operation::FetchDosAsmState, Method::Get, "/dos-asm-state");
pub const FETCH_DOS_CONTESTS: SubmitAction =
    SubmitAction::new(Operation::FetchDosContests, Method::Get, "/contest");

pub const AUDIT_BOARD_SIGN_IN: SubmitAction = SubmitAction::new(
    Operation::AuditBoardSignIn,
    Method::Post,
    "/audit-board-sign-in",
);
pub const BALLOT_NOT_FOUND: SubmitAction =
    SubmitAction::new(Operation::BallotNotFound, Method::Post, "/ballot-not-found");
pub const UPLOAD_AUDIT_CVR: SubmitAction =
    SubmitAction::new(Operation::UploadAuditCvr, Method::Post, "/upload-audit-cvr");
pub const UPLOAD_BALLOT_MANIFEST: SubmitAction = SubmitAction::new(
    Operation::UploadBallotManifest,
    Method::Post,
    "/upload-ballot-manifest",
);
pub const UPLOAD_CVR_EXPORT: SubmitAction = SubmitAction::new(
    Operation::UploadCvrExport,
    Method::Post,
    "/upload-cvr-export",
);
pub const SET_RISK_LIMIT: SubmitAction = SubmitAction::new(
    Operation::SetRiskLimit,
    Method::Post,
    "/risk-limit-comp-audits",
);
pub const SET_ELECTION_INFO: SubmitAction = SubmitAction::new(
    Operation::SetElectionInfo,
    Method::Post,
    "/update-election-info",
);

pub const ALL_ACTIONS: [SubmitAction; 16] = [
    LOGIN,
    LOGOUT,
    COUNTY_DASHBOARD_REFRESH,
    FETCH_COUNTY_ASM_STATE,
    FETCH_AUDIT_BOARD_ASM_STATE,
    FETCH_COUNTY_CONTESTS,
    DOS_DASHBOARD_REFRESH,
    FETCH_DOS_ASM_STATE,
    FETCH_DOS_CONTESTS,
    AUDIT_BOARD_SIGN_IN,
    BALLOT_NOT_FOUND,
    UPLOAD_AUDIT_CVR,
    UPLOAD_BALLOT_MANIFEST,
    UPLOAD_CVR_EXPORT,
    SET_RISK_LIMIT,
    SET_ELECTION_INFO,
];

/// Typed entry points for every server operation. Each call dispatches `SEND`
/// immediately and returns the in-flight [`Submission`].
#[derive(Clone)]
pub struct AuditApi {
    client: SyncClient,
}

impl AuditApi {
    pub fn new(client: SyncClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    pub fn store(&self) -> &Store {
        self.client.store()
    }

    fn submit_json<T: Serialize>(&self, action: SubmitAction, payload: &T) -> Result<Submission> {
        let payload = serde_json::to_value(payload)
            .with_context(|| format!("failed to encode {} payload", action.operation()))?;
        Ok(action.submit(&self.client, payload))
    }

    fn fetch(&self, action: SubmitAction) -> Submission {
        action.submit(&self.client, Value::Null)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Submission> {
        self.submit_json(
            LOGIN,
            &LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            },
        )
    }

    /// Clears the local session first so pollers stop at their next tick, then
    /// tells the server.
    pub fn logout(&self) -> Submission {
        self.store().dispatch(Action::Logout);
        self.fetch(LOGOUT)
    }

    pub fn county_dashboard_refresh(&self) -> Submission {
        self.fetch(COUNTY_DASHBOARD_REFRESH)
    }

    pub fn fetch_county_asm_state(&self) -> Submission {
        self.fetch(FETCH_COUNTY_ASM_STATE)
    }

    pub fn fetch_audit_board_asm_state(&self) -> Submission {
        self.fetch(FETCH_AUDIT_BOARD_ASM_STATE)
    }

    pub fn fetch_county_contests(&self, county: CountyId) -> Submission {
        FETCH_COUNTY_CONTESTS.submit(&self.client, json!({ "id": county }))
    }

    pub fn dos_dashboard_refresh(&self) -> Submission {
        self.fetch(DOS_DASHBOARD_REFRESH)
    }

    pub fn fetch_dos_asm_state(&self) -> Submission {
        self.fetch(FETCH_DOS_ASM_STATE)
    }

    pub fn fetch_dos_contests(&self) -> Submission {
        self.fetch(FETCH_DOS_CONTESTS)
    }

    pub fn audit_board_sign_in(&self, members: Vec<AuditBoardMember>) -> Result<Submission> {
        self.submit_json(AUDIT_BOARD_SIGN_IN, &AuditBoardSignInRequest { members })
    }

    pub fn ballot_not_found(&self, id: CvrId) -> Result<Submission> {
        self.submit_json(BALLOT_NOT_FOUND, &BallotNotFoundRequest { id })
    }

    pub fn upload_audit_cvr(&self, submission: &AuditCvrSubmission) -> Result<Submission> {
        self.submit_json(UPLOAD_AUDIT_CVR, submission)
    }

    pub fn upload_ballot_manifest(
        &self,
        file_name: &str,
        hash: &str,
        contents: &[u8],
    ) -> Result<Submission> {
        self.submit_json(UPLOAD_BALLOT_MANIFEST, &file_upload(file_name, hash, contents))
    }

    pub fn upload_cvr_export(
        &self,
        file_name: &str,
        hash: &str,
        contents: &[u8],
    ) -> Result<Submission> {
        self.submit_json(UPLOAD_CVR_EXPORT, &file_upload(file_name, hash, contents))
    }

    pub fn set_risk_limit(&self, risk_limit: f64) -> Result<Submission> {
        anyhow::ensure!(
            risk_limit > 0.0 && risk_limit < 1.0,
            "risk limit must be between 0 and 1, got {risk_limit}"
        );
        self.submit_json(SET_RISK_LIMIT, &RiskLimitRequest { risk_limit })
    }

    pub fn set_election_info(&self, info: &ElectionInfoRequest) -> Result<Submission> {
        self.submit_json(SET_ELECTION_INFO, info)
    }
}

fn file_upload(file_name: &str, hash: &str, contents: &[u8]) -> FileUploadRequest {
    FileUploadRequest {
        file_name: file_name.to_string(),
        hash: hash.to_string(),
        contents_b64: STANDARD.encode(contents),
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
