//! Store events.
//!
//! Every server operation owns four event tags, one per [`Phase`]. The tag
//! names (`BALLOT_NOT_FOUND_SEND`, `BALLOT_NOT_FOUND_OK`, ...) are the only
//! contract between dispatchers and the reducer.

use std::fmt;

use serde_json::Value;
use shared::{
    domain::{ActorRole, Dashboard},
    error::ApiError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Login,
    Logout,
    CountyDashboardRefresh,
    FetchCountyAsmState,
    FetchAuditBoardAsmState,
    FetchCountyContests,
    DosDashboardRefresh,
    FetchDosAsmState,
    FetchDosContests,
    AuditBoardSignIn,
    BallotNotFound,
    UploadAuditCvr,
    UploadBallotManifest,
    UploadCvrExport,
    SetRiskLimit,
    SetElectionInfo,
}

impl Operation {
    pub const ALL: [Operation; 16] = [
        Operation::Login,
        Operation::Logout,
        Operation::CountyDashboardRefresh,
        Operation::FetchCountyAsmState,
        Operation::FetchAuditBoardAsmState,
        Operation::FetchCountyContests,
        Operation::DosDashboardRefresh,
        Operation::FetchDosAsmState,
        Operation::FetchDosContests,
        Operation::AuditBoardSignIn,
        Operation::BallotNotFound,
        Operation::UploadAuditCvr,
        Operation::UploadBallotManifest,
        Operation::UploadCvrExport,
        Operation::SetRiskLimit,
        Operation::SetElectionInfo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Login => "LOGIN",
            Operation::Logout => "LOGOUT",
            Operation::CountyDashboardRefresh => "COUNTY_DASHBOARD_REFRESH",
            Operation::FetchCountyAsmState => "FETCH_COUNTY_ASM_STATE",
            Operation::FetchAuditBoardAsmState => "FETCH_AUDIT_BOARD_ASM_STATE",
            Operation::FetchCountyContests => "FETCH_COUNTY_CONTESTS",
            Operation::DosDashboardRefresh => "DOS_DASHBOARD_REFRESH",
            Operation::FetchDosAsmState => "FETCH_DOS_ASM_STATE",
            Operation::FetchDosContests => "FETCH_DOS_CONTESTS",
            Operation::AuditBoardSignIn => "AUDIT_BOARD_SIGN_IN",
            Operation::BallotNotFound => "BALLOT_NOT_FOUND",
            Operation::UploadAuditCvr => "UPLOAD_AUDIT_CVR",
            Operation::UploadBallotManifest => "UPLOAD_BALLOT_MANIFEST",
            Operation::UploadCvrExport => "UPLOAD_CVR_EXPORT",
            Operation::SetRiskLimit => "SET_RISK_LIMIT",
            Operation::SetElectionInfo => "SET_ELECTION_INFO",
        }
    }

    /// Dashboard whose view shows this operation's data, if any.
    pub fn view(self) -> Option<Dashboard> {
        match self {
            Operation::Login | Operation::Logout => None,
            Operation::CountyDashboardRefresh
            | Operation::FetchCountyAsmState
            | Operation::FetchAuditBoardAsmState
            | Operation::FetchCountyContests
            | Operation::AuditBoardSignIn
            | Operation::BallotNotFound
            | Operation::UploadAuditCvr
            | Operation::UploadBallotManifest
            | Operation::UploadCvrExport => Some(Dashboard::County),
            Operation::DosDashboardRefresh
            | Operation::FetchDosAsmState
            | Operation::FetchDosContests
            | Operation::SetRiskLimit
            | Operation::SetElectionInfo => Some(Dashboard::Sos),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Send,
    Ok,
    Fail,
    NetworkFail,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Send, Phase::Ok, Phase::Fail, Phase::NetworkFail];

    fn suffix(self) -> &'static str {
        match self {
            Phase::Send => "SEND",
            Phase::Ok => "OK",
            Phase::Fail => "FAIL",
            Phase::NetworkFail => "NETWORK_FAIL",
        }
    }

    pub fn is_terminal(self) -> bool {
        self != Phase::Send
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionType {
    pub operation: Operation,
    pub phase: Phase,
}

impl ActionType {
    pub fn new(operation: Operation, phase: Phase) -> Self {
        Self { operation, phase }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.operation.as_str(), self.phase.suffix())
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    Send { operation: Operation, payload: Value },
    Ok { operation: Operation, data: Value },
    Fail { operation: Operation, error: ApiError },
    NetworkFail { operation: Operation, error: String },
    PollStart(ActorRole),
    PollStop(ActorRole),
    SelectDashboard(Dashboard),
    BoardSignInSync,
    Logout,
}

impl Action {
    /// Four-phase tag for network events; `None` for local signals.
    pub fn action_type(&self) -> Option<ActionType> {
        match self {
            Action::Send { operation, .. } => Some(ActionType::new(*operation, Phase::Send)),
            Action::Ok { operation, .. } => Some(ActionType::new(*operation, Phase::Ok)),
            Action::Fail { operation, .. } => Some(ActionType::new(*operation, Phase::Fail)),
            Action::NetworkFail { operation, .. } => {
                Some(ActionType::new(*operation, Phase::NetworkFail))
            }
            _ => None,
        }
    }

    pub fn is(&self, operation: Operation, phase: Phase) -> bool {
        self.action_type() == Some(ActionType::new(operation, phase))
    }

    pub fn tag(&self) -> String {
        match self {
            Action::PollStart(role) => format!("{}_POLL_START", role_tag(*role)),
            Action::PollStop(role) => format!("{}_POLL_STOP", role_tag(*role)),
            Action::SelectDashboard(_) => "SELECT_DASHBOARD".to_string(),
            Action::BoardSignInSync => "COUNTY_BOARD_SIGN_IN_SYNC".to_string(),
            Action::Logout => "LOGOUT".to_string(),
            network => network
                .action_type()
                .map(|ty| ty.to_string())
                .unwrap_or_default(),
        }
    }
}

fn role_tag(role: ActorRole) -> &'static str {
    match role {
        ActorRole::County => "COUNTY_DASHBOARD",
        ActorRole::AuditBoard => "COUNTY_AUDIT",
        ActorRole::StateAdmin => "DOS",
    }
}

#[cfg(test)]
#[path = "tests/action_tests.rs"]
mod tests;
