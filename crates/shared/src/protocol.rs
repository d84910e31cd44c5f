use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AuditBoardMember, ContestId, CountyId, CvrId, Dashboard, ElectionType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub role: Dashboard,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub county_id: Option<CountyId>,
}

/// Body of every `*-asm-state` endpoint. The state stays a raw string here so
/// the client can tell an unknown state apart from a malformed body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsmStateResponse {
    pub current_state: String,
    #[serde(default)]
    pub enabled_ui_events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub number: u32,
    pub expected_count: u32,
    pub actual_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountyDashboardRefreshResponse {
    pub id: CountyId,
    #[serde(default)]
    pub asm_state: Option<String>,
    #[serde(default)]
    pub audit_board_asm_state: Option<String>,
    #[serde(default)]
    pub general_information: BTreeMap<String, String>,
    #[serde(default)]
    pub audit_board: Option<Vec<AuditBoardMember>>,
    #[serde(default)]
    pub ballot_manifest_filename: Option<String>,
    #[serde(default)]
    pub ballot_manifest_hash: Option<String>,
    #[serde(default)]
    pub cvr_export_filename: Option<String>,
    #[serde(default)]
    pub cvr_export_hash: Option<String>,
    #[serde(default)]
    pub contests: Vec<ContestId>,
    #[serde(default)]
    pub contests_under_audit: BTreeMap<String, String>,
    #[serde(default)]
    pub estimated_ballots_to_audit: Option<u32>,
    #[serde(default)]
    pub ballots_remaining_in_round: Option<u32>,
    #[serde(default)]
    pub audited_ballot_count: Option<u32>,
    #[serde(default)]
    pub ballot_under_audit_id: Option<CvrId>,
    #[serde(default)]
    pub current_round: Option<RoundSummary>,
    #[serde(default)]
    pub rounds: Vec<RoundSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestSummary {
    pub id: ContestId,
    pub name: String,
    #[serde(default)]
    pub county_id: Option<CountyId>,
    #[serde(default)]
    pub choices: Vec<ChoiceSummary>,
    #[serde(default = "default_votes_allowed")]
    pub votes_allowed: u32,
}

fn default_votes_allowed() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountyStatus {
    pub id: CountyId,
    pub asm_state: String,
    #[serde(default)]
    pub audit_board_asm_state: Option<String>,
    #[serde(default)]
    pub estimated_ballots_to_audit: Option<u32>,
    #[serde(default)]
    pub ballots_remaining_in_round: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DosDashboardRefreshResponse {
    pub asm_state: String,
    #[serde(default)]
    pub risk_limit: Option<f64>,
    #[serde(default)]
    pub election_type: Option<ElectionType>,
    #[serde(default)]
    pub election_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(default)]
    pub county_status: BTreeMap<String, CountyStatus>,
    #[serde(default)]
    pub audited_contests: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditBoardSignInRequest {
    pub members: Vec<AuditBoardMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotNotFoundRequest {
    pub id: CvrId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestMarks {
    pub contest: ContestId,
    pub choices: Vec<String>,
    #[serde(default)]
    pub comment: String,
    #[serde(default = "default_consensus")]
    pub consensus: bool,
}

fn default_consensus() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditCvrSubmission {
    pub cvr_id: CvrId,
    pub contest_info: Vec<ContestMarks>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimitRequest {
    pub risk_limit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionInfoRequest {
    pub election_date: DateTime<Utc>,
    pub election_type: ElectionType,
    pub public_meeting_date: DateTime<Utc>,
}

/// Ballot manifest and CVR export uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUploadRequest {
    pub file_name: String,
    pub hash: String,
    pub contents_b64: String,
}
