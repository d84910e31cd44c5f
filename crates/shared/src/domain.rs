use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(CountyId);
id_newtype!(ContestId);
id_newtype!(CvrId);

/// The human actors that drive an audit. Exactly one is active per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    County,
    AuditBoard,
    StateAdmin,
}

impl ActorRole {
    pub const ALL: [ActorRole; 3] = [
        ActorRole::County,
        ActorRole::AuditBoard,
        ActorRole::StateAdmin,
    ];

    /// The dashboard an actor works from. The audit board shares the county
    /// login, so both map to the county dashboard.
    pub fn dashboard(self) -> Dashboard {
        match self {
            ActorRole::County | ActorRole::AuditBoard => Dashboard::County,
            ActorRole::StateAdmin => Dashboard::Sos,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActorRole::County => "county",
            ActorRole::AuditBoard => "audit_board",
            ActorRole::StateAdmin => "state_admin",
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dashboard {
    County,
    Sos,
}

impl Dashboard {
    /// Roles whose pollers belong to this dashboard.
    pub fn roles(self) -> &'static [ActorRole] {
        match self {
            Dashboard::County => &[ActorRole::County, ActorRole::AuditBoard],
            Dashboard::Sos => &[ActorRole::StateAdmin],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionType {
    Coordinated,
    Primary,
    General,
    Recall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditBoardMember {
    pub first_name: String,
    pub last_name: String,
    pub political_party: String,
}
