//! Audit State Machine alphabets.
//!
//! The server owns every transition; clients only mirror the current state.
//! Each alphabet lists its initial sentinel first.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ActorRole;

macro_rules! asm_alphabet {
    ($name:ident, $initial:ident, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const INITIAL: $name = $name::$initial;
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($wire => Ok($name::$variant),)+
                    other => Err(other.to_string()),
                }
            }
        }
    };
}

asm_alphabet!(CountyAsmState, CountyInitialState, {
    CountyInitialState => "COUNTY_INITIAL_STATE",
    UploadingBallotManifest => "UPLOADING_BALLOT_MANIFEST",
    BallotManifestOk => "BALLOT_MANIFEST_OK",
    UploadingCvrs => "UPLOADING_CVRS",
    CvrsOk => "CVRS_OK",
    BallotManifestAndCvrsOk => "BALLOT_MANIFEST_AND_CVRS_OK",
    CountyAuditUnderway => "COUNTY_AUDIT_UNDERWAY",
    CountyAuditComplete => "COUNTY_AUDIT_COMPLETE",
    DeadlineMissed => "DEADLINE_MISSED",
});

asm_alphabet!(AuditBoardAsmState, AuditInitialState, {
    AuditInitialState => "AUDIT_INITIAL_STATE",
    WaitingForRoundStart => "WAITING_FOR_ROUND_START",
    WaitingForRoundStartNoAuditBoard => "WAITING_FOR_ROUND_START_NO_AUDIT_BOARD",
    RoundInProgress => "ROUND_IN_PROGRESS",
    RoundInProgressNoAuditBoard => "ROUND_IN_PROGRESS_NO_AUDIT_BOARD",
    WaitingForRoundSignOff => "WAITING_FOR_ROUND_SIGN_OFF",
    WaitingForRoundSignOffNoAuditBoard => "WAITING_FOR_ROUND_SIGN_OFF_NO_AUDIT_BOARD",
    AuditComplete => "AUDIT_COMPLETE",
    UnableToAudit => "UNABLE_TO_AUDIT",
    AuditAborted => "AUDIT_ABORTED",
});

asm_alphabet!(DosAsmState, DosInitialState, {
    DosInitialState => "DOS_INITIAL_STATE",
    PartialAuditInfoSet => "PARTIAL_AUDIT_INFO_SET",
    CompleteAuditInfoSet => "COMPLETE_AUDIT_INFO_SET",
    DosAuditOngoing => "DOS_AUDIT_ONGOING",
    DosRoundComplete => "DOS_ROUND_COMPLETE",
    DosAuditComplete => "DOS_AUDIT_COMPLETE",
    AuditResultsPublished => "AUDIT_RESULTS_PUBLISHED",
});

/// Which server-side machine a state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AsmRole {
    County,
    AuditBoard,
    Dos,
}

impl AsmRole {
    pub const ALL: [AsmRole; 3] = [AsmRole::County, AsmRole::AuditBoard, AsmRole::Dos];

    pub fn initial(self) -> AsmState {
        match self {
            AsmRole::County => AsmState::County(CountyAsmState::INITIAL),
            AsmRole::AuditBoard => AsmState::AuditBoard(AuditBoardAsmState::INITIAL),
            AsmRole::Dos => AsmState::Dos(DosAsmState::INITIAL),
        }
    }

    /// Every legal state of this machine, sentinel first.
    pub fn alphabet(self) -> Vec<AsmState> {
        match self {
            AsmRole::County => CountyAsmState::ALL
                .iter()
                .copied()
                .map(AsmState::County)
                .collect(),
            AsmRole::AuditBoard => AuditBoardAsmState::ALL
                .iter()
                .copied()
                .map(AsmState::AuditBoard)
                .collect(),
            AsmRole::Dos => DosAsmState::ALL.iter().copied().map(AsmState::Dos).collect(),
        }
    }

    pub fn parse_state(self, value: &str) -> Result<AsmState, UnknownAsmState> {
        let unknown = |_| UnknownAsmState {
            role: self,
            value: value.to_string(),
        };
        match self {
            AsmRole::County => value.parse().map(AsmState::County).map_err(unknown),
            AsmRole::AuditBoard => value.parse().map(AsmState::AuditBoard).map_err(unknown),
            AsmRole::Dos => value.parse().map(AsmState::Dos).map_err(unknown),
        }
    }
}

impl From<ActorRole> for AsmRole {
    fn from(role: ActorRole) -> Self {
        match role {
            ActorRole::County => AsmRole::County,
            ActorRole::AuditBoard => AsmRole::AuditBoard,
            ActorRole::StateAdmin => AsmRole::Dos,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsmState {
    County(CountyAsmState),
    AuditBoard(AuditBoardAsmState),
    Dos(DosAsmState),
}

impl AsmState {
    pub fn role(self) -> AsmRole {
        match self {
            AsmState::County(_) => AsmRole::County,
            AsmState::AuditBoard(_) => AsmRole::AuditBoard,
            AsmState::Dos(_) => AsmRole::Dos,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AsmState::County(state) => state.as_str(),
            AsmState::AuditBoard(state) => state.as_str(),
            AsmState::Dos(state) => state.as_str(),
        }
    }

    pub fn is_initial(self) -> bool {
        self == self.role().initial()
    }
}

impl fmt::Display for AsmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {role:?} ASM state '{value}'")]
pub struct UnknownAsmState {
    pub role: AsmRole,
    pub value: String,
}
