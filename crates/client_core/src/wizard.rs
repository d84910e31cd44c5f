//! Local stage sequencing for multi-page flows.
//!
//! A wizard never consults the server. Each stage set supplies two total
//! transition tables; every move asks the viewport to scroll to the top.

use std::fmt;

use tracing::debug;

/// A fixed stage set with total forward/backward tables.
pub trait StageTable: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    const INITIAL: Self;
    const ALL: &'static [Self];

    fn forward(self) -> Self;
    fn backward(self) -> Self;
    fn as_str(self) -> &'static str;
}

/// Whatever displays the wizard. Stage changes are full-page context switches.
pub trait Viewport {
    fn scroll_to_top(&self);
}

/// Viewport for headless callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoViewport;

impl Viewport for NoViewport {
    fn scroll_to_top(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditWizardStage {
    List,
    BallotAudit,
    Review,
}

impl StageTable for AuditWizardStage {
    const INITIAL: Self = AuditWizardStage::List;
    const ALL: &'static [Self] = &[
        AuditWizardStage::List,
        AuditWizardStage::BallotAudit,
        AuditWizardStage::Review,
    ];

    fn forward(self) -> Self {
        match self {
            AuditWizardStage::List => AuditWizardStage::BallotAudit,
            AuditWizardStage::BallotAudit => AuditWizardStage::Review,
            // The board reviews one ballot at a time, then moves on to the next.
            AuditWizardStage::Review => AuditWizardStage::BallotAudit,
        }
    }

    fn backward(self) -> Self {
        match self {
            AuditWizardStage::List | AuditWizardStage::BallotAudit => AuditWizardStage::List,
            AuditWizardStage::Review => AuditWizardStage::BallotAudit,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            AuditWizardStage::List => "list",
            AuditWizardStage::BallotAudit => "ballot-audit",
            AuditWizardStage::Review => "review",
        }
    }
}

/// State administrator's audit definition pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DosSetupStage {
    AuditInfo,
    SelectContests,
    RandomSeed,
    Review,
}

impl StageTable for DosSetupStage {
    const INITIAL: Self = DosSetupStage::AuditInfo;
    const ALL: &'static [Self] = &[
        DosSetupStage::AuditInfo,
        DosSetupStage::SelectContests,
        DosSetupStage::RandomSeed,
        DosSetupStage::Review,
    ];

    fn forward(self) -> Self {
        match self {
            DosSetupStage::AuditInfo => DosSetupStage::SelectContests,
            DosSetupStage::SelectContests => DosSetupStage::RandomSeed,
            DosSetupStage::RandomSeed | DosSetupStage::Review => DosSetupStage::Review,
        }
    }

    fn backward(self) -> Self {
        match self {
            DosSetupStage::AuditInfo | DosSetupStage::SelectContests => DosSetupStage::AuditInfo,
            DosSetupStage::RandomSeed => DosSetupStage::SelectContests,
            DosSetupStage::Review => DosSetupStage::RandomSeed,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            DosSetupStage::AuditInfo => "audit-info",
            DosSetupStage::SelectContests => "select-contests",
            DosSetupStage::RandomSeed => "random-seed",
            DosSetupStage::Review => "review",
        }
    }
}

/// One wizard instance. Create a fresh machine per mount.
pub struct WizardStageMachine<S, V = NoViewport> {
    stage: S,
    viewport: V,
}

impl<S: StageTable> WizardStageMachine<S, NoViewport> {
    pub fn new() -> Self {
        Self::with_viewport(NoViewport)
    }
}

impl<S: StageTable> Default for WizardStageMachine<S, NoViewport> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StageTable, V: Viewport> WizardStageMachine<S, V> {
    pub fn with_viewport(viewport: V) -> Self {
        Self {
            stage: S::INITIAL,
            viewport,
        }
    }

    pub fn current_stage(&self) -> S {
        self.stage
    }

    pub fn go_forward(&mut self) -> S {
        self.transition(self.stage.forward())
    }

    pub fn go_backward(&mut self) -> S {
        self.transition(self.stage.backward())
    }

    pub fn viewport(&self) -> &V {
        &self.viewport
    }

    fn transition(&mut self, next: S) -> S {
        debug!(from = self.stage.as_str(), to = next.as_str(), "wizard stage");
        self.stage = next;
        self.viewport.scroll_to_top();
        next
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
