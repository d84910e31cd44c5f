//! Client-side mirror of the server's audit state machines.
//!
//! Instances are keyed by machine and an optional county scope. A write always
//! replaces the previous state; transition legality is the server's concern.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shared::{
    asm::{AsmRole, AsmState},
    domain::CountyId,
};
use tracing::info;

use crate::error::InvariantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AsmKey {
    pub role: AsmRole,
    pub scope: Option<CountyId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AsmInstance {
    pub current_state: AsmState,
    /// Monotonic across the whole registry, survives [`AsmRegistry::clear`].
    pub sequence: u64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AsmRegistry {
    instances: BTreeMap<AsmKey, AsmInstance>,
    sequence: u64,
}

impl AsmRegistry {
    pub fn alphabet(role: AsmRole) -> Vec<AsmState> {
        role.alphabet()
    }

    pub fn set_state(
        &mut self,
        role: AsmRole,
        scope: Option<CountyId>,
        state: AsmState,
    ) -> Result<&AsmInstance, InvariantError> {
        if state.role() != role {
            return Err(InvariantError::RoleMismatch { role, state });
        }

        self.sequence += 1;
        let key = AsmKey { role, scope };
        let previous = self.instances.get(&key).map(|i| i.current_state);
        if previous != Some(state) {
            info!(
                ?role,
                scope = ?scope,
                from = %previous.unwrap_or(role.initial()),
                to = %state,
                "ASM state updated"
            );
        }

        let instance = AsmInstance {
            current_state: state,
            sequence: self.sequence,
            updated_at: Utc::now(),
        };
        self.instances.insert(key, instance);
        Ok(&self.instances[&key])
    }

    /// Last written state, or the machine's initial sentinel.
    pub fn state(&self, role: AsmRole, scope: Option<CountyId>) -> AsmState {
        self.instance(role, scope)
            .map(|i| i.current_state)
            .unwrap_or(role.initial())
    }

    pub fn instance(&self, role: AsmRole, scope: Option<CountyId>) -> Option<&AsmInstance> {
        self.instances.get(&AsmKey { role, scope })
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }
}

#[cfg(test)]
#[path = "tests/asm_tests.rs"]
mod tests;
