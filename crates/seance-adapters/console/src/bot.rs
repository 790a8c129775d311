//! Console bot handle.

use std::any::Any;
use std::sync::Arc;

use seance_core::Bot;

use crate::roster::Roster;

/// A bot account on the console platform.
///
/// Carries the roster handle the way a networked bot carries its API
/// connection; platform queries downcast the erased bot to reach it.
pub struct ConsoleBot {
    self_id: String,
    roster: Arc<Roster>,
}

impl ConsoleBot {
    /// Creates a bot bound to a roster.
    pub fn new(self_id: impl Into<String>, roster: Arc<Roster>) -> Self {
        Self {
            self_id: self_id.into(),
            roster,
        }
    }

    /// The world this bot observes.
    pub fn roster(&self) -> &Arc<Roster> {
        &self.roster
    }
}

impl Bot for ConsoleBot {
    fn self_id(&self) -> &str {
        &self.self_id
    }

    fn adapter_name(&self) -> &str {
        crate::ADAPTER
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl std::fmt::Debug for ConsoleBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleBot")
            .field("self_id", &self.self_id)
            .finish()
    }
}
