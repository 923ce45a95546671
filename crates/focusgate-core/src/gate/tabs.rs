use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Browser tab identifier as handed out by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks which tab has focus and, per tab, whether its page last reported
/// itself as a blocked domain that is visible to the user.
///
/// This is pure bookkeeping. Decay checkpoints around these updates are the
/// engine's job, see [`GateEngine::set_active_tab`](super::GateEngine::set_active_tab).
#[derive(Debug, Clone, Default)]
pub struct TabActivityTracker {
    active_tab: Option<TabId>,
    blocked_visible: HashMap<TabId, bool>,
}

impl TabActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.active_tab
    }

    pub fn is_active(&self, tab: TabId) -> bool {
        self.active_tab == Some(tab)
    }

    pub fn set_active_tab(&mut self, tab: TabId) {
        self.active_tab = Some(tab);
    }

    pub fn report_tab_state(&mut self, tab: TabId, is_blocked: bool, is_visible: bool) {
        self.blocked_visible.insert(tab, is_blocked && is_visible);
    }

    pub fn remove_tab(&mut self, tab: TabId) {
        self.blocked_visible.remove(&tab);
        if self.active_tab == Some(tab) {
            self.active_tab = None;
        }
    }

    /// False when nothing is focused or the focused tab never reported.
    pub fn is_active_tab_blocked_visible(&self) -> bool {
        self.active_tab
            .and_then(|tab| self.blocked_visible.get(&tab).copied())
            .unwrap_or(false)
    }

    pub fn tracked_tabs(&self) -> usize {
        self.blocked_visible.len()
    }
}
