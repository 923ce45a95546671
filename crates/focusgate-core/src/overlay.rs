//! What a blocked page should put in front of the user.

use serde::{Deserialize, Serialize};

use crate::gate::{GateStatus, Mode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "camelCase")]
pub enum OverlayView {
    /// Page is not blocked, or the gate is unlocked.
    Hidden,
    /// Offer to start a focus challenge or close the tab.
    LockedPrompt,
    /// Challenge running; show the countdown.
    Focusing { remaining: String },
}

impl OverlayView {
    pub fn for_status(status: &GateStatus, is_blocked: bool) -> Self {
        if !is_blocked {
            return OverlayView::Hidden;
        }
        match status.mode {
            Mode::Unlocked => OverlayView::Hidden,
            Mode::Locked => OverlayView::LockedPrompt,
            Mode::Focusing => OverlayView::Focusing {
                remaining: format_duration(status.remaining_focus_ms),
            },
        }
    }

    pub fn is_shown(&self) -> bool {
        !matches!(self, OverlayView::Hidden)
    }
}

/// `H:MM:SS` from one hour up, `M:SS` below. Partial seconds round up so the
/// countdown never shows `0:00` while time is left.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms.div_ceil(1000);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
