use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::Mode;

/// Every mode transition or settings change in the gate produces an Event.
/// The message router drains them after each dispatch and logs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Locked -> Focusing.
    FocusStarted {
        required_ms: u64,
        at: DateTime<Utc>,
    },
    /// Focusing -> Unlocked. The full allowance was granted.
    FocusCompleted {
        allowance_ms: u64,
        at: DateTime<Utc>,
    },
    /// Unlocked -> Locked once the viewing allowance ran out.
    AllowanceExhausted {
        focus_required_ms: u64,
        at: DateTime<Utc>,
    },
    SettingsApplied {
        mode: Mode,
        focus_required_ms: u64,
        unlock_allowance_ms: u64,
        at: DateTime<Utc>,
    },
}

/// Converts an epoch-millisecond instant into a timestamp for events.
pub(crate) fn timestamp(epoch_ms: u64) -> DateTime<Utc> {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or_default()
}
