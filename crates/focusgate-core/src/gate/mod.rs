mod engine;
mod settings;
mod tabs;

pub use engine::{GateEngine, GateState, GateStatus, Mode, MAX_BUFFERED_EVENTS};
pub use settings::{
    clamp_minutes, Settings, DEFAULT_FOCUS_REQUIRED_MINUTES, DEFAULT_UNLOCK_MINUTES,
    FOCUS_REQUIRED_KEY, UNLOCK_MINUTES_KEY,
};
pub use tabs::{TabActivityTracker, TabId};
