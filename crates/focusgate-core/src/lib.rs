//! # Focusgate Core Library
//!
//! Gates access to a list of distracting sites behind a focus challenge:
//! the user has to stay focused for a configured time before being granted a
//! viewing allowance, and that allowance only drains while a blocked page is
//! actually in front of them.
//!
//! ## Architecture
//!
//! - **Gate Engine**: A wall-clock-based state machine with no timer of its
//!   own. Every status query or tab event reconciles it with the clock.
//! - **Tab Tracking**: Which tab is active and which tabs show a visible
//!   blocked page.
//! - **Storage**: Key/value settings with change notifications, kept in TOML.
//! - **Router**: Extension message and browser event dispatch.
//!
//! ## Key Components
//!
//! - [`GateEngine`]: Core gate state machine
//! - [`MessageRouter`]: Message dispatch onto the engine
//! - [`SettingsStore`]: Settings persistence contract
//! - [`BlockList`]: Blocked-domain matching

pub mod blocklist;
pub mod clock;
pub mod error;
pub mod events;
pub mod gate;
pub mod overlay;
pub mod router;
pub mod storage;

pub use blocklist::{normalize_domain, BlockList};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, Result};
pub use events::Event;
pub use gate::{
    GateEngine, GateState, GateStatus, Mode, Settings, TabActivityTracker, TabId,
    MAX_BUFFERED_EVENTS,
};
pub use overlay::{format_duration, OverlayView};
pub use router::{BrowserHost, HostEvent, Message, MessageRouter, MessageSender, Reply};
pub use storage::{FileStore, MemoryStore, SettingsStore, StorageChange, StorageChanges, Values};
