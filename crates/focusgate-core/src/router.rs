//! Dispatch of extension messages and host events onto the gate.
//!
//! Messages come from pages (overlay polls, tab state reports, close
//! requests) and carry the sending tab. Host events come from the browser
//! itself. Nothing here fails the channel: a message that cannot be handled
//! gets a negative acknowledgement.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::gate::{GateEngine, GateStatus, Settings, TabId};
use crate::storage::{SettingsStore, StorageChanges};

/// Page-to-background messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Message {
    GetStatus,
    StartFocus,
    #[serde(rename_all = "camelCase")]
    TabState {
        is_blocked: bool,
        is_visible: bool,
    },
    CloseTab,
}

/// Who sent a message. Pages always have a tab; other extension contexts
/// (popup, options) do not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    #[serde(default)]
    pub tab_id: Option<TabId>,
}

impl MessageSender {
    pub fn tab(tab: TabId) -> Self {
        Self { tab_id: Some(tab) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub ok: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Status(GateStatus),
    Ack(Acknowledgement),
}

impl Reply {
    pub fn ack() -> Self {
        Reply::Ack(Acknowledgement { ok: true })
    }

    pub fn nack() -> Self {
        Reply::Ack(Acknowledgement { ok: false })
    }

    pub fn is_nack(&self) -> bool {
        matches!(self, Reply::Ack(Acknowledgement { ok: false }))
    }
}

/// Browser-originated events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostEvent {
    TabActivated {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    TabRemoved {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
    /// The settings store changed underneath us.
    SettingsChanged { changes: StorageChanges },
}

/// Commands the gate delegates back to the browser.
pub trait BrowserHost {
    fn close_tab(&mut self, tab: TabId) -> Result<()>;
}

#[derive(Debug)]
pub struct MessageRouter<H: BrowserHost, C: Clock = SystemClock> {
    engine: GateEngine<C>,
    host: H,
}

impl<H: BrowserHost> MessageRouter<H, SystemClock> {
    pub fn new(host: H) -> Self {
        Self::with_engine(GateEngine::new(), host)
    }
}

impl<H: BrowserHost, C: Clock> MessageRouter<H, C> {
    pub fn with_engine(engine: GateEngine<C>, host: H) -> Self {
        Self { engine, host }
    }

    pub fn engine(&self) -> &GateEngine<C> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GateEngine<C> {
        &mut self.engine
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Startup read of the persisted durations.
    pub fn load_settings(&mut self, store: &dyn SettingsStore) {
        let values = store.get_many(&Settings::defaults_map());
        let (focus, unlock) = Settings::minutes_from_values(&values);
        self.engine.apply_settings(focus, unlock);
        self.flush_events();
    }

    pub fn handle(&mut self, message: Message, sender: MessageSender) -> Reply {
        let reply = match message {
            Message::GetStatus => Reply::Status(self.engine.get_status()),
            Message::StartFocus => Reply::Status(self.engine.start_focus_challenge()),
            Message::TabState {
                is_blocked,
                is_visible,
            } => match sender.tab_id {
                Some(tab) => {
                    self.engine.report_tab_state(tab, is_blocked, is_visible);
                    Reply::ack()
                }
                None => {
                    debug!("Tab state report without a sender tab");
                    Reply::nack()
                }
            },
            Message::CloseTab => match sender.tab_id {
                Some(tab) => match self.host.close_tab(tab) {
                    Ok(()) => Reply::ack(),
                    Err(e) => {
                        warn!(%tab, error = %e, "Browser host failed to close tab");
                        Reply::nack()
                    }
                },
                None => Reply::nack(),
            },
        };
        self.flush_events();
        reply
    }

    /// Like [`handle`](Self::handle) for a message that has not been decoded
    /// yet. Unknown or malformed messages are refused, not raised.
    pub fn handle_value(&mut self, message: Value, sender: MessageSender) -> Reply {
        match serde_json::from_value::<Message>(message) {
            Ok(message) => self.handle(message, sender),
            Err(e) => {
                debug!(error = %e, "Rejecting unrecognized message");
                Reply::nack()
            }
        }
    }

    pub fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::TabActivated { tab_id } => self.engine.set_active_tab(tab_id),
            HostEvent::TabRemoved { tab_id } => self.engine.remove_tab(tab_id),
            HostEvent::SettingsChanged { changes } => self.handle_settings_changes(&changes),
        }
        self.flush_events();
    }

    /// Applies a store change notification. Changes that carry no numeric
    /// duration are ignored.
    pub fn handle_settings_changes(&mut self, changes: &StorageChanges) {
        if let Some((focus, unlock)) = self.engine.settings().minutes_from_changes(changes) {
            self.engine.apply_settings(focus, unlock);
        }
        self.flush_events();
    }

    fn flush_events(&mut self) {
        for event in self.engine.drain_events() {
            info!(event = ?event, "Gate event");
        }
    }
}
