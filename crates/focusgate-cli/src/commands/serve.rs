//! Line-oriented message host.
//!
//! Each stdin line is either a page message wrapped with its sender tab,
//! `{"tabId": 3, "message": {"type": "getStatus"}}`, or a browser event,
//! `{"event": "tabActivated", "tabId": 3}`. Every line gets exactly one reply
//! line. Commands for the browser (`{"command": "closeTab", "tabId": 3}`) are
//! written just before the reply that caused them.

use std::io::{self, BufRead, Write};

use focusgate_core::{
    BrowserHost, Clock, FileStore, HostEvent, MessageRouter, MessageSender, Reply, TabId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum HostCommand {
    CloseTab {
        #[serde(rename = "tabId")]
        tab_id: TabId,
    },
}

/// Browser host that queues commands for the serve loop to write out.
#[derive(Debug, Default)]
pub struct QueuedHost {
    pending: Vec<HostCommand>,
}

impl QueuedHost {
    pub fn drain(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.pending)
    }
}

impl BrowserHost for QueuedHost {
    fn close_tab(&mut self, tab: TabId) -> focusgate_core::Result<()> {
        self.pending.push(HostCommand::CloseTab { tab_id: tab });
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Inbound {
    Event(HostEvent),
    Message {
        #[serde(default, rename = "tabId")]
        tab_id: Option<TabId>,
        message: Value,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open_default()?;
    let mut router = MessageRouter::new(QueuedHost::default());
    router.load_settings(&store);
    info!(settings = %store.path().display(), "Serving gate on stdin/stdout");

    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(&mut router, stdin.lock(), stdout.lock())?;
    Ok(())
}

pub fn serve<C, R, W>(
    router: &mut MessageRouter<QueuedHost, C>,
    reader: R,
    mut writer: W,
) -> io::Result<()>
where
    C: Clock,
    R: BufRead,
    W: Write,
{
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Inbound>(&line) {
            Ok(Inbound::Event(event)) => {
                router.handle_host_event(event);
                Reply::ack()
            }
            Ok(Inbound::Message { tab_id, message }) => {
                router.handle_value(message, MessageSender { tab_id })
            }
            Err(e) => {
                warn!(error = %e, "Unreadable input line");
                Reply::nack()
            }
        };

        for command in router.host_mut().drain() {
            serde_json::to_writer(&mut writer, &command)?;
            writeln!(writer)?;
        }
        serde_json::to_writer(&mut writer, &reply)?;
        writeln!(writer)?;
        writer.flush()?;
    }
    Ok(())
}
