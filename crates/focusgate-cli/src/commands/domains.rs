use clap::Subcommand;
use focusgate_core::blocklist::BLOCKED_DOMAINS_KEY;
use focusgate_core::{BlockList, FileStore, SettingsStore, Values};

#[derive(Subcommand)]
pub enum DomainsAction {
    /// List blocked domains
    List,
    /// Block a domain (URLs and "www." prefixes are accepted)
    Add {
        domain: String,
    },
    /// Unblock a domain
    Remove {
        domain: String,
    },
    /// Report whether a URL or host is blocked
    Check {
        target: String,
    },
    /// Restore the default list
    Reset,
}

fn load(store: &FileStore) -> BlockList {
    BlockList::from_value(store.get(BLOCKED_DOMAINS_KEY).as_ref())
}

fn save(store: &mut FileStore, list: &BlockList) -> Result<(), Box<dyn std::error::Error>> {
    let mut values = Values::new();
    values.insert(BLOCKED_DOMAINS_KEY.to_string(), list.to_value());
    store.set(values)?;
    Ok(())
}

pub fn run(action: DomainsAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = FileStore::open_default()?;
    let mut list = load(&store);

    match action {
        DomainsAction::List => {
            for domain in list.domains() {
                println!("{domain}");
            }
        }
        DomainsAction::Add { domain } => {
            if list.add(&domain) {
                save(&mut store, &list)?;
                println!("added");
            } else {
                println!("unchanged");
            }
        }
        DomainsAction::Remove { domain } => {
            if list.remove(&domain) {
                save(&mut store, &list)?;
                println!("removed");
            } else {
                println!("unchanged");
            }
        }
        DomainsAction::Check { target } => {
            let blocked = if target.contains("://") {
                list.is_blocked_url(&target)
            } else {
                list.is_blocked_host(&target)
            };
            println!("{}", if blocked { "blocked" } else { "allowed" });
        }
        DomainsAction::Reset => {
            store.remove(&[BLOCKED_DOMAINS_KEY])?;
            println!("domains reset to defaults");
        }
    }
    Ok(())
}
