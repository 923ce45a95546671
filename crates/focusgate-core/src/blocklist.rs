//! Blocked-domain list and host matching.
//!
//! Entries are normalized to a bare lowercase hostname without a leading
//! `www.`. A host is blocked when it equals an entry or is a subdomain of one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

pub const BLOCKED_DOMAINS_KEY: &str = "blockedDomains";
pub const DEFAULT_BLOCKED_DOMAINS: [&str; 2] = ["bilibili.com", "b23.tv"];

/// Reduce user input (`"https://WWW.Example.com/path"`, `" example.com "`)
/// to a hostname. Returns an empty string for blank input.
pub fn normalize_domain(value: &str) -> String {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return String::new();
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.clone()
    } else {
        format!("https://{trimmed}")
    };
    let host = Url::parse(&with_scheme)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
        .unwrap_or(trimmed);
    strip_www(&host).to_string()
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockList {
    domains: Vec<String>,
}

impl Default for BlockList {
    fn default() -> Self {
        Self::from_entries(DEFAULT_BLOCKED_DOMAINS)
    }
}

impl BlockList {
    pub fn empty() -> Self {
        Self {
            domains: Vec::new(),
        }
    }

    /// Normalizes each entry, dropping blanks and duplicates.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::empty();
        for entry in entries {
            list.add(entry.as_ref());
        }
        list
    }

    /// Reads the stored value. Anything but an array falls back to the
    /// defaults; non-string array items are skipped.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_array) {
            Some(items) => Self::from_entries(items.iter().filter_map(Value::as_str)),
            None => Self::default(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::from(self.domains.clone())
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Returns `false` when the input is blank or already listed.
    pub fn add(&mut self, input: &str) -> bool {
        let domain = normalize_domain(input);
        if domain.is_empty() || self.domains.contains(&domain) {
            return false;
        }
        self.domains.push(domain);
        true
    }

    /// Returns `false` when nothing matched.
    pub fn remove(&mut self, input: &str) -> bool {
        let domain = normalize_domain(input);
        let before = self.domains.len();
        self.domains.retain(|d| *d != domain);
        self.domains.len() != before
    }

    pub fn is_blocked_host(&self, host: &str) -> bool {
        let host = host.trim().to_lowercase();
        let host = strip_www(&host);
        self.domains.iter().any(|domain| {
            host == domain
                || host
                    .strip_suffix(domain.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// Whether a page URL is on a blocked host. Unparseable URLs are not.
    pub fn is_blocked_url(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|url| url.host_str().map(|host| self.is_blocked_host(host)))
            .unwrap_or(false)
    }
}
