//! ICE server list construction.
//!
//! STUN is always present. Each configured TURN entry is either passed through
//! (when it already names a scheme) or expanded into a UDP and a TCP variant.

use crate::model::IceServerConfig;

pub const DEFAULT_STUN_SERVERS: &[&str] = &[
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
];

const ICE_SCHEMES: &[&str] = &["turn:", "turns:", "stun:", "stuns:"];

/// One configured TURN server. `url` is either a full URI or a bare `host:port`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnServerConfig {
    pub url: String,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl TurnServerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            credential: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, credential: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.credential = Some(credential.into());
        self
    }
}

pub fn resolve_ice_servers(stun: &[String], turn: &[TurnServerConfig]) -> Vec<IceServerConfig> {
    let mut servers: Vec<IceServerConfig> = stun
        .iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(|url| bare_server(url.to_owned()))
        .collect();

    if servers.is_empty() {
        servers = DEFAULT_STUN_SERVERS
            .iter()
            .map(|url| bare_server((*url).to_owned()))
            .collect();
    }

    for entry in turn {
        let url = entry.url.trim();
        if url.is_empty() {
            continue;
        }

        if has_scheme(url) {
            servers.push(with_credentials(url.to_owned(), entry));
        } else {
            servers.push(with_credentials(format!("turn:{url}?transport=udp"), entry));
            servers.push(with_credentials(format!("turn:{url}?transport=tcp"), entry));
        }
    }

    servers
}

fn has_scheme(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ICE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

fn bare_server(url: String) -> IceServerConfig {
    IceServerConfig {
        urls: vec![url],
        username: None,
        credential: None,
    }
}

fn with_credentials(url: String, entry: &TurnServerConfig) -> IceServerConfig {
    IceServerConfig {
        urls: vec![url],
        username: non_empty(&entry.username),
        credential: non_empty(&entry.credential),
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
