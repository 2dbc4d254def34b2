use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use miette::{IntoDiagnostic, Result, WrapErr};
use shared::conversation::DEFAULT_SUGGESTIONS;

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// When set, webhook calls must carry it in `x-webhook-secret`.
    pub webhook_secret: Option<String>,
    pub intents_path: Option<PathBuf>,
    pub suggestions: Vec<String>,
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let present = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let host = present("HOST")
            .map(|host| host.parse::<IpAddr>())
            .transpose()
            .into_diagnostic()
            .wrap_err("HOST is not an IP address")?
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        let port = present("PORT")
            .map(|port| port.parse::<u16>())
            .transpose()
            .into_diagnostic()
            .wrap_err("PORT is not a valid port number")?
            .unwrap_or(DEFAULT_PORT);

        let suggestions = present("WIDGET_SUGGESTIONS")
            .map(|raw| {
                raw.split('|')
                    .map(str::trim)
                    .filter(|label| !label.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_else(|| DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect());

        Ok(Self {
            host,
            port,
            webhook_secret: lookup("WEBHOOK_SECRET").filter(|secret| !secret.is_empty()),
            intents_path: present("INTENTS_PATH").map(PathBuf::from),
            suggestions,
            static_dir: present("STATIC_DIR").map(PathBuf::from),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
