use std::time::Duration;

use rotor_proto::{DEFAULT_HTTP_PORT, DEFAULT_STREAM_PORT};
use thiserror::Error;
use url::Url;

use crate::link::RECONNECT_DELAY;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid controller host {0:?}")]
    InvalidHost(String),
    #[error("invalid controller url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Where the controller lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub host: String,
    pub http_port: u16,
    pub stream_port: u16,
    pub tls: bool,
    pub reconnect_delay: Duration,
}

impl EndpointConfig {
    /// Parse a bare host (`10.0.0.7`, `rotor.local`) or a host with a
    /// scheme prefix. `wss://` and `https://` select TLS.
    pub fn new(host: &str) -> Result<Self, ConfigError> {
        let trimmed = host.trim();
        let (tls, rest) = match trimmed.split_once("://") {
            Some(("wss" | "https", rest)) => (true, rest),
            Some(("ws" | "http", rest)) => (false, rest),
            Some(_) => return Err(ConfigError::InvalidHost(host.to_owned())),
            None => (false, trimmed),
        };
        let rest = rest.trim_end_matches('/');
        if rest.is_empty() || rest.contains('/') || rest.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidHost(host.to_owned()));
        }
        // Avoid resolving localhost to ::1 when the controller only listens on v4.
        let host = if rest == "localhost" {
            "127.0.0.1".to_owned()
        } else {
            rest.to_owned()
        };

        let config = Self {
            host,
            http_port: DEFAULT_HTTP_PORT,
            stream_port: DEFAULT_STREAM_PORT,
            tls,
            reconnect_delay: RECONNECT_DELAY,
        };
        config.stream_url()?;
        Ok(config)
    }

    pub fn with_ports(mut self, http_port: u16, stream_port: u16) -> Self {
        self.http_port = http_port;
        self.stream_port = stream_port;
        self
    }

    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// `ws://host:81/`, or `wss://` with TLS.
    pub fn stream_url(&self) -> Result<Url, ConfigError> {
        let scheme = if self.tls { "wss" } else { "ws" };
        Ok(Url::parse(&format!(
            "{scheme}://{}:{}/",
            self.host, self.stream_port
        ))?)
    }

    /// Base URL for control requests. The port is elided when it is the
    /// scheme default.
    pub fn http_base(&self) -> Result<Url, ConfigError> {
        let scheme = if self.tls { "https" } else { "http" };
        Ok(Url::parse(&format!(
            "{scheme}://{}:{}/",
            self.host, self.http_port
        ))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_default_urls() {
        let config = EndpointConfig::new("10.0.0.7").expect("config");
        assert_eq!(config.stream_url().expect("url").as_str(), "ws://10.0.0.7:81/");
        assert_eq!(config.http_base().expect("url").as_str(), "http://10.0.0.7/");
        assert_eq!(config.reconnect_delay, Duration::from_millis(2_000));
    }

    #[test]
    fn localhost_becomes_loopback_v4() {
        let config = EndpointConfig::new("http://localhost/").expect("config");
        assert_eq!(config.host, "127.0.0.1");
        assert!(!config.tls);
    }

    #[test]
    fn secure_scheme_selects_tls() {
        let config = EndpointConfig::new("wss://rotor.example")
            .expect("config")
            .with_ports(8443, 8444);
        assert!(config.tls);
        assert_eq!(
            config.stream_url().expect("url").as_str(),
            "wss://rotor.example:8444/"
        );
        assert_eq!(
            config.http_base().expect("url").as_str(),
            "https://rotor.example:8443/"
        );
    }

    #[test]
    fn rejects_unusable_hosts() {
        for bad in ["", "   ", "ftp://rotor", "rotor/api", "ro tor"] {
            assert!(
                matches!(EndpointConfig::new(bad), Err(ConfigError::InvalidHost(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
