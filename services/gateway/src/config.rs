//! Gateway configuration, from flags with environment fallbacks.

use clap::Parser;
use std::convert::Infallible;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use wskeyid_handshake::HandshakePolicy;

/// Which browser origins may open a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    Any,
    AllowList(Vec<String>),
}

impl OriginPolicy {
    /// Requests without an `Origin` header come from non-browser clients and
    /// are always let through.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (Self::Any, _) | (_, None) => true,
            (Self::AllowList(allowed), Some(origin)) => {
                let origin = origin.trim_end_matches('/');
                allowed.iter().any(|a| a.eq_ignore_ascii_case(origin))
            }
        }
    }
}

/// `*` for any origin, otherwise a comma-separated list.
impl FromStr for OriginPolicy {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let origins: Vec<String> = s
            .split(',')
            .map(|o| o.trim().trim_end_matches('/'))
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            Ok(Self::Any)
        } else {
            Ok(Self::AllowList(origins))
        }
    }
}

impl fmt::Display for OriginPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::AllowList(origins) => f.write_str(&origins.join(",")),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "wskeyid-gateway")]
#[command(about = "WebSocket gateway with key-identity authentication")]
pub struct GatewayConfig {
    /// Address to listen on
    #[arg(long, env = "WSKEYID_LISTEN_ADDR", default_value = "0.0.0.0:8001")]
    pub listen_addr: SocketAddr,

    /// Query parameter carrying the client identifier
    #[arg(long, env = "WSKEYID_CLIENT_ID_PARAM", default_value = "client_id")]
    pub client_id_param: String,

    /// Allowed origins, comma-separated, or "*" for any
    #[arg(long = "allowed-origins", env = "WSKEYID_ALLOWED_ORIGINS", default_value = "*")]
    pub origins: OriginPolicy,

    /// Seconds a peer has to complete the handshake
    #[arg(long, env = "WSKEYID_HANDSHAKE_TIMEOUT_SECS", default_value_t = 30)]
    pub handshake_timeout_secs: u64,

    /// JSON directory of registered clients; without it identifiers must
    /// embed their own key
    #[arg(long, env = "WSKEYID_DIRECTORY")]
    pub directory: Option<PathBuf>,

    /// Reject responses that do not sign the exact challenge issued
    #[arg(long, env = "WSKEYID_REQUIRE_ECHOED_CHALLENGE")]
    pub require_echoed_challenge: bool,
}

impl GatewayConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn policy(&self) -> HandshakePolicy {
        HandshakePolicy {
            require_echoed_challenge: self.require_echoed_challenge,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: ([0, 0, 0, 0], 8001).into(),
            client_id_param: "client_id".to_string(),
            origins: OriginPolicy::Any,
            handshake_timeout_secs: 30,
            directory: None,
            require_echoed_challenge: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_policy_parse() {
        assert_eq!("*".parse::<OriginPolicy>().unwrap(), OriginPolicy::Any);
        assert_eq!("".parse::<OriginPolicy>().unwrap(), OriginPolicy::Any);
        assert_eq!(
            "https://a.example, https://b.example/"
                .parse::<OriginPolicy>()
                .unwrap(),
            OriginPolicy::AllowList(vec![
                "https://a.example".into(),
                "https://b.example".into()
            ])
        );
    }

    #[test]
    fn test_origin_policy_allows() {
        let policy: OriginPolicy = "https://app.example".parse().unwrap();
        assert!(policy.allows(Some("https://app.example")));
        assert!(policy.allows(Some("HTTPS://APP.EXAMPLE/")));
        assert!(!policy.allows(Some("https://evil.example")));
        assert!(policy.allows(None));
        assert!(OriginPolicy::Any.allows(Some("https://evil.example")));
    }

    #[test]
    fn test_defaults_match_parser() {
        let parsed = GatewayConfig::try_parse_from(["wskeyid-gateway"]).unwrap();
        let default = GatewayConfig::default();
        assert_eq!(parsed.listen_addr, default.listen_addr);
        assert_eq!(parsed.client_id_param, default.client_id_param);
        assert_eq!(parsed.origins, default.origins);
        assert_eq!(parsed.handshake_timeout(), Duration::from_secs(30));
        assert!(!parsed.policy().require_echoed_challenge);
    }

    #[test]
    fn test_flags() {
        let config = GatewayConfig::try_parse_from([
            "wskeyid-gateway",
            "--listen-addr",
            "127.0.0.1:9000",
            "--client-id-param",
            "id",
            "--allowed-origins",
            "https://app.example",
            "--handshake-timeout-secs",
            "5",
            "--directory",
            "/etc/wskeyid/clients.json",
            "--require-echoed-challenge",
        ])
        .unwrap();
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.client_id_param, "id");
        assert!(!config.origins.allows(Some("https://other.example")));
        assert_eq!(config.handshake_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.directory,
            Some(PathBuf::from("/etc/wskeyid/clients.json"))
        );
        assert!(config.policy().require_echoed_challenge);
    }
}
