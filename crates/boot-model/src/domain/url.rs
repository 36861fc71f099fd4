use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use url::{Host, Url};

use crate::ModelError;

/// Service endpoint: `scheme://host[:port][/path]`.
///
/// Parsing validates through [`Url`], but the authority is kept exactly as written so the
/// string form stays stable as a map key in the config document.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceUrl {
    pub scheme: String,
    pub host: String,
    pub path: String,
}

impl ServiceUrl {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: String::new(),
        }
    }

    fn to_url(&self) -> Result<Url, ModelError> {
        let raw = self.to_string();
        Url::parse(&raw).map_err(|e| ModelError::InvalidUrl {
            url: raw,
            reason: e.to_string(),
        })
    }

    /// Explicit port, or the scheme default (443 for `https`/`wss`, otherwise 80).
    pub fn port(&self) -> Result<String, ModelError> {
        let port = self.to_url()?.port_or_known_default().unwrap_or(80);
        Ok(port.to_string())
    }

    /// Host without port (brackets stripped for IPv6).
    pub fn hostname(&self) -> String {
        match self.to_url().ok().as_ref().and_then(Url::host) {
            Some(Host::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => self.host.clone(),
        }
    }
}

impl fmt::Display for ServiceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.host, self.path)
    }
}

impl FromStr for ServiceUrl {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: &str| ModelError::InvalidUrl {
            url: s.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(s).map_err(|e| invalid(&e.to_string()))?;
        if parsed.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }
        let (_, rest) = s.split_once("://").ok_or_else(|| invalid("missing authority"))?;
        let (host, path) = match rest.find(['/', '?', '#']) {
            Some(i) => rest.split_at(i),
            None => (rest, ""),
        };
        Ok(Self {
            scheme: parsed.scheme().to_string(),
            host: host.to_string(),
            path: path.to_string(),
        })
    }
}

impl Serialize for ServiceUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ServiceUrl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Deserialize an optional URL, treating `""` as absent.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<ServiceUrl>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let u: ServiceUrl = "https://localhost:8000".parse().unwrap();
        assert_eq!(u.scheme, "https");
        assert_eq!(u.host, "localhost:8000");
        assert_eq!(u.path, "");
        assert_eq!(u.to_string(), "https://localhost:8000");

        let u: ServiceUrl = "wss://example.com/websocket".parse().unwrap();
        assert_eq!(u.path, "/websocket");
        assert_eq!(u.to_string(), "wss://example.com/websocket");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("localhost:8000".parse::<ServiceUrl>().is_err());
        assert!("http://".parse::<ServiceUrl>().is_err());
        assert!("://x".parse::<ServiceUrl>().is_err());
    }

    #[test]
    fn parse_rejects_bad_ports() {
        for bad in ["http://localhost:notaport", "http://localhost:70000", "https://h:-1"] {
            match bad.parse::<ServiceUrl>() {
                Err(ModelError::InvalidUrl { url, .. }) => assert_eq!(url, bad),
                other => panic!("{bad}: unexpected {other:?}"),
            }
        }
        assert!("http://localhost:65535".parse::<ServiceUrl>().is_ok());
    }

    #[test]
    fn explicit_default_port_is_kept_in_string_form() {
        let u: ServiceUrl = "https://Example.com:443".parse().unwrap();
        assert_eq!(u.to_string(), "https://Example.com:443");
        assert_eq!(u.port().unwrap(), "443");
        assert_eq!(u.hostname(), "example.com");
    }

    #[test]
    fn port_defaults_by_scheme() {
        assert_eq!(ServiceUrl::new("https", "h").port().unwrap(), "443");
        assert_eq!(ServiceUrl::new("wss", "h").port().unwrap(), "443");
        assert_eq!(ServiceUrl::new("http", "h").port().unwrap(), "80");
        assert_eq!(ServiceUrl::new("http", "h:9").port().unwrap(), "9");
        assert_eq!(ServiceUrl::new("http", "[::1]").port().unwrap(), "80");
        assert_eq!(ServiceUrl::new("http", "[::1]:81").port().unwrap(), "81");
    }

    #[test]
    fn hostname_strips_port() {
        assert_eq!(ServiceUrl::new("http", "h:9").hostname(), "h");
        assert_eq!(ServiceUrl::new("http", "[::1]:9").hostname(), "::1");
        assert_eq!(ServiceUrl::new("http", "h").hostname(), "h");
    }
}
