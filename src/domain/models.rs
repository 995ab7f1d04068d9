use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::{Duration, Instant};
use url::Url;

use super::{ProbeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// Anything other than "https" (any case) falls back to plain http.
    pub fn from_str_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("https") {
            Scheme::Https
        } else {
            Scheme::Http
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Scheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Scheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Scheme::from_str_lenient(&raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMethod {
    Basic,
    #[default]
    Anonymous,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::Basic => "Basic",
            AuthMethod::Anonymous => "Anonymous",
        }
    }

    pub fn from_str_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("basic") {
            AuthMethod::Basic
        } else {
            AuthMethod::Anonymous
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AuthMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuthMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(AuthMethod::from_str_lenient(&raw))
    }
}

/// The single connection record edited by the operator and persisted by the config store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub scheme: Scheme,
    #[serde(rename = "host_name")]
    pub host: String,
    #[serde(rename = "port_no", deserialize_with = "deserialize_port")]
    pub port: String,
    pub path: String,
    pub query: String,
    pub timeout_seconds: u32,
    #[serde(rename = "authentication_method")]
    pub auth_method: AuthMethod,
    pub user: String,
    pub password: String,
    pub upload_file_path: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Http,
            host: String::new(),
            port: String::new(),
            path: String::new(),
            query: String::new(),
            timeout_seconds: 20,
            auth_method: AuthMethod::Anonymous,
            user: String::new(),
            password: String::new(),
            upload_file_path: String::new(),
        }
    }
}

// Hand-edited files sometimes carry the port as a JSON number.
fn deserialize_port<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortRepr {
        Text(String),
        Number(u64),
    }

    Ok(match PortRepr::deserialize(deserializer)? {
        PortRepr::Text(s) => s,
        PortRepr::Number(n) => n.to_string(),
    })
}

impl ConnectionConfig {
    pub fn port_number(&self) -> Result<u16> {
        match self.port.trim().parse::<u16>() {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(ProbeError::InvalidConfig(format!(
                "port must be a positive integer, got {:?}",
                self.port
            ))),
        }
    }

    /// `scheme://host:port/path/`, with the path normalized.
    pub fn base_address(&self) -> Result<String> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ProbeError::InvalidConfig("host name is empty".into()));
        }
        let port = self.port_number()?;

        Ok(format!(
            "{}://{}:{}/{}",
            self.scheme,
            host,
            port,
            normalize_path(&self.path)
        ))
    }

    /// Identity of the transport connection: the full base address including the query.
    pub fn epoch_key(&self) -> Result<String> {
        let base = self.base_address()?;
        match self.query_string() {
            "" => Ok(base),
            query => Ok(format!("{}?{}", base, query)),
        }
    }

    pub fn request_url(&self, command: &str) -> Result<Url> {
        let mut target = self.base_address()?;
        target.push_str(command.trim_start_matches('/'));
        let query = self.query_string();
        if !query.is_empty() {
            target.push(if target.contains('?') { '&' } else { '?' });
            target.push_str(query);
        }

        Url::parse(&target).map_err(|e| ProbeError::InvalidConfig(format!("Invalid request URI {}: {}", target, e)))
    }

    /// `None` when the configured timeout is zero.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(u64::from(secs))),
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match self.auth_method {
            AuthMethod::Basic => Some(Credentials::new(self.user.clone(), self.password.clone())),
            AuthMethod::Anonymous => None,
        }
    }

    fn query_string(&self) -> &str {
        self.query.trim().trim_start_matches('?')
    }
}

/// Strips leading and trailing slashes and re-appends a single trailing one.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    pub fn to_basic_auth(&self) -> String {
        use base64::Engine;
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", base64::prelude::BASE64_STANDARD.encode(credentials))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Get,
    Post,
}

impl ProbeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeMethod::Get => "GET",
            ProbeMethod::Post => "POST",
        }
    }
}

/// One transport call, as reported to the communication log.
#[derive(Debug, Clone)]
pub struct CallInfo {
    pub id: uuid::Uuid,
    pub method: ProbeMethod,
    pub target: String,
    pub auth: AuthMethod,
    pub started_at: Instant,
}

impl CallInfo {
    pub fn new(method: ProbeMethod, target: String, auth: AuthMethod) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            method,
            target,
            auth,
            started_at: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }
}

impl fmt::Display for CallInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {} (auth: {})", self.id, self.method.as_str(), self.target, self.auth)
    }
}
