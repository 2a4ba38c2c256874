//! Source and destination endpoints.
//!
//! An `Address` is parsed once at configuration time from either a string
//! (`ssh://user@host:2222/srv/app`, `user@host:/srv/app`, `/srv/app`) or a
//! key-value mapping (`{host: ..., user: ..., path: ...}`) and never mutated.
//! An address without a host is local.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// How the address was written, so it can be rendered back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressForm {
    Url,
    Scp,
    Path,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub scheme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip)]
    form: AddressForm,
}

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9+.\-]*)://(?:([^@/]*)@)?([^/:?#]*)(?::([^/?#]*))?([^?#]*)$")
            .expect("url pattern is valid")
    })
}

fn scp_pattern() -> &'static Regex {
    static SCP: OnceLock<Regex> = OnceLock::new();
    SCP.get_or_init(|| {
        Regex::new(r"^(?:([^@/:\s]+)@)?([^@/:\s]+):(.*)$").expect("scp pattern is valid")
    })
}

fn user_host_pattern() -> &'static Regex {
    static USER_HOST: OnceLock<Regex> = OnceLock::new();
    USER_HOST.get_or_init(|| {
        Regex::new(r"^([^@/:\s]+)@([^@/:\s]+)$").expect("user@host pattern is valid")
    })
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|v| !v.is_empty()).map(str::to_string)
}

fn parse_port(key: &str, raw: &str) -> Result<u16> {
    raw.parse::<u16>().map_err(|_| {
        Error::config_invalid_value(key, Some(raw.to_string()), "port must be a number between 0 and 65535")
    })
}

impl Address {
    /// Parse an address from its string form.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::config_invalid_value(
                "address",
                None,
                "address must not be empty",
            ));
        }

        if let Some(caps) = url_pattern().captures(input) {
            // drop any password embedded in the userinfo
            let user = caps
                .get(2)
                .map(|m| m.as_str().split(':').next().unwrap_or_default());
            let port = match caps.get(4).map(|m| m.as_str()).filter(|p| !p.is_empty()) {
                Some(raw) => Some(parse_port("port", raw)?),
                None => None,
            };
            return Ok(Self {
                scheme: caps[1].to_ascii_lowercase(),
                user: non_empty(user),
                host: non_empty(caps.get(3).map(|m| m.as_str())),
                port,
                path: non_empty(caps.get(5).map(|m| m.as_str())),
                form: AddressForm::Url,
            });
        }

        if input.contains("://") {
            return Err(Error::config_invalid_value(
                "address",
                Some(input.to_string()),
                "malformed URI",
            ));
        }

        if let Some(caps) = scp_pattern().captures(input) {
            return Ok(Self {
                scheme: "ssh".to_string(),
                user: non_empty(caps.get(1).map(|m| m.as_str())),
                host: non_empty(caps.get(2).map(|m| m.as_str())),
                port: None,
                path: non_empty(caps.get(3).map(|m| m.as_str())),
                form: AddressForm::Scp,
            });
        }

        if let Some(caps) = user_host_pattern().captures(input) {
            return Ok(Self {
                scheme: "ssh".to_string(),
                user: Some(caps[1].to_string()),
                host: Some(caps[2].to_string()),
                port: None,
                path: None,
                form: AddressForm::Scp,
            });
        }

        Ok(Self::local(input))
    }

    /// An address pointing at a directory on this machine.
    pub fn local(path: &str) -> Self {
        Self {
            scheme: "file".to_string(),
            user: None,
            host: None,
            port: None,
            path: Some(path.to_string()),
            form: AddressForm::Path,
        }
    }

    /// Build an address from a normalized configuration value: either a
    /// string or a mapping with `scheme`, `user`, `host`, `port`, `path`.
    pub fn from_value(key: &str, value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Object(map) => {
                let field = |name: &str| -> Result<Option<String>> {
                    match map.get(name) {
                        None | Some(Value::Null) => Ok(None),
                        Some(Value::String(s)) => Ok(non_empty(Some(s.as_str()))),
                        Some(Value::Number(n)) => Ok(Some(n.to_string())),
                        Some(other) => Err(Error::config_invalid_value(
                            format!("{}.{}", key, name),
                            Some(other.to_string()),
                            "expected a string",
                        )),
                    }
                };

                let host = field("host")?;
                let port = match field("port")? {
                    Some(raw) => Some(parse_port(&format!("{}.port", key), &raw)?),
                    None => None,
                };
                let scheme = field("scheme")?
                    .map(|s| s.to_ascii_lowercase())
                    .unwrap_or_else(|| if host.is_some() { "ssh" } else { "file" }.to_string());
                let form = if host.is_some() {
                    AddressForm::Url
                } else {
                    AddressForm::Path
                };

                Ok(Self {
                    scheme,
                    user: field("user")?,
                    host,
                    port,
                    path: field("path")?,
                    form,
                })
            }
            other => Err(Error::config_invalid_value(
                key,
                Some(other.to_string()),
                format!("'{}' must contain either a mapping or a string", key),
            )),
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Host-less (or `file://`) addresses are executed locally.
    pub fn is_local(&self) -> bool {
        self.host.is_none() || self.scheme == "file"
    }

    /// `user@host` (or `host`) for handing to `ssh`.
    pub fn ssh_target(&self) -> Result<String> {
        let host = self.host.as_deref().ok_or_else(|| {
            Error::config_invalid_value(
                "dest",
                Some(self.to_string()),
                format!("URI does not have a host: {}", self),
            )
        })?;

        Ok(match &self.user {
            Some(user) => format!("{}@{}", user, host),
            None => host.to_string(),
        })
    }

    /// `user@host:path` for handing to `rsync`. Local addresses render as
    /// their bare path.
    pub fn rsync_target(&self) -> String {
        let path = self.path.as_deref().unwrap_or_default();
        match &self.host {
            Some(host) if !self.is_local() => {
                let mut target = match &self.user {
                    Some(user) => format!("{}@{}", user, host),
                    None => host.clone(),
                };
                if !path.is_empty() {
                    target.push(':');
                    target.push_str(path);
                }
                target
            }
            _ => path.to_string(),
        }
    }

    /// Short label used as a status prefix and in reports.
    pub fn label(&self) -> String {
        match (&self.host, self.is_local()) {
            (Some(host), false) => host.clone(),
            _ => "local".to_string(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.as_deref().unwrap_or_default();
        match self.form {
            AddressForm::Path => write!(f, "{}", path),
            AddressForm::Scp => {
                if let Some(user) = &self.user {
                    write!(f, "{}@", user)?;
                }
                write!(f, "{}", self.host.as_deref().unwrap_or_default())?;
                if self.path.is_some() {
                    write!(f, ":{}", path)?;
                }
                Ok(())
            }
            AddressForm::Url => {
                write!(f, "{}://", self.scheme)?;
                if let Some(user) = &self.user {
                    write!(f, "{}@", user)?;
                }
                write!(f, "{}", self.host.as_deref().unwrap_or_default())?;
                if let Some(port) = self.port {
                    write!(f, ":{}", port)?;
                }
                if !path.is_empty() && !path.starts_with('/') {
                    write!(f, "/")?;
                }
                write!(f, "{}", path)
            }
        }
    }
}
