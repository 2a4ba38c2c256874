//! Deployment configuration.
//!
//! The on-disk YAML is loaded into a `serde_json::Value` tree by the project
//! loader; `Configuration::normalize` is the one place that fills defaults and
//! validates it. Nothing downstream re-checks required fields.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::address::Address;
use crate::error::{Error, Result};

/// Source control used when `scm` is not declared: a plain bulk copy.
pub const DEFAULT_SCM: &str = "rsync";

/// Directory (relative to the project root) holding the local staging copy.
pub const STAGING_DIR: &str = ".deploy";

/// Task name to shell commands.
pub type HookMap = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Serialize)]
pub struct ServerDecl {
    pub name: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Configuration {
    /// Name of the environment this configuration belongs to.
    pub environment: String,
    pub scm: String,
    pub source: Address,
    pub dest: Vec<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerDecl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orm: Option<String>,
    pub exclude: BTreeSet<String>,
    pub debug: bool,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub before: HookMap,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub after: HookMap,
    pub staging: PathBuf,
}

/// Strip the leading `:` from symbol-style keys, recursively.
pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (symbol_name(&k).to_string(), normalize_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

fn symbol_name(s: &str) -> &str {
    s.strip_prefix(':').unwrap_or(s)
}

fn name_value(key: &str, value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if !s.trim().is_empty() => {
            Ok(Some(symbol_name(s.trim()).to_ascii_lowercase()))
        }
        Some(other) => Err(Error::config_invalid_value(
            key,
            Some(other.to_string()),
            format!("'{}' must be a name", key),
        )),
    }
}

fn string_list(key: &str, value: Option<&Value>) -> Result<Vec<String>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s.clone()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(Error::config_invalid_value(
                    key,
                    Some(other.to_string()),
                    format!("'{}' entries must be strings", key),
                )),
            })
            .collect(),
        Some(other) => Err(Error::config_invalid_value(
            key,
            Some(other.to_string()),
            format!("'{}' must be a string or a list of strings", key),
        )),
    }
}

fn hook_map(key: &str, value: Option<&Value>) -> Result<HookMap> {
    let mut hooks = HookMap::new();
    match value {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (task, commands) in map {
                let commands = string_list(&format!("{}.{}", key, task), Some(commands))?;
                hooks.insert(task.clone(), commands);
            }
        }
        Some(other) => {
            return Err(Error::config_invalid_value(
                key,
                Some(other.to_string()),
                format!("'{}' must map task names to commands", key),
            ))
        }
    }
    Ok(hooks)
}

fn server_decl(environment: &str, value: Option<&Value>) -> Result<Option<ServerDecl>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(_)) => Ok(name_value("server", value)?.map(|name| ServerDecl {
            name,
            options: Map::new(),
        })),
        Some(Value::Object(map)) => {
            let name = name_value("server.name", map.get("name"))?.ok_or_else(|| {
                Error::config_missing_key("server.name", Some(environment.to_string()))
            })?;
            let options = match map.get("options") {
                None | Some(Value::Null) => Map::new(),
                Some(Value::Object(options)) => options.clone(),
                Some(other) => {
                    return Err(Error::config_invalid_value(
                        "server.options",
                        Some(other.to_string()),
                        "'server.options' must be a mapping",
                    ))
                }
            };
            Ok(Some(ServerDecl { name, options }))
        }
        Some(other) => Err(Error::config_invalid_value(
            "server",
            Some(other.to_string()),
            "'server' must be a name or a mapping with 'name' and 'options'",
        )),
    }
}

fn destinations(environment: &str, value: Option<&Value>) -> Result<Vec<Address>> {
    let missing = || Error::config_missing_key("dest", Some(environment.to_string()));
    match value {
        None | Some(Value::Null) => Err(missing()),
        Some(Value::Array(items)) => {
            if items.is_empty() {
                return Err(missing());
            }
            items
                .iter()
                .map(|item| Address::from_value("dest", item))
                .collect()
        }
        Some(single) => Ok(vec![Address::from_value("dest", single)?]),
    }
}

impl Configuration {
    /// Validate a raw configuration mapping and fill in defaults.
    ///
    /// `root` is the project root; the staging copy lives beneath it.
    pub fn normalize(environment: &str, raw: &Value, root: &Path) -> Result<Self> {
        let raw = normalize_keys(raw.clone());
        let map = raw.as_object().ok_or_else(|| {
            Error::config_invalid_value(
                "root",
                None,
                format!("configuration for the {} environment must be a mapping", environment),
            )
        })?;

        let source = match map.get("source") {
            None | Some(Value::Null) => {
                return Err(Error::config_missing_key(
                    "source",
                    Some(environment.to_string()),
                ))
            }
            Some(value) => Address::from_value("source", value)?,
        };
        let dest = destinations(environment, map.get("dest"))?;

        let debug = match map.get("debug") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(Error::config_invalid_value(
                    "debug",
                    Some(other.to_string()),
                    "'debug' must be true or false",
                ))
            }
        };

        Ok(Self {
            environment: environment.to_string(),
            scm: name_value("scm", map.get("scm"))?.unwrap_or_else(|| DEFAULT_SCM.to_string()),
            source,
            dest,
            server: server_decl(environment, map.get("server"))?,
            framework: name_value("framework", map.get("framework"))?,
            orm: name_value("orm", map.get("orm"))?,
            exclude: string_list("exclude", map.get("exclude"))?.into_iter().collect(),
            debug,
            before: hook_map("before", map.get("before"))?,
            after: hook_map("after", map.get("after"))?,
            staging: root.join(STAGING_DIR),
        })
    }

    /// Add patterns to the exclude set. Used by capability providers while
    /// the environment is being composed.
    pub(crate) fn extend_exclude<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
    }
}
