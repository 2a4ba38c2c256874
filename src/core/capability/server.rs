use serde_json::{Map, Value};

use super::{ServerController, TaskContext};
use crate::channel::{Channel, Command};
use crate::error::{Error, Result};
use crate::task::TaskVerb;

const ALL_VERBS: [TaskVerb; 4] = [
    TaskVerb::Config,
    TaskVerb::Start,
    TaskVerb::Stop,
    TaskVerb::Restart,
];

/// `apachectl start|stop|restart`. Apache has no per-project configuration step.
#[derive(Debug, Clone, Copy)]
pub struct Apache;

#[derive(Debug, Clone, Copy)]
pub struct Thin;

#[derive(Debug, Clone, Copy)]
pub struct Mongrel;

/// Option names whose flag is not the dashed key.
fn flag_name(key: &str) -> String {
    match key {
        "one_by_one" => "onebyone".to_string(),
        "max_connections" => "max-conns".to_string(),
        "max_persistent_connections" => "max-persistent-conns".to_string(),
        other => other.replace('_', "-"),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Merge provider defaults under the declared options.
fn with_defaults(ctx: &TaskContext<'_>, servers_key: &str) -> Map<String, Value> {
    let mut options = Map::new();
    options.insert(
        "environment".to_string(),
        Value::String(ctx.environment.to_string()),
    );
    options.insert("address".to_string(), Value::String("127.0.0.1".to_string()));
    options.insert(servers_key.to_string(), Value::from(2));
    for (key, value) in ctx.server_options {
        options.insert(key.clone(), value.clone());
    }
    options
}

/// Render options as long flags in sorted key order. `true` becomes a bare
/// flag; `false` and null are dropped.
pub fn long_flags(options: &Map<String, Value>) -> Vec<String> {
    let mut keys: Vec<&String> = options.keys().collect();
    keys.sort();

    let mut args = Vec::new();
    for key in keys {
        let flag = format!("--{}", flag_name(key));
        match &options[key.as_str()] {
            Value::Bool(true) => args.push(flag),
            Value::Bool(false) | Value::Null => {}
            Value::Array(items) => {
                for item in items.iter().filter_map(scalar) {
                    args.push(flag.clone());
                    args.push(item);
                }
            }
            other => {
                if let Some(value) = scalar(other) {
                    args.push(flag);
                    args.push(value);
                }
            }
        }
    }
    args
}

fn require_config(options: &Map<String, Value>, environment: &str) -> Result<String> {
    options.get("config").and_then(scalar).ok_or_else(|| {
        Error::config_missing_key("server.options.config", Some(environment.to_string()))
            .with_hint("Add a 'config' path under the server options")
    })
}

impl ServerController for Apache {
    fn name(&self) -> &'static str {
        "apache"
    }

    fn verbs(&self) -> &'static [TaskVerb] {
        &ALL_VERBS[1..]
    }

    fn control(&self, verb: TaskVerb, ch: &mut dyn Channel, _ctx: &TaskContext<'_>) -> Result<()> {
        match verb {
            TaskVerb::Start | TaskVerb::Stop | TaskVerb::Restart => {
                ch.run(Command::new("apachectl").arg(verb.as_str()))
            }
            _ => Ok(()),
        }
    }
}

impl ServerController for Thin {
    fn name(&self) -> &'static str {
        "thin"
    }

    fn verbs(&self) -> &'static [TaskVerb] {
        &ALL_VERBS
    }

    /// Generating a config file needs to know where to write it.
    fn preflight(&self, verb: TaskVerb, options: &Map<String, Value>, environment: &str) -> Result<()> {
        match verb {
            TaskVerb::Config => require_config(options, environment).map(|_| ()),
            _ => Ok(()),
        }
    }

    fn control(&self, verb: TaskVerb, ch: &mut dyn Channel, ctx: &TaskContext<'_>) -> Result<()> {
        let options = with_defaults(ctx, "servers");
        match verb {
            TaskVerb::Config => {
                require_config(&options, ctx.environment)?;
                ch.run(
                    Command::new("thin")
                        .args(["config", "-c", ctx.dest_path()])
                        .args(long_flags(&options)),
                )
            }
            TaskVerb::Start | TaskVerb::Stop | TaskVerb::Restart => {
                let command = Command::new("thin").arg(verb.as_str());
                // A generated config file already carries every option.
                let command = match options.get("config").and_then(scalar) {
                    Some(config) => {
                        let servers = options.get("servers").and_then(scalar).unwrap_or_default();
                        command.args(["-C".to_string(), config, "-s".to_string(), servers])
                    }
                    None => command.args(long_flags(&options)),
                };
                ch.run(command)
            }
            _ => Ok(()),
        }
    }
}

impl ServerController for Mongrel {
    fn name(&self) -> &'static str {
        "mongrel"
    }

    fn verbs(&self) -> &'static [TaskVerb] {
        &ALL_VERBS
    }

    /// Every cluster command is driven by the cluster config file.
    fn init(&self, options: &Map<String, Value>, environment: &str) -> Result<()> {
        require_config(options, environment).map(|_| ())
    }

    fn control(&self, verb: TaskVerb, ch: &mut dyn Channel, ctx: &TaskContext<'_>) -> Result<()> {
        let options = with_defaults(ctx, "num_servers");
        let config = require_config(&options, ctx.environment)?;
        match verb {
            TaskVerb::Config => {
                let mut flags = options.clone();
                flags.remove("config");
                ch.run(
                    Command::new("mongrel_rails")
                        .args(["cluster::configure", "-c", ctx.dest_path(), "-C"])
                        .arg(config)
                        .args(long_flags(&flags)),
                )
            }
            TaskVerb::Start | TaskVerb::Stop | TaskVerb::Restart => ch.run(
                Command::new("mongrel_rails")
                    .arg(format!("cluster::{}", verb))
                    .args(["-C".to_string(), config]),
            ),
            _ => Ok(()),
        }
    }
}
