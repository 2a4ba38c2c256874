//! Project discovery.
//!
//! A project root holds `config/deploy.yml` (shared settings) and optionally
//! `config/deploy/<environment>.yml` files. Each environment file is laid
//! over the shared mapping key by key. Without environment files the shared
//! file alone describes a single `production` environment.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::channel::Transport;
use crate::config::normalize_keys;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::pipeline::RunReport;
use crate::utils::command::CommandOutput;

pub const CONFIG_DIR: &str = "config";
pub const DEPLOY_FILE: &str = "deploy.yml";
pub const ENVIRONMENTS_DIR: &str = "deploy";
pub const DEFAULT_ENVIRONMENT: &str = "production";

pub struct Project {
    root: PathBuf,
    environments: BTreeMap<String, Environment>,
}

fn deploy_file(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(DEPLOY_FILE)
}

fn environments_dir(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(ENVIRONMENTS_DIR)
}

/// Parse one YAML file into a normalized mapping. An empty file is an
/// empty mapping.
fn read_mapping(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    let value: Value = serde_yml::from_str(&content)
        .map_err(|e| Error::config_invalid_yaml(path.display().to_string(), e))?;

    match normalize_keys(value) {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(Error::config_invalid_value(
            "root",
            Some(other.to_string()),
            format!("{} must contain a mapping", path.display()),
        )),
    }
}

/// `<name>.yml` files in the environments directory, sorted by name.
fn environment_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read {}", dir.display())))
    })?;

    let mut files: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "yml"))
        .filter_map(|path| {
            let name = path.file_stem()?.to_str()?.to_string();
            Some((name, path))
        })
        .collect();
    files.sort();
    Ok(files)
}

impl Project {
    /// Load every environment under `root`. Composition errors surface here,
    /// before any command runs.
    pub fn load(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let base_path = deploy_file(&root);
        let env_dir = environments_dir(&root);

        let base = if base_path.is_file() {
            Some(read_mapping(&base_path)?)
        } else {
            None
        };
        let files = environment_files(&env_dir)?;

        let mut raw: Vec<(String, Map<String, Value>)> = Vec::new();
        if files.is_empty() {
            let base = base.ok_or_else(|| {
                Error::config_not_found(
                    root.display().to_string(),
                    vec![
                        base_path.display().to_string(),
                        env_dir.display().to_string(),
                    ],
                )
            })?;
            raw.push((DEFAULT_ENVIRONMENT.to_string(), base));
        } else {
            for (name, path) in files {
                let mut merged = base.clone().unwrap_or_default();
                merged.extend(read_mapping(&path)?);
                raw.push((name, merged));
            }
        }

        let mut environments = BTreeMap::new();
        for (name, mapping) in raw {
            let env = Environment::new(&name, &Value::Object(mapping), &root)?;
            environments.insert(name, env);
        }

        Ok(Self { root, environments })
    }

    /// Walk up from `start` to the first directory holding deploy
    /// configuration.
    pub fn find_root(start: &Path) -> Result<PathBuf> {
        for dir in start.ancestors() {
            if deploy_file(dir).is_file() || environments_dir(dir).is_dir() {
                return Ok(dir.to_path_buf());
            }
        }
        Err(Error::config_not_found(
            start.display().to_string(),
            vec![format!("{}/{}", CONFIG_DIR, DEPLOY_FILE)],
        )
        .with_hint("Run from inside a project, or pass --root"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn environment_names(&self) -> Vec<String> {
        self.environments.keys().cloned().collect()
    }

    pub fn environments(&self) -> impl Iterator<Item = &Environment> {
        self.environments.values()
    }

    pub fn environment(&self, name: &str) -> Result<&Environment> {
        self.environments
            .get(name)
            .ok_or_else(|| Error::environment_not_found(name, self.environment_names()))
    }

    /// Run task names (verbs or task-set names) in the named environment.
    pub fn invoke<S: AsRef<str>>(
        &self,
        tasks: &[S],
        environment: &str,
        transport: &dyn Transport,
    ) -> Result<RunReport> {
        self.environment(environment)?.invoke(tasks, transport)
    }

    pub fn exec(&self, command: &str, environment: &str, transport: &dyn Transport) -> Result<RunReport> {
        self.environment(environment)?.exec(command, transport)
    }

    pub fn rake(
        &self,
        task: &str,
        args: &[String],
        environment: &str,
        transport: &dyn Transport,
    ) -> Result<RunReport> {
        self.environment(environment)?.rake(task, args, transport)
    }

    pub fn ssh(&self, args: &[String], environment: &str) -> Result<CommandOutput> {
        self.environment(environment)?.ssh(args)
    }
}

macro_rules! task_wrappers {
    ($($name:ident => $task:literal),* $(,)?) => {
        impl Project {
            $(
                #[doc = concat!("Run `", $task, "` in the named environment.")]
                pub fn $name(&self, environment: &str, transport: &dyn Transport) -> Result<RunReport> {
                    self.invoke(&[$task], environment, transport)
                }
            )*
        }
    };
}

task_wrappers! {
    pull => "pull",
    push => "push",
    setup => "setup",
    update => "update",
    install => "install",
    migrate => "migrate",
    config => "config",
    start => "start",
    stop => "stop",
    restart => "restart",
    deploy => "deploy",
    redeploy => "redeploy",
    ship => "ship",
}
