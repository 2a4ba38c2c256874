//! One composed deployment target.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::address::Address;
use crate::capability::{
    registry, Installer, Migrator, ServerController, SourceSync, TaskContext,
};
use crate::channel::{Channel, LocalChannel, RemoteChannel, Transport};
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::pipeline::{self, RunReport};
use crate::ssh::SshClient;
use crate::task::{self, TaskVerb};
use crate::transfer;
use crate::utils::command::CommandOutput;

/// A named environment: its configuration plus one provider per declared
/// axis. Composition happens once, in `compose`.
pub struct Environment {
    config: Configuration,
    root: PathBuf,
    scm: Box<dyn SourceSync>,
    installer: Option<Box<dyn Installer>>,
    migrator: Option<Box<dyn Migrator>>,
    server: Option<Box<dyn ServerController>>,
    rake_env: Vec<String>,
}

/// Serializable view used by `envs`.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentSummary {
    pub name: String,
    pub scm: String,
    pub destinations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orm: Option<String>,
    pub verbs: Vec<TaskVerb>,
}

impl Environment {
    /// Normalize a raw mapping and compose it.
    pub fn new(name: &str, raw: &Value, root: &Path) -> Result<Self> {
        Self::compose(Configuration::normalize(name, raw, root)?, root)
    }

    /// Attach the provider for every declared axis. Fails with
    /// `capability.unknown` before anything is executed.
    pub fn compose(mut config: Configuration, root: &Path) -> Result<Self> {
        let scm = registry::scm(&config.scm)?;
        config.extend_exclude(scm.exclude_patterns().iter().copied());

        let server = match &config.server {
            Some(decl) => {
                let server = registry::server(&decl.name)?;
                server.init(&decl.options, &config.environment)?;
                Some(server)
            }
            None => None,
        };

        let framework = config.framework.as_deref().map(registry::framework).transpose()?;
        let orm = config.orm.as_deref().map(registry::orm).transpose()?;

        let installer = framework.and_then(|f| f.installer());
        let migrator: Option<Box<dyn Migrator>> = match (orm, framework) {
            (Some(orm), _) => Some(Box::new(orm)),
            (None, Some(framework)) => Some(framework.migrator()),
            (None, None) => None,
        };
        let rake_env = framework
            .map(|f| f.rake_env(&config.environment))
            .unwrap_or_default();

        Ok(Self {
            config,
            root: root.to_path_buf(),
            scm,
            installer,
            migrator,
            server,
            rake_env,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.environment
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn implements(&self, verb: TaskVerb) -> bool {
        match verb {
            TaskVerb::Pull | TaskVerb::Push => true,
            TaskVerb::Setup | TaskVerb::Update => self.scm.fetches_on_destination(),
            TaskVerb::Install => self.installer.is_some(),
            TaskVerb::Migrate => self.migrator.is_some(),
            TaskVerb::Config | TaskVerb::Start | TaskVerb::Stop | TaskVerb::Restart => self
                .server
                .as_ref()
                .is_some_and(|server| server.verbs().contains(&verb)),
        }
    }

    /// Every verb this environment implements, in canonical order.
    pub fn verbs(&self) -> Vec<TaskVerb> {
        TaskVerb::ALL
            .iter()
            .copied()
            .filter(|verb| self.implements(*verb))
            .collect()
    }

    pub fn summary(&self) -> EnvironmentSummary {
        EnvironmentSummary {
            name: self.name().to_string(),
            scm: self.scm.name().to_string(),
            destinations: self.config.dest.iter().map(ToString::to_string).collect(),
            server: self.server.as_ref().map(|s| s.name().to_string()),
            framework: self.config.framework.clone(),
            orm: self.config.orm.clone(),
            verbs: self.verbs(),
        }
    }

    /// Provider checks for the verbs of one run. Fails before anything
    /// executes.
    pub fn preflight(&self, verbs: &[TaskVerb]) -> Result<()> {
        let (Some(server), Some(decl)) = (&self.server, &self.config.server) else {
            return Ok(());
        };
        for verb in verbs.iter().filter(|verb| self.implements(**verb)) {
            server.preflight(*verb, &decl.options, self.name())?;
        }
        Ok(())
    }

    pub fn context<'a>(&'a self, dest: &'a Address) -> TaskContext<'a> {
        TaskContext {
            environment: &self.config.environment,
            source: &self.config.source,
            dest,
            server_options: self
                .config
                .server
                .as_ref()
                .map(|decl| &decl.options)
                .unwrap_or_else(|| empty_options()),
            rake_env: &self.rake_env,
        }
    }

    /// Run one verb on an open channel. Returns `false` when the verb is
    /// not implemented, which is not an error.
    pub fn perform(&self, verb: TaskVerb, ch: &mut dyn Channel, dest: &Address) -> Result<bool> {
        if !self.implements(verb) {
            return Ok(false);
        }

        let ctx = self.context(dest);
        match verb {
            TaskVerb::Pull => {
                let staging = self.config.staging.display().to_string();
                if self.config.staging.is_dir() {
                    let scm = &self.scm;
                    let source = &self.config.source;
                    ch.within(&staging, &mut |ch| scm.update(ch, source))?;
                } else {
                    self.scm.download(ch, &self.config.source, &staging)?;
                }
            }
            TaskVerb::Push => ch.run(transfer::push_command(
                &self.config.staging,
                dest,
                &self.config.exclude,
                self.config.debug,
            ))?,
            TaskVerb::Setup => self.scm.download(ch, &self.config.source, ctx.dest_path())?,
            TaskVerb::Update => self.scm.update(ch, &self.config.source)?,
            TaskVerb::Install => {
                if let Some(installer) = &self.installer {
                    installer.install(ch, &ctx)?;
                }
            }
            TaskVerb::Migrate => {
                if let Some(migrator) = &self.migrator {
                    migrator.migrate(ch, &ctx)?;
                }
            }
            TaskVerb::Config | TaskVerb::Start | TaskVerb::Stop | TaskVerb::Restart => {
                if let Some(server) = &self.server {
                    server.control(verb, ch, &ctx)?;
                }
            }
        }
        Ok(true)
    }

    /// Open the session channel for one destination: local for host-less
    /// addresses, batched remote otherwise.
    pub fn open<'t>(&self, dest: &Address, transport: &'t dyn Transport) -> Box<dyn Channel + 't> {
        if dest.is_local() {
            Box::new(LocalChannel::new(self.root.clone()))
        } else {
            Box::new(RemoteChannel::new(dest.clone(), transport).debug(self.config.debug))
        }
    }

    /// Run task names (verbs or task-set names) against every destination.
    pub fn invoke<S: AsRef<str>>(&self, tasks: &[S], transport: &dyn Transport) -> Result<RunReport> {
        let verbs = task::resolve(tasks)?;
        pipeline::run(self, &verbs, transport)
    }

    /// Run a raw command inside the destination directory.
    pub fn exec(&self, command: &str, transport: &dyn Transport) -> Result<RunReport> {
        pipeline::run_in_destinations(self, transport, &mut |ch, dest| {
            ch.cd(dest.path().unwrap_or("."))?;
            ch.exec(command)
        })
    }

    /// Run a rake task inside the destination directory.
    pub fn rake(&self, task: &str, args: &[String], transport: &dyn Transport) -> Result<RunReport> {
        pipeline::run_in_destinations(self, transport, &mut |ch, dest| {
            ch.cd(dest.path().unwrap_or("."))?;
            self.context(dest).rake(ch, task, args)
        })
    }

    /// Interactive ssh session with the first remote destination.
    pub fn ssh(&self, args: &[String]) -> Result<CommandOutput> {
        let dest = self
            .config
            .dest
            .iter()
            .find(|dest| !dest.is_local())
            .ok_or_else(|| {
                Error::validation_invalid_argument(
                    "dest",
                    format!("the {} environment has no remote destination", self.name()),
                )
            })?;
        SshClient::from_address(dest)?.execute_interactive(args)
    }
}

fn empty_options() -> &'static Map<String, Value> {
    static EMPTY: OnceLock<Map<String, Value>> = OnceLock::new();
    EMPTY.get_or_init(Map::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::json;

    fn compose(raw: Value) -> Result<Environment> {
        Environment::new("production", &raw, Path::new("/work/app"))
    }

    fn base() -> Value {
        json!({
            "source": "git@github.com:user/app.git",
            "dest": "ssh://deploy@www.example.com/srv/app",
        })
    }

    #[test]
    fn unknown_server_fails_composition() {
        let mut raw = base();
        raw["server"] = json!("webrick");
        let err = compose(raw).err().unwrap();
        assert_eq!(err.code, ErrorCode::CapabilityUnknown);
        assert_eq!(err.details["axis"], "server");
        assert_eq!(err.details["name"], "webrick");
    }

    #[test]
    fn bare_environment_only_syncs_source() {
        let env = compose(base()).unwrap();
        assert_eq!(env.verbs(), vec![TaskVerb::Pull, TaskVerb::Push]);

        let mut raw = base();
        raw["scm"] = json!("git");
        let env = compose(raw).unwrap();
        assert_eq!(
            env.verbs(),
            vec![TaskVerb::Pull, TaskVerb::Push, TaskVerb::Setup, TaskVerb::Update]
        );
    }

    #[test]
    fn mongrel_without_config_fails_composition() {
        let mut raw = base();
        raw["server"] = json!("mongrel");
        let err = compose(raw).err().unwrap();
        assert_eq!(err.code, ErrorCode::ConfigMissingKey);

        let mut raw = base();
        raw["server"] = json!({"name": "mongrel", "options": {"config": "config/mongrel.yml"}});
        assert!(compose(raw).is_ok());
    }

    #[test]
    fn preflight_checks_only_verbs_in_the_run() {
        let mut raw = base();
        raw["server"] = json!("thin");
        let env = compose(raw).unwrap();
        assert!(env.preflight(&[TaskVerb::Start, TaskVerb::Restart]).is_ok());
        let err = env.preflight(&[TaskVerb::Start, TaskVerb::Config]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingKey);
    }

    #[test]
    fn server_contributes_exactly_its_verbs() {
        let mut raw = base();
        raw["server"] = json!("apache");
        let env = compose(raw).unwrap();
        assert!(!env.implements(TaskVerb::Config));
        assert!(env.implements(TaskVerb::Start));
        assert!(env.implements(TaskVerb::Restart));

        let mut raw = base();
        raw["server"] = json!("thin");
        let env = compose(raw).unwrap();
        assert!(env.implements(TaskVerb::Config));
    }

    #[test]
    fn scm_exclusions_are_appended() {
        let mut raw = base();
        raw["scm"] = json!("git");
        raw["exclude"] = json!(["log"]);
        let env = compose(raw).unwrap();
        let exclude: Vec<&str> = env.config().exclude.iter().map(String::as_str).collect();
        assert_eq!(exclude, vec![".git", ".gitignore", "log"]);
    }

    #[test]
    fn orm_owns_migrate_and_framework_supplies_env() {
        let mut raw = base();
        raw["framework"] = json!("rails3");
        raw["orm"] = json!("datamapper");
        let env = compose(raw).unwrap();
        assert!(env.implements(TaskVerb::Install));
        assert!(env.implements(TaskVerb::Migrate));
        assert_eq!(env.rake_env, vec!["RAILS_ENV=production".to_string()]);
    }

    #[test]
    fn rails2_does_not_install() {
        let mut raw = base();
        raw["framework"] = json!("rails2");
        let env = compose(raw).unwrap();
        assert!(!env.implements(TaskVerb::Install));
        assert!(env.implements(TaskVerb::Migrate));
    }

    #[test]
    fn ssh_requires_a_remote_destination() {
        let env = compose(json!({"source": "/src/app", "dest": "/srv/app"})).unwrap();
        let err = env.ssh(&[]).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationInvalidArgument);
    }
}
