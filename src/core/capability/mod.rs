//! Capability providers.
//!
//! Each configuration axis (scm, server, framework, orm) maps a declared
//! name to a stateless provider. An `Environment` holds at most one
//! provider per axis and dispatches task verbs to whichever provider
//! implements them.

pub mod framework;
pub mod orm;
pub mod scm;
pub mod server;

pub use framework::Framework;
pub use orm::Orm;
pub use scm::{Git, Mercurial, Rsync, Subversion};
pub use server::{Apache, Mongrel, Thin};

use serde_json::{Map, Value};

use crate::address::Address;
use crate::channel::{rake_task, Channel, Command};
use crate::error::Result;
use crate::task::TaskVerb;

/// Per-destination inputs handed to every provider call.
#[derive(Debug, Clone, Copy)]
pub struct TaskContext<'a> {
    /// Environment name (`production`, `staging`, ...).
    pub environment: &'a str,
    pub source: &'a Address,
    pub dest: &'a Address,
    pub server_options: &'a Map<String, Value>,
    /// `KEY=value` words appended to every rake invocation.
    pub rake_env: &'a [String],
}

impl TaskContext<'_> {
    /// Destination directory, `.` when the address carries no path.
    pub fn dest_path(&self) -> &str {
        self.dest.path().unwrap_or(".")
    }

    /// Run a rake task with the framework's environment variables.
    pub fn rake(&self, ch: &mut dyn Channel, task: &str, args: &[String]) -> Result<()> {
        ch.run(
            Command::new("rake")
                .arg(rake_task(task, args))
                .args(self.rake_env.iter().cloned()),
        )
    }
}

/// Fetches and refreshes a copy of the source.
pub trait SourceSync {
    fn name(&self) -> &'static str;

    /// Whether a destination can fetch the source itself (`setup`,
    /// `update`). Otherwise only the local staging copy is synced and
    /// `push` carries it over.
    fn fetches_on_destination(&self) -> bool {
        true
    }

    /// Fresh copy of `source` into `path`.
    fn download(&self, ch: &mut dyn Channel, source: &Address, path: &str) -> Result<()>;

    /// Bring the copy in the current directory up to date with `source`.
    fn update(&self, ch: &mut dyn Channel, source: &Address) -> Result<()>;

    /// Metadata the bulk transfer must leave behind.
    fn exclude_patterns(&self) -> &'static [&'static str] {
        &[]
    }
}

pub trait Installer {
    fn install(&self, ch: &mut dyn Channel, ctx: &TaskContext<'_>) -> Result<()>;
}

pub trait Migrator {
    fn migrate(&self, ch: &mut dyn Channel, ctx: &TaskContext<'_>) -> Result<()>;
}

pub trait ServerController {
    fn name(&self) -> &'static str;

    /// The server verbs this provider implements.
    fn verbs(&self) -> &'static [TaskVerb];

    /// Checked once when the environment is composed.
    fn init(&self, _options: &Map<String, Value>, _environment: &str) -> Result<()> {
        Ok(())
    }

    /// Checked for each verb of a run before anything executes.
    fn preflight(&self, _verb: TaskVerb, _options: &Map<String, Value>, _environment: &str) -> Result<()> {
        Ok(())
    }

    /// Run one of `verbs()`. Other verbs are a no-op.
    fn control(&self, verb: TaskVerb, ch: &mut dyn Channel, ctx: &TaskContext<'_>) -> Result<()>;
}

/// Axis registries. Unknown names fail with `capability.unknown`.
pub mod registry {
    use super::*;
    use crate::error::Error;

    pub const SCM_NAMES: [&str; 6] = ["rsync", "git", "hg", "mercurial", "svn", "subversion"];
    pub const SERVER_NAMES: [&str; 3] = ["apache", "thin", "mongrel"];

    fn known(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    pub fn scm(name: &str) -> Result<Box<dyn SourceSync>> {
        match name {
            "rsync" => Ok(Box::new(Rsync)),
            "git" => Ok(Box::new(Git)),
            "hg" | "mercurial" => Ok(Box::new(Mercurial)),
            "svn" | "subversion" => Ok(Box::new(Subversion)),
            _ => Err(Error::capability_unknown("scm", name, known(&SCM_NAMES))),
        }
    }

    pub fn server(name: &str) -> Result<Box<dyn ServerController>> {
        match name {
            "apache" => Ok(Box::new(Apache)),
            "thin" => Ok(Box::new(Thin)),
            "mongrel" => Ok(Box::new(Mongrel)),
            _ => Err(Error::capability_unknown("server", name, known(&SERVER_NAMES))),
        }
    }

    pub fn framework(name: &str) -> Result<Framework> {
        name.parse()
    }

    pub fn orm(name: &str) -> Result<Orm> {
        name.parse()
    }
}
