//! Task verbs and the predefined task-sets.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskVerb {
    Pull,
    Push,
    Setup,
    Update,
    Install,
    Migrate,
    Config,
    Start,
    Stop,
    Restart,
}

impl TaskVerb {
    pub const ALL: [TaskVerb; 10] = [
        TaskVerb::Pull,
        TaskVerb::Push,
        TaskVerb::Setup,
        TaskVerb::Update,
        TaskVerb::Install,
        TaskVerb::Migrate,
        TaskVerb::Config,
        TaskVerb::Start,
        TaskVerb::Stop,
        TaskVerb::Restart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskVerb::Pull => "pull",
            TaskVerb::Push => "push",
            TaskVerb::Setup => "setup",
            TaskVerb::Update => "update",
            TaskVerb::Install => "install",
            TaskVerb::Migrate => "migrate",
            TaskVerb::Config => "config",
            TaskVerb::Start => "start",
            TaskVerb::Stop => "stop",
            TaskVerb::Restart => "restart",
        }
    }

    /// Pre-transfer verbs run on this machine, outside the destination
    /// session.
    pub fn is_local(&self) -> bool {
        matches!(self, TaskVerb::Pull | TaskVerb::Push)
    }

    /// Status line printed before the verb runs.
    pub fn progress(&self) -> &'static str {
        match self {
            TaskVerb::Pull => "Pulling source into the staging copy ...",
            TaskVerb::Push => "Uploading staging copy ...",
            TaskVerb::Setup => "Setting up the deployment repository ...",
            TaskVerb::Update => "Updating the deployment repository ...",
            TaskVerb::Install => "Installing additional dependencies ...",
            TaskVerb::Migrate => "Migrating database ...",
            TaskVerb::Config => "Configuring server ...",
            TaskVerb::Start => "Starting server ...",
            TaskVerb::Stop => "Stopping server ...",
            TaskVerb::Restart => "Restarting server ...",
        }
    }

    pub fn known_names() -> Vec<String> {
        Self::ALL.iter().map(|v| v.as_str().to_string()).collect()
    }
}

impl fmt::Display for TaskVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskVerb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().trim_start_matches(':');
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == name)
            .ok_or_else(|| Error::task_invalid(s, Self::known_names()))
    }
}

/// Fresh deployment: check out, install, migrate, configure and start.
pub const DEPLOY: [TaskVerb; 5] = [
    TaskVerb::Setup,
    TaskVerb::Install,
    TaskVerb::Migrate,
    TaskVerb::Config,
    TaskVerb::Start,
];

/// Follow-up deployment of an existing checkout.
pub const REDEPLOY: [TaskVerb; 4] = [
    TaskVerb::Update,
    TaskVerb::Install,
    TaskVerb::Migrate,
    TaskVerb::Restart,
];

/// Deployment by upload of a locally staged copy.
pub const SHIP: [TaskVerb; 5] = [
    TaskVerb::Pull,
    TaskVerb::Push,
    TaskVerb::Install,
    TaskVerb::Migrate,
    TaskVerb::Restart,
];

/// Look up a predefined task-set by name.
pub fn task_set(name: &str) -> Option<&'static [TaskVerb]> {
    match name {
        "deploy" => Some(&DEPLOY),
        "redeploy" => Some(&REDEPLOY),
        "ship" => Some(&SHIP),
        _ => None,
    }
}

/// Resolve task names (verbs or task-set names) into an ordered verb list.
///
/// Any name that is neither fails with `task.invalid`.
pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<Vec<TaskVerb>> {
    let mut verbs = Vec::new();
    for name in names {
        let name = name.as_ref();
        match task_set(name) {
            Some(set) => verbs.extend_from_slice(set),
            None => verbs.push(name.parse::<TaskVerb>()?),
        }
    }
    Ok(verbs)
}
