use std::str::FromStr;

use super::{Installer, Migrator, TaskContext};
use crate::channel::{Channel, Command};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    Rails2,
    Rails3,
}

impl Framework {
    pub const NAMES: [&'static str; 2] = ["rails2", "rails3"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::Rails2 => "rails2",
            Framework::Rails3 => "rails3",
        }
    }

    /// Words appended to every rake invocation in this environment.
    pub fn rake_env(&self, environment: &str) -> Vec<String> {
        vec![format!("RAILS_ENV={}", environment)]
    }

    /// Rails 3 applications declare their gems in a Gemfile.
    pub fn installer(&self) -> Option<Box<dyn Installer>> {
        match self {
            Framework::Rails2 => None,
            Framework::Rails3 => Some(Box::new(*self)),
        }
    }

    pub fn migrator(&self) -> Box<dyn Migrator> {
        Box::new(*self)
    }
}

impl FromStr for Framework {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rails2" => Ok(Framework::Rails2),
            "rails3" => Ok(Framework::Rails3),
            _ => Err(Error::capability_unknown(
                "framework",
                s,
                Self::NAMES.iter().map(|n| n.to_string()).collect(),
            )),
        }
    }
}

impl Installer for Framework {
    fn install(&self, ch: &mut dyn Channel, _ctx: &TaskContext<'_>) -> Result<()> {
        ch.run(Command::new("bundle").arg("install"))
    }
}

impl Migrator for Framework {
    fn migrate(&self, ch: &mut dyn Channel, ctx: &TaskContext<'_>) -> Result<()> {
        ctx.rake(ch, "db:migrate", &[])
    }
}
