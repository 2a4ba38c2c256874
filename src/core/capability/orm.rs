use std::str::FromStr;

use super::{Migrator, TaskContext};
use crate::channel::Channel;
use crate::error::{Error, Result};

/// Data-access layer. When declared it owns the `migrate` verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orm {
    ActiveRecord,
    DataMapper,
}

impl Orm {
    pub const NAMES: [&'static str; 4] = ["active_record", "activerecord", "data_mapper", "datamapper"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Orm::ActiveRecord => "active_record",
            Orm::DataMapper => "data_mapper",
        }
    }

    /// Rake task that brings the schema up to date.
    pub fn migration_task(&self) -> &'static str {
        match self {
            Orm::ActiveRecord => "db:migrate",
            Orm::DataMapper => "db:autoupdate",
        }
    }
}

impl FromStr for Orm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active_record" | "activerecord" => Ok(Orm::ActiveRecord),
            "data_mapper" | "datamapper" => Ok(Orm::DataMapper),
            _ => Err(Error::capability_unknown(
                "orm",
                s,
                Self::NAMES.iter().map(|n| n.to_string()).collect(),
            )),
        }
    }
}

impl Migrator for Orm {
    fn migrate(&self, ch: &mut dyn Channel, ctx: &TaskContext<'_>) -> Result<()> {
        ctx.rake(ch, self.migration_task(), &[])
    }
}
