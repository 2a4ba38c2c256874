//! Before/after hooks.
//!
//! Hooks are raw shell commands keyed by task verb. They run on the same
//! channel as the task they wrap, so on a remote destination they are
//! batched into the same command line.

use std::fmt;

use crate::channel::Channel;
use crate::config::HookMap;
use crate::error::{Error, Result};
use crate::task::TaskVerb;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Before => "before",
            HookPhase::After => "after",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every hook key must name a task verb.
pub fn validate(hooks: &HookMap, phase: HookPhase) -> Result<()> {
    let mut keys: Vec<&String> = hooks.keys().collect();
    keys.sort();
    for key in keys {
        key.parse::<TaskVerb>().map_err(|_| {
            Error::task_invalid(key.clone(), TaskVerb::known_names())
                .with_hint(format!("Rename or remove the '{}.{}' hook", phase, key))
        })?;
    }
    Ok(())
}

/// Commands declared for `verb`, in declared order.
pub fn resolve_hooks<'h>(hooks: &'h HookMap, verb: TaskVerb) -> &'h [String] {
    hooks
        .get(verb.as_str())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// Run the hooks for `verb` verbatim. Returns how many were run.
pub fn run_hooks(ch: &mut dyn Channel, hooks: &HookMap, verb: TaskVerb) -> Result<usize> {
    let commands = resolve_hooks(hooks, verb);
    for command in commands {
        ch.exec(command)?;
    }
    Ok(commands.len())
}
