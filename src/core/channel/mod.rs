//! Command channels.
//!
//! Task implementations talk to a `Channel` without knowing whether it runs
//! commands immediately on this machine (`LocalChannel`) or records them and
//! replays the whole batch over one ssh invocation when closed
//! (`RemoteChannel`).

mod local;
mod remote;

pub use local::LocalChannel;
pub use remote::{RemoteChannel, Transport};

use serde::Serialize;

use crate::error::Result;
use crate::utils::command::CommandOutput;
use crate::utils::shell;

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    pub program: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shell-escaped rendering: every word escaped on its own.
    pub fn escaped(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell::escape_words(&words)
    }
}

/// One entry of a remote session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Step {
    Run(Command),
    ChangeDirectory { path: String },
    Exec { command: String },
}

impl Step {
    pub fn render(&self) -> String {
        match self {
            Step::Run(command) => command.escaped(),
            Step::ChangeDirectory { path } => format!("cd {}", shell::escape_word(path)),
            Step::Exec { command } => command.clone(),
        }
    }
}

/// Join a history into one command line; any failing step aborts the rest.
pub fn join(history: &[Step]) -> String {
    history
        .iter()
        .map(Step::render)
        .collect::<Vec<_>>()
        .join(" && ")
}

/// Build a rake task name, `name[arg1,arg2]` when arguments are given.
pub fn rake_task(name: &str, args: &[String]) -> String {
    if args.is_empty() {
        name.to_string()
    } else {
        format!("{}[{}]", name, args.join(","))
    }
}

/// Scoped block run by `Channel::within`.
pub type Block<'b> = dyn FnMut(&mut dyn Channel) -> Result<()> + 'b;

pub trait Channel {
    /// Run a program with arguments.
    fn run(&mut self, command: Command) -> Result<()>;

    /// Run a raw shell command string as-is.
    fn exec(&mut self, command: &str) -> Result<()>;

    /// Change the working directory for subsequent commands.
    fn cd(&mut self, path: &str) -> Result<()>;

    /// Change into `path` for the duration of `block`, then change back.
    fn within(&mut self, path: &str, block: &mut Block<'_>) -> Result<()>;

    /// Print a status message on this machine.
    fn status(&mut self, message: &str);

    /// Run a rake task.
    fn rake(&mut self, task: &str, args: &[String]) -> Result<()> {
        self.run(Command::new("rake").arg(rake_task(task, args)))
    }

    /// The command line `close` would replay, if anything is queued.
    fn pending(&self) -> Option<String> {
        None
    }

    /// Finish the session. Remote channels replay their history here and
    /// return the outcome; local channels have nothing left to do.
    fn close(self: Box<Self>) -> Result<Option<CommandOutput>>;
}
