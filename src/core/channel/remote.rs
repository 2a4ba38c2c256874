use super::{join, Block, Channel, Command, Step};
use crate::address::Address;
use crate::error::Result;
use crate::utils::command::CommandOutput;

/// Executes a joined command line against a destination.
pub trait Transport {
    fn execute(&self, dest: &Address, command: &str) -> Result<CommandOutput>;
}

/// Records every call into a history and replays it as one command line
/// when the channel is closed.
pub struct RemoteChannel<'t> {
    dest: Address,
    history: Vec<Step>,
    transport: &'t dyn Transport,
    debug: bool,
}

impl<'t> RemoteChannel<'t> {
    pub fn new(dest: Address, transport: &'t dyn Transport) -> Self {
        Self {
            dest,
            history: Vec::new(),
            transport,
            debug: false,
        }
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn dest(&self) -> &Address {
        &self.dest
    }

    pub fn history(&self) -> &[Step] {
        &self.history
    }

    /// The history as a single `&&`-joined, shell-escaped command line.
    pub fn join(&self) -> String {
        join(&self.history)
    }

    /// Replay the history over the transport. Consumes the channel, so a
    /// history is flushed at most once; an empty history is never sent.
    pub fn replay(self) -> Result<Option<CommandOutput>> {
        if self.history.is_empty() {
            return Ok(None);
        }

        if let Some(trace) = self.trace() {
            log_status!("remote", "{}", trace);
        }
        self.transport.execute(&self.dest, &self.join()).map(Some)
    }

    /// The line logged before replay in debug mode.
    pub fn trace(&self) -> Option<String> {
        if !self.debug || self.history.is_empty() {
            return None;
        }
        Some(format!("{} $ {}", self.dest.label(), self.join()))
    }
}

impl Channel for RemoteChannel<'_> {
    fn run(&mut self, command: Command) -> Result<()> {
        self.history.push(Step::Run(command));
        Ok(())
    }

    fn exec(&mut self, command: &str) -> Result<()> {
        self.history.push(Step::Exec {
            command: command.to_string(),
        });
        Ok(())
    }

    fn cd(&mut self, path: &str) -> Result<()> {
        self.history.push(Step::ChangeDirectory {
            path: path.to_string(),
        });
        Ok(())
    }

    fn within(&mut self, path: &str, block: &mut Block<'_>) -> Result<()> {
        self.cd(path)?;
        let result = block(self);
        self.cd("-")?;
        result
    }

    fn status(&mut self, message: &str) {
        log_status!("remote", "{}: {}", self.dest.label(), message);
    }

    fn pending(&self) -> Option<String> {
        if self.history.is_empty() {
            None
        } else {
            Some(self.join())
        }
    }

    fn close(self: Box<Self>) -> Result<Option<CommandOutput>> {
        (*self).replay()
    }
}
