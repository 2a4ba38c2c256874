use std::path::{Path, PathBuf};

use super::{Block, Channel, Command};
use crate::error::{Error, Result};
use crate::utils::command::{self, CommandOutput};

/// Runs every call immediately on this machine.
///
/// The working directory is tracked per channel and handed to each child
/// process; the process-wide current directory is never touched.
#[derive(Debug, Clone)]
pub struct LocalChannel {
    cwd: PathBuf,
}

impl LocalChannel {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path).to_string();
        self.cwd.join(expanded)
    }
}

impl Channel for LocalChannel {
    fn run(&mut self, command: Command) -> Result<()> {
        command::run_passthrough(&command.program, &command.args, Some(&self.cwd))
    }

    fn exec(&mut self, command: &str) -> Result<()> {
        command::run_shell_passthrough(command, Some(&self.cwd))
    }

    fn cd(&mut self, path: &str) -> Result<()> {
        let target = self.resolve(path);
        if !target.is_dir() {
            return Err(Error::internal_io(
                format!("No such directory: {}", target.display()),
                Some(format!("cd {}", path)),
            ));
        }
        self.cwd = target;
        Ok(())
    }

    fn within(&mut self, path: &str, block: &mut Block<'_>) -> Result<()> {
        let previous = self.cwd.clone();
        self.cd(path)?;
        let result = block(self);
        self.cwd = previous;
        result
    }

    fn status(&mut self, message: &str) {
        log_status!("local", "{}", message);
    }

    fn close(self: Box<Self>) -> Result<Option<CommandOutput>> {
        Ok(None)
    }
}
