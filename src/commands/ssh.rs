use clap::Args;
use deckhand::utils::command::CommandOutput;

use super::{load_project, CmdResult, GlobalArgs};

#[derive(Args)]
pub struct SshArgs {
    /// Extra arguments for ssh (omit for an interactive shell).
    ///
    /// Examples:
    ///   deckhand ssh
    ///   deckhand -E staging ssh -- uptime
    #[arg(num_args = 0.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

pub fn run(args: SshArgs, global: &GlobalArgs) -> CmdResult<CommandOutput> {
    let project = load_project(global)?;
    let output = project.ssh(&args.command, &global.environment)?;
    let exit_code = output.exit_code;
    Ok((output, exit_code))
}
