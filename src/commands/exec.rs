use clap::Args;
use deckhand::{RunReport, SshTransport};

use super::{load_project, report_exit_code, CmdResult, GlobalArgs};

#[derive(Args)]
pub struct ExecArgs {
    /// Command to run, passed to the shell as written.
    ///
    /// Quote it when it uses shell operators:
    ///   deckhand exec "tail -n 50 log/production.log | grep ERROR"
    #[arg(required = true, num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

pub fn run(args: ExecArgs, global: &GlobalArgs) -> CmdResult<RunReport> {
    let project = load_project(global)?;
    let command = args.command.join(" ");
    let report = project.exec(&command, &global.environment, &SshTransport)?;
    let exit_code = report_exit_code(&report);
    Ok((report, exit_code))
}
