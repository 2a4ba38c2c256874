use clap::Args;
use deckhand::{RunReport, SshTransport};

use super::{load_project, report_exit_code, CmdResult, GlobalArgs};

#[derive(Args)]
pub struct RakeArgs {
    /// Rake task name (e.g. db:seed)
    pub task: String,

    /// Task arguments, passed as `task[arg1,arg2]`
    #[arg(num_args = 0..)]
    pub args: Vec<String>,
}

pub fn run(args: RakeArgs, global: &GlobalArgs) -> CmdResult<RunReport> {
    let project = load_project(global)?;
    let report = project.rake(&args.task, &args.args, &global.environment, &SshTransport)?;
    let exit_code = report_exit_code(&report);
    Ok((report, exit_code))
}
