use deckhand::{RunReport, SshTransport};

use super::{load_project, report_exit_code, CmdResult, GlobalArgs};

/// Run one task verb or task-set in the selected environment.
pub fn run(task: &str, global: &GlobalArgs) -> CmdResult<RunReport> {
    let project = load_project(global)?;
    let report = project.invoke(&[task], &global.environment, &SshTransport)?;
    let exit_code = report_exit_code(&report);
    Ok((report, exit_code))
}
