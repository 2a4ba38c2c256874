use std::path::PathBuf;

use deckhand::Project;

pub type CmdResult<T> = deckhand::Result<(T, i32)>;

/// Exit code for a run whose remote batch or local step failed.
pub const TASK_FAILED_EXIT: i32 = 20;

pub(crate) struct GlobalArgs {
    pub environment: String,
    pub root: Option<PathBuf>,
}

/// Load the project at `--root`, or the nearest one above the working
/// directory.
pub(crate) fn load_project(global: &GlobalArgs) -> deckhand::Result<Project> {
    let root = match &global.root {
        Some(root) => root.clone(),
        None => {
            let cwd = std::env::current_dir().map_err(|e| {
                deckhand::Error::internal_io(e.to_string(), Some("read working directory".to_string()))
            })?;
            Project::find_root(&cwd)?
        }
    };
    Project::load(root)
}

/// Exit code for a finished run report.
pub(crate) fn report_exit_code(report: &deckhand::RunReport) -> i32 {
    if report.success {
        0
    } else {
        TASK_FAILED_EXIT
    }
}

pub mod envs;
pub mod exec;
pub mod rake;
pub mod ssh;
pub mod tasks;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($global))
    };
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (deckhand::Result<serde_json::Value>, i32) {
    crate::tty::status("deckhand is working...");

    match command {
        crate::Commands::Exec(args) => dispatch!(args, global, exec),
        crate::Commands::Rake(args) => dispatch!(args, global, rake),
        crate::Commands::Ssh(args) => dispatch!(args, global, ssh),
        crate::Commands::Envs => dispatch!(global, envs),

        // Every remaining command is a task verb or task-set
        task => {
            let name = task.task().unwrap_or_default();
            crate::output::map_cmd_result_to_json(tasks::run(name, global))
        }
    }
}
