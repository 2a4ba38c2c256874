//! Command execution primitives with consistent error handling.

use std::path::Path;
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::error::{CommandFailedDetails, Error, Result};

/// Outcome of running one external process.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        Self {
            success: status.success(),
            exit_code: status.code().unwrap_or(-1),
        }
    }
}

/// Run a program with stdout/stderr passed through to the terminal.
///
/// Returns an error when the program cannot be spawned or exits non-zero.
pub fn run_passthrough(program: &str, args: &[String], current_dir: Option<&Path>) -> Result<()> {
    let mut cmd = Command::new(program);
    cmd.args(args).stdout(Stdio::inherit()).stderr(Stdio::inherit());

    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    let rendered = render(program, args);
    let status = cmd.status().map_err(|e| {
        Error::internal_io(
            format!("Failed to run {}: {}", program, e),
            Some(rendered.clone()),
        )
    })?;

    require_success(CommandOutput::from_status(status), rendered, current_dir)
}

/// Run a raw command string through `sh -c`, passing output through.
pub fn run_shell_passthrough(command: &str, current_dir: Option<&Path>) -> Result<()> {
    run_passthrough("sh", &["-c".to_string(), command.to_string()], current_dir).map_err(|mut e| {
        // report the command the user wrote, not the sh wrapper
        if let Some(obj) = e.details.as_object_mut() {
            if obj.contains_key("command") {
                obj.insert("command".to_string(), serde_json::json!(command));
            }
        }
        e
    })
}

/// Turn a non-zero exit into a `command.failed` error.
pub fn require_success(
    output: CommandOutput,
    command: String,
    current_dir: Option<&Path>,
) -> Result<()> {
    if output.success {
        Ok(())
    } else {
        Err(Error::command_failed(CommandFailedDetails {
            command,
            exit_code: output.exit_code,
            working_dir: current_dir.map(|d| d.display().to_string()),
        }))
    }
}

fn render(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
