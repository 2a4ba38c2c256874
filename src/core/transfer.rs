//! Bulk transfer of the staging copy to a destination.

use std::collections::BTreeSet;
use std::path::Path;

use crate::address::Address;
use crate::channel::Command;

/// `rsync [-v] -a --delete-before [--exclude=<pattern>]... <staging>/ <target>`
pub fn push_command(
    staging: &Path,
    dest: &Address,
    exclude: &BTreeSet<String>,
    verbose: bool,
) -> Command {
    let mut command = Command::new("rsync");
    if verbose {
        command = command.arg("-v");
    }
    command = command.args(["-a", "--delete-before"]);
    command = command.args(exclude.iter().map(|pattern| format!("--exclude={}", pattern)));

    let mut source = staging.display().to_string();
    if !source.ends_with('/') {
        source.push('/');
    }
    command.arg(source).arg(dest.rsync_target())
}
