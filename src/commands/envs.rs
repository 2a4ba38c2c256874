use deckhand::environment::EnvironmentSummary;
use serde::Serialize;

use super::{load_project, CmdResult, GlobalArgs};

#[derive(Debug, Serialize)]
pub struct EnvsOutput {
    pub root: String,
    pub environments: Vec<EnvironmentSummary>,
}

pub fn run(global: &GlobalArgs) -> CmdResult<EnvsOutput> {
    let project = load_project(global)?;
    let environments = project.environments().map(|env| env.summary()).collect();
    Ok((
        EnvsOutput {
            root: project.root().display().to_string(),
            environments,
        },
        0,
    ))
}
