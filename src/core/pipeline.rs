//! Task pipeline.
//!
//! A run resolves its verbs up front, executes any leading `pull` once on
//! this machine, then fans out over the destinations one at a time. Verbs
//! run in the order given. Session verbs share one channel per destination;
//! a local verb (`pull`, `push`) that follows them closes that session
//! first, so its batch is replayed before the local step runs. The first
//! failed destination stops the fan-out.

use serde::Serialize;

use crate::address::Address;
use crate::channel::{Channel, LocalChannel, Transport};
use crate::environment::Environment;
use crate::error::{Error, ErrorCode, Result};
use crate::hooks::{self, HookPhase};
use crate::task::TaskVerb;
use crate::utils::command::CommandOutput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    /// Started, or queued on a remote channel awaiting replay.
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub task: TaskVerb,
    pub state: TaskState,
    pub implemented: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DestinationReport {
    pub target: String,
    pub attempted: bool,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// The joined command line (remote) or the failing command (local).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub environment: String,
    pub success: bool,
    /// Verbs executed once per run on this machine.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub local: Vec<TaskRecord>,
    pub destinations: Vec<DestinationReport>,
}

impl RunReport {
    fn new(env: &Environment) -> Self {
        Self {
            environment: env.name().to_string(),
            success: true,
            local: Vec::new(),
            destinations: Vec::new(),
        }
    }

    fn skip_remaining(&mut self, env: &Environment, from: usize, verbs: &[TaskVerb]) {
        for dest in &env.config().dest[from..] {
            let mut report = DestinationReport::pending(dest);
            report.tasks = records(env, verbs);
            self.destinations.push(report);
        }
    }
}

impl DestinationReport {
    fn pending(dest: &Address) -> Self {
        Self {
            target: dest.to_string(),
            attempted: false,
            success: false,
            exit_code: None,
            command: None,
            tasks: Vec::new(),
        }
    }

    fn fail(&mut self, failure: Failure) {
        self.success = false;
        self.exit_code = Some(failure.exit_code);
        self.command = Some(failure.command);
    }
}

/// A locally executed step that exited non-zero.
struct Failure {
    exit_code: i32,
    command: String,
}

/// Local step failures become a failed outcome; anything else aborts the run.
fn as_failure(err: Error) -> Result<Failure> {
    if err.code != ErrorCode::CommandFailed {
        return Err(err);
    }
    Ok(Failure {
        exit_code: err.details["exitCode"].as_i64().unwrap_or(1) as i32,
        command: err.details["command"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
    })
}

fn records(env: &Environment, verbs: &[TaskVerb]) -> Vec<TaskRecord> {
    verbs
        .iter()
        .map(|verb| TaskRecord {
            task: *verb,
            state: TaskState::Pending,
            implemented: env.implements(*verb),
        })
        .collect()
}

/// before-hooks, the task body if implemented, after-hooks.
fn run_task(env: &Environment, verb: TaskVerb, ch: &mut dyn Channel, dest: &Address) -> Result<()> {
    let config = env.config();
    hooks::run_hooks(ch, &config.before, verb)?;
    if env.implements(verb) {
        ch.status(verb.progress());
        env.perform(verb, ch, dest)?;
    }
    hooks::run_hooks(ch, &config.after, verb)?;
    Ok(())
}

/// Run `verbs` in order against every destination of `env`.
pub fn run(env: &Environment, verbs: &[TaskVerb], transport: &dyn Transport) -> Result<RunReport> {
    let config = env.config();
    hooks::validate(&config.before, HookPhase::Before)?;
    hooks::validate(&config.after, HookPhase::After)?;
    env.preflight(verbs)?;

    let mut report = RunReport::new(env);
    let leading = verbs.iter().take_while(|verb| **verb == TaskVerb::Pull).count();
    let (local, remaining) = verbs.split_at(leading);

    if !local.is_empty() {
        report.local = records(env, local);
        let mut ch = LocalChannel::new(env.root());
        let mut failure = None;
        for record in report.local.iter_mut() {
            record.state = TaskState::Running;
            if let Err(err) = run_task(env, record.task, &mut ch, &config.source) {
                record.state = TaskState::Failed;
                failure = Some((record.task, as_failure(err)?));
                break;
            }
            record.state = TaskState::Completed;
        }

        if let Some((verb, failure)) = failure {
            log_status!(
                "pipeline",
                "{} failed with exit code {}",
                verb,
                failure.exit_code
            );
            report.success = false;
            report.skip_remaining(env, 0, remaining);
            return Ok(report);
        }
    }

    for (index, dest) in config.dest.iter().enumerate() {
        let outcome = run_destination(env, dest, remaining, transport)?;
        let failed = !outcome.success;
        report.destinations.push(outcome);
        if failed {
            report.success = false;
            report.skip_remaining(env, index + 1, remaining);
            break;
        }
    }

    Ok(report)
}

fn run_destination(
    env: &Environment,
    dest: &Address,
    verbs: &[TaskVerb],
    transport: &dyn Transport,
) -> Result<DestinationReport> {
    let mut report = DestinationReport::pending(dest);
    report.attempted = true;
    report.success = true;
    report.tasks = records(env, verbs);

    let deferred = !dest.is_local();
    let mut local = LocalChannel::new(env.root());
    let mut session: Option<Box<dyn Channel + '_>> = None;
    let mut in_dest = false;

    for index in 0..report.tasks.len() {
        let verb = report.tasks[index].task;

        let result = if verb.is_local() {
            // replay what the session queued before stepping back here
            if let Some(ch) = session.take() {
                if !flush(&mut report, ch)? {
                    return Ok(report);
                }
            }
            report.tasks[index].state = TaskState::Running;
            run_task(env, verb, &mut local, dest)
        } else {
            report.tasks[index].state = TaskState::Running;
            let ch: &mut dyn Channel = &mut **session.get_or_insert_with(|| {
                in_dest = false;
                env.open(dest, transport)
            });
            let mut entered = Ok(());
            if !in_dest && verb != TaskVerb::Setup {
                entered = ch.cd(dest.path().unwrap_or("."));
                in_dest = entered.is_ok();
            }
            entered.and_then(|()| run_task(env, verb, ch, dest))
        };

        let record = &mut report.tasks[index];
        match result {
            Err(err) => {
                record.state = TaskState::Failed;
                report.fail(as_failure(err)?);
                return Ok(report);
            }
            Ok(()) if verb.is_local() || !deferred => record.state = TaskState::Completed,
            Ok(()) => {}
        }
    }

    if let Some(ch) = session.take() {
        flush(&mut report, ch)?;
    }
    Ok(report)
}

/// Close a session, replaying its batch. Returns whether the destination
/// is still healthy.
fn flush(report: &mut DestinationReport, ch: Box<dyn Channel + '_>) -> Result<bool> {
    let line = ch.pending();
    let replayed = ch.close()?;
    settle(report, line, replayed);
    Ok(report.success)
}

/// Resolve queued tasks once the batch has been replayed.
fn settle(report: &mut DestinationReport, line: Option<String>, replayed: Option<CommandOutput>) {
    let (success, exit_code) = match replayed {
        Some(output) => (output.success, Some(output.exit_code)),
        None => (true, None),
    };

    report.success = success;
    if exit_code.is_some() {
        report.exit_code = exit_code;
        report.command = line;
    }
    let state = if success {
        TaskState::Completed
    } else {
        TaskState::Failed
    };
    for record in report.tasks.iter_mut() {
        if record.state == TaskState::Running {
            record.state = state;
        }
    }
}

/// Open one session per destination, run `block` in it, and close it.
/// Used by the verbs that sit outside the task list (`exec`, `rake`).
pub fn run_in_destinations(
    env: &Environment,
    transport: &dyn Transport,
    block: &mut dyn FnMut(&mut dyn Channel, &Address) -> Result<()>,
) -> Result<RunReport> {
    let mut report = RunReport::new(env);

    for (index, dest) in env.config().dest.iter().enumerate() {
        let mut outcome = DestinationReport::pending(dest);
        outcome.attempted = true;

        let mut ch = env.open(dest, transport);
        match block(ch.as_mut(), dest) {
            Ok(()) => {
                flush(&mut outcome, ch)?;
            }
            Err(err) => outcome.fail(as_failure(err)?),
        }

        let failed = !outcome.success;
        report.destinations.push(outcome);
        if failed {
            report.success = false;
            report.skip_remaining(env, index + 1, &[]);
            break;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use serde_json::{json, Value};
    use std::cell::RefCell;
    use std::path::Path;

    #[derive(Default)]
    struct Recorder {
        sent: RefCell<Vec<(String, String)>>,
        fail: bool,
    }

    impl Transport for Recorder {
        fn execute(&self, dest: &Address, command: &str) -> Result<CommandOutput> {
            self.sent
                .borrow_mut()
                .push((dest.ssh_target()?, command.to_string()));
            Ok(CommandOutput {
                success: !self.fail,
                exit_code: if self.fail { 3 } else { 0 },
            })
        }
    }

    fn env(raw: Value) -> Environment {
        Environment::new("production", &raw, Path::new("/work/app")).unwrap()
    }

    fn remote(extra: Value) -> Environment {
        let mut raw = json!({
            "scm": "git",
            "source": "git@github.com:user/app.git",
            "dest": "ssh://deploy@www.example.com/srv/app",
        });
        for (key, value) in extra.as_object().cloned().unwrap_or_default() {
            raw[key.as_str()] = value;
        }
        env(raw)
    }

    #[test]
    fn deploy_runs_in_fixed_order() {
        let env = remote(json!({
            "framework": "rails3",
            "server": {"name": "thin", "options": {"config": "/etc/thin/app.yml"}},
        }));
        let recorder = Recorder::default();
        let report = env.invoke(&["deploy"], &recorder).unwrap();

        assert!(report.success);
        let sent = recorder.sent.borrow();
        assert_eq!(sent.len(), 1);
        let line = &sent[0].1;
        let setup = line.find("git clone").unwrap();
        let cd = line.find("cd /srv/app").unwrap();
        let install = line.find("bundle install").unwrap();
        let migrate = line.find("rake db:migrate").unwrap();
        let config = line.find("thin config").unwrap();
        let start = line.find("thin start").unwrap();
        assert!(setup < cd && cd < install && install < migrate);
        assert!(migrate < config && config < start);

        let states: Vec<TaskState> = report.destinations[0].tasks.iter().map(|t| t.state).collect();
        assert!(states.iter().all(|s| *s == TaskState::Completed));
    }

    #[test]
    fn redeploy_runs_in_fixed_order() {
        let env = remote(json!({"framework": "rails2", "server": "apache"}));
        let recorder = Recorder::default();
        env.invoke(&["redeploy"], &recorder).unwrap();

        let line = recorder.sent.borrow()[0].1.clone();
        assert_eq!(
            line,
            "cd /srv/app && git reset --hard HEAD && git pull && rake db:migrate RAILS_ENV\\=production && apachectl restart"
        );
    }

    #[test]
    fn unimplemented_tasks_are_noops() {
        let env = remote(json!({}));
        let recorder = Recorder::default();
        let report = env.invoke(&["install", "restart"], &recorder).unwrap();

        assert!(report.success);
        let tasks = &report.destinations[0].tasks;
        assert!(tasks.iter().all(|t| !t.implemented));
        assert_eq!(recorder.sent.borrow()[0].1, "cd /srv/app");
    }

    #[test]
    fn unknown_task_is_rejected_before_anything_runs() {
        let env = remote(json!({}));
        let recorder = Recorder::default();
        let err = env.invoke(&["setup", "reboot"], &recorder).unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskInvalid);
        assert!(recorder.sent.borrow().is_empty());
    }

    #[test]
    fn hooks_wrap_the_task_body() {
        let env = remote(json!({
            "server": "apache",
            "before": {"restart": ["echo one", "echo two"]},
            "after": {"restart": "echo three"},
        }));
        let recorder = Recorder::default();
        env.invoke(&["restart"], &recorder).unwrap();

        assert_eq!(
            recorder.sent.borrow()[0].1,
            "cd /srv/app && echo one && echo two && apachectl restart && echo three"
        );
    }

    #[test]
    fn hooks_run_even_when_task_is_not_implemented() {
        let env = remote(json!({"before": {"migrate": "echo backup"}}));
        let recorder = Recorder::default();
        env.invoke(&["migrate"], &recorder).unwrap();
        assert_eq!(recorder.sent.borrow()[0].1, "cd /srv/app && echo backup");
    }

    #[test]
    fn unknown_hook_key_fails_at_invocation() {
        let env = remote(json!({"after": {"deploy": "echo done"}}));
        let recorder = Recorder::default();
        let err = env.invoke(&["setup"], &recorder).unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskInvalid);
    }

    #[test]
    fn each_destination_gets_its_own_session() {
        let env = remote(json!({
            "server": "apache",
            "dest": [
                "ssh://deploy@a.example.com/srv/app",
                "ssh://deploy@b.example.com/srv/app",
                "ssh://deploy@c.example.com/srv/app",
            ],
        }));
        let recorder = Recorder::default();
        let report = env.invoke(&["restart"], &recorder).unwrap();

        assert_eq!(report.destinations.len(), 3);
        let sent = recorder.sent.borrow();
        let targets: Vec<&str> = sent.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(
            targets,
            vec!["deploy@a.example.com", "deploy@b.example.com", "deploy@c.example.com"]
        );
        assert!(sent.iter().all(|(_, line)| line == "cd /srv/app && apachectl restart"));
    }

    #[test]
    fn failed_replay_stops_fan_out() {
        let env = remote(json!({
            "server": "apache",
            "dest": ["deploy@a.example.com:/srv/app", "deploy@b.example.com:/srv/app"],
        }));
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let report = env.invoke(&["restart"], &recorder).unwrap();

        assert!(!report.success);
        assert_eq!(recorder.sent.borrow().len(), 1);

        let first = &report.destinations[0];
        assert!(first.attempted);
        assert_eq!(first.exit_code, Some(3));
        assert_eq!(first.command.as_deref(), Some("cd /srv/app && apachectl restart"));
        assert_eq!(first.tasks[0].state, TaskState::Failed);

        let second = &report.destinations[1];
        assert!(!second.attempted);
        assert_eq!(second.tasks[0].state, TaskState::Pending);
    }

    #[test]
    fn missing_server_option_fails_before_anything_runs() {
        let env = remote(json!({
            "server": "thin",
            "before": {"start": "echo starting"},
        }));
        let recorder = Recorder::default();
        let err = env.invoke(&["start", "config"], &recorder).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissingKey);
        assert!(recorder.sent.borrow().is_empty());
    }

    #[test]
    fn exec_and_rake_run_inside_destination() {
        let env = remote(json!({"framework": "rails3"}));
        let recorder = Recorder::default();
        env.exec("tail -n 20 log/production.log", &recorder).unwrap();
        env.rake("db:seed", &["demo".to_string()], &recorder).unwrap();

        let sent = recorder.sent.borrow();
        assert_eq!(sent[0].1, "cd /srv/app && tail -n 20 log/production.log");
        assert_eq!(
            sent[1].1,
            "cd /srv/app && rake db:seed\\[demo\\] RAILS_ENV\\=production"
        );
    }
}
