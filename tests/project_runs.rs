use std::cell::RefCell;
use std::fs;
use std::path::Path;

use deckhand::utils::command::CommandOutput;
use deckhand::{Address, ErrorCode, Project, Result, TaskState, Transport};

#[derive(Default)]
struct Recorder {
    sent: RefCell<Vec<(String, String)>>,
}

impl Transport for Recorder {
    fn execute(&self, dest: &Address, command: &str) -> Result<CommandOutput> {
        self.sent
            .borrow_mut()
            .push((dest.ssh_target()?, command.to_string()));
        Ok(CommandOutput {
            success: true,
            exit_code: 0,
        })
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn thin_start_carries_socket_option() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "config/deploy.yml",
        r#"
source: "git@host:repo.git"
dest: "ssh://user@h/srv/app"
server:
  name: thin
  options:
    socket: /tmp/thin.sock
"#,
    );

    let project = Project::load(dir.path()).unwrap();
    let recorder = Recorder::default();
    let report = project.start("production", &recorder).unwrap();

    assert!(report.success);
    let sent = recorder.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "user@h");
    assert!(sent[0].1.starts_with("cd /srv/app && thin start "));
    assert!(sent[0].1.contains("--socket /tmp/thin.sock"));
}

#[test]
fn three_destinations_three_sessions() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config/deploy.yml", "source: git@host:repo.git\nscm: git\n");
    write(
        dir.path(),
        "config/deploy/production.yml",
        r#"
dest:
  - ssh://deploy@one.example.com/srv/app
  - ssh://deploy@two.example.com:2222/srv/app
  - host: three.example.com
    user: deploy
    path: /srv/app
"#,
    );

    let project = Project::load(dir.path()).unwrap();
    let recorder = Recorder::default();
    let report = project.redeploy("production", &recorder).unwrap();

    assert_eq!(report.destinations.len(), 3);
    assert!(report.destinations.iter().all(|d| d.attempted && d.success));

    let sent = recorder.sent.borrow();
    let hosts: Vec<&str> = sent.iter().map(|(host, _)| host.as_str()).collect();
    assert_eq!(
        hosts,
        vec![
            "deploy@one.example.com",
            "deploy@two.example.com",
            "deploy@three.example.com"
        ]
    );
    for (_, line) in sent.iter() {
        assert_eq!(line, "cd /srv/app && git reset --hard HEAD && git pull");
    }
}

#[test]
fn environments_are_selected_by_name() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "config/deploy.yml", "source: /src/app\nserver: apache\n");
    write(
        dir.path(),
        "config/deploy/staging.yml",
        "dest: deploy@staging.example.com:/srv/app\n",
    );
    write(
        dir.path(),
        "config/deploy/production.yml",
        "dest: deploy@www.example.com:/srv/app\n",
    );

    let project = Project::load(dir.path()).unwrap();
    let recorder = Recorder::default();
    project.restart("staging", &recorder).unwrap();

    assert_eq!(recorder.sent.borrow()[0].0, "deploy@staging.example.com");

    let err = project.restart("qa", &recorder).err().unwrap();
    assert_eq!(err.code, ErrorCode::EnvironmentNotFound);
}

#[test]
fn unknown_capability_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "config/deploy.yml",
        "source: /src/app\ndest: /srv/app\nframework: django\n",
    );
    let err = Project::load(dir.path()).err().unwrap();
    assert_eq!(err.code, ErrorCode::CapabilityUnknown);
    assert_eq!(err.details["axis"], "framework");
}

#[test]
fn local_destination_runs_hooks_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("srv");
    fs::create_dir_all(&dest).unwrap();
    write(
        dir.path(),
        "config/deploy.yml",
        &format!(
            r#"
source: /src/app
dest: {}
before:
  migrate: [ "echo one >> hooks.log", "echo two >> hooks.log" ]
after:
  migrate: "echo three >> hooks.log"
"#,
            dest.display()
        ),
    );

    let project = Project::load(dir.path()).unwrap();
    let recorder = Recorder::default();
    let report = project.migrate("production", &recorder).unwrap();

    assert!(report.success);
    assert!(recorder.sent.borrow().is_empty());
    assert_eq!(report.destinations[0].tasks[0].state, TaskState::Completed);
    assert!(!report.destinations[0].tasks[0].implemented);
    assert_eq!(
        fs::read_to_string(dest.join("hooks.log")).unwrap(),
        "one\ntwo\nthree\n"
    );
}

#[test]
fn failing_local_hook_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("srv");
    fs::create_dir_all(&dest).unwrap();
    write(
        dir.path(),
        "config/deploy.yml",
        &format!(
            "source: /src/app\ndest: {}\nbefore:\n  install: \"exit 7\"\n",
            dest.display()
        ),
    );

    let project = Project::load(dir.path()).unwrap();
    let report = project.install("production", &Recorder::default()).unwrap();

    assert!(!report.success);
    let outcome = &report.destinations[0];
    assert_eq!(outcome.exit_code, Some(7));
    assert_eq!(outcome.command.as_deref(), Some("exit 7"));
    assert_eq!(outcome.tasks[0].state, TaskState::Failed);
}

#[test]
fn local_verbs_keep_their_declared_position() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("srv");
    fs::create_dir_all(&dest).unwrap();
    let log = dir.path().join("order.log");
    write(
        dir.path(),
        "config/deploy.yml",
        &format!(
            r#"
scm: git
source: /src/app
dest: {dest}
before:
  install: "echo install >> {log}"
  pull: "echo pull >> {log} && exit 5"
"#,
            dest = dest.display(),
            log = log.display()
        ),
    );

    let project = Project::load(dir.path()).unwrap();
    let report = project
        .invoke(&["install", "pull"], "production", &Recorder::default())
        .unwrap();

    assert_eq!(fs::read_to_string(&log).unwrap(), "install\npull\n");
    assert!(!report.success);
    assert!(report.local.is_empty());
    let outcome = &report.destinations[0];
    assert_eq!(outcome.tasks[0].state, TaskState::Completed);
    assert_eq!(outcome.tasks[1].state, TaskState::Failed);
    assert_eq!(outcome.exit_code, Some(5));
}

#[test]
fn session_is_replayed_before_a_later_local_verb() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "config/deploy.yml",
        r#"
scm: git
source: git@host:repo.git
dest: ssh://deploy@www.example.com/srv/app
server: apache
before:
  push: "exit 9"
"#,
    );

    let project = Project::load(dir.path()).unwrap();
    let recorder = Recorder::default();
    let report = project
        .invoke(&["update", "push", "restart"], "production", &recorder)
        .unwrap();

    let sent = recorder.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, "cd /srv/app && git reset --hard HEAD && git pull");

    assert!(!report.success);
    let outcome = &report.destinations[0];
    assert_eq!(outcome.exit_code, Some(9));
    assert_eq!(outcome.command.as_deref(), Some("exit 9"));
    let states: Vec<TaskState> = outcome.tasks.iter().map(|t| t.state).collect();
    assert_eq!(
        states,
        vec![TaskState::Completed, TaskState::Failed, TaskState::Pending]
    );
}

#[test]
fn mongrel_without_config_fails_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("srv");
    fs::create_dir_all(&dest).unwrap();
    write(
        dir.path(),
        "config/deploy.yml",
        &format!(
            "source: /src/app\ndest: {}\nserver: mongrel\nbefore:\n  stop: \"echo stop >> side_effect.log\"\n",
            dest.display()
        ),
    );

    let err = Project::load(dir.path()).err().unwrap();
    assert_eq!(err.code, ErrorCode::ConfigMissingKey);
    assert_eq!(err.details["key"], "server.options.config");
    assert!(!dest.join("side_effect.log").exists());
}
