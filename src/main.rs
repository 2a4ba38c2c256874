use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::GlobalArgs;
use deckhand::project::DEFAULT_ENVIRONMENT;

#[derive(Debug, Clone, Copy)]
enum ResponseMode {
    Json,
    InteractivePassthrough,
}

mod commands;
mod output;
mod tty;

use commands::{exec, rake, ssh};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "deckhand")]
#[command(version = VERSION)]
#[command(about = "Deploy a project to one or more hosts")]
struct Cli {
    /// Environment to operate on
    #[arg(short = 'E', long, global = true, default_value = DEFAULT_ENVIRONMENT)]
    environment: String,

    /// Project root (defaults to the nearest directory with config/deploy.yml)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone the source into the destination path
    Setup,
    /// Reset and fast-forward the deployed checkout
    Update,
    /// Install additional dependencies
    Install,
    /// Migrate the database
    Migrate,
    /// Configure the application server
    Config,
    /// Start the application server
    Start,
    /// Stop the application server
    Stop,
    /// Restart the application server
    Restart,
    /// Fetch or refresh the local staging copy
    Pull,
    /// Upload the staging copy to every destination
    Push,
    /// Fresh deployment: setup, install, migrate, config, start
    Deploy,
    /// Follow-up deployment: update, install, migrate, restart
    Redeploy,
    /// Deploy by upload: pull, push, install, migrate, restart
    Ship,
    /// Run a shell command inside the destination directory
    Exec(exec::ExecArgs),
    /// Run a rake task inside the destination directory
    Rake(rake::RakeArgs),
    /// Open an ssh session with the destination
    Ssh(ssh::SshArgs),
    /// List configured environments and the tasks they implement
    Envs,
}

impl Commands {
    /// Task name for the commands that map onto a pipeline run.
    fn task(&self) -> Option<&'static str> {
        match self {
            Commands::Setup => Some("setup"),
            Commands::Update => Some("update"),
            Commands::Install => Some("install"),
            Commands::Migrate => Some("migrate"),
            Commands::Config => Some("config"),
            Commands::Start => Some("start"),
            Commands::Stop => Some("stop"),
            Commands::Restart => Some("restart"),
            Commands::Pull => Some("pull"),
            Commands::Push => Some("push"),
            Commands::Deploy => Some("deploy"),
            Commands::Redeploy => Some("redeploy"),
            Commands::Ship => Some("ship"),
            Commands::Exec(_) | Commands::Rake(_) | Commands::Ssh(_) | Commands::Envs => None,
        }
    }
}

fn response_mode(command: &Commands) -> ResponseMode {
    match command {
        Commands::Ssh(_) => ResponseMode::InteractivePassthrough,
        _ => ResponseMode::Json,
    }
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    let global = GlobalArgs {
        environment: cli.environment,
        root: cli.root,
    };

    let mode = response_mode(&cli.command);

    if let Commands::Ssh(args) = &cli.command {
        if args.command.is_empty() && !tty::require_tty_for_interactive() {
            let err = deckhand::Error::validation_invalid_argument(
                "tty",
                "An interactive ssh session requires a TTY",
            );
            let _ = output::print_json_result(Err(err));
            return std::process::ExitCode::from(exit_code_to_u8(2));
        }
    }

    let (json_result, exit_code) = commands::run_json(cli.command, &global);

    match mode {
        ResponseMode::Json => {
            let _ = output::print_json_result(json_result);
        }
        ResponseMode::InteractivePassthrough => {
            if let Err(err) = json_result {
                let _ = output::print_json_result(Err(err));
            }
        }
    }

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
