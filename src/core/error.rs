use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidValue,
    ConfigInvalidYaml,
    ConfigNotFound,

    CapabilityUnknown,
    EnvironmentNotFound,
    TaskInvalid,

    ValidationInvalidArgument,

    SshConnectFailed,
    CommandFailed,

    InternalIoError,
    InternalJsonError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",
            ErrorCode::ConfigInvalidYaml => "config.invalid_yaml",
            ErrorCode::ConfigNotFound => "config.not_found",

            ErrorCode::CapabilityUnknown => "capability.unknown",
            ErrorCode::EnvironmentNotFound => "environment.not_found",
            ErrorCode::TaskInvalid => "task.invalid",

            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",

            ErrorCode::SshConnectFailed => "ssh.connect_failed",
            ErrorCode::CommandFailed => "command.failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidYamlDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigNotFoundDetails {
    pub root: String,
    pub searched: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityUnknownDetails {
    pub axis: String,
    pub name: String,
    pub known: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub available: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInvalidDetails {
    pub task: String,
    pub known: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub command: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConnectFailedDetails {
    pub target: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn config_missing_key(key: impl Into<String>, environment: Option<String>) -> Self {
        let key = key.into();
        let message = match &environment {
            Some(env) => format!("Missing required option '{}' for the {} environment", key, env),
            None => format!("Missing required option '{}'", key),
        };
        Self::new(
            ErrorCode::ConfigMissingKey,
            message,
            to_details(ConfigMissingKeyDetails { key, environment }),
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let problem = problem.into();
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid configuration value: {}", problem),
            to_details(ConfigInvalidValueDetails {
                key: key.into(),
                value,
                problem,
            }),
        )
    }

    pub fn config_invalid_yaml(path: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidYaml,
            "Invalid YAML in configuration",
            to_details(ConfigInvalidYamlDetails {
                path: path.into(),
                error: err.to_string(),
            }),
        )
        .with_hint("Fix the YAML syntax in the referenced file")
    }

    pub fn config_not_found(root: impl Into<String>, searched: Vec<String>) -> Self {
        let root = root.into();
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Could not find a deploy configuration in {}", root),
            to_details(ConfigNotFoundDetails { root, searched }),
        )
        .with_hint("Create config/deploy.yml with at least 'source' and 'dest'")
    }

    pub fn capability_unknown(
        axis: impl Into<String>,
        name: impl Into<String>,
        known: Vec<String>,
    ) -> Self {
        let axis = axis.into();
        let name = name.into();
        Self::new(
            ErrorCode::CapabilityUnknown,
            format!("Unknown {} '{}'", axis, name),
            to_details(CapabilityUnknownDetails {
                axis: axis.clone(),
                name,
                known: known.clone(),
            }),
        )
        .with_hint(format!("Known {} names: {}", axis, known.join(", ")))
    }

    pub fn environment_not_found(id: impl Into<String>, available: Vec<String>) -> Self {
        let id = id.into();
        let err = Self::new(
            ErrorCode::EnvironmentNotFound,
            format!("Unknown environment '{}'", id),
            to_details(NotFoundDetails {
                id,
                available: available.clone(),
            }),
        );
        if available.is_empty() {
            err
        } else {
            err.with_hint(format!("Configured environments: {}", available.join(", ")))
        }
    }

    pub fn task_invalid(task: impl Into<String>, known: Vec<String>) -> Self {
        let task = task.into();
        Self::new(
            ErrorCode::TaskInvalid,
            format!("Unknown task '{}'", task),
            to_details(TaskInvalidDetails { task, known }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            to_details(InvalidArgumentDetails {
                field: field.into(),
                problem: problem.into(),
            }),
        )
    }

    pub fn command_failed(details: CommandFailedDetails) -> Self {
        Self::new(
            ErrorCode::CommandFailed,
            format!("Command failed with exit code {}", details.exit_code),
            to_details(details),
        )
    }

    pub fn ssh_connect_failed(target: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::SshConnectFailed,
            "Failed to start ssh",
            to_details(SshConnectFailedDetails {
                target: target.into(),
                error: err.to_string(),
            }),
        )
        .with_hint("Check that an ssh client is installed and on PATH")
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalJsonError,
            "JSON error",
            to_details(InternalErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}
