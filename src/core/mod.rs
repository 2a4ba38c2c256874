// Public modules
pub mod address;
pub mod capability;
pub mod channel;
pub mod config;
pub mod environment;
pub mod error;
pub mod hooks;
pub mod pipeline;
pub mod project;
pub mod ssh;
pub mod task;
pub mod transfer;

// Re-export common types for convenience
pub use address::Address;
pub use channel::{Channel, Command, LocalChannel, RemoteChannel, Transport};
pub use config::Configuration;
pub use environment::Environment;
pub use error::{Error, ErrorCode, Result};
pub use pipeline::{RunReport, TaskState};
pub use project::Project;
pub use ssh::SshTransport;
pub use task::TaskVerb;
