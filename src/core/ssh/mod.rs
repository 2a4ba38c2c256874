mod client;

pub use client::{SshClient, SshTransport};
