use std::process::{Command, Stdio};

use crate::address::Address;
use crate::channel::Transport;
use crate::error::{Error, Result};
use crate::utils::command::CommandOutput;

/// Thin wrapper around the system `ssh` client for one destination.
pub struct SshClient {
    pub target: String,
    pub port: Option<u16>,
}

impl SshClient {
    /// Fails with `config.invalid_value` when the address has no host.
    pub fn from_address(dest: &Address) -> Result<Self> {
        Ok(Self {
            target: dest.ssh_target()?,
            port: dest.port(),
        })
    }

    /// `[-p <port>] <user>@<host> [args...]`
    pub fn build_args(&self, extra: &[String]) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }

        args.push(self.target.clone());
        args.extend(extra.iter().cloned());
        args
    }

    /// Run one command line on the remote host with output passed through.
    pub fn execute(&self, command: &str) -> Result<CommandOutput> {
        self.status(&[command.to_string()], false)
    }

    /// Start an interactive session (or run `args` with a terminal attached).
    pub fn execute_interactive(&self, args: &[String]) -> Result<CommandOutput> {
        self.status(args, true)
    }

    fn status(&self, extra: &[String], interactive: bool) -> Result<CommandOutput> {
        let mut cmd = Command::new("ssh");
        cmd.args(self.build_args(extra))
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if interactive {
            cmd.stdin(Stdio::inherit());
        }

        let status = cmd
            .status()
            .map_err(|e| Error::ssh_connect_failed(self.target.clone(), e))?;
        Ok(CommandOutput::from_status(status))
    }
}

/// The canonical transport: one `ssh` invocation per replayed history.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshTransport;

impl Transport for SshTransport {
    fn execute(&self, dest: &Address, command: &str) -> Result<CommandOutput> {
        SshClient::from_address(dest)?.execute(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn build_args_without_port() {
        let dest = Address::parse("ssh://deploy@www.example.com/srv").unwrap();
        let client = SshClient::from_address(&dest).unwrap();
        assert_eq!(
            client.build_args(&["uptime".to_string()]),
            vec!["deploy@www.example.com".to_string(), "uptime".to_string()]
        );
    }

    #[test]
    fn build_args_with_explicit_port() {
        let dest = Address::parse("ssh://deploy@www.example.com:2222/srv").unwrap();
        let client = SshClient::from_address(&dest).unwrap();
        assert_eq!(
            client.build_args(&[]),
            vec![
                "-p".to_string(),
                "2222".to_string(),
                "deploy@www.example.com".to_string()
            ]
        );
    }

    #[test]
    fn hostless_address_is_rejected() {
        let dest = Address::parse("/srv/app").unwrap();
        let err = SshClient::from_address(&dest).err().unwrap();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);
    }
}
