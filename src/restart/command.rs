//! The external command that restarts the DHCP service.

use std::process::{Command, Stdio};

use super::error::RestartError;

/// Something that restarts the service consuming the config file.
///
/// Called from a blocking thread while the registry lock is held.
pub trait RestartCommand: Send + Sync {
    fn restart(&self) -> Result<(), RestartError>;

    /// Human readable form for logs.
    fn describe(&self) -> String;
}

/// Runs a program with fixed arguments and no stdin. Exit code 0 is success.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    program: String,
    args: Vec<String>,
}

impl ShellCommand {
    /// Build from an argument vector; the first element is the program.
    pub fn new(argv: &[String]) -> Result<Self, RestartError> {
        let (program, args) = argv.split_first().ok_or(RestartError::EmptyCommand)?;
        if program.is_empty() {
            return Err(RestartError::EmptyCommand);
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Build from a whitespace separated command line, e.g. `service dhcpd restart`.
    pub fn parse(line: &str) -> Result<Self, RestartError> {
        let argv: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        Self::new(&argv)
    }
}

impl RestartCommand for ShellCommand {
    fn restart(&self) -> Result<(), RestartError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| RestartError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(RestartError::ExitStatus {
                program: self.program.clone(),
                status,
            })
        }
    }

    fn describe(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}
