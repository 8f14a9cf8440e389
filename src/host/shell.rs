//! Blocking shell command execution for trusted feature code

use std::process::Command;

use crate::error::{QuillError, Result};

/// Captured result of a shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, or -1 when the process was terminated by a signal
    pub code: i32,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Run `command` through `sh -c` and wait for it to exit
pub fn run_shell(command: &str) -> Result<CommandOutput> {
    tracing::debug!(command, "running shell command");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|e| QuillError::io("sh", e))?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code: output.status.code().unwrap_or(-1),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_run_shell_captures_output() {
        let output = run_shell("echo hello").unwrap();
        assert_eq!(output.stdout.trim(), "hello");
        assert!(output.success());
    }

    #[test]
    fn test_run_shell_reports_exit_code() {
        let output = run_shell("exit 3").unwrap();
        assert_eq!(output.code, 3);
        assert!(!output.success());
    }
}
