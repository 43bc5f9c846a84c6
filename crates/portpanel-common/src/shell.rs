//! Host utility execution.
//!
//! The panel never goes through `/bin/sh`: every utility (chmod, touch,
//! ubus) is spawned directly with an argument vector, so port names and
//! JSON payloads need no quoting.
//!
//! # Example
//!
//! ```ignore
//! use portpanel_common::shell;
//!
//! let result = shell::exec("/bin/chmod", &["444", "/etc/user_defined_ports.json"]).await?;
//! if !result.success() {
//!     eprintln!("chmod failed: {}", result.stderr);
//! }
//! ```

use std::process::Stdio;
use tokio::process::Command;

use crate::error::{PanelError, PanelResult};

/// Default path to `chmod`.
pub const CHMOD_CMD: &str = "/bin/chmod";

/// Default path to `touch`.
pub const TOUCH_CMD: &str = "/bin/touch";

/// Default path to the OpenWrt micro bus client.
pub const UBUS_CMD: &str = "/bin/ubus";

/// Result of a host utility execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// The exit code of the command (0 = success).
    pub exit_code: i32,
    /// The trimmed stdout output.
    pub stdout: String,
    /// The trimmed stderr output.
    pub stderr: String,
}

impl ExecResult {
    /// Builds a successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Builds a failed result with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns the combined output (stdout + stderr) for error messages.
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Executes a host utility asynchronously.
///
/// # Returns
///
/// * `Ok(ExecResult)` - The execution result, successful or not
/// * `Err(PanelError)` - If the program could not be spawned
pub async fn exec(program: &str, args: &[&str]) -> PanelResult<ExecResult> {
    let command = render_command(program, args);
    tracing::debug!(command = %command, "Executing host command");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| PanelError::ShellExec {
            command: command.clone(),
            source: e,
        })?;

    let exit_code = output.status.code().unwrap_or(-1);
    let result = ExecResult {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };

    if result.success() {
        tracing::trace!(command = %command, "Command succeeded");
    } else {
        tracing::warn!(
            command = %command,
            exit_code = exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Executes a host utility and turns a non-zero exit into an error.
///
/// # Returns
///
/// * `Ok(String)` - The stdout output on success
/// * `Err(PanelError)` - If the command fails or returns non-zero
pub async fn exec_or_throw(program: &str, args: &[&str]) -> PanelResult<String> {
    let result = exec(program, args).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(PanelError::ShellCommandFailed {
            command: render_command(program, args),
            exit_code: result.exit_code,
            output: result.combined_output(),
        })
    }
}
