//! Error types for port panel operations.
//!
//! This module defines the error type shared by the topology, store and
//! panel crates. All errors implement `std::error::Error` via `thiserror`.

use std::io;
use thiserror::Error;

/// Result type alias for port panel operations.
pub type PanelResult<T> = Result<T, PanelError>;

/// Errors that can occur while reading, merging or persisting port data.
#[derive(Debug, Error)]
pub enum PanelError {
    /// Failed to spawn a host utility (chmod, touch, ubus).
    #[error("Failed to execute command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Host utility returned non-zero exit code.
    #[error("Command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// File read or write failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file being accessed.
        path: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Remote procedure call failed or returned an unexpected shape.
    #[error("RPC {object}.{method} failed: {message}")]
    Rpc {
        /// The RPC object (e.g. "luci").
        object: String,
        /// The RPC method.
        method: String,
        /// Error message.
        message: String,
    },

    /// Content could not be parsed as JSON.
    #[error("Malformed JSON in {source_name}: {message}")]
    MalformedJson {
        /// Where the content came from (file path, "upload").
        source_name: String,
        /// Parser message.
        message: String,
    },

    /// Port configuration failed structural validation.
    #[error("Invalid port configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// A save sequence is already in flight.
    #[error("Save operation locked")]
    Locked,

    /// The target file could not be made writable.
    #[error("Cannot make {path} writable. Check /etc permissions.")]
    NotWritable {
        /// The file that stayed read-only.
        path: String,
    },

    /// Read-back after write did not match the intended content.
    #[error("Save verification failed - file content mismatch in {path}")]
    VerificationFailed {
        /// The file that failed verification.
        path: String,
    },

    /// A file or port does not exist.
    #[error("{what} not found: {name}")]
    NotFound {
        /// Kind of thing missing ("file", "port").
        what: String,
        /// Its name.
        name: String,
    },

    /// User-supplied edit values were rejected.
    #[error("Invalid input for {field}: {message}")]
    InvalidInput {
        /// The field that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// Panel configuration file problem.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PanelError {
    /// Creates an I/O error bound to a path.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an RPC error.
    pub fn rpc(
        object: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rpc {
            object: object.into(),
            method: method.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed JSON error.
    pub fn malformed_json(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedJson {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(what: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NotFound {
            what: what.into(),
            name: name.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true if the content itself was rejected (as opposed to the
    /// host failing to store it).
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            PanelError::MalformedJson { .. } | PanelError::InvalidConfig { .. }
        )
    }

    /// Returns true if this error is an I/O class failure on the device.
    pub fn is_io_failure(&self) -> bool {
        matches!(
            self,
            PanelError::Io { .. }
                | PanelError::NotWritable { .. }
                | PanelError::VerificationFailed { .. }
                | PanelError::ShellExec { .. }
                | PanelError::ShellCommandFailed { .. }
        )
    }
}
