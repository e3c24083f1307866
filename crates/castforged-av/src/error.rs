//! Error types for castforged-av.

use std::process::ExitStatus;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors detectable before an encoder starts streaming.
///
/// Every variant is returned synchronously and leaves no process behind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The encoder executable could not be started.
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The encoder started but its output could not be attached.
    #[error("failed to attach to {program} output: {message}")]
    Pipe { program: String, message: String },

    /// The probing collaborator failed; its error is carried unchanged.
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// A custom command line could not be tokenized.
    #[error("{message} in command line: {input}")]
    Syntax { message: String, input: String },

    /// A required external tool is not available.
    #[error("tool not found: {tool}")]
    ToolNotFound { tool: String },

    /// Invalid input provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a launch error.
    pub fn launch(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Launch {
            program: program.into(),
            source,
        }
    }

    /// Create a pipe error.
    pub fn pipe(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipe {
            program: program.into(),
            message: message.into(),
        }
    }

    /// Create a syntax error.
    pub fn syntax(message: impl Into<String>, input: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            input: input.into(),
        }
    }

    /// Create a tool not found error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound { tool: tool.into() }
    }
}

/// Failures of the stream probing collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The probe tool is not installed.
    #[error("{tool} not found")]
    ToolNotFound { tool: String },

    /// The probe tool ran but reported failure.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The probe output could not be understood.
    #[error("failed to parse probe output: {0}")]
    Parse(#[from] serde_json::Error),

    /// The probe output was not valid UTF-8.
    #[error("probe output is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// An I/O error occurred while probing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An encoder that exited unsuccessfully for a reason other than cancellation.
///
/// Reported to a [`crate::DiagnosticsSink`]; never delivered to the stream
/// consumer, who only sees the stream close.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command {program} failed: {message}")]
pub struct ProcessError {
    /// Program that was run.
    pub program: String,
    /// Its exit status, if it could be collected.
    pub status: Option<ExitStatus>,
    /// Human-readable failure description.
    pub message: String,
}

impl ProcessError {
    /// A process that exited with an unsuccessful status.
    pub fn exited(program: impl Into<String>, status: ExitStatus) -> Self {
        Self {
            program: program.into(),
            status: Some(status),
            message: status.to_string(),
        }
    }

    /// A process whose exit could not be collected.
    pub fn wait_failed(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            status: None,
            message: message.into(),
        }
    }
}
