//! Error types
//!
//! Each concern has its own `thiserror` enum; [`DebugError`] aggregates them
//! for the session layer.

use thiserror::Error;

/// Failures reported by the machine-level debugger channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The debugger answered the command with an error record
    #[error("debugger command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },
    /// The debugger answered, but the payload could not be interpreted
    #[error("malformed response to `{command}`: {message}")]
    Malformed { command: String, message: String },
    /// The debugger process is gone or the transport is closed
    #[error("debugger is not connected")]
    Disconnected,
}

impl ChannelError {
    pub fn command_failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn malformed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Failures of a hook behavior while computing the next group name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    #[error("hook behavior failed: {0}")]
    Behavior(String),
    #[error("hook behavior did not resolve within {timeout_ms} ms")]
    TimedOut { timeout_ms: u64 },
    #[error("hook behavior could not query the debugger: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration errors, raised when a session is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 无效的配置
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// 地址无法解析
    #[error("Invalid address `{0}`")]
    InvalidAddress(String),

    /// 地址区间无效
    #[error("Invalid memory range [{low}, {high}): {message}")]
    InvalidRange {
        low: String,
        high: String,
        message: String,
    },

    /// 映射规则的正则表达式无效
    #[error("Invalid mapping pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// 解析错误
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// 序列化错误
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(String),
}

/// Umbrella error for session-level operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebugError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Hook(#[from] HookError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A front-end request could not be decoded
    #[error("invalid `{command}` request: {message}")]
    Request { command: String, message: String },
}

pub type DebugResult<T> = Result<T, DebugError>;
