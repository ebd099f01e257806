//! Command/event channel to the machine-level debugger
//!
//! The line protocol itself (GDB/MI records, tokens, result correlation) lives
//! behind [`DebuggerChannel`]; this crate only relies on the correlated
//! results and on the asynchronous event stream described by
//! [`DebuggerEvent`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::breakpoint::BreakpointSpec;
use crate::error::ChannelError;

/// Breakpoint acknowledged by the debugger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedBreakpoint {
    pub id: u32,
    pub file: String,
    /// Line the debugger actually placed it on; may differ from the request
    pub line: u32,
}

/// Value of one register as reported by the debugger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterValue {
    pub id: u32,
    pub value: String,
}

/// One frame of a stack listing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackFrame {
    pub level: u32,
    pub address: String,
    pub function: String,
    /// Full path of the source file, if the frame has line information
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl StackFrame {
    pub fn at(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: Some(file.into()),
            line: Some(line),
            ..Self::default()
        }
    }

    /// `(file, line)` when the frame maps to source.
    pub fn location(&self) -> Option<(&str, u32)> {
        Some((self.file.as_deref()?, self.line?))
    }
}

/// Operations issued to the machine-level debugger. Every call suspends until
/// the correlated result record arrives.
#[async_trait]
pub trait DebuggerChannel: Send + Sync {
    /// `Ok(None)` when the debugger rejected the location (not resolvable yet).
    async fn add_breakpoint(
        &self,
        spec: &BreakpointSpec,
    ) -> Result<Option<AddedBreakpoint>, ChannelError>;

    /// Removes every breakpoint placed in `path`.
    async fn clear_breakpoints(&self, path: &str) -> Result<(), ChannelError>;

    async fn add_symbol_file(&self, path: &str) -> Result<(), ChannelError>;

    async fn remove_symbol_file(&self, path: &str) -> Result<(), ChannelError>;

    async fn get_registers(&self, ids: &[u32]) -> Result<Vec<RegisterValue>, ChannelError>;

    async fn get_stack(
        &self,
        start_frame: u32,
        levels: u32,
        thread_id: u32,
    ) -> Result<Vec<StackFrame>, ChannelError>;

    /// Single machine-instruction step. Completion is reported later as a
    /// stopped-family event.
    async fn step_instruction(&self) -> Result<(), ChannelError>;

    /// Runs a console command and returns its textual output.
    async fn send_cli_command(&self, command: &str) -> Result<String, ChannelError>;

    /// Sends a raw machine-interface command and returns the result record.
    async fn send_mi_command(&self, command: &str) -> Result<String, ChannelError>;
}

/// Halt details shared by the stopped family of events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopInfo {
    pub thread_id: u32,
    pub all_threads_stopped: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl StopInfo {
    pub fn new(thread_id: u32) -> Self {
        Self {
            thread_id,
            all_threads_stopped: true,
            reason: None,
        }
    }
}

/// Asynchronous notifications from the debugger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DebuggerEvent {
    Stopped(StopInfo),
    Breakpoint(StopInfo),
    Watchpoint(StopInfo),
    StepEnd(StopInfo),
    StepOther(StopInfo),
    SignalStop(StopInfo),
    ThreadCreated { thread_id: u32 },
    ThreadExited { thread_id: u32 },
    /// The debugger finished connecting; boundary tracking may begin
    DebugReady,
    Exited { exit_code: Option<i32> },
}

impl DebuggerEvent {
    /// Halt details for the stopped family, `None` for everything else.
    pub fn stop_info(&self) -> Option<&StopInfo> {
        match self {
            DebuggerEvent::Stopped(info)
            | DebuggerEvent::Breakpoint(info)
            | DebuggerEvent::Watchpoint(info)
            | DebuggerEvent::StepEnd(info)
            | DebuggerEvent::StepOther(info)
            | DebuggerEvent::SignalStop(info) => Some(info),
            DebuggerEvent::ThreadCreated { .. }
            | DebuggerEvent::ThreadExited { .. }
            | DebuggerEvent::DebugReady
            | DebuggerEvent::Exited { .. } => None,
        }
    }
}
