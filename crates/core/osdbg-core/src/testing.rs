//! Scripted in-memory debugger channel
//!
//! Records every command it receives and answers probes from queued
//! responses, so boundary tracking can be driven without a real debugger.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::breakpoint::BreakpointSpec;
use crate::channel::{AddedBreakpoint, DebuggerChannel, RegisterValue, StackFrame};
use crate::error::ChannelError;

/// A command as received by [`ScriptedChannel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddBreakpoint(BreakpointSpec),
    ClearBreakpoints(String),
    AddSymbolFile(String),
    RemoveSymbolFile(String),
    GetRegisters(Vec<u32>),
    GetStack {
        start_frame: u32,
        levels: u32,
        thread_id: u32,
    },
    StepInstruction,
    Cli(String),
    Mi(String),
}

/// Operation kinds that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AddBreakpoint,
    ClearBreakpoints,
    AddSymbolFile,
    RemoveSymbolFile,
    GetRegisters,
    GetStack,
    StepInstruction,
    Cli,
    Mi,
}

#[derive(Debug, Default)]
struct Script {
    commands: Vec<Command>,
    registers: VecDeque<String>,
    frames: VecDeque<Vec<StackFrame>>,
    resting_frame: Option<StackFrame>,
    cli_outputs: VecDeque<String>,
    rejected: HashSet<(String, u32)>,
    failing: HashSet<Operation>,
    next_breakpoint_id: u32,
}

#[derive(Debug, Default)]
pub struct ScriptedChannel {
    script: Mutex<Script>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the value returned by the next register read.
    pub fn push_register(&self, value: impl Into<String>) {
        self.script.lock().registers.push_back(value.into());
    }

    /// Queues the frames returned by the next stack read.
    pub fn push_stack(&self, frames: Vec<StackFrame>) {
        self.script.lock().frames.push_back(frames);
    }

    /// Frame returned by stack reads once the queue is empty.
    pub fn set_resting_frame(&self, frame: StackFrame) {
        self.script.lock().resting_frame = Some(frame);
    }

    pub fn push_cli_output(&self, output: impl Into<String>) {
        self.script.lock().cli_outputs.push_back(output.into());
    }

    /// Makes the debugger refuse breakpoints at this location.
    pub fn reject(&self, file: impl Into<String>, line: u32) {
        self.script.lock().rejected.insert((file.into(), line));
    }

    pub fn fail(&self, operation: Operation) {
        self.script.lock().failing.insert(operation);
    }

    pub fn recover(&self, operation: Operation) {
        self.script.lock().failing.remove(&operation);
    }

    pub fn commands(&self) -> Vec<Command> {
        self.script.lock().commands.clone()
    }

    pub fn take_commands(&self) -> Vec<Command> {
        std::mem::take(&mut self.script.lock().commands)
    }

    pub fn cli_commands(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::Cli(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn step_count(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, Command::StepInstruction))
            .count()
    }

    fn record(&self, command: Command, operation: Operation) -> Result<(), ChannelError> {
        let mut script = self.script.lock();
        let label = format!("{command:?}");
        script.commands.push(command);
        if script.failing.contains(&operation) {
            return Err(ChannelError::command_failed(label, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl DebuggerChannel for ScriptedChannel {
    async fn add_breakpoint(
        &self,
        spec: &BreakpointSpec,
    ) -> Result<Option<AddedBreakpoint>, ChannelError> {
        self.record(Command::AddBreakpoint(spec.clone()), Operation::AddBreakpoint)?;
        let mut script = self.script.lock();
        if script.rejected.contains(&(spec.file.clone(), spec.line)) {
            return Ok(None);
        }
        script.next_breakpoint_id += 1;
        Ok(Some(AddedBreakpoint {
            id: script.next_breakpoint_id,
            file: spec.file.clone(),
            line: spec.line,
        }))
    }

    async fn clear_breakpoints(&self, path: &str) -> Result<(), ChannelError> {
        self.record(
            Command::ClearBreakpoints(path.to_string()),
            Operation::ClearBreakpoints,
        )
    }

    async fn add_symbol_file(&self, path: &str) -> Result<(), ChannelError> {
        self.record(Command::AddSymbolFile(path.to_string()), Operation::AddSymbolFile)
    }

    async fn remove_symbol_file(&self, path: &str) -> Result<(), ChannelError> {
        self.record(
            Command::RemoveSymbolFile(path.to_string()),
            Operation::RemoveSymbolFile,
        )
    }

    async fn get_registers(&self, ids: &[u32]) -> Result<Vec<RegisterValue>, ChannelError> {
        self.record(Command::GetRegisters(ids.to_vec()), Operation::GetRegisters)?;
        let value = self
            .script
            .lock()
            .registers
            .pop_front()
            .unwrap_or_else(|| "0x0".to_string());
        Ok(ids
            .iter()
            .map(|&id| RegisterValue {
                id,
                value: value.clone(),
            })
            .collect())
    }

    async fn get_stack(
        &self,
        start_frame: u32,
        levels: u32,
        thread_id: u32,
    ) -> Result<Vec<StackFrame>, ChannelError> {
        self.record(
            Command::GetStack {
                start_frame,
                levels,
                thread_id,
            },
            Operation::GetStack,
        )?;
        let mut script = self.script.lock();
        if let Some(frames) = script.frames.pop_front() {
            return Ok(frames);
        }
        Ok(script.resting_frame.iter().cloned().collect())
    }

    async fn step_instruction(&self) -> Result<(), ChannelError> {
        self.record(Command::StepInstruction, Operation::StepInstruction)
    }

    async fn send_cli_command(&self, command: &str) -> Result<String, ChannelError> {
        self.record(Command::Cli(command.to_string()), Operation::Cli)?;
        Ok(self.script.lock().cli_outputs.pop_front().unwrap_or_default())
    }

    async fn send_mi_command(&self, command: &str) -> Result<String, ChannelError> {
        self.record(Command::Mi(command.to_string()), Operation::Mi)?;
        Ok("^done".to_string())
    }
}
