//! Debug session
//!
//! A [`Session`] owns the breakpoint group registry, the boundary state and
//! a single-consumer queue of machine events. Debugger events and front-end
//! requests are handled one at a time; the synthetic events an input causes
//! are drained before the next input is looked at.

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, info, warn};
use osdbg_core::{
    AddedBreakpoint, Border, BreakpointGroupRegistry, Config, ConfigError, DebugError,
    DebugResult, DebuggerChannel, DebuggerEvent, GroupNameMapper, HookBreakpoint,
    OS_TRANSITIONS, OsEvent, OsState, OutputSink, SessionConfig, SourceBreakpoints,
    SymbolFileMapper, TransitionRule, transition,
};
use tokio::sync::{mpsc, oneshot};

use crate::executor::{ActionExecutor, ExecutionContext};
use crate::request::{CustomRequest, RequestOutcome};

/// Whether the session keeps consuming input after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFlow {
    Continue,
    Exit,
}

/// One unit of input for [`Session::run`].
#[derive(Debug)]
pub enum SessionInput {
    Event(DebuggerEvent),
    Request {
        request: CustomRequest,
        reply: Option<oneshot::Sender<DebugResult<RequestOutcome>>>,
    },
    SetBreakpoints {
        request: SourceBreakpoints,
        reply: Option<oneshot::Sender<DebugResult<Vec<AddedBreakpoint>>>>,
    },
}

pub struct Session {
    state: OsState,
    table: &'static [TransitionRule],
    registry: BreakpointGroupRegistry,
    queue: VecDeque<OsEvent>,
    executor: ActionExecutor,
    group_mapper: GroupNameMapper,
    debug_ready: bool,
    recent_thread_id: u32,
}

impl Session {
    /// Builds a session from a validated configuration and applies the
    /// borders and hooks it declares.
    pub fn new(
        config: &SessionConfig,
        channel: Arc<dyn DebuggerChannel>,
        output: Arc<dyn OutputSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let executor = ActionExecutor::new(
            channel,
            output,
            config.memory_layout()?,
            config.symbol_mapper()?,
            config.program_counter_id,
            config.hook_timeout(),
        );
        let mut session = Self {
            state: OsState::default(),
            table: OS_TRANSITIONS,
            registry: BreakpointGroupRegistry::new(
                config.first_breakpoint_group.clone(),
                config.second_breakpoint_group.clone(),
            ),
            queue: VecDeque::new(),
            executor,
            group_mapper: config.group_mapper()?,
            debug_ready: false,
            recent_thread_id: 1,
        };
        for border in &config.border_breakpoints {
            session.set_border(border);
        }
        for hook in config.hooks() {
            session.set_hook(&hook);
        }
        info!(
            "session ready: current group {}, next group {}",
            session.registry.current_group_name(),
            session.registry.next_group_name()
        );
        Ok(session)
    }

    /// Replaces the file → groups mapping built from the configuration.
    /// Borders and hooks applied so far keep their owners.
    pub fn with_group_mapper(mut self, mapper: GroupNameMapper) -> Self {
        self.group_mapper = mapper;
        self
    }

    pub fn with_symbol_mapper(mut self, mapper: SymbolFileMapper) -> Self {
        self.executor.set_symbols(mapper);
        self
    }

    pub fn state(&self) -> OsState {
        self.state
    }

    pub fn registry(&self) -> &BreakpointGroupRegistry {
        &self.registry
    }

    pub fn is_debug_ready(&self) -> bool {
        self.debug_ready
    }

    pub fn recent_thread_id(&self) -> u32 {
        self.recent_thread_id
    }

    fn channel(&self) -> &dyn DebuggerChannel {
        self.executor.channel().as_ref()
    }

    fn output(&self) -> &dyn OutputSink {
        self.executor.output().as_ref()
    }

    pub async fn handle_event(&mut self, event: DebuggerEvent) -> SessionFlow {
        if let Some(stop) = event.stop_info() {
            if !self.debug_ready {
                debug!("stop on thread {} before debug-ready, ignored", stop.thread_id);
                return SessionFlow::Continue;
            }
            self.recent_thread_id = stop.thread_id;
            self.dispatch(OsEvent::Stopped).await;
            return SessionFlow::Continue;
        }
        match event {
            DebuggerEvent::DebugReady => {
                info!("debugger ready, tracking kernel/user crossings");
                self.debug_ready = true;
            }
            DebuggerEvent::ThreadCreated { thread_id } => debug!("thread {thread_id} created"),
            DebuggerEvent::ThreadExited { thread_id } => debug!("thread {thread_id} exited"),
            DebuggerEvent::Exited { exit_code } => {
                info!("debugger exited with {exit_code:?}");
                return SessionFlow::Exit;
            }
            // the stopped family was handled above
            _ => {}
        }
        SessionFlow::Continue
    }

    /// Feeds `event` to the state machine and drains every event the
    /// resulting actions enqueue.
    pub async fn dispatch(&mut self, event: OsEvent) {
        self.queue.push_back(event);
        while let Some(event) = self.queue.pop_front() {
            let (next, actions) = transition(self.table, self.state, event);
            if next != self.state {
                info!("os state {} --{event}--> {next}", self.state);
            }
            self.state = next;

            let mut cx = ExecutionContext {
                registry: &mut self.registry,
                events: &mut self.queue,
                thread_id: self.recent_thread_id,
            };
            for &action in actions {
                self.executor.execute(action, &mut cx).await;
            }
        }
    }

    fn set_border(&mut self, border: &Border) {
        let owners = self.group_mapper.groups_for(&border.filepath);
        debug!("border {border} owned by {owners:?}");
        self.registry.update_border(border, &owners);
    }

    fn set_hook(&mut self, hook: &HookBreakpoint) {
        let owners = self.group_mapper.groups_for(&hook.location.file);
        debug!("hook {} owned by {owners:?}", hook.location);
        self.registry.update_hook(hook, &owners);
    }

    pub async fn handle_request(&mut self, request: CustomRequest) -> DebugResult<RequestOutcome> {
        debug!("custom request {}", request.command());
        match request {
            CustomRequest::SetBorder(border) => {
                self.set_border(&border);
                self.output().information(&format!("border set at {border}"));
            }
            CustomRequest::DisableBorder(border) => {
                let owners = self.group_mapper.groups_for(&border.filepath);
                self.registry.disable_border(&border, &owners);
            }
            CustomRequest::SetHookBreakpoint(hook) => {
                self.set_hook(&hook);
                self.output()
                    .information(&format!("hook set at {}", hook.location));
            }
            CustomRequest::DisableHookBreakpoint(location) => {
                let owners = self.group_mapper.groups_for(&location.file);
                self.registry.disable_hook(&location, &owners);
            }
            CustomRequest::RemoveAllCliBreakpoints => {
                self.registry.remove_all_breakpoints();
                self.channel().send_cli_command("delete").await?;
            }
            CustomRequest::DisableCurrentBreakpointGroupBreakpoints => {
                let paths: Vec<String> = self
                    .registry
                    .current_group()
                    .paths()
                    .map(str::to_string)
                    .collect();
                for path in &paths {
                    self.channel().clear_breakpoints(path).await?;
                }
                self.output().information(&format!(
                    "breakpoints of group {} removed from the debugger",
                    self.registry.current_group_name()
                ));
            }
            CustomRequest::SendGdbCliCommand(command) => {
                let text = self.channel().send_cli_command(&command).await?;
                return Ok(RequestOutcome::CommandOutput(text));
            }
            CustomRequest::SendGdbMiCommand(command) => {
                let text = self.channel().send_mi_command(&command).await?;
                return Ok(RequestOutcome::CommandOutput(text));
            }
            CustomRequest::Unknown(command) => {
                self.output()
                    .information(&format!("unknown customRequest: {command}"));
                return Ok(RequestOutcome::Unrecognized(command));
            }
        }
        Ok(RequestOutcome::Acknowledged)
    }

    /// Replaces the breakpoints of one source file. The request is saved in
    /// every group owning the file; the debugger only receives it when the
    /// current group is one of them. Returns the breakpoints the debugger
    /// accepted.
    pub async fn set_breakpoints(
        &mut self,
        request: SourceBreakpoints,
    ) -> DebugResult<Vec<AddedBreakpoint>> {
        self.channel().clear_breakpoints(&request.path).await?;
        let owners = self.group_mapper.groups_for(&request.path);
        for owner in &owners {
            self.registry.save_breakpoints(request.clone(), owner);
        }
        let current = self.registry.current_group_name();
        if !owners.iter().any(|owner| owner == current) {
            debug!("{} belongs to {owners:?}, not installed now", request.path);
            return Ok(Vec::new());
        }

        let mut verified = Vec::new();
        for spec in request.specs() {
            match self.channel().add_breakpoint(&spec).await? {
                Some(added) => verified.push(added),
                None => debug!("breakpoint {}:{} rejected", spec.file, spec.line),
            }
        }
        Ok(verified)
    }

    fn report_failure(&self, err: &DebugError) {
        warn!("{err}");
        self.output().stderr(&err.to_string());
    }

    /// Consumes inputs until the channel closes or the debugger exits.
    pub async fn run(&mut self, mut inputs: mpsc::UnboundedReceiver<SessionInput>) {
        while let Some(input) = inputs.recv().await {
            match input {
                SessionInput::Event(event) => {
                    if self.handle_event(event).await == SessionFlow::Exit {
                        break;
                    }
                }
                SessionInput::Request { request, reply } => {
                    let result = self.handle_request(request).await;
                    if let Err(err) = &result {
                        self.report_failure(err);
                    }
                    if let Some(reply) = reply {
                        // the requester may have given up waiting
                        let _ = reply.send(result);
                    }
                }
                SessionInput::SetBreakpoints { request, reply } => {
                    let result = self.set_breakpoints(request).await;
                    if let Err(err) = &result {
                        self.report_failure(err);
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
            }
        }
        self.queue.clear();
        debug!("session input loop finished in state {}", self.state);
    }
}
