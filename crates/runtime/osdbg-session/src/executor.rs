//! Action executor
//!
//! Carries out the side effects the boundary state machine asks for. Probes
//! (registers, stack) go to the debugger; their outcome is fed back to the
//! machine by pushing synthetic events onto the session queue, never by
//! calling back into the machine.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use osdbg_core::{
    Action, BreakpointGroupRegistry, ChannelError, DebugResult, DebuggerChannel, Domain,
    HookError, MemoryLayout, OsEvent, OutputSink, StackFrame, SymbolFileMapper,
    parse_register_value, switch_group,
};

/// Session state an action may read or change.
pub struct ExecutionContext<'a> {
    pub registry: &'a mut BreakpointGroupRegistry,
    pub events: &'a mut VecDeque<OsEvent>,
    /// Thread of the most recent stop
    pub thread_id: u32,
}

pub struct ActionExecutor {
    channel: Arc<dyn DebuggerChannel>,
    output: Arc<dyn OutputSink>,
    layout: MemoryLayout,
    symbols: SymbolFileMapper,
    program_counter_id: u32,
    hook_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(
        channel: Arc<dyn DebuggerChannel>,
        output: Arc<dyn OutputSink>,
        layout: MemoryLayout,
        symbols: SymbolFileMapper,
        program_counter_id: u32,
        hook_timeout: Duration,
    ) -> Self {
        Self {
            channel,
            output,
            layout,
            symbols,
            program_counter_id,
            hook_timeout,
        }
    }

    pub fn channel(&self) -> &Arc<dyn DebuggerChannel> {
        &self.channel
    }

    pub fn output(&self) -> &Arc<dyn OutputSink> {
        &self.output
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub(crate) fn set_symbols(&mut self, symbols: SymbolFileMapper) {
        self.symbols = symbols;
    }

    /// Runs `action`. A failed probe abandons the action; it is logged and
    /// reported, and the next stop gives the machine another chance.
    pub async fn execute(&self, action: Action, cx: &mut ExecutionContext<'_>) {
        debug!("doing action: {action}");
        if let Err(err) = self.run(action, cx).await {
            warn!("action {action} abandoned: {err}");
            self.output.stderr(&format!("{action} failed: {err}"));
        }
    }

    async fn run(&self, action: Action, cx: &mut ExecutionContext<'_>) -> DebugResult<()> {
        match action {
            Action::TryGetNextGroupName => self.try_get_next_group_name(cx).await,
            Action::CheckKernelToUserBorder => {
                self.check_border(cx, OsEvent::AtKernelToUserBorder).await
            }
            Action::CheckUserToKernelBorder => {
                self.check_border(cx, OsEvent::AtUserToKernelBorder).await
            }
            Action::CheckIfUserYet => self.check_domain(cx, Domain::User, OsEvent::AtUser).await,
            Action::CheckIfKernelYet => {
                self.check_domain(cx, Domain::Kernel, OsEvent::AtKernel).await
            }
            Action::StartSingleSteps => Ok(self.channel.step_instruction().await?),
            Action::SwitchLowToHigh | Action::SwitchHighToLow => {
                self.switch_to_next(cx).await;
                Ok(())
            }
        }
    }

    async fn top_frame(&self, thread_id: u32) -> Result<Option<StackFrame>, ChannelError> {
        let mut frames = self.channel.get_stack(0, 1, thread_id).await?;
        Ok(if frames.is_empty() {
            None
        } else {
            Some(frames.swap_remove(0))
        })
    }

    async fn try_get_next_group_name(&self, cx: &mut ExecutionContext<'_>) -> DebugResult<()> {
        let Some(frame) = self.top_frame(cx.thread_id).await? else {
            return Ok(());
        };
        let Some((file, line)) = frame.location() else {
            return Ok(());
        };
        let Some(hook) = cx.registry.current_group().hooks.find(file, line).cloned() else {
            return Ok(());
        };

        debug!("hook {} hit, resolving {}", hook.location, hook.behavior.describe());
        let resolved = match tokio::time::timeout(
            self.hook_timeout,
            hook.behavior.resolve(self.channel.as_ref()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(HookError::TimedOut {
                timeout_ms: u64::try_from(self.hook_timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };

        match resolved {
            Ok(name) => {
                info!("hook {} chose next breakpoint group {name}", hook.location);
                self.output
                    .information(&format!("next breakpoint group is {name}"));
                cx.registry.set_next_group_name(name);
            }
            Err(err) => {
                warn!(
                    "hook {} failed, next group stays {}: {err}",
                    hook.location,
                    cx.registry.next_group_name()
                );
                self.output.stderr(&format!(
                    "hook at {} failed, keeping next breakpoint group {}: {err}",
                    hook.location,
                    cx.registry.next_group_name()
                ));
            }
        }
        Ok(())
    }

    async fn check_border(&self, cx: &mut ExecutionContext<'_>, event: OsEvent) -> DebugResult<()> {
        let Some(border) = cx.registry.current_group().border.clone() else {
            return Ok(());
        };
        let frame = self.top_frame(cx.thread_id).await?;
        let at_border = frame
            .as_ref()
            .and_then(StackFrame::location)
            .is_some_and(|(file, line)| border.is_at(file, line));
        if at_border {
            debug!("stopped at border {border}");
            cx.events.push_back(event);
        }
        Ok(())
    }

    async fn check_domain(
        &self,
        cx: &mut ExecutionContext<'_>,
        domain: Domain,
        arrived: OsEvent,
    ) -> DebugResult<()> {
        let registers = self
            .channel
            .get_registers(&[self.program_counter_id])
            .await?;
        let raw = registers
            .iter()
            .find(|r| r.id == self.program_counter_id)
            .map(|r| r.value.as_str())
            .ok_or_else(|| {
                ChannelError::malformed(
                    "get_registers",
                    format!("register {} missing", self.program_counter_id),
                )
            })?;
        let pc = parse_register_value(raw).ok_or_else(|| {
            ChannelError::malformed("get_registers", format!("unparsable value `{raw}`"))
        })?;

        if self.layout.contains(domain, pc) {
            info!("arrived at {domain}, pc {pc:#x}");
            self.output
                .information(&format!("arrived at {domain}. current addr: {pc:#x}"));
            cx.events.push_back(arrived);
        } else {
            self.channel.step_instruction().await?;
        }
        Ok(())
    }

    /// Switches to the registry's "next" group and leaves the outgoing group
    /// as the new "next", so the crossing back returns to it.
    async fn switch_to_next(&self, cx: &mut ExecutionContext<'_>) {
        let outgoing = cx.registry.current_group_name().to_string();
        let target = cx.registry.next_group_name().to_string();
        let report = switch_group(
            cx.registry,
            &target,
            self.channel.as_ref(),
            &self.symbols,
            self.output.as_ref(),
        )
        .await;
        if !report.is_clean() {
            debug!("switch report: {report:?}");
        }
        cx.registry.set_next_group_name(outgoing);
    }
}
