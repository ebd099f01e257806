//! Group switch protocol
//!
//! Moves the live debugger from one breakpoint group to another: the
//! outgoing group's breakpoints and symbol file are removed, the incoming
//! group's are installed, and the registry's current pointer is moved.
//! A failed step is reported and the protocol carries on; nothing is rolled
//! back, and the next stop resynchronizes the state machine.

use log::{debug, info, warn};

use crate::breakpoint::BreakpointSpec;
use crate::channel::{AddedBreakpoint, DebuggerChannel};
use crate::error::ChannelError;
use crate::mapping::SymbolFileMapper;
use crate::output::OutputSink;
use crate::registry::BreakpointGroupRegistry;

/// What a switch did to the live debugger.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SwitchReport {
    pub from: String,
    pub to: String,
    pub accepted: Vec<AddedBreakpoint>,
    /// Requested breakpoints the debugger could not resolve
    pub rejected: Vec<BreakpointSpec>,
    pub failures: Vec<ChannelError>,
}

impl SwitchReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.failures.is_empty()
    }
}

fn record_failure(report: &mut SwitchReport, output: &dyn OutputSink, err: ChannelError) {
    warn!("switch {} -> {}: {err}", report.from, report.to);
    output.stderr(&format!(
        "switching breakpoint group from {} to {}: {err}",
        report.from, report.to
    ));
    report.failures.push(err);
}

/// Makes `target` the current group.
pub async fn switch_group(
    registry: &mut BreakpointGroupRegistry,
    target: &str,
    channel: &dyn DebuggerChannel,
    symbols: &SymbolFileMapper,
    output: &dyn OutputSink,
) -> SwitchReport {
    let from = registry.current_group_name().to_string();
    let mut report = SwitchReport {
        from: from.clone(),
        to: target.to_string(),
        ..SwitchReport::default()
    };
    debug!("switching breakpoint group {from} -> {target}");

    let outgoing_paths: Vec<String> = registry
        .current_group()
        .paths()
        .map(str::to_string)
        .collect();
    for path in &outgoing_paths {
        if let Err(err) = channel.clear_breakpoints(path).await {
            record_failure(&mut report, output, err);
        }
    }

    if let Some(file) = symbols.symbol_file_for(&from)
        && let Err(err) = channel.remove_symbol_file(&file).await
    {
        record_failure(&mut report, output, err);
    }
    if let Some(file) = symbols.symbol_file_for(target)
        && let Err(err) = channel.add_symbol_file(&file).await
    {
        record_failure(&mut report, output, err);
    }

    let incoming = registry.group_or_insert(target).breakpoint_requests.clone();
    for request in &incoming {
        // stale breakpoints at the path would shadow the restored ones
        if let Err(err) = channel.clear_breakpoints(&request.path).await {
            record_failure(&mut report, output, err);
            continue;
        }
        for spec in request.specs() {
            match channel.add_breakpoint(&spec).await {
                Ok(Some(added)) => report.accepted.push(added),
                Ok(None) => {
                    debug!("breakpoint {}:{} not resolvable in {target}", spec.file, spec.line);
                    report.rejected.push(spec);
                }
                Err(err) => record_failure(&mut report, output, err),
            }
        }
    }

    registry.set_current_group_name(target);
    info!(
        "breakpoint group {from} -> {target}: {} set, {} rejected, {} failures",
        report.accepted.len(),
        report.rejected.len(),
        report.failures.len()
    );
    output.information(&format!("breakpoint group changed to {target}"));
    report
}
