//! Kernel/user crossing scenarios driven through the session.

mod common;

use std::sync::Arc;

use common::*;
use futures::FutureExt;
use osdbg_core::testing::Command;
use osdbg_core::{
    DebuggerEvent, FnBehavior, HookBreakpoint, HookError, HookLocation, OsState, StackFrame,
    StopInfo,
};
use osdbg_session::CustomRequest;

/// Drives the session from the kernel into the current "next" group.
async fn cross_into_user(h: &mut Harness) {
    h.rest_at(KERNEL_BORDER);
    h.stop().await;
    assert_eq!(h.session.state(), OsState::KernelSingleStepToUser);
    h.channel.push_register(USER_PC);
    h.stop().await;
    assert_eq!(h.session.state(), OsState::User);
}

#[tokio::test]
async fn kernel_border_starts_single_stepping() {
    let mut h = Harness::ready(&config()).await;
    h.rest_at(KERNEL_BORDER);

    h.stop().await;

    assert_eq!(h.session.state(), OsState::KernelSingleStepToUser);
    assert_eq!(h.channel.step_count(), 1);
}

#[tokio::test]
async fn stop_away_from_the_border_stays_in_kernel() {
    let mut h = Harness::ready(&config()).await;
    h.rest_at(("proc.c", 41));

    h.stop().await;

    assert_eq!(h.session.state(), OsState::Kernel);
    assert_eq!(h.channel.step_count(), 0);
}

#[tokio::test]
async fn user_pc_completes_the_crossing() {
    let mut h = Harness::ready(&config()).await;
    h.rest_at(KERNEL_BORDER);
    h.stop().await;

    // still in the kernel after the first step
    h.channel.push_register(KERNEL_PC);
    h.stop().await;
    assert_eq!(h.session.state(), OsState::KernelSingleStepToUser);
    assert_eq!(h.channel.step_count(), 2);

    h.channel.push_register(USER_PC);
    h.stop().await;
    assert_eq!(h.session.state(), OsState::User);
    assert_eq!(h.channel.step_count(), 2);
    assert_eq!(h.session.registry().current_group_name(), PROGRAM_A);
    assert_eq!(h.session.registry().next_group_name(), KERNEL);
}

#[tokio::test]
async fn round_trip_restores_current_and_next() {
    let mut h = Harness::ready(&config()).await;
    cross_into_user(&mut h).await;

    h.rest_at(PROGRAM_A_BORDER);
    h.stop().await;
    assert_eq!(h.session.state(), OsState::UserSingleStepToKernel);
    h.channel.push_register(USER_PC);
    h.stop().await;
    assert_eq!(h.session.state(), OsState::UserSingleStepToKernel);
    h.channel.push_register(KERNEL_PC);
    h.stop().await;

    assert_eq!(h.session.state(), OsState::Kernel);
    assert_eq!(h.session.registry().current_group_name(), KERNEL);
    assert_eq!(h.session.registry().next_group_name(), PROGRAM_A);
}

#[tokio::test]
async fn hook_chooses_the_program_that_is_entered() {
    let mut h = Harness::ready(&config_with_fixed_hook(PROGRAM_B)).await;
    h.channel.push_stack(vec![StackFrame::at("init.c", 10)]);
    h.channel.push_stack(vec![StackFrame::at("init.c", 10)]);

    h.stop().await;
    assert_eq!(h.session.state(), OsState::Kernel);
    assert_eq!(h.session.registry().next_group_name(), PROGRAM_B);

    h.channel.take_commands();
    cross_into_user(&mut h).await;

    assert_eq!(h.session.registry().current_group_name(), PROGRAM_B);
    assert_eq!(h.session.registry().next_group_name(), KERNEL);
    let commands = h.channel.commands();
    assert!(commands.contains(&Command::RemoveSymbolFile("kernel.elf".into())));
    assert!(commands.contains(&Command::AddSymbolFile("prog_b.elf".into())));
}

#[tokio::test]
async fn string_variable_hook_reads_the_target() {
    let mut config = config();
    config.hook_breakpoints = vec![serde_json::from_value(serde_json::json!({
        "breakpoint": { "file": "init.c", "line": 10 },
        "behavior": { "kind": "stringVariable", "expression": "path", "template": "user_program_{}" }
    }))
    .unwrap()];
    let mut h = Harness::ready(&config).await;
    h.channel.push_stack(vec![StackFrame::at("init.c", 10)]);
    h.channel.push_cli_output("0x80412c30:\t\"b\"");

    h.stop().await;

    assert_eq!(h.session.registry().next_group_name(), PROGRAM_B);
    assert_eq!(h.channel.cli_commands(), vec!["x /s path".to_string()]);
}

#[tokio::test]
async fn hooks_of_other_groups_do_not_fire() {
    let mut config = config();
    config.hook_breakpoints = vec![serde_json::from_value(serde_json::json!({
        "breakpoint": { "file": "prog_a/main.rs", "line": 3 },
        "behavior": { "kind": "fixed", "group": "user_program_b" }
    }))
    .unwrap()];
    let mut h = Harness::ready(&config).await;
    h.rest_at(("prog_a/main.rs", 3));

    h.stop().await;

    assert_eq!(h.session.registry().next_group_name(), PROGRAM_A);
}

async fn install_hook(h: &mut Harness, behavior: FnBehavior) {
    let hook = HookBreakpoint::new(HookLocation::new("init.c", 10), Arc::new(behavior));
    h.session
        .handle_request(CustomRequest::SetHookBreakpoint(hook))
        .await
        .unwrap();
}

#[tokio::test]
async fn hook_that_never_resolves_times_out() {
    let mut h = Harness::ready(&config()).await;
    install_hook(
        &mut h,
        FnBehavior::new(|_| futures::future::pending::<Result<String, HookError>>().boxed()),
    )
    .await;
    h.rest_at(("init.c", 10));

    h.stop().await;

    assert_eq!(h.session.registry().next_group_name(), PROGRAM_A);
    assert!(h.output.contains("did not resolve within 100 ms"));
    assert_eq!(h.session.state(), OsState::Kernel);
}

#[tokio::test]
async fn failing_hook_keeps_the_previous_next_group() {
    let mut h = Harness::ready(&config()).await;
    install_hook(
        &mut h,
        FnBehavior::new(|_| {
            async { Err::<String, _>(HookError::Behavior("no exec path".to_string())) }.boxed()
        }),
    )
    .await;
    h.rest_at(("init.c", 10));

    h.stop().await;

    assert_eq!(h.session.registry().next_group_name(), PROGRAM_A);
    assert!(h.output.stderr_lines().iter().any(|l| l.contains("no exec path")));
}

#[tokio::test]
async fn stops_before_debug_ready_are_ignored() {
    let mut h = Harness::new(&config());
    h.rest_at(KERNEL_BORDER);

    h.stop().await;
    assert_eq!(h.session.state(), OsState::Kernel);
    assert!(h.channel.commands().is_empty());

    h.session.handle_event(DebuggerEvent::DebugReady).await;
    h.session
        .handle_event(DebuggerEvent::Breakpoint(StopInfo::new(1)))
        .await;
    assert_eq!(h.session.state(), OsState::KernelSingleStepToUser);
}

#[tokio::test]
async fn stack_probes_use_the_most_recent_stop_thread() {
    let mut h = Harness::ready(&config()).await;
    h.session
        .handle_event(DebuggerEvent::SignalStop(StopInfo::new(4)))
        .await;

    assert!(h.channel.commands().iter().all(|c| match c {
        Command::GetStack { thread_id, .. } => *thread_id == 4,
        _ => true,
    }));
}

#[tokio::test]
async fn thread_events_leave_the_state_alone() {
    let mut h = Harness::ready(&config()).await;
    h.session
        .handle_event(DebuggerEvent::ThreadCreated { thread_id: 2 })
        .await;
    h.session
        .handle_event(DebuggerEvent::ThreadExited { thread_id: 2 })
        .await;
    assert_eq!(h.session.state(), OsState::Kernel);
    assert!(h.channel.commands().is_empty());
}

#[tokio::test]
async fn failed_probe_is_reported_and_the_next_stop_retries() {
    use osdbg_core::testing::Operation;

    let mut h = Harness::ready(&config()).await;
    h.rest_at(KERNEL_BORDER);
    h.stop().await;

    h.channel.fail(Operation::GetRegisters);
    h.stop().await;
    assert_eq!(h.session.state(), OsState::KernelSingleStepToUser);
    assert!(!h.output.stderr_lines().is_empty());

    h.channel.recover(Operation::GetRegisters);
    h.channel.push_register(USER_PC);
    h.stop().await;
    assert_eq!(h.session.state(), OsState::User);
}
