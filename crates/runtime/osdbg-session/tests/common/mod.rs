//! Shared fixtures for session tests.

#![allow(dead_code)]

use std::sync::Arc;

use osdbg_core::testing::ScriptedChannel;
use osdbg_core::{
    Border, BufferedOutput, Config, DebuggerEvent, HookBehaviorConfig, HookConfig, HookLocation,
    MappingRule, SessionConfig, StackFrame, StopInfo,
};
use osdbg_session::Session;

pub const KERNEL: &str = "kernel";
pub const PROGRAM_A: &str = "user_program_a";
pub const PROGRAM_B: &str = "user_program_b";

/// Kernel border: where the kernel returns to user mode.
pub const KERNEL_BORDER: (&str, u32) = ("proc.c", 42);
/// Program A border: the system-call instruction in its runtime.
pub const PROGRAM_A_BORDER: (&str, u32) = ("prog_a/syscall.rs", 7);

pub const KERNEL_PC: &str = "0x80000104";
pub const USER_PC: &str = "0x15000";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn config() -> SessionConfig {
    let mut config = SessionConfig::defaults();
    config.first_breakpoint_group = KERNEL.to_string();
    config.second_breakpoint_group = PROGRAM_A.to_string();
    config.kernel_memory_ranges = vec![["0x80000000".to_string(), "0x90000000".to_string()]];
    config.user_memory_ranges = vec![["0x10000".to_string(), "0x20000".to_string()]];
    config.file_path_to_group_names = vec![
        MappingRule::new(r"^(proc|init|trap)\.c$", KERNEL),
        MappingRule::new(r"^prog_a/.*$", PROGRAM_A),
        MappingRule::new(r"^prog_b/.*$", PROGRAM_B),
    ];
    config.group_name_to_symbol_file = vec![
        MappingRule::new(r"^kernel$", "kernel.elf"),
        MappingRule::new(r"^user_program_(\w+)$", "prog_$1.elf"),
    ];
    config.border_breakpoints = vec![
        Border::new(KERNEL_BORDER.0, KERNEL_BORDER.1),
        Border::new(PROGRAM_A_BORDER.0, PROGRAM_A_BORDER.1),
    ];
    config.hook_timeout_ms = 100;
    config
}

/// Config with a hook at `init.c:10` that always picks `group`.
pub fn config_with_fixed_hook(group: &str) -> SessionConfig {
    let mut config = config();
    config.hook_breakpoints = vec![HookConfig {
        breakpoint: HookLocation::new("init.c", 10),
        behavior: HookBehaviorConfig::Fixed {
            group: group.to_string(),
        },
    }];
    config
}

pub struct Harness {
    pub session: Session,
    pub channel: Arc<ScriptedChannel>,
    pub output: Arc<BufferedOutput>,
}

impl Harness {
    pub fn new(config: &SessionConfig) -> Self {
        init_logging();
        let channel = Arc::new(ScriptedChannel::new());
        let output = Arc::new(BufferedOutput::new());
        let session = Session::new(config, channel.clone(), output.clone())
            .expect("test config is valid");
        Self {
            session,
            channel,
            output,
        }
    }

    /// A harness whose debugger already reported debug-ready.
    pub async fn ready(config: &SessionConfig) -> Self {
        let mut harness = Self::new(config);
        harness.session.handle_event(DebuggerEvent::DebugReady).await;
        harness
    }

    pub async fn stop(&mut self) {
        self.session
            .handle_event(DebuggerEvent::Stopped(StopInfo::new(1)))
            .await;
    }

    /// Every stack probe from now on reports `location`.
    pub fn rest_at(&self, location: (&str, u32)) {
        self.channel
            .set_resting_frame(StackFrame::at(location.0, location.1));
    }
}
