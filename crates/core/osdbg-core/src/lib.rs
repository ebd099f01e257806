//! # osdbg-core
//!
//! Domain model for debugging a layered operating system (a kernel plus
//! user programs) as one program.
//!
//! - [`address`]: classifies program-counter values into kernel or user
//!   memory
//! - [`state_machine`]: the kernel/user boundary state machine
//! - [`registry`]: breakpoint groups, one per execution domain
//! - [`switch`]: migrates the live debugger from one group to another
//! - [`hook`]: hook breakpoints that compute the next domain
//! - [`channel`]: the contract with the machine-level debugger
//! - [`config`]: attach-time session configuration

pub mod address;
pub mod breakpoint;
pub mod channel;
pub mod config;
pub mod error;
pub mod hook;
pub mod mapping;
pub mod output;
pub mod registry;
pub mod state_machine;
pub mod switch;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use address::{Domain, MemoryLayout, MemoryRange, is_in_domain, parse_register_value};
pub use breakpoint::{Border, BreakpointSpec, HookLocation, SourceBreakpoint, SourceBreakpoints};
pub use channel::{AddedBreakpoint, DebuggerChannel, DebuggerEvent, RegisterValue, StackFrame, StopInfo};
pub use config::{Config, HookConfig, SessionConfig};
pub use error::{ChannelError, ConfigError, DebugError, DebugResult, HookError};
pub use hook::{FixedGroup, FnBehavior, HookBehavior, HookBehaviorConfig, HookBreakpoint, HookBreakpoints, StringVariableGroup};
pub use mapping::{GroupNameMapper, MappingRule, SymbolFileMapper};
pub use output::{BufferedOutput, LogOutput, OutputCategory, OutputSink};
pub use registry::{BreakpointGroup, BreakpointGroupRegistry};
pub use state_machine::{Action, OS_TRANSITIONS, OsEvent, OsState, TransitionRule, transition};
pub use switch::{SwitchReport, switch_group};
