//! Boundary state machine
//!
//! Tracks whether execution is in the kernel, in a user program, or
//! single-stepping across the border between them. The transition table is
//! static data and [`transition`] is a pure lookup over it: a pair without an
//! entry keeps the state and yields no actions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where execution is believed to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsState {
    #[default]
    Kernel,
    KernelSingleStepToUser,
    User,
    UserSingleStepToKernel,
}

impl OsState {
    pub const ALL: [OsState; 4] = [
        OsState::Kernel,
        OsState::KernelSingleStepToUser,
        OsState::User,
        OsState::UserSingleStepToKernel,
    ];

    pub fn is_single_stepping(self) -> bool {
        matches!(
            self,
            OsState::KernelSingleStepToUser | OsState::UserSingleStepToKernel
        )
    }
}

impl fmt::Display for OsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OsState::Kernel => "kernel",
            OsState::KernelSingleStepToUser => "kernel_single_step_to_user",
            OsState::User => "user",
            OsState::UserSingleStepToKernel => "user_single_step_to_kernel",
        };
        f.write_str(name)
    }
}

/// Inputs of the machine. `Stopped` comes from the debugger; the others are
/// synthesized by actions after probing the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OsEvent {
    Stopped,
    AtKernel,
    AtKernelToUserBorder,
    AtUser,
    AtUserToKernelBorder,
}

impl OsEvent {
    pub const ALL: [OsEvent; 5] = [
        OsEvent::Stopped,
        OsEvent::AtKernel,
        OsEvent::AtKernelToUserBorder,
        OsEvent::AtUser,
        OsEvent::AtUserToKernelBorder,
    ];
}

impl fmt::Display for OsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OsEvent::Stopped => "STOPPED",
            OsEvent::AtKernel => "AT_KERNEL",
            OsEvent::AtKernelToUserBorder => "AT_KERNEL_TO_USER_BORDER",
            OsEvent::AtUser => "AT_USER",
            OsEvent::AtUserToKernelBorder => "AT_USER_TO_KERNEL_BORDER",
        };
        f.write_str(name)
    }
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Run the hook at the current location, if any, to learn the next group
    TryGetNextGroupName,
    CheckKernelToUserBorder,
    CheckUserToKernelBorder,
    /// Probe the PC; step again unless it is in user memory
    CheckIfUserYet,
    /// Probe the PC; step again unless it is in kernel memory
    CheckIfKernelYet,
    StartSingleSteps,
    SwitchLowToHigh,
    SwitchHighToLow,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::TryGetNextGroupName => "try_get_next_group_name",
            Action::CheckKernelToUserBorder => "check_kernel_to_user_border",
            Action::CheckUserToKernelBorder => "check_user_to_kernel_border",
            Action::CheckIfUserYet => "check_if_user_yet",
            Action::CheckIfKernelYet => "check_if_kernel_yet",
            Action::StartSingleSteps => "start_single_steps",
            Action::SwitchLowToHigh => "switch_low_to_high",
            Action::SwitchHighToLow => "switch_high_to_low",
        };
        f.write_str(name)
    }
}

/// One row of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: OsState,
    pub on: OsEvent,
    pub to: OsState,
    pub actions: &'static [Action],
}

/// The kernel/user boundary table.
pub static OS_TRANSITIONS: &[TransitionRule] = &[
    TransitionRule {
        from: OsState::Kernel,
        on: OsEvent::Stopped,
        to: OsState::Kernel,
        actions: &[Action::TryGetNextGroupName, Action::CheckKernelToUserBorder],
    },
    TransitionRule {
        from: OsState::Kernel,
        on: OsEvent::AtKernelToUserBorder,
        to: OsState::KernelSingleStepToUser,
        actions: &[Action::StartSingleSteps],
    },
    TransitionRule {
        from: OsState::KernelSingleStepToUser,
        on: OsEvent::Stopped,
        to: OsState::KernelSingleStepToUser,
        actions: &[Action::CheckIfUserYet],
    },
    TransitionRule {
        from: OsState::KernelSingleStepToUser,
        on: OsEvent::AtUser,
        to: OsState::User,
        // the border breakpoint belongs to the group, so it moves with the switch
        actions: &[Action::SwitchLowToHigh],
    },
    TransitionRule {
        from: OsState::User,
        on: OsEvent::Stopped,
        to: OsState::User,
        // the next group was already settled while still in the kernel
        actions: &[Action::CheckUserToKernelBorder],
    },
    TransitionRule {
        from: OsState::User,
        on: OsEvent::AtUserToKernelBorder,
        to: OsState::UserSingleStepToKernel,
        actions: &[Action::StartSingleSteps],
    },
    TransitionRule {
        from: OsState::UserSingleStepToKernel,
        on: OsEvent::Stopped,
        to: OsState::UserSingleStepToKernel,
        actions: &[Action::CheckIfKernelYet],
    },
    TransitionRule {
        from: OsState::UserSingleStepToKernel,
        on: OsEvent::AtKernel,
        to: OsState::Kernel,
        actions: &[Action::SwitchHighToLow],
    },
];

const NO_ACTIONS: &[Action] = &[];

/// Looks up `(state, event)` in `table`. Total: unmatched pairs return the
/// unchanged state and no actions.
pub fn transition(
    table: &[TransitionRule],
    state: OsState,
    event: OsEvent,
) -> (OsState, &'static [Action]) {
    table
        .iter()
        .find(|rule| rule.from == state && rule.on == event)
        .map_or((state, NO_ACTIONS), |rule| (rule.to, rule.actions))
}
