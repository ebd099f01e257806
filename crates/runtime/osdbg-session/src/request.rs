//! Custom requests sent by the editor front-end.

use osdbg_core::{Border, DebugError, DebugResult, HookBreakpoint, HookConfig, HookLocation};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone)]
pub enum CustomRequest {
    SetBorder(Border),
    DisableBorder(Border),
    SetHookBreakpoint(HookBreakpoint),
    DisableHookBreakpoint(HookLocation),
    /// Forget every breakpoint group and delete all debugger breakpoints
    RemoveAllCliBreakpoints,
    /// Remove the current group's breakpoints from the debugger only
    DisableCurrentBreakpointGroupBreakpoints,
    SendGdbCliCommand(String),
    SendGdbMiCommand(String),
    Unknown(String),
}

/// `disableHookBreakpoint` takes either the location itself or the same
/// `{ breakpoint, behavior }` shape `setHookBreakpoint` uses.
#[derive(Deserialize)]
#[serde(untagged)]
enum HookLocationArgs {
    Wrapped { breakpoint: HookLocation },
    Bare(HookLocation),
}

fn decode<T: DeserializeOwned>(command: &str, arguments: Value) -> DebugResult<T> {
    serde_json::from_value(arguments).map_err(|e| DebugError::Request {
        command: command.to_string(),
        message: e.to_string(),
    })
}

impl CustomRequest {
    pub fn from_dap(command: &str, arguments: Value) -> DebugResult<Self> {
        Ok(match command {
            "setBorder" => CustomRequest::SetBorder(decode(command, arguments)?),
            "disableBorder" => CustomRequest::DisableBorder(decode(command, arguments)?),
            "setHookBreakpoint" => {
                let hook: HookConfig = decode(command, arguments)?;
                CustomRequest::SetHookBreakpoint(hook.build())
            }
            "disableHookBreakpoint" => {
                let location = match decode(command, arguments)? {
                    HookLocationArgs::Wrapped { breakpoint } => breakpoint,
                    HookLocationArgs::Bare(location) => location,
                };
                CustomRequest::DisableHookBreakpoint(location)
            }
            "removeAllCliBreakpoints" => CustomRequest::RemoveAllCliBreakpoints,
            "disableCurrentBreakpointGroupBreakpoints" => {
                CustomRequest::DisableCurrentBreakpointGroupBreakpoints
            }
            "send_gdb_cli_command" => CustomRequest::SendGdbCliCommand(decode(command, arguments)?),
            "send_gdb_mi_command" => CustomRequest::SendGdbMiCommand(decode(command, arguments)?),
            other => CustomRequest::Unknown(other.to_string()),
        })
    }

    pub fn command(&self) -> &str {
        match self {
            CustomRequest::SetBorder(_) => "setBorder",
            CustomRequest::DisableBorder(_) => "disableBorder",
            CustomRequest::SetHookBreakpoint(_) => "setHookBreakpoint",
            CustomRequest::DisableHookBreakpoint(_) => "disableHookBreakpoint",
            CustomRequest::RemoveAllCliBreakpoints => "removeAllCliBreakpoints",
            CustomRequest::DisableCurrentBreakpointGroupBreakpoints => {
                "disableCurrentBreakpointGroupBreakpoints"
            }
            CustomRequest::SendGdbCliCommand(_) => "send_gdb_cli_command",
            CustomRequest::SendGdbMiCommand(_) => "send_gdb_mi_command",
            CustomRequest::Unknown(command) => command,
        }
    }
}

/// How a custom request was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Acknowledged,
    /// Text the debugger printed for a forwarded command
    CommandOutput(String),
    /// The command is not one this session knows; acknowledged anyway
    Unrecognized(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_border_requests() {
        let request =
            CustomRequest::from_dap("setBorder", json!({ "filepath": "trap.rs", "line": 135 }))
                .unwrap();
        assert!(matches!(request, CustomRequest::SetBorder(b) if b == Border::new("trap.rs", 135)));
    }

    #[test]
    fn disable_hook_accepts_both_shapes() {
        let bare = json!({ "file": "exec.rs", "line": 49 });
        let wrapped = json!({
            "breakpoint": { "file": "exec.rs", "line": 49 },
            "behavior": { "kind": "fixed", "group": "ignored" }
        });
        for arguments in [bare, wrapped] {
            let request = CustomRequest::from_dap("disableHookBreakpoint", arguments).unwrap();
            assert!(matches!(
                request,
                CustomRequest::DisableHookBreakpoint(l) if l == HookLocation::new("exec.rs", 49)
            ));
        }
    }

    #[test]
    fn set_hook_builds_the_behavior() {
        let request = CustomRequest::from_dap(
            "setHookBreakpoint",
            json!({
                "breakpoint": { "file": "exec.rs", "line": 49 },
                "behavior": { "kind": "fixed", "group": "initproc" }
            }),
        )
        .unwrap();
        let CustomRequest::SetHookBreakpoint(hook) = request else {
            panic!("expected a hook request");
        };
        assert_eq!(hook.location, HookLocation::new("exec.rs", 49));
        assert_eq!(hook.behavior.describe(), "fixed `initproc`");
    }

    #[test]
    fn forwarded_commands_take_a_plain_string() {
        let request = CustomRequest::from_dap("send_gdb_cli_command", json!("info registers")).unwrap();
        assert!(matches!(request, CustomRequest::SendGdbCliCommand(c) if c == "info registers"));
    }

    #[test]
    fn malformed_arguments_are_request_errors() {
        let err = CustomRequest::from_dap("setBorder", json!({ "line": 1 })).unwrap_err();
        assert!(matches!(err, DebugError::Request { ref command, .. } if command == "setBorder"));
    }

    #[test]
    fn unknown_commands_are_kept_by_name() {
        let request = CustomRequest::from_dap("eventTest", Value::Null).unwrap();
        assert_eq!(request.command(), "eventTest");
        assert!(matches!(request, CustomRequest::Unknown(_)));
    }
}
