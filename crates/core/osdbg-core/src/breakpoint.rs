//! Breakpoint value types shared by the registry, the switch protocol and
//! the front-end requests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One breakpoint as requested by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakpoint {
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hit_condition: Option<String>,
}

impl SourceBreakpoint {
    pub fn at_line(line: u32) -> Self {
        Self {
            line,
            condition: None,
            hit_condition: None,
        }
    }
}

/// The full breakpoint set of one source file, as last sent by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBreakpoints {
    pub path: String,
    #[serde(default)]
    pub breakpoints: Vec<SourceBreakpoint>,
}

impl SourceBreakpoints {
    pub fn new(path: impl Into<String>, breakpoints: Vec<SourceBreakpoint>) -> Self {
        Self {
            path: path.into(),
            breakpoints,
        }
    }

    /// Live-debugger specs for every breakpoint in this file.
    pub fn specs(&self) -> impl Iterator<Item = BreakpointSpec> + '_ {
        self.breakpoints.iter().map(|bp| BreakpointSpec {
            file: self.path.clone(),
            line: bp.line,
            condition: bp.condition.clone(),
            count_condition: bp.hit_condition.clone(),
        })
    }
}

/// A breakpoint as handed to the machine-level debugger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointSpec {
    pub file: String,
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_condition: Option<String>,
}

/// Location at which control is expected to leave a group's domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Border {
    pub filepath: String,
    pub line: u32,
}

impl Border {
    pub fn new(filepath: impl Into<String>, line: u32) -> Self {
        Self {
            filepath: filepath.into(),
            line,
        }
    }

    pub fn is_at(&self, file: &str, line: u32) -> bool {
        self.filepath == file && self.line == line
    }
}

impl fmt::Display for Border {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filepath, self.line)
    }
}

/// Identity of a hook breakpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HookLocation {
    pub file: String,
    pub line: u32,
}

impl HookLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    pub fn is_at(&self, file: &str, line: u32) -> bool {
        self.file == file && self.line == line
    }
}

impl fmt::Display for HookLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
