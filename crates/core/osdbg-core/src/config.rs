//! 会话配置
//!
//! Attach-time settings of an OS debugging session. They usually come from
//! the editor's launch configuration as JSON (field names follow the
//! launch.json keys), or from a TOML file for the command-line checker.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::address::{MemoryLayout, MemoryRange};
use crate::breakpoint::{Border, HookLocation};
use crate::error::ConfigError;
use crate::hook::{HookBehaviorConfig, HookBreakpoint};
use crate::mapping::{GroupNameMapper, MappingRule, SymbolFileMapper};

/// 统一配置 Trait
pub trait Config: Serialize + serde::de::DeserializeOwned {
    /// 验证配置的有效性
    fn validate(&self) -> Result<(), ConfigError>;

    /// 获取默认配置
    fn defaults() -> Self;

    /// 从 TOML 字符串加载配置
    fn from_toml(toml: &str) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(format!("TOML parse error: {}", e)))
    }

    /// 从 JSON 字符串加载配置
    fn from_json(json: &str) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        serde_json::from_str(json)
            .map_err(|e| ConfigError::Parse(format!("JSON parse error: {}", e)))
    }

    /// 将配置序列化为 TOML
    fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(format!("TOML serialize error: {}", e)))
    }

    /// 将配置序列化为 JSON
    fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(format!("JSON serialize error: {}", e)))
    }

    /// 从文件加载并验证配置，按扩展名选择格式（`.toml`，否则 JSON）
    fn load(path: &Path) -> Result<Self, ConfigError>
    where
        Self: Sized,
    {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&text)?,
            _ => Self::from_json(&text)?,
        };
        config.validate()?;
        Ok(config)
    }
}

pub const DEFAULT_HOOK_TIMEOUT_MS: u64 = 5000;

/// Register number of the program counter in GDB's RISC-V register list.
pub const DEFAULT_PROGRAM_COUNTER_ID: u32 = 32;

/// A hook as declared in the launch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookConfig {
    pub breakpoint: HookLocation,
    pub behavior: HookBehaviorConfig,
}

impl HookConfig {
    pub fn build(&self) -> HookBreakpoint {
        HookBreakpoint::new(self.breakpoint.clone(), self.behavior.build())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_program_counter_id", alias = "programCounterId")]
    pub program_counter_id: u32,

    /// Group that is current when the session starts
    #[serde(alias = "firstBreakpointGroup")]
    pub first_breakpoint_group: String,

    /// Initial "next" group, used for the first crossing when no hook fires
    #[serde(alias = "secondBreakpointGroup")]
    pub second_breakpoint_group: String,

    #[serde(default, alias = "kernelMemoryRanges")]
    pub kernel_memory_ranges: Vec<[String; 2]>,

    #[serde(default, alias = "userMemoryRanges")]
    pub user_memory_ranges: Vec<[String; 2]>,

    #[serde(default, alias = "filePathToBreakpointGroupNames")]
    pub file_path_to_group_names: Vec<MappingRule>,

    #[serde(default, alias = "breakpointGroupNameToDebugFilePath")]
    pub group_name_to_symbol_file: Vec<MappingRule>,

    #[serde(default, alias = "borderBreakpointsFromLaunchJSON")]
    pub border_breakpoints: Vec<Border>,

    #[serde(default, alias = "hookBreakpointsFromLaunchJSON")]
    pub hook_breakpoints: Vec<HookConfig>,

    #[serde(default = "default_hook_timeout_ms", alias = "hookTimeoutMs")]
    pub hook_timeout_ms: u64,
}

fn default_program_counter_id() -> u32 {
    DEFAULT_PROGRAM_COUNTER_ID
}

fn default_hook_timeout_ms() -> u64 {
    DEFAULT_HOOK_TIMEOUT_MS
}

fn parse_ranges(pairs: &[[String; 2]]) -> Result<Vec<MemoryRange>, ConfigError> {
    pairs
        .iter()
        .map(|[low, high]| MemoryRange::parse(low, high))
        .collect()
}

impl SessionConfig {
    pub fn memory_layout(&self) -> Result<MemoryLayout, ConfigError> {
        Ok(MemoryLayout::new(
            parse_ranges(&self.kernel_memory_ranges)?,
            parse_ranges(&self.user_memory_ranges)?,
        ))
    }

    pub fn group_mapper(&self) -> Result<GroupNameMapper, ConfigError> {
        GroupNameMapper::from_rules(&self.file_path_to_group_names)
    }

    pub fn symbol_mapper(&self) -> Result<SymbolFileMapper, ConfigError> {
        SymbolFileMapper::from_rules(&self.group_name_to_symbol_file)
    }

    pub fn hook_timeout(&self) -> Duration {
        Duration::from_millis(self.hook_timeout_ms)
    }

    pub fn hooks(&self) -> Vec<HookBreakpoint> {
        self.hook_breakpoints.iter().map(HookConfig::build).collect()
    }
}

impl Config for SessionConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.first_breakpoint_group.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "first_breakpoint_group must not be empty".to_string(),
            ));
        }
        if self.second_breakpoint_group.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "second_breakpoint_group must not be empty".to_string(),
            ));
        }
        if self.hook_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "hook_timeout_ms must be greater than 0".to_string(),
            ));
        }
        self.memory_layout()?;
        self.group_mapper()?;
        self.symbol_mapper()?;
        Ok(())
    }

    fn defaults() -> Self {
        Self {
            program_counter_id: DEFAULT_PROGRAM_COUNTER_ID,
            first_breakpoint_group: "kernel".to_string(),
            second_breakpoint_group: "user".to_string(),
            kernel_memory_ranges: Vec::new(),
            user_memory_ranges: Vec::new(),
            file_path_to_group_names: Vec::new(),
            group_name_to_symbol_file: Vec::new(),
            border_breakpoints: Vec::new(),
            hook_breakpoints: Vec::new(),
            hook_timeout_ms: DEFAULT_HOOK_TIMEOUT_MS,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::defaults()
    }
}
