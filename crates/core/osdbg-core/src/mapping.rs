//! Name-mapping strategies
//!
//! Two mappings tie source files, breakpoint groups and symbol files
//! together:
//!
//! - [`GroupNameMapper`]: source file path → names of the groups that own
//!   breakpoints in that file. A file may belong to several groups, for
//!   example a shared library linked into every user program.
//! - [`SymbolFileMapper`]: group name → debug-info file to load while that
//!   group is current.
//!
//! Both are plain closures underneath and can be built from declarative
//! regex rules ([`MappingRule`]) taken from the attach configuration.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A regex rule: when `pattern` matches, `template` is expanded with the
/// capture groups (`$1`, `${name}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRule {
    pub pattern: String,
    pub template: String,
}

impl MappingRule {
    pub fn new(pattern: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            template: template.into(),
        }
    }

    fn compile(&self) -> Result<CompiledRule, ConfigError> {
        let regex = Regex::new(&self.pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: self.pattern.clone(),
            message: e.to_string(),
        })?;
        Ok(CompiledRule {
            regex,
            template: self.template.clone(),
        })
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    template: String,
}

impl CompiledRule {
    fn apply(&self, input: &str) -> Option<String> {
        let caps = self.regex.captures(input)?;
        let mut out = String::new();
        caps.expand(&self.template, &mut out);
        Some(out)
    }
}

fn compile_all(rules: &[MappingRule]) -> Result<Vec<CompiledRule>, ConfigError> {
    rules.iter().map(MappingRule::compile).collect()
}

type GroupNameFn = dyn Fn(&str) -> Vec<String> + Send + Sync;

/// Maps a source file path to the groups owning it.
#[derive(Clone)]
pub struct GroupNameMapper(Arc<GroupNameFn>);

impl GroupNameMapper {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Every file belongs to the group named after itself.
    pub fn identity() -> Self {
        Self::new(|path| vec![path.to_string()])
    }

    /// Collects the expansion of every matching rule, in rule order and
    /// without duplicates. A path no rule matches maps to itself.
    pub fn from_rules(rules: &[MappingRule]) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            return Ok(Self::identity());
        }
        let compiled = compile_all(rules)?;
        Ok(Self::new(move |path| {
            let mut groups: Vec<String> = Vec::new();
            for rule in &compiled {
                if let Some(name) = rule.apply(path)
                    && !groups.contains(&name)
                {
                    groups.push(name);
                }
            }
            if groups.is_empty() {
                groups.push(path.to_string());
            }
            groups
        }))
    }

    pub fn groups_for(&self, path: &str) -> Vec<String> {
        (self.0)(path)
    }
}

impl fmt::Debug for GroupNameMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GroupNameMapper(..)")
    }
}

impl Default for GroupNameMapper {
    fn default() -> Self {
        Self::identity()
    }
}

type SymbolFileFn = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Maps a group name to the symbol file loaded while it is current.
/// `None` means the group has no separate symbol file.
#[derive(Clone)]
pub struct SymbolFileMapper(Arc<SymbolFileFn>);

impl SymbolFileMapper {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn none() -> Self {
        Self::new(|_| None)
    }

    /// First matching rule wins.
    pub fn from_rules(rules: &[MappingRule]) -> Result<Self, ConfigError> {
        let compiled = compile_all(rules)?;
        Ok(Self::new(move |group| {
            compiled.iter().find_map(|rule| rule.apply(group))
        }))
    }

    pub fn symbol_file_for(&self, group: &str) -> Option<String> {
        (self.0)(group)
    }
}

impl fmt::Debug for SymbolFileMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymbolFileMapper(..)")
    }
}

impl Default for SymbolFileMapper {
    fn default() -> Self {
        Self::none()
    }
}
