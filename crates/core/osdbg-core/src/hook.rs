//! Hook breakpoints
//!
//! A hook is a breakpoint location paired with an asynchronous behavior that
//! computes the name of the group execution will enter next (for example by
//! reading the path of the program the kernel is about to `exec`).

use std::fmt;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use futures::future::BoxFuture;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::breakpoint::HookLocation;
use crate::channel::DebuggerChannel;
use crate::error::HookError;

/// Computes the next breakpoint group name when its hook is reached.
#[async_trait]
pub trait HookBehavior: Send + Sync {
    async fn resolve(&self, channel: &dyn DebuggerChannel) -> Result<String, HookError>;

    /// Short human-readable summary for diagnostics.
    fn describe(&self) -> String {
        "custom behavior".to_string()
    }
}

/// Always yields the same group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedGroup(pub String);

#[async_trait]
impl HookBehavior for FixedGroup {
    async fn resolve(&self, _channel: &dyn DebuggerChannel) -> Result<String, HookError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        format!("fixed `{}`", self.0)
    }
}

static QUOTED_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("quoted-string pattern is valid"));

/// Reads a string in the target with `x /s <expression>` and substitutes it
/// into `template` at `{}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringVariableGroup {
    pub expression: String,
    pub template: String,
}

impl StringVariableGroup {
    /// Extracts the first double-quoted string of an `x /s` dump such as
    /// `0x80412c30:\t"initproc"`.
    pub fn extract_string(output: &str) -> Option<String> {
        QUOTED_STRING
            .captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

#[async_trait]
impl HookBehavior for StringVariableGroup {
    async fn resolve(&self, channel: &dyn DebuggerChannel) -> Result<String, HookError> {
        let command = format!("x /s {}", self.expression);
        let output = channel.send_cli_command(&command).await?;
        let value = Self::extract_string(&output).ok_or_else(|| {
            HookError::Behavior(format!("`{command}` printed no string: {}", output.trim()))
        })?;
        Ok(self.template.replace("{}", &value))
    }

    fn describe(&self) -> String {
        format!("string `{}` into `{}`", self.expression, self.template)
    }
}

type HookFn = dyn for<'a> Fn(&'a dyn DebuggerChannel) -> BoxFuture<'a, Result<String, HookError>>
    + Send
    + Sync;

/// Adapts a closure into a [`HookBehavior`]. The returned future may borrow
/// the channel to query the target.
#[derive(Clone)]
pub struct FnBehavior(Arc<HookFn>);

impl FnBehavior {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a dyn DebuggerChannel) -> BoxFuture<'a, Result<String, HookError>>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for FnBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnBehavior(..)")
    }
}

#[async_trait]
impl HookBehavior for FnBehavior {
    async fn resolve(&self, channel: &dyn DebuggerChannel) -> Result<String, HookError> {
        (self.0)(channel).await
    }
}

/// Declarative behavior as written in an attach configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum HookBehaviorConfig {
    Fixed {
        group: String,
    },
    StringVariable {
        expression: String,
        #[serde(default = "default_template")]
        template: String,
    },
}

fn default_template() -> String {
    "{}".to_string()
}

impl HookBehaviorConfig {
    pub fn build(&self) -> Arc<dyn HookBehavior> {
        match self {
            HookBehaviorConfig::Fixed { group } => Arc::new(FixedGroup(group.clone())),
            HookBehaviorConfig::StringVariable {
                expression,
                template,
            } => Arc::new(StringVariableGroup {
                expression: expression.clone(),
                template: template.clone(),
            }),
        }
    }
}

/// A hook location together with its behavior.
#[derive(Clone)]
pub struct HookBreakpoint {
    pub location: HookLocation,
    pub behavior: Arc<dyn HookBehavior>,
}

impl HookBreakpoint {
    pub fn new(location: HookLocation, behavior: Arc<dyn HookBehavior>) -> Self {
        Self { location, behavior }
    }
}

impl fmt::Debug for HookBreakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookBreakpoint")
            .field("location", &self.location)
            .field("behavior", &self.behavior.describe())
            .finish()
    }
}

/// Hooks of one group, keyed by location. Behaviors cannot be compared, so
/// setting a hook at an existing location replaces its behavior.
#[derive(Debug, Clone, Default)]
pub struct HookBreakpoints {
    hooks: Vec<HookBreakpoint>,
}

impl HookBreakpoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, hook: HookBreakpoint) {
        match self.hooks.iter_mut().find(|h| h.location == hook.location) {
            Some(existing) => existing.behavior = hook.behavior,
            None => self.hooks.push(hook),
        }
    }

    /// Removing an absent location is a no-op.
    pub fn remove(&mut self, location: &HookLocation) {
        self.hooks.retain(|h| &h.location != location);
    }

    pub fn find(&self, file: &str, line: u32) -> Option<&HookBreakpoint> {
        self.hooks.iter().find(|h| h.location.is_at(file, line))
    }

    pub fn iter(&self) -> impl Iterator<Item = &HookBreakpoint> {
        self.hooks.iter()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl<'a> IntoIterator for &'a HookBreakpoints {
    type Item = &'a HookBreakpoint;
    type IntoIter = std::slice::Iter<'a, HookBreakpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.hooks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedChannel;

    fn fixed(name: &str) -> Arc<dyn HookBehavior> {
        Arc::new(FixedGroup(name.to_string()))
    }

    #[tokio::test]
    async fn setting_twice_keeps_one_hook_with_latest_behavior() {
        let channel = ScriptedChannel::new();
        let location = HookLocation::new("init.c", 10);
        let mut hooks = HookBreakpoints::new();
        hooks.set(HookBreakpoint::new(location.clone(), fixed("first")));
        hooks.set(HookBreakpoint::new(location.clone(), fixed("second")));

        assert_eq!(hooks.len(), 1);
        let hook = hooks.find("init.c", 10).expect("hook present");
        assert_eq!(hook.behavior.resolve(&channel).await.unwrap(), "second");
    }

    #[tokio::test]
    async fn closure_behavior_can_query_the_debugger() {
        use futures::FutureExt;

        let channel = ScriptedChannel::new();
        channel.push_cli_output("$1 = 2");
        let behavior = FnBehavior::new(|channel| {
            async move {
                let out = channel.send_cli_command("print current_app").await?;
                let id = out.rsplit(' ').next().unwrap_or_default();
                Ok::<_, HookError>(format!("app_{id}"))
            }
            .boxed()
        });

        assert_eq!(behavior.resolve(&channel).await.unwrap(), "app_2");
        assert_eq!(channel.cli_commands(), vec!["print current_app".to_string()]);
    }

    #[test]
    fn removing_missing_hook_is_a_no_op() {
        let mut hooks = HookBreakpoints::new();
        hooks.set(HookBreakpoint::new(HookLocation::new("init.c", 10), fixed("a")));
        hooks.remove(&HookLocation::new("init.c", 11));
        hooks.remove(&HookLocation::new("other.c", 10));
        assert_eq!(hooks.len(), 1);
        hooks.remove(&HookLocation::new("init.c", 10));
        assert!(hooks.is_empty());
    }

    #[test]
    fn extracts_string_from_examine_output() {
        let out = "0x80412c30:\t\"initproc\"\n";
        assert_eq!(
            StringVariableGroup::extract_string(out).as_deref(),
            Some("initproc")
        );
        assert_eq!(StringVariableGroup::extract_string("0x0: <error>"), None);
    }

    #[tokio::test]
    async fn string_variable_behavior_fills_template() {
        let channel = ScriptedChannel::new();
        channel.push_cli_output("0x80412c30:\t\"user_shell\"");
        let behavior = HookBehaviorConfig::StringVariable {
            expression: "path.vec.buf.ptr.pointer.pointer".to_string(),
            template: "/work/user/src/bin/{}.rs".to_string(),
        }
        .build();

        let group = behavior.resolve(&channel).await.unwrap();
        assert_eq!(group, "/work/user/src/bin/user_shell.rs");
        assert_eq!(
            channel.cli_commands(),
            vec!["x /s path.vec.buf.ptr.pointer.pointer".to_string()]
        );
    }

    #[tokio::test]
    async fn string_variable_behavior_reports_missing_string() {
        let channel = ScriptedChannel::new();
        channel.push_cli_output("Cannot access memory at address 0x0");
        let behavior = StringVariableGroup {
            expression: "name".to_string(),
            template: "{}".to_string(),
        };
        assert!(matches!(
            behavior.resolve(&channel).await,
            Err(HookError::Behavior(_))
        ));
    }

    #[test]
    fn behavior_config_deserializes_with_default_template() {
        let config: HookBehaviorConfig =
            serde_json::from_str(r#"{ "kind": "stringVariable", "expression": "path" }"#).unwrap();
        assert_eq!(
            config,
            HookBehaviorConfig::StringVariable {
                expression: "path".to_string(),
                template: "{}".to_string(),
            }
        );
    }
}
