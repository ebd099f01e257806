//! Breakpoint group registry
//!
//! Each execution domain (the kernel, or one user program) owns a named
//! breakpoint group: the breakpoints the editor set in files of that domain,
//! an optional border location and a set of hooks. Only the current group's
//! breakpoints are installed in the live debugger; the others are kept here
//! until their domain becomes current.
//!
//! Groups are created lazily on first reference and only disappear on a full
//! reset. Nothing in this module talks to the debugger.

use log::debug;

use crate::breakpoint::{Border, HookLocation, SourceBreakpoints};
use crate::hook::{HookBreakpoint, HookBreakpoints};

/// The saved breakpoint state of one domain.
#[derive(Debug, Clone)]
pub struct BreakpointGroup {
    pub name: String,
    /// Last request per source file, in first-seen order
    pub breakpoint_requests: Vec<SourceBreakpoints>,
    pub border: Option<Border>,
    pub hooks: HookBreakpoints,
}

impl BreakpointGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            breakpoint_requests: Vec::new(),
            border: None,
            hooks: HookBreakpoints::new(),
        }
    }

    /// Source files this group has breakpoints in.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.breakpoint_requests.iter().map(|r| r.path.as_str())
    }

    pub fn breakpoint_count(&self) -> usize {
        self.breakpoint_requests
            .iter()
            .map(|r| r.breakpoints.len())
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct BreakpointGroupRegistry {
    groups: Vec<BreakpointGroup>,
    current: String,
    next: String,
}

impl BreakpointGroupRegistry {
    /// `current` is materialized right away; `next` is only a name until
    /// something references it.
    pub fn new(current: impl Into<String>, next: impl Into<String>) -> Self {
        let current = current.into();
        Self {
            groups: vec![BreakpointGroup::new(current.clone())],
            current,
            next: next.into(),
        }
    }

    pub fn current_group_name(&self) -> &str {
        &self.current
    }

    /// The current group, created empty if it is not recorded.
    pub fn current_group(&mut self) -> &BreakpointGroup {
        let name = self.current.clone();
        self.group_or_insert(&name)
    }

    pub fn group(&self, name: &str) -> Option<&BreakpointGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn group_or_insert(&mut self, name: &str) -> &mut BreakpointGroup {
        let index = match self.groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                debug!("creating breakpoint group `{name}`");
                self.groups.push(BreakpointGroup::new(name));
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    fn existing_mut(&mut self, name: &str) -> Option<&mut BreakpointGroup> {
        self.groups.iter_mut().find(|g| g.name == name)
    }

    pub fn next_group_name(&self) -> &str {
        &self.next
    }

    pub fn set_next_group_name(&mut self, name: impl Into<String>) {
        self.next = name.into();
    }

    /// Only the switch protocol moves the current pointer, since the live
    /// debugger state has to follow it.
    pub(crate) fn set_current_group_name(&mut self, name: impl Into<String>) {
        self.current = name.into();
    }

    /// Records `request` in `group_name`, replacing an earlier request for
    /// the same source path. The live debugger is not touched.
    pub fn save_breakpoints(&mut self, request: SourceBreakpoints, group_name: &str) {
        let group = self.group_or_insert(group_name);
        match group
            .breakpoint_requests
            .iter_mut()
            .find(|r| r.path == request.path)
        {
            Some(existing) => *existing = request,
            None => group.breakpoint_requests.push(request),
        }
    }

    /// Makes `border` the border of every owner, creating missing owners.
    pub fn update_border(&mut self, border: &Border, owners: &[String]) {
        for owner in owners {
            self.group_or_insert(owner).border = Some(border.clone());
        }
    }

    /// Clears the border of every existing owner. The breakpoint itself stays.
    pub fn disable_border(&mut self, border: &Border, owners: &[String]) {
        for owner in owners {
            match self.existing_mut(owner) {
                Some(group) => group.border = None,
                None => debug!("no group `{owner}` to drop border {border} from"),
            }
        }
    }

    pub fn update_hook(&mut self, hook: &HookBreakpoint, owners: &[String]) {
        for owner in owners {
            self.group_or_insert(owner).hooks.set(hook.clone());
        }
    }

    pub fn disable_hook(&mut self, location: &HookLocation, owners: &[String]) {
        for owner in owners {
            if let Some(group) = self.existing_mut(owner) {
                group.hooks.remove(location);
            }
        }
    }

    /// Forgets every group. The current name survives and is re-materialized
    /// on next access.
    pub fn remove_all_breakpoints(&mut self) {
        self.groups.clear();
    }

    pub fn groups(&self) -> impl Iterator<Item = &BreakpointGroup> {
        self.groups.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::breakpoint::SourceBreakpoint;
    use crate::hook::FixedGroup;

    fn request(path: &str, lines: &[u32]) -> SourceBreakpoints {
        SourceBreakpoints::new(
            path,
            lines.iter().copied().map(SourceBreakpoint::at_line).collect(),
        )
    }

    fn owners(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn current_group_exists_from_the_start() {
        let registry = BreakpointGroupRegistry::new("kernel", "initproc");
        assert_eq!(registry.current_group_name(), "kernel");
        assert!(registry.group("kernel").is_some());
        assert!(registry.group("initproc").is_none());
        assert_eq!(registry.next_group_name(), "initproc");
    }

    #[test]
    fn saving_replaces_request_for_the_same_path() {
        let mut registry = BreakpointGroupRegistry::new("kernel", "user");
        registry.save_breakpoints(request("proc.c", &[1, 2]), "kernel");
        registry.save_breakpoints(request("trap.c", &[7]), "kernel");
        registry.save_breakpoints(request("proc.c", &[3]), "kernel");

        let group = registry.group("kernel").unwrap();
        assert_eq!(group.paths().collect::<Vec<_>>(), vec!["proc.c", "trap.c"]);
        assert_eq!(group.breakpoint_requests[0].breakpoints, vec![SourceBreakpoint::at_line(3)]);
        assert_eq!(group.breakpoint_count(), 2);
    }

    #[test]
    fn saving_into_unknown_group_creates_it() {
        let mut registry = BreakpointGroupRegistry::new("kernel", "user");
        registry.save_breakpoints(request("init.c", &[5]), "user");
        assert_eq!(registry.group("user").unwrap().breakpoint_count(), 1);
    }

    #[test]
    fn border_update_materializes_and_replaces() {
        let mut registry = BreakpointGroupRegistry::new("kernel", "user");
        let all = owners(&["kernel", "user"]);
        registry.update_border(&Border::new("trap.c", 10), &all);
        registry.update_border(&Border::new("trap.c", 20), &all);

        for name in ["kernel", "user"] {
            assert_eq!(registry.group(name).unwrap().border, Some(Border::new("trap.c", 20)));
        }
    }

    #[test]
    fn border_disable_does_not_materialize() {
        let mut registry = BreakpointGroupRegistry::new("kernel", "user");
        registry.update_border(&Border::new("trap.c", 10), &owners(&["kernel"]));
        registry.disable_border(&Border::new("trap.c", 10), &owners(&["kernel", "ghost"]));

        assert_eq!(registry.group("kernel").unwrap().border, None);
        assert!(registry.group("ghost").is_none());
    }

    #[test]
    fn hooks_are_set_and_removed_per_owner() {
        let mut registry = BreakpointGroupRegistry::new("kernel", "user");
        let location = HookLocation::new("exec.c", 30);
        let hook = HookBreakpoint::new(location.clone(), Arc::new(FixedGroup("sh".into())));
        registry.update_hook(&hook, &owners(&["kernel"]));
        registry.update_hook(&hook, &owners(&["kernel"]));
        assert_eq!(registry.group("kernel").unwrap().hooks.len(), 1);

        registry.disable_hook(&location, &owners(&["kernel", "ghost"]));
        assert!(registry.group("kernel").unwrap().hooks.is_empty());
        assert!(registry.group("ghost").is_none());
    }

    #[test]
    fn reset_keeps_the_current_name() {
        let mut registry = BreakpointGroupRegistry::new("kernel", "user");
        registry.save_breakpoints(request("proc.c", &[1]), "kernel");
        registry.remove_all_breakpoints();

        assert_eq!(registry.groups().count(), 0);
        assert_eq!(registry.current_group_name(), "kernel");
        assert_eq!(registry.current_group().breakpoint_count(), 0);
        assert_eq!(registry.groups().count(), 1);
    }
}
