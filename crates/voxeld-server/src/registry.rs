// crates/voxeld-server/src/registry.rs
// ============================================================================
// Module: Method Registry
// Description: Static name -> MethodDescriptor map built once at startup.
// Purpose: Let the Worker Pool look up a handler and its concurrency class
//          by method name without the Session or Acceptor knowing either.
// Dependencies: std::collections::HashMap, crate::handlers
// ============================================================================

use std::collections::HashMap;

use voxeld_core::Concurrency;

/// One registered method: its name and the scene access it requires.
/// Dispatch to the function implementing it happens in
/// [`crate::handlers::dispatch`], keyed on the same name, mirroring the
/// registry's own lookup.
#[derive(Clone, Copy)]
pub struct MethodDescriptor {
    /// The method's registered name, e.g. `"goxel.add_voxel"`.
    pub name: &'static str,
    /// The scene access this method requires.
    pub concurrency: Concurrency,
}

/// Introspection summary of one registered method, as returned by
/// `list_methods`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MethodSummary {
    /// The method's name.
    pub name: &'static str,
    /// The method's concurrency class, as a lowercase string.
    pub concurrency: &'static str,
}

/// The static map of method name to [`MethodDescriptor`], built once at
/// daemon startup and never mutated afterward.
#[derive(Clone)]
pub struct MethodRegistry {
    /// All registered methods, keyed by name.
    methods: HashMap<&'static str, MethodDescriptor>,
}

impl MethodRegistry {
    /// Builds the registry of every method this daemon supports.
    ///
    /// When `shutdown_method_enabled` is `false`, the `shutdown` method is
    /// omitted entirely: `list_methods` never advertises it and invoking
    /// it yields `MethodNotFound`, per §4.3/§9.
    #[must_use]
    pub fn build(shutdown_method_enabled: bool) -> Self {
        let mut methods = HashMap::new();
        for descriptor in crate::handlers::descriptors() {
            if descriptor.name == "shutdown" && !shutdown_method_enabled {
                continue;
            }
            methods.insert(descriptor.name, descriptor);
        }
        Self { methods }
    }

    /// Looks up a method by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    /// Lists every registered method's name and concurrency class, in a
    /// stable order (sorted by name) so the result is reproducible for the
    /// lifetime of the process (§8).
    #[must_use]
    pub fn list(&self) -> Vec<MethodSummary> {
        let mut summaries: Vec<MethodSummary> = self
            .methods
            .values()
            .map(|descriptor| MethodSummary {
                name: descriptor.name,
                concurrency: concurrency_label(descriptor.concurrency),
            })
            .collect();
        summaries.sort_by_key(|summary| summary.name);
        summaries
    }
}

/// Renders a [`Concurrency`] as the lowercase label used on the wire.
#[must_use]
pub const fn concurrency_label(concurrency: Concurrency) -> &'static str {
    match concurrency {
        Concurrency::Exclusive => "exclusive",
        Concurrency::Shared => "shared",
        Concurrency::Free => "free",
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "test assertions read better unwrapped")]

    use super::MethodRegistry;

    #[test]
    fn shutdown_present_when_enabled() {
        let registry = MethodRegistry::build(true);
        assert!(registry.get("shutdown").is_some());
        assert!(registry.list().iter().any(|m| m.name == "shutdown"));
    }

    #[test]
    fn shutdown_absent_when_disabled() {
        let registry = MethodRegistry::build(false);
        assert!(registry.get("shutdown").is_none());
        assert!(!registry.list().iter().any(|m| m.name == "shutdown"));
    }

    #[test]
    fn list_is_sorted_by_name() {
        let registry = MethodRegistry::build(true);
        let names: Vec<&str> = registry.list().into_iter().map(|m| m.name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn ping_and_echo_are_registered_as_free() {
        let registry = MethodRegistry::build(true);
        assert_eq!(registry.get("ping").unwrap().concurrency, voxeld_core::Concurrency::Free);
        assert_eq!(registry.get("echo").unwrap().concurrency, voxeld_core::Concurrency::Free);
    }
}
