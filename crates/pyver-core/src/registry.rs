//! Thread-safe rule registry.
//!
//! Stores uniquely named [`Rule`]s behind a reader/writer lock. Readers copy
//! rules out before returning so that extractors never run while the lock is
//! held.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::debug;

use crate::rule::{Rule, RuleError};

/// Counts describing the contents of a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
    /// Number of rules per priority value.
    pub by_priority: BTreeMap<i32, usize>,
    /// Number of rules carrying each tag.
    pub by_tag: BTreeMap<String, usize>,
}

/// Registry of extraction rules keyed by name.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: RwLock<HashMap<String, Rule>>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Rule>> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Rule>> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate and store a rule, replacing any rule with the same name.
    pub fn register(&self, rule: Rule) -> Result<(), RuleError> {
        rule.validate()?;
        let name = rule.name().to_string();
        let priority = rule.priority();
        if self.write().insert(name.clone(), rule).is_some() {
            debug!(rule = %name, priority, "Replaced existing rule");
        } else {
            debug!(rule = %name, priority, "Registered rule");
        }
        Ok(())
    }

    /// Register a rule from a static table, panicking if it is invalid.
    pub fn must_register(&self, rule: Rule) {
        if let Err(e) = self.register(rule) {
            panic!("static rule table contains an invalid rule: {e}");
        }
    }

    /// Remove a rule. Returns whether it existed.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.write().remove(name).is_some();
        if removed {
            debug!(rule = %name, "Unregistered rule");
        }
        removed
    }

    /// Look up a copy of a rule by name.
    pub fn get(&self, name: &str) -> Option<Rule> {
        self.read().get(name).cloned()
    }

    /// Whether a rule with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Remove every rule.
    pub fn clear(&self) {
        self.write().clear();
        debug!("Cleared rule registry");
    }

    /// Number of registered rules.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All rules, sorted by ascending priority.
    pub fn list(&self) -> Vec<Rule> {
        self.collect_sorted(|_| true)
    }

    /// Enabled rules, sorted by ascending priority.
    pub fn list_enabled(&self) -> Vec<Rule> {
        self.collect_sorted(Rule::is_enabled)
    }

    /// Enable a rule. Returns whether it existed.
    pub fn enable(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    /// Disable a rule without removing it. Returns whether it existed.
    pub fn disable(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.write().get_mut(name) {
            Some(rule) => {
                rule.set_enabled(enabled);
                debug!(rule = %name, enabled, "Toggled rule");
                true
            }
            None => false,
        }
    }

    /// Enabled rules whose filename glob and path regex match, sorted by
    /// ascending priority.
    pub fn find_matching_rules(&self, filename: &str, filepath: &str) -> Vec<Rule> {
        self.collect_sorted(|rule| rule.matches(filename, filepath))
    }

    /// Rule counts, plus histograms by priority and by tag.
    pub fn statistics(&self) -> RegistryStats {
        let rules = self.read();
        let mut stats = RegistryStats {
            total: rules.len(),
            ..RegistryStats::default()
        };
        for rule in rules.values() {
            if rule.is_enabled() {
                stats.enabled += 1;
            } else {
                stats.disabled += 1;
            }
            *stats.by_priority.entry(rule.priority()).or_default() += 1;
            for tag in rule.tags() {
                *stats.by_tag.entry(tag.clone()).or_default() += 1;
            }
        }
        stats
    }

    fn collect_sorted(&self, keep: impl Fn(&Rule) -> bool) -> Vec<Rule> {
        let mut out: Vec<Rule> = self
            .read()
            .values()
            .filter(|rule| keep(*rule))
            .cloned()
            .collect();
        out.sort_by_key(Rule::priority);
        out
    }
}

impl Clone for RuleRegistry {
    /// Deep-copy every rule into a new, independent registry.
    fn clone(&self) -> Self {
        Self {
            rules: RwLock::new(self.read().clone()),
        }
    }
}
