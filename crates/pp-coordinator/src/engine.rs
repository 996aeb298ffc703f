//! Declarative redirect rule engine boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pp_core::RedirectRule;

use crate::error::PlatformError;

#[async_trait(?Send)]
pub trait RuleEngine {
    /// Ids of every rule currently installed.
    async fn active_rule_ids(&self) -> Result<Vec<u32>, PlatformError>;

    /// Removes `remove_ids` and installs `add_rules` in one platform call.
    /// Best-effort atomic: on failure no partial state may be assumed, and
    /// callers treat the whole rule set as stale until the next full
    /// resynthesis.
    async fn replace(&self, remove_ids: Vec<u32>, add_rules: Vec<RedirectRule>) -> Result<(), PlatformError>;
}

/// In-memory rule engine for tests and the CLI simulator.
#[derive(Debug, Default)]
pub struct MemoryRuleEngine {
    rules: Mutex<Vec<RedirectRule>>,
    fail_next_replace: AtomicBool,
}

impl MemoryRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the installed rules, in installation order.
    pub fn active_rules(&self) -> Vec<RedirectRule> {
        self.rules.lock().map(|rules| rules.clone()).unwrap_or_default()
    }

    /// Makes the next `replace` call fail, leaving the installed rules
    /// untouched.
    pub fn fail_next_replace(&self) {
        self.fail_next_replace.store(true, Ordering::SeqCst);
    }
}

#[async_trait(?Send)]
impl RuleEngine for MemoryRuleEngine {
    async fn active_rule_ids(&self) -> Result<Vec<u32>, PlatformError> {
        let rules = self
            .rules
            .lock()
            .map_err(|_| PlatformError::new("rule engine lock poisoned"))?;
        Ok(rules.iter().map(|rule| rule.id).collect())
    }

    async fn replace(&self, remove_ids: Vec<u32>, add_rules: Vec<RedirectRule>) -> Result<(), PlatformError> {
        if self.fail_next_replace.swap(false, Ordering::SeqCst) {
            return Err(PlatformError::new("rule update rejected"));
        }
        let mut rules = self
            .rules
            .lock()
            .map_err(|_| PlatformError::new("rule engine lock poisoned"))?;
        rules.retain(|rule| !remove_ids.contains(&rule.id));
        rules.extend(add_rules);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pp_core::ResourceKind;

    fn rule(id: u32, tab_id: i32) -> RedirectRule {
        RedirectRule {
            id,
            priority: 1,
            match_pattern: "^x$".to_string(),
            resource_kind: ResourceKind::Script,
            redirect_url: "https://example.test/x.js".to_string(),
            tab_id,
        }
    }

    #[tokio::test]
    async fn replace_retires_and_installs_in_one_step() {
        let engine = MemoryRuleEngine::new();
        engine.replace(vec![], vec![rule(1, 7), rule(2, 7)]).await.unwrap();
        assert_eq!(engine.active_rule_ids().await.unwrap(), vec![1, 2]);

        engine.replace(vec![1, 2], vec![rule(1, 9)]).await.unwrap();
        let rules = engine.active_rules();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].tab_id, 9);
    }

    #[tokio::test]
    async fn forced_failure_leaves_rules_untouched() {
        let engine = MemoryRuleEngine::new();
        engine.replace(vec![], vec![rule(1, 7)]).await.unwrap();

        engine.fail_next_replace();
        assert!(engine.replace(vec![1], vec![]).await.is_err());
        assert_eq!(engine.active_rule_ids().await.unwrap(), vec![1]);

        // Only the next call fails
        engine.replace(vec![1], vec![]).await.unwrap();
        assert!(engine.active_rules().is_empty());
    }
}
