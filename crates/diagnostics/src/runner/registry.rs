use crate::core::Rule;
use crate::symptom::SymptomCategory;
use std::collections::HashMap;
use std::sync::Arc;

pub struct RuleRegistry {
    rules: HashMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn register<R: Rule + 'static>(&mut self, rule: R) {
        let id = rule.id().to_string();
        self.rules.insert(id, Arc::new(rule));
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Rule>> {
        self.rules.get(id).cloned()
    }

    pub fn all(&self) -> Vec<Arc<dyn Rule>> {
        self.rules.values().cloned().collect()
    }

    /// Active rule set for a resolved symptom category. `None` selects
    /// the whole catalog.
    pub fn for_category(&self, category: Option<SymptomCategory>) -> Vec<Arc<dyn Rule>> {
        self.rules
            .values()
            .filter(|r| r.applies_to(category))
            .cloned()
            .collect()
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.rules.keys().cloned().collect()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
