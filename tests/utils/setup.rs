use std::sync::Arc;
use std::time::Duration;

use tricktable::rules::{RuleSet, StandardRules};
use tricktable::session::PetNameGenerator;
use tricktable::shared::AppState;
use tricktable::TableConfig;

use super::mocks::MockConnectionManager;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub state: AppState,
    pub mock: Arc<MockConnectionManager>,
}

pub struct TestSetupBuilder {
    config: TableConfig,
    rules: Arc<dyn RuleSet>,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            // Long turn timeout by default so tests never race the clock
            config: TableConfig {
                turn_timeout: Duration::from_secs(300),
                ..TableConfig::default()
            },
            rules: Arc::new(StandardRules::new(None)),
        }
    }

    pub fn with_config(mut self, config: TableConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_rules(mut self, rules: Arc<dyn RuleSet>) -> Self {
        self.rules = rules;
        self
    }

    pub fn build(self) -> TestSetup {
        let mock = Arc::new(MockConnectionManager::new());
        let state = AppState::new(
            self.config,
            self.rules,
            mock.clone(),
            Arc::new(PetNameGenerator::new()),
        );
        TestSetup { state, mock }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
