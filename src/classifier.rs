// 🔎 Classifier - Category + entity assignment
// Two independent pattern tables evaluated against the same description

use crate::error::RuleError;
use crate::rules::{PatternTable, RulesConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub entity: String,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    categories: PatternTable,
    entities: PatternTable,
}

impl Classifier {
    pub fn new(categories: PatternTable, entities: PatternTable) -> Self {
        Classifier {
            categories,
            entities,
        }
    }

    pub fn from_config(config: RulesConfig) -> Result<Self, RuleError> {
        Ok(Classifier {
            categories: PatternTable::from_config("categories", config.categories)?,
            entities: PatternTable::from_config("entities", config.entities)?,
        })
    }

    /// Classifier built from the embedded default tables.
    pub fn with_defaults() -> Result<Self> {
        let config = RulesConfig::defaults()?;
        Ok(Self::from_config(config)?)
    }

    pub fn classify(&self, description: &str) -> Classification {
        Classification {
            category: self.category_of(description).to_string(),
            entity: self.entity_of(description).to_string(),
        }
    }

    pub fn category_of(&self, description: &str) -> &str {
        self.categories.classify(description)
    }

    pub fn entity_of(&self, description: &str) -> &str {
        self.entities.classify(description)
    }

    pub fn categories(&self) -> &PatternTable {
        &self.categories
    }

    pub fn entities(&self) -> &PatternTable {
        &self.entities
    }
}

// ============================================================================
// TESTS
// ============================================================================
