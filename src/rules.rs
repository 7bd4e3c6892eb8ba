// 🏷️ Classification Rules - Rules as Data
// Ordered pattern tables: the position of a rule is its precedence

use crate::error::RuleError;
use anyhow::{Context as AnyhowContext, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tables shipped with the crate, in their hand-tuned order.
pub const DEFAULT_RULES_JSON: &str = include_str!("../config/rules.json");

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Regular expression, matched case-insensitively anywhere in the text
    pub pattern: String,

    /// Label assigned when this rule is the first to match
    pub label: String,
}

impl Rule {
    pub fn new(pattern: &str, label: &str) -> Self {
        Rule {
            pattern: pattern.to_string(),
            label: label.to_string(),
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// One table as it appears in the rules file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    pub fallback: String,
    pub rules: Vec<Rule>,
}

/// Both tables as they appear in the rules file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    pub categories: TableConfig,
    pub entities: TableConfig,
}

impl RulesConfig {
    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        Self::from_json_str(&content)
            .with_context(|| format!("Invalid rules file: {:?}", path.as_ref()))
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse rules JSON")
    }

    /// The embedded default tables.
    pub fn defaults() -> Result<Self> {
        Self::from_json_str(DEFAULT_RULES_JSON)
    }
}

// ============================================================================
// PATTERN TABLE
// ============================================================================

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: Rule,
    regex: Regex,
}

/// Ordered list of rules plus a fallback label.
///
/// `classify` always returns exactly one label and depends only on the
/// description and the table.
#[derive(Debug, Clone)]
pub struct PatternTable {
    name: String,
    rules: Vec<CompiledRule>,
    fallback: String,
}

impl PatternTable {
    /// Compile a table, keeping the rules in the given order.
    pub fn new(name: &str, rules: Vec<Rule>, fallback: &str) -> Result<Self, RuleError> {
        if fallback.trim().is_empty() {
            return Err(RuleError::EmptyFallback(name.to_string()));
        }

        let mut compiled = Vec::with_capacity(rules.len());
        for (index, rule) in rules.into_iter().enumerate() {
            if rule.label.trim().is_empty() {
                return Err(RuleError::EmptyLabel {
                    table: name.to_string(),
                    index,
                });
            }

            let regex = RegexBuilder::new(&rule.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| RuleError::InvalidPattern {
                    table: name.to_string(),
                    index,
                    pattern: rule.pattern.clone(),
                    source,
                })?;

            compiled.push(CompiledRule { rule, regex });
        }

        Ok(PatternTable {
            name: name.to_string(),
            rules: compiled,
            fallback: fallback.to_string(),
        })
    }

    pub fn from_config(name: &str, config: TableConfig) -> Result<Self, RuleError> {
        Self::new(name, config.rules, &config.fallback)
    }

    /// Label of the first matching rule, or the fallback.
    pub fn classify(&self, description: &str) -> &str {
        match self.first_match(description) {
            Some((_, rule)) => &rule.label,
            None => &self.fallback,
        }
    }

    /// Position and rule that decide the label, if any rule matches.
    pub fn first_match(&self, description: &str) -> Option<(usize, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, compiled)| compiled.regex.is_match(description))
            .map(|(index, compiled)| (index, &compiled.rule))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Get number of rules loaded
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Rules in precedence order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }
}

// ============================================================================
// TESTS
// ============================================================================
