//! Validator command configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::validator::ValidatorKind;

/// Placeholder replaced by the unit's test file in command templates.
pub const TEST_FILE_PLACEHOLDER: &str = "{test_file}";

/// Per-kind timeouts in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorTimeouts {
    pub unit_test: u64,
    pub build: u64,
    pub end_to_end: u64,
    pub performance_accessibility: u64,
    pub prepare: u64,
}

impl Default for ValidatorTimeouts {
    fn default() -> Self {
        Self {
            unit_test: 120,
            build: 300,
            end_to_end: 600,
            performance_accessibility: 300,
            prepare: 900,
        }
    }
}

impl ValidatorTimeouts {
    pub fn for_kind(&self, kind: ValidatorKind) -> u64 {
        match kind {
            ValidatorKind::UnitTest => self.unit_test,
            ValidatorKind::Build => self.build,
            ValidatorKind::EndToEnd => self.end_to_end,
            ValidatorKind::PerformanceAccessibility => self.performance_accessibility,
        }
    }
}

/// Mapping from validator kind to shell command.
///
/// An unset or empty command disables that kind; it then passes as skipped.
///
/// ```toml
/// [validators]
/// unit_test = "npm test -- {test_file}"
/// build = "npm run build"
/// performance_accessibility = "npm run audit"
///
/// [validators.timeouts]
/// end_to_end = 900
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub unit_test: Option<String>,
    pub build: Option<String>,
    pub end_to_end: Option<String>,
    pub performance_accessibility: Option<String>,
    /// Dependency install run once after scaffolding
    pub prepare: Option<String>,
    pub timeouts: ValidatorTimeouts,
    /// Extra environment for every command
    pub env: HashMap<String, String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            unit_test: Some(format!("npm test -- {}", TEST_FILE_PLACEHOLDER)),
            build: Some("npm run build".to_string()),
            end_to_end: Some("npx playwright test --reporter=line".to_string()),
            performance_accessibility: None,
            prepare: Some("npm install --force".to_string()),
            timeouts: ValidatorTimeouts::default(),
            env: HashMap::from([("CI".to_string(), "true".to_string())]),
        }
    }
}

impl ValidatorConfig {
    /// Configuration with every kind disabled.
    pub fn empty() -> Self {
        Self {
            unit_test: None,
            build: None,
            end_to_end: None,
            performance_accessibility: None,
            prepare: None,
            timeouts: ValidatorTimeouts::default(),
            env: HashMap::new(),
        }
    }

    /// Command template for a kind, `None` when disabled.
    pub fn command_for(&self, kind: ValidatorKind) -> Option<&str> {
        let command = match kind {
            ValidatorKind::UnitTest => &self.unit_test,
            ValidatorKind::Build => &self.build,
            ValidatorKind::EndToEnd => &self.end_to_end,
            ValidatorKind::PerformanceAccessibility => &self.performance_accessibility,
        };
        command.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn prepare_command(&self) -> Option<&str> {
        self.prepare.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn with_command(mut self, kind: ValidatorKind, command: impl Into<String>) -> Self {
        let command = Some(command.into());
        match kind {
            ValidatorKind::UnitTest => self.unit_test = command,
            ValidatorKind::Build => self.build = command,
            ValidatorKind::EndToEnd => self.end_to_end = command,
            ValidatorKind::PerformanceAccessibility => self.performance_accessibility = command,
        }
        self
    }

    pub fn with_timeout(mut self, kind: ValidatorKind, seconds: u64) -> Self {
        match kind {
            ValidatorKind::UnitTest => self.timeouts.unit_test = seconds,
            ValidatorKind::Build => self.timeouts.build = seconds,
            ValidatorKind::EndToEnd => self.timeouts.end_to_end = seconds,
            ValidatorKind::PerformanceAccessibility => {
                self.timeouts.performance_accessibility = seconds
            }
        }
        self
    }

    pub fn with_prepare(mut self, command: impl Into<String>) -> Self {
        self.prepare = Some(command.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Render a command template for a target's test file.
    ///
    /// Without a test file the placeholder is dropped and the whole suite runs.
    pub fn render(template: &str, test_file: Option<&str>) -> String {
        template
            .replace(TEST_FILE_PLACEHOLDER, test_file.unwrap_or(""))
            .trim()
            .trim_end_matches("--")
            .trim()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_node_toolchain() {
        let config = ValidatorConfig::default();
        assert_eq!(
            config.command_for(ValidatorKind::Build),
            Some("npm run build")
        );
        assert!(config
            .command_for(ValidatorKind::PerformanceAccessibility)
            .is_none());
        assert_eq!(config.prepare_command(), Some("npm install --force"));
    }

    #[test]
    fn test_empty_command_disables_kind() {
        let config = ValidatorConfig::default().with_command(ValidatorKind::EndToEnd, "  ");
        assert!(config.command_for(ValidatorKind::EndToEnd).is_none());
    }

    #[test]
    fn test_render_placeholder() {
        assert_eq!(
            ValidatorConfig::render("npm test -- {test_file}", Some("src/Hero.test.tsx")),
            "npm test -- src/Hero.test.tsx"
        );
        assert_eq!(
            ValidatorConfig::render("npm test -- {test_file}", None),
            "npm test"
        );
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: ValidatorConfig = serde_json::from_str(
            r#"{"build": "pnpm build", "timeouts": {"build": 42}}"#,
        )
        .unwrap();
        assert_eq!(config.command_for(ValidatorKind::Build), Some("pnpm build"));
        assert_eq!(config.timeouts.for_kind(ValidatorKind::Build), 42);
        assert_eq!(config.timeouts.unit_test, 120);
        assert!(config.command_for(ValidatorKind::UnitTest).is_some());
    }
}
