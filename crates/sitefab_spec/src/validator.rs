//! Checklist validation utilities.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::checklist::Checklist;
use crate::error::{SpecError, SpecResult};

/// Validation result with details.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Convert into an error when invalid.
    pub fn into_result(self) -> SpecResult<()> {
        if self.valid {
            Ok(())
        } else {
            Err(SpecError::ValidationFailed(self.errors.join("; ")))
        }
    }
}

fn hex_color() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid regex"))
}

/// Validator for checklists.
pub struct ChecklistValidator;

impl ChecklistValidator {
    /// Validate a whole checklist.
    pub fn validate(checklist: &Checklist) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.merge(Self::validate_branding(checklist));
        result.merge(Self::validate_pages(checklist));
        result
    }

    /// Validate brand colours.
    pub fn validate_branding(checklist: &Checklist) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (name, value) in &checklist.branding.colors {
            if !hex_color().is_match(value) {
                result.add_error(format!(
                    "Colour '{}' has invalid value '{}' (expected #rgb or #rrggbb)",
                    name, value
                ));
            }
        }

        if !checklist.branding.colors.contains_key("primary") {
            result.add_warning("No primary colour given; the scaffold default will be used");
        }

        result
    }

    /// Validate pages and their sections.
    pub fn validate_pages(checklist: &Checklist) -> ValidationResult {
        let mut result = ValidationResult::new();

        if checklist.pages.is_empty() {
            result.add_error("Checklist must contain at least one page");
            return result;
        }

        let mut names = HashSet::new();
        let mut paths = HashSet::new();

        for (index, page) in checklist.pages.iter().enumerate() {
            let label = if page.name.trim().is_empty() {
                result.add_error(format!("Page #{} has an empty name", index + 1));
                format!("#{}", index + 1)
            } else {
                page.name.clone()
            };

            if !page.name.trim().is_empty() && !names.insert(page.name.to_lowercase()) {
                result.add_error(format!("Duplicate page name '{}'", page.name));
            }

            if !page.path.starts_with('/') {
                result.add_error(format!(
                    "Page '{}' path '{}' must start with '/'",
                    label, page.path
                ));
            } else if !paths.insert(page.path.as_str()) {
                result.add_error(format!("Duplicate page path '{}'", page.path));
            }

            if page.sections.is_empty() {
                result.add_warning(format!("Page '{}' has no sections", label));
            }

            for (position, section) in page.sections.iter().enumerate() {
                if section.component.trim().is_empty() {
                    result.add_error(format!(
                        "Section {} on page '{}' does not name a component",
                        position + 1,
                        label
                    ));
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::{PageSpec, SectionSpec};

    #[test]
    fn test_valid_checklist() {
        let checklist = Checklist::new()
            .with_color("primary", "#6366F1")
            .with_page(PageSpec::new("Home", "/").section(SectionSpec::new("Hero")));
        let result = ChecklistValidator::validate(&checklist);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_empty_checklist_is_invalid() {
        let result = ChecklistValidator::validate(&Checklist::new());
        assert!(!result.valid);
    }

    #[test]
    fn test_bad_colour_and_paths() {
        let checklist = Checklist::new()
            .with_color("primary", "blue")
            .with_page(PageSpec::new("Home", "/").section(SectionSpec::new("Hero")))
            .with_page(PageSpec::new("About", "about").section(SectionSpec::new("Text")))
            .with_page(PageSpec::new("home", "/").section(SectionSpec::new("")));

        let result = ChecklistValidator::validate(&checklist);
        assert!(!result.valid);
        // bad colour, relative path, duplicate name, duplicate path, empty component
        assert_eq!(result.errors.len(), 5, "{:?}", result.errors);
        assert!(result.into_result().is_err());
    }
}
