//! Checklist models.
//!
//! A checklist is the structured description of a website produced by the
//! prompt converter. The pipeline treats it as read-only input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default primary brand colour when the checklist does not provide one.
pub const DEFAULT_PRIMARY_COLOR: &str = "#000000";

/// Default secondary brand colour when the checklist does not provide one.
pub const DEFAULT_SECONDARY_COLOR: &str = "#FFFFFF";

/// The full website checklist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
    /// Brand identity
    #[serde(default)]
    pub branding: Branding,
    /// Pages in navigation order
    pub pages: Vec<PageSpec>,
}

impl Checklist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_color(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.branding.colors.insert(name.into(), value.into());
        self
    }

    pub fn with_page(mut self, page: PageSpec) -> Self {
        self.pages.push(page);
        self
    }

    /// Distinct component types referenced by any section, in first-seen order.
    pub fn component_types(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for section in self.pages.iter().flat_map(|p| p.sections.iter()) {
            if !seen.contains(&section.component.as_str()) {
                seen.push(section.component.as_str());
            }
        }
        seen
    }

    /// Total number of sections across all pages.
    pub fn section_count(&self) -> usize {
        self.pages.iter().map(|p| p.sections.len()).sum()
    }

    /// Find a page by name (case-insensitive).
    pub fn page(&self, name: &str) -> Option<&PageSpec> {
        self.pages.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Branding information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Branding {
    /// Named colours (`primary`, `secondary`, ...) as CSS hex values
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
}

impl Branding {
    pub fn primary_color(&self) -> &str {
        self.colors
            .get("primary")
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_PRIMARY_COLOR)
    }

    pub fn secondary_color(&self) -> &str {
        self.colors
            .get("secondary")
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_SECONDARY_COLOR)
    }
}

/// A single page of the website.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    /// Human-readable page name ("Home", "Contact")
    pub name: String,
    /// Route path ("/", "/contact")
    pub path: String,
    /// Ordered sections rendered on the page
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

impl PageSpec {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            sections: Vec::new(),
        }
    }

    pub fn section(mut self, section: SectionSpec) -> Self {
        self.sections.push(section);
        self
    }
}

/// A section of a page, rendered by one component type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    /// Component type name ("Hero", "ContactForm")
    pub component: String,
    /// Free-form component properties
    #[serde(default)]
    pub props: BTreeMap<String, serde_json::Value>,
}

impl SectionSpec {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            props: BTreeMap::new(),
        }
    }

    pub fn prop(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }
}
