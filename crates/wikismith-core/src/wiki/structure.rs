//! Wiki structure data model

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref NON_ALNUM_RE: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Editorial priority of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map free-form importance text onto a canonical level; unrecognized is medium
pub fn normalize_importance(raw: &str) -> Importance {
    let value = raw.trim().to_lowercase().replace(['_', ' '], "-");
    match value.as_str() {
        "high" | "critical" | "essential" | "important" | "core" | "required" | "h" => {
            Importance::High
        }
        "low" | "optional" | "nice-to-have" | "minor" | "supplementary" | "l" => Importance::Low,
        _ => Importance::Medium,
    }
}

/// Stable slug id: `<prefix>-<slug>`, or `<prefix>-unnamed` if nothing remains
pub fn generate_id(prefix: &str, text: &str) -> String {
    let lowered = text.to_lowercase();
    let slug = NON_ALNUM_RE.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        format!("{}-unnamed", prefix)
    } else {
        format!("{}-{}", prefix, slug)
    }
}

/// One page requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiPageRequest {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub importance: Importance,
    /// Parent page id; `None` for a root
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Source files the model considers relevant
    #[serde(default)]
    pub relevant_files: Vec<String>,
    /// Ids of related pages
    #[serde(default)]
    pub related_pages: Vec<String>,
}

impl WikiPageRequest {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            importance: Importance::Medium,
            parent_id: None,
            relevant_files: Vec::new(),
            related_pages: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_relevant_files(mut self, files: Vec<String>) -> Self {
        self.relevant_files = files;
        self
    }

    /// Parent id, treating an empty string as none
    pub fn parent(&self) -> Option<&str> {
        self.parent_id.as_deref().filter(|p| !p.is_empty())
    }
}

/// Whole wiki structure, produced once per run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiStructure {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub pages: Vec<WikiPageRequest>,
}

impl WikiStructure {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            id: generate_id("wiki", &title),
            title,
            description: description.into(),
            pages: Vec::new(),
        }
    }

    pub fn with_page(mut self, page: WikiPageRequest) -> Self {
        self.pages.push(page);
        self
    }

    /// Find page by id
    pub fn page(&self, id: &str) -> Option<&WikiPageRequest> {
        self.pages.iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_generate_id() {
        assert_eq!(generate_id("wiki", "My Project"), "wiki-my-project");
        assert_eq!(generate_id("wiki", ""), "wiki-unnamed");
        assert_eq!(generate_id("test", "---"), "test-unnamed");
        assert_eq!(generate_id("page", "  API / Reference!! v2 "), "page-api-reference-v2");
        assert_eq!(generate_id("page", "--Leading and trailing--"), "page-leading-and-trailing");
    }

    #[test]
    fn test_normalize_importance_synonyms() {
        assert_eq!(normalize_importance("HIGH"), Importance::High);
        assert_eq!(normalize_importance("  Critical "), Importance::High);
        assert_eq!(normalize_importance("essential"), Importance::High);
        assert_eq!(normalize_importance("normal"), Importance::Medium);
        assert_eq!(normalize_importance("standard"), Importance::Medium);
        assert_eq!(normalize_importance("Optional"), Importance::Low);
        assert_eq!(normalize_importance("nice-to-have"), Importance::Low);
        assert_eq!(normalize_importance("nice to have"), Importance::Low);
        assert_eq!(normalize_importance(""), Importance::Medium);
        assert_eq!(normalize_importance("banana"), Importance::Medium);
    }

    proptest! {
        #[test]
        fn prop_normalize_importance_idempotent(raw in ".{0,24}") {
            let once = normalize_importance(&raw);
            prop_assert_eq!(normalize_importance(once.as_str()), once);
        }
    }

    #[test]
    fn test_structure_id_from_title() {
        let structure = WikiStructure::new("Acme Engine", "");
        assert_eq!(structure.id, "wiki-acme-engine");
    }

    #[test]
    fn test_empty_parent_is_root() {
        let page = WikiPageRequest::new("a", "A").with_parent("");
        assert_eq!(page.parent(), None);
    }
}
