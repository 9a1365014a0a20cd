//! Structural validation of a parsed wiki structure

use super::forest::WikiForest;
use super::structure::WikiStructure;
use crate::error::StructureError;
use std::collections::HashSet;

/// Check every structural rule, returning the first violation found.
///
/// Order of checks: title, page count, per-page id and title, duplicate ids,
/// parent references, then parent cycles.
pub fn validate_structure(structure: &WikiStructure) -> Result<(), StructureError> {
    if structure.title.trim().is_empty() {
        return Err(StructureError::EmptyTitle);
    }

    if structure.pages.is_empty() {
        return Err(StructureError::NoPages);
    }

    for (idx, page) in structure.pages.iter().enumerate() {
        if page.id.trim().is_empty() {
            return Err(StructureError::MissingPageId(idx));
        }
        if page.title.trim().is_empty() {
            return Err(StructureError::MissingPageTitle(page.id.clone()));
        }
    }

    let mut seen = HashSet::with_capacity(structure.pages.len());
    for page in &structure.pages {
        if !seen.insert(page.id.as_str()) {
            return Err(StructureError::DuplicatePageId(page.id.clone()));
        }
    }

    for page in &structure.pages {
        if let Some(parent) = page.parent() {
            if !seen.contains(parent) {
                return Err(StructureError::UnknownParent {
                    id: page.id.clone(),
                    parent: parent.to_string(),
                });
            }
        }
    }

    WikiForest::build(structure).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::structure::WikiPageRequest;

    fn root_and_child() -> WikiStructure {
        WikiStructure::new("Project", "")
            .with_page(WikiPageRequest::new("root", "Root"))
            .with_page(WikiPageRequest::new("child", "Child").with_parent("root"))
    }

    #[test]
    fn test_accepts_root_and_child() {
        assert_eq!(validate_structure(&root_and_child()), Ok(()));
    }

    #[test]
    fn test_rejects_empty_title() {
        let mut structure = root_and_child();
        structure.title = "  ".to_string();
        assert_eq!(
            validate_structure(&structure),
            Err(StructureError::EmptyTitle)
        );
    }

    #[test]
    fn test_rejects_zero_pages() {
        let structure = WikiStructure::new("Project", "");
        assert_eq!(validate_structure(&structure), Err(StructureError::NoPages));
    }

    #[test]
    fn test_rejects_missing_id_and_title() {
        let structure = WikiStructure::new("Project", "").with_page(WikiPageRequest::new("", "X"));
        assert_eq!(
            validate_structure(&structure),
            Err(StructureError::MissingPageId(0))
        );

        let structure = WikiStructure::new("Project", "").with_page(WikiPageRequest::new("x", ""));
        assert_eq!(
            validate_structure(&structure),
            Err(StructureError::MissingPageTitle("x".to_string()))
        );
    }

    #[test]
    fn test_rejects_duplicate_id() {
        let structure = root_and_child().with_page(WikiPageRequest::new("child", "Again"));
        assert_eq!(
            validate_structure(&structure),
            Err(StructureError::DuplicatePageId("child".to_string()))
        );
    }

    #[test]
    fn test_duplicate_check_is_case_sensitive() {
        let structure = root_and_child().with_page(WikiPageRequest::new("Child", "Other"));
        assert_eq!(validate_structure(&structure), Ok(()));
    }

    #[test]
    fn test_rejects_unknown_parent() {
        let structure = root_and_child()
            .with_page(WikiPageRequest::new("orphan", "Orphan").with_parent("missing"));
        assert_eq!(
            validate_structure(&structure),
            Err(StructureError::UnknownParent {
                id: "orphan".to_string(),
                parent: "missing".to_string(),
            })
        );
    }

    #[test]
    fn test_rejects_self_reference() {
        let structure = root_and_child().with_page(WikiPageRequest::new("loop", "Loop").with_parent("loop"));
        assert_eq!(
            validate_structure(&structure),
            Err(StructureError::ParentCycle("loop".to_string()))
        );
    }

    #[test]
    fn test_rejects_longer_cycle() {
        let structure = root_and_child()
            .with_page(WikiPageRequest::new("a", "A").with_parent("c"))
            .with_page(WikiPageRequest::new("b", "B").with_parent("a"))
            .with_page(WikiPageRequest::new("c", "C").with_parent("b"));
        assert_eq!(
            validate_structure(&structure),
            Err(StructureError::ParentCycle("a".to_string()))
        );
    }
}
