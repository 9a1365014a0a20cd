//! Page forest built from parent links

use super::structure::WikiStructure;
use crate::error::StructureError;
use std::collections::HashMap;
use std::fmt::Write;

/// Parent/child index over the pages of one structure.
///
/// Pages are referred to by their position in `WikiStructure::pages`.
#[derive(Debug, Clone)]
pub struct WikiForest {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    order: Vec<usize>,
    depths: Vec<usize>,
}

impl WikiForest {
    /// Build the forest; a page not reachable from any root sits on a cycle
    pub fn build(structure: &WikiStructure) -> Result<Self, StructureError> {
        let count = structure.pages.len();
        let mut index = HashMap::with_capacity(count);
        for (idx, page) in structure.pages.iter().enumerate() {
            if index.insert(page.id.clone(), idx).is_some() {
                return Err(StructureError::DuplicatePageId(page.id.clone()));
            }
        }

        let mut parents = vec![None; count];
        let mut children = vec![Vec::new(); count];
        let mut roots = Vec::new();

        for (idx, page) in structure.pages.iter().enumerate() {
            match page.parent() {
                None => roots.push(idx),
                Some(parent) => {
                    let parent_idx =
                        *index
                            .get(parent)
                            .ok_or_else(|| StructureError::UnknownParent {
                                id: page.id.clone(),
                                parent: parent.to_string(),
                            })?;
                    parents[idx] = Some(parent_idx);
                    children[parent_idx].push(idx);
                }
            }
        }

        // Depth-first from each root, siblings in input order
        let mut order = Vec::with_capacity(count);
        let mut depths = vec![0; count];
        let mut visited = vec![false; count];
        let mut stack: Vec<(usize, usize)> = roots.iter().rev().map(|&r| (r, 0)).collect();

        while let Some((idx, depth)) = stack.pop() {
            if visited[idx] {
                continue;
            }
            visited[idx] = true;
            depths[idx] = depth;
            order.push(idx);
            stack.extend(children[idx].iter().rev().map(|&c| (c, depth + 1)));
        }

        if let Some(idx) = visited.iter().position(|v| !v) {
            return Err(StructureError::ParentCycle(structure.pages[idx].id.clone()));
        }

        Ok(Self {
            ids: structure.pages.iter().map(|p| p.id.clone()).collect(),
            index,
            parents,
            children,
            roots,
            order,
            depths,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Root pages in input order
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// First root; the page that receives project-wide context
    pub fn primary_root(&self) -> Option<usize> {
        self.roots.first().copied()
    }

    pub fn is_root(&self, idx: usize) -> bool {
        self.parents.get(idx).is_some_and(Option::is_none)
    }

    pub fn children(&self, idx: usize) -> &[usize] {
        self.children.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent(&self, idx: usize) -> Option<usize> {
        self.parents.get(idx).copied().flatten()
    }

    pub fn depth(&self, idx: usize) -> usize {
        self.depths.get(idx).copied().unwrap_or_default()
    }

    /// Every page, parents before their children
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id(&self, idx: usize) -> Option<&str> {
        self.ids.get(idx).map(String::as_str)
    }

    /// Indented outline, one page per line
    pub fn outline(&self, structure: &WikiStructure) -> String {
        let mut out = String::new();
        for &idx in &self.order {
            let Some(page) = structure.pages.get(idx) else {
                continue;
            };
            let _ = writeln!(
                out,
                "{}- {} ({}) [{}]",
                "  ".repeat(self.depth(idx)),
                page.title,
                page.id,
                page.importance
            );
        }
        out
    }
}
