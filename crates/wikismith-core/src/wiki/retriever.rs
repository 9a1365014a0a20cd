//! Document retrieval capability consumed by the generator

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source excerpt returned by a retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub path: String,
    pub content: String,
    pub score: f32,
}

impl RetrievedDocument {
    pub fn new(path: impl Into<String>, content: impl Into<String>, score: f32) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            score,
        }
    }
}

/// Top-K retrieval over project sources
#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Most relevant excerpts for a free-text query, best first
    async fn retrieve_relevant_documents(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedDocument>>;

    async fn retrieve_by_tags(&self, tags: &[String], limit: usize) -> Result<Vec<RetrievedDocument>> {
        self.retrieve_relevant_documents(&tags.join(" "), limit).await
    }

    async fn retrieve_examples(&self, topic: &str, limit: usize) -> Result<Vec<RetrievedDocument>> {
        self.retrieve_relevant_documents(&format!("{} example usage", topic), limit)
            .await
    }
}

/// In-memory retriever scoring documents by query term overlap
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    documents: Vec<(String, String)>,
}

impl StaticRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.documents.push((path.into(), content.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentRetriever for StaticRetriever {
    async fn retrieve_relevant_documents(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RetrievedDocument>> {
        let terms: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1)
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<RetrievedDocument> = self
            .documents
            .iter()
            .filter_map(|(path, content)| {
                let haystack = format!("{} {}", path, content).to_lowercase();
                let hits = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                (hits > 0).then(|| {
                    RetrievedDocument::new(path, content, hits as f32 / terms.len() as f32)
                })
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }
}
