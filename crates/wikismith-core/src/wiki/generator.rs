//! Wiki generation orchestrator
//!
//! Plans a wiki structure with one chat call, then writes every page with
//! bounded concurrency. A page that fails is reported in the run's failure
//! list; its siblings keep going unless `fail_fast` is set or the error is
//! fatal for the whole run.

use super::extract::parse_model_response;
use super::forest::WikiForest;
use super::progress::{NoOpProgressTracker, ProgressTracker};
use super::prompts::{page_messages, structure_messages, PagePrompt};
use super::retriever::DocumentRetriever;
use super::structure::{Importance, WikiStructure};
use crate::error::{Result, WikismithError};
use crate::llm::{ChatOptions, ChatProvider};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Concurrency used when none is configured
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// Retrieved excerpts per page when none is configured
pub const DEFAULT_MAX_RETRIEVED_DOCUMENTS: usize = 10;

/// Format requested for page content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

/// Generation run options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    pub project_name: String,
    pub project_path: String,
    /// Target language for generated prose
    pub language: String,
    pub output_format: OutputFormat,
    /// Pages generated in parallel; 0 means the default
    pub max_concurrency: usize,
    pub max_retrieved_documents: usize,
    /// Abort the run on the first page failure
    pub fail_fast: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            project_path: String::new(),
            language: "en".to_string(),
            output_format: OutputFormat::Markdown,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_retrieved_documents: DEFAULT_MAX_RETRIEVED_DOCUMENTS,
            fail_fast: false,
        }
    }
}

impl GenerationOptions {
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    pub fn effective_concurrency(&self) -> usize {
        if self.max_concurrency > 0 {
            self.max_concurrency
        } else {
            DEFAULT_MAX_CONCURRENCY
        }
    }
}

/// Counters for a run; combine is commutative and associative
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub files_processed: usize,
    pub pages_generated: usize,
    pub tokens_used: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl GenerationStats {
    /// Merge another worker's stats; timestamps widen to cover both
    pub fn add(&mut self, other: &GenerationStats) {
        self.files_processed += other.files_processed;
        self.pages_generated += other.pages_generated;
        self.tokens_used += other.tokens_used;
        self.started_at = match (self.started_at, other.started_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.finished_at = match (self.finished_at, other.finished_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    pub fn combine(mut self, other: &GenerationStats) -> Self {
        self.add(other);
        self
    }

    /// Elapsed time; zero when either end is unset
    pub fn duration(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }
}

/// Already-resolved project inputs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub name: String,
    pub path: String,
    pub readme: Option<String>,
    /// Textual file tree summary
    pub file_tree: String,
}

impl ProjectContext {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_readme(mut self, readme: impl Into<String>) -> Self {
        self.readme = Some(readme.into());
        self
    }

    pub fn with_file_tree(mut self, file_tree: impl Into<String>) -> Self {
        self.file_tree = file_tree.into();
        self
    }
}

/// Generated page content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiPage {
    pub id: String,
    pub title: String,
    pub content: String,
    pub importance: Importance,
    pub parent_id: Option<String>,
    /// Paths of excerpts the page was written from
    pub source_files: Vec<String>,
    pub related_pages: Vec<String>,
}

/// A page that could not be generated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageFailure {
    pub page_id: String,
    pub title: String,
    pub error: String,
}

/// Outcome of a run: partial results plus the pages that failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub structure: WikiStructure,
    /// Generated pages, parents before children
    pub pages: Vec<WikiPage>,
    pub failures: Vec<PageFailure>,
    pub stats: GenerationStats,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives structure planning and page generation
pub struct WikiGenerator {
    chat: Arc<dyn ChatProvider>,
    retriever: Arc<dyn DocumentRetriever>,
    options: GenerationOptions,
    progress: Arc<dyn ProgressTracker>,
    cancel: CancellationToken,
}

impl WikiGenerator {
    pub fn new(
        chat: Arc<dyn ChatProvider>,
        retriever: Arc<dyn DocumentRetriever>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            chat,
            retriever,
            options,
            progress: Arc::new(NoOpProgressTracker),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    /// Cancelling the token stops pending pages and in-flight requests
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    /// Plan and validate the wiki structure for a project
    pub async fn determine_structure(&self, project: &ProjectContext) -> Result<WikiStructure> {
        let (structure, _) = self.plan_structure(project).await?;
        Ok(structure)
    }

    /// Plan the structure, then write every page
    pub async fn generate(&self, project: &ProjectContext) -> Result<GenerationReport> {
        let started_at = Utc::now();
        let (structure, tokens) = self.plan_structure(project).await?;

        let initial = GenerationStats {
            tokens_used: tokens,
            started_at: Some(started_at),
            ..GenerationStats::default()
        };
        self.run_pages(project, structure, initial).await
    }

    /// Write every page of an already validated structure
    pub async fn generate_pages(
        &self,
        project: &ProjectContext,
        structure: &WikiStructure,
    ) -> Result<GenerationReport> {
        let initial = GenerationStats {
            started_at: Some(Utc::now()),
            ..GenerationStats::default()
        };
        self.run_pages(project, structure.clone(), initial).await
    }

    async fn plan_structure(&self, project: &ProjectContext) -> Result<(WikiStructure, u64)> {
        self.progress.start_task("Planning wiki structure", 1);

        let messages = structure_messages(project, &self.options);
        let result = match self.chat.complete(&messages, &self.chat_options()).await {
            Ok(result) => result,
            Err(e) => {
                self.progress.set_error(&e);
                return Err(e);
            }
        };

        let structure = match parse_model_response(result.content()) {
            Ok(structure) => structure,
            Err(e) => {
                tracing::warn!(
                    provider = %self.chat.provider_name(),
                    error = %e,
                    "Model returned an unusable wiki structure"
                );
                self.progress.set_error(&e);
                return Err(e);
            }
        };

        tracing::info!(
            provider = %self.chat.provider_name(),
            wiki_id = %structure.id,
            pages = structure.pages.len(),
            "Planned wiki structure"
        );
        self.progress
            .complete_task(&format!("{} pages planned", structure.pages.len()));
        Ok((structure, result.usage.total_tokens))
    }

    async fn run_pages(
        &self,
        project: &ProjectContext,
        structure: WikiStructure,
        mut stats: GenerationStats,
    ) -> Result<GenerationReport> {
        let forest = WikiForest::build(&structure)?;
        let total = forest.len();
        let concurrency = self.options.effective_concurrency();

        tracing::info!(
            provider = %self.chat.provider_name(),
            pages = total,
            concurrency,
            "Generating pages"
        );
        self.progress.start_task("Generating pages", total);

        let structure_ref = &structure;
        let forest_ref = &forest;
        let mut outcomes = stream::iter(forest.order().iter().copied().enumerate())
            .map(|(position, idx)| async move {
                let result = self.generate_page(project, structure_ref, forest_ref, idx).await;
                (position, idx, result)
            })
            .buffer_unordered(concurrency);

        let mut pages = Vec::with_capacity(total);
        let mut failures = Vec::new();
        let mut completed = 0;

        while let Some((position, idx, result)) = outcomes.next().await {
            let request = &structure.pages[idx];
            completed += 1;

            match result {
                Ok((page, page_stats)) => {
                    tracing::info!(
                        provider = %self.chat.provider_name(),
                        page_id = %page.id,
                        tokens = page_stats.tokens_used,
                        "Page generated"
                    );
                    stats.add(&page_stats);
                    self.progress.update_progress(completed, &page.title);
                    pages.push((position, page));
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %self.chat.provider_name(),
                        page_id = %request.id,
                        error = %e,
                        "Page generation failed"
                    );
                    self.progress.set_error(&e);

                    if self.options.fail_fast || e.is_fatal() {
                        // Dropping the stream cancels in-flight pages
                        return Err(WikismithError::PageGeneration {
                            page_id: request.id.clone(),
                            source: Box::new(e),
                        });
                    }

                    failures.push((
                        position,
                        PageFailure {
                            page_id: request.id.clone(),
                            title: request.title.clone(),
                            error: e.to_string(),
                        },
                    ));
                    self.progress.update_progress(completed, &request.title);
                }
            }
        }
        drop(outcomes);

        pages.sort_by_key(|(position, _)| *position);
        failures.sort_by_key(|(position, _)| *position);
        stats.finished_at = Some(Utc::now());

        self.progress.complete_task(&format!(
            "{} pages generated, {} failed",
            pages.len(),
            failures.len()
        ));

        Ok(GenerationReport {
            structure,
            pages: pages.into_iter().map(|(_, page)| page).collect(),
            failures: failures.into_iter().map(|(_, failure)| failure).collect(),
            stats,
        })
    }

    async fn generate_page(
        &self,
        project: &ProjectContext,
        structure: &WikiStructure,
        forest: &WikiForest,
        idx: usize,
    ) -> Result<(WikiPage, GenerationStats)> {
        if self.cancel.is_cancelled() {
            return Err(WikismithError::Cancelled("generator".to_string()));
        }

        let request = &structure.pages[idx];
        tracing::debug!(
            provider = %self.chat.provider_name(),
            page_id = %request.id,
            "Generating page"
        );

        let query = format!("{} {}", request.title, request.description);
        let documents = self
            .retriever
            .retrieve_relevant_documents(query.trim(), self.options.max_retrieved_documents)
            .await?;

        let parent = forest.parent(idx).and_then(|p| structure.pages.get(p));
        let prompt = PagePrompt {
            project,
            structure,
            page: request,
            parent,
            documents: &documents,
            include_project_overview: forest.primary_root() == Some(idx),
        };
        let messages = page_messages(&prompt, &self.options);

        let result = self.chat.complete(&messages, &self.chat_options()).await?;
        let content = result.content().trim();
        if content.is_empty() {
            return Err(WikismithError::Decode {
                provider: self.chat.provider_name().to_string(),
                message: format!("empty content for page '{}'", request.id),
            });
        }

        let source_files: Vec<String> = documents
            .iter()
            .map(|d| d.path.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let stats = GenerationStats {
            files_processed: source_files.len(),
            pages_generated: 1,
            tokens_used: result.usage.total_tokens,
            ..GenerationStats::default()
        };

        let page = WikiPage {
            id: request.id.clone(),
            title: request.title.clone(),
            content: content.to_string(),
            importance: request.importance,
            parent_id: request.parent().map(str::to_string),
            source_files,
            related_pages: request.related_pages.clone(),
        };

        Ok((page, stats))
    }

    fn chat_options(&self) -> ChatOptions {
        ChatOptions::default().with_cancel(self.cancel.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(secs, 0).single()
    }

    fn stats(files: usize, pages: usize, tokens: u64) -> GenerationStats {
        GenerationStats {
            files_processed: files,
            pages_generated: pages,
            tokens_used: tokens,
            ..GenerationStats::default()
        }
    }

    #[test]
    fn test_stats_combine_commutative_and_associative() {
        let a = stats(1, 2, 30);
        let b = stats(4, 5, 60);
        let c = GenerationStats {
            started_at: at(100),
            finished_at: at(160),
            ..stats(7, 8, 90)
        };

        assert_eq!(a.clone().combine(&b), b.clone().combine(&a));
        assert_eq!(
            a.clone().combine(&b).combine(&c),
            a.clone().combine(&b.clone().combine(&c))
        );

        let total = a.combine(&b).combine(&c);
        assert_eq!(total.files_processed, 12);
        assert_eq!(total.pages_generated, 15);
        assert_eq!(total.tokens_used, 180);
    }

    #[test]
    fn test_stats_timestamps_widen() {
        let early = GenerationStats {
            started_at: at(10),
            finished_at: at(20),
            ..GenerationStats::default()
        };
        let late = GenerationStats {
            started_at: at(15),
            finished_at: at(40),
            ..GenerationStats::default()
        };
        let merged = late.combine(&early);
        assert_eq!(merged.started_at, at(10));
        assert_eq!(merged.finished_at, at(40));
        assert_eq!(merged.duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_duration_unset_end_is_zero() {
        let running = GenerationStats {
            started_at: at(10),
            ..GenerationStats::default()
        };
        assert_eq!(running.duration(), Duration::ZERO);
        assert_eq!(GenerationStats::default().duration(), Duration::ZERO);
    }

    #[test]
    fn test_effective_concurrency() {
        assert_eq!(GenerationOptions::default().effective_concurrency(), 3);
        assert_eq!(
            GenerationOptions::default()
                .with_max_concurrency(0)
                .effective_concurrency(),
            DEFAULT_MAX_CONCURRENCY
        );
        assert_eq!(
            GenerationOptions::default()
                .with_max_concurrency(8)
                .effective_concurrency(),
            8
        );
    }

    #[test]
    fn test_options_yaml_defaults() {
        let options: GenerationOptions =
            serde_yaml::from_str("output_format: json\nfail_fast: true\n").unwrap();
        assert_eq!(options.output_format, OutputFormat::Json);
        assert!(options.fail_fast);
        assert_eq!(options.language, "en");
        assert_eq!(options.max_retrieved_documents, 10);
    }
}
