//! Wiki planning and generation
//!
//! - Extraction of the `<wiki_structure>` block from model output
//! - Structural validation and the page forest
//! - Bounded-concurrency page generation

mod extract;
mod forest;
mod generator;
mod progress;
mod prompts;
mod retriever;
mod structure;
mod validate;

pub use extract::{
    extract_tagged_block, parse_model_response, parse_wiki_structure, WIKI_STRUCTURE_TAG,
};
pub use forest::WikiForest;
pub use generator::{
    GenerationOptions, GenerationReport, GenerationStats, OutputFormat, PageFailure,
    ProjectContext, WikiGenerator, WikiPage, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_MAX_RETRIEVED_DOCUMENTS,
};
pub use progress::{NoOpProgressTracker, ProgressTracker, TracingProgressTracker};
pub use prompts::{page_messages, structure_messages, PagePrompt};
pub use retriever::{DocumentRetriever, RetrievedDocument, StaticRetriever};
pub use structure::{generate_id, normalize_importance, Importance, WikiPageRequest, WikiStructure};
pub use validate::validate_structure;
