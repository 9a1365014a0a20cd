//! Prompt construction for structure planning and page writing

use super::generator::{GenerationOptions, OutputFormat, ProjectContext};
use super::retriever::RetrievedDocument;
use super::structure::{WikiPageRequest, WikiStructure};
use crate::llm::Message;
use std::fmt::Write;

const STRUCTURE_SYSTEM_PROMPT: &str = "You are a technical writer planning a wiki for a \
software repository. Reply with a single <wiki_structure> block and nothing that must be parsed \
outside it.";

const STRUCTURE_FORMAT: &str = r#"<wiki_structure>
  <title>Wiki title</title>
  <description>One paragraph overview</description>
  <pages>
    <page id="page-overview">
      <title>Page title</title>
      <description>What the page covers</description>
      <importance>high|medium|low</importance>
      <relevant_files>
        <file_path>path/to/file</file_path>
      </relevant_files>
      <related_pages>
        <related>page-other</related>
      </related_pages>
      <parent_id>optional parent page id</parent_id>
    </page>
  </pages>
</wiki_structure>"#;

const PAGE_SYSTEM_PROMPT: &str = "You are a technical writer producing one page of a \
repository wiki. Ground every statement in the supplied source excerpts.";

/// Max characters of a single excerpt placed in a page prompt
const EXCERPT_CHARS: usize = 4000;

/// Messages asking the model to plan the wiki
pub fn structure_messages(project: &ProjectContext, options: &GenerationOptions) -> Vec<Message> {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Plan a wiki for the project \"{}\" located at {}.",
        project.name, project.path
    );
    let _ = writeln!(prompt, "Write titles and descriptions in language: {}.", options.language);

    prompt.push_str("\n<file_tree>\n");
    prompt.push_str(project.file_tree.trim_end());
    prompt.push_str("\n</file_tree>\n");

    if let Some(readme) = project.readme.as_deref().filter(|r| !r.trim().is_empty()) {
        prompt.push_str("\n<readme>\n");
        prompt.push_str(readme.trim_end());
        prompt.push_str("\n</readme>\n");
    }

    prompt.push_str(
        "\nUse unique page ids. A page with a parent_id is a subpage of that page; \
         omit parent_id for top-level pages. Answer in exactly this format:\n\n",
    );
    prompt.push_str(STRUCTURE_FORMAT);

    vec![Message::system(STRUCTURE_SYSTEM_PROMPT), Message::user(prompt)]
}

/// Inputs for one page prompt
pub struct PagePrompt<'a> {
    pub project: &'a ProjectContext,
    pub structure: &'a WikiStructure,
    pub page: &'a WikiPageRequest,
    pub parent: Option<&'a WikiPageRequest>,
    pub documents: &'a [RetrievedDocument],
    /// Whether README and file tree are included
    pub include_project_overview: bool,
}

/// Messages asking the model to write one page
pub fn page_messages(input: &PagePrompt<'_>, options: &GenerationOptions) -> Vec<Message> {
    let page = input.page;
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "Wiki: {} ({})\nPage: {}\nImportance: {}",
        input.structure.title, input.project.name, page.title, page.importance
    );
    if !page.description.is_empty() {
        let _ = writeln!(prompt, "Scope: {}", page.description);
    }
    if let Some(parent) = input.parent {
        let _ = writeln!(
            prompt,
            "This page is a subpage of \"{}\": {}",
            parent.title, parent.description
        );
    }
    if !page.related_pages.is_empty() {
        let _ = writeln!(prompt, "Related pages: {}", page.related_pages.join(", "));
    }

    if input.include_project_overview {
        if let Some(readme) = input.project.readme.as_deref().filter(|r| !r.trim().is_empty()) {
            prompt.push_str("\n<readme>\n");
            prompt.push_str(readme.trim_end());
            prompt.push_str("\n</readme>\n");
        }
        if !input.project.file_tree.trim().is_empty() {
            prompt.push_str("\n<file_tree>\n");
            prompt.push_str(input.project.file_tree.trim_end());
            prompt.push_str("\n</file_tree>\n");
        }
    }

    for doc in input.documents {
        let _ = write!(prompt, "\n<source path=\"{}\">\n", doc.path);
        prompt.push_str(truncate_chars(&doc.content, EXCERPT_CHARS).trim_end());
        prompt.push_str("\n</source>\n");
    }

    let _ = writeln!(prompt, "\nWrite the page in language: {}.", options.language);
    prompt.push_str(match options.output_format {
        OutputFormat::Markdown => {
            "Format the page as Markdown, starting with a level-one heading of the page title."
        }
        OutputFormat::Json => {
            "Format the page as one JSON object with string field \"summary\" and array field \
             \"sections\" of {\"heading\", \"body\"} objects."
        }
    });

    vec![Message::system(PAGE_SYSTEM_PROMPT), Message::user(prompt)]
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    fn project() -> ProjectContext {
        ProjectContext::new("acme", "/src/acme")
            .with_readme("# Acme\nFast widgets.")
            .with_file_tree("src/\n  lib.rs\nREADME.md")
    }

    #[test]
    fn test_structure_prompt_contains_context() {
        let messages = structure_messages(&project(), &GenerationOptions::default());
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        let user = &messages[1].content;
        assert!(user.contains("Fast widgets."));
        assert!(user.contains("src/\n  lib.rs"));
        assert!(user.contains("<wiki_structure>"));
        assert!(user.contains("language: en"));
    }

    #[test]
    fn test_page_prompt_overview_only_when_requested() {
        let structure = WikiStructure::new("Acme", "");
        let page = WikiPageRequest::new("page-setup", "Setup");
        let docs = vec![RetrievedDocument::new("src/lib.rs", "pub fn widget() {}", 0.9)];
        let project = project();

        let mut input = PagePrompt {
            project: &project,
            structure: &structure,
            page: &page,
            parent: None,
            documents: &docs,
            include_project_overview: false,
        };
        let options = GenerationOptions::default();

        let without = page_messages(&input, &options);
        assert!(!without[1].content.contains("Fast widgets."));
        assert!(without[1].content.contains("<source path=\"src/lib.rs\">"));

        input.include_project_overview = true;
        let with = page_messages(&input, &options);
        assert!(with[1].content.contains("Fast widgets."));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
