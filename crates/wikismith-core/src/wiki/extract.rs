//! Recover a `<wiki_structure>` block from free-form model output

use super::structure::{generate_id, normalize_importance, WikiPageRequest, WikiStructure};
use super::validate::validate_structure;
use crate::error::{Result, StructureError, WikismithError};
use lazy_static::lazy_static;
use regex::Regex;

/// Element name wrapping the structure in model output
pub const WIKI_STRUCTURE_TAG: &str = "wiki_structure";

lazy_static! {
    static ref PAGE_RE: Regex = Regex::new(r"(?s)<page(\s[^>]*)?>(.*?)</page\s*>").unwrap();
    static ref PAGE_OPEN_RE: Regex = Regex::new(r"<page(?:\s[^>]*)?>").unwrap();
    static ref TITLE_RE: Regex = Regex::new(r"(?s)<title(?:\s[^>]*)?>(.*?)</title\s*>").unwrap();
    static ref DESCRIPTION_RE: Regex =
        Regex::new(r"(?s)<description(?:\s[^>]*)?>(.*?)</description\s*>").unwrap();
    static ref IMPORTANCE_RE: Regex =
        Regex::new(r"(?s)<importance(?:\s[^>]*)?>(.*?)</importance\s*>").unwrap();
    static ref ID_RE: Regex = Regex::new(r"(?s)<id(?:\s[^>]*)?>(.*?)</id\s*>").unwrap();
    static ref ID_ATTR_RE: Regex =
        Regex::new(r#"(?:^|\s)id\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap();
    static ref PARENT_RE: Regex =
        Regex::new(r"(?s)<(?:parent_id|parent)(?:\s[^>]*)?>(.*?)</(?:parent_id|parent)\s*>")
            .unwrap();
    static ref FILE_PATH_RE: Regex =
        Regex::new(r"(?s)<file_path(?:\s[^>]*)?>(.*?)</file_path\s*>").unwrap();
    static ref RELATED_RE: Regex =
        Regex::new(r"(?s)<related(?:\s[^>]*)?>(.*?)</related\s*>").unwrap();
    static ref CDATA_RE: Regex = Regex::new(r"(?s)^<!\[CDATA\[(.*)\]\]>$").unwrap();
}

/// Locate the first `<tag ...>` and its matching close, returning the block
/// with a bare `<tag>` opening. Self-closing tags are skipped and nested
/// same-name elements are balanced.
pub fn extract_tagged_block(text: &str, tag: &str) -> Result<String> {
    let pattern = format!(r"<(/?){}(?:\s[^>]*?)?(/?)>", regex::escape(tag));
    let tag_re = Regex::new(&pattern)
        .map_err(|e| WikismithError::InvalidInput(format!("bad tag name '{}': {}", tag, e)))?;

    let mut content_start = None;
    let mut depth = 0usize;

    for caps in tag_re.captures_iter(text) {
        let (Some(whole), closing, self_closing) = (
            caps.get(0),
            caps.get(1).is_some_and(|m| !m.as_str().is_empty()),
            caps.get(2).is_some_and(|m| !m.as_str().is_empty()),
        ) else {
            continue;
        };

        if self_closing && !closing {
            continue;
        }

        if !closing {
            if depth == 0 {
                content_start = Some(whole.end());
            }
            depth += 1;
            continue;
        }

        // Stray closing tag before any opening
        let Some(start) = content_start else {
            continue;
        };

        depth -= 1;
        if depth == 0 {
            let inner = &text[start..whole.start()];
            return Ok(format!("<{tag}>{inner}</{tag}>"));
        }
    }

    Err(WikismithError::NoStructuredBlockFound(tag.to_string()))
}

/// Parse a structure block. Missing elements become empty values; structural
/// checks are left to [`validate_structure`].
pub fn parse_wiki_structure(block: &str) -> Result<WikiStructure> {
    let body = match extract_tagged_block(block, WIKI_STRUCTURE_TAG) {
        Ok(wrapped) => strip_outer(&wrapped, WIKI_STRUCTURE_TAG).to_string(),
        Err(_) => block.to_string(),
    };

    let opened = PAGE_OPEN_RE.find_iter(&body).count();
    let mut pages = Vec::with_capacity(opened);
    for caps in PAGE_RE.captures_iter(&body) {
        let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let inner = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        pages.push(parse_page(attrs, inner));
    }

    if pages.len() != opened {
        return Err(StructureError::Malformed(format!(
            "{} <page> element(s) opened but {} closed",
            opened,
            pages.len()
        ))
        .into());
    }

    // Page bodies carry their own title/description
    let top_level = PAGE_RE.replace_all(&body, "");
    let title = first_text(&TITLE_RE, &top_level);

    Ok(WikiStructure {
        id: generate_id("wiki", &title),
        title,
        description: first_text(&DESCRIPTION_RE, &top_level),
        pages,
    })
}

/// Extract, parse and validate a model response in one step
pub fn parse_model_response(text: &str) -> Result<WikiStructure> {
    let block = extract_tagged_block(text, WIKI_STRUCTURE_TAG)?;
    let structure = parse_wiki_structure(&block)?;
    validate_structure(&structure)?;

    tracing::debug!(
        wiki_id = %structure.id,
        pages = structure.pages.len(),
        "Parsed wiki structure"
    );
    Ok(structure)
}

fn parse_page(attrs: &str, inner: &str) -> WikiPageRequest {
    let title = first_text(&TITLE_RE, inner);

    let id = ID_ATTR_RE
        .captures(attrs)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| clean_text(m.as_str()))
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| first_text(&ID_RE, inner));
    let id = if id.is_empty() {
        generate_id("page", &title)
    } else {
        id
    };

    let parent = first_text(&PARENT_RE, inner);

    WikiPageRequest {
        id,
        description: first_text(&DESCRIPTION_RE, inner),
        importance: normalize_importance(&first_text(&IMPORTANCE_RE, inner)),
        parent_id: (!parent.is_empty()).then_some(parent),
        relevant_files: all_text(&FILE_PATH_RE, inner),
        related_pages: all_text(&RELATED_RE, inner),
        title,
    }
}

fn strip_outer<'a>(block: &'a str, tag: &str) -> &'a str {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    block
        .strip_prefix(open.as_str())
        .and_then(|rest| rest.strip_suffix(close.as_str()))
        .unwrap_or(block)
}

fn first_text(re: &Regex, src: &str) -> String {
    re.captures(src)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .unwrap_or_default()
}

fn all_text(re: &Regex, src: &str) -> Vec<String> {
    re.captures_iter(src)
        .filter_map(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|s| !s.is_empty())
        .collect()
}

fn clean_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(caps) = CDATA_RE.captures(trimmed) {
        return caps
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
    }
    unescape(trimmed)
}

fn unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    // &amp; last so "&amp;lt;" stays "&lt;"
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wiki::structure::Importance;

    const RESPONSE: &str = r#"Sure! Here is the plan for the wiki.

<wiki_structure version="2" lang="en">
  <title>Acme Engine</title>
  <description>Docs for the Acme &amp; Co engine</description>
  <pages>
    <page id="overview">
      <title>Overview</title>
      <description>What Acme does</description>
      <importance>Critical</importance>
      <relevant_files>
        <file_path>README.md</file_path>
        <file_path>src/lib.rs</file_path>
      </relevant_files>
      <related_pages>
        <related>architecture</related>
      </related_pages>
    </page>
    <page>
      <id>architecture</id>
      <title>Architecture</title>
      <description>How the parts fit</description>
      <importance>nice to have</importance>
      <parent_id>overview</parent_id>
    </page>
  </pages>
</wiki_structure>

Let me know if you want changes."#;

    #[test]
    fn test_extract_discards_attributes() {
        let with_attrs = extract_tagged_block("x <wiki_structure a=\"1\">body</wiki_structure> y", "wiki_structure").unwrap();
        let bare = extract_tagged_block("<wiki_structure>body</wiki_structure>", "wiki_structure").unwrap();
        assert_eq!(with_attrs, bare);
        assert_eq!(bare, "<wiki_structure>body</wiki_structure>");
    }

    #[test]
    fn test_extract_balances_nested_tags() {
        let text = "<note>outer<note>inner</note>tail</note><note>second</note>";
        assert_eq!(
            extract_tagged_block(text, "note").unwrap(),
            "<note>outer<note>inner</note>tail</note>"
        );
    }

    #[test]
    fn test_extract_skips_self_closing_and_prefix_names() {
        let text = "<wiki_structure/><wiki_structures>no</wiki_structures><wiki_structure>\nyes\n</wiki_structure>";
        assert_eq!(
            extract_tagged_block(text, "wiki_structure").unwrap(),
            "<wiki_structure>\nyes\n</wiki_structure>"
        );
    }

    #[test]
    fn test_extract_missing_block() {
        let err = extract_tagged_block("no xml here", WIKI_STRUCTURE_TAG).unwrap_err();
        assert!(matches!(err, WikismithError::NoStructuredBlockFound(tag) if tag == "wiki_structure"));

        let err = extract_tagged_block("<wiki_structure>never closed", WIKI_STRUCTURE_TAG).unwrap_err();
        assert!(matches!(err, WikismithError::NoStructuredBlockFound(_)));
    }

    #[test]
    fn test_parse_model_response() {
        let structure = parse_model_response(RESPONSE).unwrap();
        assert_eq!(structure.id, "wiki-acme-engine");
        assert_eq!(structure.title, "Acme Engine");
        assert_eq!(structure.description, "Docs for the Acme & Co engine");
        assert_eq!(structure.pages.len(), 2);

        let overview = &structure.pages[0];
        assert_eq!(overview.id, "overview");
        assert_eq!(overview.importance, Importance::High);
        assert_eq!(overview.relevant_files, vec!["README.md", "src/lib.rs"]);
        assert_eq!(overview.related_pages, vec!["architecture"]);
        assert_eq!(overview.parent(), None);

        let architecture = &structure.pages[1];
        assert_eq!(architecture.id, "architecture");
        assert_eq!(architecture.importance, Importance::Low);
        assert_eq!(architecture.parent(), Some("overview"));
    }

    #[test]
    fn test_missing_elements_are_empty() {
        let structure =
            parse_wiki_structure("<wiki_structure><pages><page><title>Getting Started</title></page></pages></wiki_structure>")
                .unwrap();
        assert_eq!(structure.title, "");
        assert_eq!(structure.id, "wiki-unnamed");
        let page = &structure.pages[0];
        assert_eq!(page.id, "page-getting-started");
        assert_eq!(page.description, "");
        assert_eq!(page.importance, Importance::Medium);
        assert!(page.relevant_files.is_empty());
    }

    #[test]
    fn test_cdata_and_entities() {
        let structure = parse_wiki_structure(
            "<wiki_structure><title><![CDATA[A <b> & B]]></title><pages><page id='p'><title>x &lt; y</title></page></pages></wiki_structure>",
        )
        .unwrap();
        assert_eq!(structure.title, "A <b> & B");
        assert_eq!(structure.pages[0].id, "p");
        assert_eq!(structure.pages[0].title, "x < y");
    }

    #[test]
    fn test_id_attribute_ignores_prefixed_names() {
        let structure = parse_wiki_structure(
            "<wiki_structure><title>T</title><pages><page data-id=\"x\" id=\"overview\"><title>Overview</title></page><page data-id=\"y\"><title>Usage</title></page></pages></wiki_structure>",
        )
        .unwrap();
        assert_eq!(structure.pages[0].id, "overview");
        assert_eq!(structure.pages[1].id, "page-usage");
    }

    #[test]
    fn test_unclosed_page_is_malformed() {
        let err = parse_wiki_structure(
            "<wiki_structure><title>T</title><pages><page id=\"a\"><title>A</title></pages></wiki_structure>",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            WikismithError::Structure(StructureError::Malformed(_))
        ));
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let err = parse_model_response(
            "<wiki_structure><title>T</title><pages></pages></wiki_structure>",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            WikismithError::Structure(StructureError::NoPages)
        ));
    }
}
