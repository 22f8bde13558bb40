//! Worker-side HTML content extraction: title/description metadata,
//! absolute link resolution and a lightweight markdown rendering of the
//! page's text content.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Structured content pulled out of one fetched page.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    pub markdown: String,
    pub links: Vec<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
}

fn selector(css: &str) -> Selector {
    // Selectors are compile-time constants; a parse failure is a bug.
    Selector::parse(css).expect("invalid static selector")
}

pub fn extract_page(html: &str, base_url: &Url) -> ExtractedPage {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&selector("title"))
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let description = doc
        .select(&selector(r#"meta[name="description"]"#))
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let language = doc
        .select(&selector("html"))
        .next()
        .and_then(|el| el.value().attr("lang"))
        .map(str::to_string);

    let links = collect_links(&doc, base_url);
    let markdown = render_markdown(&doc);

    ExtractedPage {
        markdown,
        links,
        title,
        description,
        language,
    }
}

/// Resolve every anchor href against the page URL, dropping fragments-only
/// and unparseable targets. Preserves document order, de-duplicated.
fn collect_links(doc: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for el in doc.select(&selector("a[href]")) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if href.starts_with('#') || href.is_empty() {
            continue;
        }
        let Ok(resolved) = base_url.join(href) else {
            continue;
        };
        let resolved = resolved.to_string();
        if seen.insert(resolved.clone()) {
            links.push(resolved);
        }
    }
    links
}

/// Minimal HTML-to-markdown pass over block-level elements in document
/// order. Not a faithful converter; enough for text content and headings.
fn render_markdown(doc: &Html) -> String {
    let blocks = selector("h1, h2, h3, h4, h5, h6, p, li, pre, blockquote");
    let mut out = String::new();
    for el in doc.select(&blocks) {
        let text = block_text(&el);
        if text.is_empty() {
            continue;
        }
        let line = match el.value().name() {
            "h1" => format!("# {text}"),
            "h2" => format!("## {text}"),
            "h3" => format!("### {text}"),
            "h4" => format!("#### {text}"),
            "h5" => format!("##### {text}"),
            "h6" => format!("###### {text}"),
            "li" => format!("- {text}"),
            "pre" => format!("```\n{text}\n```"),
            "blockquote" => format!("> {text}"),
            _ => text,
        };
        out.push_str(&line);
        out.push_str("\n\n");
    }
    out.trim_end().to_string()
}

fn block_text(el: &ElementRef) -> String {
    let raw = el.text().collect::<String>();
    // Collapse the whitespace soup HTML leaves behind.
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
