//! Source acquisition, parsing half: markup → [`ScrapedContent`].
//!
//! Text is every visible text node of the document in order, one node per
//! line, trimmed, blank lines dropped. Elements that never render text
//! (`script`, `style`, `noscript`, `template`, …) and elements marked hidden
//! are skipped together with their whole subtree.
//!
//! The image link is looked up in two places, first hit wins:
//! 1. the page's `og:image` social-preview meta tag
//! 2. the first `<img>` inside `article`, `main`, `.recipe` or `.post`

use crate::output::ScrapedContent;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;
use url::Url;

const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "canvas", "iframe", "object",
];

static OG_IMAGE: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[property="og:image"], meta[name="og:image"]"#).unwrap()
});

static CONTENT_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article img, main img, .recipe img, .post img").unwrap());

/// Parse a fetched page into cleaned text plus an optional image link.
///
/// `page_url` is used only to resolve relative image references.
pub fn scrape_document(html: &str, page_url: &Url) -> ScrapedContent {
    let document = Html::parse_document(html);
    let text = visible_text(&document);
    let image_url = find_image_url(&document, page_url);
    debug!(
        "Scraped {} chars of text, image: {}",
        text.len(),
        image_url.as_deref().unwrap_or("<none>")
    );
    ScrapedContent { text, image_url }
}

/// Newline-joined visible text of the document.
pub fn visible_text(document: &Html) -> String {
    let mut lines = Vec::new();
    collect_text(document.root_element(), &mut lines);
    lines.join("\n")
}

fn collect_text(element: ElementRef<'_>, lines: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                lines.extend(
                    text.lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string),
                );
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    if !is_hidden(&child_el) {
                        collect_text(child_el, lines);
                    }
                }
            }
            _ => {}
        }
    }
}

fn is_hidden(el: &ElementRef<'_>) -> bool {
    let value = el.value();
    if SKIPPED_ELEMENTS.contains(&value.name()) {
        return true;
    }
    if value.attr("hidden").is_some() {
        return true;
    }
    if value
        .attr("aria-hidden")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let compact: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        compact.contains("display:none") || compact.contains("visibility:hidden")
    })
}

/// Preview image if present, else the first content-region image.
pub fn find_image_url(document: &Html, page_url: &Url) -> Option<String> {
    let og = document
        .select(&OG_IMAGE)
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(|raw| resolve_image_ref(raw, page_url));
    if og.is_some() {
        return og;
    }

    // Lazy-loading pages put a placeholder in `src` and the real link in `data-src`.
    document.select(&CONTENT_IMAGE).find_map(|img| {
        let attrs = img.value();
        attrs
            .attr("src")
            .and_then(|raw| resolve_image_ref(raw, page_url))
            .or_else(|| {
                attrs
                    .attr("data-src")
                    .and_then(|raw| resolve_image_ref(raw, page_url))
            })
    })
}

/// Resolve an image reference against the page URL.
///
/// Absolute references are returned exactly as written. Empty references
/// and inline `data:` payloads are rejected.
fn resolve_image_ref(raw: &str, page_url: &Url) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")) {
        return None;
    }
    match Url::parse(raw) {
        Ok(abs) if matches!(abs.scheme(), "http" | "https") => Some(raw.to_string()),
        Ok(_) => None,
        Err(_) => page_url.join(raw).ok().map(String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://cooking.example.com/recipes/pancakes").unwrap()
    }

    #[test]
    fn script_style_and_hidden_content_never_reach_text() {
        let html = r#"<html><head><title>Pancakes</title>
            <style>.secret { color: red }</style>
            <script>var tracking = "SCRIPT_SECRET";</script></head>
            <body>
              <noscript>NOSCRIPT_SECRET</noscript>
              <h1>Fluffy Pancakes</h1>
              <div hidden>HIDDEN_ATTR_SECRET</div>
              <div aria-hidden="true">ARIA_SECRET</div>
              <span style="display: none">STYLE_SECRET</span>
              <template><p>TEMPLATE_SECRET</p></template>
              <ul><li>200 g flour</li><li>2 eggs</li></ul>
              <script type="application/ld+json">{"@type":"Recipe"}</script>
            </body></html>"#;
        let content = scrape_document(html, &page());
        for secret in [
            "SCRIPT_SECRET",
            "secret",
            "NOSCRIPT_SECRET",
            "HIDDEN_ATTR_SECRET",
            "ARIA_SECRET",
            "STYLE_SECRET",
            "TEMPLATE_SECRET",
            "@type",
        ] {
            assert!(!content.text.contains(secret), "leaked {secret}: {}", content.text);
        }
        assert_eq!(content.text, "Pancakes\nFluffy Pancakes\n200 g flour\n2 eggs");
    }

    #[test]
    fn text_has_no_blank_lines_and_is_trimmed() {
        let html = "<body><p>   Whisk   </p>\n\n<p>\n\n  the eggs \n</p><p>&nbsp;</p></body>";
        let content = scrape_document(html, &page());
        assert_eq!(content.text, "Whisk\nthe eggs");
        assert!(content.text.lines().all(|l| !l.trim().is_empty()));
    }

    #[test]
    fn og_image_wins_over_content_images() {
        let html = r#"<html><head>
            <meta property="og:image" content="https://cdn.example.com/hero.jpg">
            </head><body><article><img src="https://cdn.example.com/step1.jpg"></article></body></html>"#;
        let content = scrape_document(html, &page());
        assert_eq!(content.image_url.as_deref(), Some("https://cdn.example.com/hero.jpg"));
    }

    #[test]
    fn falls_back_to_first_content_image() {
        let html = r#"<body>
            <header><img src="https://cdn.example.com/logo.png"></header>
            <div class="recipe"><p>Mix</p><img src="https://cdn.example.com/dish.jpg"></div>
            <article><img src="https://cdn.example.com/later.jpg"></article></body>"#;
        let content = scrape_document(html, &page());
        assert_eq!(content.image_url.as_deref(), Some("https://cdn.example.com/dish.jpg"));
    }

    #[test]
    fn empty_og_image_is_ignored() {
        let html = r#"<head><meta property="og:image" content="  "></head>
            <body><article><img src="https://cdn.example.com/dish.jpg"></article></body>"#;
        let content = scrape_document(html, &page());
        assert_eq!(content.image_url.as_deref(), Some("https://cdn.example.com/dish.jpg"));
    }

    #[test]
    fn relative_image_is_resolved_against_page() {
        let html = r#"<body><main><img src="/img/pancakes.jpg"></main></body>"#;
        let content = scrape_document(html, &page());
        assert_eq!(
            content.image_url.as_deref(),
            Some("https://cooking.example.com/img/pancakes.jpg")
        );
    }

    #[test]
    fn lazy_placeholder_falls_through_to_data_src() {
        let html = r#"<body><article>
            <img src="data:image/gif;base64,R0lGODlhAQABAAAAACw=" data-src="https://cdn.example.com/real.jpg">
            </article></body>"#;
        let content = scrape_document(html, &page());
        assert_eq!(content.image_url.as_deref(), Some("https://cdn.example.com/real.jpg"));

        let html = r#"<body><article><img data-src="https://cdn.example.com/real.jpg"></article></body>"#;
        let content = scrape_document(html, &page());
        assert_eq!(content.image_url.as_deref(), Some("https://cdn.example.com/real.jpg"));
    }

    #[test]
    fn no_image_anywhere() {
        let html = "<body><p>Just text</p><img src=\"https://cdn.example.com/sidebar.jpg\"></body>";
        let content = scrape_document(html, &page());
        assert_eq!(content.image_url, None);
    }
}
