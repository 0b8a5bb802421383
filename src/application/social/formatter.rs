//! Turns a blog record into a plain-text social post body.
//!
//! The output is a sequence of sections (title, type label, short
//! description, body excerpt, links) joined by blank lines and bounded by the
//! platform character limit. Characters are counted as Unicode scalar values.

use std::net::IpAddr;

use html_escape::decode_html_entities;
use lol_html::html_content::ContentType;
use lol_html::{RewriteStrSettings, doc_comments, element, rewrite_str};
use tracing::{debug, warn};
use url::{Host, Url};

use crate::domain::entities::BlogRecord;

const SECTION_SEPARATOR: &str = "\n\n";
const ELLIPSIS: char = '…';
const VIDEO_LABEL: &str = "Watch video: ";
const DOCUMENT_LABEL: &str = "Download document: ";
const ARTICLE_LABEL: &str = "Read full article: ";

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "blockquote", "pre",
    "section", "article", "header", "footer", "table", "tr", "figure", "hr",
];

/// Everything the formatter needs, with URLs already resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostContent {
    pub title: String,
    pub article_type: String,
    pub short_description: String,
    pub body: String,
    pub video_url: Option<String>,
    pub document_url: Option<String>,
    pub article_url: Option<String>,
}

/// Resolves blog URLs against the public site and renders post bodies.
#[derive(Debug, Clone)]
pub struct ContentFormatter {
    site_url: Option<Url>,
}

impl ContentFormatter {
    pub fn new(site_url: Option<Url>) -> Self {
        Self { site_url }
    }

    pub fn content_for(&self, blog: &BlogRecord) -> PostContent {
        PostContent {
            title: blog.title.clone(),
            article_type: blog.article_type.clone(),
            short_description: blog.short_description.clone(),
            body: blog.body.clone(),
            video_url: non_blank(blog.video_url.as_deref()).map(str::to_string),
            document_url: non_blank(blog.document_url.as_deref())
                .and_then(|doc| self.document_url(doc)),
            article_url: self.article_url(&blog.slug),
        }
    }

    pub fn format_blog(&self, blog: &BlogRecord, limit: usize) -> String {
        format_post(&self.content_for(blog), limit)
    }

    /// Public article URL, or `None` when the site is served from a loopback host.
    pub fn article_url(&self, slug: &str) -> Option<String> {
        let site = self.site_url.as_ref()?;
        if is_loopback_host(site) {
            return None;
        }
        site.join(&format!("blog/{slug}"))
            .ok()
            .map(|url| url.to_string())
    }

    /// Absolute document URL; relative upload paths are joined to the site.
    pub fn document_url(&self, document: &str) -> Option<String> {
        if let Ok(url) = Url::parse(document) {
            return Some(url.to_string());
        }
        let site = self.site_url.as_ref()?;
        site.join(document.trim_start_matches('/'))
            .ok()
            .map(|url| url.to_string())
    }
}

/// Render `content` into a post body of at most `limit` characters.
pub fn format_post(content: &PostContent, limit: usize) -> String {
    let title = normalize_text(&content.title);
    let type_label = capitalize(&normalize_text(&content.article_type));
    let short = normalize_text(&content.short_description);
    let excerpt = strip_html(&content.body);

    let mut fixed_before = Vec::new();
    push_non_empty(&mut fixed_before, title);
    push_non_empty(&mut fixed_before, type_label);
    push_non_empty(&mut fixed_before, short);

    let mut fixed_after = Vec::new();
    if let Some(url) = non_blank(content.video_url.as_deref()) {
        fixed_after.push(format!("{VIDEO_LABEL}{}", url.trim()));
    }
    if let Some(url) = non_blank(content.document_url.as_deref()) {
        fixed_after.push(format!("{DOCUMENT_LABEL}{}", url.trim()));
    }
    if let Some(url) = non_blank(content.article_url.as_deref()) {
        fixed_after.push(format!("{ARTICLE_LABEL}{}", url.trim()));
    }

    let fixed_sections = fixed_before.len() + fixed_after.len();
    let fixed_chars: usize = fixed_before
        .iter()
        .chain(fixed_after.iter())
        .map(|section| char_len(section))
        .sum::<usize>()
        + separators_len(fixed_sections);

    let excerpt = if excerpt.is_empty() {
        excerpt
    } else {
        // One more separator once the excerpt joins the other sections.
        let overhead = fixed_chars + if fixed_sections > 0 { SECTION_SEPARATOR.len() } else { 0 };
        let budget = limit.saturating_sub(overhead);
        if char_len(&excerpt) <= budget {
            excerpt
        } else {
            debug!(
                target = "blogcast::social::formatter",
                budget,
                original_chars = char_len(&excerpt),
                "Shortening body excerpt to fit platform limit"
            );
            shorten_excerpt(&excerpt, budget)
        }
    };

    let mut sections = fixed_before;
    push_non_empty(&mut sections, excerpt);
    sections.extend(fixed_after);

    let joined = sections.join(SECTION_SEPARATOR);
    if char_len(&joined) <= limit {
        joined
    } else {
        hard_cut(&joined, limit)
    }
}

/// Strip markup, decode entities and normalise whitespace.
pub fn strip_html(html: &str) -> String {
    let unescaped = unescape_line_breaks(html);
    let without_tags = match remove_markup(&unescaped) {
        Ok(text) => text,
        Err(err) => {
            warn!(
                target = "blogcast::social::formatter",
                error = %err,
                "HTML rewriter rejected the body; excerpt omitted"
            );
            return String::new();
        }
    };
    normalize_whitespace(&decode_html_entities(&without_tags))
}

/// Normalisation applied to short plain-text fields.
pub fn normalize_text(input: &str) -> String {
    normalize_whitespace(&decode_html_entities(&unescape_line_breaks(input)))
}

fn remove_markup(html: &str) -> Result<String, lol_html::errors::RewritingError> {
    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                let tag = el.tag_name().to_ascii_lowercase();
                match tag.as_str() {
                    "script" | "style" | "noscript" | "template" => el.remove(),
                    "br" => el.replace("\n", ContentType::Text),
                    name if BLOCK_ELEMENTS.contains(&name) => {
                        el.before(SECTION_SEPARATOR, ContentType::Text);
                        el.after(SECTION_SEPARATOR, ContentType::Text);
                        el.remove_and_keep_content();
                    }
                    _ => el.remove_and_keep_content(),
                }
                Ok(())
            })],
            document_content_handlers: vec![doc_comments!(|comment| {
                comment.remove();
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
}

fn unescape_line_breaks(input: &str) -> String {
    input
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace("\\r\\n", "\n")
        .replace("\\n", "\n")
}

fn normalize_whitespace(input: &str) -> String {
    let mut lines = Vec::new();
    for line in input.split('\n') {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        lines.push(collapsed);
    }

    let mut output = String::with_capacity(input.len());
    let mut blank_run = 0usize;
    for line in lines {
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !output.is_empty() {
            output.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        blank_run = 0;
        output.push_str(&line);
    }
    output
}

fn shorten_excerpt(excerpt: &str, budget: usize) -> String {
    if budget == 0 {
        return String::new();
    }

    let window = take_chars(excerpt, budget);

    if let Some(index) = window.rfind(SECTION_SEPARATOR) {
        let candidate = window[..index].trim_end();
        if !candidate.is_empty() {
            return candidate.to_string();
        }
    }

    if let Some(index) = last_sentence_end(window) {
        let candidate = window[..index].trim_end();
        if !candidate.is_empty() {
            return candidate.to_string();
        }
    }

    hard_cut(excerpt, budget)
}

fn last_sentence_end(text: &str) -> Option<usize> {
    let mut found = None;
    let mut chars = text.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        if matches!(ch, '.' | '!' | '?') {
            let boundary = match chars.peek() {
                None => true,
                Some((_, next)) => next.is_whitespace(),
            };
            if boundary {
                found = Some(index + ch.len_utf8());
            }
        }
    }
    found
}

fn hard_cut(text: &str, limit: usize) -> String {
    if char_len(text) <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    let mut cut = take_chars(text, limit - 1).trim_end().to_string();
    cut.push(ELLIPSIS);
    cut
}

fn take_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn separators_len(sections: usize) -> usize {
    sections.saturating_sub(1) * SECTION_SEPARATOR.len()
}

fn push_non_empty(sections: &mut Vec<String>, section: String) {
    if !section.is_empty() {
        sections.push(section);
    }
}

fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn is_loopback_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback() || ip.is_unspecified(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback() || ip.is_unspecified(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch_day() -> PostContent {
        PostContent {
            title: "Launch Day".to_string(),
            article_type: String::new(),
            short_description: "We shipped it".to_string(),
            body: "<p>Full story here.</p>".to_string(),
            video_url: None,
            document_url: None,
            article_url: Some("https://example.com/blog/launch-day".to_string()),
        }
    }

    #[test]
    fn launch_day_scenario_matches_expected_body() {
        let body = format_post(&launch_day(), 63_000);
        assert_eq!(
            body,
            "Launch Day\n\nWe shipped it\n\nFull story here.\n\nRead full article: https://example.com/blog/launch-day"
        );
    }

    #[test]
    fn sections_follow_fixed_order_with_capitalised_type() {
        let content = PostContent {
            title: "Release".to_string(),
            article_type: "news".to_string(),
            short_description: "Short".to_string(),
            body: "Body".to_string(),
            video_url: Some("https://video.example/v".to_string()),
            document_url: Some("https://example.com/docs/a.pdf".to_string()),
            article_url: Some("https://example.com/blog/release".to_string()),
        };
        let body = format_post(&content, 63_000);
        assert_eq!(
            body,
            "Release\n\nNews\n\nShort\n\nBody\n\nWatch video: https://video.example/v\n\n\
             Download document: https://example.com/docs/a.pdf\n\n\
             Read full article: https://example.com/blog/release"
        );
    }

    #[test]
    fn strips_markup_and_decodes_entities() {
        let text = strip_html(
            "<h2>Intro</h2><p>Fish &amp; chips<br>tonight</p><script>alert(1)</script>\
             <!-- hidden --><p>Price&nbsp;&#36;5 &hellip;</p>",
        );
        assert_eq!(text, "Intro\n\nFish & chips\ntonight\n\nPrice $5 …");
    }

    #[test]
    fn literal_escape_sequences_become_line_breaks() {
        let text = strip_html("one\\n\\n\\n\\ntwo\\r\\nthree");
        assert_eq!(text, "one\n\ntwo\nthree");
    }

    #[test]
    fn markup_only_body_is_omitted() {
        let mut content = launch_day();
        content.body = "<div><br><span></span></div>".to_string();
        let body = format_post(&content, 63_000);
        assert!(!body.contains("\n\n\n"));
        assert_eq!(
            body,
            "Launch Day\n\nWe shipped it\n\nRead full article: https://example.com/blog/launch-day"
        );
    }

    #[test]
    fn normalisation_is_idempotent_on_clean_text() {
        let clean = "Alpha beta\n\nGamma\ndelta";
        let once = strip_html(clean);
        assert_eq!(once, clean);
        assert_eq!(strip_html(&once), once);
    }

    #[test]
    fn decodes_the_full_named_entity_set() {
        let text = strip_html(
            "<p>Caf&eacute; &agrave; la cr&egrave;me &ccedil;a &frac12; &laquo;x&raquo;</p>",
        );
        assert_eq!(text, "Café à la crème ça ½ «x»");
        assert_eq!(normalize_text("na&iuml;ve &#233;t&#xE9;"), "naïve été");
    }

    #[test]
    fn formatting_a_formatted_post_is_a_fixed_point() {
        let first = format_post(&launch_day(), 63_000);
        let reformatted = format_post(
            &PostContent {
                body: first.clone(),
                ..PostContent::default()
            },
            63_000,
        );
        assert_eq!(reformatted, first);
    }

    #[test]
    fn mixed_markup_entities_and_escapes_converge() {
        let content = PostContent {
            title: "Caf&eacute; news".to_string(),
            article_type: "event".to_string(),
            short_description: "Open\\nlate".to_string(),
            body: "<p>Caf&eacute; &agrave; la cr&egrave;me\\n&ccedil;a &frac12; &laquo;x&raquo;</p>\
                   <p>Fish &amp; chips<br>tonight</p>"
                .to_string(),
            video_url: None,
            document_url: None,
            article_url: None,
        };
        let first = format_post(&content, 63_000);
        assert_eq!(
            first,
            "Café news\n\nEvent\n\nOpen\nlate\n\nCafé à la crème\nça ½ «x»\n\nFish & chips\ntonight"
        );

        let reformatted = format_post(
            &PostContent {
                body: first.clone(),
                ..PostContent::default()
            },
            63_000,
        );
        assert_eq!(reformatted, first);
    }

    #[test]
    fn excerpt_is_cut_at_paragraph_break_first() {
        let mut content = launch_day();
        content.article_url = None;
        content.body = format!("<p>{}</p><p>{}</p>", "a".repeat(40), "b".repeat(400));
        let body = format_post(&content, 100);
        assert!(body.chars().count() <= 100);
        assert!(body.ends_with(&"a".repeat(40)));
    }

    #[test]
    fn excerpt_falls_back_to_sentence_end() {
        let mut content = launch_day();
        content.article_url = None;
        content.body = "First sentence. Second sentence that runs on and on and on.".to_string();
        let body = format_post(&content, 50);
        assert!(body.chars().count() <= 50);
        assert!(body.ends_with("First sentence."), "{body}");
    }

    #[test]
    fn excerpt_hard_cut_uses_ellipsis() {
        let mut content = launch_day();
        content.article_url = None;
        content.body = "x".repeat(500);
        let body = format_post(&content, 60);
        assert_eq!(body.chars().count(), 60);
        assert!(body.ends_with('…'));
    }

    #[test]
    fn oversized_fixed_sections_are_hard_cut() {
        let content = PostContent {
            title: "T".repeat(3000),
            short_description: "S".repeat(3000),
            body: "body".to_string(),
            ..PostContent::default()
        };
        for limit in [2200, 3000] {
            let body = format_post(&content, limit);
            assert_eq!(body.chars().count(), limit);
            assert!(body.ends_with('…'));
        }
    }

    #[test]
    fn never_empty_when_title_present() {
        let content = PostContent {
            title: "Only title".to_string(),
            ..PostContent::default()
        };
        assert_eq!(format_post(&content, 2200), "Only title");
    }

    #[test]
    fn loopback_sites_omit_article_link() {
        for site in [
            "http://localhost:8000/",
            "http://127.0.0.1/",
            "http://dev.localhost/",
            "http://[::1]/",
            "http://0.0.0.0/",
        ] {
            let formatter = ContentFormatter::new(Some(Url::parse(site).unwrap()));
            assert_eq!(formatter.article_url("x"), None, "{site}");
        }

        let formatter = ContentFormatter::new(Some(Url::parse("https://example.com/").unwrap()));
        assert_eq!(
            formatter.article_url("launch-day").as_deref(),
            Some("https://example.com/blog/launch-day")
        );
    }

    #[test]
    fn relative_document_paths_join_site_url() {
        let formatter = ContentFormatter::new(Some(Url::parse("https://example.com/").unwrap()));
        assert_eq!(
            formatter.document_url("/storage/documents/a.pdf").as_deref(),
            Some("https://example.com/storage/documents/a.pdf")
        );
        assert_eq!(
            formatter.document_url("https://cdn.example/a.pdf").as_deref(),
            Some("https://cdn.example/a.pdf")
        );
    }
}
