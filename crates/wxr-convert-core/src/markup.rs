//! Markup detection, inline URL extraction, and the HTML → text seam.
//!
//! The actual HTML-to-Markdown conversion is an external concern; the core
//! only depends on the [`MarkupConverter`] trait. [`PlainText`] is the
//! built-in fallback that strips tags.

use bitflags::bitflags;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

static RE_ANY_TAG: OnceLock<Regex> = OnceLock::new();
static RE_BREAKS: OnceLock<Regex> = OnceLock::new();
static RE_TAGS: OnceLock<Regex> = OnceLock::new();
static RE_BLANK_LINES: OnceLock<Regex> = OnceLock::new();
static RE_ENTITY: OnceLock<Regex> = OnceLock::new();

/// Converts original post markup into the target's text format.
pub trait MarkupConverter: Send + Sync {
    fn convert(&self, markup: &str) -> String;
}

/// Tag-stripping converter: block ends and `<br>` become line breaks,
/// common entities are decoded, runs of blank lines collapse to one.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl MarkupConverter for PlainText {
    fn convert(&self, markup: &str) -> String {
        let re_breaks = RE_BREAKS.get_or_init(|| {
            Regex::new(r"(?i)<br\s*/?>|</(p|div|h[1-6]|li|blockquote|pre|tr)>").unwrap()
        });
        let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());
        let re_blank = RE_BLANK_LINES.get_or_init(|| Regex::new(r"\n[ \t]*\n(\s*\n)+").unwrap());

        let text = re_breaks.replace_all(markup, "\n");
        let text = re_tags.replace_all(&text, "");
        let text = decode_entities(&text);
        re_blank.replace_all(&text, "\n\n").trim().to_string()
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Escape `&`, `<` and `>` without double-encoding existing entities.
/// Quotes are left alone.
pub fn escape_special_chars(text: &str) -> String {
    let re_entity = RE_ENTITY
        .get_or_init(|| Regex::new(r"^&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);").unwrap());
    let mut out = String::with_capacity(text.len());
    for (i, ch) in text.char_indices() {
        match ch {
            '&' if re_entity.is_match(&text[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

bitflags! {
    /// What a post's markup contains and which source field it came from.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ParseHints: u8 {
        /// `<a href=...>` present.
        const LINK = 1;
        /// `<img` present.
        const IMG = 2;
        /// `srcset=` present.
        const SRCSET = 4;
        const DESCRIPTION = 16;
        const CONTENT = 32;
        const EXCERPT = 64;
    }
}

impl ParseHints {
    /// Lowercase flag names, in declaration order.
    pub fn names(self) -> Vec<String> {
        self.iter_names()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect()
    }
}

/// Hints for one markup field. Empty for plain text; otherwise `source`
/// plus whatever links, images and srcsets were spotted.
pub fn hint_markup(markup: &str, source: ParseHints) -> ParseHints {
    let re = RE_ANY_TAG.get_or_init(|| Regex::new(r"<[a-z]+\s?").unwrap());
    if !re.is_match(markup) {
        return ParseHints::empty();
    }
    let mut hints = source;
    if markup.contains("href=") {
        hints |= ParseHints::LINK;
    }
    if markup.contains("<img") {
        hints |= ParseHints::IMG;
    }
    if markup.contains("srcset=") {
        hints |= ParseHints::SRCSET;
    }
    hints
}

/// URLs referenced from post markup, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineUrls {
    pub links: Vec<String>,
    pub images: Vec<String>,
    pub sources: Vec<String>,
}

/// Collect `href`s of anchors, `src` and `srcset` candidates of images and
/// `srcset` candidates of `<source>` elements, guided by `hints`.
pub fn extract_inline_urls(markup: &str, hints: ParseHints) -> InlineUrls {
    let mut urls = InlineUrls::default();
    if !hints.intersects(ParseHints::LINK | ParseHints::IMG | ParseHints::SRCSET) {
        return urls;
    }
    let document = Html::parse_fragment(markup);

    if hints.contains(ParseHints::LINK) {
        urls.links = attr_values(&document, "a[href]", "href");
    }

    if hints.contains(ParseHints::IMG) {
        urls.images = attr_values(&document, "img[src]", "src");
        if hints.contains(ParseHints::SRCSET) {
            for srcset in attr_values(&document, "img[srcset]", "srcset") {
                urls.images.extend(srcset_candidates(&srcset));
            }
        }
    }

    if hints.contains(ParseHints::SRCSET) {
        for srcset in attr_values(&document, "source[srcset]", "srcset") {
            urls.sources.extend(srcset_candidates(&srcset));
        }
    }

    urls
}

/// Trimmed, entity-decoded values of `attr` on every element matching `selector`.
fn attr_values(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|value| value.trim().to_string())
        .collect()
}

/// `"a.jpg 300w, b.jpg 600w"` → `["a.jpg", "b.jpg"]`.
fn srcset_candidates(srcset: &str) -> Vec<String> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
