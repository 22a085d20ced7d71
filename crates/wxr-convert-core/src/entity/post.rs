//! Pages and posts (`wp:post_type` `page` / `post`).
//!
//! The handlers here are generic over [`HasPost`] so the attachment schema
//! reuses them unchanged; only filepath derivation is overridable.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::item::{self, HasItem, Item};
use super::{BagKind, Entity, EntityKind, EntityMut};
use crate::bag::{Bag, FieldValue};
use crate::canonical::path_of;
use crate::error::SchemaError;
use crate::markup::{extract_inline_urls, hint_markup, ParseHints};
use crate::options::ContentOptions;
use crate::router::FieldContext;
use crate::schema::{Schema, SchemaBuilder, Schemas};
use crate::xml::Element;

/// WordPress' `Y-m-d H:i:s`.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Blueprint of posts without a `_wp_page_template`.
pub const DEFAULT_TEMPLATE: &str = "default";

/// Postmeta keys re-routed through the schema as if they were elements;
/// every other key goes straight into the meta bag.
const ROUTED_META_KEYS: &[&str] = &[
    "_wp_page_template",
    "_wp_attachment_image_alt",
    "_wp_attached_file",
    "_wp_attachment_metadata",
    "_wp_attachment_backup_sizes",
];

/// One markup field kept in both forms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Markup {
    /// As exported.
    pub html: String,
    /// Output of the markup converter; equals `html` for plain text.
    pub text: String,
}

impl Markup {
    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub item: Item,
    /// `wp:post_parent`; `0` in the export means no parent.
    pub parent: Option<u64>,
    /// `dc:creator` username, resolved against the author directory later.
    pub creator: Option<String>,
    pub content: Markup,
    pub excerpt: Markup,
    pub created: Option<NaiveDateTime>,
    /// `wp:post_name`.
    pub slug: String,
    pub status: String,
    /// Path of the canonical link, the output location of the entity.
    pub filepath: String,
    /// Blueprint name from `_wp_page_template`, else [`DEFAULT_TEMPLATE`].
    pub template: String,
    pub meta: Bag,
    /// nicename → names.
    pub tags: BTreeMap<String, Vec<String>>,
    pub categories: BTreeMap<String, Vec<String>>,
    pub hints: ParseHints,
}

impl Default for Post {
    fn default() -> Self {
        Self {
            item: Item::default(),
            parent: None,
            creator: None,
            content: Markup::default(),
            excerpt: Markup::default(),
            created: None,
            slug: String::new(),
            status: "publish".to_string(),
            filepath: String::new(),
            template: DEFAULT_TEMPLATE.to_string(),
            meta: Bag::new(),
            tags: BTreeMap::new(),
            categories: BTreeMap::new(),
            hints: ParseHints::empty(),
        }
    }
}

impl Post {
    pub fn id(&self) -> u64 {
        self.item.id
    }

    /// Typed properties only, under the configured title/body names.
    pub(crate) fn typed_fields(&self, options: &ContentOptions) -> Bag {
        let mut bag = Bag::new();
        bag.insert("id", self.item.id.to_string());
        put(&mut bag, &options.title_field, &self.item.title);
        put(&mut bag, "type", &self.item.kind);
        put(&mut bag, "link", &self.item.link);
        put(&mut bag, "slug", &self.slug);
        put(&mut bag, "status", &self.status);
        if let Some(created) = self.created {
            bag.insert("created", created.format(DATE_FORMAT).to_string());
        }
        put(&mut bag, "filepath", &self.filepath);
        put(&mut bag, "template", &self.template);
        if let Some(parent) = self.parent {
            bag.insert("parent", parent.to_string());
        }
        if let Some(creator) = &self.creator {
            bag.insert("creator", creator.as_str());
        }
        put(&mut bag, &options.body_field, &self.content.text);
        put(&mut bag, "excerpt", &self.excerpt.text);
        put(&mut bag, "description", &self.item.description);
        if !self.tags.is_empty() {
            bag.insert("tags", taxonomy(&self.tags));
        }
        if !self.categories.is_empty() {
            bag.insert("categories", taxonomy(&self.categories));
        }
        if !self.hints.is_empty() {
            bag.insert("hints", self.hints.names());
        }
        if !self.meta.is_empty() {
            bag.insert("meta", self.meta.clone());
        }
        if !self.item.data.is_empty() {
            bag.insert("data", self.item.data.clone());
        }
        bag
    }

    /// Field map for the sink: typed properties first, then the fields bag
    /// for every name not already taken.
    pub fn to_fields(&self, options: &ContentOptions) -> Bag {
        let mut bag = self.typed_fields(options);
        bag.merge_missing(&self.item.fields);
        bag
    }
}

pub(crate) fn put(bag: &mut Bag, key: &str, value: &str) {
    if !value.is_empty() {
        bag.insert(key, value);
    }
}

fn taxonomy(terms: &BTreeMap<String, Vec<String>>) -> Bag {
    terms
        .iter()
        .map(|(nicename, names)| (nicename.as_str(), FieldValue::List(names.clone())))
        .collect()
}

impl HasItem for Post {
    fn item(&self) -> &Item {
        &self.item
    }

    fn item_mut(&mut self) -> &mut Item {
        &mut self.item
    }
}

/// Access to the post part of an entity.
pub trait HasPost: HasItem + Entity {
    fn post(&self) -> &Post;
    fn post_mut(&mut self) -> &mut Post;

    /// Set the output path from a URL. Posts take the URL path.
    fn derive_filepath(&mut self, url: &str) {
        self.post_mut().filepath = path_of(url).to_string();
    }
}

impl HasPost for Post {
    fn post(&self) -> &Post {
        self
    }

    fn post_mut(&mut self) -> &mut Post {
        self
    }
}

impl Entity for Post {
    const KIND: EntityKind = EntityKind::Post;

    fn schema(schemas: &Schemas) -> &Schema<Self> {
        &schemas.post
    }

    fn as_entity_mut(&mut self) -> EntityMut<'_> {
        EntityMut::Post(self)
    }

    fn bag_mut(&mut self, bag: BagKind) -> &mut Bag {
        match bag {
            BagKind::Fields => &mut self.item.fields,
            BagKind::Data => &mut self.item.data,
            BagKind::Meta => &mut self.meta,
        }
    }

    fn subject(&self) -> String {
        format!("post #{}", self.item.id)
    }
}

pub(crate) fn schema() -> Result<Schema<Post>, SchemaError> {
    with_post_handlers(SchemaBuilder::new("post", "^(post|page)_?"))
        .handler("id", id::<Post>)
        .property("status", |p: &mut Post, v| p.status = v.trim().to_string())
        .build()
}

/// Handlers shared by posts and attachments (everything but `id`).
pub(crate) fn with_post_handlers<E: HasPost>(builder: SchemaBuilder<E>) -> SchemaBuilder<E> {
    builder
        .handler("title", item::title::<E>)
        .handler("type", item::kind::<E>)
        .handler("link", link::<E>)
        .handler("parent", parent::<E>)
        .handler("creator", creator::<E>)
        .handler("content", content::<E>)
        .handler("excerpt", excerpt::<E>)
        .handler("description", description::<E>)
        .handler("date_gmt", date_gmt::<E>)
        .handler("date", date::<E>)
        .handler("name", name::<E>)
        .handler("category", category::<E>)
        .handler("meta", meta::<E>)
        .handler("template", template::<E>)
}

pub(crate) fn id<E: HasPost>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    let raw = element.text_content();
    match raw.trim().parse() {
        Ok(id) => entity.item_mut().id = id,
        Err(_) => cx.invalid_value(entity.subject(), "post id", &raw),
    }
}

fn link<E: HasPost>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    item::link(entity, element, cx);
    let link = entity.item().link.clone();
    entity.derive_filepath(&link);
}

fn parent<E: HasPost>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    let raw = element.text_content();
    match raw.trim().parse::<u64>() {
        Ok(0) => entity.post_mut().parent = None,
        Ok(parent) => entity.post_mut().parent = Some(parent),
        Err(_) => cx.invalid_value(entity.subject(), "post parent", &raw),
    }
}

fn creator<E: HasPost>(entity: &mut E, element: &Element, _cx: &mut FieldContext<'_>) {
    let username = element.text_content().trim().to_string();
    entity.post_mut().creator = (!username.is_empty()).then_some(username);
}

/// Hint, then convert. Plain text is kept as is in both forms.
fn convert_markup(html: String, source: ParseHints, cx: &FieldContext<'_>) -> (Markup, ParseHints) {
    let hints = hint_markup(&html, source);
    let text = if hints.is_empty() {
        html.clone()
    } else {
        cx.markup.convert(&html)
    };
    (Markup { html, text }, hints)
}

fn content<E: HasPost>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    let (markup, hints) = convert_markup(element.text_content(), ParseHints::CONTENT, cx);
    let post = entity.post_mut();
    if !hints.is_empty() {
        let urls = extract_inline_urls(&markup.html, hints);
        for (list, found) in [
            ("links", urls.links),
            ("images", urls.images),
            ("sources", urls.sources),
        ] {
            for url in found {
                let url = cx.canonicalizer.canonicalize(&url);
                if !url.is_empty() {
                    post.item.data.push(list, url);
                }
            }
        }
    }
    post.hints |= hints;
    post.content = markup;
}

fn excerpt<E: HasPost>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    let (markup, hints) = convert_markup(element.text_content(), ParseHints::EXCERPT, cx);
    let post = entity.post_mut();
    post.hints |= hints;
    post.excerpt = markup;
}

fn description<E: HasPost>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    let (markup, hints) = convert_markup(element.text_content(), ParseHints::DESCRIPTION, cx);
    let post = entity.post_mut();
    post.hints |= hints;
    post.item.description = markup.text;
}

/// `0000-00-00 00:00:00` (drafts) is treated as absent.
fn parse_date(raw: &str) -> Option<Result<NaiveDateTime, chrono::ParseError>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("0000-00-00") {
        return None;
    }
    Some(NaiveDateTime::parse_from_str(raw, DATE_FORMAT))
}

/// The GMT date wins over any local date and drops the RSS dates from the
/// fields bag.
fn date_gmt<E: HasPost>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    let raw = element.text_content();
    match parse_date(&raw) {
        Some(Ok(created)) => {
            let post = entity.post_mut();
            post.created = Some(created);
            post.item.fields.remove("pubDate");
            post.item.fields.remove("date");
        }
        Some(Err(_)) => cx.invalid_value(entity.subject(), "post_date_gmt", &raw),
        None => {}
    }
}

fn date<E: HasPost>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    if entity.post().created.is_some() {
        return;
    }
    let raw = element.text_content();
    match parse_date(&raw) {
        Some(Ok(created)) => entity.post_mut().created = Some(created),
        Some(Err(_)) => cx.invalid_value(entity.subject(), "post_date", &raw),
        None => {}
    }
}

fn name<E: HasPost>(entity: &mut E, element: &Element, _cx: &mut FieldContext<'_>) {
    entity.post_mut().slug = element.text_content().trim().to_string();
}

/// `<category domain="post_tag|category" nicename="...">Name</category>`.
/// Other domains (`nav_menu`, plugin taxonomies) are not collected.
fn category<E: HasPost>(entity: &mut E, element: &Element, _cx: &mut FieldContext<'_>) {
    let name = element.text_content().trim().to_string();
    let nicename = element
        .attribute("nicename")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from)
        .unwrap_or_else(|| name.clone());
    let post = entity.post_mut();
    let terms = match element.attribute("domain") {
        Some("post_tag") => &mut post.tags,
        Some("category") => &mut post.categories,
        _ => return,
    };
    terms.entry(nicename).or_default().push(name);
}

/// `<wp:postmeta>` with `<wp:meta_key>` / `<wp:meta_value>` children.
fn meta<E: HasPost>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    let key = element
        .child("meta_key")
        .map(|k| k.text_content().trim().to_string())
        .unwrap_or_default();
    if key.is_empty() {
        return;
    }
    let value = element
        .child("meta_value")
        .map(Element::text_content)
        .unwrap_or_default();

    if ROUTED_META_KEYS.contains(&key.as_str()) {
        let synthetic = Element::with_text(key, value);
        cx.route(entity, &synthetic, BagKind::Meta);
    } else if !value.is_empty() {
        entity.post_mut().meta.insert(key, value);
    }
}

/// `_wp_page_template`: `templates/template-landing.php` → `landing`,
/// registered as the blueprint for this post's output path.
fn template<E: HasPost>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    let raw = element.text_content();
    let base = raw.trim().rsplit('/').next().unwrap_or_default();
    let base = base.strip_suffix(".php").unwrap_or(base);
    let blueprint = base.replace("template-", "");
    if blueprint.is_empty() {
        return;
    }
    let post = entity.post_mut();
    cx.blueprints.register(&post.filepath, &blueprint);
    post.template = blueprint;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{Canonicalizer, SiteContext, UrlPolicy};
    use crate::diagnostics::{DiagnosticKind, Diagnostics};
    use crate::markup::PlainText;
    use crate::router::Blueprints;
    use crate::transform::TransformRegistry;

    struct Fixture {
        schemas: Schemas,
        transforms: TransformRegistry,
        blueprints: Blueprints,
        diagnostics: Diagnostics,
        ignored: Vec<String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                schemas: Schemas::build().unwrap(),
                transforms: TransformRegistry::new(),
                blueprints: Blueprints::new(),
                diagnostics: Diagnostics::new(),
                ignored: Vec::new(),
            }
        }

        fn build(&mut self, children: Vec<Element>) -> Post {
            let canonicalizer = Canonicalizer::new(
                SiteContext::from_link("http://www.example.com"),
                UrlPolicy {
                    https: Some(true),
                    www: Some(false),
                },
            );
            let mut cx = FieldContext::new(
                canonicalizer,
                &PlainText,
                &self.blueprints,
                &mut self.diagnostics,
                &self.schemas,
                &self.transforms,
                &self.ignored,
            );
            let mut post = Post::default();
            for child in &children {
                cx.route(&mut post, child, BagKind::Fields);
            }
            post
        }
    }

    fn postmeta(key: &str, value: &str) -> Element {
        Element::new("wp:postmeta")
            .with_child(Element::with_text("wp:meta_key", key))
            .with_child(Element::with_text("wp:meta_value", value))
    }

    #[test]
    fn link_sets_canonical_link_and_filepath() {
        let mut fx = Fixture::new();
        let post = fx.build(vec![
            Element::with_text("title", "Hello"),
            Element::with_text("link", "http://www.example.com/hello/"),
            Element::with_text("wp:post_id", "42"),
        ]);
        assert_eq!(post.item.id, 42);
        assert_eq!(post.item.title, "Hello");
        assert_eq!(post.item.link, "https://example.com/hello/");
        assert_eq!(post.filepath, "/hello/");
    }

    #[test]
    fn content_keeps_both_forms_and_collects_urls() {
        let mut fx = Fixture::new();
        let post = fx.build(vec![Element::with_text(
            "content:encoded",
            r##"<p>See <a href="http://www.example.com/about/">about</a> and <a href="#">top</a></p><img src="http://www.example.com/wp-content/uploads/a.jpg">"##,
        )]);
        assert!(post.content.html.starts_with("<p>See"));
        assert_eq!(post.content.text, "See about and top");
        assert!(post.hints.contains(ParseHints::CONTENT | ParseHints::LINK | ParseHints::IMG));
        assert_eq!(
            post.item.data.get("links").and_then(FieldValue::as_list),
            Some(&["https://example.com/about/".to_string()][..])
        );
        assert_eq!(
            post.item.data.get("images").and_then(FieldValue::as_list),
            Some(&["https://example.com/wp-content/uploads/a.jpg".to_string()][..])
        );
    }

    #[test]
    fn plain_text_content_is_not_converted() {
        let mut fx = Fixture::new();
        let post = fx.build(vec![Element::with_text("content:encoded", "Just text & more")]);
        assert_eq!(post.content.text, "Just text & more");
        assert!(post.hints.is_empty());
    }

    #[test]
    fn gmt_date_wins_and_drops_rss_dates() {
        let mut fx = Fixture::new();
        let post = fx.build(vec![
            Element::with_text("pubDate", "Tue, 21 Jan 2020 10:00:00 +0000"),
            Element::with_text("wp:post_date", "2020-01-21 11:00:00"),
            Element::with_text("wp:post_date_gmt", "2020-01-21 10:00:00"),
        ]);
        assert_eq!(
            post.created.map(|d| d.format(DATE_FORMAT).to_string()).as_deref(),
            Some("2020-01-21 10:00:00")
        );
        assert!(!post.item.fields.contains_key("pubDate"));
    }

    #[test]
    fn zero_gmt_date_falls_back_to_local_date() {
        let mut fx = Fixture::new();
        let post = fx.build(vec![
            Element::with_text("wp:post_date_gmt", "0000-00-00 00:00:00"),
            Element::with_text("wp:post_date", "2020-02-02 02:02:02"),
        ]);
        assert_eq!(
            post.created.map(|d| d.format(DATE_FORMAT).to_string()).as_deref(),
            Some("2020-02-02 02:02:02")
        );
        assert!(fx.diagnostics.is_empty());
    }

    #[test]
    fn categories_and_tags_keyed_by_nicename() {
        let mut fx = Fixture::new();
        let post = fx.build(vec![
            Element::with_text("category", "Rust")
                .with_attribute("domain", "post_tag")
                .with_attribute("nicename", "rust"),
            Element::with_text("category", "News")
                .with_attribute("domain", "category")
                .with_attribute("nicename", "news"),
            Element::with_text("category", "Main Menu")
                .with_attribute("domain", "nav_menu")
                .with_attribute("nicename", "main"),
        ]);
        assert_eq!(post.tags.get("rust"), Some(&vec!["Rust".to_string()]));
        assert_eq!(post.categories.get("news"), Some(&vec!["News".to_string()]));
        assert_eq!(post.tags.len() + post.categories.len(), 2);
    }

    #[test]
    fn page_template_registers_blueprint() {
        let mut fx = Fixture::new();
        let post = fx.build(vec![
            Element::with_text("link", "http://www.example.com/landing/"),
            postmeta("_wp_page_template", "templates/template-landing.php"),
            postmeta("_edit_last", "1"),
        ]);
        assert_eq!(post.template, "landing");
        assert_eq!(post.meta.get_text("_edit_last"), Some("1"));
        assert_eq!(fx.blueprints.get("/landing/").as_deref(), Some("landing"));
    }

    #[test]
    fn template_defaults_without_page_template_meta() {
        let mut fx = Fixture::new();
        let post = fx.build(vec![Element::with_text("link", "http://www.example.com/plain/")]);
        assert_eq!(post.template, DEFAULT_TEMPLATE);
        assert_eq!(fx.blueprints.get("/plain/"), None);
    }

    #[test]
    fn parent_zero_is_none_and_bad_ids_are_diagnosed() {
        let mut fx = Fixture::new();
        let post = fx.build(vec![
            Element::with_text("wp:post_parent", "0"),
            Element::with_text("wp:post_id", "abc"),
        ]);
        assert_eq!(post.parent, None);
        assert_eq!(post.item.id, 0);
        assert_eq!(fx.diagnostics.count(DiagnosticKind::InvalidValue), 1);
    }

    #[test]
    fn typed_fields_take_precedence() {
        let mut fx = Fixture::new();
        let mut post = fx.build(vec![
            Element::with_text("title", "Typed"),
            Element::with_text("guid", "http://www.example.com/?p=1"),
        ]);
        post.item.fields.insert("Title", "from bag");
        let fields = post.to_fields(&ContentOptions::default());
        assert_eq!(fields.get_text("Title"), Some("Typed"));
        assert_eq!(fields.get_text("guid"), Some("http://www.example.com/?p=1"));
        assert_eq!(fields.get_text("status"), Some("publish"));
    }
}
