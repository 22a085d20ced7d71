//! Uploaded files (`wp:post_type` `attachment`).

use super::item::{HasItem, Item};
use super::post::{self, put, HasPost, Post};
use super::{BagKind, Entity, EntityKind, EntityMut};
use crate::bag::Bag;
use crate::canonical::{path_of, UrlParts};
use crate::diagnostics::DiagnosticKind;
use crate::error::SchemaError;
use crate::metadata::AttachmentMetadata;
use crate::options::ContentOptions;
use crate::router::FieldContext;
use crate::schema::{Schema, SchemaBuilder, Schemas};
use crate::xml::Element;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attachment {
    pub post: Post,
    /// `wp:attachment_url` with the site URL stripped, e.g.
    /// `/wp-content/uploads/2020/01/img.jpg`. Files on other hosts keep
    /// their full URL.
    pub url: String,
    /// `wp:attachment_url`, canonicalized but not stripped.
    pub source_url: String,
    /// `_wp_attachment_image_alt`.
    pub alt: String,
    /// `_wp_attachment_metadata`; `None` if absent or undecodable.
    pub metadata: Option<AttachmentMetadata>,
    /// The id came from a legacy `?attachment_id=` link and is not
    /// overwritten by `wp:post_id`.
    id_from_query: bool,
}

impl Attachment {
    pub fn id(&self) -> u64 {
        self.post.item.id
    }

    pub fn to_fields(&self, options: &ContentOptions) -> Bag {
        let mut bag = self.post.typed_fields(options);
        put(&mut bag, "url", &self.url);
        put(&mut bag, "source_url", &self.source_url);
        put(&mut bag, "alt", &self.alt);
        if let Some(metadata) = &self.metadata {
            bag.insert("metadata", metadata.to_bag());
        }
        bag.merge_missing(&self.post.item.fields);
        bag
    }
}

impl HasItem for Attachment {
    fn item(&self) -> &Item {
        &self.post.item
    }

    fn item_mut(&mut self) -> &mut Item {
        &mut self.post.item
    }
}

impl HasPost for Attachment {
    fn post(&self) -> &Post {
        &self.post
    }

    fn post_mut(&mut self) -> &mut Post {
        &mut self.post
    }

    /// A legacy `?attachment_id=N` URL fixes the id and the path; anything
    /// else derives the path the way posts do.
    fn derive_filepath(&mut self, url: &str) {
        let parts = UrlParts::split(url);
        let attachment_id = parts.query.and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "attachment_id")
                .and_then(|(_, value)| value.parse::<u64>().ok())
        });
        match attachment_id {
            Some(id) => {
                self.post.item.id = id;
                self.id_from_query = true;
                self.post.filepath = match parts.path {
                    "/" => String::new(),
                    path => path.to_string(),
                };
            }
            None => self.post.filepath = path_of(url).to_string(),
        }
    }
}

impl Entity for Attachment {
    const KIND: EntityKind = EntityKind::Attachment;

    fn schema(schemas: &Schemas) -> &Schema<Self> {
        &schemas.attachment
    }

    fn as_entity_mut(&mut self) -> EntityMut<'_> {
        EntityMut::Attachment(self)
    }

    fn bag_mut(&mut self, bag: BagKind) -> &mut Bag {
        match bag {
            BagKind::Fields => &mut self.post.item.fields,
            BagKind::Data => &mut self.post.item.data,
            BagKind::Meta => &mut self.post.meta,
        }
    }

    fn subject(&self) -> String {
        format!("attachment #{}", self.post.item.id)
    }
}

pub(crate) fn schema() -> Result<Schema<Attachment>, SchemaError> {
    post::with_post_handlers(SchemaBuilder::new("attachment", "^(post|attachment)_?"))
        .handler("id", id)
        .handler("url", url)
        .handler("attached_file", attached_file)
        .handler("metadata", metadata)
        .handler("image_alt", image_alt)
        .property("status", |a: &mut Attachment, v| a.post.status = v.trim().to_string())
        .build()
}

fn id(attachment: &mut Attachment, element: &Element, cx: &mut FieldContext<'_>) {
    if attachment.id_from_query {
        return;
    }
    post::id(attachment, element, cx);
}

/// Canonicalize, then strip the site URL so only the upload path remains.
fn url(attachment: &mut Attachment, element: &Element, cx: &mut FieldContext<'_>) {
    let canonical = cx.canonicalizer.canonicalize(element.text_content().trim());
    attachment.url = strip_site_url(&canonical, &cx.site_url).to_string();
    attachment.source_url = canonical;
}

fn strip_site_url<'u>(url: &'u str, site_url: &str) -> &'u str {
    if site_url.is_empty() {
        return url;
    }
    match url.strip_prefix(site_url) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => url,
    }
}

/// `_wp_attached_file`: upload-relative path.
fn attached_file(attachment: &mut Attachment, element: &Element, _cx: &mut FieldContext<'_>) {
    attachment.derive_filepath(element.text_content().trim());
}

/// `_wp_attachment_metadata`: a failed decode leaves the field unset.
fn metadata(attachment: &mut Attachment, element: &Element, cx: &mut FieldContext<'_>) {
    match AttachmentMetadata::decode(&element.text_content()) {
        Ok(decoded) => attachment.metadata = Some(decoded),
        Err(e) => {
            attachment.metadata = None;
            cx.diagnostics.push(
                DiagnosticKind::MalformedMetadata,
                attachment.subject(),
                format!("attachment metadata not decoded: {}", e),
            );
        }
    }
}

fn image_alt(attachment: &mut Attachment, element: &Element, _cx: &mut FieldContext<'_>) {
    attachment.alt = element.text_content().trim().to_string();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{Canonicalizer, SiteContext, UrlPolicy};
    use crate::diagnostics::Diagnostics;
    use crate::markup::PlainText;
    use crate::router::Blueprints;
    use crate::transform::TransformRegistry;

    fn build(children: Vec<Element>, diagnostics: &mut Diagnostics) -> Attachment {
        let schemas = Schemas::build().unwrap();
        let transforms = TransformRegistry::new();
        let blueprints = Blueprints::new();
        let mut cx = FieldContext::new(
            Canonicalizer::new(
                SiteContext::from_link("http://www.example.com"),
                UrlPolicy::default(),
            ),
            &PlainText,
            &blueprints,
            diagnostics,
            &schemas,
            &transforms,
            &[],
        );
        cx.site_url = "http://www.example.com".to_string();
        let mut attachment = Attachment::default();
        for child in &children {
            cx.route(&mut attachment, child, BagKind::Fields);
        }
        attachment
    }

    fn postmeta(key: &str, value: &str) -> Element {
        Element::new("wp:postmeta")
            .with_child(Element::with_text("wp:meta_key", key))
            .with_child(Element::with_text("wp:meta_value", value))
    }

    #[test]
    fn attachment_url_is_stripped_to_upload_path() {
        let mut diagnostics = Diagnostics::new();
        let attachment = build(
            vec![Element::with_text(
                "wp:attachment_url",
                "http://www.example.com/wp-content/uploads/2020/01/img.jpg",
            )],
            &mut diagnostics,
        );
        assert_eq!(attachment.url, "/wp-content/uploads/2020/01/img.jpg");
        assert_eq!(
            attachment.source_url,
            "http://www.example.com/wp-content/uploads/2020/01/img.jpg"
        );
    }

    #[test]
    fn foreign_urls_are_kept_whole() {
        assert_eq!(
            strip_site_url("http://cdn.other.org/a.jpg", "http://www.example.com"),
            "http://cdn.other.org/a.jpg"
        );
        assert_eq!(
            strip_site_url("http://www.example.com.evil.org/a.jpg", "http://www.example.com"),
            "http://www.example.com.evil.org/a.jpg"
        );
    }

    #[test]
    fn legacy_attachment_id_wins_over_post_id() {
        let mut diagnostics = Diagnostics::new();
        let attachment = build(
            vec![
                Element::with_text("link", "http://www.example.com/?attachment_id=5"),
                Element::with_text("wp:post_id", "77"),
            ],
            &mut diagnostics,
        );
        assert_eq!(attachment.id(), 5);
        assert_eq!(attachment.post.filepath, "");
    }

    #[test]
    fn query_without_attachment_id_uses_the_path() {
        let mut diagnostics = Diagnostics::new();
        let attachment = build(
            vec![
                Element::with_text("link", "http://www.example.com/gallery/img/?replytocom=3"),
                Element::with_text("wp:post_id", "9"),
            ],
            &mut diagnostics,
        );
        assert_eq!(attachment.id(), 9);
        assert_eq!(attachment.post.filepath, "/gallery/img/");
    }

    #[test]
    fn meta_keys_route_to_attachment_fields() {
        let mut diagnostics = Diagnostics::new();
        let attachment = build(
            vec![
                postmeta("_wp_attached_file", "2020/01/img.jpg"),
                postmeta("_wp_attachment_image_alt", "A sunset"),
                postmeta(
                    "_wp_attachment_metadata",
                    r#"a:2:{s:5:"width";i:640;s:6:"height";i:480;}"#,
                ),
            ],
            &mut diagnostics,
        );
        assert_eq!(attachment.post.filepath, "2020/01/img.jpg");
        assert_eq!(attachment.alt, "A sunset");
        let metadata = attachment.metadata.as_ref().unwrap();
        assert_eq!((metadata.width, metadata.height), (Some(640), Some(480)));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn malformed_metadata_is_a_diagnostic() {
        let mut diagnostics = Diagnostics::new();
        let attachment = build(
            vec![
                Element::with_text("wp:post_id", "7"),
                postmeta("_wp_attachment_metadata", "a:2:{s:5:\"width\";"),
            ],
            &mut diagnostics,
        );
        assert!(attachment.metadata.is_none());
        assert_eq!(diagnostics.count(DiagnosticKind::MalformedMetadata), 1);
        assert_eq!(diagnostics.iter().next().unwrap().subject, "attachment #7");
    }
}
