//! Entity field routing.
//!
//! [`FieldContext::route`] maps one XML child element onto exactly one
//! handler, typed property or bag entry of the target entity. The element's
//! transform (a no-op unless one is registered for its qualified name) runs
//! first, once per occurrence, whatever the routing outcome.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::canonical::Canonicalizer;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::entity::{BagKind, Entity};
use crate::markup::MarkupConverter;
use crate::schema::Schemas;
use crate::transform::TransformRegistry;
use crate::xml::Element;

/// What [`FieldContext::route`] did with an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// No text and no children; nothing was called or written.
    Skipped,
    Handler,
    Property,
    Ignored,
    Bag,
}

/// Logical field name of an element: the local name, except for
/// `*:encoded` where the namespace prefix names the field
/// (`content:encoded` → `content`).
pub fn logical_name(element: &Element) -> &str {
    match (element.local_name(), element.prefix()) {
        ("encoded", Some(prefix)) => prefix,
        (local, _) => local,
    }
}

/// Output path → blueprint name, filled by posts carrying a page template.
#[derive(Debug, Default)]
pub struct Blueprints {
    table: Mutex<BTreeMap<String, String>>,
}

impl Blueprints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, path: &str, blueprint: &str) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        table.insert(path.to_string(), blueprint.to_string());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        let table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        table.get(path).cloned()
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.table.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

/// Shared, read-mostly state handed to every field handler.
pub struct FieldContext<'a> {
    /// Replaced once the channel link has established the site context.
    pub canonicalizer: Canonicalizer,
    /// Canonical site URL without trailing slash; empty until the channel
    /// pass is done.
    pub site_url: String,
    pub markup: &'a dyn MarkupConverter,
    pub blueprints: &'a Blueprints,
    pub diagnostics: &'a mut Diagnostics,
    schemas: &'a Schemas,
    transforms: &'a TransformRegistry,
    ignored: &'a [String],
}

impl<'a> FieldContext<'a> {
    pub fn new(
        canonicalizer: Canonicalizer,
        markup: &'a dyn MarkupConverter,
        blueprints: &'a Blueprints,
        diagnostics: &'a mut Diagnostics,
        schemas: &'a Schemas,
        transforms: &'a TransformRegistry,
        ignored: &'a [String],
    ) -> Self {
        Self {
            canonicalizer,
            site_url: String::new(),
            markup,
            blueprints,
            diagnostics,
            schemas,
            transforms,
            ignored,
        }
    }

    /// Route one element onto `entity`. Unmapped names land in `bag`.
    pub fn route<E: Entity>(&mut self, entity: &mut E, element: &Element, bag: BagKind) -> Routed {
        if element.is_empty() {
            return Routed::Skipped;
        }

        self.transforms
            .get(&element.name)
            .apply(element, entity.as_entity_mut());

        let schemas: &'a Schemas = self.schemas;
        let schema = E::schema(schemas);
        let name = schema.normalize(logical_name(element));

        if let Some(handler) = schema.handler(&name) {
            handler(entity, element, self);
            return Routed::Handler;
        }
        if let Some(setter) = schema.property(&name) {
            setter(entity, element.text_content());
            return Routed::Property;
        }
        if self.ignored.iter().any(|ignored| *ignored == name) {
            return Routed::Ignored;
        }
        entity.bag_mut(bag).insert(name, element.text_content());
        Routed::Bag
    }

    /// Record an unparseable scalar.
    pub fn invalid_value(&mut self, subject: String, field: &str, value: &str) {
        self.diagnostics.push(
            DiagnosticKind::InvalidValue,
            subject,
            format!("invalid {} '{}'", field, value),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Post;
    use crate::markup::PlainText;

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
                ignored: vec!["password".to_string()],
            }
        }

        fn route(&mut self, post: &mut Post, element: &Element) -> Routed {
            let mut cx = FieldContext::new(
                Canonicalizer::default(),
                &PlainText,
                &self.blueprints,
                &mut self.diagnostics,
                &self.schemas,
                &self.transforms,
                &self.ignored,
            );
            cx.route(post, element, BagKind::Fields)
        }
    }

    #[test]
    fn logical_name_uses_prefix_for_encoded() {
        assert_eq!(logical_name(&Element::new("content:encoded")), "content");
        assert_eq!(logical_name(&Element::new("excerpt:encoded")), "excerpt");
        assert_eq!(logical_name(&Element::new("wp:post_id")), "post_id");
        assert_eq!(logical_name(&Element::new("encoded")), "encoded");
    }

    #[test]
    fn routes_handler_property_bag_and_ignored() {
        let mut fx = Fixture::new();
        let mut post = Post::default();

        let routed = fx.route(&mut post, &Element::with_text("wp:post_id", "42"));
        assert_eq!(routed, Routed::Handler);
        assert_eq!(post.item.id, 42);

        let routed = fx.route(&mut post, &Element::with_text("wp:status", "draft"));
        assert_eq!(routed, Routed::Property);
        assert_eq!(post.status, "draft");

        let routed = fx.route(&mut post, &Element::with_text("guid", "http://x/?p=42"));
        assert_eq!(routed, Routed::Bag);
        assert_eq!(post.item.fields.get_text("guid"), Some("http://x/?p=42"));

        let routed = fx.route(&mut post, &Element::with_text("wp:post_password", "s3cret"));
        assert_eq!(routed, Routed::Ignored);
        assert!(!post.item.fields.contains_key("password"));
    }

    #[test]
    fn empty_elements_are_skipped() {
        let mut fx = Fixture::new();
        let mut post = Post::default();
        assert_eq!(fx.route(&mut post, &Element::new("wp:post_id")), Routed::Skipped);
        assert_eq!(fx.route(&mut post, &Element::new("wp:menu_order")), Routed::Skipped);
        assert_eq!(post.item.id, 0);
        assert!(post.item.fields.is_empty());
    }

    #[test]
    fn typed_property_wins_over_bag() {
        let mut fx = Fixture::new();
        let mut post = Post::default();
        fx.route(&mut post, &Element::with_text("wp:post_status", "private"));
        assert_eq!(post.status, "private");
        assert!(!post.item.fields.contains_key("status"));
    }

    #[test]
    fn blueprints_table() {
        let blueprints = Blueprints::new();
        blueprints.register("/about/", "landing");
        assert_eq!(blueprints.get("/about/").as_deref(), Some("landing"));
        assert_eq!(blueprints.into_inner().len(), 1);
    }
}
