//! Per-entity-type field schemas.
//!
//! A [`Schema`] is the explicit lookup table the router consults: the
//! type's prefix-stripping pattern, its field handlers, and its typed
//! properties. Tables are built and validated once, when the
//! [`Converter`](crate::converter::Converter) is constructed.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::entity::{Attachment, Author, Channel, Post};
use crate::error::SchemaError;
use crate::router::FieldContext;
use crate::xml::Element;

static RE_WP_INTERNAL: OnceLock<Regex> = OnceLock::new();

/// Field handler: receives the raw element and may re-enter the router.
pub type Handler<E> = fn(&mut E, &Element, &mut FieldContext<'_>);

/// Typed property setter: receives the element's text content.
pub type Setter<E> = fn(&mut E, String);

pub struct Schema<E> {
    name: &'static str,
    prefix: Regex,
    handlers: HashMap<&'static str, Handler<E>>,
    properties: HashMap<&'static str, Setter<E>>,
}

impl<E> Schema<E> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Strip the WordPress-internal `_wp_` prefix, then the type prefix.
    /// A name that would become empty is kept as is.
    pub fn normalize(&self, name: &str) -> String {
        let wp = RE_WP_INTERNAL.get_or_init(|| Regex::new(r"^_wp_?").unwrap());
        let name = wp.replace(name, "");
        let stripped = self.prefix.replace(&name, "");
        if stripped.is_empty() {
            name.into_owned()
        } else {
            stripped.into_owned()
        }
    }

    pub fn handler(&self, name: &str) -> Option<Handler<E>> {
        self.handlers.get(name).copied()
    }

    pub fn property(&self, name: &str) -> Option<Setter<E>> {
        self.properties.get(name).copied()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.handlers.contains_key(name) || self.properties.contains_key(name)
    }
}

impl<E> std::fmt::Debug for Schema<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        handlers.sort();
        let mut properties: Vec<_> = self.properties.keys().collect();
        properties.sort();
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("prefix", &self.prefix.as_str())
            .field("handlers", &handlers)
            .field("properties", &properties)
            .finish()
    }
}

pub struct SchemaBuilder<E> {
    name: &'static str,
    pattern: &'static str,
    handlers: Vec<(&'static str, Handler<E>)>,
    properties: Vec<(&'static str, Setter<E>)>,
}

impl<E> SchemaBuilder<E> {
    /// `pattern` must be anchored (`^post_?`), it is applied to the
    /// element's local name after `_wp_` is removed.
    pub fn new(name: &'static str, pattern: &'static str) -> Self {
        Self {
            name,
            pattern,
            handlers: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn handler(mut self, field: &'static str, handler: Handler<E>) -> Self {
        self.handlers.push((field, handler));
        self
    }

    pub fn property(mut self, field: &'static str, setter: Setter<E>) -> Self {
        self.properties.push((field, setter));
        self
    }

    pub fn build(self) -> Result<Schema<E>, SchemaError> {
        if !self.pattern.starts_with('^') {
            return Err(SchemaError::Unanchored {
                schema: self.name,
                pattern: self.pattern,
            });
        }
        let prefix = Regex::new(self.pattern).map_err(|e| SchemaError::Pattern {
            schema: self.name,
            pattern: self.pattern,
            message: e.to_string(),
        })?;

        let mut schema = Schema {
            name: self.name,
            prefix,
            handlers: HashMap::new(),
            properties: HashMap::new(),
        };

        for (field, handler) in self.handlers {
            if schema.handlers.insert(field, handler).is_some() {
                return Err(SchemaError::Duplicate {
                    schema: self.name,
                    field,
                });
            }
        }
        for (field, setter) in self.properties {
            if schema.handlers.contains_key(field) {
                return Err(SchemaError::Conflict {
                    schema: self.name,
                    field,
                });
            }
            if schema.properties.insert(field, setter).is_some() {
                return Err(SchemaError::Duplicate {
                    schema: self.name,
                    field,
                });
            }
        }

        let names: Vec<&'static str> = schema
            .handlers
            .keys()
            .chain(schema.properties.keys())
            .copied()
            .collect();
        for field in names {
            if schema.normalize(field) != field {
                return Err(SchemaError::Unreachable {
                    schema: self.name,
                    field,
                });
            }
        }

        Ok(schema)
    }
}

/// The four built-in tables, one per entity type.
#[derive(Debug)]
pub struct Schemas {
    pub channel: Schema<Channel>,
    pub author: Schema<Author>,
    pub post: Schema<Post>,
    pub attachment: Schema<Attachment>,
}

impl Schemas {
    pub fn build() -> Result<Self, SchemaError> {
        Ok(Self {
            channel: crate::entity::channel::schema()?,
            author: crate::entity::author::schema()?,
            post: crate::entity::post::schema()?,
            attachment: crate::entity::attachment::schema()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        value: String,
    }

    fn noop(_: &mut Probe, _: &Element, _: &mut FieldContext<'_>) {}

    #[test]
    fn normalizes_type_and_internal_prefixes() {
        let schema = SchemaBuilder::<Probe>::new("post", "^(post|page)_?")
            .build()
            .unwrap();
        assert_eq!(schema.normalize("post_id"), "id");
        assert_eq!(schema.normalize("page_id"), "id");
        assert_eq!(schema.normalize("postmeta"), "meta");
        assert_eq!(schema.normalize("_wp_page_template"), "template");
        assert_eq!(schema.normalize("_wp_attached_file"), "attached_file");
        assert_eq!(schema.normalize("pubDate"), "pubDate");
        assert_eq!(schema.normalize("post"), "post");
    }

    #[test]
    fn rejects_duplicates_and_conflicts() {
        let err = SchemaBuilder::<Probe>::new("probe", "^probe_")
            .handler("id", noop)
            .handler("id", noop)
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::Duplicate { schema: "probe", field: "id" });

        let err = SchemaBuilder::<Probe>::new("probe", "^probe_")
            .handler("title", noop)
            .property("title", |p: &mut Probe, v| p.value = v)
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::Conflict { schema: "probe", field: "title" });
    }

    #[test]
    fn rejects_unnormalized_names() {
        let err = SchemaBuilder::<Probe>::new("post", "^(post|page)_?")
            .property("post_status", |p: &mut Probe, v| p.value = v)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::Unreachable {
                schema: "post",
                field: "post_status"
            }
        );
    }

    #[test]
    fn rejects_bad_patterns() {
        assert!(matches!(
            SchemaBuilder::<Probe>::new("probe", "post_").build(),
            Err(SchemaError::Unanchored { .. })
        ));
        assert!(matches!(
            SchemaBuilder::<Probe>::new("probe", "^(post").build(),
            Err(SchemaError::Pattern { .. })
        ));
    }

    #[test]
    fn builtin_schemas_are_valid() {
        let schemas = Schemas::build().unwrap();
        assert!(schemas.post.has_field("content"));
        assert!(schemas.attachment.has_field("metadata"));
        assert!(schemas.author.has_field("display_name"));
        assert!(schemas.channel.has_field("site_url"));
        assert_eq!(schemas.attachment.normalize("attachment_url"), "url");
        assert_eq!(schemas.author.normalize("author_login"), "login");
        assert_eq!(schemas.channel.normalize("base_blog_url"), "blog_url");
    }
}
