//! Per-element transform hooks.
//!
//! A [`Transform`] is looked up by the element's qualified name and applied
//! by the router before any built-in handling. Lookups for names without a
//! registration return a shared no-op, so the router never branches on
//! "is there a transform".
//!
//! # Usage
//!
//! ```rust
//! use wxr_convert_core::transform::{FieldTransform, TransformRegistry};
//!
//! let mut transforms = TransformRegistry::new();
//! transforms.register("guid", Box::new(FieldTransform::new("permalink")));
//! assert!(transforms.contains("guid"));
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::entity::EntityMut;
use crate::options::TransformSpec;
use crate::xml::Element;

/// Override hook for one XML element name.
pub trait Transform: Send + Sync {
    /// Called once per matching element, with the entity being built.
    fn apply(&self, element: &Element, entity: EntityMut<'_>) {
        let _ = (element, entity);
    }
}

/// The default transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Transform for Noop {}

static NOOP: Noop = Noop;

/// Copies the element's text into the entity's fields bag.
#[derive(Debug, Clone)]
pub struct FieldTransform {
    field: String,
}

impl FieldTransform {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl Transform for FieldTransform {
    fn apply(&self, element: &Element, mut entity: EntityMut<'_>) {
        entity
            .fields_mut()
            .insert(self.field.as_str(), element.text_content());
    }
}

/// Maps selected `wp:postmeta` keys to fields-bag entries, e.g. a plugin's
/// `seo_noindex` meta to a `noindex` field.
#[derive(Debug, Clone, Default)]
pub struct MetaTransform {
    keys: BTreeMap<String, String>,
}

impl MetaTransform {
    pub fn new(keys: BTreeMap<String, String>) -> Self {
        Self { keys }
    }

    pub fn map_key(mut self, meta_key: impl Into<String>, field: impl Into<String>) -> Self {
        self.keys.insert(meta_key.into(), field.into());
        self
    }
}

impl Transform for MetaTransform {
    fn apply(&self, element: &Element, mut entity: EntityMut<'_>) {
        if element.name != "wp:postmeta" {
            return;
        }
        let Some(key) = element.child("meta_key").map(Element::text_content) else {
            return;
        };
        if let Some(field) = self.keys.get(key.trim()) {
            let value = element
                .child("meta_value")
                .map(Element::text_content)
                .unwrap_or_default();
            entity.fields_mut().insert(field.as_str(), value);
        }
    }
}

/// Transforms keyed by qualified element name (`wp:postmeta`, `guid`, ...).
#[derive(Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, Box<dyn Transform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from configuration.
    pub fn from_specs(specs: &BTreeMap<String, TransformSpec>) -> Self {
        let mut registry = Self::new();
        for (name, spec) in specs {
            let transform: Box<dyn Transform> = match spec {
                TransformSpec::Field { field } => Box::new(FieldTransform::new(field.as_str())),
                TransformSpec::Meta { keys } => Box::new(MetaTransform::new(keys.clone())),
            };
            registry.register(name.as_str(), transform);
        }
        registry
    }

    /// Register or replace the transform for `name`.
    pub fn register(&mut self, name: impl Into<String>, transform: Box<dyn Transform>) {
        self.transforms.insert(name.into(), transform);
    }

    /// The transform for `name`, or the no-op.
    pub fn get(&self, name: &str) -> &dyn Transform {
        self.transforms
            .get(name)
            .map(|t| &**t)
            .unwrap_or(&NOOP as &dyn Transform)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Post;

    fn postmeta(key: &str, value: &str) -> Element {
        Element::new("wp:postmeta")
            .with_child(Element::with_text("wp:meta_key", key))
            .with_child(Element::with_text("wp:meta_value", value))
    }

    #[test]
    fn unregistered_names_get_the_noop() {
        let registry = TransformRegistry::new();
        let mut post = Post::default();
        registry
            .get("wp:post_id")
            .apply(&Element::with_text("wp:post_id", "1"), EntityMut::Post(&mut post));
        assert_eq!(post, Post::default());
    }

    #[test]
    fn field_transform_copies_text() {
        let mut registry = TransformRegistry::new();
        registry.register("guid", Box::new(FieldTransform::new("permalink")));
        let mut post = Post::default();
        registry
            .get("guid")
            .apply(&Element::with_text("guid", "http://x/?p=1"), EntityMut::Post(&mut post));
        assert_eq!(post.item.fields.get_text("permalink"), Some("http://x/?p=1"));
    }

    #[test]
    fn meta_transform_maps_selected_keys() {
        let transform = MetaTransform::default().map_key("seo_noindex", "noindex");
        let mut post = Post::default();
        transform.apply(&postmeta("seo_noindex", "true"), EntityMut::Post(&mut post));
        transform.apply(&postmeta("_edit_last", "1"), EntityMut::Post(&mut post));
        transform.apply(&Element::with_text("wp:meta_key", "seo_noindex"), EntityMut::Post(&mut post));
        assert_eq!(post.item.fields.get_text("noindex"), Some("true"));
        assert_eq!(post.item.fields.len(), 1);
    }

    #[test]
    fn registry_from_specs() {
        let specs = BTreeMap::from([
            (
                "guid".to_string(),
                TransformSpec::Field {
                    field: "permalink".to_string(),
                },
            ),
            (
                "wp:postmeta".to_string(),
                TransformSpec::Meta {
                    keys: BTreeMap::new(),
                },
            ),
        ]);
        let registry = TransformRegistry::from_specs(&specs);
        assert_eq!(registry.names(), vec!["guid", "wp:postmeta"]);
    }
}
