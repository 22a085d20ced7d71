//! Options consumed by the conversion core.
//!
//! These are plain `Deserialize` structs so the application layer can embed
//! them in its TOML configuration; every field has a default matching a
//! stock WordPress export.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::canonical::UrlPolicy;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertOptions {
    #[serde(default)]
    pub content: ContentOptions,
    #[serde(default)]
    pub urls: UrlPolicy,
    #[serde(default)]
    pub items: ItemOptions,
    /// Per-element transforms keyed by qualified element name
    /// (`wp:postmeta`, `dc:creator`, ...).
    #[serde(default = "default_transforms")]
    pub transforms: BTreeMap<String, TransformSpec>,
}

impl ConvertOptions {
    /// Options with the built-in transforms registered, as a config file
    /// without a `[transforms]` table would produce.
    pub fn with_defaults() -> Self {
        Self {
            transforms: default_transforms(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentOptions {
    /// Output field holding the item title.
    #[serde(default = "default_title_field")]
    pub title_field: String,
    /// Output field holding the converted body text.
    #[serde(default = "default_body_field")]
    pub body_field: String,
    /// Normalized element names never written to a bag.
    #[serde(default = "default_ignored_fields")]
    pub ignored_fields: Vec<String>,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            title_field: default_title_field(),
            body_field: default_body_field(),
            ignored_fields: default_ignored_fields(),
        }
    }
}

fn default_title_field() -> String {
    "Title".to_string()
}
fn default_body_field() -> String {
    "Text".to_string()
}
fn default_ignored_fields() -> Vec<String> {
    ["comment", "password", "is_sticky"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemOptions {
    /// Plugin post types skipped without a diagnostic.
    #[serde(default = "default_discard")]
    pub discard: Vec<String>,
    /// Post types left to a dedicated converter; counted, then skipped.
    #[serde(default = "default_delegate")]
    pub delegate: Vec<String>,
}

impl Default for ItemOptions {
    fn default() -> Self {
        Self {
            discard: default_discard(),
            delegate: default_delegate(),
        }
    }
}

fn default_discard() -> Vec<String> {
    [
        "display_type",
        "wooframework",
        "ngg_pictures",
        "ngg_gallery",
        "gal_display_source",
        "slide",
        "lightbox_library",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
fn default_delegate() -> Vec<String> {
    vec!["nav_menu_item".to_string()]
}

/// A transform declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSpec {
    /// Copy the element's text into the item's fields bag under `field`.
    Field { field: String },
    /// Map `wp:postmeta` keys to fields-bag entries.
    Meta {
        #[serde(default)]
        keys: BTreeMap<String, String>,
    },
}

fn default_transforms() -> BTreeMap<String, TransformSpec> {
    let keys = [("seo_noindex", "noindex"), ("seo_follow", "follow")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    BTreeMap::from([("wp:postmeta".to_string(), TransformSpec::Meta { keys })])
}
