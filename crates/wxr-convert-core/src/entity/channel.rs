//! Site-level metadata from the `<channel>` element.

use std::collections::BTreeMap;

use super::item::{self, HasItem, Item};
use super::post::put;
use super::{BagKind, Entity, EntityKind, EntityMut};
use crate::bag::Bag;
use crate::canonical::{Canonicalizer, SiteContext};
use crate::error::SchemaError;
use crate::options::ContentOptions;
use crate::router::FieldContext;
use crate::schema::{Schema, SchemaBuilder, Schemas};
use crate::xml::Element;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Channel {
    pub item: Item,
    /// Host context from `<link>`; `None` when the link has no usable host.
    pub site: Option<SiteContext>,
    /// `wp:base_site_url`, canonicalized.
    pub site_url: String,
    /// `wp:base_blog_url`, canonicalized.
    pub blog_url: String,
    pub language: String,
    pub wxr_version: String,
    /// Output path → blueprint name, collected from page templates.
    pub blueprints: BTreeMap<String, String>,
}

impl Channel {
    pub fn host(&self) -> Option<&str> {
        self.site.as_ref().map(SiteContext::host)
    }

    pub fn to_fields(&self, options: &ContentOptions) -> Bag {
        let mut bag = Bag::new();
        put(&mut bag, &options.title_field, &self.item.title);
        put(&mut bag, "link", &self.item.link);
        put(&mut bag, "site_url", &self.site_url);
        put(&mut bag, "blog_url", &self.blog_url);
        if let Some(host) = self.host() {
            bag.insert("host", host);
        }
        put(&mut bag, "language", &self.language);
        put(&mut bag, "description", &self.item.description);
        put(&mut bag, "wxr_version", &self.wxr_version);
        bag.merge_missing(&self.item.data);
        if !self.blueprints.is_empty() {
            bag.insert(
                "blueprints",
                self.blueprints
                    .iter()
                    .map(|(path, name)| (path.as_str(), name.as_str()))
                    .collect::<Bag>(),
            );
        }
        bag.merge_missing(&self.item.fields);
        bag
    }
}

impl HasItem for Channel {
    fn item(&self) -> &Item {
        &self.item
    }

    fn item_mut(&mut self) -> &mut Item {
        &mut self.item
    }
}

impl Entity for Channel {
    const KIND: EntityKind = EntityKind::Channel;

    fn schema(schemas: &Schemas) -> &Schema<Self> {
        &schemas.channel
    }

    fn as_entity_mut(&mut self) -> EntityMut<'_> {
        EntityMut::Channel(self)
    }

    fn bag_mut(&mut self, bag: BagKind) -> &mut Bag {
        match bag {
            BagKind::Data => &mut self.item.data,
            BagKind::Fields | BagKind::Meta => &mut self.item.fields,
        }
    }

    fn subject(&self) -> String {
        "channel".to_string()
    }
}

pub(crate) fn schema() -> Result<Schema<Channel>, SchemaError> {
    SchemaBuilder::new("channel", "^base_")
        .handler("title", item::title::<Channel>)
        .handler("link", link)
        .handler("site_url", site_url)
        .handler("blog_url", blog_url)
        .handler("image", image)
        .property("description", |c: &mut Channel, v| c.item.description = v)
        .property("language", |c: &mut Channel, v| c.language = v.trim().to_string())
        .property("wxr_version", |c: &mut Channel, v| c.wxr_version = v.trim().to_string())
        .build()
}

/// The channel link fixes the site context every later URL is judged by.
fn link(channel: &mut Channel, element: &Element, cx: &mut FieldContext<'_>) {
    let raw = element.text_content();
    channel.site = SiteContext::from_link(&raw);
    cx.canonicalizer = Canonicalizer::new(channel.site.clone(), cx.canonicalizer.policy());
    channel.item.link = cx.canonicalizer.canonicalize(raw.trim());
}

fn site_url(channel: &mut Channel, element: &Element, cx: &mut FieldContext<'_>) {
    channel.site_url = cx.canonicalizer.canonicalize(element.text_content().trim());
}

fn blog_url(channel: &mut Channel, element: &Element, cx: &mut FieldContext<'_>) {
    channel.blog_url = cx.canonicalizer.canonicalize(element.text_content().trim());
}

/// `<image><url>` is the site icon.
fn image(channel: &mut Channel, element: &Element, cx: &mut FieldContext<'_>) {
    if let Some(url) = element.child("url") {
        let favicon = cx.canonicalizer.canonicalize(url.text_content().trim());
        if !favicon.is_empty() {
            channel.item.data.insert("favicon", favicon);
        }
    }
}
