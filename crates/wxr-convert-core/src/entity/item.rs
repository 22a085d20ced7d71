//! Base fields shared by channels, posts and attachments.

use crate::bag::Bag;
use crate::markup::escape_special_chars;
use crate::router::FieldContext;
use crate::xml::Element;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    /// `wp:post_id`; 0 until seen.
    pub id: u64,
    pub title: String,
    /// Canonicalized `<link>`.
    pub link: String,
    /// `wp:post_type` as found.
    pub kind: String,
    pub description: String,
    /// Extracted values: favicon, inline `links`/`images`/`sources`.
    pub data: Bag,
    /// Elements with no typed counterpart.
    pub fields: Bag,
}

pub trait HasItem {
    fn item(&self) -> &Item;
    fn item_mut(&mut self) -> &mut Item;
}

impl HasItem for Item {
    fn item(&self) -> &Item {
        self
    }

    fn item_mut(&mut self) -> &mut Item {
        self
    }
}

/// `<title>`: HTML special chars escaped, existing entities kept.
pub fn title<E: HasItem>(entity: &mut E, element: &Element, _cx: &mut FieldContext<'_>) {
    entity.item_mut().title = escape_special_chars(element.text_content().trim());
}

/// `<link>`: canonicalized under the site policy.
pub fn link<E: HasItem>(entity: &mut E, element: &Element, cx: &mut FieldContext<'_>) {
    entity.item_mut().link = cx.canonicalizer.canonicalize(element.text_content().trim());
}

/// `wp:post_type`.
pub fn kind<E: HasItem>(entity: &mut E, element: &Element, _cx: &mut FieldContext<'_>) {
    entity.item_mut().kind = element.text_content().trim().to_string();
}
