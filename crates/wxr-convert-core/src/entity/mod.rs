//! The entity hierarchy populated by the router.
//!
//! ```text
//! Item ──┬── Channel
//!        └── Post ── Attachment        Author (standalone)
//! ```
//!
//! "Extends" is composition: a [`Post`] holds an [`Item`], an
//! [`Attachment`] holds a [`Post`]. Shared handlers are generic over the
//! [`HasItem`] / [`HasPost`] accessors so each schema can reuse them.

pub mod attachment;
pub mod author;
pub mod channel;
pub mod item;
pub mod post;

pub use attachment::Attachment;
pub use author::Author;
pub use channel::Channel;
pub use item::{HasItem, Item};
pub use post::{HasPost, Markup, Post};

use serde::Serialize;
use std::fmt;

use crate::bag::Bag;
use crate::schema::{Schema, Schemas};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Channel,
    Author,
    Post,
    Attachment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Channel => "channel",
            EntityKind::Author => "author",
            EntityKind::Post => "post",
            EntityKind::Attachment => "attachment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which open bag receives unmapped elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BagKind {
    /// Custom fields; the default for item children.
    Fields,
    /// Miscellaneous extracted values (favicon, inline links).
    Data,
    /// Decoded `wp:postmeta` pairs. Entities without a meta bag use fields.
    Meta,
}

/// Mutable view of any entity, as handed to transforms.
#[derive(Debug)]
pub enum EntityMut<'a> {
    Channel(&'a mut Channel),
    Author(&'a mut Author),
    Post(&'a mut Post),
    Attachment(&'a mut Attachment),
}

impl EntityMut<'_> {
    /// The entity's custom fields bag.
    pub fn fields_mut(&mut self) -> &mut Bag {
        match self {
            EntityMut::Channel(c) => &mut c.item.fields,
            EntityMut::Author(a) => &mut a.fields,
            EntityMut::Post(p) => &mut p.item.fields,
            EntityMut::Attachment(a) => &mut a.post.item.fields,
        }
    }

    /// The `data` bag; authors have none and get their fields bag.
    pub fn data_mut(&mut self) -> &mut Bag {
        match self {
            EntityMut::Channel(c) => &mut c.item.data,
            EntityMut::Author(a) => &mut a.fields,
            EntityMut::Post(p) => &mut p.item.data,
            EntityMut::Attachment(a) => &mut a.post.item.data,
        }
    }

    pub fn as_post_mut(&mut self) -> Option<&mut Post> {
        match self {
            EntityMut::Post(p) => Some(p),
            EntityMut::Attachment(a) => Some(&mut a.post),
            _ => None,
        }
    }
}

/// An entity type the router can populate.
pub trait Entity: Sized {
    const KIND: EntityKind;

    fn schema(schemas: &Schemas) -> &Schema<Self>;

    fn as_entity_mut(&mut self) -> EntityMut<'_>;

    fn bag_mut(&mut self, bag: BagKind) -> &mut Bag;

    /// Short label for diagnostics, e.g. `post #42`.
    fn subject(&self) -> String;
}
