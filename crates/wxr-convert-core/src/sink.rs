//! Output seam: converted entities are handed to an [`EntitySink`] one by
//! one. Writing files (or anything else) is the sink's business.

use anyhow::Result;

use crate::bag::Bag;
use crate::entity::{Author, EntityKind};

/// One entity as seen by a sink.
#[derive(Debug, Clone)]
pub struct EntityRecord<'a> {
    pub kind: EntityKind,
    /// Registry key: post id, attachment id, author username, or `site`.
    pub key: String,
    /// Output path for posts and attachments; `None` otherwise.
    pub path: Option<&'a str>,
    /// Field map: typed properties first, then unmapped elements.
    pub fields: Bag,
    /// Resolved `dc:creator`; `None` if unset or not in the directory.
    pub creator: Option<&'a Author>,
    /// Parent id, if the parent is itself a registered entity.
    pub parent: Option<u64>,
}

pub trait EntitySink {
    fn accept(&mut self, record: EntityRecord<'_>) -> Result<()>;
}

impl<S: EntitySink + ?Sized> EntitySink for &mut S {
    fn accept(&mut self, record: EntityRecord<'_>) -> Result<()> {
        (**self).accept(record)
    }
}
