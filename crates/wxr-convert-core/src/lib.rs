//! # WXR Convert Core
//!
//! The conversion pipeline for WordPress eXtended RSS exports: element
//! tree, per-type field schemas, the field router, the entity hierarchy,
//! transforms, and URL canonicalization.
//!
//! This crate does no file I/O and has no CLI. It turns one WXR document
//! into registered entities and hands them, one at a time, to an
//! [`EntitySink`](sink::EntitySink).
//!
//! ```text
//! WXR XML ─► xml::parse_document ─► walker ─┬─ channel ─► Channel
//!                                           ├─ wp:author ─► Author
//!                                           └─ item ─► Post | Attachment
//!                                                  │
//!                        router::FieldContext::route (per child element)
//!                          transform → handler | property | bag
//! ```

pub mod bag;
pub mod canonical;
pub mod converter;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod markup;
pub mod metadata;
pub mod options;
pub mod router;
pub mod schema;
pub mod sink;
pub mod transform;
pub mod walker;
pub mod xml;

pub use converter::{ConversionSummary, Converter};
pub use error::{SchemaError, WxrError};
