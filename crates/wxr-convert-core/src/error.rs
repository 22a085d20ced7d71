//! Fatal error types for the conversion core.
//!
//! Only problems that make the whole run meaningless surface as [`WxrError`].
//! Everything recoverable (unknown post types, unresolved authors, broken
//! attachment metadata) is reported through
//! [`Diagnostics`](crate::diagnostics::Diagnostics) instead.

use thiserror::Error;

/// A failure that aborts the conversion before any entity is registered.
#[derive(Debug, Error)]
pub enum WxrError {
    /// The document is not well-formed XML.
    #[error("malformed XML at byte {position}: {message}")]
    Xml { position: u64, message: String },

    /// The document parsed but contains no `<channel>` element.
    #[error("document has no <channel> element")]
    MissingChannel,

    /// A converter may only walk one document.
    #[error("converter already holds a converted document")]
    AlreadyConverted,

    /// A per-type field schema failed validation while the converter was built.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// A field schema that cannot be used for routing.
///
/// Raised once, when the handler tables are built, never per element.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{schema}: invalid prefix pattern '{pattern}': {message}")]
    Pattern {
        schema: &'static str,
        pattern: &'static str,
        message: String,
    },

    #[error("{schema}: prefix pattern '{pattern}' must be anchored with '^'")]
    Unanchored {
        schema: &'static str,
        pattern: &'static str,
    },

    #[error("{schema}: field '{field}' is declared twice")]
    Duplicate {
        schema: &'static str,
        field: &'static str,
    },

    #[error("{schema}: field '{field}' is both a handler and a typed property")]
    Conflict {
        schema: &'static str,
        field: &'static str,
    },

    #[error("{schema}: field '{field}' is not a normalized name and can never be routed")]
    Unreachable {
        schema: &'static str,
        field: &'static str,
    },
}
