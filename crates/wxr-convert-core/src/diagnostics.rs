//! The single channel for recoverable conversion problems.
//!
//! Every non-fatal issue (unknown post type, unresolved author, malformed
//! attachment metadata, missing site host) is pushed here and logged at
//! `warn` level; the walk itself never stops for them.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// `wp:post_type` not handled and not on the discard list.
    UnknownPostType,
    /// An `<item>` without `wp:post_type`.
    MissingPostType,
    /// `dc:creator` names a user with no `wp:author` entry.
    UnresolvedAuthor,
    /// A serialized value (attachment metadata) could not be decoded.
    MalformedMetadata,
    /// The channel link has no usable host; URLs are left unrewritten.
    InvalidSiteHost,
    /// `wp:wxr_version` is not the supported 1.2.
    UnsupportedVersion,
    /// A numeric field or similar scalar could not be parsed.
    InvalidValue,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnknownPostType => "unknown_post_type",
            DiagnosticKind::MissingPostType => "missing_post_type",
            DiagnosticKind::UnresolvedAuthor => "unresolved_author",
            DiagnosticKind::MalformedMetadata => "malformed_metadata",
            DiagnosticKind::InvalidSiteHost => "invalid_site_host",
            DiagnosticKind::UnsupportedVersion => "unsupported_version",
            DiagnosticKind::InvalidValue => "invalid_value",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded problem: what kind, which entity or element, and a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            subject: subject.into(),
            message: message.into(),
        };
        tracing::warn!(
            kind = diagnostic.kind.as_str(),
            subject = %diagnostic.subject,
            "{}",
            diagnostic.message
        );
        self.entries.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn by_kind(&self) -> BTreeMap<DiagnosticKind, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.entries {
            *counts.entry(d.kind).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_kind() {
        let mut d = Diagnostics::new();
        d.push(DiagnosticKind::UnresolvedAuthor, "item #1", "no author 'ghost'");
        d.push(DiagnosticKind::UnresolvedAuthor, "item #2", "no author 'ghost'");
        d.push(DiagnosticKind::UnknownPostType, "item #3", "unknown post type 'foo'");
        assert_eq!(d.len(), 3);
        assert_eq!(d.count(DiagnosticKind::UnresolvedAuthor), 2);
        assert_eq!(d.by_kind().get(&DiagnosticKind::UnknownPostType), Some(&1));
    }

    #[test]
    fn display_includes_kind_and_subject() {
        let diag = Diagnostic {
            kind: DiagnosticKind::MalformedMetadata,
            subject: "attachment #7".to_string(),
            message: "unexpected end of input".to_string(),
        };
        assert_eq!(
            diag.to_string(),
            "[malformed_metadata] attachment #7: unexpected end of input"
        );
    }
}
