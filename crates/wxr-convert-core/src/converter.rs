//! The aggregation root: owns the options, the field schemas, the
//! transform registry and, after [`Converter::convert_str`], every built
//! entity.
//!
//! # Usage
//!
//! ```rust
//! use wxr_convert_core::converter::Converter;
//! use wxr_convert_core::options::ConvertOptions;
//!
//! let xml = r#"<rss><channel>
//!   <title>Demo</title><link>http://www.example.com</link>
//!   <wp:wxr_version>1.2</wp:wxr_version>
//!   <item><title>Hello</title><wp:post_id>42</wp:post_id><wp:post_type>post</wp:post_type></item>
//! </channel></rss>"#;
//!
//! let mut converter = Converter::new(ConvertOptions::with_defaults()).unwrap();
//! let summary = converter.convert_str(xml).unwrap();
//! assert_eq!(summary.pages, 1);
//! assert_eq!(converter.page(42).unwrap().item.title, "Hello");
//! ```

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::entity::{Attachment, Author, Channel, EntityKind, Post};
use crate::error::WxrError;
use crate::markup::{MarkupConverter, PlainText};
use crate::options::ConvertOptions;
use crate::schema::Schemas;
use crate::sink::{EntityRecord, EntitySink};
use crate::transform::{Transform, TransformRegistry};
use crate::walker::{walk, Tally, WalkEnv};

pub struct Converter {
    options: ConvertOptions,
    schemas: Schemas,
    transforms: TransformRegistry,
    markup: Box<dyn MarkupConverter>,
    site: Option<Channel>,
    authors: BTreeMap<String, Author>,
    pages: BTreeMap<u64, Post>,
    files: BTreeMap<u64, Attachment>,
    diagnostics: Diagnostics,
    tally: Tally,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    pub pages: usize,
    pub files: usize,
    pub authors: usize,
    pub delegated: usize,
    pub discarded: usize,
    pub skipped: usize,
    pub diagnostics: usize,
    pub diagnostics_by_kind: BTreeMap<DiagnosticKind, usize>,
}

impl ConversionSummary {
    pub fn converted(&self) -> usize {
        self.pages + self.files
    }
}

impl Converter {
    /// Build the field schemas and the configured transforms.
    pub fn new(options: ConvertOptions) -> Result<Self, WxrError> {
        let schemas = Schemas::build()?;
        let transforms = TransformRegistry::from_specs(&options.transforms);
        Ok(Self {
            options,
            schemas,
            transforms,
            markup: Box::new(PlainText),
            site: None,
            authors: BTreeMap::new(),
            pages: BTreeMap::new(),
            files: BTreeMap::new(),
            diagnostics: Diagnostics::new(),
            tally: Tally::default(),
        })
    }

    /// Replace the HTML → text converter.
    pub fn with_markup(mut self, markup: Box<dyn MarkupConverter>) -> Self {
        self.markup = markup;
        self
    }

    /// Register or replace the transform for a qualified element name.
    pub fn register_transform(&mut self, name: impl Into<String>, transform: Box<dyn Transform>) {
        self.transforms.register(name, transform);
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    /// Walk one WXR document. A converter holds exactly one document.
    pub fn convert_str(&mut self, xml: &str) -> Result<ConversionSummary, WxrError> {
        if self.site.is_some() {
            return Err(WxrError::AlreadyConverted);
        }
        let walked = walk(
            xml,
            WalkEnv {
                options: &self.options,
                schemas: &self.schemas,
                transforms: &self.transforms,
                markup: self.markup.as_ref(),
            },
        )?;

        self.site = Some(walked.channel);
        self.authors = walked.authors;
        self.pages = walked.pages;
        self.files = walked.files;
        self.diagnostics = walked.diagnostics;
        self.tally = walked.tally;

        let summary = self.summary();
        tracing::info!(
            pages = summary.pages,
            files = summary.files,
            authors = summary.authors,
            diagnostics = summary.diagnostics,
            "conversion finished"
        );
        Ok(summary)
    }

    pub fn site(&self) -> Option<&Channel> {
        self.site.as_ref()
    }

    pub fn authors(&self) -> &BTreeMap<String, Author> {
        &self.authors
    }

    /// Exact, case-sensitive lookup by username.
    pub fn author(&self, username: &str) -> Option<&Author> {
        self.authors.get(username)
    }

    pub fn pages(&self) -> &BTreeMap<u64, Post> {
        &self.pages
    }

    pub fn page(&self, id: u64) -> Option<&Post> {
        self.pages.get(&id)
    }

    pub fn files(&self) -> &BTreeMap<u64, Attachment> {
        &self.files
    }

    pub fn file(&self, id: u64) -> Option<&Attachment> {
        self.files.get(&id)
    }

    /// The post's creator, if it names a known author.
    pub fn creator_of(&self, post: &Post) -> Option<&Author> {
        post.creator.as_deref().and_then(|name| self.author(name))
    }

    /// The post's parent id, if that parent was registered. Forward
    /// references resolve because this runs after the walk.
    pub fn parent_of(&self, post: &Post) -> Option<u64> {
        post.parent
            .filter(|id| self.pages.contains_key(id) || self.files.contains_key(id))
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn summary(&self) -> ConversionSummary {
        ConversionSummary {
            pages: self.pages.len(),
            files: self.files.len(),
            authors: self.authors.len(),
            delegated: self.tally.delegated,
            discarded: self.tally.discarded,
            skipped: self.tally.skipped,
            diagnostics: self.diagnostics.len(),
            diagnostics_by_kind: self.diagnostics.by_kind(),
        }
    }

    /// Hand every entity to `sink`: site, authors, pages, files. Returns
    /// the number of records accepted.
    pub fn emit(&self, sink: &mut dyn EntitySink) -> Result<usize> {
        let content = &self.options.content;
        let mut count = 0;

        if let Some(site) = &self.site {
            sink.accept(EntityRecord {
                kind: EntityKind::Channel,
                key: "site".to_string(),
                path: None,
                fields: site.to_fields(content),
                creator: None,
                parent: None,
            })?;
            count += 1;
        }

        for (username, author) in &self.authors {
            sink.accept(EntityRecord {
                kind: EntityKind::Author,
                key: username.clone(),
                path: None,
                fields: author.to_fields(),
                creator: None,
                parent: None,
            })?;
            count += 1;
        }

        for (id, page) in &self.pages {
            sink.accept(EntityRecord {
                kind: EntityKind::Post,
                key: id.to_string(),
                path: Some(page.filepath.as_str()),
                fields: page.to_fields(content),
                creator: self.creator_of(page),
                parent: self.parent_of(page),
            })?;
            count += 1;
        }

        for (id, file) in &self.files {
            sink.accept(EntityRecord {
                kind: EntityKind::Attachment,
                key: id.to_string(),
                path: Some(file.post.filepath.as_str()),
                fields: file.to_fields(content),
                creator: self.creator_of(&file.post),
                parent: self.parent_of(&file.post),
            })?;
            count += 1;
        }

        Ok(count)
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("transforms", &self.transforms)
            .field("pages", &self.pages.len())
            .field("files", &self.files.len())
            .field("authors", &self.authors.len())
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}
