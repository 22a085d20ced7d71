//! One pass over a WXR document: channel, then authors, then items.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::canonical::Canonicalizer;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::entity::{Attachment, Author, BagKind, Channel, Entity, HasPost, Post};
use crate::error::WxrError;
use crate::markup::MarkupConverter;
use crate::options::ConvertOptions;
use crate::router::{Blueprints, FieldContext};
use crate::schema::Schemas;
use crate::transform::TransformRegistry;
use crate::xml::{parse_document, Element};

/// The WXR version the field tables are written against.
pub const SUPPORTED_WXR_VERSION: &str = "1.2";

/// Channel children that are walked separately or not at all.
const CHANNEL_SKIP: &[&str] = &["item", "author", "category", "tag", "term"];

/// Items not turned into entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Post types on the delegate list.
    pub delegated: usize,
    /// Post types on the discard list.
    pub discarded: usize,
    /// Unknown or missing post types.
    pub skipped: usize,
}

/// Everything shared by the walk and owned elsewhere.
pub(crate) struct WalkEnv<'a> {
    pub options: &'a ConvertOptions,
    pub schemas: &'a Schemas,
    pub transforms: &'a TransformRegistry,
    pub markup: &'a dyn MarkupConverter,
}

/// Result of a completed walk.
#[derive(Debug, Default)]
pub(crate) struct Walked {
    pub channel: Channel,
    pub authors: BTreeMap<String, Author>,
    pub pages: BTreeMap<u64, Post>,
    pub files: BTreeMap<u64, Attachment>,
    pub diagnostics: Diagnostics,
    pub tally: Tally,
}

/// Parse `xml` and build every entity. Fails only if the document is not
/// well-formed or has no channel; nothing is built in that case.
pub(crate) fn walk(xml: &str, env: WalkEnv<'_>) -> Result<Walked, WxrError> {
    let root = parse_document(xml)?;
    let channel_el = root.find("channel").ok_or(WxrError::MissingChannel)?;

    let mut walked = Walked::default();
    let blueprints = Blueprints::new();
    {
        let Walked {
            channel,
            authors,
            pages,
            files,
            diagnostics,
            tally,
        } = &mut walked;

        let mut cx = FieldContext::new(
            Canonicalizer::new(None, env.options.urls),
            env.markup,
            &blueprints,
            diagnostics,
            env.schemas,
            env.transforms,
            &env.options.content.ignored_fields,
        );

        walk_channel(&mut cx, channel_el, channel);

        for author_el in channel_el
            .children
            .iter()
            .filter(|c| c.local_name() == "author" && c.prefix() == Some("wp"))
        {
            let author: Author = build(&mut cx, author_el);
            if author.username.is_empty() {
                cx.diagnostics.push(
                    DiagnosticKind::InvalidValue,
                    author.subject(),
                    "author without login name",
                );
                continue;
            }
            tracing::debug!(username = %author.username, "author registered");
            authors.insert(author.username.clone(), author);
        }

        for item_el in channel_el.children_named("item") {
            let post_type = item_el
                .child("post_type")
                .map(|t| t.text_content().trim().to_string())
                .unwrap_or_default();
            let options = &env.options.items;

            match post_type.as_str() {
                "" => {
                    cx.diagnostics.push(
                        DiagnosticKind::MissingPostType,
                        item_subject(item_el),
                        "item has no wp:post_type",
                    );
                    tally.skipped += 1;
                }
                "page" | "post" => {
                    let post: Post = build(&mut cx, item_el);
                    check_creator(&mut cx, &post, authors);
                    register(pages, post.id(), post);
                }
                "attachment" => {
                    let file: Attachment = build(&mut cx, item_el);
                    check_creator(&mut cx, &file, authors);
                    register(files, file.id(), file);
                }
                other if options.delegate.iter().any(|t| t == other) => {
                    tracing::debug!(post_type = other, "item delegated");
                    tally.delegated += 1;
                }
                other if options.discard.iter().any(|t| t == other) => {
                    tally.discarded += 1;
                }
                other => {
                    cx.diagnostics.push(
                        DiagnosticKind::UnknownPostType,
                        item_subject(item_el),
                        format!("unknown post type '{}'", other),
                    );
                    tally.skipped += 1;
                }
            }
        }
    }

    walked.channel.blueprints = blueprints.into_inner();
    Ok(walked)
}

fn walk_channel(cx: &mut FieldContext<'_>, channel_el: &Element, channel: &mut Channel) {
    for child in channel_el
        .children
        .iter()
        .filter(|c| !CHANNEL_SKIP.contains(&c.local_name()))
    {
        cx.route(channel, child, BagKind::Fields);
    }

    if channel.site.is_none() {
        cx.diagnostics.push(
            DiagnosticKind::InvalidSiteHost,
            channel.subject(),
            format!(
                "no usable host in channel link '{}'; URLs are left as found",
                channel.item.link
            ),
        );
    }
    if channel.wxr_version != SUPPORTED_WXR_VERSION {
        cx.diagnostics.push(
            DiagnosticKind::UnsupportedVersion,
            channel.subject(),
            format!(
                "wxr_version '{}' (expected {})",
                channel.wxr_version, SUPPORTED_WXR_VERSION
            ),
        );
    }
    cx.site_url = channel.item.link.trim_end_matches('/').to_string();
    tracing::debug!(site = %cx.site_url, "channel parsed");
}

/// Route every child of `element` onto a fresh entity.
fn build<E: Entity + Default>(cx: &mut FieldContext<'_>, element: &Element) -> E {
    let mut entity = E::default();
    for child in &element.children {
        cx.route(&mut entity, child, BagKind::Fields);
    }
    entity
}

fn check_creator<E: HasPost>(
    cx: &mut FieldContext<'_>,
    entity: &E,
    authors: &BTreeMap<String, Author>,
) {
    if let Some(creator) = &entity.post().creator {
        if !authors.contains_key(creator) {
            cx.diagnostics.push(
                DiagnosticKind::UnresolvedAuthor,
                entity.subject(),
                format!("creator '{}' has no wp:author entry", creator),
            );
        }
    }
}

/// Last write wins on duplicate ids.
fn register<E: Entity>(registry: &mut BTreeMap<u64, E>, id: u64, entity: E) {
    let kind = E::KIND.as_str();
    tracing::debug!(id, kind, "entity registered");
    if registry.insert(id, entity).is_some() {
        tracing::debug!(id, kind, "duplicate id replaced an earlier entity");
    }
}

fn item_subject(item: &Element) -> String {
    match item.child("post_id") {
        Some(id) => format!("item #{}", id.text_content().trim()),
        None => "item".to_string(),
    }
}
