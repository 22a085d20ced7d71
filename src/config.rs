use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use wxr_convert_core::options::{ConvertOptions, TransformSpec};

/// The built-in configuration, printed by `wxr config`. Loading this string
/// yields the same values as running without a config file.
pub const DEFAULT_CONFIG: &str = r#"# wxr-convert configuration

[content]
title_field = "Title"
body_field = "Text"
ignored_fields = ["comment", "password", "is_sticky"]

[urls]
# https = true     # force https for links to the exported site
# www = false      # drop the leading subdomain (www.example.com -> example.com)

[items]
discard = [
    "display_type",
    "wooframework",
    "ngg_pictures",
    "ngg_gallery",
    "gal_display_source",
    "slide",
    "lightbox_library",
]
delegate = ["nav_menu_item"]

[transforms."wp:postmeta"]
kind = "meta"
keys = { seo_noindex = "noindex", seo_follow = "follow" }

[output]
pretty = true
# path = "export.json"
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(flatten)]
    pub convert: ConvertOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Where `wxr convert` writes the JSON export; stdout when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            pretty: default_pretty(),
        }
    }
}

fn default_pretty() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            convert: ConvertOptions::with_defaults(),
            output: OutputConfig::default(),
        }
    }
}

/// Load and validate the configuration. A missing file yields the
/// built-in defaults.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate content
    let content = &config.convert.content;
    if content.title_field.trim().is_empty() {
        anyhow::bail!("content.title_field must not be empty");
    }
    if content.body_field.trim().is_empty() {
        anyhow::bail!("content.body_field must not be empty");
    }
    if content.title_field == content.body_field {
        anyhow::bail!(
            "content.title_field and content.body_field must differ (both are '{}')",
            content.title_field
        );
    }

    // Validate items
    let items = &config.convert.items;
    let discard: HashSet<&str> = items.discard.iter().map(String::as_str).collect();
    if let Some(both) = items.delegate.iter().find(|t| discard.contains(t.as_str())) {
        anyhow::bail!(
            "post type '{}' is listed under both items.discard and items.delegate",
            both
        );
    }
    for builtin in ["post", "page", "attachment"] {
        if discard.contains(builtin) || items.delegate.iter().any(|t| t == builtin) {
            anyhow::bail!("post type '{}' is always converted and cannot be listed in [items]", builtin);
        }
    }

    // Validate transforms
    for (name, spec) in &config.convert.transforms {
        if name.trim().is_empty() {
            anyhow::bail!("transform names must not be empty");
        }
        match spec {
            TransformSpec::Field { field } if field.trim().is_empty() => {
                anyhow::bail!("transforms.\"{}\".field must not be empty", name)
            }
            TransformSpec::Meta { .. } if name != "wp:postmeta" => anyhow::bail!(
                "transforms.\"{}\": kind 'meta' only applies to wp:postmeta",
                name
            ),
            _ => {}
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wxr_convert_core::canonical::UrlPolicy;

    #[test]
    fn default_config_string_matches_defaults() {
        let parsed = parse_config(DEFAULT_CONFIG).unwrap();
        let builtin = Config::default();
        assert_eq!(parsed.convert.content.title_field, builtin.convert.content.title_field);
        assert_eq!(parsed.convert.content.ignored_fields, builtin.convert.content.ignored_fields);
        assert_eq!(parsed.convert.urls, builtin.convert.urls);
        assert_eq!(parsed.convert.items.discard, builtin.convert.items.discard);
        assert_eq!(parsed.convert.items.delegate, builtin.convert.items.delegate);
        assert_eq!(parsed.convert.transforms, builtin.convert.transforms);
        assert!(parsed.output.pretty);
        assert!(parsed.output.path.is_none());
    }

    #[test]
    fn empty_file_gets_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.convert.content.body_field, "Text");
        assert!(config.convert.transforms.contains_key("wp:postmeta"));
    }

    #[test]
    fn url_policy_and_field_transform() {
        let config = parse_config(
            r#"
[urls]
https = true
www = false

[transforms."dc:creator"]
kind = "field"
field = "author"
"#,
        )
        .unwrap();
        assert_eq!(
            config.convert.urls,
            UrlPolicy {
                https: Some(true),
                www: Some(false)
            }
        );
        assert_eq!(
            config.convert.transforms.get("dc:creator"),
            Some(&TransformSpec::Field {
                field: "author".to_string()
            })
        );
        // an explicit table replaces the built-in set
        assert!(!config.convert.transforms.contains_key("wp:postmeta"));
    }

    #[test]
    fn rejects_conflicting_item_lists() {
        let err = parse_config(
            r#"
[items]
discard = ["slide"]
delegate = ["slide"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("slide"));
    }

    #[test]
    fn rejects_builtin_post_types_in_item_lists() {
        assert!(parse_config("[items]\ndiscard = [\"page\"]\n").is_err());
    }

    #[test]
    fn rejects_meta_transform_elsewhere() {
        let err = parse_config("[transforms.\"dc:creator\"]\nkind = \"meta\"\n").unwrap_err();
        assert!(err.to_string().contains("wp:postmeta"));
    }

    #[test]
    fn rejects_unknown_transform_kind() {
        assert!(parse_config("[transforms.guid]\nkind = \"drop\"\n").is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let config = load_config(Path::new("/nonexistent/wxr.toml")).unwrap();
        assert_eq!(config.convert.content.title_field, "Title");
    }
}
