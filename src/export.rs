//! JSON export of a finished conversion.
//!
//! [`JsonSink`] collects every emitted entity into one document with four
//! sections (`site`, `authors`, `pages`, `files`) that downstream tooling
//! can turn into content files.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use wxr_convert_core::bag::Bag;
use wxr_convert_core::entity::EntityKind;
use wxr_convert_core::sink::{EntityRecord, EntitySink};

#[derive(Debug, Default, Serialize)]
pub struct ExportData {
    pub generated_at: String,
    pub site: Option<ExportEntity>,
    pub authors: Vec<ExportEntity>,
    pub pages: Vec<ExportEntity>,
    pub files: Vec<ExportEntity>,
}

#[derive(Debug, Serialize)]
pub struct ExportEntity {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    pub fields: Bag,
}

/// Collects entities in emit order.
#[derive(Debug)]
pub struct JsonSink {
    data: ExportData,
}

impl JsonSink {
    pub fn new() -> Self {
        Self {
            data: ExportData {
                generated_at: chrono::Utc::now().to_rfc3339(),
                ..Default::default()
            },
        }
    }

    pub fn data(&self) -> &ExportData {
        &self.data
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(&self.data)?
        } else {
            serde_json::to_string(&self.data)?
        };
        Ok(json)
    }

    /// Write to `output`, or to stdout for piping.
    pub fn write(&self, output: Option<&Path>, pretty: bool) -> Result<()> {
        let json = self.to_json(pretty)?;
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &json)?;
                eprintln!(
                    "Exported {} pages, {} files, {} authors to {}",
                    self.data.pages.len(),
                    self.data.files.len(),
                    self.data.authors.len(),
                    path.display()
                );
            }
            None => {
                println!("{}", json);
            }
        }
        Ok(())
    }
}

impl Default for JsonSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EntitySink for JsonSink {
    fn accept(&mut self, record: EntityRecord<'_>) -> Result<()> {
        let entity = ExportEntity {
            key: record.key,
            path: record.path.map(str::to_string),
            creator: record.creator.map(|a| a.username.clone()),
            parent: record.parent,
            fields: record.fields,
        };
        match record.kind {
            EntityKind::Channel => {
                if self.data.site.is_some() {
                    anyhow::bail!("export already holds a site record");
                }
                self.data.site = Some(entity);
            }
            EntityKind::Author => self.data.authors.push(entity),
            EntityKind::Post => self.data.pages.push(entity),
            EntityKind::Attachment => self.data.files.push(entity),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wxr_convert_core::entity::Author;

    fn record<'a>(kind: EntityKind, key: &str, creator: Option<&'a Author>) -> EntityRecord<'a> {
        let mut fields = Bag::new();
        fields.insert("Title", key);
        EntityRecord {
            kind,
            key: key.to_string(),
            path: None,
            fields,
            creator,
            parent: None,
        }
    }

    #[test]
    fn sorts_records_into_sections() {
        let author = Author {
            username: "admin".to_string(),
            ..Default::default()
        };
        let mut sink = JsonSink::new();
        sink.accept(record(EntityKind::Channel, "site", None)).unwrap();
        sink.accept(record(EntityKind::Author, "admin", None)).unwrap();
        sink.accept(record(EntityKind::Post, "42", Some(&author))).unwrap();
        sink.accept(record(EntityKind::Attachment, "43", None)).unwrap();

        let data = sink.data();
        assert_eq!(data.site.as_ref().map(|s| s.key.as_str()), Some("site"));
        assert_eq!(data.authors.len(), 1);
        assert_eq!(data.pages[0].creator.as_deref(), Some("admin"));
        assert_eq!(data.files[0].key, "43");
    }

    #[test]
    fn second_site_is_rejected() {
        let mut sink = JsonSink::new();
        sink.accept(record(EntityKind::Channel, "site", None)).unwrap();
        assert!(sink.accept(record(EntityKind::Channel, "site", None)).is_err());
    }

    #[test]
    fn json_omits_empty_links() {
        let mut sink = JsonSink::new();
        sink.accept(record(EntityKind::Post, "1", None)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&sink.to_json(false).unwrap()).unwrap();
        let page = &json["pages"][0];
        assert_eq!(page["key"], "1");
        assert_eq!(page["fields"]["Title"], "1");
        assert!(page.get("creator").is_none());
        assert!(page.get("parent").is_none());
    }
}
