//! Decoding of PHP-serialized postmeta values.
//!
//! WordPress stores `_wp_attachment_metadata` (and a few other meta values)
//! as the output of PHP's `serialize()`. This module parses that format into
//! a [`PhpValue`] tree and projects the attachment case onto
//! [`AttachmentMetadata`]. Decoding never panics; every malformed input is a
//! [`MetadataError`] carrying the byte offset.
//!
//! Supported: `N;`, `b:0|1;`, `i:<int>;`, `d:<float>;`, `s:<len>:"...";`
//! (byte length) and `a:<n>:{...}`. Objects (`O:`) and references are
//! rejected.

use std::collections::BTreeMap;
use thiserror::Error;

use crate::bag::Bag;

const MAX_DEPTH: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    #[error("expected '{expected}' at byte {position}, found '{found}'")]
    Unexpected {
        position: usize,
        expected: char,
        found: char,
    },

    #[error("invalid number at byte {0}")]
    InvalidNumber(usize),

    #[error("string length {length} at byte {position} exceeds the input")]
    Length { position: usize, length: usize },

    #[error("unsupported value type '{kind}' at byte {position}")]
    UnsupportedType { position: usize, kind: char },

    #[error("trailing data after byte {0}")]
    Trailing(usize),

    #[error("top-level value is not an array")]
    NotAnArray,

    #[error("arrays nested deeper than {} levels", MAX_DEPTH)]
    NestingTooDeep,
}

/// Array key: PHP arrays mix integer and string keys.
#[derive(Debug, Clone, PartialEq)]
pub enum PhpKey {
    Int(i64),
    Str(String),
}

impl PhpKey {
    pub fn as_string(&self) -> String {
        match self {
            PhpKey::Int(i) => i.to_string(),
            PhpKey::Str(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhpValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Entries in serialized order.
    Array(Vec<(PhpKey, PhpValue)>),
}

impl PhpValue {
    /// Look up a string key in an array value.
    pub fn get(&self, key: &str) -> Option<&PhpValue> {
        match self {
            PhpValue::Array(entries) => entries
                .iter()
                .find(|(k, _)| matches!(k, PhpKey::Str(s) if s == key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[(PhpKey, PhpValue)] {
        match self {
            PhpValue::Array(entries) => entries,
            _ => &[],
        }
    }

    /// Scalar rendered as text; arrays become `None`, `null` becomes `""`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            PhpValue::Null => Some(String::new()),
            PhpValue::Bool(b) => Some(if *b { "1" } else { "" }.to_string()),
            PhpValue::Int(i) => Some(i.to_string()),
            PhpValue::Float(f) => Some(f.to_string()),
            PhpValue::Str(s) => Some(s.clone()),
            PhpValue::Array(_) => None,
        }
    }

    /// Integers, whole floats and numeric strings.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PhpValue::Int(i) => u64::try_from(*i).ok(),
            PhpValue::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as u64),
            PhpValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Parse one serialized value. The whole input must be consumed.
pub fn unserialize(input: &str) -> Result<PhpValue, MetadataError> {
    let mut parser = Parser {
        input: input.trim().as_bytes(),
        pos: 0,
    };
    let value = parser.value(0)?;
    if parser.pos != parser.input.len() {
        return Err(MetadataError::Trailing(parser.pos));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Result<u8, MetadataError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(MetadataError::UnexpectedEof(self.pos))
    }

    fn expect(&mut self, expected: u8) -> Result<(), MetadataError> {
        let found = self.peek()?;
        if found != expected {
            return Err(MetadataError::Unexpected {
                position: self.pos,
                expected: expected as char,
                found: found as char,
            });
        }
        self.pos += 1;
        Ok(())
    }

    /// Raw bytes up to (not including) `terminator`, which is consumed.
    fn until(&mut self, terminator: u8) -> Result<&'a str, MetadataError> {
        let start = self.pos;
        let len = self.input[start..]
            .iter()
            .position(|&b| b == terminator)
            .ok_or(MetadataError::UnexpectedEof(self.input.len()))?;
        self.pos = start + len + 1;
        std::str::from_utf8(&self.input[start..start + len])
            .map_err(|_| MetadataError::InvalidNumber(start))
    }

    fn integer(&mut self, terminator: u8) -> Result<i64, MetadataError> {
        let start = self.pos;
        self.until(terminator)?
            .parse()
            .map_err(|_| MetadataError::InvalidNumber(start))
    }

    fn length(&mut self) -> Result<usize, MetadataError> {
        let start = self.pos;
        let n = self.integer(b':')?;
        usize::try_from(n).map_err(|_| MetadataError::InvalidNumber(start))
    }

    fn value(&mut self, depth: usize) -> Result<PhpValue, MetadataError> {
        let kind_pos = self.pos;
        let kind = self.peek()?;
        self.pos += 1;
        match kind {
            b'N' => {
                self.expect(b';')?;
                Ok(PhpValue::Null)
            }
            b'b' => {
                self.expect(b':')?;
                let start = self.pos;
                match self.integer(b';')? {
                    0 => Ok(PhpValue::Bool(false)),
                    1 => Ok(PhpValue::Bool(true)),
                    _ => Err(MetadataError::InvalidNumber(start)),
                }
            }
            b'i' => {
                self.expect(b':')?;
                Ok(PhpValue::Int(self.integer(b';')?))
            }
            b'd' => {
                self.expect(b':')?;
                let start = self.pos;
                let raw = self.until(b';')?;
                let value = match raw {
                    "INF" => f64::INFINITY,
                    "-INF" => f64::NEG_INFINITY,
                    "NAN" => f64::NAN,
                    _ => raw
                        .parse()
                        .map_err(|_| MetadataError::InvalidNumber(start))?,
                };
                Ok(PhpValue::Float(value))
            }
            b's' => {
                self.expect(b':')?;
                Ok(PhpValue::Str(self.string()?))
            }
            b'a' => {
                if depth >= MAX_DEPTH {
                    return Err(MetadataError::NestingTooDeep);
                }
                self.expect(b':')?;
                let count = self.length()?;
                self.expect(b'{')?;
                // cap the preallocation; `count` is untrusted
                let mut entries = Vec::with_capacity(count.min(64));
                for _ in 0..count {
                    let key = self.key()?;
                    let value = self.value(depth + 1)?;
                    entries.push((key, value));
                }
                self.expect(b'}')?;
                Ok(PhpValue::Array(entries))
            }
            other => Err(MetadataError::UnsupportedType {
                position: kind_pos,
                kind: other as char,
            }),
        }
    }

    fn string(&mut self) -> Result<String, MetadataError> {
        let len_pos = self.pos;
        let length = self.length()?;
        self.expect(b'"')?;
        let start = self.pos;
        let end = start
            .checked_add(length)
            .filter(|&end| end <= self.input.len())
            .ok_or(MetadataError::Length {
                position: len_pos,
                length,
            })?;
        let text = String::from_utf8_lossy(&self.input[start..end]).into_owned();
        self.pos = end;
        self.expect(b'"')?;
        self.expect(b';')?;
        Ok(text)
    }

    fn key(&mut self) -> Result<PhpKey, MetadataError> {
        let kind_pos = self.pos;
        match self.peek()? {
            b'i' => {
                self.pos += 1;
                self.expect(b':')?;
                Ok(PhpKey::Int(self.integer(b';')?))
            }
            b's' => {
                self.pos += 1;
                self.expect(b':')?;
                Ok(PhpKey::Str(self.string()?))
            }
            other => Err(MetadataError::UnsupportedType {
                position: kind_pos,
                kind: other as char,
            }),
        }
    }
}

/// One generated size variant (`thumbnail`, `medium`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSize {
    pub file: String,
    pub width: Option<u64>,
    pub height: Option<u64>,
    pub mime_type: Option<String>,
}

/// Structured projection of `_wp_attachment_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentMetadata {
    pub width: Option<u64>,
    pub height: Option<u64>,
    /// Upload-relative path, e.g. `2020/01/img.jpg`.
    pub file: Option<String>,
    pub filesize: Option<u64>,
    pub sizes: BTreeMap<String, ImageSize>,
    /// IPTC/EXIF values; empty entries are dropped.
    pub image_meta: BTreeMap<String, String>,
}

impl AttachmentMetadata {
    pub fn decode(raw: &str) -> Result<Self, MetadataError> {
        let value = unserialize(raw)?;
        if !matches!(value, PhpValue::Array(_)) {
            return Err(MetadataError::NotAnArray);
        }

        let mut meta = AttachmentMetadata {
            width: value.get("width").and_then(PhpValue::as_u64),
            height: value.get("height").and_then(PhpValue::as_u64),
            file: value.get("file").and_then(PhpValue::as_text),
            filesize: value.get("filesize").and_then(PhpValue::as_u64),
            ..Default::default()
        };

        if let Some(sizes) = value.get("sizes") {
            for (name, size) in sizes.entries() {
                meta.sizes.insert(
                    name.as_string(),
                    ImageSize {
                        file: size.get("file").and_then(PhpValue::as_text).unwrap_or_default(),
                        width: size.get("width").and_then(PhpValue::as_u64),
                        height: size.get("height").and_then(PhpValue::as_u64),
                        mime_type: size.get("mime-type").and_then(PhpValue::as_text),
                    },
                );
            }
        }

        if let Some(image_meta) = value.get("image_meta") {
            for (key, v) in image_meta.entries() {
                let text = match v {
                    PhpValue::Array(items) => items
                        .iter()
                        .filter_map(|(_, item)| item.as_text())
                        .collect::<Vec<_>>()
                        .join(", "),
                    other => other.as_text().unwrap_or_default(),
                };
                if !text.is_empty() && text != "0" {
                    meta.image_meta.insert(key.as_string(), text);
                }
            }
        }

        Ok(meta)
    }

    pub fn to_bag(&self) -> Bag {
        let mut bag = Bag::new();
        if let Some(width) = self.width {
            bag.insert("width", width.to_string());
        }
        if let Some(height) = self.height {
            bag.insert("height", height.to_string());
        }
        if let Some(file) = &self.file {
            bag.insert("file", file.as_str());
        }
        if let Some(filesize) = self.filesize {
            bag.insert("filesize", filesize.to_string());
        }
        if !self.sizes.is_empty() {
            let mut sizes = Bag::new();
            for (name, size) in &self.sizes {
                let mut entry = Bag::new();
                entry.insert("file", size.file.as_str());
                if let Some(w) = size.width {
                    entry.insert("width", w.to_string());
                }
                if let Some(h) = size.height {
                    entry.insert("height", h.to_string());
                }
                if let Some(mime) = &size.mime_type {
                    entry.insert("mime_type", mime.as_str());
                }
                sizes.insert(name.as_str(), entry);
            }
            bag.insert("sizes", sizes);
        }
        if !self.image_meta.is_empty() {
            bag.insert(
                "image_meta",
                self.image_meta
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str()))
                    .collect::<Bag>(),
            );
        }
        bag
    }
}
