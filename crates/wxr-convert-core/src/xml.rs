//! A small owned element tree built from a WXR document.
//!
//! WXR files are parsed completely before the walk starts, so the router can
//! hand whole elements (name, attributes, text, children) to field handlers.
//! Whitespace-only text between elements is dropped; CDATA sections are kept
//! verbatim.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::WxrError;

/// One XML element with its qualified name, attributes, direct text and
/// child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written in the document, e.g. `wp:post_id`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated text and CDATA directly inside this element.
    pub text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Element holding only text, used when field handlers re-enter the
    /// router with a synthetic element (e.g. a decoded `wp:postmeta` pair).
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Namespace prefix of the qualified name (`wp` for `wp:post_id`).
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child element with the given local name, regardless of prefix.
    pub fn child(&self, local_name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == local_name)
    }

    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children
            .iter()
            .filter(move |c| c.local_name() == local_name)
    }

    /// Text of this element and all descendants, in document order.
    pub fn text_content(&self) -> String {
        if self.children.is_empty() {
            return self.text.clone();
        }
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.text_content());
        }
        out
    }

    /// No text (including an empty CDATA section) and no child elements.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.children.is_empty()
    }

    /// Depth-first search for the first element with the given local name,
    /// starting with `self`.
    pub fn find(&self, local_name: &str) -> Option<&Element> {
        if self.local_name() == local_name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(local_name))
    }
}

/// Parse a complete XML document into its root [`Element`].
///
/// Any well-formedness error is fatal: no partial tree is returned.
pub fn parse_document(xml: &str) -> Result<Element, WxrError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| WxrError::Xml {
            position: reader.buffer_position() as u64,
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                let element = start_element(&start, reader.buffer_position() as u64)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = start_element(&start, reader.buffer_position() as u64)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(WxrError::Xml {
                        position: reader.buffer_position() as u64,
                        message: "unexpected closing tag".to_string(),
                    });
                };
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let value = text
                        .unescape()
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());
                    current.text.push_str(&value);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(WxrError::Xml {
            position: reader.buffer_position() as u64,
            message: format!("unclosed element <{}>", stack[stack.len() - 1].name),
        });
    }

    root.ok_or_else(|| WxrError::Xml {
        position: 0,
        message: "document has no root element".to_string(),
    })
}

fn start_element(
    start: &quick_xml::events::BytesStart<'_>,
    position: u64,
) -> Result<Element, WxrError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| WxrError::Xml {
            position,
            message: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefixed_names_and_cdata() {
        let doc = parse_document(
            r#"<rss><channel><item><content:encoded><![CDATA[<p>Hi</p>]]></content:encoded></item></channel></rss>"#,
        )
        .unwrap();
        let encoded = doc.find("encoded").unwrap();
        assert_eq!(encoded.name, "content:encoded");
        assert_eq!(encoded.prefix(), Some("content"));
        assert_eq!(encoded.local_name(), "encoded");
        assert_eq!(encoded.text, "<p>Hi</p>");
    }

    #[test]
    fn empty_cdata_is_empty() {
        let doc = parse_document("<item><excerpt:encoded><![CDATA[]]></excerpt:encoded></item>")
            .unwrap();
        assert!(doc.children[0].is_empty());
    }

    #[test]
    fn attributes_and_nested_text() {
        let doc = parse_document(
            r#"<item><category domain="post_tag" nicename="rust"><![CDATA[Rust]]></category><wp:postmeta><wp:meta_key>k</wp:meta_key><wp:meta_value>v</wp:meta_value></wp:postmeta></item>"#,
        )
        .unwrap();
        let category = doc.child("category").unwrap();
        assert_eq!(category.attribute("domain"), Some("post_tag"));
        assert_eq!(category.attribute("nicename"), Some("rust"));
        let meta = doc.child("postmeta").unwrap();
        assert_eq!(meta.text_content(), "kv");
        assert!(!meta.is_empty());
    }

    #[test]
    fn unclosed_document_is_an_error() {
        let err = parse_document("<rss><channel>").unwrap_err();
        assert!(matches!(err, WxrError::Xml { .. }));
    }

    #[test]
    fn mismatched_tags_are_an_error() {
        let err = parse_document("<rss><channel></rss>").unwrap_err();
        assert!(matches!(err, WxrError::Xml { .. }));
    }
}
