// Minimal owned XML tree over quick-xml.
//
// vim25 responses are small, deeply polymorphic documents; walking an owned
// tree by local name is simpler than a streaming decoder per response type.
// Namespace prefixes are dropped from element and attribute names.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::Error;

/// One element: local name, attributes, concatenated text, children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Parse a document and return its root element.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let mut reader = Reader::from_str(input);
        reader.config_mut().trim_text(true);

        // Sentinel holding the top-level element(s).
        let mut stack: Vec<XmlNode> = vec![XmlNode::default()];

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => stack.push(Self::from_start(&e)?),
                Ok(Event::Empty(e)) => {
                    let node = Self::from_start(&e)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                }
                Ok(Event::End(_)) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced end tag".into()))?;
                    let parent = stack
                        .last_mut()
                        .ok_or_else(|| Error::Xml("unbalanced end tag".into()))?;
                    parent.children.push(node);
                }
                Ok(Event::Text(t)) => {
                    let text = t.unescape().map_err(|e| Error::Xml(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    let raw = c.into_inner();
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(&raw));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "at position {}: {e}",
                        reader.error_position()
                    )));
                }
            }
        }

        if stack.len() != 1 {
            return Err(Error::Xml("unexpected end of document".into()));
        }
        stack
            .pop()
            .and_then(|root| root.children.into_iter().next())
            .ok_or_else(|| Error::Xml("empty document".into()))
    }

    fn from_start(e: &BytesStart<'_>) -> Result<Self, Error> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(e.to_string()))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            text: String::new(),
            children: Vec::new(),
        })
    }

    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child with the given local name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Follow a chain of child names.
    pub fn path(&self, names: &[&str]) -> Option<&XmlNode> {
        names.iter().try_fold(self, |node, name| node.child(name))
    }

    /// Depth-first search for the first descendant (or self) with this name.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `xsi:type` attribute with any namespace prefix removed.
    pub fn xsi_type(&self) -> Option<&str> {
        self.attr("type")
            .map(|t| t.rsplit_once(':').map_or(t, |(_, local)| local))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = r#"<?xml version="1.0"?>
            <a:root xmlns:a="urn:x" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
              <item xsi:type="vim25:EventEx" id="1">one &amp; two</item>
              <item id="2"/>
              <nested><deep>value</deep></nested>
            </a:root>"#;

        let root = XmlNode::parse(doc).unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.children_named("item").count(), 2);

        let first = root.child("item").unwrap();
        assert_eq!(first.text, "one & two");
        assert_eq!(first.attr("id"), Some("1"));
        assert_eq!(first.xsi_type(), Some("EventEx"));
        assert_eq!(root.path(&["nested", "deep"]).unwrap().text, "value");
        assert_eq!(root.find("deep").unwrap().text, "value");
    }

    #[test]
    fn rejects_truncated_document() {
        assert!(XmlNode::parse("<a><b></b>").is_err());
        assert!(XmlNode::parse("").is_err());
    }
}
