// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A materialized XML document tree.
//!
//! Unlike a general purpose DOM, this keeps exactly the distinctions the
//! style parser needs: element, text, and CDATA children, in document order.
//! Comments and processing instructions are dropped.

use log::trace;
use xml::{
    common::{Position, TextPosition},
    reader::XmlEvent,
};

use super::{Error, StackElement};
use crate::ExpandedNameRef;

/// A child of an [`Element`].
#[derive(Clone, Debug)]
pub enum Node {
    Element(Element),

    /// Character data, including whitespace-only runs between elements.
    Text(String),

    /// The content of a `<![CDATA[...]]>` section, verbatim.
    CData(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }
}

/// An element and all of its children.
#[derive(Clone, Debug)]
pub struct Element {
    /// The full name of the element, including its namespace and prefix (if any) and local name.
    pub name: xml::name::OwnedName,
    pub attributes: Vec<xml::attribute::OwnedAttribute>,
    pub children: Vec<Node>,

    /// The position of this element's start tag within the document.
    pub pos: TextPosition,
}

impl Element {
    /// Returns the local name, without any prefix.
    ///
    /// Documents read without namespace processing may carry a `prefix:` in
    /// the local name itself; it is stripped here.
    pub fn local_name(&self) -> &str {
        let local = self.name.local_name.as_str();
        match local.rfind(':') {
            Some(i) => &local[i + 1..],
            None => local,
        }
    }

    /// Returns the name of this element, omitting the semantically insignificant prefix.
    pub fn expanded_name(&self) -> ExpandedNameRef {
        ExpandedNameRef::from_xml_name(&self.name.borrow())
    }

    /// Returns true if the local name matches `name`, ignoring ASCII case.
    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(name)
    }

    /// Returns the value of the first attribute with the given local name, in any namespace.
    pub fn attribute(&self, local_name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.local_name == local_name)
            .map(|a| a.value.as_str())
    }

    /// Returns the value of the attribute with the given expanded name.
    pub fn attribute_ns(&self, name: ExpandedNameRef) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| ExpandedNameRef::from_xml_name(&a.name.borrow()) == name)
            .map(|a| a.value.as_str())
    }

    /// Iterates over child elements, skipping text and CDATA.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Returns true if this element has at least one child element.
    pub fn has_element_children(&self) -> bool {
        self.elements().next().is_some()
    }

    /// Concatenates the text and CDATA children, ignoring child elements.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for c in &self.children {
            match c {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::Element(_) => {}
            }
        }
        out
    }

    pub(crate) fn stack_element(&self) -> StackElement {
        StackElement {
            name: self.name.clone(),
            pos: self.pos,
        }
    }
}

/// Reads the document and returns its root element.
pub fn read<R: std::io::Read>(source: R) -> Result<Element, Error> {
    let config = xml::reader::ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(false)
        .coalesce_characters(true)
        .ignore_comments(true);
    let mut reader = Reader {
        inner: xml::reader::EventReader::new_with_config(source, config),
        open: Vec::new(),
    };
    reader.read_document()
}

/// Reads a document enclosed in a string; see [`read`].
#[inline]
pub fn from_str(source: &str) -> Result<Element, Error> {
    read(source.as_bytes())
}

/// Builds the tree from `xml-rs` events.
///
/// `open` holds the elements whose start tag has been seen but not the end
/// tag; the last one receives children. It doubles as the element stack for
/// error reporting.
struct Reader<R: std::io::Read> {
    inner: xml::reader::EventReader<R>,
    open: Vec<Element>,
}

impl<R: std::io::Read> Reader<R> {
    fn stack(&self) -> Vec<StackElement> {
        self.open.iter().map(Element::stack_element).collect()
    }

    fn read_document(&mut self) -> Result<Element, Error> {
        let mut root = None;
        loop {
            let event = match self.inner.next() {
                Ok(e) => e,
                Err(e) => return Err(Error::xml(&self.stack(), e)),
            };
            match event {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    let pos = self.inner.position();
                    if root.is_some() && self.open.is_empty() {
                        return Err(Error::msg(
                            &[],
                            pos,
                            format!("unexpected second root element {}", name),
                        ));
                    }
                    trace!("Starting {}, new depth {}", &name, self.open.len() + 1);
                    self.open.push(Element {
                        name,
                        attributes,
                        children: Vec::new(),
                        pos,
                    });
                }
                XmlEvent::EndElement { name } => {
                    trace!("Ending {}, new depth {}", &name, self.open.len().saturating_sub(1));
                    let finished = match self.open.pop() {
                        Some(e) => e,
                        None => {
                            return Err(Error::msg(
                                &[],
                                self.inner.position(),
                                format!("unbalanced end element {}", name),
                            ))
                        }
                    };
                    match self.open.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(finished)),
                        None => root = Some(finished),
                    }
                }
                XmlEvent::Characters(s) | XmlEvent::Whitespace(s) => match self.open.last_mut() {
                    Some(parent) => push_text(&mut parent.children, s),
                    None if super::trim(&s).is_empty() => {}
                    None => {
                        return Err(Error::msg(
                            &[],
                            self.inner.position(),
                            format!("character data {:?} outside the root element", s),
                        ))
                    }
                },
                XmlEvent::CData(s) => {
                    if let Some(parent) = self.open.last_mut() {
                        parent.children.push(Node::CData(s));
                    }
                }
                XmlEvent::EndDocument => break,
                _ => {}
            }
        }
        root.ok_or_else(|| {
            Error::msg(
                &[],
                self.inner.position(),
                "document has no root element".to_owned(),
            )
        })
    }
}

/// Appends text, merging with a directly preceding text node.
fn push_text(children: &mut Vec<Node>, s: String) {
    if let Some(Node::Text(prev)) = children.last_mut() {
        prev.push_str(&s);
    } else {
        children.push(Node::Text(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn bad_xml() {
        init();
        from_str("argh").unwrap_err();
        from_str("<a><b></a>").unwrap_err();
    }

    #[test]
    fn empty_element() {
        init();
        let root = from_str(r#"<?xml version="1.0"?><root />"#).unwrap();
        assert_eq!(root.local_name(), "root");
        assert!(root.children.is_empty());
    }

    #[test]
    fn keeps_text_cdata_and_elements_apart() {
        init();
        let root = from_str(
            r#"<root xmlns:ogc="http://www.opengis.net/ogc"> a <![CDATA[  b ]]><ogc:PropertyName>c</ogc:PropertyName><!-- x --> </root>"#,
        )
        .unwrap();
        assert_matches!(&root.children[..], [
            Node::Text(a),
            Node::CData(b),
            Node::Element(c),
            Node::Text(d),
        ] => {
            assert_eq!(a, " a ");
            assert_eq!(b, "  b ");
            assert_eq!(c.expanded_name(), ExpandedNameRef::ogc("PropertyName"));
            assert_eq!(c.text(), "c");
            assert_eq!(d, " ");
        });
    }

    #[test]
    fn prefixed_local_names() {
        init();
        let root = from_str(r#"<root><sld:Rule xmlns:sld="urn:x"/></root>"#).unwrap();
        let rule = root.elements().next().unwrap();
        assert!(rule.is("rule"));
        assert_eq!(rule.name.prefix.as_deref(), Some("sld"));
    }

    #[test]
    fn error_includes_stack() {
        init();
        let e = from_str("<a>\n  <b>\n    <c></b>\n</a>").unwrap_err();
        let names: Vec<_> = e.stack().iter().map(|s| s.name.local_name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }
}
