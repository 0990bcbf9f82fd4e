// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deserialization from SLD documents to the style model.
//!
//! Parsing happens in two passes: [`tree::read`] materializes the whole
//! document as an [`Element`] tree, then [`Parser`] walks that tree top-down.

use std::sync::Arc;

use xml::common::{Position, TextPosition};

mod inline;
mod paint;
mod parser;
pub mod resolve;
mod symbolizer;
pub mod tree;
pub mod walk;

pub use inline::{InlineFeatureParser, ParsedFeatures};
pub use parser::Parser;
pub use tree::{Element, Node};

use crate::model::StyledLayerDescriptor;

/// A single element in the XML stack; see [`Error::stack`].
#[derive(Clone, Debug)]
pub struct StackElement {
    /// The full name of the element, including its namespace and prefix (if any) and local name.
    pub name: xml::name::OwnedName,

    /// The position of this element's `StartElement` event within the underlying document.
    pub pos: TextPosition,
}

/// An error encountered while reading or parsing a style document.
///
/// This type's `Display` impl will show the error encountered and the XML
/// element stack, printing the qname and line:column of each element. E.g.:
///
/// ```text
/// unknown contrast enhancement method "Sharpen" @ 9:13
///
/// XML element stack:
///    3: <sld:ContrastEnhancement> @ 9:13
///    2: <sld:RasterSymbolizer> @ 8:11
///    1: <sld:Rule> @ 7:9
///    0: <sld:FeatureTypeStyle> @ 6:7
/// ```
///
/// Stack entries are added as the error propagates out of structural
/// elements, so the outermost ones may be missing for errors raised outside
/// the parser.
///
/// Cloning an `Error` is cheap.
#[derive(Clone, Debug)]
pub struct Error(Arc<ErrorInner>);

impl Error {
    /// Returns the stack of XML elements as of when this error occurred.
    ///
    /// `stack()[0]` is the outermost known element; `stack.last()` is the
    /// element being parsed.
    pub fn stack(&self) -> &[StackElement] {
        &self.0.stack
    }

    /// Returns true for structurally invalid or ambiguous documents, as
    /// opposed to XML syntax and I/O errors.
    pub fn is_format(&self) -> bool {
        matches!(self.0.kind, ErrorKind::Format(_))
    }

    fn xml(stack: &[StackElement], e: xml::reader::Error) -> Self {
        let pos = e.position();
        Error(Arc::new(ErrorInner {
            kind: ErrorKind::Xml(e),
            stack: stack.to_vec(),
            pos,
        }))
    }

    fn msg(stack: &[StackElement], pos: TextPosition, msg: String) -> Self {
        Error(Arc::new(ErrorInner {
            kind: ErrorKind::Msg(msg),
            stack: stack.to_vec(),
            pos,
        }))
    }

    /// A format error raised while parsing `element`.
    pub(crate) fn format(element: &Element, msg: String) -> Self {
        Error(Arc::new(ErrorInner {
            kind: ErrorKind::Format(msg),
            stack: vec![element.stack_element()],
            pos: element.pos,
        }))
    }

    /// Records that the error propagated out of `parent`.
    pub(crate) fn within(mut self, parent: &Element) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.0) {
            let already_present = inner
                .stack
                .first()
                .map(|s| s.pos == parent.pos && s.name == parent.name)
                .unwrap_or(false);
            if !already_present {
                inner.stack.insert(0, parent.stack_element());
            }
        }
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = &*self.0;
        write!(f, "{} @ {}", &inner.kind, &inner.pos)?;
        if !inner.stack.is_empty() {
            write!(f, "\n\nXML element stack:\n")?;
            for (i, element) in inner.stack.iter().enumerate().rev() {
                writeln!(
                    f,
                    "{:4x}: <{}> @ {}",
                    i,
                    element.name.borrow().repr_display(),
                    &element.pos
                )?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.kind.source()
    }
}

/// Information about an error, which should be enclosed in an `Arc` to make cloning cheap.
#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    stack: Vec<StackElement>,
    pos: TextPosition,
}

#[derive(Debug)]
enum ErrorKind {
    /// An error produced by `xml-rs`, including I/O errors and syntax errors.
    Xml(xml::reader::Error),

    /// A document that is well-formed XML but can't be turned into a style.
    Format(String),

    Msg(String),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Xml(e) => e.fmt(f),
            ErrorKind::Format(msg) => msg.fmt(f),
            ErrorKind::Msg(msg) => msg.fmt(f),
        }
    }
}

impl std::error::Error for ErrorKind {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ErrorKind::Xml(e) => Some(e),
            ErrorKind::Format(_) | ErrorKind::Msg(_) => None,
        }
    }
}

/// Reads a style document with the default [`Parser`].
pub fn read<R: std::io::Read>(source: R) -> Result<StyledLayerDescriptor, Error> {
    let root = tree::read(source)?;
    Parser::new().parse(&root)
}

/// Reads a style document enclosed in a string.
///
/// This is simply `read(source.as_bytes())`; it's common enough to a merit a
/// convenience method.
#[inline]
pub fn from_str(source: &str) -> Result<StyledLayerDescriptor, Error> {
    read(source.as_bytes())
}

/// Type of [white space normalization](https://www.w3.org/TR/xmlschema11-1/#sec-wsnormalization).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WhiteSpace {
    Preserve,
    Replace,

    /// Like `Collapse` but leaves a single space where leading or trailing
    /// white space was. Mixed content is collapsed one text node at a time,
    /// so the ends can only be trimmed once all nodes are known.
    CollapseInner,
    Collapse,
}

fn is_xml_whitespace(c: char) -> bool {
    matches!(c, '\x09' | '\x0A' | '\x0D' | '\x20')
}

/// Performs white space normalization on a string.
///
/// ```rust
/// # use sld_xml::de::{WhiteSpace, normalize};
/// assert_eq!(normalize("\n foo\t bar\n\n", WhiteSpace::Preserve), "\n foo\t bar\n\n");
/// assert_eq!(normalize("\n foo\t bar\n\n", WhiteSpace::Replace), "  foo  bar  ");
/// assert_eq!(normalize("\n foo\t bar\n\n", WhiteSpace::CollapseInner), " foo bar ");
/// assert_eq!(normalize("\n foo\t bar\n\n", WhiteSpace::Collapse), "foo bar");
/// ```
pub fn normalize(s: &str, whitespace: WhiteSpace) -> String {
    let collapse = match whitespace {
        WhiteSpace::Preserve => return s.to_owned(),
        WhiteSpace::Replace => {
            return s
                .chars()
                .map(|c| if is_xml_whitespace(c) { ' ' } else { c })
                .collect()
        }
        WhiteSpace::CollapseInner => s,
        WhiteSpace::Collapse => s.trim_matches(is_xml_whitespace),
    };
    let mut out = String::with_capacity(collapse.len());
    let mut in_run = false;
    for c in collapse.chars() {
        if is_xml_whitespace(c) {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// Trims XML white space from both ends.
pub(crate) fn trim(s: &str) -> &str {
    s.trim_matches(is_xml_whitespace)
}

/// Parses an XML Schema boolean.
///
/// [https://www.w3.org/TR/xmlschema11-2/#boolean]: "booleanRep ::= 'true' | 'false' | '1' | '0'".
/// The value space is compared case-insensitively, as style documents in the
/// wild capitalize freely.
pub(crate) fn parse_bool(text: &str) -> Option<bool> {
    let text = trim(text);
    if text == "1" || text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text == "0" || text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parses an XML Schema double, after white space collapsing.
pub(crate) fn parse_f64(text: &str) -> Option<f64> {
    match trim(text) {
        "INF" => Some(f64::INFINITY),
        "-INF" => Some(f64::NEG_INFINITY),
        t => t.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_inner_keeps_single_space_markers() {
        assert_eq!(normalize("  a \n\t b  ", WhiteSpace::CollapseInner), " a b ");
        assert_eq!(normalize("\n\n", WhiteSpace::CollapseInner), " ");
        assert_eq!(normalize("", WhiteSpace::CollapseInner), "");
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool(" true "), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("FALSE"), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("yes"), None);
    }

    #[test]
    fn doubles() {
        assert_eq!(parse_f64(" 2.5\n"), Some(2.5));
        assert_eq!(parse_f64("INF"), Some(f64::INFINITY));
        assert_eq!(parse_f64("abc"), None);
    }
}
