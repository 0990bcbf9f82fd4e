// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialization from the style model to SLD documents.
//!
//! [`serialize`] returns a [`Serializer`] which is configured builder-style
//! and then written to any `std::io::Write` or a `String`:
//!
//! ```rust
//! # use sld_xml::model::StyledLayerDescriptor;
//! let sld = StyledLayerDescriptor::default();
//! let out = sld_xml::serialize(&sld)
//!     .perform_indent(true)
//!     .export_defaults(false)
//!     .to_string()
//!     .unwrap();
//! assert!(out.contains("StyledLayerDescriptor"));
//! ```

use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    io::Write,
};

use xml::writer::XmlEvent;

use crate::expr::{MarkupFromExpression, OgcMarkup};
use crate::model::StyledLayerDescriptor;
use crate::ExpandedNameRef;

mod feature;
mod style;

/// An error while serializing.
///
/// Any error poisons the underlying writer, so a failed serialization never
/// produces a document that merely looks complete.
#[derive(Clone, Debug)]
pub struct Error(pub String);

impl Error {
    pub fn duplicate_mapping(prefix: &str, old: &str, new: &str) -> Error {
        Error(format!(
            "Prefix {:?} is already mapped to {:?}, so can't map to {:?}",
            prefix, old, new
        ))
    }

    pub fn duplicate_attribute(name: &ExpandedNameRef, old: &str, new: &str) -> Error {
        Error(format!(
            "Attribute {} already has value {:?}, so can't set value {:?}",
            name, old, new
        ))
    }

    pub fn undeclared_namespace(name: &ExpandedNameRef) -> Error {
        Error(format!("{} uses an undeclared namespace", name))
    }

    /// The model holds something this writer has no encoding for.
    pub fn unsupported(what: &str) -> Error {
        Error(format!("can't encode {}", what))
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        self.0.fmt(f)
    }
}

struct WrappedWriter<W: std::io::Write> {
    inner: xml::writer::EventWriter<W>,

    /// When `Some`, all futures writes and the overall operation should fail with this error.
    poison: Option<Error>,
}

/// A type-erased version of [`WrappedWriter`], to avoid monomorphization bloat.
trait ErasedEventWriter {
    /// Writes the element, poisoning the writer on failure.
    fn write(&mut self, event: XmlEvent) -> Result<(), Error>;

    /// Explicitly poison the writer.
    fn poison(&mut self, error: Error);
}

impl<W: Write> ErasedEventWriter for WrappedWriter<W> {
    fn write(&mut self, event: XmlEvent) -> Result<(), Error> {
        if let Some(ref poison) = self.poison {
            return Err(poison.clone());
        }
        if let Err(e) = self.inner.write(event) {
            let wrapped = Error(e.to_string());
            self.poison = Some(wrapped.clone());
            return Err(wrapped);
        }
        Ok(())
    }

    fn poison(&mut self, error: Error) {
        self.poison.get_or_insert(error);
    }
}

/// Builds the start tag for an element: name, namespace mappings, and attributes.
///
/// The element's parent always constructs it with its namespace, local name, and
/// inherited prefix mappings. The caller may add attributes and namespace
/// mappings, then start the element and convert it to an [`ElementWriter`] to
/// add child elements and text.
pub struct ElementBuilder<'a>(Option<ElementBuilderInner<'a>>);

struct ElementBuilderInner<'a> {
    name: ExpandedNameRef<'a>,
    namespaces: NamespacesBuilder<'a>,

    /// Attributes in insertion order; `seen_attributes` enforces uniqueness of
    /// the expanded name.
    attributes: Vec<(ExpandedNameRef<'a>, String)>,
    seen_attributes: HashMap<ExpandedNameRef<'a>, ()>,
    writer: &'a mut dyn ErasedEventWriter,
}

impl<'a> ElementBuilder<'a> {
    fn inner(&mut self) -> Result<&mut ElementBuilderInner<'a>, Error> {
        self.0
            .as_mut()
            .ok_or_else(|| Error("ElementBuilder used after start".to_owned()))
    }

    /// Requests a mapping from `requested_prefix` to `url` on this element.
    pub fn namespace(&mut self, requested_prefix: &'a str, url: &'a str) -> Result<(), Error> {
        self.inner()?.namespaces.insert(requested_prefix, url);
        Ok(())
    }

    /// Adds the given attribute.
    ///
    /// An attribute in a namespace needs a mapping for that namespace, either
    /// inherited or added via [`ElementBuilder::namespace`].
    pub fn attribute(&mut self, name: ExpandedNameRef<'a>, value: String) -> Result<(), Error> {
        let inner = self.inner()?;
        use std::collections::hash_map::Entry;
        match inner.seen_attributes.entry(name) {
            Entry::Vacant(e) => {
                e.insert(());
                inner.attributes.push((name, value));
            }
            Entry::Occupied(_) => {
                let old = inner
                    .attributes
                    .iter()
                    .find(|(n, _)| *n == name)
                    .map(|(_, v)| v.as_str())
                    .unwrap_or_default();
                return Err(Error::duplicate_attribute(&name, old, &value));
            }
        }
        inner.namespaces.attribute(name.namespace);
        Ok(())
    }

    /// Writes the start event, returning a writer that must be used to finish
    /// the element.
    ///
    /// If `finish` is not called on the returned [`ElementWriter`] before it
    /// is dropped, serialization will fail.
    #[must_use = "must call finish on the returned writer to complete the document"]
    pub fn start(mut self) -> Result<ElementWriter<'a>, Error> {
        let inner = match self.0.take() {
            Some(i) => i,
            None => return Err(Error("ElementBuilder started twice".to_owned())),
        };
        let namespaces = inner.namespaces.finalize();
        let name = match namespaces.resolve_element(&inner.name) {
            Ok(n) => n,
            Err(e) => {
                inner.writer.poison(e.clone());
                return Err(e);
            }
        };
        let mut attributes = Vec::with_capacity(inner.attributes.len());
        for (k, v) in &inner.attributes {
            match namespaces.resolve_attribute(k) {
                Ok(name) => attributes.push(xml::attribute::Attribute { name, value: v }),
                Err(e) => {
                    inner.writer.poison(e.clone());
                    return Err(e);
                }
            }
        }
        inner.writer.write(XmlEvent::StartElement {
            name,
            attributes: Cow::Owned(attributes),
            namespace: Cow::Borrowed(&namespaces.by_prefix),
        })?;
        Ok(ElementWriter(Some(ElementWriterInner {
            namespaces,
            writer: inner.writer,
        })))
    }
}

impl<'a> Drop for ElementBuilder<'a> {
    fn drop(&mut self) {
        if let Some(inner) = self.0.as_mut() {
            inner
                .writer
                .poison(Error("ElementBuilder dropped before start".to_owned()));
        }
    }
}

/// Builds the body (element, text, and CDATA children) of an element.
pub struct ElementWriter<'a>(Option<ElementWriterInner<'a>>);

struct ElementWriterInner<'a> {
    namespaces: Namespaces<'a>,
    writer: &'a mut dyn ErasedEventWriter,
}

impl<'a> ElementWriter<'a> {
    fn inner(&mut self) -> Result<&mut ElementWriterInner<'a>, Error> {
        self.0
            .as_mut()
            .ok_or_else(|| Error("ElementWriter used after finish".to_owned()))
    }

    /// Returns an [`ElementBuilder`] for a child element.
    ///
    /// If `start` is not called on the returned [`ElementBuilder`] before it
    /// is dropped, serialization will fail.
    #[must_use = "must call start on the returned element to complete the document"]
    pub fn element<'b>(&'b mut self, name: ExpandedNameRef<'b>) -> ElementBuilder<'b>
    where
        'a: 'b,
    {
        match self.0.as_mut() {
            Some(inner) => ElementBuilder(Some(ElementBuilderInner {
                name,
                namespaces: inner.namespaces.child(name.namespace),
                attributes: Vec::default(),
                seen_attributes: HashMap::default(),
                writer: inner.writer,
            })),
            None => ElementBuilder(None),
        }
    }

    /// Writes character data, escaped as needed.
    pub fn text(&mut self, text: &str) -> Result<(), Error> {
        self.inner()?.writer.write(XmlEvent::Characters(text))
    }

    /// Writes a CDATA section, which readers see verbatim.
    pub fn cdata(&mut self, text: &str) -> Result<(), Error> {
        self.inner()?.writer.write(XmlEvent::CData(text))
    }

    /// Writes `<name>text</name>`.
    pub fn text_element(&mut self, name: ExpandedNameRef<'_>, text: &str) -> Result<(), Error> {
        let mut child = self.element(name).start()?;
        child.text(text)?;
        child.finish()
    }

    /// Writes `<name/>`.
    pub fn empty_element(&mut self, name: ExpandedNameRef<'_>) -> Result<(), Error> {
        self.element(name).start()?.finish()
    }

    pub fn finish(mut self) -> Result<(), Error> {
        match self.0.take() {
            Some(inner) => inner.writer.write(XmlEvent::EndElement { name: None }),
            None => Err(Error("ElementWriter finished twice".to_owned())),
        }
    }
}

impl<'a> Drop for ElementWriter<'a> {
    fn drop(&mut self) {
        if let Some(inner) = self.0.take() {
            inner
                .writer
                .poison(Error("ElementWriter dropped before finish".to_owned()));
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct NamespacesBuilder<'a>(
    /// A mapping from the URL to the assigned prefix.
    ///
    /// `assigned_prefix` is empty in all of the values.
    BTreeMap<&'a str, Namespace<'a>>,
);

impl<'a> NamespacesBuilder<'a> {
    /// Ensures there's at least one mapping for `url`, preferably called `prefix`.
    ///
    /// An empty `prefix` represents the default namespace. `prefix` must not start
    /// with `xml`.
    fn insert(&mut self, requested_prefix: &'a str, url: &'a str) {
        debug_assert!(
            !requested_prefix.starts_with("xml"),
            "prefix {:?} must not start with xml",
            requested_prefix
        );
        use std::collections::btree_map::Entry;
        match self.0.entry(url) {
            Entry::Vacant(e) => {
                e.insert(Namespace {
                    requested_prefix,
                    required: true,
                    assigned_prefix: None,
                    needs_prefix: false,
                });
            }
            Entry::Occupied(mut e) => {
                let e = e.get_mut();
                if !e.required {
                    e.requested_prefix = requested_prefix;
                }
                e.required = true;
            }
        }
    }

    /// Requests that the existing mapping for `url` be usable by attributes.
    ///
    /// Does nothing if `url` isn't mapped; `resolve_attribute` reports that later.
    fn attribute(&mut self, url: &str) {
        if let Some(ns) = self.0.get_mut(url) {
            ns.required = true;
            ns.needs_prefix = true;
        }
    }

    /// Finalizes the chosen prefixes, returning an immutable `Namespaces`.
    fn finalize(mut self) -> Namespaces<'a> {
        let mut by_prefix = xml::namespace::Namespace::empty();

        // Give first dibs to required mappings, and ensure they get some
        // assignment even if their requested prefix is taken (or unsuitable,
        // in the corner case where they requested no prefix but an attribute
        // uses them).
        for (url, ns) in &mut self.0 {
            if !ns.required {
                continue;
            }

            if !(ns.needs_prefix && ns.requested_prefix.is_empty())
                && by_prefix.put(ns.requested_prefix.to_owned(), url.to_owned())
            {
                ns.assigned_prefix = Some(Cow::Borrowed(ns.requested_prefix));
                continue;
            }

            let (prefix, mut i) = match ns.requested_prefix {
                "" => ("ns", 1),
                p => (p, 2),
            };
            while !by_prefix.put(format!("{}{}", prefix, i), url.to_owned()) {
                i += 1;
            }
            ns.assigned_prefix = Some(Cow::Owned(format!("{}{}", prefix, i)));
        }

        // Best-effort assignment for inherited mappings.
        for (url, ns) in &mut self.0 {
            if ns.required {
                continue;
            }

            if by_prefix.put(ns.requested_prefix.to_owned(), url.to_owned()) {
                ns.assigned_prefix = Some(Cow::Borrowed(ns.requested_prefix));
            }
        }

        Namespaces {
            by_url: self.0,
            by_prefix,
        }
    }
}

struct Namespaces<'a> {
    /// A mapping from URL to `Namespace` objects with their `requested_prefix` finalized.
    by_url: BTreeMap<&'a str, Namespace<'a>>,

    by_prefix: xml::namespace::Namespace,
}

impl<'a> Namespaces<'a> {
    fn child(&self, namespace: &str) -> NamespacesBuilder {
        let mut child = NamespacesBuilder::default();
        let mut found_namespace = false;
        for (prefix, ns) in &self.by_prefix {
            let required = if !found_namespace && ns == namespace {
                found_namespace = true;
                true
            } else {
                false
            };
            child.0.insert(
                ns,
                Namespace {
                    requested_prefix: prefix,
                    assigned_prefix: None,
                    required,
                    needs_prefix: false,
                },
            );
        }
        child
    }

    fn resolve_element<'b>(&'b self, name: &ExpandedNameRef<'b>) -> Result<xml::name::Name<'b>, Error>
    where
        'a: 'b,
    {
        let prefix = match self.by_url.get(name.namespace) {
            Some(Namespace {
                assigned_prefix: Some(p),
                required: true,
                ..
            }) => p.as_ref(),
            None if name.namespace == crate::XML_NS => "xml",
            _ if name.namespace.is_empty() => {
                if self.by_prefix.get("").map_or(true, str::is_empty) {
                    ""
                } else {
                    return Err(Error(format!(
                        "element {} has no namespace, but a default namespace is set",
                        name
                    )));
                }
            }
            _ => return Err(Error::undeclared_namespace(name)),
        };
        Ok(xml::name::Name {
            local_name: name.local_name,
            namespace: None, // unused by xml::writer
            prefix: if prefix.is_empty() { None } else { Some(prefix) },
        })
    }

    fn resolve_attribute<'b>(
        &'b self,
        name: &ExpandedNameRef<'b>,
    ) -> Result<xml::name::Name<'b>, Error>
    where
        'a: 'b,
    {
        let prefix = if name.namespace.is_empty() {
            ""
        } else {
            match self.by_url.get(name.namespace) {
                Some(Namespace {
                    assigned_prefix: Some(p),
                    ..
                }) if !p.is_empty() => p.as_ref(),
                None if name.namespace == crate::XML_NS => "xml",
                _ => return Err(Error::undeclared_namespace(name)),
            }
        };
        Ok(xml::name::Name {
            local_name: name.local_name,
            namespace: None, // unused by xml::writer
            prefix: if prefix.is_empty() { None } else { Some(prefix) },
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct Namespace<'a> {
    /// The prefix which was requested; empty for the default namespace.
    ///
    /// Multiple URLs in a [`Namespaces`] may request the same prefix, but
    /// only one will actually get it.
    requested_prefix: &'a str,

    /// The actual prefix assigned by [`NamespacesBuilder::finalize`].
    ///
    /// May be `None` iff `!required`.
    assigned_prefix: Option<Cow<'a, str>>,

    /// True iff this is an entry expected by the element or an attribute.
    /// False if it's inherited from a parent and should be dropped if the prefix
    /// is unavailable.
    required: bool,

    /// True if `assigned_prefix` must be non-empty; implies `required`.
    ///
    /// Unprefixed attributes (unlike unprefixed elements) are always
    /// unnamespaced.  Thus, a prefix must always be used for a namespace
    /// attribute.
    needs_prefix: bool,
}

/// Serializer for a style document; returned by [`serialize`].
#[derive(Copy, Clone)]
pub struct Serializer<'a> {
    sld: &'a StyledLayerDescriptor,
    markup: &'a dyn MarkupFromExpression,
    perform_indent: bool,
    export_defaults: bool,
}

impl<'a> Serializer<'a> {
    /// Sets if the output should be indented; defaults to false.
    #[inline]
    pub fn perform_indent(self, perform_indent: bool) -> Self {
        Self {
            perform_indent,
            ..self
        }
    }

    /// Sets if values equal to their documented default should be written
    /// anyway; defaults to false.
    #[inline]
    pub fn export_defaults(self, export_defaults: bool) -> Self {
        Self {
            export_defaults,
            ..self
        }
    }

    /// Replaces the writer used for embedded expressions and filters.
    #[inline]
    pub fn markup(self, markup: &'a dyn MarkupFromExpression) -> Self {
        Self { markup, ..self }
    }

    /// Serializes to any `Write` impl.
    pub fn to<W: Write>(self, writer: W) -> Result<(), Error> {
        let mut writer = WrappedWriter {
            inner: xml::writer::EventWriter::new_with_config(
                writer,
                xml::writer::EmitterConfig::new().perform_indent(self.perform_indent),
            ),
            poison: None,
        };
        let mut builder = ElementBuilder(Some(ElementBuilderInner {
            name: ExpandedNameRef::sld("StyledLayerDescriptor"),
            namespaces: NamespacesBuilder::default(),
            attributes: Vec::default(),
            seen_attributes: HashMap::default(),
            writer: &mut writer,
        }));
        let emitter = style::Emitter {
            markup: self.markup,
            export_defaults: self.export_defaults,
        };
        emitter.descriptor_attributes(&mut builder)?;
        let mut root = builder.start()?;
        emitter.descriptor(&mut root, self.sld)?;
        root.finish()
    }

    /// Serializes to a `String`.
    pub fn to_string(self) -> Result<String, Error> {
        let mut out = Vec::new();
        self.to(&mut out)?;
        String::from_utf8(out).map_err(|e| Error(format!("xml-rs produced invalid UTF-8: {}", e)))
    }
}

/// Serializes the given descriptor with the default expression markup.
#[inline]
pub fn serialize(sld: &StyledLayerDescriptor) -> Serializer {
    Serializer {
        sld,
        markup: &OgcMarkup,
        perform_indent: false,
        export_defaults: false,
    }
}

/// Writes a single element outside of any document, for unit tests of the
/// individual emitters.
#[cfg(test)]
pub(crate) fn fragment(
    f: impl FnOnce(&mut ElementWriter) -> Result<(), Error>,
) -> Result<String, Error> {
    let mut out = Vec::new();
    {
        let mut writer = WrappedWriter {
            inner: xml::writer::EventWriter::new_with_config(
                &mut out,
                xml::writer::EmitterConfig::new().write_document_declaration(false),
            ),
            poison: None,
        };
        let mut builder = ElementBuilder(Some(ElementBuilderInner {
            name: ExpandedNameRef::local("root"),
            namespaces: NamespacesBuilder::default(),
            attributes: Vec::default(),
            seen_attributes: HashMap::default(),
            writer: &mut writer,
        }));
        builder.namespace("sld", crate::SLD_NS)?;
        builder.namespace("ogc", crate::OGC_NS)?;
        builder.namespace("gml", crate::GML_NS)?;
        builder.namespace("xlink", crate::XLINK_NS)?;
        let mut root = builder.start()?;
        f(&mut root)?;
        root.finish()?;
    }
    String::from_utf8(out).map_err(|e| Error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_builder_poisons() {
        let _ = env_logger::Builder::new().is_test(true).try_init();
        let e = fragment(|w| {
            let _ = w.element(ExpandedNameRef::sld("Rule"));
            Ok(())
        })
        .unwrap_err();
        assert_eq!(e.0, "ElementBuilder dropped before start");
    }

    #[test]
    fn dropped_writer_poisons() {
        let _ = env_logger::Builder::new().is_test(true).try_init();
        let e = fragment(|w| {
            let _ = w.element(ExpandedNameRef::sld("Rule")).start();
            Ok(())
        })
        .unwrap_err();
        assert_eq!(e.0, "ElementWriter dropped before finish");
    }

    #[test]
    fn inherited_prefixes_are_not_redeclared() {
        let _ = env_logger::Builder::new().is_test(true).try_init();
        let out = fragment(|w| {
            let mut rule = w.element(ExpandedNameRef::sld("Rule")).start()?;
            rule.text_element(ExpandedNameRef::ogc("PropertyName"), "name")?;
            rule.finish()
        })
        .unwrap();
        assert_eq!(
            out,
            concat!(
                r#"<root xmlns:gml="http://www.opengis.net/gml" xmlns:ogc="http://www.opengis.net/ogc" "#,
                r#"xmlns:sld="http://www.opengis.net/sld" xmlns:xlink="http://www.w3.org/1999/xlink">"#,
                r#"<sld:Rule><ogc:PropertyName>name</ogc:PropertyName></sld:Rule></root>"#,
            )
        );
    }

    #[test]
    fn undeclared_namespace_is_an_error() {
        let _ = env_logger::Builder::new().is_test(true).try_init();
        let e = fragment(|w| {
            w.empty_element(ExpandedNameRef {
                namespace: "urn:nowhere",
                local_name: "x",
            })
        })
        .unwrap_err();
        assert!(e.0.contains("undeclared namespace"), "{}", e);
    }
}
