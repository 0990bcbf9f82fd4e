// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversion between Styled Layer Descriptor (SLD) documents and a typed
//! style model.
//!
//! *   [`de`] materializes a document tree and turns it into a
//!     [`model::StyledLayerDescriptor`].
//! *   [`ser`] writes a style model back out, eliding default values.
//! *   [`mbstyle`] reads a subset of the JSON (MapBox-style) dialect into the
//!     same model.

pub mod de;
pub mod expr;
pub mod feature;
pub mod mbstyle;
pub mod model;
pub mod ser;
pub mod uom;

pub use de::{from_str, read, Parser};
pub use ser::serialize;

pub use xml::common::TextPosition;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// The SLD 1.0 namespace.
pub const SLD_NS: &str = "http://www.opengis.net/sld";

/// The OGC filter/expression namespace.
pub const OGC_NS: &str = "http://www.opengis.net/ogc";

/// The GML namespace, used by inline features.
pub const GML_NS: &str = "http://www.opengis.net/gml";

/// The XLink namespace, used by online resources.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// A reference to an "expanded name": namespace and local name.
///
/// See [Namespaces in XML 1.1 (Second Edition) section 2.1: Basic
/// Concepts](https://www.w3.org/TR/2006/REC-xml-names11-20060816/#concepts).
///
/// The owned version is called [`ExpandedName`].
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExpandedNameRef<'a> {
    pub namespace: &'a str,
    pub local_name: &'a str,
}

impl<'a> ExpandedNameRef<'a> {
    /// A name in the SLD namespace.
    pub const fn sld(local_name: &'a str) -> Self {
        Self {
            namespace: SLD_NS,
            local_name,
        }
    }

    /// A name in the OGC filter namespace.
    pub const fn ogc(local_name: &'a str) -> Self {
        Self {
            namespace: OGC_NS,
            local_name,
        }
    }

    /// A name in the GML namespace.
    pub const fn gml(local_name: &'a str) -> Self {
        Self {
            namespace: GML_NS,
            local_name,
        }
    }

    /// A name with no namespace.
    pub const fn local(local_name: &'a str) -> Self {
        Self {
            namespace: "",
            local_name,
        }
    }

    fn from_xml_name(name: &xml::name::Name<'a>) -> Self {
        Self {
            namespace: match name.namespace {
                // Work around xml-rs's erroneous lack of builtin
                // xmlns:xml="http://www.w3.org/XML/1998/namespace" mapping.
                None if name.prefix == Some("xml") => XML_NS,
                None => "",
                Some(ns) => ns,
            },
            local_name: name.local_name,
        }
    }

    pub fn into_owned(self) -> ExpandedName {
        ExpandedName {
            namespace: self.namespace.to_owned(),
            local_name: self.local_name.to_owned(),
        }
    }
}

impl<'a> std::fmt::Display for ExpandedNameRef<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

/// An owned version of an "expanded name": namespace and local name.
///
/// The borrowed version is called [`ExpandedNameRef`].
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct ExpandedName {
    pub namespace: String,
    pub local_name: String,
}

impl ExpandedName {
    pub fn as_ref(&self) -> ExpandedNameRef {
        ExpandedNameRef {
            namespace: &self.namespace,
            local_name: &self.local_name,
        }
    }
}

impl std::fmt::Display for ExpandedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_ref().fmt(f)
    }
}
