// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup helpers over an [`Element`] tree.
//!
//! None of these fail: a missing optional element is the normal case and is
//! reported as `None` or an empty `Vec`.

use super::tree::{Element, Node};

/// Returns the first child element whose local name matches `name`, ignoring ASCII case.
pub fn find_child<'a>(node: &'a Element, name: &str) -> Option<&'a Element> {
    node.elements().find(|e| e.is(name))
}

/// Returns all descendant elements named `name`, in document order.
///
/// Namespace-tolerant: elements in a namespace (with an exact local name
/// match) are preferred; when there are none, unqualified elements are
/// matched with any `prefix:` in the raw tag name stripped.
pub fn find_all_by_name<'a>(node: &'a Element, name: &str) -> Vec<&'a Element> {
    let mut out = Vec::new();
    collect(node, &mut out, &|e| {
        e.name.namespace.as_deref().map_or(false, |ns| !ns.is_empty()) && e.name.local_name == name
    });
    if out.is_empty() {
        collect(node, &mut out, &|e| e.local_name() == name);
    }
    out
}

fn collect<'a>(node: &'a Element, out: &mut Vec<&'a Element>, pred: &dyn Fn(&Element) -> bool) {
    for child in node.elements() {
        if pred(child) {
            out.push(child);
        }
        collect(child, out, pred);
    }
}

/// Returns the raw value of the first child node, if it is text or CDATA.
///
/// An element whose first child is another element, or which has no
/// children at all, yields `None`.
pub fn first_child_text(node: &Element) -> Option<&str> {
    match node.children.first()? {
        Node::Text(t) | Node::CData(t) => Some(t),
        Node::Element(_) => None,
    }
}

/// Returns the first child element, skipping text and CDATA.
pub fn first_element(node: &Element) -> Option<&Element> {
    node.elements().next()
}
