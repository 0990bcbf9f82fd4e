// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns mixed content into a single [`Expression`].
//!
//! Value-bearing elements such as `<CssParameter>` or `<Label>` may hold any
//! mix of text, CDATA sections and embedded expression markup:
//!
//! ```xml
//! <Label>
//!   Route <ogc:PropertyName>number</ogc:PropertyName>
//! </Label>
//! ```
//!
//! [`resolve`] joins the pieces left to right. Text is normalized first:
//! with `trim_whitespace` each text node is trimmed; without it, runs are
//! collapsed to a single space and only the outermost whitespace of the
//! whole value is dropped, so the example above becomes
//! `strConcat('Route ', number)`. CDATA is never normalized.

use log::debug;

use super::tree::{Element, Node};
use super::{normalize, trim, WhiteSpace};
use crate::expr::{Expression, ExpressionFromMarkup};

/// One contribution to a resolved value.
#[derive(Debug)]
enum Part {
    Text { value: String, cdata: bool },
    Expr(Expression),
}

impl Part {
    fn into_expression(self) -> Expression {
        match self {
            Part::Text { value, .. } => Expression::Literal(value),
            Part::Expr(e) => e,
        }
    }
}

/// Resolves the children of `node`; see [`resolve_children`].
pub fn resolve(
    node: &Element,
    trim_whitespace: bool,
    expressions: &dyn ExpressionFromMarkup,
) -> Expression {
    resolve_children(&node.children, trim_whitespace, expressions)
}

/// Joins a mixed content sequence into one expression.
///
/// An empty sequence, or one where every part normalizes away, resolves to
/// the empty literal. Child elements the expression reader doesn't
/// recognize contribute nothing.
pub fn resolve_children(
    children: &[Node],
    trim_whitespace: bool,
    expressions: &dyn ExpressionFromMarkup,
) -> Expression {
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Node::Text(t) => {
                let value = if trim_whitespace {
                    trim(t).to_owned()
                } else {
                    normalize(t, WhiteSpace::CollapseInner)
                };
                if !value.is_empty() {
                    parts.push(Part::Text {
                        value,
                        cdata: false,
                    });
                }
            }
            Node::CData(t) => {
                if !t.is_empty() {
                    parts.push(Part::Text {
                        value: t.clone(),
                        cdata: true,
                    });
                }
            }
            Node::Element(e) => match expressions.expression(e) {
                Some(expr) => parts.push(Part::Expr(expr)),
                None => debug!("ignoring unrecognized {} in mixed content", e.local_name()),
            },
        }
    }
    if !trim_whitespace {
        trim_head(&mut parts);
        parts.reverse();
        trim_tail(&mut parts);
        parts.reverse();
    }
    Expression::join(parts.into_iter().map(Part::into_expression).collect())
}

/// Drops whitespace-only text at the front, then the single leading space of
/// the first remaining text. Stops at CDATA or an expression.
fn trim_head(parts: &mut Vec<Part>) {
    while let Some(Part::Text {
        value,
        cdata: false,
    }) = parts.first_mut()
    {
        if value.trim_start_matches(' ').is_empty() {
            parts.remove(0);
            continue;
        }
        if value.starts_with(' ') {
            value.remove(0);
        }
        break;
    }
}

/// As [`trim_head`], for a reversed list.
fn trim_tail(parts: &mut Vec<Part>) {
    while let Some(Part::Text {
        value,
        cdata: false,
    }) = parts.first_mut()
    {
        if value.trim_end_matches(' ').is_empty() {
            parts.remove(0);
            continue;
        }
        if value.ends_with(' ') {
            value.pop();
        }
        break;
    }
}

/// Resolves a parameter value such as a raster `Opacity` or `GammaValue`.
///
/// The element itself may be an expression. Otherwise a lone text child is
/// taken as a trimmed literal, and anything more is the concatenation of the
/// child expressions, plus the non-blank text between them if `mixed`. No
/// usable content yields [`Expression::Nil`].
pub fn parameter_value(
    node: &Element,
    mixed: bool,
    expressions: &dyn ExpressionFromMarkup,
) -> Expression {
    if let Some(e) = expressions.expression(node) {
        return e;
    }
    if let [Node::Text(t) | Node::CData(t)] = &node.children[..] {
        return Expression::literal(trim(t));
    }
    let mut parts = Vec::new();
    for child in &node.children {
        match child {
            Node::Element(e) => parts.extend(expressions.expression(e)),
            Node::Text(t) | Node::CData(t) if mixed => {
                let t = trim(t);
                if !t.is_empty() {
                    parts.push(Expression::literal(t));
                }
            }
            _ => {}
        }
    }
    if parts.is_empty() {
        Expression::Nil
    } else {
        Expression::join(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::tree::from_str;
    use crate::expr::{OgcMarkup, CONCATENATE, STR_CONCAT};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn resolve_str(content: &str, trim_whitespace: bool) -> Expression {
        let root = from_str(&format!(
            r#"<v xmlns:ogc="http://www.opengis.net/ogc">{}</v>"#,
            content
        ))
        .unwrap();
        resolve(&root, trim_whitespace, &OgcMarkup)
    }

    #[test]
    fn lone_text() {
        init();
        assert_eq!(resolve_str(" a ", false), Expression::literal("a"));
        assert_eq!(resolve_str(" a ", true), Expression::literal("a"));
        assert_eq!(
            resolve_str("\n  two\n\t words  ", false),
            Expression::literal("two words")
        );
        assert_eq!(resolve_str("  two   words ", true), Expression::literal("two   words"));
    }

    #[test]
    fn empty_is_empty_literal() {
        init();
        assert_eq!(resolve_str("", false), Expression::literal(""));
        assert_eq!(resolve_str("   ", true), Expression::literal(""));
        assert_eq!(resolve_str("\n  \n", false), Expression::literal(""));
    }

    #[test]
    fn interior_spaces_survive() {
        init();
        let e = resolve_str(
            " a <ogc:PropertyName>p</ogc:PropertyName> b ",
            false,
        );
        assert_eq!(
            e,
            Expression::function(
                CONCATENATE,
                vec!["a ".into(), Expression::property("p"), " b".into()]
            )
        );
    }

    #[test]
    fn two_parts_use_binary_concat() {
        init();
        let e = resolve_str("\n  Route <ogc:PropertyName>number</ogc:PropertyName>\n", false);
        assert_eq!(
            e,
            Expression::function(STR_CONCAT, vec!["Route ".into(), Expression::property("number")])
        );
    }

    #[test]
    fn trimming_drops_whitespace_between_elements() {
        init();
        let e = resolve_str(
            "\n <ogc:PropertyName>a</ogc:PropertyName>\n <ogc:PropertyName>b</ogc:PropertyName>\n",
            true,
        );
        assert_eq!(
            e.concatenation_args(),
            Some(&[Expression::property("a"), Expression::property("b")][..])
        );
    }

    #[test]
    fn cdata_is_verbatim() {
        init();
        assert_eq!(resolve_str("<![CDATA[   ]]>", true), Expression::literal("   "));
        assert_eq!(resolve_str("<![CDATA[   ]]>", false), Expression::literal("   "));
        let e = resolve_str(
            "<ogc:PropertyName>a</ogc:PropertyName><![CDATA[  ]]><ogc:PropertyName>b</ogc:PropertyName>",
            false,
        );
        assert_eq!(
            e.concatenation_args().map(|a| a[1].clone()),
            Some(Expression::literal("  "))
        );
        // Text next to CDATA at the edges is trimmed; the CDATA isn't.
        assert_eq!(
            resolve_str(" x <![CDATA[ y ]]>", false),
            Expression::concat2("x ".into(), " y ".into())
        );
    }

    #[test]
    fn unknown_elements_contribute_nothing() {
        init();
        assert_eq!(
            resolve_str("a<unknown/>", true),
            Expression::literal("a")
        );
    }

    #[test]
    fn parameter_values() {
        init();
        let root = from_str(
            r#"<r xmlns:ogc="http://www.opengis.net/ogc">
                 <a> 0.5 </a>
                 <b>
                   <ogc:PropertyName>x</ogc:PropertyName>
                 </b>
                 <c> pre <ogc:PropertyName>x</ogc:PropertyName></c>
                 <d>
                 </d>
                 <ogc:Literal>lit</ogc:Literal>
               </r>"#,
        )
        .unwrap();
        let v: Vec<_> = root
            .elements()
            .map(|e| parameter_value(e, true, &OgcMarkup))
            .collect();
        assert_eq!(v[0], Expression::literal("0.5"));
        assert_eq!(v[1], Expression::property("x"));
        assert_eq!(v[2], Expression::concat2("pre".into(), Expression::property("x")));
        assert_eq!(v[3], Expression::literal(""));
        assert_eq!(v[4], Expression::literal("lit"));
        let c = root.elements().nth(2).unwrap();
        assert_eq!(parameter_value(c, false, &OgcMarkup), Expression::property("x"));
        let empty = from_str("<e/>").unwrap();
        assert_eq!(parameter_value(&empty, true, &OgcMarkup), Expression::Nil);
    }
}
