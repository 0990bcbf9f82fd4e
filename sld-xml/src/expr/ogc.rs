// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The OGC Filter Encoding 1.0 vocabulary.

use super::{ComparisonOp, Expression, ExpressionFromMarkup, Filter, MarkupFromExpression};
use crate::de::{parse_bool, trim, walk, Element};
use crate::ser::{ElementWriter, Error};
use crate::ExpandedNameRef;

/// Reads and writes `ogc:` expressions and filters.
#[derive(Copy, Clone, Debug, Default)]
pub struct OgcMarkup;

fn binary(node: &Element, reader: &OgcMarkup) -> Option<(Box<Expression>, Box<Expression>)> {
    let mut it = node.elements();
    let a = reader.expression(it.next()?)?;
    let b = reader.expression(it.next()?)?;
    Some((Box::new(a), Box::new(b)))
}

fn first_expression(node: &Element, reader: &OgcMarkup) -> Option<Expression> {
    reader.expression(walk::first_element(node)?)
}

impl OgcMarkup {
    fn operator(&self, node: &Element) -> Option<Filter> {
        let name = node.local_name();
        if let Some(op) = ComparisonOp::from_element_name(name) {
            let (left, right) = binary(node, self)?;
            let match_case = node.attribute("matchCase").and_then(parse_bool).unwrap_or(true);
            return Some(Filter::Compare {
                op,
                left: *left,
                right: *right,
                match_case,
            });
        }
        match_ignore_case(name, &[
            "Include", "Exclude", "And", "Or", "Not", "PropertyIsLike", "PropertyIsNull",
            "PropertyIsBetween", "FeatureId", "GmlObjectId",
        ])
        .and_then(|kind| match kind {
            "Include" => Some(Filter::Include),
            "Exclude" => Some(Filter::Exclude),
            "And" | "Or" => {
                let parts = node
                    .elements()
                    .map(|c| self.operator(c))
                    .collect::<Option<Vec<_>>>()?;
                Some(if kind == "And" {
                    Filter::And(parts)
                } else {
                    Filter::Or(parts)
                })
            }
            "Not" => Some(Filter::Not(Box::new(
                self.operator(walk::first_element(node)?)?,
            ))),
            "PropertyIsLike" => {
                let expr = first_expression(node, self)?;
                let pattern = walk::find_child(node, "Literal")?.text();
                let attr = |name: &str, default: &str| {
                    node.attribute(name).unwrap_or(default).to_owned()
                };
                Some(Filter::Like {
                    expr,
                    pattern,
                    wild_card: attr("wildCard", "*"),
                    single_char: attr("singleChar", "?"),
                    escape: node
                        .attribute("escape")
                        .or_else(|| node.attribute("escapeChar"))
                        .unwrap_or("\\")
                        .to_owned(),
                })
            }
            "PropertyIsNull" => Some(Filter::IsNull(first_expression(node, self)?)),
            "PropertyIsBetween" => {
                let expr = node
                    .elements()
                    .find(|c| !c.is("LowerBoundary") && !c.is("UpperBoundary"))
                    .and_then(|c| self.expression(c))?;
                let lower = first_expression(walk::find_child(node, "LowerBoundary")?, self)?;
                let upper = first_expression(walk::find_child(node, "UpperBoundary")?, self)?;
                Some(Filter::Between { expr, lower, upper })
            }
            _ => Some(Filter::Id(vec![fid(node)?.to_owned()])),
        })
    }
}

fn match_ignore_case<'a>(name: &str, vocabulary: &[&'a str]) -> Option<&'a str> {
    vocabulary
        .iter()
        .copied()
        .find(|v| v.eq_ignore_ascii_case(name))
}

fn fid(node: &Element) -> Option<&str> {
    node.attribute("fid").or_else(|| node.attribute("id"))
}

impl ExpressionFromMarkup for OgcMarkup {
    fn expression(&self, node: &Element) -> Option<Expression> {
        let name = node.local_name();
        let kind = match_ignore_case(name, &[
            "PropertyName", "Literal", "Function", "Add", "Sub", "Mul", "Div",
        ])?;
        Some(match kind {
            "PropertyName" => Expression::Property(trim(&node.text()).to_owned()),
            "Literal" => Expression::Literal(node.text()),
            "Function" => Expression::Function {
                name: node.attribute("name")?.to_owned(),
                args: node
                    .elements()
                    .map(|c| self.expression(c))
                    .collect::<Option<Vec<_>>>()?,
            },
            "Add" => {
                let (a, b) = binary(node, self)?;
                Expression::Add(a, b)
            }
            "Sub" => {
                let (a, b) = binary(node, self)?;
                Expression::Sub(a, b)
            }
            "Mul" => {
                let (a, b) = binary(node, self)?;
                Expression::Mul(a, b)
            }
            _ => {
                let (a, b) = binary(node, self)?;
                Expression::Div(a, b)
            }
        })
    }

    fn filter(&self, node: &Element) -> Option<Filter> {
        if !node.is("Filter") {
            return self.operator(node);
        }
        let children: Vec<&Element> = node.elements().collect();
        if !children.is_empty()
            && children
                .iter()
                .all(|c| c.is("FeatureId") || c.is("GmlObjectId"))
        {
            let ids = children
                .iter()
                .map(|c| fid(c).map(str::to_owned))
                .collect::<Option<Vec<_>>>()?;
            return Some(Filter::Id(ids));
        }
        self.operator(children.first()?)
    }
}

impl MarkupFromExpression for OgcMarkup {
    fn write_expression(
        &self,
        parent: &mut ElementWriter,
        expr: &Expression,
    ) -> Result<(), Error> {
        let (op, a, b) = match expr {
            Expression::Nil => return Ok(()),
            Expression::Literal(s) => {
                return parent.text_element(ExpandedNameRef::ogc("Literal"), s)
            }
            Expression::Property(p) => {
                return parent.text_element(ExpandedNameRef::ogc("PropertyName"), p)
            }
            Expression::Function { name, args } => {
                let mut f = parent.element(ExpandedNameRef::ogc("Function"));
                f.attribute(ExpandedNameRef::local("name"), name.clone())?;
                let mut f = f.start()?;
                for arg in args {
                    self.write_expression(&mut f, arg)?;
                }
                return f.finish();
            }
            Expression::Add(a, b) => ("Add", a, b),
            Expression::Sub(a, b) => ("Sub", a, b),
            Expression::Mul(a, b) => ("Mul", a, b),
            Expression::Div(a, b) => ("Div", a, b),
        };
        let mut w = parent.element(ExpandedNameRef::ogc(op)).start()?;
        self.write_expression(&mut w, a)?;
        self.write_expression(&mut w, b)?;
        w.finish()
    }

    fn write_filter(&self, parent: &mut ElementWriter, filter: &Filter) -> Result<(), Error> {
        match filter {
            Filter::Include => parent.empty_element(ExpandedNameRef::ogc("Include")),
            Filter::Exclude => parent.empty_element(ExpandedNameRef::ogc("Exclude")),
            Filter::Compare {
                op,
                left,
                right,
                match_case,
            } => {
                let mut e = parent.element(ExpandedNameRef::ogc(op.element_name()));
                if !match_case {
                    e.attribute(ExpandedNameRef::local("matchCase"), "false".to_owned())?;
                }
                let mut e = e.start()?;
                self.write_expression(&mut e, left)?;
                self.write_expression(&mut e, right)?;
                e.finish()
            }
            Filter::Like {
                expr,
                pattern,
                wild_card,
                single_char,
                escape,
            } => {
                let mut e = parent.element(ExpandedNameRef::ogc("PropertyIsLike"));
                e.attribute(ExpandedNameRef::local("wildCard"), wild_card.clone())?;
                e.attribute(ExpandedNameRef::local("singleChar"), single_char.clone())?;
                e.attribute(ExpandedNameRef::local("escape"), escape.clone())?;
                let mut e = e.start()?;
                self.write_expression(&mut e, expr)?;
                e.text_element(ExpandedNameRef::ogc("Literal"), pattern)?;
                e.finish()
            }
            Filter::IsNull(expr) => {
                let mut e = parent.element(ExpandedNameRef::ogc("PropertyIsNull")).start()?;
                self.write_expression(&mut e, expr)?;
                e.finish()
            }
            Filter::Between { expr, lower, upper } => {
                let mut e = parent
                    .element(ExpandedNameRef::ogc("PropertyIsBetween"))
                    .start()?;
                self.write_expression(&mut e, expr)?;
                for (name, bound) in [("LowerBoundary", lower), ("UpperBoundary", upper)] {
                    let mut b = e.element(ExpandedNameRef::ogc(name)).start()?;
                    self.write_expression(&mut b, bound)?;
                    b.finish()?;
                }
                e.finish()
            }
            Filter::And(parts) | Filter::Or(parts) => {
                let name = if matches!(filter, Filter::And(_)) {
                    "And"
                } else {
                    "Or"
                };
                let mut e = parent.element(ExpandedNameRef::ogc(name)).start()?;
                for p in parts {
                    self.write_filter(&mut e, p)?;
                }
                e.finish()
            }
            Filter::Not(inner) => {
                let mut e = parent.element(ExpandedNameRef::ogc("Not")).start()?;
                self.write_filter(&mut e, inner)?;
                e.finish()
            }
            Filter::Id(ids) => {
                for id in ids {
                    let mut e = parent.element(ExpandedNameRef::ogc("FeatureId"));
                    e.attribute(ExpandedNameRef::local("fid"), id.clone())?;
                    e.start()?.finish()?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::tree::from_str;
    use assert_matches::assert_matches;

    const OGC: &str = r#"xmlns:ogc="http://www.opengis.net/ogc""#;

    fn read_filter(body: &str) -> Option<Filter> {
        let doc = format!("<ogc:Filter {}>{}</ogc:Filter>", OGC, body);
        OgcMarkup.filter(&from_str(&doc).unwrap())
    }

    #[test]
    fn expressions() {
        let root = from_str(&format!(
            r#"<ogc:Add {}><ogc:PropertyName> width </ogc:PropertyName><ogc:Function name="env"><ogc:Literal>w</ogc:Literal></ogc:Function></ogc:Add>"#,
            OGC
        ))
        .unwrap();
        assert_eq!(
            OgcMarkup.expression(&root),
            Some(Expression::Add(
                Box::new(Expression::property("width")),
                Box::new(Expression::function("env", vec!["w".into()])),
            ))
        );
    }

    #[test]
    fn unknown_elements_are_not_expressions() {
        let root = from_str("<CssParameter>1</CssParameter>").unwrap();
        assert_eq!(OgcMarkup.expression(&root), None);
        let root = from_str(&format!("<ogc:Function {}/>", OGC)).unwrap();
        assert_eq!(OgcMarkup.expression(&root), None, "Function requires a name");
    }

    #[test]
    fn comparison() {
        let f = read_filter(
            r#"<ogc:PropertyIsEqualTo matchCase="false"><ogc:PropertyName>kind</ogc:PropertyName><ogc:Literal>road</ogc:Literal></ogc:PropertyIsEqualTo>"#,
        );
        assert_matches!(f, Some(Filter::Compare { op: ComparisonOp::EqualTo, match_case: false, .. }));
    }

    #[test]
    fn logical_and_between() {
        let f = read_filter(
            r#"<ogc:And>
                 <ogc:PropertyIsNull><ogc:PropertyName>a</ogc:PropertyName></ogc:PropertyIsNull>
                 <ogc:Not><ogc:PropertyIsBetween><ogc:PropertyName>b</ogc:PropertyName>
                   <ogc:LowerBoundary><ogc:Literal>1</ogc:Literal></ogc:LowerBoundary>
                   <ogc:UpperBoundary><ogc:Literal>2</ogc:Literal></ogc:UpperBoundary>
                 </ogc:PropertyIsBetween></ogc:Not>
               </ogc:And>"#,
        )
        .unwrap();
        assert_matches!(f, Filter::And(ref parts) => {
            assert_matches!(&parts[..], [Filter::IsNull(_), Filter::Not(inner)] => {
                assert_matches!(**inner, Filter::Between { ref lower, .. } => {
                    assert_eq!(lower, &Expression::literal("1"));
                });
            });
        });
    }

    #[test]
    fn feature_ids() {
        let f = read_filter(r#"<ogc:FeatureId fid="a.1"/><ogc:FeatureId fid="a.2"/>"#);
        assert_eq!(f, Some(Filter::Id(vec!["a.1".to_owned(), "a.2".to_owned()])));
        assert_eq!(read_filter(""), None);
    }

    #[test]
    fn writes_filter() {
        let _ = env_logger::builder().is_test(true).try_init();
        let filter = Filter::Like {
            expr: Expression::property("name"),
            pattern: "A*".to_owned(),
            wild_card: "*".to_owned(),
            single_char: "?".to_owned(),
            escape: "!".to_owned(),
        };
        let out = crate::ser::fragment(|w| OgcMarkup.write_filter(w, &filter)).unwrap();
        assert!(
            out.contains(concat!(
                r#"<ogc:PropertyIsLike wildCard="*" singleChar="?" escape="!">"#,
                "<ogc:PropertyName>name</ogc:PropertyName><ogc:Literal>A*</ogc:Literal>",
                "</ogc:PropertyIsLike>"
            )),
            "{}",
            out
        );
    }
}
