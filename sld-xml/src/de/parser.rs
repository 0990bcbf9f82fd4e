// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The style document parser: descriptor, layers, styles and rules.
//!
//! Symbolizers live in `symbolizer.rs` and paint properties in `paint.rs`;
//! all three are `impl Parser` blocks sharing the helpers defined here.
//!
//! Every structural element is handled the same way: its element children
//! are visited in document order and matched on their local name, ignoring
//! ASCII case. Names outside the vocabulary are skipped without comment.
//! Where a slot takes one value, a later sibling overwrites an earlier one.

use std::sync::Arc;

use log::debug;

use super::inline::InlineFeatureParser;
use super::resolve::{parameter_value, resolve};
use super::tree::{Element, Node};
use super::{parse_bool, trim, walk, Error};
use crate::expr::{Expression, ExpressionFromMarkup, Filter, OgcMarkup};
use crate::feature::{
    EpsgAuthority, GeometryFromMarkup, GmlGeometry, RecordFactory, ResolveAuthorityCode,
    SimpleRecords, SrsCache,
};
use crate::model::{
    Extent, FeatureTypeConstraint, FeatureTypeStyle, InternationalString, Layer,
    LayerSource, NamedLayer, NamedStyle, RemoteOws, Rule, RuleFilter, Style,
    StyledLayerDescriptor, UserLayer, UserStyle, VendorOptions,
};
use crate::uom::Uom;

/// Parses a document tree into a [`StyledLayerDescriptor`].
///
/// The collaborators used for embedded expressions, inline geometries,
/// spatial references and feature records can each be replaced:
///
/// ```rust
/// # use std::sync::Arc;
/// # use sld_xml::feature::SrsCache;
/// let cache = Arc::new(SrsCache::new());
/// let parser = sld_xml::Parser::new().srs_cache(cache.clone());
/// let root = sld_xml::de::tree::from_str(
///     r#"<StyledLayerDescriptor xmlns="http://www.opengis.net/sld">
///          <NamedLayer><Name>roads</Name></NamedLayer>
///        </StyledLayerDescriptor>"#,
/// ).unwrap();
/// let sld = parser.parse(&root).unwrap();
/// assert_eq!(sld.layers.len(), 1);
/// ```
#[derive(Clone)]
pub struct Parser {
    pub(super) expressions: Arc<dyn ExpressionFromMarkup>,
    pub(super) geometries: Arc<dyn GeometryFromMarkup>,
    pub(super) authorities: Arc<dyn ResolveAuthorityCode>,
    pub(super) records: Arc<dyn RecordFactory>,
    pub(super) srs_cache: Arc<SrsCache>,
}

impl Default for Parser {
    fn default() -> Self {
        Parser {
            expressions: Arc::new(OgcMarkup),
            geometries: Arc::new(GmlGeometry),
            authorities: Arc::new(EpsgAuthority),
            records: Arc::new(SimpleRecords),
            srs_cache: Arc::new(SrsCache::new()),
        }
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("srs_cache", &self.srs_cache)
            .finish_non_exhaustive()
    }
}

/// The local name of `e`, lowercased for matching.
pub(super) fn tag(e: &Element) -> String {
    e.local_name().to_ascii_lowercase()
}

impl Parser {
    /// A parser using the OGC expression vocabulary, GML geometries, EPSG
    /// codes and a fresh spatial reference cache.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expressions(self, expressions: Arc<dyn ExpressionFromMarkup>) -> Self {
        Self {
            expressions,
            ..self
        }
    }

    pub fn geometries(self, geometries: Arc<dyn GeometryFromMarkup>) -> Self {
        Self { geometries, ..self }
    }

    pub fn authorities(self, authorities: Arc<dyn ResolveAuthorityCode>) -> Self {
        Self {
            authorities,
            ..self
        }
    }

    pub fn records(self, records: Arc<dyn RecordFactory>) -> Self {
        Self { records, ..self }
    }

    /// Shares a spatial reference cache, typically between parsers on several threads.
    pub fn srs_cache(self, srs_cache: Arc<SrsCache>) -> Self {
        Self { srs_cache, ..self }
    }

    /// Returns the parser for `InlineFeature` blocks, sharing this parser's collaborators.
    pub fn inline_features(&self) -> InlineFeatureParser<'_> {
        InlineFeatureParser::new(
            &*self.geometries,
            &*self.authorities,
            &*self.records,
            &self.srs_cache,
        )
    }

    /// Parses a whole document.
    ///
    /// `root` is normally the `StyledLayerDescriptor` element itself; if it
    /// isn't, the first descendant of that name is used.
    pub fn parse(&self, root: &Element) -> Result<StyledLayerDescriptor, Error> {
        let node = if root.is("StyledLayerDescriptor") {
            root
        } else {
            match walk::find_all_by_name(root, "StyledLayerDescriptor").first().copied() {
                Some(n) => n,
                None => {
                    return Err(Error::format(
                        root,
                        format!("expected StyledLayerDescriptor, found {}", root.local_name()),
                    ))
                }
            }
        };
        self.parse_descriptor(node)
    }

    pub fn parse_descriptor(&self, node: &Element) -> Result<StyledLayerDescriptor, Error> {
        let mut sld = StyledLayerDescriptor::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "name" => sld.name = text(child),
                "title" => sld.title = text(child),
                "abstract" => sld.abstract_ = text(child),
                "namedlayer" => sld.layers.push(Layer::Named(
                    self.parse_named_layer(child).map_err(|e| e.within(node))?,
                )),
                "userlayer" => sld.layers.push(Layer::User(
                    self.parse_user_layer(child).map_err(|e| e.within(node))?,
                )),
                _ => {}
            }
        }
        Ok(sld)
    }

    pub fn parse_named_layer(&self, node: &Element) -> Result<NamedLayer, Error> {
        let mut layer = NamedLayer::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "name" => layer.name = text(child),
                "namedstyle" => layer.styles.push(Style::Named(self.parse_named_style(child))),
                "userstyle" => layer.styles.push(Style::User(
                    self.parse_user_style(child).map_err(|e| e.within(node))?,
                )),
                "layerfeatureconstraints" => {
                    layer.constraints = self.parse_layer_feature_constraints(child)
                }
                _ => {}
            }
        }
        Ok(layer)
    }

    pub fn parse_user_layer(&self, node: &Element) -> Result<UserLayer, Error> {
        let mut layer = UserLayer::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "name" => layer.name = text(child),
                "inlinefeature" => {
                    let features = self
                        .inline_features()
                        .parse(child)
                        .map_err(|e| e.within(node))?;
                    layer.source = Some(LayerSource::Inline(features));
                }
                "remoteows" => layer.source = Some(LayerSource::Remote(self.parse_remote_ows(child))),
                "layerfeatureconstraints" => {
                    layer.constraints = self.parse_layer_feature_constraints(child)
                }
                "userstyle" => layer.styles.push(Style::User(
                    self.parse_user_style(child).map_err(|e| e.within(node))?,
                )),
                _ => {}
            }
        }
        Ok(layer)
    }

    pub fn parse_remote_ows(&self, node: &Element) -> RemoteOws {
        let mut remote = RemoteOws::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "service" => remote.service = text(child),
                "onlineresource" => remote.online_resource = online_resource(child),
                _ => {}
            }
        }
        remote
    }

    /// Parses the `FeatureTypeConstraint`s of a `LayerFeatureConstraints`
    /// element, dropping any without a type name.
    pub fn parse_layer_feature_constraints(&self, node: &Element) -> Vec<FeatureTypeConstraint> {
        let mut out = Vec::new();
        for child in node.elements().filter(|c| c.is("FeatureTypeConstraint")) {
            let mut type_name = None;
            let mut filter = None;
            let mut extents = Vec::new();
            for c in child.elements() {
                match tag(c).as_str() {
                    "featuretypename" => type_name = text(c),
                    "filter" => filter = self.expressions.filter(c),
                    "extent" => extents.push(Extent {
                        name: walk::find_child(c, "Name").and_then(text),
                        value: walk::find_child(c, "Value").and_then(text),
                    }),
                    _ => {}
                }
            }
            match type_name {
                Some(type_name) => out.push(FeatureTypeConstraint {
                    type_name,
                    filter,
                    extents,
                }),
                None => debug!("dropping FeatureTypeConstraint without a FeatureTypeName"),
            }
        }
        out
    }

    pub fn parse_named_style(&self, node: &Element) -> NamedStyle {
        let mut style = NamedStyle::default();
        for child in node.elements() {
            if child.children.is_empty() {
                continue;
            }
            if child.is("Name") {
                style.name = text(child);
            }
        }
        style
    }

    pub fn parse_user_style(&self, node: &Element) -> Result<UserStyle, Error> {
        let mut style = UserStyle::default();
        for child in node.elements() {
            if child.children.is_empty() {
                continue;
            }
            match tag(child).as_str() {
                "name" => style.name = text(child),
                "title" => style.description.title = Some(self.parse_international_string(child)),
                "abstract" => {
                    style.description.abstract_ = Some(self.parse_international_string(child))
                }
                "isdefault" => match walk::first_child_text(child).and_then(parse_bool) {
                    Some(b) => style.is_default = b,
                    None => debug!("ignoring unparseable IsDefault {:?}", child.text()),
                },
                "featuretypestyle" => style.feature_type_styles.push(
                    self.parse_feature_type_style(child)
                        .map_err(|e| e.within(node))?,
                ),
                "background" => style.background = Some(self.parse_fill(child)),
                _ => {}
            }
        }
        Ok(style)
    }

    pub fn parse_feature_type_style(&self, node: &Element) -> Result<FeatureTypeStyle, Error> {
        let mut fts = FeatureTypeStyle::default();
        let mut semantic_types = Vec::new();
        for child in node.elements() {
            match tag(child).as_str() {
                "name" => fts.name = text(child),
                "title" => fts.description.title = Some(self.parse_international_string(child)),
                "abstract" => {
                    fts.description.abstract_ = Some(self.parse_international_string(child))
                }
                "featuretypename" => fts.feature_type_names.extend(text(child)),
                "semantictypeidentifier" => semantic_types.extend(text(child)),
                "rule" => fts
                    .rules
                    .push(self.parse_rule(child).map_err(|e| e.within(node))?),
                "transformation" => {
                    fts.transformation =
                        walk::first_element(child).and_then(|e| self.expressions.expression(e))
                }
                "vendoroption" => self.parse_vendor_option(child, &mut fts.options),
                _ => {}
            }
        }
        if !semantic_types.is_empty() {
            fts.semantic_type_identifiers = semantic_types;
        }
        Ok(fts)
    }

    pub fn parse_rule(&self, node: &Element) -> Result<Rule, Error> {
        let mut rule = Rule::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "name" => rule.name = text(child),
                "title" => rule.description.title = Some(self.parse_international_string(child)),
                "abstract" => {
                    rule.description.abstract_ = Some(self.parse_international_string(child))
                }
                "minscaledenominator" => {
                    if let Some(v) = self.scale_denominator(child) {
                        rule.min_scale_denominator = v;
                    }
                }
                "maxscaledenominator" => {
                    if let Some(v) = self.scale_denominator(child) {
                        rule.max_scale_denominator = v;
                    }
                }
                "filter" => match self.expressions.filter(child) {
                    // An include-everything filter is the same as none.
                    Some(Filter::Include) => rule.filter = RuleFilter::Unset,
                    Some(f) => rule.filter = RuleFilter::Filter(f),
                    None => debug!("ignoring unrecognized rule filter"),
                },
                "elsefilter" => rule.filter = RuleFilter::Else,
                "legendgraphic" => {
                    if let Some(g) = walk::find_all_by_name(child, "Graphic").first() {
                        rule.legend = Some(self.parse_graphic(g));
                    }
                }
                "linesymbolizer" | "polygonsymbolizer" | "pointsymbolizer"
                | "textsymbolizer" | "rastersymbolizer" => {
                    rule.symbolizers.extend(self.parse_symbolizer(child).map_err(|e| e.within(node))?)
                }
                "vendoroption" => self.parse_vendor_option(child, &mut rule.options),
                _ => {}
            }
        }
        Ok(rule)
    }

    fn scale_denominator(&self, node: &Element) -> Option<f64> {
        let value = self.value(node);
        let parsed = value.as_f64();
        if parsed.is_none() {
            debug!("ignoring unparseable {} {}", node.local_name(), value);
        }
        parsed
    }

    /// Parses text which may carry `Localized` translations.
    pub fn parse_international_string(&self, node: &Element) -> InternationalString {
        let mut default = String::new();
        let mut translations = std::collections::BTreeMap::new();
        for child in &node.children {
            match child {
                Node::Text(t) | Node::CData(t) => default.push_str(trim(t)),
                Node::Element(e) if e.is("Localized") => {
                    let lang = e.attribute("lang").unwrap_or_default().to_owned();
                    let translation = walk::first_child_text(e).unwrap_or_default().to_owned();
                    translations.insert(lang, translation);
                }
                Node::Element(_) => {}
            }
        }
        if translations.is_empty() {
            InternationalString::Plain(walk::first_child_text(node).unwrap_or_default().to_owned())
        } else {
            InternationalString::Localized {
                default,
                translations,
            }
        }
    }

    /// Adds a `VendorOption` to `options`. Options without a name or with a
    /// blank value are skipped.
    pub fn parse_vendor_option(&self, node: &Element, options: &mut VendorOptions) {
        let name = match node.attribute("name") {
            Some(n) => n,
            None => {
                debug!("ignoring VendorOption without a name");
                return;
            }
        };
        match walk::first_child_text(node) {
            Some(v) if !trim(v).is_empty() => {
                options.insert(name.to_owned(), v.to_owned());
            }
            _ => {}
        }
    }

    /// A value-bearing element with each text node trimmed.
    pub(super) fn value(&self, node: &Element) -> Expression {
        resolve(node, true, &*self.expressions)
    }

    /// A value-bearing element whose whitespace collapses as label text does.
    pub(super) fn mixed(&self, node: &Element) -> Expression {
        resolve(node, false, &*self.expressions)
    }

    pub(super) fn parameter(&self, node: &Element, mixed: bool) -> Expression {
        parameter_value(node, mixed, &*self.expressions)
    }

    /// The expression naming a symbolizer's geometry, typically `ogc:PropertyName`.
    pub(super) fn geometry(&self, node: &Element) -> Option<Expression> {
        walk::first_element(node).and_then(|e| self.expressions.expression(e))
    }

    pub(super) fn uom(&self, node: &Element) -> Option<Uom> {
        let value = node.attribute("uom")?;
        let uom = Uom::parse(value);
        if uom.is_none() {
            debug!("ignoring unknown unit of measure {:?}", value);
        }
        uom
    }
}

/// The raw first child text of `node`, owned.
pub(super) fn text(node: &Element) -> Option<String> {
    walk::first_child_text(node).map(str::to_owned)
}

/// The `xlink:href` of an online resource, accepting an unqualified `href` too.
pub(super) fn online_resource(node: &Element) -> Option<String> {
    node.attribute_ns(crate::ExpandedNameRef {
        namespace: crate::XLINK_NS,
        local_name: "href",
    })
    .or_else(|| node.attribute("href"))
    .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::tree::from_str;
    use crate::expr::{ComparisonOp, Filter};
    use crate::model::Symbolizer;
    use assert_matches::assert_matches;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn element(xml: &str) -> Element {
        from_str(xml).unwrap()
    }

    const NS: &str = r#"xmlns="http://www.opengis.net/sld" xmlns:ogc="http://www.opengis.net/ogc""#;

    #[test]
    fn last_filter_wins() {
        init();
        let p = Parser::new();
        let else_last = element(&format!(
            r#"<Rule {}>
                 <ogc:Filter><ogc:PropertyIsEqualTo>
                   <ogc:PropertyName>a</ogc:PropertyName><ogc:Literal>1</ogc:Literal>
                 </ogc:PropertyIsEqualTo></ogc:Filter>
                 <ElseFilter/>
               </Rule>"#,
            NS
        ));
        assert_eq!(p.parse_rule(&else_last).unwrap().filter, RuleFilter::Else);
        let filter_last = element(&format!(
            r#"<Rule {}>
                 <ElseFilter/>
                 <ogc:Filter><ogc:PropertyIsEqualTo>
                   <ogc:PropertyName>a</ogc:PropertyName><ogc:Literal>1</ogc:Literal>
                 </ogc:PropertyIsEqualTo></ogc:Filter>
               </Rule>"#,
            NS
        ));
        assert_matches!(
            p.parse_rule(&filter_last).unwrap().filter,
            RuleFilter::Filter(Filter::Compare { op: ComparisonOp::EqualTo, .. })
        );
    }

    #[test]
    fn bad_scale_denominator_keeps_default() {
        init();
        let rule = element(&format!(
            r#"<Rule {}>
                 <MinScaleDenominator>lots</MinScaleDenominator>
                 <MaxScaleDenominator> 50000 </MaxScaleDenominator>
               </Rule>"#,
            NS
        ));
        let rule = Parser::new().parse_rule(&rule).unwrap();
        assert_eq!(rule.min_scale_denominator, 0.0);
        assert_eq!(rule.max_scale_denominator, 50000.0);
    }

    #[test]
    fn rule_vocabulary() {
        init();
        let rule = element(
            r#"<sld:Rule xmlns:sld="http://www.opengis.net/sld">
                 <sld:name>r</sld:name>
                 <sld:Title>t</sld:Title>
                 <sld:LegendGraphic><sld:Graphic><sld:Size>12</sld:Size></sld:Graphic></sld:LegendGraphic>
                 <sld:LineSymbolizer/>
                 <sld:Frobnicate/>
                 <sld:VendorOption name="group">yes</sld:VendorOption>
                 <sld:VendorOption name="blank">  </sld:VendorOption>
                 <sld:VendorOption>nameless</sld:VendorOption>
               </sld:Rule>"#,
        );
        let rule = Parser::new().parse_rule(&rule).unwrap();
        assert_eq!(rule.name.as_deref(), Some("r"));
        assert_eq!(rule.description.title, Some(InternationalString::from("t")));
        assert_eq!(
            rule.legend.unwrap().size,
            Some(Expression::literal("12"))
        );
        assert_matches!(&rule.symbolizers[..], [Symbolizer::Line(_)]);
        assert_eq!(rule.options.len(), 1);
        assert_eq!(rule.options["group"], "yes");
    }

    #[test]
    fn localized_titles() {
        init();
        let p = Parser::new();
        let plain = element("<Title>  Roads </Title>");
        assert_eq!(
            p.parse_international_string(&plain),
            InternationalString::Plain("  Roads ".to_owned())
        );
        let localized = element(
            r#"<Title> Roads <Localized lang="fr">Routes</Localized><Localized lang="de">Straßen</Localized></Title>"#,
        );
        assert_matches!(
            p.parse_international_string(&localized),
            InternationalString::Localized { default, translations } => {
                assert_eq!(default, "Roads");
                assert_eq!(translations["fr"], "Routes");
                assert_eq!(translations["de"], "Straßen");
            }
        );
        let empty = element("<Title/>");
        assert_eq!(p.parse_international_string(&empty), InternationalString::from(""));
    }

    #[test]
    fn feature_type_style() {
        init();
        let fts = element(&format!(
            r#"<FeatureTypeStyle {}>
                 <FeatureTypeName>roads</FeatureTypeName>
                 <SemanticTypeIdentifier>generic:line</SemanticTypeIdentifier>
                 <SemanticTypeIdentifier>simple</SemanticTypeIdentifier>
                 <Transformation><ogc:Function name="vec:Heatmap"><ogc:Literal>1</ogc:Literal></ogc:Function></Transformation>
                 <Rule/><Rule/>
               </FeatureTypeStyle>"#,
            NS
        ));
        let fts = Parser::new().parse_feature_type_style(&fts).unwrap();
        assert_eq!(fts.feature_type_names, ["roads"]);
        assert_eq!(fts.semantic_type_identifiers, ["generic:line", "simple"]);
        assert_matches!(fts.transformation, Some(Expression::Function { name, .. }) => {
            assert_eq!(name, "vec:Heatmap");
        });
        assert_eq!(fts.rules.len(), 2);

        let bare = element("<FeatureTypeStyle/>");
        let bare = Parser::new().parse_feature_type_style(&bare).unwrap();
        assert_eq!(bare.semantic_type_identifiers, ["generic:any"]);
    }

    #[test]
    fn user_style_skips_empty_children() {
        init();
        let style = element(&format!(
            r#"<UserStyle {}><Name>s</Name><IsDefault/><IsDefault>1</IsDefault><Title/></UserStyle>"#,
            NS
        ));
        let style = Parser::new().parse_user_style(&style).unwrap();
        assert_eq!(style.name.as_deref(), Some("s"));
        assert!(style.is_default);
        assert_eq!(style.description.title, None);
    }

    #[test]
    fn layers_and_constraints() {
        init();
        let root = element(&format!(
            r#"<StyledLayerDescriptor {} xmlns:xlink="http://www.w3.org/1999/xlink">
                 <Name>doc</Name>
                 <NamedLayer>
                   <Name>roads</Name>
                   <LayerFeatureConstraints>
                     <FeatureTypeConstraint>
                       <FeatureTypeName>road</FeatureTypeName>
                       <Extent><Name>time</Name><Value>2020</Value></Extent>
                     </FeatureTypeConstraint>
                     <FeatureTypeConstraint/>
                   </LayerFeatureConstraints>
                   <NamedStyle><Name>night</Name></NamedStyle>
                 </NamedLayer>
                 <UserLayer>
                   <RemoteOWS>
                     <Service>WFS</Service>
                     <OnlineResource xlink:href="http://example.com/wfs"/>
                   </RemoteOWS>
                 </UserLayer>
               </StyledLayerDescriptor>"#,
            NS
        ));
        let sld = Parser::new().parse(&root).unwrap();
        assert_eq!(sld.name.as_deref(), Some("doc"));
        assert_matches!(&sld.layers[..], [Layer::Named(named), Layer::User(user)] => {
            assert_eq!(named.name.as_deref(), Some("roads"));
            assert_eq!(named.constraints.len(), 1);
            assert_eq!(named.constraints[0].type_name, "road");
            assert_eq!(named.constraints[0].extents[0].value.as_deref(), Some("2020"));
            assert_matches!(&named.styles[..], [Style::Named(s)] => {
                assert_eq!(s.name.as_deref(), Some("night"));
            });
            assert_matches!(&user.source, Some(LayerSource::Remote(r)) => {
                assert_eq!(r.service.as_deref(), Some("WFS"));
                assert_eq!(r.online_resource.as_deref(), Some("http://example.com/wfs"));
            });
        });
    }

    #[test]
    fn wrong_root_is_a_format_error() {
        init();
        let e = Parser::new().parse(&element("<html/>")).unwrap_err();
        assert!(e.is_format());
    }
}
