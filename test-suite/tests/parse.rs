// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use assert_matches::assert_matches;
use sld_xml::expr::{ComparisonOp, Expression, Filter};
use sld_xml::feature::SrsCache;
use sld_xml::model::{
    ChannelSelection, ColorMapKind, ContrastMethod, GraphicSymbol, InternationalString,
    LabelPlacement, Layer, OverlapBehavior, RuleFilter, Style, StyledLayerDescriptor, Symbolizer,
    UserStyle,
};
use sld_xml::uom::Uom;

const ROADS: &str = include_str!("data/roads.sld");
const PARKS: &str = include_str!("data/parks.sld");

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn user_style(sld: &StyledLayerDescriptor, layer: usize) -> &UserStyle {
    let styles = match &sld.layers[layer] {
        Layer::Named(l) => &l.styles,
        Layer::User(l) => &l.styles,
    };
    match &styles[0] {
        Style::User(s) => s,
        other => panic!("expected a user style, got {:?}", other),
    }
}

#[test]
fn descriptor_and_layers() {
    init();
    let sld = sld_xml::from_str(ROADS).unwrap();
    assert_eq!(sld.name.as_deref(), Some("roads"));
    assert_eq!(sld.title.as_deref(), Some("Road network"));
    assert_eq!(sld.layers.len(), 2);
    let roads = match &sld.layers[0] {
        Layer::Named(l) => l,
        other => panic!("{:?}", other),
    };
    assert_eq!(roads.name.as_deref(), Some("topp:roads"));
    assert_eq!(roads.constraints.len(), 1);
    assert_eq!(roads.constraints[0].type_name, "roads");
    assert_eq!(roads.constraints[0].extents[0].value.as_deref(), Some("2021"));

    let style = user_style(&sld, 0);
    assert!(style.is_default);
    assert_matches!(
        &style.description.title,
        Some(InternationalString::Localized { default, translations })
            if default == "Roads" && translations.get("fr").map(String::as_str) == Some("Routes")
    );
    assert_eq!(style.feature_type_styles.len(), 2);
    let fts = &style.feature_type_styles[0];
    assert_eq!(fts.feature_type_names, ["roads"]);
    assert_eq!(fts.semantic_type_identifiers, ["generic:any"]);
    assert_eq!(fts.options.get("sortBy").map(String::as_str), Some("priority"));
}

#[test]
fn rules_and_symbolizers() {
    init();
    let sld = sld_xml::from_str(ROADS).unwrap();
    let rules = &user_style(&sld, 0).feature_type_styles[0].rules;
    let highway = &rules[0];
    assert_matches!(
        &highway.filter,
        RuleFilter::Filter(Filter::Compare { op: ComparisonOp::EqualTo, right, .. })
            if right == &Expression::literal("highway")
    );
    assert_eq!(highway.min_scale_denominator, 0.0);
    assert_eq!(highway.max_scale_denominator, 500000.0);

    let line = match &highway.symbolizers[0] {
        Symbolizer::Line(l) => l,
        other => panic!("{:?}", other),
    };
    assert_eq!(line.uom, Some(Uom::Metre));
    assert_eq!(line.geometry, Some(Expression::property("the_geom")));
    assert_eq!(line.options.get("graphic-margin").map(String::as_str), Some("2"));
    let stroke = line.stroke.as_ref().unwrap();
    assert_eq!(stroke.color, Expression::literal("#E04040"));
    assert_eq!(
        stroke.width,
        Expression::Mul(
            Box::new(Expression::property("lanes")),
            Box::new(Expression::literal("2"))
        )
    );
    assert_eq!(stroke.dash_array, [Expression::number(8.0), Expression::number(4.0)]);
    assert!(stroke.line_join.is_literal_eq("miter"));

    let text = match &highway.symbolizers[1] {
        Symbolizer::Text(t) => t,
        other => panic!("{:?}", other),
    };
    assert_eq!(
        text.label,
        Some(Expression::concat2("Route ".into(), Expression::property("number")))
    );
    assert_eq!(text.fonts.len(), 1);
    assert_eq!(
        text.fonts[0].families,
        [Expression::literal("DejaVu Sans"), Expression::literal("Arial")]
    );
    assert_eq!(text.fonts[0].weight, Expression::literal("bold"));
    assert_eq!(text.fonts[0].style, Expression::literal("normal"));
    assert_matches!(&text.placement, Some(LabelPlacement::Line(l)) if l.perpendicular_offset.is_literal_eq("4"));
    let halo = text.halo.as_ref().unwrap();
    assert!(halo.radius.is_literal_eq("2"));
    assert!(halo.fill.opacity.is_literal_eq("0.8"));

    assert_eq!(rules[1].filter, RuleFilter::Else);
    assert_eq!(rules[1].min_scale_denominator, 1000.0);
    assert_eq!(rules[1].max_scale_denominator, f64::INFINITY);
}

#[test]
fn graphics() {
    init();
    let sld = sld_xml::from_str(ROADS).unwrap();
    let rule = &user_style(&sld, 0).feature_type_styles[1].rules[0];
    let graphic = match &rule.symbolizers[..] {
        [Symbolizer::Point(p)] => &p.graphic,
        other => panic!("{:?}", other),
    };
    assert_matches!(
        &graphic.symbols[..],
        [GraphicSymbol::External(e), GraphicSymbol::Mark(m)]
            if e.online_resource.as_deref() == Some("http://example.com/sign.png")
                && e.format == "image/png"
                && m.well_known_name == Expression::literal("circle")
    );
    assert_eq!(graphic.size, Some(Expression::literal("12")));
    assert_eq!(graphic.rotation, Expression::property("heading"));
    let d = graphic.displacement.as_ref().unwrap();
    assert_eq!((&d.x, &d.y), (&Expression::literal("1"), &Expression::literal("-1")));
}

#[test]
fn raster() {
    init();
    let sld = sld_xml::from_str(ROADS).unwrap();
    let raster = match &user_style(&sld, 1).feature_type_styles[0].rules[0].symbolizers[..] {
        [Symbolizer::Raster(r)] => r,
        other => panic!("{:?}", other),
    };
    assert_eq!(raster.opacity, Expression::literal("0.7"));
    assert_matches!(
        &raster.channel_selection,
        Some(ChannelSelection::Gray(g))
            if g.name == Some(Expression::literal("1"))
                && g.contrast.as_ref().and_then(|c| c.gamma.clone()) == Some(Expression::literal("1.2"))
    );
    assert_eq!(raster.overlap, Some(OverlapBehavior::LatestOnTop));
    assert_eq!(raster.color_map.kind, ColorMapKind::Intervals);
    assert!(raster.color_map.extended);
    assert_eq!(raster.color_map.entries.len(), 2);
    assert_eq!(raster.color_map.entries[0].label.as_deref(), Some("low"));
    assert_eq!(raster.color_map.entries[1].opacity, Some(Expression::literal("0.5")));
    let contrast = raster.contrast.as_ref().unwrap();
    assert_eq!(contrast.method, Some(ContrastMethod::Normalize));
    assert_eq!(
        contrast.options.get("algorithm"),
        Some(&Expression::literal("StretchToMinimumMaximum"))
    );
    let relief = raster.shaded_relief.as_ref().unwrap();
    assert!(relief.brightness_only);
    assert_eq!(relief.relief_factor, Some(Expression::number(55.0)));
}

#[test]
fn malformed_xml_reports_position() {
    init();
    let e = sld_xml::from_str(
        r#"<StyledLayerDescriptor xmlns="http://www.opengis.net/sld">
             <NamedLayer>
               <Name>broken</Nme>
             </NamedLayer>
           </StyledLayerDescriptor>"#,
    )
    .unwrap_err();
    assert!(!e.is_format());
    assert!(e.to_string().contains("3:"), "{}", e);
}

#[test]
fn wrong_document_is_a_format_error() {
    init();
    let e = sld_xml::from_str("<html><body/></html>").unwrap_err();
    assert!(e.is_format(), "{}", e);
}

#[test]
fn descriptor_may_be_nested() {
    init();
    let sld = sld_xml::from_str(
        r#"<wrapper><StyledLayerDescriptor xmlns="http://www.opengis.net/sld">
             <NamedLayer><Name>a</Name></NamedLayer>
           </StyledLayerDescriptor></wrapper>"#,
    )
    .unwrap();
    assert_eq!(sld.layers.len(), 1);
}

#[test]
fn parsers_share_a_spatial_reference_cache() {
    init();
    let cache = Arc::new(SrsCache::new());
    let parser = sld_xml::Parser::new().srs_cache(cache.clone());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let parser = parser.clone();
            std::thread::spawn(move || {
                let root = sld_xml::de::tree::from_str(PARKS).unwrap();
                parser.parse(&root).unwrap()
            })
        })
        .collect();
    let parsed: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(parsed.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(cache.len(), 1);
}
