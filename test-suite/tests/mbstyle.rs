// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use assert_matches::assert_matches;
use sld_xml::expr::Expression;
use sld_xml::mbstyle;
use sld_xml::model::{Layer, Style, Symbolizer};

const STYLE: &str = r##"{
    "version": 8,
    "name": "city",
    "sources": {"osm": {"type": "vector", "url": "https://example.com/tiles.json"}},
    "layers": [
        {"id": "bg", "type": "background", "paint": {"background-color": "hsl(240, 100%, 50%)"}},
        {
            "id": "water",
            "type": "fill",
            "source": "osm",
            "source-layer": "water",
            "paint": {"fill-color": "#88c", "fill-outline-color": "rgba(0, 0, 128, 0.5)"}
        },
        {
            "id": "roads",
            "type": "line",
            "source-layer": "transportation",
            "minzoom": 10,
            "layout": {"line-cap": "round"},
            "paint": {"line-color": "#444", "line-width": 3, "line-dasharray": [2, 1]}
        },
        {
            "id": "road-names",
            "type": "symbol",
            "source-layer": "transportation",
            "layout": {"text-field": "{name} ({ref})", "text-font": ["Noto Sans"], "text-size": 12},
            "paint": {"text-halo-width": 1.5, "text-halo-color": "white"}
        },
        {"id": "pois", "type": "circle", "paint": {"circle-radius": 4, "circle-color": "red"}},
        {"id": "hidden", "type": "fill", "layout": {"visibility": "none"}},
        {"id": "hills", "type": "hillshade"}
    ]
}"##;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn converts_layers() {
    init();
    let sld = mbstyle::parse(STYLE).unwrap();
    assert_eq!(sld.name.as_deref(), Some("city"));
    let style = match &sld.layers[..] {
        [Layer::User(l)] => match &l.styles[..] {
            [Style::User(s)] => s,
            other => panic!("{:?}", other),
        },
        other => panic!("{:?}", other),
    };
    let names: Vec<_> = style
        .feature_type_styles
        .iter()
        .map(|f| f.name.as_deref().unwrap())
        .collect();
    assert_eq!(names, ["water", "roads", "road-names", "pois"]);
    assert_eq!(
        style.background.as_ref().map(|f| &f.color),
        Some(&Expression::literal("#0000FF"))
    );

    let water = &style.feature_type_styles[0];
    assert_eq!(water.feature_type_names, ["water"]);
    assert_matches!(&water.rules[0].symbolizers[..], [Symbolizer::Polygon(p)] => {
        assert_eq!(p.fill.as_ref().unwrap().color, Expression::literal("#8888CC"));
        let outline = p.stroke.as_ref().unwrap();
        assert_eq!(outline.color, Expression::literal("#000080"));
        assert_eq!(outline.opacity, Expression::literal("0.5"));
    });

    let roads = &style.feature_type_styles[1].rules[0];
    assert_eq!(roads.max_scale_denominator, mbstyle::zoom_to_scale(10.0));
    assert_matches!(&roads.symbolizers[..], [Symbolizer::Line(l)] => {
        let stroke = l.stroke.as_ref().unwrap();
        assert_eq!(stroke.width, Expression::literal("3.0"));
        assert_eq!(stroke.line_cap, Expression::literal("round"));
        assert_eq!(stroke.dash_array, [Expression::number(2.0), Expression::number(1.0)]);
    });

    assert_matches!(
        &style.feature_type_styles[2].rules[0].symbolizers[..],
        [Symbolizer::Text(t)] => {
            assert_eq!(
                t.label,
                Some(Expression::join(vec![
                    Expression::property("name"),
                    Expression::literal(" ("),
                    Expression::property("ref"),
                    Expression::literal(")"),
                ]))
            );
            assert_eq!(t.fonts[0].families, [Expression::literal("Noto Sans")]);
            assert_eq!(t.fonts[0].size, Expression::literal("12.0"));
            let halo = t.halo.as_ref().unwrap();
            assert_eq!(halo.radius, Expression::literal("1.5"));
            assert_eq!(halo.fill.color, Expression::literal("#FFFFFF"));
        }
    );
}

#[test]
fn converted_style_survives_sld() {
    init();
    let sld = mbstyle::parse(STYLE).unwrap();
    for indent in [false, true] {
        let out = sld_xml::serialize(&sld).perform_indent(indent).to_string().unwrap();
        assert_eq!(sld_xml::from_str(&out).unwrap(), sld, "{}", out);
    }
}

#[test]
fn rejects_bad_documents() {
    init();
    assert_matches!(mbstyle::parse("{"), Err(mbstyle::Error::Json(_)));
    assert_matches!(mbstyle::parse("[]"), Err(mbstyle::Error::Format(_)));
    assert_matches!(mbstyle::parse(r#"{"name": "x"}"#), Err(mbstyle::Error::Format(_)));
}
