// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Paint properties: fills, strokes, graphics, fonts and label placement.
//!
//! None of these fail. A value that can't be understood is logged and the
//! property keeps its default.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, warn};

use super::parser::{online_resource, tag, text};
use super::tree::{Element, Node};
use super::{walk, Parser};
use crate::expr::Expression;
use crate::model::{
    AnchorPoint, Displacement, ExternalGraphic, Fill, Font, Graphic, GraphicSymbol, Halo,
    LabelPlacement, LinePlacement, Mark, PointPlacement, Stroke,
};

/// Iterates over the `CssParameter` (or `SvgParameter`) children of `node`
/// as `(name, element)`, skipping any without a name.
fn css_parameters(node: &Element) -> impl Iterator<Item = (String, &Element)> {
    node.elements()
        .filter(|e| e.is("CssParameter") || e.is("SvgParameter"))
        .filter_map(|e| Some((e.attribute("name")?.to_ascii_lowercase(), e)))
}

impl Parser {
    pub fn parse_fill(&self, node: &Element) -> Fill {
        let mut fill = Fill::default();
        if let Some(gf) = walk::find_all_by_name(node, "GraphicFill").first() {
            fill.graphic_fill = walk::find_child(gf, "Graphic").map(|g| self.parse_graphic(g));
        }
        for (name, param) in css_parameters(node) {
            match name.as_str() {
                "fill" => fill.color = self.value(param),
                "opacity" | "fill-opacity" => fill.opacity = self.value(param),
                _ => {}
            }
        }
        fill
    }

    pub fn parse_stroke(&self, node: &Element) -> Stroke {
        let mut stroke = Stroke::default();
        if let Some(gf) = walk::find_all_by_name(node, "GraphicFill").first() {
            stroke.graphic_fill = walk::find_child(gf, "Graphic").map(|g| self.parse_graphic(g));
        }
        if let Some(gs) = walk::find_all_by_name(node, "GraphicStroke").first() {
            stroke.graphic_stroke =
                walk::find_child(gs, "Graphic").map(|g| self.parse_graphic(g));
        }
        for (name, param) in css_parameters(node) {
            match name.as_str() {
                "stroke" => stroke.color = self.value(param),
                "width" | "stroke-width" => stroke.width = self.mixed(param),
                "opacity" | "stroke-opacity" => stroke.opacity = self.mixed(param),
                "linecap" | "stroke-linecap" => stroke.line_cap = self.value(param),
                "linejoin" | "stroke-linejoin" => stroke.line_join = self.value(param),
                "dasharray" | "stroke-dasharray" => stroke.dash_array = self.dash_array(param),
                "dashoffset" | "stroke-dashoffset" => stroke.dash_offset = self.value(param),
                _ => {}
            }
        }
        stroke
    }

    /// Parses a dash array. Text is split on whitespace into numbers; an
    /// embedded expression stays whole unless it's a literal, whose text is
    /// split the same way.
    fn dash_array(&self, node: &Element) -> Vec<Expression> {
        fn split(text: &str, out: &mut Vec<Expression>) {
            for part in text.split_whitespace() {
                match super::parse_f64(part) {
                    Some(v) => out.push(Expression::number(v)),
                    None => warn!("skipping non-numeric dash array entry {:?}", part),
                }
            }
        }
        let mut out = Vec::new();
        for child in &node.children {
            match child {
                Node::Text(t) | Node::CData(t) => split(t, &mut out),
                Node::Element(e) => match self.expressions.expression(e) {
                    Some(Expression::Literal(t)) => split(&t, &mut out),
                    Some(expr) => out.push(expr),
                    None => {}
                },
            }
        }
        out
    }

    /// Parses a graphic. The default square mark is dropped as soon as the
    /// document gives a `Mark` or `ExternalGraphic` of its own.
    pub fn parse_graphic(&self, node: &Element) -> Graphic {
        let mut graphic = Graphic::default();
        let mut first_symbol = true;
        for child in node.elements() {
            let symbol = match tag(child).as_str() {
                "externalgraphic" => GraphicSymbol::External(self.parse_external_graphic(child)),
                "mark" => GraphicSymbol::Mark(self.parse_mark(child)),
                "opacity" => {
                    graphic.opacity = self.value(child);
                    continue;
                }
                "size" => {
                    graphic.size = Some(self.value(child));
                    continue;
                }
                "displacement" => {
                    graphic.displacement = self.parse_displacement(child);
                    continue;
                }
                "anchorpoint" => {
                    graphic.anchor_point = Some(self.parse_anchor_point(child));
                    continue;
                }
                "rotation" => {
                    graphic.rotation = self.value(child);
                    continue;
                }
                _ => continue,
            };
            if first_symbol {
                graphic.symbols.clear();
                first_symbol = false;
            }
            graphic.symbols.push(symbol);
        }
        graphic
    }

    pub fn parse_mark(&self, node: &Element) -> Mark {
        let mut mark = Mark::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "wellknownname" => mark.well_known_name = self.value(child),
                "fill" => mark.fill = Some(self.parse_fill(child)),
                "stroke" => mark.stroke = Some(self.parse_stroke(child)),
                _ => {}
            }
        }
        mark
    }

    pub fn parse_external_graphic(&self, node: &Element) -> ExternalGraphic {
        let mut graphic = ExternalGraphic::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "inlinecontent" => {
                    let encoding = child.attribute("encoding");
                    let decoded = match encoding {
                        Some("base64") => {
                            let content = walk::first_child_text(child).unwrap_or_default();
                            decode_base64(content).unwrap_or_else(|e| {
                                warn!("inline content is not valid base64 ({}); using empty content", e);
                                Vec::new()
                            })
                        }
                        _ => {
                            warn!("can't decode inline content with encoding {:?}", encoding);
                            Vec::new()
                        }
                    };
                    graphic.inline_content = Some(decoded);
                }
                "onlineresource" => graphic.online_resource = online_resource(child),
                "format" => graphic.format = text(child).unwrap_or_default(),
                "customproperty" => match child.attribute("name") {
                    Some(name) => {
                        graphic
                            .custom_properties
                            .insert(name.to_owned(), self.value(child));
                    }
                    None => debug!("ignoring customProperty without a name"),
                },
                _ => {}
            }
        }
        graphic
    }

    /// Parses a `Font`. Each `font-family` parameter adds a family; the
    /// first replaces the default.
    pub fn parse_font(&self, node: &Element) -> Font {
        let mut font = Font::default();
        let mut first_family = true;
        for (name, param) in css_parameters(node) {
            match name.as_str() {
                "font-family" => {
                    if first_family {
                        font.families.clear();
                        first_family = false;
                    }
                    font.families.push(self.value(param));
                }
                "font-style" => font.style = self.value(param),
                "font-size" => font.size = self.value(param),
                "font-weight" => font.weight = self.value(param),
                _ => {}
            }
        }
        font
    }

    pub fn parse_halo(&self, node: &Element) -> Halo {
        let mut halo = Halo::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "fill" => halo.fill = self.parse_fill(child),
                "radius" => halo.radius = self.value(child),
                _ => {}
            }
        }
        halo
    }

    pub fn parse_label_placement(&self, node: &Element) -> Option<LabelPlacement> {
        let mut placement = None;
        for child in node.elements() {
            match tag(child).as_str() {
                "pointplacement" => {
                    placement = Some(LabelPlacement::Point(self.parse_point_placement(child)))
                }
                "lineplacement" => {
                    placement = Some(LabelPlacement::Line(self.parse_line_placement(child)))
                }
                _ => {}
            }
        }
        placement
    }

    pub fn parse_point_placement(&self, node: &Element) -> PointPlacement {
        let mut placement = PointPlacement::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "anchorpoint" => placement.anchor_point = Some(self.parse_anchor_point(child)),
                "displacement" => placement.displacement = self.parse_displacement(child),
                "rotation" => placement.rotation = self.value(child),
                _ => {}
            }
        }
        placement
    }

    pub fn parse_line_placement(&self, node: &Element) -> LinePlacement {
        let mut placement = LinePlacement::default();
        if let Some(offset) = walk::find_child(node, "PerpendicularOffset") {
            placement.perpendicular_offset = self.value(offset);
        }
        placement
    }

    pub fn parse_anchor_point(&self, node: &Element) -> AnchorPoint {
        let mut anchor = AnchorPoint::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "anchorpointx" => anchor.x = self.value(child),
                "anchorpointy" => anchor.y = self.value(child),
                _ => {}
            }
        }
        anchor
    }

    /// Returns `None` for a displacement of zero in both directions.
    pub fn parse_displacement(&self, node: &Element) -> Option<Displacement> {
        let mut displacement = Displacement::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "displacementx" => displacement.x = self.value(child),
                "displacementy" => displacement.y = self.value(child),
                _ => {}
            }
        }
        Some(displacement).filter(|d| !d.is_default())
    }
}

/// Decodes standard padded base64, ignoring white space.
fn decode_base64(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact)
}
