// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Paint properties shared by the symbolizers.

use std::collections::BTreeMap;

use super::defaults;
use crate::expr::Expression;

#[derive(Clone, Debug, PartialEq)]
pub struct Fill {
    pub color: Expression,
    pub opacity: Expression,
    pub graphic_fill: Option<Graphic>,
}

impl Default for Fill {
    fn default() -> Self {
        Fill {
            color: defaults::FILL_COLOR.into(),
            opacity: defaults::FILL_OPACITY.into(),
            graphic_fill: None,
        }
    }
}

impl Fill {
    /// A solid fill of the given color.
    pub fn solid(color: impl Into<String>) -> Self {
        Fill {
            color: Expression::literal(color),
            ..Fill::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    pub color: Expression,
    pub width: Expression,
    pub opacity: Expression,
    pub line_join: Expression,
    pub line_cap: Expression,

    /// Dash lengths; empty for a solid line.
    pub dash_array: Vec<Expression>,
    pub dash_offset: Expression,
    pub graphic_fill: Option<Graphic>,
    pub graphic_stroke: Option<Graphic>,
}

impl Default for Stroke {
    fn default() -> Self {
        Stroke {
            color: defaults::STROKE_COLOR.into(),
            width: defaults::STROKE_WIDTH.into(),
            opacity: defaults::STROKE_OPACITY.into(),
            line_join: defaults::STROKE_LINEJOIN.into(),
            line_cap: defaults::STROKE_LINECAP.into(),
            dash_array: Vec::new(),
            dash_offset: defaults::STROKE_DASHOFFSET.into(),
            graphic_fill: None,
            graphic_stroke: None,
        }
    }
}

/// One of the symbols drawn by a [`Graphic`], in order.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphicSymbol {
    Mark(Mark),
    External(ExternalGraphic),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Graphic {
    pub symbols: Vec<GraphicSymbol>,
    pub opacity: Expression,
    pub size: Option<Expression>,
    pub rotation: Expression,
    pub anchor_point: Option<AnchorPoint>,
    pub displacement: Option<Displacement>,
}

impl Default for Graphic {
    /// A single default square mark.
    fn default() -> Self {
        Graphic {
            symbols: vec![GraphicSymbol::Mark(Mark::default())],
            opacity: defaults::GRAPHIC_OPACITY.into(),
            size: None,
            rotation: defaults::GRAPHIC_ROTATION.into(),
            anchor_point: None,
            displacement: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mark {
    pub well_known_name: Expression,
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
}

impl Default for Mark {
    fn default() -> Self {
        Mark {
            well_known_name: defaults::MARK_WELL_KNOWN_NAME.into(),
            fill: None,
            stroke: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExternalGraphic {
    pub online_resource: Option<String>,
    pub format: String,

    /// Decoded bytes of embedded image data; empty when the encoding wasn't understood.
    pub inline_content: Option<Vec<u8>>,
    pub custom_properties: BTreeMap<String, Expression>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub families: Vec<Expression>,
    pub style: Expression,
    pub weight: Expression,
    pub size: Expression,
}

impl Default for Font {
    fn default() -> Self {
        Font {
            families: vec![defaults::FONT_FAMILY.into()],
            style: defaults::FONT_STYLE.into(),
            weight: defaults::FONT_WEIGHT.into(),
            size: defaults::FONT_SIZE.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Halo {
    pub radius: Expression,
    pub fill: Fill,
}

impl Default for Halo {
    fn default() -> Self {
        Halo {
            radius: defaults::HALO_RADIUS.into(),
            fill: Fill::solid(defaults::HALO_FILL_COLOR),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LabelPlacement {
    Point(PointPlacement),
    Line(LinePlacement),
}

#[derive(Clone, Debug, PartialEq)]
pub struct PointPlacement {
    pub anchor_point: Option<AnchorPoint>,
    pub displacement: Option<Displacement>,
    pub rotation: Expression,
}

impl Default for PointPlacement {
    fn default() -> Self {
        PointPlacement {
            anchor_point: None,
            displacement: None,
            rotation: defaults::PLACEMENT_ROTATION.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinePlacement {
    pub perpendicular_offset: Expression,
}

impl Default for LinePlacement {
    fn default() -> Self {
        LinePlacement {
            perpendicular_offset: defaults::PERPENDICULAR_OFFSET.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnchorPoint {
    pub x: Expression,
    pub y: Expression,
}

impl Default for AnchorPoint {
    fn default() -> Self {
        AnchorPoint {
            x: defaults::ANCHOR_POINT.into(),
            y: defaults::ANCHOR_POINT.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Displacement {
    pub x: Expression,
    pub y: Expression,
}

impl Default for Displacement {
    fn default() -> Self {
        Displacement {
            x: defaults::DISPLACEMENT.into(),
            y: defaults::DISPLACEMENT.into(),
        }
    }
}

impl Displacement {
    /// True if both offsets are literals equal to the default of zero.
    pub fn is_default(&self) -> bool {
        self.x.is_literal_eq(defaults::DISPLACEMENT) && self.y.is_literal_eq(defaults::DISPLACEMENT)
    }
}
