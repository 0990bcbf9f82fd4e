// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;

use super::paint::{Fill, Font, Graphic, Halo, LabelPlacement, Stroke};
use super::{defaults, VendorOptions};
use crate::expr::Expression;
use crate::uom::Uom;

/// A rendering instruction attached to a rule.
#[derive(Clone, Debug, PartialEq)]
pub enum Symbolizer {
    Line(LineSymbolizer),
    Polygon(PolygonSymbolizer),
    Point(PointSymbolizer),
    Text(TextSymbolizer),
    Raster(RasterSymbolizer),
}

impl Symbolizer {
    pub fn uom(&self) -> Option<Uom> {
        match self {
            Symbolizer::Line(s) => s.uom,
            Symbolizer::Polygon(s) => s.uom,
            Symbolizer::Point(s) => s.uom,
            Symbolizer::Text(s) => s.uom,
            Symbolizer::Raster(s) => s.uom,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineSymbolizer {
    pub geometry: Option<Expression>,
    pub uom: Option<Uom>,
    pub stroke: Option<Stroke>,
    pub perpendicular_offset: Expression,
    pub options: VendorOptions,
}

impl Default for LineSymbolizer {
    fn default() -> Self {
        LineSymbolizer {
            geometry: None,
            uom: None,
            stroke: None,
            perpendicular_offset: defaults::PERPENDICULAR_OFFSET.into(),
            options: VendorOptions::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonSymbolizer {
    pub geometry: Option<Expression>,
    pub uom: Option<Uom>,
    pub fill: Option<Fill>,
    pub stroke: Option<Stroke>,
    pub options: VendorOptions,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointSymbolizer {
    pub geometry: Option<Expression>,
    pub uom: Option<Uom>,
    pub graphic: Graphic,
    pub options: VendorOptions,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextSymbolizer {
    pub geometry: Option<Expression>,
    pub uom: Option<Uom>,
    pub label: Option<Expression>,

    /// Fonts in order of preference.
    pub fonts: Vec<Font>,
    pub placement: Option<LabelPlacement>,
    pub halo: Option<Halo>,
    pub fill: Option<Fill>,
    pub graphic: Option<Graphic>,
    pub snippet: Option<Expression>,
    pub feature_description: Option<Expression>,
    pub other_text: Option<OtherText>,
    pub priority: Option<Expression>,
    pub options: VendorOptions,
}

/// Text for a location other than the map, such as a tooltip.
#[derive(Clone, Debug, PartialEq)]
pub struct OtherText {
    pub target: String,
    pub text: Expression,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RasterSymbolizer {
    pub geometry: Option<Expression>,
    pub uom: Option<Uom>,
    pub opacity: Expression,
    pub channel_selection: Option<ChannelSelection>,
    pub overlap: Option<OverlapBehavior>,
    pub color_map: ColorMap,
    pub contrast: Option<ContrastEnhancement>,
    pub shaded_relief: Option<ShadedRelief>,
    pub image_outline: Option<ImageOutline>,
    pub options: VendorOptions,
}

impl Default for RasterSymbolizer {
    fn default() -> Self {
        RasterSymbolizer {
            geometry: None,
            uom: None,
            opacity: defaults::RASTER_OPACITY.into(),
            channel_selection: None,
            overlap: None,
            color_map: ColorMap::default(),
            contrast: None,
            shaded_relief: None,
            image_outline: None,
            options: VendorOptions::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChannelSelection {
    Gray(SelectedChannel),

    /// Red, green and blue; a channel missing from the document is `None`.
    Rgb([Option<SelectedChannel>; 3]),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectedChannel {
    pub name: Option<Expression>,
    pub contrast: Option<ContrastEnhancement>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OverlapBehavior {
    LatestOnTop,
    EarliestOnTop,
    Average,
    Random,
}

impl OverlapBehavior {
    pub fn element_name(self) -> &'static str {
        match self {
            OverlapBehavior::LatestOnTop => "LATEST_ON_TOP",
            OverlapBehavior::EarliestOnTop => "EARLIEST_ON_TOP",
            OverlapBehavior::Average => "AVERAGE",
            OverlapBehavior::Random => "RANDOM",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            OverlapBehavior::LatestOnTop,
            OverlapBehavior::EarliestOnTop,
            OverlapBehavior::Average,
            OverlapBehavior::Random,
        ]
        .into_iter()
        .find(|b| b.element_name().eq_ignore_ascii_case(name))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColorMapKind {
    Ramp,
    Intervals,
    Values,
}

impl Default for ColorMapKind {
    fn default() -> Self {
        ColorMapKind::Ramp
    }
}

impl ColorMapKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorMapKind::Ramp => "ramp",
            ColorMapKind::Intervals => "intervals",
            ColorMapKind::Values => "values",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [ColorMapKind::Ramp, ColorMapKind::Intervals, ColorMapKind::Values]
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorMap {
    pub kind: ColorMapKind,
    pub extended: bool,
    pub entries: Vec<ColorMapEntry>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorMapEntry {
    pub color: Option<Expression>,
    pub opacity: Option<Expression>,
    pub quantity: Option<Expression>,
    pub label: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ContrastMethod {
    Normalize,
    Histogram,
    Logarithmic,
    Exponential,
}

impl ContrastMethod {
    pub fn element_name(self) -> &'static str {
        match self {
            ContrastMethod::Normalize => "Normalize",
            ContrastMethod::Histogram => "Histogram",
            ContrastMethod::Logarithmic => "Logarithmic",
            ContrastMethod::Exponential => "Exponential",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            ContrastMethod::Normalize,
            ContrastMethod::Histogram,
            ContrastMethod::Logarithmic,
            ContrastMethod::Exponential,
        ]
        .into_iter()
        .find(|m| m.element_name().eq_ignore_ascii_case(name))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContrastEnhancement {
    pub method: Option<ContrastMethod>,

    /// Vendor options of the method, such as `algorithm`.
    pub options: BTreeMap<String, Expression>,
    pub gamma: Option<Expression>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShadedRelief {
    pub brightness_only: bool,
    pub relief_factor: Option<Expression>,
}

/// The symbolizer used to draw the outline of each raster image.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageOutline {
    Line(LineSymbolizer),
    Polygon(PolygonSymbolizer),
}
