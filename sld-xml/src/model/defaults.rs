// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Documented default values.
//!
//! The parser starts each builder from these, and the serializer leaves out
//! any literal equal to them, so the two sides can't drift apart.

pub const STROKE_COLOR: &str = "#000000";
pub const STROKE_WIDTH: &str = "1.0";
pub const STROKE_OPACITY: &str = "1.0";
pub const STROKE_LINEJOIN: &str = "miter";
pub const STROKE_LINECAP: &str = "butt";
pub const STROKE_DASHOFFSET: &str = "0.0";

pub const FILL_COLOR: &str = "#808080";
pub const FILL_OPACITY: &str = "1.0";

pub const GRAPHIC_OPACITY: &str = "1.0";
pub const GRAPHIC_ROTATION: &str = "0.0";

pub const MARK_WELL_KNOWN_NAME: &str = "square";

pub const PLACEMENT_ROTATION: &str = "0.0";
pub const DISPLACEMENT: &str = "0.0";
pub const ANCHOR_POINT: &str = "0.5";
pub const PERPENDICULAR_OFFSET: &str = "0.0";

pub const HALO_RADIUS: &str = "1.0";
pub const HALO_FILL_COLOR: &str = "#FFFFFF";

pub const RASTER_OPACITY: &str = "1.0";

pub const FONT_FAMILY: &str = "Serif";
pub const FONT_STYLE: &str = "normal";
pub const FONT_WEIGHT: &str = "normal";
pub const FONT_SIZE: &str = "10.0";

/// The semantic type identifier a feature type style has when none are given.
pub const SEMANTIC_TYPE_ANY: &str = "generic:any";
