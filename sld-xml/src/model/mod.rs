// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The typed style model.
//!
//! A [`StyledLayerDescriptor`] holds layers, which hold styles, which hold
//! feature type styles, rules and finally [`Symbolizer`]s with their paint
//! properties. Every node is a plain value: parsing builds it once and
//! serialization only reads it.

use std::collections::BTreeMap;

use crate::expr::{Expression, Filter};
use crate::feature::{Record, Schema};

pub mod defaults;
mod paint;
mod symbolizer;

pub use paint::{
    AnchorPoint, Displacement, ExternalGraphic, Fill, Font, Graphic, GraphicSymbol, Halo,
    LabelPlacement, LinePlacement, Mark, PointPlacement, Stroke,
};
pub use symbolizer::{
    ChannelSelection, ColorMap, ColorMapEntry, ColorMapKind, ContrastEnhancement, ContrastMethod,
    ImageOutline, LineSymbolizer, OtherText, OverlapBehavior, PointSymbolizer, PolygonSymbolizer,
    RasterSymbolizer, SelectedChannel, ShadedRelief, Symbolizer, TextSymbolizer,
};

/// Implementation-specific name/value extensions, written as `VendorOption`.
pub type VendorOptions = BTreeMap<String, String>;

/// Text which may carry per-locale translations.
#[derive(Clone, Debug, PartialEq)]
pub enum InternationalString {
    Plain(String),
    Localized {
        default: String,

        /// Translation by language tag.
        translations: BTreeMap<String, String>,
    },
}

impl InternationalString {
    /// The text to show when no locale is requested.
    pub fn default_text(&self) -> &str {
        match self {
            InternationalString::Plain(s) => s,
            InternationalString::Localized { default, .. } => default,
        }
    }
}

impl From<&str> for InternationalString {
    fn from(s: &str) -> Self {
        InternationalString::Plain(s.to_owned())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Description {
    pub title: Option<InternationalString>,
    pub abstract_: Option<InternationalString>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyledLayerDescriptor {
    pub name: Option<String>,
    pub title: Option<String>,
    pub abstract_: Option<String>,
    pub layers: Vec<Layer>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    Named(NamedLayer),
    User(UserLayer),
}

/// A layer advertised by the map server under a name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NamedLayer {
    pub name: Option<String>,
    pub constraints: Vec<FeatureTypeConstraint>,
    pub styles: Vec<Style>,
}

/// A layer whose data is given by the document itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserLayer {
    pub name: Option<String>,
    pub source: Option<LayerSource>,
    pub constraints: Vec<FeatureTypeConstraint>,

    /// Always [`Style::User`] when parsed.
    pub styles: Vec<Style>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayerSource {
    Inline(InlineFeatures),
    Remote(RemoteOws),
}

/// Features embedded in a [`UserLayer`].
#[derive(Clone, Debug, PartialEq)]
pub struct InlineFeatures {
    pub schema: Schema,
    pub records: Vec<Record>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemoteOws {
    pub service: Option<String>,
    pub online_resource: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureTypeConstraint {
    pub type_name: String,
    pub filter: Option<Filter>,
    pub extents: Vec<Extent>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Extent {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Style {
    Named(NamedStyle),
    User(UserStyle),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NamedStyle {
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserStyle {
    pub name: Option<String>,
    pub description: Description,
    pub is_default: bool,
    pub background: Option<Fill>,
    pub feature_type_styles: Vec<FeatureTypeStyle>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureTypeStyle {
    pub name: Option<String>,
    pub description: Description,
    pub feature_type_names: Vec<String>,
    pub semantic_type_identifiers: Vec<String>,
    pub transformation: Option<Expression>,
    pub rules: Vec<Rule>,
    pub options: VendorOptions,
}

impl Default for FeatureTypeStyle {
    fn default() -> Self {
        FeatureTypeStyle {
            name: None,
            description: Description::default(),
            feature_type_names: Vec::new(),
            semantic_type_identifiers: vec![defaults::SEMANTIC_TYPE_ANY.to_owned()],
            transformation: None,
            rules: Vec::new(),
            options: VendorOptions::new(),
        }
    }
}

/// A rule's filter slot.
///
/// `Filter` and `ElseFilter` are mutually exclusive; when a document has
/// both, the later sibling wins.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleFilter {
    /// Applies to every feature.
    Unset,
    Filter(Filter),

    /// Applies to features no other rule of the feature type style matched.
    Else,
}

impl Default for RuleFilter {
    fn default() -> Self {
        RuleFilter::Unset
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub name: Option<String>,
    pub description: Description,
    pub legend: Option<Graphic>,
    pub filter: RuleFilter,
    pub min_scale_denominator: f64,
    pub max_scale_denominator: f64,
    pub symbolizers: Vec<Symbolizer>,
    pub options: VendorOptions,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            name: None,
            description: Description::default(),
            legend: None,
            filter: RuleFilter::Unset,
            min_scale_denominator: 0.0,
            max_scale_denominator: f64::INFINITY,
            symbolizers: Vec::new(),
            options: VendorOptions::new(),
        }
    }
}
