// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writes the style model as SLD 1.0 elements.
//!
//! Values are written as text when they're literals and as expression
//! markup otherwise. Unless `export_defaults` is set, a literal equal to its
//! documented default (see [`crate::model::defaults`]) is left out, which the
//! parser turns back into the same default.

use super::{feature, ElementBuilder, ElementWriter, Error};
use crate::expr::{format_f64, Expression, Filter, MarkupFromExpression};
use crate::model::{
    defaults, AnchorPoint, ChannelSelection, ColorMap, ColorMapKind, ContrastEnhancement,
    Description, Displacement, ExternalGraphic, FeatureTypeConstraint, FeatureTypeStyle, Fill,
    Font, Graphic, GraphicSymbol, Halo, ImageOutline, InternationalString, LabelPlacement, Layer,
    LayerSource, LineSymbolizer, Mark, NamedLayer, OverlapBehavior, PointSymbolizer,
    PolygonSymbolizer, RasterSymbolizer, Rule, RuleFilter, SelectedChannel, ShadedRelief, Stroke,
    Style, StyledLayerDescriptor, Symbolizer, TextSymbolizer, UserLayer, UserStyle, VendorOptions,
};
use crate::uom::Uom;
use crate::{ExpandedNameRef, GML_NS, OGC_NS, SLD_NS, XLINK_NS};

const SLD_VERSION: &str = "1.0.0";

#[inline]
fn sld(local_name: &str) -> ExpandedNameRef<'_> {
    ExpandedNameRef::sld(local_name)
}

#[inline]
fn attr(local_name: &str) -> ExpandedNameRef<'_> {
    ExpandedNameRef::local(local_name)
}

/// Returns true if `text` would be altered by the whitespace normalization
/// applied to mixed content, so must be written as CDATA.
///
/// That is any leading or trailing whitespace, any run of two or more
/// whitespace characters, or whitespace other than a plain space.
fn flatten_concatenation<'e>(e: &'e Expression, out: &mut Vec<&'e Expression>) {
    match e.concatenation_args() {
        Some(args) => args.iter().for_each(|a| flatten_concatenation(a, out)),
        None => out.push(e),
    }
}

pub(super) fn needs_cdata(text: &str) -> bool {
    let ws = |c: char| c.is_whitespace();
    if text.starts_with(ws) || text.ends_with(ws) {
        return true;
    }
    let mut prev_ws = false;
    for c in text.chars() {
        if ws(c) && (prev_ws || c != ' ') {
            return true;
        }
        prev_ws = ws(c);
    }
    false
}

pub(super) struct Emitter<'a> {
    pub(super) markup: &'a dyn MarkupFromExpression,
    pub(super) export_defaults: bool,
}

impl<'a> Emitter<'a> {
    /// Declares the namespaces used anywhere in the document on its root.
    pub(super) fn descriptor_attributes(&self, root: &mut ElementBuilder) -> Result<(), Error> {
        root.namespace("sld", SLD_NS)?;
        root.namespace("ogc", OGC_NS)?;
        root.namespace("gml", GML_NS)?;
        root.namespace("xlink", XLINK_NS)?;
        root.attribute(attr("version"), SLD_VERSION.to_owned())
    }

    pub(super) fn descriptor(
        &self,
        w: &mut ElementWriter,
        sld: &StyledLayerDescriptor,
    ) -> Result<(), Error> {
        self.optional_text(w, "Name", sld.name.as_deref())?;
        self.optional_text(w, "Title", sld.title.as_deref())?;
        self.optional_text(w, "Abstract", sld.abstract_.as_deref())?;
        for layer in &sld.layers {
            match layer {
                Layer::Named(l) => self.named_layer(w, l)?,
                Layer::User(l) => self.user_layer(w, l)?,
            }
        }
        Ok(())
    }

    // Scalars.

    fn optional_text(&self, w: &mut ElementWriter, name: &str, text: Option<&str>) -> Result<(), Error> {
        match text {
            Some(t) if !t.is_empty() => w.text_element(sld(name), t),
            _ => Ok(()),
        }
    }

    /// Writes the body of a value element.
    fn content(&self, w: &mut ElementWriter, e: &Expression) -> Result<(), Error> {
        match e {
            Expression::Literal(s) => w.text(s),
            _ => self.markup.write_expression(w, e),
        }
    }

    /// Writes `<name>value</name>`; [`Expression::Nil`] writes nothing.
    fn value(&self, w: &mut ElementWriter, name: &str, e: &Expression) -> Result<(), Error> {
        match e {
            Expression::Nil => Ok(()),
            Expression::Literal(s) => w.text_element(sld(name), s),
            _ => {
                let mut c = w.element(sld(name)).start()?;
                self.markup.write_expression(&mut c, e)?;
                c.finish()
            }
        }
    }

    fn is_elided(&self, e: &Expression, default: &str) -> bool {
        !self.export_defaults && e.is_literal_eq(default)
    }

    fn value_unless(
        &self,
        w: &mut ElementWriter,
        name: &str,
        e: &Expression,
        default: &str,
    ) -> Result<(), Error> {
        if self.is_elided(e, default) {
            return Ok(());
        }
        self.value(w, name, e)
    }

    fn css(
        &self,
        w: &mut ElementWriter,
        name: &str,
        e: &Expression,
        default: Option<&str>,
    ) -> Result<(), Error> {
        if matches!(e, Expression::Nil) || default.map_or(false, |d| self.is_elided(e, d)) {
            return Ok(());
        }
        let mut b = w.element(sld("CssParameter"));
        b.attribute(attr("name"), name.to_owned())?;
        let mut c = b.start()?;
        self.content(&mut c, e)?;
        c.finish()
    }

    /// Writes label-like content, flattening concatenations and protecting
    /// whitespace-sensitive literals with CDATA.
    ///
    /// A literal directly after another literal is also written as CDATA so
    /// the reader sees two parts rather than one run of text.
    fn label_content(&self, w: &mut ElementWriter, e: &Expression) -> Result<(), Error> {
        let mut parts = Vec::new();
        flatten_concatenation(e, &mut parts);
        let mut after_literal = false;
        for part in parts {
            match part {
                Expression::Literal(s) if after_literal || needs_cdata(s) => w.cdata(s)?,
                Expression::Literal(s) => w.text(s)?,
                _ => self.markup.write_expression(w, part)?,
            }
            after_literal = matches!(part, Expression::Literal(_));
        }
        Ok(())
    }

    fn label_value(&self, w: &mut ElementWriter, name: &str, e: &Expression) -> Result<(), Error> {
        self.label_element(w.element(sld(name)), e)
    }

    fn label_element(&self, b: ElementBuilder, e: &Expression) -> Result<(), Error> {
        let mut c = b.start()?;
        // Marks the element as mixed content so indentation isn't added
        // between its parts.
        c.text("")?;
        self.label_content(&mut c, e)?;
        c.finish()
    }

    fn international(
        &self,
        w: &mut ElementWriter,
        name: &str,
        s: &InternationalString,
    ) -> Result<(), Error> {
        match s {
            InternationalString::Plain(t) => w.text_element(sld(name), t),
            InternationalString::Localized {
                default,
                translations,
            } => {
                let mut c = w.element(sld(name)).start()?;
                c.text(default)?;
                for (lang, text) in translations {
                    let mut b = c.element(sld("Localized"));
                    b.attribute(attr("lang"), lang.clone())?;
                    let mut l = b.start()?;
                    l.text(text)?;
                    l.finish()?;
                }
                c.finish()
            }
        }
    }

    fn description(&self, w: &mut ElementWriter, d: &Description) -> Result<(), Error> {
        if let Some(t) = &d.title {
            self.international(w, "Title", t)?;
        }
        if let Some(a) = &d.abstract_ {
            self.international(w, "Abstract", a)?;
        }
        Ok(())
    }

    fn vendor_options(&self, w: &mut ElementWriter, options: &VendorOptions) -> Result<(), Error> {
        for (name, value) in options {
            let mut b = w.element(sld("VendorOption"));
            b.attribute(attr("name"), name.clone())?;
            let mut c = b.start()?;
            c.text(value)?;
            c.finish()?;
        }
        Ok(())
    }

    fn online_resource(&self, w: &mut ElementWriter, href: &str) -> Result<(), Error> {
        let mut b = w.element(sld("OnlineResource"));
        b.attribute(ExpandedNameRef { namespace: XLINK_NS, local_name: "type" }, "simple".to_owned())?;
        b.attribute(ExpandedNameRef { namespace: XLINK_NS, local_name: "href" }, href.to_owned())?;
        b.start()?.finish()
    }

    // Layers and styles.

    fn named_layer(&self, w: &mut ElementWriter, layer: &NamedLayer) -> Result<(), Error> {
        let mut c = w.element(sld("NamedLayer")).start()?;
        self.optional_text(&mut c, "Name", layer.name.as_deref())?;
        if !layer.constraints.is_empty() {
            self.constraints(&mut c, &layer.constraints)?;
        }
        self.styles(&mut c, &layer.styles)?;
        c.finish()
    }

    fn user_layer(&self, w: &mut ElementWriter, layer: &UserLayer) -> Result<(), Error> {
        let mut c = w.element(sld("UserLayer")).start()?;
        self.optional_text(&mut c, "Name", layer.name.as_deref())?;
        match &layer.source {
            Some(LayerSource::Inline(features)) => {
                let mut i = c.element(sld("InlineFeature")).start()?;
                feature::inline_features(&mut i, features)?;
                i.finish()?;
            }
            Some(LayerSource::Remote(remote)) => {
                let mut r = c.element(sld("RemoteOWS")).start()?;
                self.optional_text(&mut r, "Service", remote.service.as_deref())?;
                if let Some(href) = &remote.online_resource {
                    self.online_resource(&mut r, href)?;
                }
                r.finish()?;
            }
            None => {}
        }
        // LayerFeatureConstraints is mandatory on a user layer.
        self.constraints(&mut c, &layer.constraints)?;
        self.styles(&mut c, &layer.styles)?;
        c.finish()
    }

    fn constraints(
        &self,
        w: &mut ElementWriter,
        constraints: &[FeatureTypeConstraint],
    ) -> Result<(), Error> {
        let mut c = w.element(sld("LayerFeatureConstraints")).start()?;
        if constraints.is_empty() {
            c.empty_element(sld("FeatureTypeConstraint"))?;
        }
        for constraint in constraints {
            let mut f = c.element(sld("FeatureTypeConstraint")).start()?;
            f.text_element(sld("FeatureTypeName"), &constraint.type_name)?;
            if let Some(filter) = &constraint.filter {
                self.filter(&mut f, filter)?;
            }
            for extent in &constraint.extents {
                let mut e = f.element(sld("Extent")).start()?;
                self.optional_text(&mut e, "Name", extent.name.as_deref())?;
                self.optional_text(&mut e, "Value", extent.value.as_deref())?;
                e.finish()?;
            }
            f.finish()?;
        }
        c.finish()
    }

    fn filter(&self, w: &mut ElementWriter, filter: &Filter) -> Result<(), Error> {
        let mut c = w.element(ExpandedNameRef::ogc("Filter")).start()?;
        self.markup.write_filter(&mut c, filter)?;
        c.finish()
    }

    fn styles(&self, w: &mut ElementWriter, styles: &[Style]) -> Result<(), Error> {
        for style in styles {
            match style {
                Style::Named(s) => {
                    let mut c = w.element(sld("NamedStyle")).start()?;
                    self.optional_text(&mut c, "Name", s.name.as_deref())?;
                    c.finish()?;
                }
                Style::User(s) => self.user_style(w, s)?,
            }
        }
        Ok(())
    }

    fn user_style(&self, w: &mut ElementWriter, style: &UserStyle) -> Result<(), Error> {
        let mut c = w.element(sld("UserStyle")).start()?;
        self.optional_text(&mut c, "Name", style.name.as_deref())?;
        if let Some(t) = &style.description.title {
            self.international(&mut c, "Title", t)?;
        }
        if style.is_default {
            c.text_element(sld("IsDefault"), "1")?;
        }
        if let Some(a) = &style.description.abstract_ {
            self.international(&mut c, "Abstract", a)?;
        }
        if let Some(background) = &style.background {
            // An empty Background would be dropped on the way back in.
            let mut b = c.element(sld("Background")).start()?;
            self.fill_parameters(&mut b, background, self.fill_is_elided(background, defaults::FILL_COLOR))?;
            b.finish()?;
        }
        for fts in &style.feature_type_styles {
            self.feature_type_style(&mut c, fts)?;
        }
        c.finish()
    }

    fn feature_type_style(&self, w: &mut ElementWriter, fts: &FeatureTypeStyle) -> Result<(), Error> {
        let mut c = w.element(sld("FeatureTypeStyle")).start()?;
        self.optional_text(&mut c, "Name", fts.name.as_deref())?;
        self.description(&mut c, &fts.description)?;
        for name in &fts.feature_type_names {
            c.text_element(sld("FeatureTypeName"), name)?;
        }
        if let Some(t) = &fts.transformation {
            let mut x = c.element(sld("Transformation")).start()?;
            self.markup.write_expression(&mut x, t)?;
            x.finish()?;
        }
        let only_any = matches!(&fts.semantic_type_identifiers[..], [s] if s == defaults::SEMANTIC_TYPE_ANY);
        // A childless FeatureTypeStyle is skipped by the reader, so keep the
        // identifier when it would be the only child.
        let childless = fts.name.as_deref().map_or(true, str::is_empty)
            && fts.description.title.is_none()
            && fts.description.abstract_.is_none()
            && fts.feature_type_names.is_empty()
            && fts.transformation.is_none()
            && fts.rules.is_empty()
            && fts.options.is_empty();
        if self.export_defaults || !only_any || childless {
            for id in &fts.semantic_type_identifiers {
                c.text_element(sld("SemanticTypeIdentifier"), id)?;
            }
        }
        for rule in &fts.rules {
            self.rule(&mut c, rule)?;
        }
        self.vendor_options(&mut c, &fts.options)?;
        c.finish()
    }

    fn rule(&self, w: &mut ElementWriter, rule: &Rule) -> Result<(), Error> {
        let mut c = w.element(sld("Rule")).start()?;
        self.optional_text(&mut c, "Name", rule.name.as_deref())?;
        self.description(&mut c, &rule.description)?;
        if let Some(legend) = &rule.legend {
            let mut l = c.element(sld("LegendGraphic")).start()?;
            self.graphic(&mut l, "Graphic", legend)?;
            l.finish()?;
        }
        match &rule.filter {
            RuleFilter::Unset | RuleFilter::Filter(Filter::Include) => {}
            RuleFilter::Filter(f) => self.filter(&mut c, f)?,
            RuleFilter::Else => c.empty_element(sld("ElseFilter"))?,
        }
        if rule.min_scale_denominator != 0.0 {
            c.text_element(sld("MinScaleDenominator"), &format_f64(rule.min_scale_denominator))?;
        }
        if rule.max_scale_denominator != f64::INFINITY {
            c.text_element(sld("MaxScaleDenominator"), &format_f64(rule.max_scale_denominator))?;
        }
        for s in &rule.symbolizers {
            self.symbolizer(&mut c, s)?;
        }
        self.vendor_options(&mut c, &rule.options)?;
        c.finish()
    }

    // Symbolizers.

    fn symbolizer(&self, w: &mut ElementWriter, s: &Symbolizer) -> Result<(), Error> {
        match s {
            Symbolizer::Line(s) => self.line(w, s),
            Symbolizer::Polygon(s) => self.polygon(w, s),
            Symbolizer::Point(s) => self.point(w, s),
            Symbolizer::Text(s) => self.text_symbolizer(w, s),
            Symbolizer::Raster(s) => self.raster(w, s),
        }
    }

    fn start_symbolizer<'w>(
        &self,
        w: &'w mut ElementWriter,
        name: &'static str,
        uom: Option<Uom>,
        geometry: Option<&Expression>,
    ) -> Result<ElementWriter<'w>, Error> {
        let mut b = w.element(sld(name));
        if let Some(u) = uom {
            b.attribute(attr("uom"), u.se_uri())?;
        }
        let mut c = b.start()?;
        if let Some(g) = geometry {
            let mut gw = c.element(sld("Geometry")).start()?;
            self.markup.write_expression(&mut gw, g)?;
            gw.finish()?;
        }
        Ok(c)
    }

    fn line(&self, w: &mut ElementWriter, s: &LineSymbolizer) -> Result<(), Error> {
        let mut c = self.start_symbolizer(w, "LineSymbolizer", s.uom, s.geometry.as_ref())?;
        if let Some(stroke) = &s.stroke {
            self.stroke(&mut c, "Stroke", stroke)?;
        }
        self.vendor_options(&mut c, &s.options)?;
        self.value_unless(&mut c, "PerpendicularOffset", &s.perpendicular_offset, defaults::PERPENDICULAR_OFFSET)?;
        c.finish()
    }

    fn polygon(&self, w: &mut ElementWriter, s: &PolygonSymbolizer) -> Result<(), Error> {
        let mut c = self.start_symbolizer(w, "PolygonSymbolizer", s.uom, s.geometry.as_ref())?;
        if let Some(fill) = &s.fill {
            self.fill_body(&mut c, "Fill", fill)?;
        }
        if let Some(stroke) = &s.stroke {
            self.stroke(&mut c, "Stroke", stroke)?;
        }
        self.vendor_options(&mut c, &s.options)?;
        c.finish()
    }

    fn point(&self, w: &mut ElementWriter, s: &PointSymbolizer) -> Result<(), Error> {
        let mut c = self.start_symbolizer(w, "PointSymbolizer", s.uom, s.geometry.as_ref())?;
        self.graphic(&mut c, "Graphic", &s.graphic)?;
        self.vendor_options(&mut c, &s.options)?;
        c.finish()
    }

    fn text_symbolizer(&self, w: &mut ElementWriter, s: &TextSymbolizer) -> Result<(), Error> {
        let mut c = self.start_symbolizer(w, "TextSymbolizer", s.uom, s.geometry.as_ref())?;
        if let Some(label) = &s.label {
            self.label_value(&mut c, "Label", label)?;
        }
        self.fonts(&mut c, &s.fonts)?;
        if let Some(p) = &s.placement {
            self.label_placement(&mut c, p)?;
        }
        if let Some(h) = &s.halo {
            self.halo(&mut c, h)?;
        }
        if let Some(fill) = &s.fill {
            self.fill_body(&mut c, "Fill", fill)?;
        }
        if let Some(g) = &s.graphic {
            self.graphic(&mut c, "Graphic", g)?;
        }
        if let Some(snippet) = &s.snippet {
            self.label_value(&mut c, "Snippet", snippet)?;
        }
        if let Some(d) = &s.feature_description {
            self.label_value(&mut c, "FeatureDescription", d)?;
        }
        if let Some(other) = &s.other_text {
            let mut b = c.element(sld("OtherText"));
            b.attribute(attr("target"), other.target.clone())?;
            self.label_element(b, &other.text)?;
        }
        if let Some(p) = &s.priority {
            self.value(&mut c, "Priority", p)?;
        }
        self.vendor_options(&mut c, &s.options)?;
        c.finish()
    }

    /// Writes one `Font` holding every family when the fonts differ only by
    /// family, else one `Font` each.
    fn fonts(&self, w: &mut ElementWriter, fonts: &[Font]) -> Result<(), Error> {
        let first = match fonts.first() {
            Some(f) => f,
            None => return Ok(()),
        };
        let uniform = fonts
            .iter()
            .all(|f| f.size == first.size && f.style == first.style && f.weight == first.weight);
        if uniform {
            let families: Vec<&Expression> = fonts.iter().flat_map(|f| &f.families).collect();
            self.font(w, &families, first)
        } else {
            for f in fonts {
                let families: Vec<&Expression> = f.families.iter().collect();
                self.font(w, &families, f)?;
            }
            Ok(())
        }
    }

    fn font(&self, w: &mut ElementWriter, families: &[&Expression], f: &Font) -> Result<(), Error> {
        let mut c = w.element(sld("Font")).start()?;
        let only_default = matches!(families, [only] if self.is_elided(only, defaults::FONT_FAMILY));
        if !only_default {
            for family in families {
                self.css(&mut c, "font-family", family, None)?;
            }
        }
        self.css(&mut c, "font-size", &f.size, Some(defaults::FONT_SIZE))?;
        self.css(&mut c, "font-style", &f.style, Some(defaults::FONT_STYLE))?;
        self.css(&mut c, "font-weight", &f.weight, Some(defaults::FONT_WEIGHT))?;
        c.finish()
    }

    fn label_placement(&self, w: &mut ElementWriter, p: &LabelPlacement) -> Result<(), Error> {
        let mut c = w.element(sld("LabelPlacement")).start()?;
        match p {
            LabelPlacement::Point(p) => {
                let mut pp = c.element(sld("PointPlacement")).start()?;
                if let Some(a) = &p.anchor_point {
                    self.anchor_point(&mut pp, a)?;
                }
                if let Some(d) = &p.displacement {
                    self.displacement(&mut pp, d)?;
                }
                self.value_unless(&mut pp, "Rotation", &p.rotation, defaults::PLACEMENT_ROTATION)?;
                pp.finish()?;
            }
            LabelPlacement::Line(l) => {
                let mut lp = c.element(sld("LinePlacement")).start()?;
                self.value_unless(
                    &mut lp,
                    "PerpendicularOffset",
                    &l.perpendicular_offset,
                    defaults::PERPENDICULAR_OFFSET,
                )?;
                lp.finish()?;
            }
        }
        c.finish()
    }

    fn halo(&self, w: &mut ElementWriter, h: &Halo) -> Result<(), Error> {
        let mut c = w.element(sld("Halo")).start()?;
        self.value_unless(&mut c, "Radius", &h.radius, defaults::HALO_RADIUS)?;
        if !self.fill_is_elided(&h.fill, defaults::HALO_FILL_COLOR) {
            self.fill_body(&mut c, "Fill", &h.fill)?;
        }
        c.finish()
    }

    fn raster(&self, w: &mut ElementWriter, s: &RasterSymbolizer) -> Result<(), Error> {
        let mut c = self.start_symbolizer(w, "RasterSymbolizer", s.uom, s.geometry.as_ref())?;
        self.value_unless(&mut c, "Opacity", &s.opacity, defaults::RASTER_OPACITY)?;
        if let Some(cs) = &s.channel_selection {
            self.channel_selection(&mut c, cs)?;
        }
        if let Some(o) = s.overlap {
            self.overlap(&mut c, o)?;
        }
        self.color_map(&mut c, &s.color_map)?;
        if let Some(ce) = &s.contrast {
            self.contrast(&mut c, ce)?;
        }
        if let Some(sr) = &s.shaded_relief {
            self.shaded_relief(&mut c, sr)?;
        }
        if let Some(outline) = &s.image_outline {
            let mut o = c.element(sld("ImageOutline")).start()?;
            match outline {
                ImageOutline::Line(l) => self.line(&mut o, l)?,
                ImageOutline::Polygon(p) => self.polygon(&mut o, p)?,
            }
            o.finish()?;
        }
        self.vendor_options(&mut c, &s.options)?;
        c.finish()
    }

    /// An RGB selection missing any channel can't be expressed and is left out.
    fn channel_selection(&self, w: &mut ElementWriter, cs: &ChannelSelection) -> Result<(), Error> {
        match cs {
            ChannelSelection::Gray(g) => {
                let mut c = w.element(sld("ChannelSelection")).start()?;
                self.selected_channel(&mut c, "GrayChannel", g)?;
                c.finish()
            }
            ChannelSelection::Rgb([Some(r), Some(g), Some(b)]) => {
                let mut c = w.element(sld("ChannelSelection")).start()?;
                self.selected_channel(&mut c, "RedChannel", r)?;
                self.selected_channel(&mut c, "GreenChannel", g)?;
                self.selected_channel(&mut c, "BlueChannel", b)?;
                c.finish()
            }
            ChannelSelection::Rgb(_) => {
                log::debug!("leaving out a ChannelSelection with missing RGB channels");
                Ok(())
            }
        }
    }

    fn selected_channel(&self, w: &mut ElementWriter, name: &str, ch: &SelectedChannel) -> Result<(), Error> {
        let mut c = w.element(sld(name)).start()?;
        if let Some(n) = &ch.name {
            self.value(&mut c, "SourceChannelName", n)?;
        }
        if let Some(ce) = &ch.contrast {
            self.contrast(&mut c, ce)?;
        }
        c.finish()
    }

    fn overlap(&self, w: &mut ElementWriter, o: OverlapBehavior) -> Result<(), Error> {
        let mut c = w.element(sld("OverlapBehavior")).start()?;
        c.empty_element(sld(o.element_name()))?;
        c.finish()
    }

    fn color_map(&self, w: &mut ElementWriter, map: &ColorMap) -> Result<(), Error> {
        if map.entries.is_empty() && map.kind == ColorMapKind::Ramp && !map.extended {
            return Ok(());
        }
        let mut b = w.element(sld("ColorMap"));
        if map.kind != ColorMapKind::Ramp {
            b.attribute(attr("type"), map.kind.as_str().to_owned())?;
        }
        if map.extended {
            b.attribute(attr("extended"), "true".to_owned())?;
        }
        let mut c = b.start()?;
        for entry in &map.entries {
            let mut e = c.element(sld("ColorMapEntry"));
            for (name, value) in [
                ("color", &entry.color),
                ("opacity", &entry.opacity),
                ("quantity", &entry.quantity),
            ] {
                match value {
                    None | Some(Expression::Nil) => {}
                    Some(Expression::Literal(v)) => e.attribute(attr(name), v.clone())?,
                    Some(other) => {
                        return Err(Error::unsupported(&format!(
                            "ColorMapEntry {} expression {}",
                            name, other
                        )))
                    }
                }
            }
            if let Some(label) = &entry.label {
                e.attribute(attr("label"), label.clone())?;
            }
            e.start()?.finish()?;
        }
        c.finish()
    }

    fn contrast(&self, w: &mut ElementWriter, ce: &ContrastEnhancement) -> Result<(), Error> {
        let mut c = w.element(sld("ContrastEnhancement")).start()?;
        if let Some(m) = ce.method {
            let mut mw = c.element(sld(m.element_name())).start()?;
            for (name, value) in &ce.options {
                let mut b = mw.element(sld("VendorOption"));
                b.attribute(attr("name"), name.clone())?;
                let mut o = b.start()?;
                self.content(&mut o, value)?;
                o.finish()?;
            }
            mw.finish()?;
        }
        if let Some(g) = &ce.gamma {
            self.value(&mut c, "GammaValue", g)?;
        }
        c.finish()
    }

    fn shaded_relief(&self, w: &mut ElementWriter, sr: &ShadedRelief) -> Result<(), Error> {
        let mut c = w.element(sld("ShadedRelief")).start()?;
        c.text_element(sld("BrightnessOnly"), if sr.brightness_only { "true" } else { "false" })?;
        if let Some(f) = &sr.relief_factor {
            self.value(&mut c, "ReliefFactor", f)?;
        }
        c.finish()
    }

    // Paint.

    fn stroke(&self, w: &mut ElementWriter, name: &str, s: &Stroke) -> Result<(), Error> {
        let mut c = w.element(sld(name)).start()?;
        if let Some(g) = &s.graphic_fill {
            self.wrapped_graphic(&mut c, "GraphicFill", g)?;
        }
        if let Some(g) = &s.graphic_stroke {
            self.wrapped_graphic(&mut c, "GraphicStroke", g)?;
        }
        self.css(&mut c, "stroke", &s.color, Some(defaults::STROKE_COLOR))?;
        self.css(&mut c, "stroke-linecap", &s.line_cap, Some(defaults::STROKE_LINECAP))?;
        self.css(&mut c, "stroke-linejoin", &s.line_join, Some(defaults::STROKE_LINEJOIN))?;
        self.css(&mut c, "stroke-opacity", &s.opacity, Some(defaults::STROKE_OPACITY))?;
        self.css(&mut c, "stroke-width", &s.width, Some(defaults::STROKE_WIDTH))?;
        self.css(&mut c, "stroke-dashoffset", &s.dash_offset, Some(defaults::STROKE_DASHOFFSET))?;
        self.dash_array(&mut c, &s.dash_array)?;
        c.finish()
    }

    /// All-literal dash arrays become `"5 2"`; otherwise literals and
    /// expression markup are interleaved with separating spaces.
    fn dash_array(&self, w: &mut ElementWriter, dashes: &[Expression]) -> Result<(), Error> {
        if dashes.is_empty() {
            return Ok(());
        }
        let mut b = w.element(sld("CssParameter"));
        b.attribute(attr("name"), "stroke-dasharray".to_owned())?;
        let mut c = b.start()?;
        let literals: Option<Vec<&str>> = dashes.iter().map(Expression::as_literal).collect();
        match literals {
            Some(l) => c.text(&l.join(" "))?,
            None => {
                c.text("")?;
                for (i, d) in dashes.iter().enumerate() {
                    if i > 0 {
                        c.text(" ")?;
                    }
                    self.content(&mut c, d)?;
                }
            }
        }
        c.finish()
    }

    /// Writes a `Fill` (or `Background`) element.
    fn fill_body(&self, w: &mut ElementWriter, name: &str, f: &Fill) -> Result<(), Error> {
        let mut c = w.element(sld(name)).start()?;
        self.fill_parameters(&mut c, f, false)?;
        c.finish()
    }

    /// True if `f` is a plain fill of `color` and nothing about it would be written.
    fn fill_is_elided(&self, f: &Fill, color: &str) -> bool {
        f.graphic_fill.is_none()
            && self.is_elided(&f.color, color)
            && self.is_elided(&f.opacity, defaults::FILL_OPACITY)
    }

    fn fill_parameters(&self, w: &mut ElementWriter, f: &Fill, force_color: bool) -> Result<(), Error> {
        if let Some(g) = &f.graphic_fill {
            self.wrapped_graphic(w, "GraphicFill", g)?;
        }
        let color_default = if force_color { None } else { Some(defaults::FILL_COLOR) };
        self.css(w, "fill", &f.color, color_default)?;
        self.css(w, "fill-opacity", &f.opacity, Some(defaults::FILL_OPACITY))
    }

    fn wrapped_graphic(&self, w: &mut ElementWriter, wrapper: &str, g: &Graphic) -> Result<(), Error> {
        let mut c = w.element(sld(wrapper)).start()?;
        self.graphic(&mut c, "Graphic", g)?;
        c.finish()
    }

    fn graphic(&self, w: &mut ElementWriter, name: &str, g: &Graphic) -> Result<(), Error> {
        let mut c = w.element(sld(name)).start()?;
        for symbol in &g.symbols {
            match symbol {
                GraphicSymbol::Mark(m) => self.mark(&mut c, m)?,
                GraphicSymbol::External(e) => self.external_graphic(&mut c, e)?,
            }
        }
        self.value_unless(&mut c, "Opacity", &g.opacity, defaults::GRAPHIC_OPACITY)?;
        if let Some(size) = &g.size {
            self.value(&mut c, "Size", size)?;
        }
        self.value_unless(&mut c, "Rotation", &g.rotation, defaults::GRAPHIC_ROTATION)?;
        if let Some(a) = &g.anchor_point {
            self.anchor_point(&mut c, a)?;
        }
        if let Some(d) = &g.displacement {
            self.displacement(&mut c, d)?;
        }
        c.finish()
    }

    fn mark(&self, w: &mut ElementWriter, m: &Mark) -> Result<(), Error> {
        let mut c = w.element(sld("Mark")).start()?;
        self.value_unless(&mut c, "WellKnownName", &m.well_known_name, defaults::MARK_WELL_KNOWN_NAME)?;
        if let Some(f) = &m.fill {
            self.fill_body(&mut c, "Fill", f)?;
        }
        if let Some(s) = &m.stroke {
            self.stroke(&mut c, "Stroke", s)?;
        }
        c.finish()
    }

    fn external_graphic(&self, w: &mut ElementWriter, e: &ExternalGraphic) -> Result<(), Error> {
        if e.inline_content.is_some() {
            return Err(Error::unsupported("ExternalGraphic with inline content"));
        }
        let mut c = w.element(sld("ExternalGraphic")).start()?;
        if let Some(href) = &e.online_resource {
            self.online_resource(&mut c, href)?;
        }
        c.text_element(sld("Format"), &e.format)?;
        for (name, value) in &e.custom_properties {
            let mut b = c.element(sld("customProperty"));
            b.attribute(attr("name"), name.clone())?;
            let mut p = b.start()?;
            self.content(&mut p, value)?;
            p.finish()?;
        }
        c.finish()
    }

    fn anchor_point(&self, w: &mut ElementWriter, a: &AnchorPoint) -> Result<(), Error> {
        let mut c = w.element(sld("AnchorPoint")).start()?;
        self.value_unless(&mut c, "AnchorPointX", &a.x, defaults::ANCHOR_POINT)?;
        self.value_unless(&mut c, "AnchorPointY", &a.y, defaults::ANCHOR_POINT)?;
        c.finish()
    }

    /// A displacement of zero in both directions is left out.
    fn displacement(&self, w: &mut ElementWriter, d: &Displacement) -> Result<(), Error> {
        if !self.export_defaults && d.is_default() {
            return Ok(());
        }
        let mut c = w.element(sld("Displacement")).start()?;
        self.value_unless(&mut c, "DisplacementX", &d.x, defaults::DISPLACEMENT)?;
        self.value_unless(&mut c, "DisplacementY", &d.y, defaults::DISPLACEMENT)?;
        c.finish()
    }
}
