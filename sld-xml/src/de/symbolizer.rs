// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use log::debug;

use super::parser::tag;
use super::tree::Element;
use super::{parse_bool, trim, walk, Error, Parser};
use crate::expr::Expression;
use crate::model::{
    ChannelSelection, ColorMap, ColorMapEntry, ColorMapKind, ContrastEnhancement, ContrastMethod,
    ImageOutline, LineSymbolizer, OtherText, OverlapBehavior, PointSymbolizer, PolygonSymbolizer,
    RasterSymbolizer, SelectedChannel, ShadedRelief, Symbolizer, TextSymbolizer,
};

impl Parser {
    /// Parses any of the five symbolizer elements; `None` for anything else.
    pub fn parse_symbolizer(&self, node: &Element) -> Result<Option<Symbolizer>, Error> {
        Ok(Some(match tag(node).as_str() {
            "linesymbolizer" => Symbolizer::Line(self.parse_line_symbolizer(node)),
            "polygonsymbolizer" => Symbolizer::Polygon(self.parse_polygon_symbolizer(node)),
            "pointsymbolizer" => Symbolizer::Point(self.parse_point_symbolizer(node)),
            "textsymbolizer" => Symbolizer::Text(self.parse_text_symbolizer(node)?),
            "rastersymbolizer" => Symbolizer::Raster(self.parse_raster_symbolizer(node)?),
            _ => return Ok(None),
        }))
    }

    pub fn parse_line_symbolizer(&self, node: &Element) -> LineSymbolizer {
        let mut s = LineSymbolizer {
            uom: self.uom(node),
            ..LineSymbolizer::default()
        };
        for child in node.elements() {
            match tag(child).as_str() {
                "geometry" => s.geometry = self.geometry(child),
                "stroke" => s.stroke = Some(self.parse_stroke(child)),
                "vendoroption" => self.parse_vendor_option(child, &mut s.options),
                "perpendicularoffset" => s.perpendicular_offset = self.value(child),
                _ => {}
            }
        }
        s
    }

    pub fn parse_polygon_symbolizer(&self, node: &Element) -> PolygonSymbolizer {
        let mut s = PolygonSymbolizer {
            uom: self.uom(node),
            ..PolygonSymbolizer::default()
        };
        for child in node.elements() {
            match tag(child).as_str() {
                "geometry" => s.geometry = self.geometry(child),
                "fill" => s.fill = Some(self.parse_fill(child)),
                "stroke" => s.stroke = Some(self.parse_stroke(child)),
                "vendoroption" => self.parse_vendor_option(child, &mut s.options),
                _ => {}
            }
        }
        s
    }

    pub fn parse_point_symbolizer(&self, node: &Element) -> PointSymbolizer {
        let mut s = PointSymbolizer {
            uom: self.uom(node),
            ..PointSymbolizer::default()
        };
        for child in node.elements() {
            match tag(child).as_str() {
                "geometry" => s.geometry = self.geometry(child),
                "graphic" => s.graphic = self.parse_graphic(child),
                "vendoroption" => self.parse_vendor_option(child, &mut s.options),
                _ => {}
            }
        }
        s
    }

    /// Parses a text symbolizer.
    ///
    /// `Label`, `Snippet` and `FeatureDescription` collapse white space as
    /// mixed content rather than trimming each text node, so a label like
    /// `Route <ogc:PropertyName>n</ogc:PropertyName>` keeps its space.
    pub fn parse_text_symbolizer(&self, node: &Element) -> Result<TextSymbolizer, Error> {
        let mut s = TextSymbolizer {
            uom: self.uom(node),
            ..TextSymbolizer::default()
        };
        for child in node.elements() {
            match tag(child).as_str() {
                "geometry" => s.geometry = self.geometry(child),
                "fill" => s.fill = Some(self.parse_fill(child)),
                "label" => s.label = Some(self.mixed(child)),
                "font" => s.fonts.push(self.parse_font(child)),
                "labelplacement" => s.placement = self.parse_label_placement(child),
                "halo" => s.halo = Some(self.parse_halo(child)),
                "graphic" => s.graphic = Some(self.parse_graphic(child)),
                "snippet" => s.snippet = Some(self.mixed(child)),
                "featuredescription" => s.feature_description = Some(self.mixed(child)),
                "othertext" => s.other_text = Some(self.parse_other_text(child)?),
                "priority" => s.priority = Some(self.value(child)),
                "vendoroption" => self.parse_vendor_option(child, &mut s.options),
                _ => {}
            }
        }
        Ok(s)
    }

    pub fn parse_other_text(&self, node: &Element) -> Result<OtherText, Error> {
        let target = node.attribute("target").ok_or_else(|| {
            Error::format(node, "OtherText requires a target attribute".to_owned())
        })?;
        Ok(OtherText {
            target: target.to_owned(),
            text: self.value(node),
        })
    }

    pub fn parse_raster_symbolizer(&self, node: &Element) -> Result<RasterSymbolizer, Error> {
        let mut s = RasterSymbolizer {
            uom: self.uom(node),
            ..RasterSymbolizer::default()
        };
        for child in node.elements() {
            match tag(child).as_str() {
                "geometry" => s.geometry = self.geometry(child),
                "opacity" => s.opacity = self.parameter(child, false),
                "channelselection" => s.channel_selection = Some(self.parse_channel_selection(child)),
                "overlapbehavior" => s.overlap = self.parse_overlap_behavior(child),
                "colormap" => s.color_map = self.parse_color_map(child).map_err(|e| e.within(node))?,
                "contrastenhancement" => s.contrast = Some(self.parse_contrast_enhancement(child)),
                "shadedrelief" => s.shaded_relief = Some(self.parse_shaded_relief(child)),
                "imageoutline" => s.image_outline = self.parse_image_outline(child),
                "vendoroption" => self.parse_vendor_option(child, &mut s.options),
                _ => {}
            }
        }
        Ok(s)
    }

    /// Parses a channel selection. It's gray if a `GrayChannel` comes before
    /// any of the color channels.
    pub fn parse_channel_selection(&self, node: &Element) -> ChannelSelection {
        let is_gray = node
            .elements()
            .map(tag)
            .find(|t| matches!(t.as_str(), "graychannel" | "redchannel" | "greenchannel" | "bluechannel"))
            .map_or(false, |t| t == "graychannel");
        if is_gray {
            let mut gray = SelectedChannel::default();
            for child in node.elements().filter(|c| c.is("GrayChannel")) {
                gray = self.parse_selected_channel(child);
            }
            return ChannelSelection::Gray(gray);
        }
        let mut rgb: [Option<SelectedChannel>; 3] = Default::default();
        for child in node.elements() {
            let i = match tag(child).as_str() {
                "redchannel" => 0,
                "greenchannel" => 1,
                "bluechannel" => 2,
                _ => continue,
            };
            rgb[i] = Some(self.parse_selected_channel(child));
        }
        ChannelSelection::Rgb(rgb)
    }

    pub fn parse_selected_channel(&self, node: &Element) -> SelectedChannel {
        let mut channel = SelectedChannel::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "sourcechannelname" if !child.children.is_empty() => {
                    channel.name = Some(self.parameter(child, true))
                }
                "contrastenhancement" => channel.contrast = Some(self.parse_contrast_enhancement(child)),
                _ => {}
            }
        }
        channel
    }

    /// Reads the behavior from the first child element's name, as in
    /// `<OverlapBehavior><AVERAGE/></OverlapBehavior>`, or from the text.
    pub fn parse_overlap_behavior(&self, node: &Element) -> Option<OverlapBehavior> {
        let text;
        let name = match walk::first_element(node) {
            Some(e) => e.local_name(),
            None => {
                text = node.text();
                trim(&text)
            }
        };
        let behavior = OverlapBehavior::from_name(name);
        if behavior.is_none() {
            debug!("ignoring unknown overlap behavior {:?}", name);
        }
        behavior
    }

    pub fn parse_color_map(&self, node: &Element) -> Result<ColorMap, Error> {
        let mut map = ColorMap::default();
        if let Some(kind) = node.attribute("type") {
            map.kind = ColorMapKind::from_name(trim(kind)).ok_or_else(|| {
                Error::format(node, format!("unknown color map type {:?}", kind))
            })?;
        }
        if let Some(extended) = node.attribute("extended") {
            match trim(extended) {
                e if e.eq_ignore_ascii_case("true") => map.extended = true,
                e if e.eq_ignore_ascii_case("false") => map.extended = false,
                _ => debug!("ignoring unparseable ColorMap extended={:?}", extended),
            }
        }
        map.entries = node
            .elements()
            .filter(|e| e.is("ColorMapEntry"))
            .map(|e| self.parse_color_map_entry(e))
            .collect();
        Ok(map)
    }

    pub fn parse_color_map_entry(&self, node: &Element) -> ColorMapEntry {
        let literal = |name| node.attribute(name).map(Expression::literal);
        ColorMapEntry {
            color: literal("color"),
            opacity: literal("opacity"),
            quantity: literal("quantity"),
            label: node.attribute("label").map(str::to_owned),
        }
    }

    /// Parses a contrast enhancement.
    ///
    /// The method is named by a `Normalize`, `Histogram`, `Logarithmic` or
    /// `Exponential` child; other elements are ignored.
    pub fn parse_contrast_enhancement(&self, node: &Element) -> ContrastEnhancement {
        let mut contrast = ContrastEnhancement::default();
        for child in node.elements() {
            if child.is("GammaValue") {
                contrast.gamma = Some(self.parameter(child, false));
                continue;
            }
            let method = match ContrastMethod::from_name(child.local_name()) {
                Some(m) => m,
                None => continue,
            };
            contrast.method = Some(method);
            contrast.options.clear();
            for option in child.elements().filter(|e| e.is("VendorOption")) {
                if let Some(name) = option.attribute("name") {
                    contrast.options.insert(name.to_owned(), self.value(option));
                }
            }
        }
        contrast
    }

    pub fn parse_shaded_relief(&self, node: &Element) -> ShadedRelief {
        let mut relief = ShadedRelief::default();
        for child in node.elements() {
            match tag(child).as_str() {
                "brightnessonly" => match parse_bool(&child.text()) {
                    Some(b) => relief.brightness_only = b,
                    None => debug!("ignoring unparseable BrightnessOnly {:?}", child.text()),
                },
                "relieffactor" => match self.value(child).as_f64() {
                    Some(v) => relief.relief_factor = Some(Expression::number(v)),
                    None => debug!("ignoring unparseable ReliefFactor {:?}", child.text()),
                },
                _ => {}
            }
        }
        relief
    }

    pub fn parse_image_outline(&self, node: &Element) -> Option<ImageOutline> {
        let mut outline = None;
        for child in node.elements() {
            match tag(child).as_str() {
                "linesymbolizer" => {
                    outline = Some(ImageOutline::Line(self.parse_line_symbolizer(child)))
                }
                "polygonsymbolizer" => {
                    outline = Some(ImageOutline::Polygon(self.parse_polygon_symbolizer(child)))
                }
                _ => {}
            }
        }
        outline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::tree::from_str;
    use crate::expr::STR_CONCAT;
    use crate::uom::Uom;
    use assert_matches::assert_matches;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn symbolizer(xml: &str) -> Result<Option<Symbolizer>, Error> {
        let root = from_str(&format!(
            r#"<X xmlns="http://www.opengis.net/sld" xmlns:ogc="http://www.opengis.net/ogc">{}</X>"#,
            xml
        ))
        .unwrap();
        Parser::new().parse_symbolizer(walk::first_element(&root).unwrap())
    }

    #[test]
    fn line_with_uom_and_offset() {
        init();
        let s = symbolizer(
            r#"<LineSymbolizer uom="http://www.opengeospatial.org/se/units/metre">
                 <Geometry><ogc:PropertyName>the_geom</ogc:PropertyName></Geometry>
                 <Stroke/>
                 <PerpendicularOffset>3</PerpendicularOffset>
               </LineSymbolizer>"#,
        )
        .unwrap();
        assert_matches!(s, Some(Symbolizer::Line(l)) => {
            assert_eq!(l.uom, Some(Uom::Metre));
            assert_eq!(l.geometry, Some(Expression::property("the_geom")));
            assert!(l.stroke.is_some());
            assert_eq!(l.perpendicular_offset, Expression::literal("3"));
        });
        assert_matches!(
            symbolizer(r#"<PolygonSymbolizer uom="furlong"/>"#).unwrap(),
            Some(Symbolizer::Polygon(p)) => {
                assert_eq!(p.uom, None);
                assert_eq!(p.fill, None);
            }
        );
        assert_matches!(symbolizer("<Frob/>"), Ok(None));
    }

    #[test]
    fn text_symbolizer() {
        init();
        let s = symbolizer(
            r#"<TextSymbolizer>
                 <Label>
                   Route <ogc:PropertyName>number</ogc:PropertyName>
                 </Label>
                 <Font><CssParameter name="font-family">A</CssParameter></Font>
                 <Font><CssParameter name="font-family">B</CssParameter></Font>
                 <OtherText target="tooltip"> <ogc:PropertyName>name</ogc:PropertyName> </OtherText>
                 <Priority>10</Priority>
               </TextSymbolizer>"#,
        )
        .unwrap();
        assert_matches!(s, Some(Symbolizer::Text(t)) => {
            assert_eq!(
                t.label,
                Some(Expression::function(STR_CONCAT, vec!["Route ".into(), Expression::property("number")]))
            );
            assert_eq!(t.fonts.len(), 2);
            assert_eq!(t.other_text, Some(OtherText {
                target: "tooltip".to_owned(),
                text: Expression::property("name"),
            }));
            assert_eq!(t.priority, Some(Expression::literal("10")));
        });
    }

    #[test]
    fn other_text_needs_target() {
        init();
        let e = symbolizer("<TextSymbolizer><OtherText>x</OtherText></TextSymbolizer>").unwrap_err();
        assert!(e.is_format());
        assert!(e.to_string().contains("target"), "{}", e);
    }

    #[test]
    fn raster_symbolizer() {
        init();
        let s = symbolizer(
            r##"<RasterSymbolizer>
                 <Opacity>0.5</Opacity>
                 <ChannelSelection>
                   <RedChannel><SourceChannelName>1</SourceChannelName></RedChannel>
                   <BlueChannel><SourceChannelName>3</SourceChannelName></BlueChannel>
                 </ChannelSelection>
                 <OverlapBehavior><AVERAGE/></OverlapBehavior>
                 <ColorMap type="INTERVALS" extended="true">
                   <ColorMapEntry color="#000000" quantity="0" label="low"/>
                   <ColorMapEntry color="#FFFFFF" quantity="100" opacity="0.5"/>
                 </ColorMap>
                 <ContrastEnhancement>
                   <Normalize><VendorOption name="algorithm">StretchToMinimumMaximum</VendorOption></Normalize>
                   <GammaValue>1.5</GammaValue>
                 </ContrastEnhancement>
                 <ShadedRelief><BrightnessOnly>true</BrightnessOnly><ReliefFactor>55</ReliefFactor></ShadedRelief>
                 <ImageOutline><LineSymbolizer/></ImageOutline>
               </RasterSymbolizer>"##,
        )
        .unwrap();
        assert_matches!(s, Some(Symbolizer::Raster(r)) => {
            assert_eq!(r.opacity, Expression::literal("0.5"));
            assert_matches!(r.channel_selection, Some(ChannelSelection::Rgb([Some(red), None, Some(_)])) => {
                assert_eq!(red.name, Some(Expression::literal("1")));
            });
            assert_eq!(r.overlap, Some(OverlapBehavior::Average));
            assert_eq!(r.color_map.kind, ColorMapKind::Intervals);
            assert!(r.color_map.extended);
            assert_eq!(r.color_map.entries.len(), 2);
            assert_eq!(r.color_map.entries[0].label.as_deref(), Some("low"));
            assert_eq!(r.color_map.entries[1].opacity, Some(Expression::literal("0.5")));
            let contrast = r.contrast.unwrap();
            assert_eq!(contrast.method, Some(ContrastMethod::Normalize));
            assert_eq!(
                contrast.options["algorithm"],
                Expression::literal("StretchToMinimumMaximum")
            );
            assert_eq!(contrast.gamma, Some(Expression::literal("1.5")));
            let relief = r.shaded_relief.unwrap();
            assert!(relief.brightness_only);
            assert_eq!(relief.relief_factor, Some(Expression::literal("55.0")));
            assert_matches!(r.image_outline, Some(ImageOutline::Line(_)));
        });
    }

    #[test]
    fn gray_channel_wins_when_first() {
        init();
        let s = symbolizer(
            r#"<RasterSymbolizer><ChannelSelection>
                 <GrayChannel><SourceChannelName>1</SourceChannelName></GrayChannel>
                 <RedChannel><SourceChannelName>2</SourceChannelName></RedChannel>
               </ChannelSelection></RasterSymbolizer>"#,
        )
        .unwrap();
        assert_matches!(s, Some(Symbolizer::Raster(r)) => {
            assert_matches!(r.channel_selection, Some(ChannelSelection::Gray(g)) => {
                assert_eq!(g.name, Some(Expression::literal("1")));
            });
        });
    }

    #[test]
    fn unknown_color_map_type_is_rejected() {
        init();
        let e = symbolizer(r#"<RasterSymbolizer><ColorMap type="spline"/></RasterSymbolizer>"#)
            .unwrap_err();
        assert!(e.is_format());
        assert!(e.to_string().contains("spline"), "{}", e);
        assert!(e.stack().len() >= 2);
    }

    #[test]
    fn contrast_enhancement_skips_unknown_elements() {
        init();
        let s = symbolizer(
            r#"<RasterSymbolizer><ContrastEnhancement>
                 <Histogram/><Sharpen/><GammaValue>0.8</GammaValue>
               </ContrastEnhancement></RasterSymbolizer>"#,
        )
        .unwrap();
        assert_matches!(s, Some(Symbolizer::Raster(r)) => {
            let contrast = r.contrast.unwrap();
            assert_eq!(contrast.method, Some(ContrastMethod::Histogram));
            assert_eq!(contrast.gamma, Some(Expression::literal("0.8")));
        });
    }

    #[test]
    fn unknown_overlap_is_ignored() {
        init();
        let s = symbolizer(
            r#"<RasterSymbolizer><OverlapBehavior>sideways</OverlapBehavior></RasterSymbolizer>"#,
        )
        .unwrap();
        assert_matches!(s, Some(Symbolizer::Raster(r)) => assert_eq!(r.overlap, None));
    }
}
