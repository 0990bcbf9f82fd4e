// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A partial reader for MapBox GL style JSON.
//!
//! The whole document becomes one [`UserLayer`] with one [`UserStyle`];
//! each JSON layer becomes a [`FeatureTypeStyle`] holding a single rule.
//! `background` layers set the style background instead. Only constant
//! property values are understood: functions, stops, expressions other than
//! `["get", name]`, filters and sprites are skipped with a debug log.
//!
//! ```rust
//! let sld = sld_xml::mbstyle::parse(r##"{
//!     "name": "demo",
//!     "layers": [
//!         {"id": "water", "type": "fill", "paint": {"fill-color": "#00f"}}
//!     ]
//! }"##).unwrap();
//! assert_eq!(sld.name.as_deref(), Some("demo"));
//! ```

use log::debug;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::expr::Expression;
use crate::model::{
    defaults, FeatureTypeStyle, Fill, Font, Graphic, GraphicSymbol, Halo, Layer,
    LineSymbolizer, Mark, PointSymbolizer, PolygonSymbolizer, RasterSymbolizer, Rule, Stroke,
    Style, StyledLayerDescriptor, Symbolizer, TextSymbolizer, UserLayer, UserStyle,
};

/// The scale denominator at zoom level 0.
const ZOOM_0_SCALE: f64 = 559_082_264.028;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Format(String),
}

/// Converts a zoom level to the equivalent scale denominator.
pub fn zoom_to_scale(zoom: f64) -> f64 {
    ZOOM_0_SCALE / 2f64.powf(zoom)
}

/// Reads a style document.
pub fn parse(json: &str) -> Result<StyledLayerDescriptor, Error> {
    let doc: Value = serde_json::from_str(json)?;
    let root = doc
        .as_object()
        .ok_or_else(|| Error::Format("style document must be a JSON object".to_owned()))?;
    let name = root.get("name").and_then(Value::as_str).map(str::to_owned);
    let layers = root
        .get("layers")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Format("style document has no layers array".to_owned()))?;

    let mut style = UserStyle {
        name: name.clone(),
        ..UserStyle::default()
    };
    for (i, layer) in layers.iter().enumerate() {
        let layer = layer
            .as_object()
            .ok_or_else(|| Error::Format(format!("layer {} is not an object", i)))?;
        let layer = JsonLayer::new(i, layer)?;
        if layer.layout_str("visibility") == Some("none") {
            debug!("skipping hidden layer {}", layer.id);
            continue;
        }
        let symbolizer = match layer.kind {
            "background" => {
                style.background = Some(layer.fill("background-color", "background-opacity")?);
                continue;
            }
            "fill" => layer.fill_symbolizer()?,
            "line" => Symbolizer::Line(layer.line_symbolizer()?),
            "circle" => layer.circle_symbolizer()?,
            "symbol" => match layer.text_symbolizer()? {
                Some(s) => s,
                None => {
                    debug!("skipping symbol layer {} without text-field", layer.id);
                    continue;
                }
            },
            "raster" => Symbolizer::Raster(RasterSymbolizer {
                opacity: layer.number("raster-opacity", 1.0),
                ..RasterSymbolizer::default()
            }),
            other => {
                debug!("skipping layer {} of unsupported type {:?}", layer.id, other);
                continue;
            }
        };
        style.feature_type_styles.push(layer.feature_type_style(symbolizer));
    }

    Ok(StyledLayerDescriptor {
        name: name.clone(),
        title: None,
        abstract_: None,
        layers: vec![Layer::User(UserLayer {
            name,
            styles: vec![Style::User(style)],
            ..UserLayer::default()
        })],
    })
}

struct JsonLayer<'a> {
    id: String,
    kind: &'a str,
    json: &'a Map<String, Value>,
    paint: Option<&'a Map<String, Value>>,
    layout: Option<&'a Map<String, Value>>,
}

impl<'a> JsonLayer<'a> {
    fn new(index: usize, json: &'a Map<String, Value>) -> Result<Self, Error> {
        let id = json
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| format!("#{}", index), str::to_owned);
        let kind = json
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Format(format!("layer {} has no type", id)))?;
        Ok(JsonLayer {
            id,
            kind,
            json,
            paint: json.get("paint").and_then(Value::as_object),
            layout: json.get("layout").and_then(Value::as_object),
        })
    }

    fn layout_str(&self, key: &str) -> Option<&'a str> {
        self.layout?.get(key)?.as_str()
    }

    fn paint_value(&self, key: &str) -> Option<&'a Value> {
        self.paint?.get(key)
    }

    /// A constant number, or `default` if absent or not constant.
    fn number(&self, key: &str, default: f64) -> Expression {
        Expression::number(self.number_value(key).unwrap_or(default))
    }

    fn number_value(&self, key: &str) -> Option<f64> {
        let v = self.paint_value(key).or_else(|| self.layout?.get(key))?;
        match v.as_f64() {
            Some(n) => Some(n),
            None => {
                debug!("layer {}: ignoring non-constant {}", self.id, key);
                None
            }
        }
    }

    /// A color and the opacity it implies, combined with the opacity property.
    fn color(&self, color_key: &str, opacity_key: &str) -> Result<(Expression, Expression), Error> {
        let opacity = self.number_value(opacity_key).unwrap_or(1.0);
        let (hex, alpha) = match self.paint_value(color_key) {
            None => ("#000000".to_owned(), 1.0),
            Some(Value::String(s)) => parse_color(s).ok_or_else(|| {
                Error::Format(format!("layer {}: unrecognized color {:?}", self.id, s))
            })?,
            Some(_) => {
                debug!("layer {}: ignoring non-constant {}", self.id, color_key);
                ("#000000".to_owned(), 1.0)
            }
        };
        Ok((Expression::literal(hex), Expression::number(opacity * alpha)))
    }

    fn fill(&self, color_key: &str, opacity_key: &str) -> Result<Fill, Error> {
        let (color, opacity) = self.color(color_key, opacity_key)?;
        Ok(Fill {
            color,
            opacity,
            graphic_fill: None,
        })
    }

    fn fill_symbolizer(&self) -> Result<Symbolizer, Error> {
        let stroke = match self.paint_value("fill-outline-color") {
            Some(_) => {
                let (color, opacity) = self.color("fill-outline-color", "fill-opacity")?;
                Some(Stroke {
                    color,
                    opacity,
                    ..Stroke::default()
                })
            }
            None => None,
        };
        Ok(Symbolizer::Polygon(PolygonSymbolizer {
            fill: Some(self.fill("fill-color", "fill-opacity")?),
            stroke,
            ..PolygonSymbolizer::default()
        }))
    }

    fn line_symbolizer(&self) -> Result<LineSymbolizer, Error> {
        let (color, opacity) = self.color("line-color", "line-opacity")?;
        let dash_array = match self.paint_value("line-dasharray") {
            Some(Value::Array(a)) => a
                .iter()
                .filter_map(Value::as_f64)
                .map(Expression::number)
                .collect(),
            _ => Vec::new(),
        };
        let mut stroke = Stroke {
            color,
            opacity,
            width: self.number("line-width", 1.0),
            dash_array,
            ..Stroke::default()
        };
        if let Some(cap) = self.layout_str("line-cap") {
            stroke.line_cap = cap.into();
        }
        if let Some(join) = self.layout_str("line-join") {
            stroke.line_join = join.into();
        }
        Ok(LineSymbolizer {
            stroke: Some(stroke),
            perpendicular_offset: self.number("line-offset", 0.0),
            ..LineSymbolizer::default()
        })
    }

    fn circle_symbolizer(&self) -> Result<Symbolizer, Error> {
        let radius = self.number_value("circle-radius").unwrap_or(5.0);
        let stroke_width = self.number_value("circle-stroke-width").unwrap_or(0.0);
        let stroke = if stroke_width > 0.0 {
            let (color, opacity) = self.color("circle-stroke-color", "circle-stroke-opacity")?;
            Some(Stroke {
                color,
                opacity,
                width: Expression::number(stroke_width),
                ..Stroke::default()
            })
        } else {
            None
        };
        let mark = Mark {
            well_known_name: "circle".into(),
            fill: Some(self.fill("circle-color", "circle-opacity")?),
            stroke,
        };
        Ok(Symbolizer::Point(PointSymbolizer {
            graphic: Graphic {
                symbols: vec![GraphicSymbol::Mark(mark)],
                size: Some(Expression::number(radius * 2.0)),
                ..Graphic::default()
            },
            ..PointSymbolizer::default()
        }))
    }

    fn text_symbolizer(&self) -> Result<Option<Symbolizer>, Error> {
        let label = match self.layout.and_then(|l| l.get("text-field")) {
            Some(Value::String(s)) => tokens(s),
            Some(Value::Array(a)) => match &a[..] {
                [Value::String(op), Value::String(name)] if op == "get" => {
                    Expression::property(name.as_str())
                }
                _ => {
                    debug!("layer {}: ignoring text-field expression", self.id);
                    return Ok(None);
                }
            },
            _ => return Ok(None),
        };
        let families = match self.layout.and_then(|l| l.get("text-font")) {
            Some(Value::Array(a)) => a
                .iter()
                .filter_map(Value::as_str)
                .map(Expression::from)
                .collect(),
            _ => vec![defaults::FONT_FAMILY.into()],
        };
        let font = Font {
            families,
            size: self.number("text-size", 16.0),
            ..Font::default()
        };
        let halo_width = self.number_value("text-halo-width").unwrap_or(0.0);
        let halo = if halo_width > 0.0 {
            Some(Halo {
                radius: Expression::number(halo_width),
                fill: self.fill("text-halo-color", "text-opacity")?,
            })
        } else {
            None
        };
        Ok(Some(Symbolizer::Text(TextSymbolizer {
            label: Some(label),
            fonts: vec![font],
            halo,
            fill: Some(self.fill("text-color", "text-opacity")?),
            ..TextSymbolizer::default()
        })))
    }

    fn feature_type_style(&self, symbolizer: Symbolizer) -> FeatureTypeStyle {
        let mut rule = Rule {
            name: Some(self.id.clone()),
            symbolizers: vec![symbolizer],
            ..Rule::default()
        };
        // Higher zoom levels are larger scales, so smaller denominators.
        if let Some(z) = self.json.get("minzoom").and_then(Value::as_f64) {
            rule.max_scale_denominator = zoom_to_scale(z);
        }
        if let Some(z) = self.json.get("maxzoom").and_then(Value::as_f64) {
            rule.min_scale_denominator = zoom_to_scale(z);
        }
        if self.json.contains_key("filter") {
            debug!("layer {}: ignoring filter", self.id);
        }
        FeatureTypeStyle {
            name: Some(self.id.clone()),
            feature_type_names: self
                .json
                .get("source-layer")
                .and_then(Value::as_str)
                .map(|s| vec![s.to_owned()])
                .unwrap_or_default(),
            rules: vec![rule],
            ..FeatureTypeStyle::default()
        }
    }
}

/// Turns `"{name} Rd"` into `strConcat(name, ' Rd')`.
fn tokens(s: &str) -> Expression {
    let mut parts = Vec::new();
    let mut rest = s;
    while let Some(open) = rest.find('{') {
        let close = match rest[open..].find('}') {
            Some(c) => open + c,
            None => break,
        };
        if open > 0 {
            parts.push(Expression::literal(&rest[..open]));
        }
        parts.push(Expression::property(rest[open + 1..close].trim()));
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        parts.push(Expression::literal(rest));
    }
    Expression::join(parts)
}

/// Parses a CSS color into `#RRGGBB` and an alpha in `[0, 1]`.
fn parse_color(s: &str) -> Option<(String, f64)> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let full: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 => hex.to_owned(),
            _ => return None,
        };
        return Some((format!("#{}", full.to_ascii_uppercase()), 1.0));
    }
    let lower = s.to_ascii_lowercase();
    if let Some((func, args)) = lower.strip_suffix(')').and_then(|f| f.split_once('(')) {
        let args: Vec<&str> = args.split(',').map(str::trim).collect();
        let alpha = |i: usize| -> Option<f64> {
            match args.get(i) {
                Some(a) => a.parse().ok(),
                None => Some(1.0),
            }
        };
        return match (func.trim(), args.len()) {
            ("rgb", 3) | ("rgba", 4) => {
                let mut rgb = [0u8; 3];
                for (c, a) in rgb.iter_mut().zip(&args) {
                    *c = a.parse::<f64>().ok()?.round().clamp(0.0, 255.0) as u8;
                }
                Some((hex(rgb), alpha(3)?))
            }
            ("hsl", 3) | ("hsla", 4) => {
                let h: f64 = args[0].parse().ok()?;
                let pct = |a: &str| a.strip_suffix('%')?.trim().parse::<f64>().ok().map(|p| p / 100.0);
                Some((hex(hsl_to_rgb(h, pct(args[1])?, pct(args[2])?)), alpha(3)?))
            }
            _ => None,
        };
    }
    named_color(&lower).map(|(hex, alpha)| (hex.to_owned(), alpha))
}

fn hex(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let h = h.rem_euclid(360.0) / 60.0;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_u8(r), to_u8(g), to_u8(b)]
}

fn named_color(name: &str) -> Option<(&'static str, f64)> {
    Some(match name {
        "transparent" => ("#000000", 0.0),
        "black" => ("#000000", 1.0),
        "white" => ("#FFFFFF", 1.0),
        "red" => ("#FF0000", 1.0),
        "green" => ("#008000", 1.0),
        "lime" => ("#00FF00", 1.0),
        "blue" => ("#0000FF", 1.0),
        "yellow" => ("#FFFF00", 1.0),
        "cyan" | "aqua" => ("#00FFFF", 1.0),
        "magenta" | "fuchsia" => ("#FF00FF", 1.0),
        "gray" | "grey" => ("#808080", 1.0),
        "silver" => ("#C0C0C0", 1.0),
        "maroon" => ("#800000", 1.0),
        "olive" => ("#808000", 1.0),
        "teal" => ("#008080", 1.0),
        "navy" => ("#000080", 1.0),
        "purple" => ("#800080", 1.0),
        "orange" => ("#FFA500", 1.0),
        _ => return None,
    })
}
