// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GML 2 and 3 geometry markup.

use super::{Coord, Geometry, GeometryError, GeometryFromMarkup, Polygon};
use crate::de::{walk, Element};

/// Reads `Point`, `LineString`, `LinearRing`, `Polygon` and their `Multi`
/// forms, with coordinates given as `coordinates`, `coord`, `pos` or `posList`.
#[derive(Copy, Clone, Debug, Default)]
pub struct GmlGeometry;

impl GeometryFromMarkup for GmlGeometry {
    fn geometry(&self, node: &Element) -> Result<Geometry, GeometryError> {
        let name = node.local_name();
        match name {
            "Point" => Ok(Geometry::Point(coords(node)?.into_iter().next())),
            "LineString" => Ok(Geometry::LineString(coords(node)?)),
            "LinearRing" => Ok(Geometry::LinearRing(coords(node)?)),
            "Polygon" => Ok(Geometry::Polygon(polygon(node)?)),
            "MultiPoint" => {
                let mut points = Vec::new();
                for p in walk::find_all_by_name(node, "Point") {
                    points.extend(coords(p)?.into_iter().next());
                }
                Ok(Geometry::MultiPoint(points))
            }
            "MultiLineString" | "MultiCurve" => Ok(Geometry::MultiLineString(
                walk::find_all_by_name(node, "LineString")
                    .into_iter()
                    .map(coords)
                    .collect::<Result<_, _>>()?,
            )),
            "MultiPolygon" | "MultiSurface" => Ok(Geometry::MultiPolygon(
                walk::find_all_by_name(node, "Polygon")
                    .into_iter()
                    .map(polygon)
                    .collect::<Result<_, _>>()?,
            )),
            _ => Err(GeometryError::Unsupported(name.to_owned())),
        }
    }
}

fn polygon(node: &Element) -> Result<Polygon, GeometryError> {
    let mut out = Polygon::default();
    let mut found_exterior = false;
    for boundary in node.elements() {
        let ring = || {
            walk::find_child(boundary, "LinearRing")
                .ok_or(GeometryError::Missing("polygon boundary", "LinearRing"))
                .and_then(coords)
        };
        if boundary.is("outerBoundaryIs") || boundary.is("exterior") {
            out.exterior = ring()?;
            found_exterior = true;
        } else if boundary.is("innerBoundaryIs") || boundary.is("interior") {
            out.interiors.push(ring()?);
        }
    }
    if !found_exterior {
        return Err(GeometryError::Missing("Polygon", "exterior ring"));
    }
    Ok(out)
}

/// Collects the coordinates given directly under a primitive geometry.
fn coords(node: &Element) -> Result<Vec<Coord>, GeometryError> {
    let mut out = Vec::new();
    for c in node.elements() {
        match c.local_name() {
            "coordinates" => coordinates(c, &mut out)?,
            "coord" => {
                let ordinate = |axis: &'static str| {
                    walk::find_child(c, axis)
                        .ok_or(GeometryError::Missing("coord", axis))
                        .and_then(|e| number(&e.text()))
                };
                out.push(Coord {
                    x: ordinate("X")?,
                    y: ordinate("Y")?,
                });
            }
            "pos" => {
                let n = numbers(&c.text())?;
                match n[..] {
                    [x, y, ..] => out.push(Coord { x, y }),
                    _ => return Err(GeometryError::BadCoordinate(c.text())),
                }
            }
            "posList" => {
                let dim = c
                    .attribute("srsDimension")
                    .and_then(|d| d.trim().parse::<usize>().ok())
                    .filter(|&d| d >= 2)
                    .unwrap_or(2);
                let n = numbers(&c.text())?;
                if n.len() % dim != 0 {
                    return Err(GeometryError::BadCoordinate(c.text()));
                }
                out.extend(n.chunks(dim).map(|p| Coord { x: p[0], y: p[1] }));
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Parses `<gml:coordinates>`, honoring its `decimal`, `cs` and `ts` attributes.
fn coordinates(node: &Element, out: &mut Vec<Coord>) -> Result<(), GeometryError> {
    let decimal = node.attribute("decimal").unwrap_or(".");
    let cs = node.attribute("cs").unwrap_or(",");
    let ts = node.attribute("ts").unwrap_or(" ");
    let text = node.text();
    let tuples: Vec<&str> = if ts.trim().is_empty() {
        text.split_whitespace().collect()
    } else {
        text.split(ts).map(str::trim).filter(|t| !t.is_empty()).collect()
    };
    for tuple in tuples {
        let mut ordinates = tuple.split(cs).map(|o| {
            if decimal == "." {
                number(o)
            } else {
                number(&o.replace(decimal, "."))
            }
        });
        match (ordinates.next(), ordinates.next()) {
            (Some(x), Some(y)) => out.push(Coord { x: x?, y: y? }),
            _ => return Err(GeometryError::BadCoordinate(tuple.to_owned())),
        }
    }
    Ok(())
}

fn number(s: &str) -> Result<f64, GeometryError> {
    s.trim()
        .parse()
        .map_err(|_| GeometryError::BadCoordinate(s.to_owned()))
}

fn numbers(s: &str) -> Result<Vec<f64>, GeometryError> {
    s.split_whitespace().map(number).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::tree::from_str;
    use assert_matches::assert_matches;

    fn read(xml: &str) -> Result<Geometry, GeometryError> {
        let doc = format!(
            r#"<root xmlns:gml="http://www.opengis.net/gml">{}</root>"#,
            xml
        );
        let root = from_str(&doc).unwrap();
        GmlGeometry.geometry(walk::first_element(&root).unwrap())
    }

    #[test]
    fn gml2_point_and_empty_point() {
        assert_eq!(
            read("<gml:Point><gml:coordinates>1.5,2</gml:coordinates></gml:Point>").unwrap(),
            Geometry::Point(Some(Coord { x: 1.5, y: 2.0 }))
        );
        assert_eq!(read("<gml:Point/>").unwrap(), Geometry::Point(None));
    }

    #[test]
    fn gml3_pos_list_and_coord() {
        assert_eq!(
            read(r#"<gml:LineString><gml:posList>0 0 1 1 2 0</gml:posList></gml:LineString>"#)
                .unwrap(),
            Geometry::LineString(vec![
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 1.0, y: 1.0 },
                Coord { x: 2.0, y: 0.0 },
            ])
        );
        assert_eq!(
            read("<gml:Point><gml:coord><gml:X>3</gml:X><gml:Y>4</gml:Y></gml:coord></gml:Point>")
                .unwrap(),
            Geometry::Point(Some(Coord { x: 3.0, y: 4.0 }))
        );
    }

    #[test]
    fn polygon_with_hole() {
        let g = read(
            r#"<gml:Polygon>
                 <gml:outerBoundaryIs><gml:LinearRing>
                   <gml:coordinates>0,0 4,0 4,4 0,4 0,0</gml:coordinates>
                 </gml:LinearRing></gml:outerBoundaryIs>
                 <gml:innerBoundaryIs><gml:LinearRing>
                   <gml:coordinates cs=";" decimal=",">1;1 2;1 2;2,5 1;1</gml:coordinates>
                 </gml:LinearRing></gml:innerBoundaryIs>
               </gml:Polygon>"#,
        )
        .unwrap();
        assert_matches!(g, Geometry::Polygon(p) => {
            assert_eq!(p.exterior.len(), 5);
            assert_eq!(p.interiors.len(), 1);
            assert_eq!(p.interiors[0][2], Coord { x: 2.0, y: 2.5 });
        });
    }

    #[test]
    fn errors() {
        assert_matches!(
            read("<gml:Point><gml:coordinates>a,b</gml:coordinates></gml:Point>"),
            Err(GeometryError::BadCoordinate(_))
        );
        assert_matches!(read("<gml:Curve/>"), Err(GeometryError::Unsupported(_)));
        assert_matches!(
            read("<gml:Polygon/>"),
            Err(GeometryError::Missing("Polygon", _))
        );
    }
}
