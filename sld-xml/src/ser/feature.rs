// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Writes inline features as a GML 2 feature collection.

use super::{ElementWriter, Error};
use crate::feature::{Coord, FieldValue, Geometry, Polygon};
use crate::model::InlineFeatures;
use crate::ExpandedNameRef;

fn gml(local_name: &str) -> ExpandedNameRef<'_> {
    ExpandedNameRef::gml(local_name)
}

/// Writes the body of an `InlineFeature` element.
pub(super) fn inline_features(w: &mut ElementWriter, features: &InlineFeatures) -> Result<(), Error> {
    let schema = &features.schema;
    let srs_name = schema
        .srs
        .as_ref()
        .map(|s| s.to_string())
        .map(|s| match s.split_once(':') {
            Some((_, code)) => code.to_owned(),
            None => s,
        });
    let mut collection = w.element(gml("FeatureCollection")).start()?;
    for record in &features.records {
        let mut member = collection.element(gml("featureMember")).start()?;
        let mut b = member.element(ExpandedNameRef::local(&schema.name));
        if let Some(id) = &record.id {
            b.attribute(ExpandedNameRef::local("fid"), id.clone())?;
        }
        let mut f = b.start()?;
        for (field, value) in schema.fields.iter().zip(&record.values) {
            let name = ExpandedNameRef::local(&field.name);
            match value {
                None => {}
                Some(FieldValue::Text(t)) => f.text_element(name, t)?,
                Some(FieldValue::Geometry(g)) => {
                    let mut c = f.element(name).start()?;
                    geometry(&mut c, g, srs_name.as_deref())?;
                    c.finish()?;
                }
            }
        }
        f.finish()?;
        member.finish()?;
    }
    collection.finish()
}

fn coordinates(w: &mut ElementWriter, coords: &[Coord]) -> Result<(), Error> {
    let text = coords
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    w.text_element(gml("coordinates"), &text)
}

fn start<'w>(
    w: &'w mut ElementWriter,
    name: &'static str,
    srs_name: Option<&str>,
) -> Result<ElementWriter<'w>, Error> {
    let mut b = w.element(gml(name));
    if let Some(srs) = srs_name {
        b.attribute(ExpandedNameRef::local("srsName"), srs.to_owned())?;
    }
    b.start()
}

fn ring(w: &mut ElementWriter, boundary: &'static str, coords: &[Coord]) -> Result<(), Error> {
    let mut b = w.element(gml(boundary)).start()?;
    let mut r = b.element(gml("LinearRing")).start()?;
    coordinates(&mut r, coords)?;
    r.finish()?;
    b.finish()
}

fn polygon(w: &mut ElementWriter, p: &Polygon, srs_name: Option<&str>) -> Result<(), Error> {
    let mut c = start(w, "Polygon", srs_name)?;
    ring(&mut c, "outerBoundaryIs", &p.exterior)?;
    for interior in &p.interiors {
        ring(&mut c, "innerBoundaryIs", interior)?;
    }
    c.finish()
}

/// Writes `g`; only the outermost element carries `srsName`.
fn geometry(w: &mut ElementWriter, g: &Geometry, srs_name: Option<&str>) -> Result<(), Error> {
    match g {
        Geometry::Point(p) => {
            let mut c = start(w, "Point", srs_name)?;
            if let Some(p) = p {
                coordinates(&mut c, std::slice::from_ref(p))?;
            }
            c.finish()
        }
        Geometry::LineString(coords) | Geometry::LinearRing(coords) => {
            let name = if matches!(g, Geometry::LineString(_)) {
                "LineString"
            } else {
                "LinearRing"
            };
            let mut c = start(w, name, srs_name)?;
            coordinates(&mut c, coords)?;
            c.finish()
        }
        Geometry::Polygon(p) => polygon(w, p, srs_name),
        Geometry::MultiPoint(points) => {
            let mut c = start(w, "MultiPoint", srs_name)?;
            for p in points {
                let mut m = c.element(gml("pointMember")).start()?;
                geometry(&mut m, &Geometry::Point(Some(*p)), None)?;
                m.finish()?;
            }
            c.finish()
        }
        Geometry::MultiLineString(lines) => {
            let mut c = start(w, "MultiLineString", srs_name)?;
            for l in lines {
                let mut m = c.element(gml("lineStringMember")).start()?;
                let mut s = m.element(gml("LineString")).start()?;
                coordinates(&mut s, l)?;
                s.finish()?;
                m.finish()?;
            }
            c.finish()
        }
        Geometry::MultiPolygon(polygons) => {
            let mut c = start(w, "MultiPolygon", srs_name)?;
            for p in polygons {
                let mut m = c.element(gml("polygonMember")).start()?;
                polygon(&mut m, p, None)?;
                m.finish()?;
            }
            c.finish()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::tree::from_str;
    use crate::feature::{
        Field, FieldKind, GeometryFromMarkup, GmlGeometry, Record, Schema, SpatialReference,
    };
    use crate::ser::fragment;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn features() -> InlineFeatures {
        let mut schema = Schema::new("Park");
        schema.fields.push(Field {
            name: "name".to_owned(),
            kind: FieldKind::Text,
        });
        schema.fields.push(Field {
            name: "the_geom".to_owned(),
            kind: FieldKind::Geometry,
        });
        schema.srs = Some(SpatialReference {
            authority: "EPSG".to_owned(),
            code: "4326".to_owned(),
        });
        InlineFeatures {
            schema,
            records: vec![Record {
                id: Some("park.1".to_owned()),
                values: vec![
                    Some(FieldValue::Text("Central".to_owned())),
                    Some(FieldValue::Geometry(Geometry::Point(Some(Coord { x: 1.5, y: -2.0 })))),
                ],
            }],
        }
    }

    #[test]
    fn writes_collection() {
        init();
        let out = fragment(|w| inline_features(w, &features())).unwrap();
        assert!(
            out.contains(concat!(
                r#"<gml:FeatureCollection><gml:featureMember><Park fid="park.1"><name>Central</name>"#,
                r#"<the_geom><gml:Point srsName="4326"><gml:coordinates>1.5,-2</gml:coordinates>"#,
                r#"</gml:Point></the_geom></Park></gml:featureMember></gml:FeatureCollection>"#,
            )),
            "{}",
            out
        );
    }

    #[test]
    fn geometries_read_back() {
        init();
        let shapes = [
            Geometry::LineString(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }]),
            Geometry::Polygon(Polygon {
                exterior: vec![
                    Coord { x: 0.0, y: 0.0 },
                    Coord { x: 4.0, y: 0.0 },
                    Coord { x: 0.0, y: 4.0 },
                    Coord { x: 0.0, y: 0.0 },
                ],
                interiors: vec![vec![
                    Coord { x: 1.0, y: 1.0 },
                    Coord { x: 2.0, y: 1.0 },
                    Coord { x: 1.0, y: 2.0 },
                    Coord { x: 1.0, y: 1.0 },
                ]],
            }),
            Geometry::MultiPoint(vec![Coord { x: 1.0, y: 2.0 }, Coord { x: 3.0, y: 4.0 }]),
            Geometry::Point(None),
        ];
        for shape in shapes {
            let out = fragment(|w| geometry(w, &shape, None)).unwrap();
            let root = from_str(&out).unwrap();
            let g = crate::de::walk::first_element(&root).unwrap();
            assert_eq!(GmlGeometry.geometry(g).unwrap(), shape, "{}", out);
        }
    }
}
