// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Features embedded in a user layer's `InlineFeature` element.
//!
//! Two shapes are accepted: bare features of a single type,
//!
//! ```xml
//! <InlineFeature>
//!   <Park><name>Central</name><the_geom><gml:Point>...</gml:Point></the_geom></Park>
//!   <Park>...</Park>
//! </InlineFeature>
//! ```
//!
//! or one `gml:FeatureCollection` of `gml:featureMember` (one feature each)
//! and `gml:featureMembers` (any number) elements. The schema comes from the
//! first feature: a child with element children of its own is a geometry
//! field, anything else is text.

use log::{debug, warn};

use super::tree::Element;
use super::{walk, Error};
use crate::feature::{
    Field, FieldKind, FieldValue, GeometryFromMarkup, RecordFactory, ResolveAuthorityCode,
    Schema, SpatialReference, SrsCache,
};
use crate::model::InlineFeatures;
use crate::ExpandedNameRef;

/// Parses inline features; see [`super::Parser::inline_features`].
pub struct InlineFeatureParser<'a> {
    geometries: &'a dyn GeometryFromMarkup,
    authorities: &'a dyn ResolveAuthorityCode,
    records: &'a dyn RecordFactory,
    srs_cache: &'a SrsCache,
}

/// The result of [`InlineFeatureParser::parse`].
pub type ParsedFeatures = InlineFeatures;

impl<'a> InlineFeatureParser<'a> {
    pub fn new(
        geometries: &'a dyn GeometryFromMarkup,
        authorities: &'a dyn ResolveAuthorityCode,
        records: &'a dyn RecordFactory,
        srs_cache: &'a SrsCache,
    ) -> Self {
        InlineFeatureParser {
            geometries,
            authorities,
            records,
            srs_cache,
        }
    }

    /// Parses the children of `root`, typically an `InlineFeature` element.
    ///
    /// Fails without a partial result if the shape is ambiguous or if there
    /// are no features. A geometry that can't be decoded, or a value that
    /// doesn't fit the schema, is logged and left unset.
    pub fn parse(&self, root: &Element) -> Result<ParsedFeatures, Error> {
        let features = self.classify(root)?;
        let first = match features.first() {
            Some(f) => *f,
            None => {
                return Err(Error::format(
                    root,
                    "inline feature block contains no features".to_owned(),
                ))
            }
        };
        let schema = self.infer_schema(first);
        let mut records = Vec::with_capacity(features.len());
        for feature in features {
            let id = feature
                .attribute("fid")
                .or_else(|| feature.attribute_ns(ExpandedNameRef::gml("id")))
                .map(str::to_owned);
            let mut record = self.records.create(&schema, id);
            for child in feature.elements() {
                let name = child.local_name();
                let value = match schema.field_index(name).map(|i| schema.fields[i].kind) {
                    Some(FieldKind::Geometry) => match walk::first_element(child) {
                        Some(g) => match self.geometries.geometry(g) {
                            Ok(geometry) => FieldValue::Geometry(geometry),
                            Err(e) => {
                                debug!("can't decode {}.{}: {}; leaving it unset", schema.name, name, e);
                                continue;
                            }
                        },
                        None => {
                            debug!("{}.{} has no geometry element; leaving it unset", schema.name, name);
                            continue;
                        }
                    },
                    _ => FieldValue::Text(child.text()),
                };
                if let Err(e) = self.records.set(&schema, &mut record, name, value) {
                    debug!("can't set {}.{}: {}", schema.name, name, e);
                }
            }
            records.push(record);
        }
        Ok(InlineFeatures { schema, records })
    }

    /// Returns the feature elements, checking that the block has one shape.
    fn classify<'e>(&self, root: &'e Element) -> Result<Vec<&'e Element>, Error> {
        let top: Vec<&Element> = root.elements().filter(|e| !e.is("boundedBy")).collect();
        let mut collections = top.iter().filter(|e| e.is("FeatureCollection"));
        let collection = match (collections.next(), collections.next()) {
            (None, _) => None,
            (Some(c), None) => Some(*c),
            (Some(_), Some(second)) => {
                return Err(Error::format(
                    second,
                    "inline feature block has more than one FeatureCollection".to_owned(),
                ))
            }
        };
        match collection {
            Some(c) => {
                if top.len() > 1 {
                    return Err(Error::format(
                        root,
                        "inline feature block mixes a FeatureCollection with bare features"
                            .to_owned(),
                    ));
                }
                let mut features = Vec::new();
                for member in c.elements() {
                    if member.is("featureMember") {
                        features.extend(walk::first_element(member));
                    } else if member.is("featureMembers") {
                        features.extend(member.elements());
                    }
                }
                Ok(features)
            }
            None => {
                if let Some(other) = top.iter().find(|e| e.local_name() != top[0].local_name()) {
                    return Err(Error::format(
                        other,
                        format!(
                            "inline feature block is too complex: features of types {} and {}",
                            top[0].local_name(),
                            other.local_name()
                        ),
                    ));
                }
                Ok(top)
            }
        }
    }

    fn infer_schema(&self, first: &Element) -> Schema {
        let mut schema = Schema::new(first.local_name());
        for child in first.elements() {
            let name = child.local_name();
            if schema.field_index(name).is_some() {
                continue;
            }
            let kind = if child.has_element_children() {
                FieldKind::Geometry
            } else {
                FieldKind::Text
            };
            if kind == FieldKind::Geometry && schema.srs.is_none() {
                if let Some(g) = walk::first_element(child) {
                    match self.geometries.geometry(g) {
                        Ok(_) => schema.srs = self.srs(g),
                        Err(e) => debug!("no spatial reference from {}.{}: {}", schema.name, name, e),
                    }
                }
            }
            schema.fields.push(Field {
                name: name.to_owned(),
                kind,
            });
        }
        schema
    }

    /// Resolves the `srsName` of a geometry element, once per name.
    fn srs(&self, geometry: &Element) -> Option<SpatialReference> {
        let name = geometry.attribute("srsName")?;
        match self
            .srs_cache
            .get_or_insert_with(name, || self.authorities.resolve(name))
        {
            Ok(srs) => Some((*srs).clone()),
            Err(e) => {
                warn!("ignoring spatial reference: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::de::tree::from_str;
    use crate::feature::{Coord, EpsgAuthority, Geometry, GmlGeometry, SimpleRecords};
    use assert_matches::assert_matches;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn parse_with(cache: &SrsCache, xml: &str) -> Result<ParsedFeatures, Error> {
        let root = from_str(&format!(
            r#"<InlineFeature xmlns:gml="http://www.opengis.net/gml">{}</InlineFeature>"#,
            xml
        ))
        .unwrap();
        InlineFeatureParser::new(&GmlGeometry, &EpsgAuthority, &SimpleRecords, cache).parse(&root)
    }

    fn parse(xml: &str) -> Result<ParsedFeatures, Error> {
        parse_with(&SrsCache::new(), xml)
    }

    #[test]
    fn collection_schema_from_first_feature() {
        init();
        let parsed = parse(
            r#"<gml:FeatureCollection>
                 <gml:boundedBy><gml:null>unknown</gml:null></gml:boundedBy>
                 <gml:featureMember>
                   <P fid="p.1"><a>1</a><b><gml:Point srsName="EPSG:4326"><gml:coordinates>1,2</gml:coordinates></gml:Point></b></P>
                 </gml:featureMember>
                 <gml:featureMember><P><a>2</a><c>ignored</c></P></gml:featureMember>
               </gml:FeatureCollection>"#,
        )
        .unwrap();
        let schema = &parsed.schema;
        assert_eq!(schema.name, "P");
        assert_eq!(schema.namespace, crate::feature::INLINE_NAMESPACE);
        assert_eq!(
            schema.fields,
            [
                Field { name: "a".to_owned(), kind: FieldKind::Text },
                Field { name: "b".to_owned(), kind: FieldKind::Geometry },
            ]
        );
        assert_eq!(schema.srs.as_ref().map(ToString::to_string).as_deref(), Some("EPSG:4326"));
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].id.as_deref(), Some("p.1"));
        assert_eq!(
            parsed.records[0].get(schema, "b"),
            Some(&FieldValue::Geometry(Geometry::Point(Some(Coord { x: 1.0, y: 2.0 }))))
        );
        assert_eq!(parsed.records[1].get(schema, "a"), Some(&FieldValue::Text("2".to_owned())));
        assert_eq!(parsed.records[1].get(schema, "b"), None);
    }

    #[test]
    fn feature_members() {
        init();
        let parsed = parse(
            r#"<gml:FeatureCollection><gml:featureMembers>
                 <Q gml:id="q.1"><n>x</n></Q><Q gml:id="q.2"><n>y</n></Q>
               </gml:featureMembers></gml:FeatureCollection>"#,
        )
        .unwrap();
        let ids: Vec<_> = parsed.records.iter().map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, [Some("q.1"), Some("q.2")]);
    }

    #[test]
    fn bare_features() {
        init();
        let parsed = parse("<Park><name>A</name></Park><Park><name>B</name></Park>").unwrap();
        assert_eq!(parsed.schema.name, "Park");
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.schema.srs, None);
    }

    #[test]
    fn ambiguous_shapes_fail() {
        init();
        let e = parse(
            r#"<gml:FeatureCollection><gml:featureMember><P><a>1</a></P></gml:featureMember></gml:FeatureCollection>
               <P><a>2</a></P>"#,
        )
        .unwrap_err();
        assert!(e.is_format());
        assert!(e.to_string().contains("mixes"), "{}", e);

        let e = parse("<gml:FeatureCollection/><gml:FeatureCollection/>").unwrap_err();
        assert!(e.to_string().contains("more than one"), "{}", e);

        let e = parse("<A><x>1</x></A><B><x>1</x></B>").unwrap_err();
        assert!(e.to_string().contains("too complex"), "{}", e);

        let e = parse("<gml:FeatureCollection/>").unwrap_err();
        assert!(e.to_string().contains("no features"), "{}", e);
        let e = parse("").unwrap_err();
        assert!(e.is_format());
    }

    #[test]
    fn bad_geometry_is_left_unset() {
        init();
        let parsed = parse(
            r#"<P><n>a</n><g><gml:Point srsName="EPSG:4326"><gml:coordinates>1,2</gml:coordinates></gml:Point></g></P>
               <P><n>b</n><g><gml:Point><gml:coordinates>x,y</gml:coordinates></gml:Point></g></P>"#,
        )
        .unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].get(&parsed.schema, "n"), Some(&FieldValue::Text("b".to_owned())));
        assert_eq!(parsed.records[1].get(&parsed.schema, "g"), None);

        // The first feature's geometry is still a field; it just yields no
        // spatial reference.
        let parsed = parse(
            r#"<P><g><gml:Point srsName="EPSG:4326"><gml:coordinates>x,y</gml:coordinates></gml:Point></g></P>"#,
        )
        .unwrap();
        assert_eq!(parsed.schema.fields[0].kind, FieldKind::Geometry);
        assert_eq!(parsed.schema.srs, None);
        assert_eq!(parsed.records[0].get(&parsed.schema, "g"), None);
    }

    #[test]
    fn srs_resolved_once_per_cache() {
        init();
        let cache = SrsCache::new();
        let xml = r#"<P><g><gml:Point srsName="urn:ogc:def:crs:EPSG::3857"><gml:pos>1 2</gml:pos></gml:Point></g></P>"#;
        let a = parse_with(&cache, xml).unwrap();
        let b = parse_with(&cache, xml).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(a.schema.srs, b.schema.srs);
        assert_matches!(a.schema.srs, Some(SpatialReference { ref code, .. }) if code == "3857");

        let unknown = parse(r#"<P><g><gml:Point srsName="CRS:84"/></g></P>"#).unwrap();
        assert_eq!(unknown.schema.srs, None);
    }
}
