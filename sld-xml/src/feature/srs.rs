// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spatial reference identifiers.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

/// A coordinate reference system identified by authority and code.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SpatialReference {
    pub authority: String,
    pub code: String,
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority, self.code)
    }
}

#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("unrecognized spatial reference {0:?}")]
    Unrecognized(String),
}

/// Decodes an `srsName` attribute.
pub trait ResolveAuthorityCode: Send + Sync {
    fn resolve(&self, srs_name: &str) -> Result<SpatialReference, AuthorityError>;
}

/// Understands the usual spellings of EPSG codes:
///
/// *   `EPSG:4326`
/// *   `4326`
/// *   `urn:ogc:def:crs:EPSG::4326` (and `urn:x-ogc:...`)
/// *   `http://www.opengis.net/gml/srs/epsg.xml#4326`
#[derive(Copy, Clone, Debug, Default)]
pub struct EpsgAuthority;

impl ResolveAuthorityCode for EpsgAuthority {
    fn resolve(&self, srs_name: &str) -> Result<SpatialReference, AuthorityError> {
        let s = srs_name.trim();
        let code = if let Some(i) = s.find("epsg.xml#") {
            &s[i + "epsg.xml#".len()..]
        } else if let Some(rest) = s
            .strip_prefix("urn:ogc:def:crs:")
            .or_else(|| s.strip_prefix("urn:x-ogc:def:crs:"))
        {
            // EPSG:[version]:code
            match rest.split(':').collect::<Vec<_>>()[..] {
                [auth, _, code] if auth.eq_ignore_ascii_case("EPSG") => code,
                [auth, code] if auth.eq_ignore_ascii_case("EPSG") => code,
                _ => return Err(AuthorityError::Unrecognized(srs_name.to_owned())),
            }
        } else if let Some((auth, code)) = s.split_once(':') {
            if !auth.eq_ignore_ascii_case("EPSG") {
                return Err(AuthorityError::Unrecognized(srs_name.to_owned()));
            }
            code
        } else {
            s
        };
        if code.is_empty() || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AuthorityError::Unrecognized(srs_name.to_owned()));
        }
        Ok(SpatialReference {
            authority: "EPSG".to_owned(),
            code: code.to_owned(),
        })
    }
}

/// Resolved spatial references by `srsName`.
///
/// Entries are never invalidated; authority codes are immutable. Share one
/// cache between parsers with [`crate::Parser::srs_cache`].
#[derive(Debug, Default)]
pub struct SrsCache(Mutex<HashMap<String, Arc<SpatialReference>>>);

impl SrsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached entry for `key`, or computes and caches it.
    ///
    /// The lock is not held while `resolve` runs; two threads racing on the
    /// same key may both resolve it, and the first insert wins.
    pub fn get_or_insert_with<E>(
        &self,
        key: &str,
        resolve: impl FnOnce() -> Result<SpatialReference, E>,
    ) -> Result<Arc<SpatialReference>, E> {
        if let Some(hit) = self.lock().get(key) {
            return Ok(hit.clone());
        }
        let resolved = Arc::new(resolve()?);
        Ok(self
            .lock()
            .entry(key.to_owned())
            .or_insert(resolved)
            .clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<SpatialReference>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
