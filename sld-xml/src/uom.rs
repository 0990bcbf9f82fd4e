// Copyright (C) 2021 Scott Lamb <slamb@slamb.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Units of measure for symbolizer sizes.

use std::fmt;

const SE_UNITS: &str = "http://www.opengeospatial.org/se/units/";

/// The unit in which a symbolizer's sizes and offsets are given.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Uom {
    Pixel,
    Metre,
    Foot,
}

impl Uom {
    fn short_name(self) -> &'static str {
        match self {
            Uom::Pixel => "pixel",
            Uom::Metre => "metre",
            Uom::Foot => "foot",
        }
    }

    /// The Symbology Encoding URI, as written in `uom` attributes.
    pub fn se_uri(self) -> String {
        format!("{}{}", SE_UNITS, self.short_name())
    }

    /// Parses either the SE URI or its final path segment.
    ///
    /// ```rust
    /// # use sld_xml::uom::Uom;
    /// assert_eq!(Uom::parse("http://www.opengeospatial.org/se/units/metre"), Some(Uom::Metre));
    /// assert_eq!(Uom::parse("pixel"), Some(Uom::Pixel));
    /// assert_eq!(Uom::parse("furlong"), None);
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        let value = crate::de::trim(value);
        let short = value.strip_prefix(SE_UNITS).unwrap_or(value);
        [Uom::Pixel, Uom::Metre, Uom::Foot]
            .into_iter()
            .find(|u| u.short_name().eq_ignore_ascii_case(short))
    }
}

impl fmt::Display for Uom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_round_trip() {
        for u in [Uom::Pixel, Uom::Metre, Uom::Foot] {
            assert_eq!(Uom::parse(&u.se_uri()), Some(u));
        }
    }
}
