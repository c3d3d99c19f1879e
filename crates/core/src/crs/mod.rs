//! Coordinate Reference System handling

mod utm;

pub use utm::{geo_point, parse_utm_epsg, utm_to_wgs84, wgs84_to_utm};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System representation.
///
/// The pipeline works with EPSG-coded systems: the satellite composites are
/// delivered in UTM (e.g. EPSG:32613 for the study area) and geographic
/// products in WGS84. A WKT string is kept when the source file carried one
/// but no EPSG code could be resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crs {
    epsg: Option<u32>,
    wkt: Option<String>,
}

impl Crs {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// UTM zone for the given EPSG 326xx/327xx code
    pub fn utm(zone: u32, north: bool) -> Self {
        let base = if north { 32600 } else { 32700 };
        Self::from_epsg(base + zone)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether this CRS is WGS84 geographic
    pub fn is_wgs84(&self) -> bool {
        self.epsg == Some(4326)
    }

    /// Check if two CRS are equivalent.
    ///
    /// EPSG codes compare exactly; WKT comparison is textual and therefore
    /// conservative (different spellings of the same CRS compare unequal).
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// Short string identifier for error messages and logs
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsg_identifier() {
        let crs = Crs::from_epsg(32613);
        assert_eq!(crs.epsg(), Some(32613));
        assert_eq!(crs.identifier(), "EPSG:32613");
    }

    #[test]
    fn equivalence() {
        assert!(Crs::from_epsg(4326).is_equivalent(&Crs::wgs84()));
        assert!(!Crs::from_epsg(32613).is_equivalent(&Crs::wgs84()));
        assert_eq!(Crs::utm(13, true).epsg(), Some(32613));
    }
}
