//! Coordinate Reference System handling
//!
//! Area and length arithmetic differs fundamentally between angular and
//! linear reference systems, so every CRS must classify as one or the other.
//! There is no default CRS.

mod reproject;

pub use reproject::{Reprojector, TransverseMercator};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a CRS measures positions in angles or in linear units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrsKind {
    /// Angular units (degrees of longitude/latitude)
    Geographic,
    /// Linear units (metres)
    Projected,
}

/// Coordinate Reference System representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    /// WKT representation
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
    /// PROJ string if available
    proj: Option<String>,
    /// Kind stated by the source (e.g. a GeoTIFF model type) when no code
    /// or definition classifies it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<CrsKind>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
            proj: None,
            kind: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
            proj: None,
            kind: None,
        }
    }

    /// Create a CRS from a PROJ string
    pub fn from_proj(proj: impl Into<String>) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: Some(proj.into()),
            kind: None,
        }
    }

    /// A user-defined CRS known only by its kind
    pub fn user_defined(kind: CrsKind) -> Self {
        Self {
            wkt: None,
            epsg: None,
            proj: None,
            kind: Some(kind),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// Web Mercator (EPSG:3857)
    pub fn web_mercator() -> Self {
        Self::from_epsg(3857)
    }

    /// WGS84 / UTM zone (EPSG:326xx north, 327xx south)
    pub fn utm(zone: u32, north: bool) -> Self {
        let base = if north { 32600 } else { 32700 };
        Self::from_epsg(base + zone)
    }

    /// Get EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Classify this CRS as geographic or projected.
    ///
    /// EPSG codes are checked first, then WKT, then PROJ strings, then a
    /// kind stated by the source. A CRS that none of them can classify is an
    /// error rather than a guess.
    pub fn kind(&self) -> Result<CrsKind> {
        if let Some(kind) = self.epsg.and_then(kind_from_epsg) {
            return Ok(kind);
        }
        if let Some(kind) = self.wkt.as_deref().and_then(kind_from_wkt) {
            return Ok(kind);
        }
        if let Some(kind) = self.proj.as_deref().and_then(kind_from_proj) {
            return Ok(kind);
        }
        if let Some(kind) = self.kind {
            return Ok(kind);
        }
        Err(Error::UnclassifiedCrs(self.identifier()))
    }

    /// Get a string identifier for this CRS
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(proj) = &self.proj {
            return proj.clone();
        }
        if let Some(wkt) = &self.wkt {
            let head: String = wkt.chars().take(50).collect();
            return format!("WKT:{}", head);
        }
        match self.kind {
            Some(CrsKind::Geographic) => "user-defined geographic".to_string(),
            Some(CrsKind::Projected) => "user-defined projected".to_string(),
            None => "Unknown".to_string(),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

fn kind_from_epsg(code: u32) -> Option<CrsKind> {
    match code {
        // EPSG reserves 4001-4999 for 2D geographic systems
        4001..=4999 => Some(CrsKind::Geographic),
        // geographic 2D systems registered after that block filled up
        6318 | 6322 | 6783 | 7844 => Some(CrsKind::Geographic),
        // vertical systems have no horizontal kind
        5600..=5799 => None,
        3857 | 3395 | 900913 => Some(CrsKind::Projected),
        2000..=3999 | 5000..=9999 | 20000..=32767 => Some(CrsKind::Projected),
        _ => None,
    }
}

fn kind_from_wkt(wkt: &str) -> Option<CrsKind> {
    let head = wkt.trim_start().to_ascii_uppercase();
    if head.starts_with("PROJCS") || head.starts_with("PROJCRS") || head.starts_with("PROJECTEDCRS") {
        Some(CrsKind::Projected)
    } else if head.starts_with("GEOGCS")
        || head.starts_with("GEOGCRS")
        || head.starts_with("GEOGRAPHICCRS")
    {
        Some(CrsKind::Geographic)
    } else {
        None
    }
}

fn kind_from_proj(proj: &str) -> Option<CrsKind> {
    let proj_name = proj
        .split_whitespace()
        .find_map(|token| token.strip_prefix("+proj="))?;
    match proj_name {
        "longlat" | "latlong" | "lonlat" | "latlon" => Some(CrsKind::Geographic),
        _ => Some(CrsKind::Projected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = CRS::from_epsg(4326);
        assert_eq!(crs.epsg(), Some(4326));
        assert_eq!(crs.identifier(), "EPSG:4326");
    }

    #[test]
    fn test_kind_from_epsg() {
        assert_eq!(CRS::wgs84().kind().unwrap(), CrsKind::Geographic);
        assert_eq!(CRS::from_epsg(32645).kind().unwrap(), CrsKind::Projected);
        assert_eq!(CRS::web_mercator().kind().unwrap(), CrsKind::Projected);
        // CONUS Albers, EASE-Grid 2.0 and Bangladesh TM
        for code in [5070, 6933, 3106] {
            assert_eq!(CRS::from_epsg(code).kind().unwrap(), CrsKind::Projected);
        }
        assert_eq!(CRS::from_epsg(7844).kind().unwrap(), CrsKind::Geographic);
        // EGM96 height
        assert!(CRS::from_epsg(5773).kind().is_err());
    }

    #[test]
    fn test_user_defined_kind() {
        let crs = CRS::user_defined(CrsKind::Projected);
        assert_eq!(crs.kind().unwrap(), CrsKind::Projected);
        assert_eq!(crs.epsg(), None);
        assert_eq!(crs.identifier(), "user-defined projected");
    }

    #[test]
    fn test_kind_from_wkt_and_proj() {
        let wkt = CRS::from_wkt(r#"GEOGCS["WGS 84",DATUM["WGS_1984"]]"#);
        assert_eq!(wkt.kind().unwrap(), CrsKind::Geographic);

        let proj = CRS::from_proj("+proj=utm +zone=45 +datum=WGS84 +units=m");
        assert_eq!(proj.kind().unwrap(), CrsKind::Projected);

        let longlat = CRS::from_proj("+proj=longlat +datum=WGS84");
        assert_eq!(longlat.kind().unwrap(), CrsKind::Geographic);
    }

    #[test]
    fn test_unclassified_crs_is_an_error() {
        let crs = CRS::from_epsg(1);
        assert!(matches!(crs.kind(), Err(Error::UnclassifiedCrs(_))));

        let wkt = CRS::from_wkt("LOCAL_CS[\"engineering\"]");
        assert!(wkt.kind().is_err());
    }
}
