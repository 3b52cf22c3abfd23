use std::fmt::Display;

use serde::Deserialize;

/// Deezer track id, as found at the end of a `music:song` metadata URL.
///
/// Kept as the literal digit string so it can be compared with host state
/// ids (`SNG_ID`) without a round trip through an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Track record as returned by `GET /track/{id}`.
///
/// Every field is optional on the wire. Deezer answers unknown ids with an
/// `{"error": {...}}` body, which decodes to a record without a position and
/// therefore never correlates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteTrack {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub track_position: Option<u32>,
    #[serde(default)]
    pub disk_number: Option<u32>,
    #[serde(default)]
    pub available_countries: Vec<String>,
}

impl RemoteTrack {
    /// Position in the visible track list. Records without a disk number are
    /// treated as single-disk albums.
    pub fn coordinate(&self) -> Option<Coordinate> {
        self.track_position
            .map(|position| Coordinate::new(self.disk_number.unwrap_or(1), position))
    }

    /// Exact match against the API's upper-case ISO codes.
    pub fn is_available_in(&self, country: &str) -> bool {
        self.available_countries.iter().any(|c| c == country)
    }
}

/// `(disk, position)` of a row in the track list, both starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coordinate {
    pub disk: u32,
    pub position: u32,
}

impl Coordinate {
    pub fn new(disk: u32, position: u32) -> Self {
        Self { disk, position }
    }

    /// Composite lookup key, `"disk.position"`.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.disk, self.position)
    }
}
