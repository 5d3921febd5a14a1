use bson::{Bson, doc};
use serde::{Deserialize, Serialize};

/// Sphere radius used for `$near`-style distances, in metres.
pub const EARTH_RADIUS_METERS: f64 = 6_378_100.0;

/// A longitude/latitude pair in degrees. Stored as a GeoJSON point whose
/// `coordinates` are `[longitude, latitude]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Great-circle distance in metres (haversine).
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
    }

    #[must_use]
    pub fn to_bson(&self) -> Bson {
        Bson::Document(doc! {
            "type": "Point",
            "coordinates": [self.longitude, self.latitude],
        })
    }

    /// Accepts a GeoJSON point document or a legacy `[lon, lat]` pair.
    #[must_use]
    pub fn from_bson(value: &Bson) -> Option<Self> {
        let coords = match value {
            Bson::Document(d) => match d.get("coordinates") {
                Some(Bson::Array(a)) => a,
                _ => return None,
            },
            Bson::Array(a) => a,
            _ => return None,
        };
        match coords.as_slice() {
            [lon, lat, ..] => Some(Self::new(number(lon)?, number(lat)?)),
            _ => None,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn number(b: &Bson) -> Option<f64> {
    match b {
        Bson::Double(f) => Some(*f),
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        _ => None,
    }
}
