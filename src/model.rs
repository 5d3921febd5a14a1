//! Restaurant records: wire payloads, validation and the stored BSON shape.
//!
//! On the wire a geolocation is `{"longitude": .., "latitude": ..}`; in the
//! store it is a GeoJSON point whose coordinates are `[longitude, latitude]`.

use crate::query::GeoPoint;
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument, doc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Location used for whichever coordinate a payload leaves out.
pub const TOKYO: GeoPoint = GeoPoint::new(139.691706, 35.689487);

/// Every problem found in a payload, as `path: message` lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .issues.join("\n"))]
pub struct ValidationError {
    pub issues: Vec<String>,
}

impl ValidationError {
    fn single(path: &str, message: &str) -> Self {
        Self { issues: vec![format!("{path}: {message}")] }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeolocationPayload {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuPayload {
    pub name: Option<String>,
    pub price: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Body of `POST /restaurants` and `PUT /restaurants/{id}`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestaurantPayload {
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub geolocation: Option<GeolocationPayload>,
    #[serde(default)]
    pub menus: Vec<MenuPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Menu {
    pub name: String,
    pub price: f64,
    pub tags: BTreeSet<String>,
}

/// A validated restaurant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Restaurant {
    pub name: String,
    pub description: String,
    pub tags: BTreeSet<String>,
    pub geolocation: GeoPoint,
    pub menus: Vec<Menu>,
}

/// Response shape: the record plus its id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantView {
    pub id: DocumentId,
    #[serde(flatten)]
    pub restaurant: Restaurant,
}

impl RestaurantPayload {
    /// Applies defaults and checks every field, reporting all problems at once.
    ///
    /// # Errors
    /// `ValidationError` listing each offending field.
    pub fn validate(self) -> Result<Restaurant, ValidationError> {
        let mut issues = Vec::new();

        let name = required_text(self.name, "name", &mut issues);
        let geolocation = validate_geolocation(self.geolocation.unwrap_or_default(), &mut issues);
        let menus = self
            .menus
            .into_iter()
            .enumerate()
            .map(|(i, m)| {
                let path = format!("menus.{i}");
                let name = required_text(m.name, &format!("{path}.name"), &mut issues);
                let price = match m.price {
                    Some(p) if p.is_finite() && p >= 0.0 => p,
                    Some(_) => {
                        issues.push(format!("{path}.price: must be a non-negative number"));
                        0.0
                    }
                    None => {
                        issues.push(format!("{path}.price: Required"));
                        0.0
                    }
                };
                Menu { name, price, tags: m.tags.into_iter().collect() }
            })
            .collect();

        if !issues.is_empty() {
            return Err(ValidationError { issues });
        }
        Ok(Restaurant {
            name,
            description: self.description,
            tags: self.tags.into_iter().collect(),
            geolocation,
            menus,
        })
    }
}

fn required_text(value: Option<String>, path: &str, issues: &mut Vec<String>) -> String {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        Some(_) => {
            issues.push(format!("{path}: must not be blank"));
            String::new()
        }
        None => {
            issues.push(format!("{path}: Required"));
            String::new()
        }
    }
}

fn validate_geolocation(geo: GeolocationPayload, issues: &mut Vec<String>) -> GeoPoint {
    let mut coord = |value: Option<f64>, default: f64, bound: f64, path: &str| match value {
        None => default,
        Some(v) if v.is_finite() && (-bound..=bound).contains(&v) => v,
        Some(v) => {
            issues.push(format!("{path}: {v} is not within [-{bound}, {bound}]"));
            default
        }
    };
    let longitude = coord(geo.longitude, TOKYO.longitude, 180.0, "geolocation.longitude");
    let latitude = coord(geo.latitude, TOKYO.latitude, 90.0, "geolocation.latitude");
    GeoPoint::new(longitude, latitude)
}

fn tags_to_bson(tags: &BTreeSet<String>) -> Bson {
    Bson::Array(tags.iter().cloned().map(Bson::String).collect())
}

fn tags_from_bson(value: Option<&Bson>) -> BTreeSet<String> {
    value
        .and_then(Bson::as_array)
        .map(|items| items.iter().filter_map(Bson::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

impl Restaurant {
    #[must_use]
    pub fn to_bson(&self) -> BsonDocument {
        let menus: Vec<Bson> = self
            .menus
            .iter()
            .map(|m| {
                Bson::Document(doc! {
                    "name": m.name.clone(),
                    "price": m.price,
                    "tags": tags_to_bson(&m.tags),
                })
            })
            .collect();
        doc! {
            "name": self.name.clone(),
            "description": self.description.clone(),
            "tags": tags_to_bson(&self.tags),
            "geolocation": self.geolocation.to_bson(),
            "menus": menus,
        }
    }

    /// Reads a stored body back.
    ///
    /// # Errors
    /// `ValidationError` when the body lacks a name or a readable geolocation.
    pub fn from_bson(data: &BsonDocument) -> Result<Self, ValidationError> {
        let name = data
            .get("name")
            .and_then(Bson::as_str)
            .ok_or_else(|| ValidationError::single("name", "missing in stored record"))?
            .to_string();
        let geolocation = data
            .get("geolocation")
            .and_then(GeoPoint::from_bson)
            .ok_or_else(|| ValidationError::single("geolocation", "missing in stored record"))?;
        let menus = data
            .get("menus")
            .and_then(Bson::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Bson::as_document)
                    .map(|m| Menu {
                        name: m.get("name").and_then(Bson::as_str).unwrap_or_default().to_string(),
                        price: m.get("price").and_then(Bson::as_f64).unwrap_or_default(),
                        tags: tags_from_bson(m.get("tags")),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            name,
            description: data
                .get("description")
                .and_then(Bson::as_str)
                .unwrap_or_default()
                .to_string(),
            tags: tags_from_bson(data.get("tags")),
            geolocation,
            menus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_coordinates_default_to_tokyo() {
        let payload = RestaurantPayload {
            name: Some("Ichiran".into()),
            geolocation: Some(GeolocationPayload { longitude: Some(139.0), latitude: None }),
            ..RestaurantPayload::default()
        };
        let r = payload.validate().unwrap();
        assert_eq!(r.geolocation, GeoPoint::new(139.0, TOKYO.latitude));

        let r = RestaurantPayload { name: Some("x".into()), ..RestaurantPayload::default() }
            .validate()
            .unwrap();
        assert_eq!(r.geolocation, TOKYO);
    }

    #[test]
    fn collects_every_issue() {
        let payload = RestaurantPayload {
            name: Some("  ".into()),
            geolocation: Some(GeolocationPayload { longitude: Some(35.0), latitude: Some(139.0) }),
            menus: vec![MenuPayload { name: None, price: Some(-1.0), tags: vec![] }],
            ..RestaurantPayload::default()
        };
        let err = payload.validate().unwrap_err();
        assert_eq!(err.issues.len(), 4, "{err}");
        assert!(err.issues.iter().any(|i| i.starts_with("geolocation.latitude")));
        assert!(err.issues.iter().any(|i| i.starts_with("menus.0.price")));
    }

    #[test]
    fn stored_shape_roundtrips() {
        let r = RestaurantPayload {
            name: Some("Afuri".into()),
            tags: vec!["ramen".into(), "yuzu".into(), "ramen".into()],
            menus: vec![MenuPayload {
                name: Some("Yuzu shio".into()),
                price: Some(1080.0),
                tags: vec!["shio".into()],
            }],
            ..RestaurantPayload::default()
        }
        .validate()
        .unwrap();
        assert_eq!(r.tags.len(), 2);
        let stored = r.to_bson();
        assert_eq!(
            stored.get("geolocation").and_then(Bson::as_document).and_then(|g| g.get("type")),
            Some(&Bson::String("Point".into()))
        );
        assert_eq!(Restaurant::from_bson(&stored).unwrap(), r);
    }
}
