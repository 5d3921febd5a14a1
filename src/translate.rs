//! Listing query-string translation.
//!
//! Turns the flat `?key=value` map of `GET /restaurants` into a [`Filter`] plus
//! a pagination window. Translation is pure: the input map is only read and
//! any malformed value fails the whole request.

use crate::query::{CmpOp, Filter, FindOptions, GeoPoint};
use bson::Bson;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Raw query parameters as received.
pub type QueryParams = BTreeMap<String, String>;

const SUBSTRING_FIELDS: [&str; 3] = ["name", "description", "menus.name"];
const MEMBERSHIP_FIELDS: [&str; 2] = ["tags", "menus.tags"];
const GEO_FIELD: &str = "geolocation";
const PRICE_FIELD: &str = "menus.price";

/// Values used when the request leaves them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryDefaults {
    pub default_limit: usize,
    /// Metres.
    pub default_max_distance: u64,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self { default_limit: 20, default_max_distance: 1000 }
    }
}

/// Half-open index range `[start, end)` over the ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn find_options(&self) -> FindOptions {
        FindOptions { skip: Some(self.start), limit: Some(self.limit()) }
    }
}

/// The translated form of a listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Filter,
    pub window: Window,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Invalid arguments in URL query:\n{0}")]
    InvalidArguments(String),
    #[error("geolocation supplied is invalid: {0}")]
    InvalidGeolocation(String),
    #[error("price range supplied is invalid: {0}")]
    InvalidPriceRange(String),
    #[error("Unknown query parameter: {0}")]
    UnknownParameter(String),
    #[error("Repeated query parameter: {0} (pass several values comma-separated)")]
    RepeatedParameter(String),
}

impl TranslateError {
    #[must_use]
    pub const fn title(&self) -> &'static str {
        "Invalid Value"
    }

    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }
}

/// Collects raw `key=value` pairs, refusing a key given twice so no value is
/// silently dropped.
///
/// # Errors
/// `RepeatedParameter` naming the first key seen more than once.
pub fn collect_params<I>(pairs: I) -> Result<QueryParams, TranslateError>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut params = QueryParams::new();
    for (key, value) in pairs {
        if params.contains_key(&key) {
            return Err(TranslateError::RepeatedParameter(key));
        }
        params.insert(key, value);
    }
    Ok(params)
}

/// Builds the filter and window for a listing request.
///
/// # Errors
/// Any malformed pagination, geolocation or price value, a `maxDistance`
/// without a `geolocation`, or a parameter that names no queryable field.
pub fn translate(params: &QueryParams, defaults: &QueryDefaults) -> Result<ListQuery, TranslateError> {
    let window = parse_window(params, defaults)?;
    let mut clauses = Vec::new();

    for key in params.keys() {
        let known = matches!(key.as_str(), "start" | "limit" | "maxDistance" | "price" | GEO_FIELD)
            || SUBSTRING_FIELDS.contains(&key.as_str())
            || MEMBERSHIP_FIELDS.contains(&key.as_str());
        if !known {
            return Err(TranslateError::UnknownParameter(key.clone()));
        }
    }

    for field in SUBSTRING_FIELDS {
        if let Some(needle) = params.get(field) {
            clauses.push(Filter::Contains { path: field.to_string(), needle: needle.clone() });
        }
    }

    // Set fields match any record whose set holds one of the comma-separated values.
    for field in MEMBERSHIP_FIELDS {
        if let Some(raw) = params.get(field) {
            let mut values: Vec<Bson> = raw
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| Bson::String(v.to_string()))
                .collect();
            let clause = match values.len() {
                0 => {
                    return Err(TranslateError::InvalidArguments(format!(
                        "{field}: no value given in '{raw}'"
                    )));
                }
                1 => Filter::Cmp { path: field.to_string(), op: CmpOp::Eq, value: values.remove(0) },
                _ => Filter::In { path: field.to_string(), values },
            };
            clauses.push(clause);
        }
    }

    match (params.get(GEO_FIELD), params.get("maxDistance")) {
        (Some(raw), max) => {
            let point = parse_geolocation(raw)?;
            let max_distance = match max {
                Some(m) => m
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| {
                        TranslateError::InvalidArguments(format!(
                            "maxDistance: invalid literal '{m}' ({e})"
                        ))
                    })?,
                None => defaults.default_max_distance,
            };
            #[allow(clippy::cast_precision_loss)]
            let max_distance = max_distance as f64;
            clauses.push(Filter::Near { path: GEO_FIELD.to_string(), point, max_distance });
        }
        (None, Some(_)) => {
            return Err(TranslateError::InvalidArguments(
                "maxDistance requires geolocation".to_string(),
            ));
        }
        (None, None) => {}
    }

    if let Some(raw) = params.get("price") {
        let (min, max) = parse_price_range(raw)?;
        if let Some(min) = min {
            clauses.push(Filter::Cmp {
                path: PRICE_FIELD.to_string(),
                op: CmpOp::Gte,
                value: Bson::Double(min),
            });
        }
        if let Some(max) = max {
            clauses.push(Filter::Cmp {
                path: PRICE_FIELD.to_string(),
                op: CmpOp::Lte,
                value: Bson::Double(max),
            });
        }
    }

    Ok(ListQuery { filter: Filter::all(clauses), window })
}

fn parse_window(params: &QueryParams, defaults: &QueryDefaults) -> Result<Window, TranslateError> {
    let int = |key: &str, default: usize| -> Result<usize, TranslateError> {
        match params.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                TranslateError::InvalidArguments(format!("{key}: invalid literal '{raw}' ({e})"))
            }),
        }
    };
    let start = int("start", 0)?;
    let limit = int("limit", defaults.default_limit)?;
    let end = start.checked_add(limit).ok_or_else(|| {
        TranslateError::InvalidArguments(format!("start + limit overflows ({start} + {limit})"))
    })?;
    Ok(Window { start, end })
}

/// Parses `"lon,lat"`. Tokens past the second are ignored and coordinates are
/// taken as given.
///
/// # Errors
/// `InvalidGeolocation` naming the raw value when fewer than two numbers parse.
pub fn parse_geolocation(raw: &str) -> Result<GeoPoint, TranslateError> {
    let invalid = || TranslateError::InvalidGeolocation(raw.to_string());
    let mut tokens = raw.split(',').map(|t| t.trim().parse::<f64>());
    let longitude = tokens.next().ok_or_else(invalid)?.map_err(|_| invalid())?;
    let latitude = tokens.next().ok_or_else(invalid)?.map_err(|_| invalid())?;
    if !longitude.is_finite() || !latitude.is_finite() {
        return Err(invalid());
    }
    Ok(GeoPoint::new(longitude, latitude))
}

/// Parses a price range: `MIN-MAX`, `MIN,MAX`, an open side (`10-`, `-20`) or
/// a single `N` meaning exactly `N`. Bounds may use exponent notation (`1e-3`).
///
/// # Errors
/// `InvalidPriceRange` for non-numeric, negative or non-finite bounds, for
/// a range with both sides empty, and for `min > max`.
pub fn parse_price_range(raw: &str) -> Result<(Option<f64>, Option<f64>), TranslateError> {
    let invalid = |why: &str| TranslateError::InvalidPriceRange(format!("'{raw}' ({why})"));
    let raw_trim = raw.trim();
    let (lo, hi) = match split_range(raw_trim) {
        Some((lo, hi)) => (lo.trim(), hi.trim()),
        None => (raw_trim, raw_trim),
    };
    if lo.is_empty() && hi.is_empty() {
        return Err(invalid("no bounds given"));
    }
    let bound = |s: &str| -> Result<Option<f64>, TranslateError> {
        if s.is_empty() {
            return Ok(None);
        }
        let v = s.parse::<f64>().map_err(|_| invalid("not a number"))?;
        if !v.is_finite() || v < 0.0 {
            return Err(invalid("bounds must be finite and non-negative"));
        }
        Ok(Some(v))
    };
    let (min, max) = (bound(lo)?, bound(hi)?);
    if matches!((min, max), (Some(a), Some(b)) if a > b) {
        return Err(invalid("min is greater than max"));
    }
    Ok((min, max))
}

/// Splits at the comma, else at the last `-` that is not an exponent sign.
fn split_range(s: &str) -> Option<(&str, &str)> {
    if let Some(pair) = s.split_once(',') {
        return Some(pair);
    }
    let bytes = s.as_bytes();
    let at = (0..bytes.len())
        .rev()
        .find(|&i| bytes[i] == b'-' && (i == 0 || !matches!(bytes[i - 1], b'e' | b'E')))?;
    Some((&s[..at], &s[at + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_forms() {
        assert_eq!(parse_price_range("10-20").unwrap(), (Some(10.0), Some(20.0)));
        assert_eq!(parse_price_range("10,20").unwrap(), (Some(10.0), Some(20.0)));
        assert_eq!(parse_price_range("7.5").unwrap(), (Some(7.5), Some(7.5)));
        assert_eq!(parse_price_range("10-").unwrap(), (Some(10.0), None));
        assert_eq!(parse_price_range("-20").unwrap(), (None, Some(20.0)));
        assert_eq!(parse_price_range("1e-3-5").unwrap(), (Some(0.001), Some(5.0)));
        assert_eq!(parse_price_range("1E-3").unwrap(), (Some(0.001), Some(0.001)));
        assert_eq!(parse_price_range("-2.5e1").unwrap(), (None, Some(25.0)));
    }

    #[test]
    fn price_rejects() {
        for raw in ["", "-", "a-b", "20-10", "1-2-3", "inf", "NaN"] {
            assert!(parse_price_range(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn geolocation_uses_first_two_tokens() {
        let p = parse_geolocation("35.0, 139.0, 9").unwrap();
        assert_eq!(p, GeoPoint::new(35.0, 139.0));
        assert!(parse_geolocation("35.0").is_err());
        assert!(parse_geolocation("abc").is_err());
    }
}
