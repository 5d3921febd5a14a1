use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::geo::GeoPoint;
use super::types::{CmpOp, Filter, MAX_PATH_DEPTH};

#[must_use]
pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Cmp { path, op, value } => {
            resolve_path(doc, path).into_iter().any(|v| cmp_matches(v, *op, value))
        }
        Filter::In { path, values } => resolve_path(doc, path)
            .into_iter()
            .any(|v| values.iter().any(|x| cmp_matches(v, CmpOp::Eq, x))),
        Filter::Contains { path, needle } => {
            let needle = needle.to_lowercase();
            resolve_path(doc, path).into_iter().any(|v| contains_ci(v, &needle))
        }
        Filter::Near { path, point, max_distance } => {
            distance_from(doc, path, point).is_some_and(|d| d <= *max_distance)
        }
    }
}

/// Smallest distance in metres between `point` and any location stored at `path`.
#[must_use]
pub fn distance_from(doc: &BsonDocument, path: &str, point: &GeoPoint) -> Option<f64> {
    resolve_path(doc, path)
        .into_iter()
        .filter_map(GeoPoint::from_bson)
        .map(|p| point.distance_to(&p))
        .min_by(f64::total_cmp)
}

/// Every value reachable by `path`, fanning out over arrays of sub-documents.
fn resolve_path<'a>(doc: &'a BsonDocument, path: &str) -> Vec<&'a Bson> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if path.is_empty() || parts.len() > MAX_PATH_DEPTH {
        return out;
    }
    collect(doc, &parts, &mut out);
    out
}

fn collect<'a>(doc: &'a BsonDocument, parts: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = parts.split_first() else { return };
    let Some(value) = doc.get(*head) else { return };
    if rest.is_empty() {
        out.push(value);
        return;
    }
    match value {
        Bson::Document(d) => collect(d, rest, out),
        Bson::Array(items) => {
            for item in items {
                if let Bson::Document(d) = item {
                    collect(d, rest, out);
                }
            }
        }
        _ => {}
    }
}

fn cmp_matches(v: &Bson, op: CmpOp, value: &Bson) -> bool {
    match v {
        Bson::Array(items) if !matches!(value, Bson::Array(_)) => {
            items.iter().any(|x| cmp_scalar(x, op, value))
        }
        _ => cmp_scalar(v, op, value),
    }
}

fn cmp_scalar(v: &Bson, op: CmpOp, value: &Bson) -> bool {
    if op == CmpOp::Eq {
        return bson_equal(v, value);
    }
    compare_bson(v, value).is_some_and(|o| match op {
        CmpOp::Gt => o == Ordering::Greater,
        CmpOp::Gte => o != Ordering::Less,
        CmpOp::Lt => o == Ordering::Less,
        CmpOp::Lte => o != Ordering::Greater,
        CmpOp::Eq => o == Ordering::Equal,
    })
}

fn contains_ci(v: &Bson, needle_lower: &str) -> bool {
    match v {
        Bson::String(s) => s.to_lowercase().contains(needle_lower),
        Bson::Array(items) => items.iter().any(|x| contains_ci(x, needle_lower)),
        _ => false,
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(b: &Bson) -> Option<f64> {
    match b {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

#[allow(clippy::float_cmp)]
fn bson_equal(a: &Bson, b: &Bson) -> bool {
    match (to_f64(a), to_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering within one type bracket; values of unrelated types never compare.
fn compare_bson(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(af), Some(bf)) = (to_f64(a), to_f64(b)) {
        return af.partial_cmp(&bf);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
