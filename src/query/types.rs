use bson::Bson;

use super::geo::GeoPoint;

// Safety limit on dotted-path length
pub(crate) const MAX_PATH_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Filter tree evaluated against stored BSON bodies.
///
/// Paths are dotted (`menus.price`). A path step that lands on an array of
/// sub-documents fans out over its elements, and a terminal array matches when
/// any element does, so `tags = "ramen"` selects records whose tag set holds
/// `"ramen"`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Cmp { path: String, op: CmpOp, value: Bson },
    /// Equal to any of `values`; an empty list matches nothing.
    In { path: String, values: Vec<Bson> },
    /// Case-insensitive substring match on string values.
    Contains { path: String, needle: String },
    /// Within `max_distance` metres of `point`; results are ordered nearest-first.
    Near { path: String, point: GeoPoint, max_distance: f64 },
}

impl Filter {
    /// Conjunction that collapses the trivial cases.
    #[must_use]
    pub fn all(mut filters: Vec<Self>) -> Self {
        match filters.len() {
            0 => Self::True,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// The first proximity clause in the tree, if any.
    #[must_use]
    pub fn near_clause(&self) -> Option<(&str, GeoPoint)> {
        match self {
            Self::Near { path, point, .. } => Some((path.as_str(), *point)),
            Self::And(fs) => fs.iter().find_map(Self::near_clause),
            _ => None,
        }
    }
}

/// Options for `find_docs`. Results are sliced by `skip`/`limit` after ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}
