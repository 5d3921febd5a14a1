// Submodules for separation of concerns
mod eval;
mod exec;
mod geo;
mod types;

pub use eval::{distance_from, eval_filter};
pub use exec::{count_docs, find_docs};
pub use geo::{EARTH_RADIUS_METERS, GeoPoint};
pub use types::{CmpOp, Filter, FindOptions};
