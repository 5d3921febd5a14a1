//! Snakebite: a restaurant and menu REST API over an embedded document store.
//!
//! Records live as BSON documents in the [`engine::Engine`], durable through an
//! append-only WAL. `GET /restaurants` query strings are turned into
//! [`query::Filter`] trees by [`translate::translate`].

pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod http;
pub mod logger;
pub mod model;
pub mod query;
pub mod server;
pub mod service;
pub mod translate;
pub mod types;
pub mod wal;

pub use engine::{Engine, EngineOptions};
pub use errors::DbError;
pub use service::RestaurantService;
