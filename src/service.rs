use crate::document::Document;
use crate::engine::Engine;
use crate::errors::DbError;
use crate::logger::AUDIT_TARGET as AUDIT;
use crate::model::{Restaurant, RestaurantPayload, RestaurantView, ValidationError};
use crate::translate::{QueryDefaults, QueryParams, TranslateError, translate};
use crate::types::DocumentId;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub const RESTAURANTS: &str = "restaurants";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Query(#[from] TranslateError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Malformed or unknown id.
    #[error("Invalid ID provided. {0}")]
    InvalidId(String),

    #[error("storage failure: {0}")]
    Storage(DbError),

    #[error("stored record {id} is unreadable: {source}")]
    Corrupt { id: DocumentId, source: ValidationError },
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NoSuchDocument(_) | DbError::InvalidDocumentId(_) => Self::InvalidId(e.to_string()),
            other => Self::Storage(other),
        }
    }
}

/// One page of a listing; `count` is the size of this page.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub items: Vec<RestaurantView>,
    pub count: usize,
}

/// Restaurant operations over the shared store.
#[derive(Debug, Clone)]
pub struct RestaurantService {
    engine: Arc<Engine>,
    defaults: QueryDefaults,
}

impl RestaurantService {
    #[must_use]
    pub fn new(engine: Arc<Engine>, defaults: QueryDefaults) -> Self {
        Self { engine, defaults }
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// # Errors
    /// Bad query parameters, or an unreadable stored record.
    pub fn list(&self, params: &QueryParams) -> Result<Listing, ServiceError> {
        let query = translate(params, &self.defaults)?;
        let docs = self.engine.find(RESTAURANTS, &query.filter, &query.window.find_options());
        let items = docs.iter().map(view).collect::<Result<Vec<_>, _>>()?;
        Ok(Listing { count: items.len(), items })
    }

    /// # Errors
    /// Validation failure or a storage error.
    pub fn create(&self, payload: RestaurantPayload) -> Result<RestaurantView, ServiceError> {
        let restaurant = payload.validate()?;
        let stored = self.engine.insert(RESTAURANTS, restaurant.to_bson())?;
        log::info!(target: AUDIT, "create {RESTAURANTS}/{} name={:?}", stored.id, restaurant.name);
        view(&self.engine.get(RESTAURANTS, &stored.id)?)
    }

    /// # Errors
    /// Malformed or unknown id.
    pub fn get(&self, id: &str) -> Result<RestaurantView, ServiceError> {
        let id = parse_id(id)?;
        view(&self.engine.get(RESTAURANTS, &id)?)
    }

    /// Replaces every field, menus included.
    ///
    /// # Errors
    /// Malformed or unknown id, validation failure, or a storage error.
    pub fn replace(&self, id: &str, payload: RestaurantPayload) -> Result<RestaurantView, ServiceError> {
        let id = parse_id(id)?;
        let restaurant = payload.validate()?;
        self.engine.replace(RESTAURANTS, &id, restaurant.to_bson())?;
        log::info!(target: AUDIT, "replace {RESTAURANTS}/{id} name={:?}", restaurant.name);
        view(&self.engine.get(RESTAURANTS, &id)?)
    }

    /// # Errors
    /// Malformed or unknown id, or a storage error.
    pub fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let id = parse_id(id)?;
        self.engine.delete(RESTAURANTS, &id)?;
        log::info!(target: AUDIT, "delete {RESTAURANTS}/{id}");
        Ok(())
    }
}

fn parse_id(raw: &str) -> Result<DocumentId, ServiceError> {
    raw.parse::<DocumentId>().map_err(ServiceError::from)
}

fn view(doc: &Document) -> Result<RestaurantView, ServiceError> {
    let restaurant =
        Restaurant::from_bson(&doc.data).map_err(|source| ServiceError::Corrupt { id: doc.id, source })?;
    Ok(RestaurantView { id: doc.id, restaurant })
}
