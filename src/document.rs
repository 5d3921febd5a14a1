use crate::types::{DocumentId, SerializableDateTime};
use bson::Document as BsonDocument;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub created_at: SerializableDateTime,
    pub updated_at: SerializableDateTime,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        let now = SerializableDateTime::now();
        Self { created_at: now.clone(), updated_at: now }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

/// A stored record: its id, the BSON body and bookkeeping timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: BsonDocument,
    pub metadata: Metadata,
}

impl Document {
    #[must_use]
    pub fn new(data: BsonDocument) -> Self {
        Self { id: DocumentId::new(), data, metadata: Metadata::new() }
    }

    /// Replaces the body wholesale, keeping id and `created_at`.
    pub fn update(&mut self, new_data: BsonDocument) {
        self.data = new_data;
        self.metadata.updated_at = SerializableDateTime::now();
    }
}
