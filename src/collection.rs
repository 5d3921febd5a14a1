use crate::document::Document;
use crate::types::{CollectionName, DocumentId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

#[derive(Default)]
struct CollectionState {
    // Keyed by insertion sequence so scans follow natural (insertion) order.
    docs: BTreeMap<u64, Document>,
    positions: HashMap<DocumentId, u64>,
    next_seq: u64,
}

/// In-memory document set of one collection. Durability is the engine's job.
pub struct Collection {
    name: CollectionName,
    state: RwLock<CollectionState>,
}

impl Collection {
    #[must_use]
    pub fn new(name: impl Into<CollectionName>) -> Self {
        Self { name: name.into(), state: RwLock::new(CollectionState::default()) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts, or overwrites in place when the id is already present.
    pub fn put_document(&self, document: Document) {
        let mut st = self.state.write();
        let seq = match st.positions.get(&document.id) {
            Some(seq) => *seq,
            None => {
                let seq = st.next_seq;
                st.next_seq += 1;
                st.positions.insert(document.id, seq);
                seq
            }
        };
        st.docs.insert(seq, document);
    }

    #[must_use]
    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        let st = self.state.read();
        st.positions.get(id).and_then(|seq| st.docs.get(seq)).cloned()
    }

    pub fn delete_document(&self, id: &DocumentId) -> bool {
        let mut st = self.state.write();
        match st.positions.remove(id) {
            Some(seq) => st.docs.remove(&seq).is_some(),
            None => false,
        }
    }

    /// Clones out the documents accepted by `pred`, in insertion order.
    pub fn matching<F>(&self, pred: F) -> Vec<Document>
    where
        F: Fn(&Document) -> bool,
    {
        self.state.read().docs.values().filter(|d| pred(d)).cloned().collect()
    }

    pub fn count_matching<F>(&self, pred: F) -> usize
    where
        F: Fn(&Document) -> bool,
    {
        self.state.read().docs.values().filter(|d| pred(d)).count()
    }

    #[must_use]
    pub fn get_all_documents(&self) -> Vec<Document> {
        self.matching(|_| true)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
