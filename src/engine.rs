use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::query::{self, Filter, FindOptions};
use crate::types::{CollectionName, DocumentId};
use crate::wal::{OpKind, WalAppender, WalRecord, read_record, write_record};
use bson::Document as BsonDocument;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const WAL_FILE: &str = "wal.bin";
const WAL_COMPACTING_FILE: &str = "wal.compacting.bin";

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Directory holding `wal.bin`. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
}

/// The embedded document store.
///
/// Every write is appended to the WAL before it is applied in memory. The WAL
/// mutex is held across the read-modify-apply of a write, so single-record
/// writes are atomic with respect to each other. A write whose append fails
/// leaves neither memory nor the log changed.
pub struct Engine {
    options: EngineOptions,
    collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
    wal_writer: Mutex<Option<WalAppender<File>>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("collections", &self.list_collection_names())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Open (or create) a store. With a data directory the WAL is replayed to
    /// rebuild in-memory state before new writes are appended.
    ///
    /// # Errors
    /// Returns an error if the directory or WAL file cannot be created or opened.
    pub fn open(options: EngineOptions) -> Result<Self, DbError> {
        let Some(dir) = options.data_dir.clone() else {
            return Ok(Self::in_memory());
        };
        fs::create_dir_all(&dir)?;
        let wal_path = dir.join(WAL_FILE);
        if !wal_path.exists() {
            File::create(&wal_path)?;
        }

        let (state, good_len) = Self::load_state_from_wal(&wal_path)?;
        let wal_file = OpenOptions::new().append(true).open(&wal_path)?;
        let on_disk = wal_file.metadata()?.len();
        if on_disk > good_len {
            log::warn!("dropping {} bytes of torn WAL tail", on_disk - good_len);
            wal_file.set_len(good_len)?;
        }
        log::info!(
            "opened store at {} ({} collections)",
            dir.display(),
            state.len()
        );

        Ok(Self {
            options,
            collections: RwLock::new(state),
            wal_writer: Mutex::new(Some(WalAppender::new(wal_file, good_len))),
        })
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            options: EngineOptions::default(),
            collections: RwLock::new(HashMap::new()),
            wal_writer: Mutex::new(None),
        }
    }

    /// Returns the named collection, creating it on first use.
    pub fn collection(&self, name: &str) -> Arc<Collection> {
        if let Some(col) = self.collections.read().get(name) {
            return col.clone();
        }
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name)))
            .clone()
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Stores `data` under a fresh id.
    ///
    /// # Errors
    /// Returns an error if the WAL append fails; nothing is applied in that case.
    pub fn insert(&self, collection: &str, data: BsonDocument) -> Result<Document, DbError> {
        let col = self.collection(collection);
        let document = Document::new(data);
        let mut wal = self.wal_writer.lock();
        Self::append_wal(&mut wal, &record(OpKind::Insert, collection, &document)?)?;
        col.put_document(document.clone());
        Ok(document)
    }

    /// Replaces the body of an existing document, keeping its id, position and
    /// `created_at`.
    ///
    /// # Errors
    /// `NoSuchDocument` when the id is absent, or a WAL failure.
    pub fn replace(
        &self,
        collection: &str,
        id: &DocumentId,
        data: BsonDocument,
    ) -> Result<Document, DbError> {
        let col = self.collection(collection);
        let mut wal = self.wal_writer.lock();
        let mut document =
            col.find_document(id).ok_or_else(|| DbError::NoSuchDocument(id.to_string()))?;
        document.update(data);
        Self::append_wal(&mut wal, &record(OpKind::Replace, collection, &document)?)?;
        col.put_document(document.clone());
        Ok(document)
    }

    /// # Errors
    /// `NoSuchDocument` when the id is absent, or a WAL failure.
    pub fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), DbError> {
        let col = self.collection(collection);
        let mut wal = self.wal_writer.lock();
        if col.find_document(id).is_none() {
            return Err(DbError::NoSuchDocument(id.to_string()));
        }
        let rec = WalRecord {
            op: OpKind::Delete,
            collection: collection.to_string(),
            id: *id,
            value_json: None,
            metadata: None,
        };
        Self::append_wal(&mut wal, &rec)?;
        col.delete_document(id);
        Ok(())
    }

    /// # Errors
    /// `NoSuchDocument` when the id is absent.
    pub fn get(&self, collection: &str, id: &DocumentId) -> Result<Document, DbError> {
        self.collection(collection)
            .find_document(id)
            .ok_or_else(|| DbError::NoSuchDocument(id.to_string()))
    }

    pub fn find(&self, collection: &str, filter: &Filter, opts: &FindOptions) -> Vec<Document> {
        query::find_docs(&self.collection(collection), filter, opts)
    }

    pub fn count(&self, collection: &str, filter: &Filter) -> usize {
        query::count_docs(&self.collection(collection), filter)
    }

    /// Flush WAL to disk (fsync). No-op in memory.
    ///
    /// # Errors
    /// Returns an error if flushing or syncing the file fails.
    pub fn flush(&self) -> Result<(), DbError> {
        if let Some(w) = self.wal_writer.lock().as_mut() {
            w.sync()?;
        }
        Ok(())
    }

    /// WAL compaction: rewrite the log to one insert per live document.
    /// Returns the number of records in the new log.
    ///
    /// # Errors
    /// Returns an error if the replacement log cannot be written or swapped in.
    pub fn compact(&self) -> Result<usize, DbError> {
        let Some(dir) = self.options.data_dir.as_deref() else {
            return Ok(0);
        };
        let mut wal = self.wal_writer.lock();
        let tmp_path = dir.join(WAL_COMPACTING_FILE);
        let mut written = 0usize;
        {
            let tmp = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp_path)?;
            let mut writer = BufWriter::new(tmp);
            let cols: Vec<Arc<Collection>> = self.collections.read().values().cloned().collect();
            for col in cols {
                for document in col.get_all_documents() {
                    write_record(&mut writer, &record(OpKind::Insert, col.name(), &document)?)?;
                    written += 1;
                }
            }
            writer.flush()?;
            writer.get_mut().sync_all()?;
        }

        let wal_path = dir.join(WAL_FILE);
        fs::rename(&tmp_path, &wal_path)?;
        let file = OpenOptions::new().append(true).open(&wal_path)?;
        let len = file.metadata()?.len();
        *wal = Some(WalAppender::new(file, len));
        log::info!("compacted WAL to {written} records");
        Ok(written)
    }

    fn append_wal(wal: &mut Option<WalAppender<File>>, rec: &WalRecord) -> Result<(), DbError> {
        match wal.as_mut() {
            Some(w) => w.append(rec),
            None => Ok(()),
        }
    }

    /// Replays the WAL into a fresh map and returns it with the offset just
    /// past the last intact record. A corrupt or torn tail ends the replay.
    fn load_state_from_wal(
        path: &Path,
    ) -> Result<(HashMap<CollectionName, Arc<Collection>>, u64), DbError> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut map: HashMap<CollectionName, Arc<Collection>> = HashMap::new();
        let mut applied = 0usize;
        let mut good_len = 0u64;
        loop {
            let rec = match read_record(&mut reader) {
                Ok(Some(rec)) => {
                    good_len = reader.stream_position()?;
                    rec
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("stopping WAL replay after {applied} records: {e}");
                    break;
                }
            };
            let col = map
                .entry(rec.collection.clone())
                .or_insert_with(|| Arc::new(Collection::new(rec.collection.clone())));
            match rec.op {
                OpKind::Insert | OpKind::Replace => {
                    let Some(bytes) = rec.value_json else { continue };
                    let data: BsonDocument = serde_json::from_slice(&bytes)?;
                    col.put_document(Document {
                        id: rec.id,
                        data,
                        metadata: rec.metadata.unwrap_or_default(),
                    });
                }
                OpKind::Delete => {
                    col.delete_document(&rec.id);
                }
            }
            applied += 1;
        }
        Ok((map, good_len))
    }
}

fn record(op: OpKind, collection: &str, document: &Document) -> Result<WalRecord, DbError> {
    Ok(WalRecord {
        op,
        collection: collection.to_string(),
        id: document.id,
        value_json: Some(serde_json::to_vec(&document.data)?),
        metadata: Some(document.metadata.clone()),
    })
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::error!("failed to flush WAL on shutdown: {e}");
        }
    }
}
