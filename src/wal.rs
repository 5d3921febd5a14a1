use crate::document::Metadata;
use crate::errors::DbError;
use crate::types::{CollectionName, DocumentId};
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};

/// Upper bound on one framed record; anything larger is treated as corruption.
const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

/// WAL operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    Insert,
    Replace,
    Delete,
}

/// One WAL record, bincode-encoded.
/// `value_json` is the document body as JSON bytes (serde_json), so the framing
/// does not depend on how BSON values map onto bincode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalRecord {
    pub op: OpKind,
    pub collection: CollectionName,
    pub id: DocumentId,
    pub value_json: Option<Vec<u8>>,
    pub metadata: Option<Metadata>,
}

/// Frame layout: `len: u32 LE | crc32(payload): u32 LE | payload`.
pub fn write_record<W: Write>(writer: &mut W, rec: &WalRecord) -> Result<(), DbError> {
    let bytes = encode_to_vec(rec, standard())?;
    let len = u32::try_from(bytes.len())
        .map_err(|_| DbError::WalError(format!("record too large: {} bytes", bytes.len())))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&crc32fast::hash(&bytes).to_le_bytes())?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Reads the next record. `Ok(None)` marks a clean end of log.
pub fn read_record<R: Read>(reader: &mut R) -> Result<Option<WalRecord>, DbError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(DbError::Io(e)),
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_RECORD_LEN {
        return Err(DbError::WalError(format!("implausible record length {len}")));
    }
    let mut crc_buf = [0u8; 4];
    reader.read_exact(&mut crc_buf).map_err(|e| truncated(&e))?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(|e| truncated(&e))?;
    if crc32fast::hash(&buf) != u32::from_le_bytes(crc_buf) {
        return Err(DbError::WalError("checksum mismatch".into()));
    }
    let (rec, _) = decode_from_slice::<WalRecord, _>(&buf, standard())?;
    Ok(Some(rec))
}

fn truncated(e: &std::io::Error) -> DbError {
    DbError::WalError(format!("truncated record: {e}"))
}

/// The file underneath a [`WalAppender`].
pub trait LogFile: Write {
    /// Cuts the log back to `len` bytes.
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Appends whole frames to the log.
///
/// `good_len` is the end of the last frame known to be complete. A failed
/// append cuts the file back to it, so a torn frame never sits in front of
/// later acknowledged writes. If that cut fails too the appender refuses
/// every further write until the store is reopened.
pub struct WalAppender<F: LogFile> {
    file: F,
    good_len: u64,
    poisoned: bool,
}

impl<F: LogFile> WalAppender<F> {
    pub const fn new(file: F, good_len: u64) -> Self {
        Self { file, good_len, poisoned: false }
    }

    /// # Errors
    /// The write error, after the log has been rolled back, or `WalError` when
    /// an earlier rollback failed.
    pub fn append(&mut self, rec: &WalRecord) -> Result<(), DbError> {
        if self.poisoned {
            return Err(DbError::WalError(format!(
                "log has an unrecoverable partial frame after byte {}; reopen the store",
                self.good_len
            )));
        }
        let mut frame = Vec::new();
        write_record(&mut frame, rec)?;
        let written = self.file.write_all(&frame).and_then(|()| self.file.flush());
        if let Err(e) = written {
            match self.file.truncate_to(self.good_len) {
                Ok(()) => log::warn!("WAL append failed, rolled back to {} bytes: {e}", self.good_len),
                Err(cut) => {
                    self.poisoned = true;
                    log::error!("WAL append failed ({e}) and rollback failed: {cut}");
                }
            }
            return Err(DbError::Io(e));
        }
        self.good_len += frame.len() as u64;
        Ok(())
    }

    /// # Errors
    /// Returns an error if flushing or syncing fails.
    pub fn sync(&mut self) -> Result<(), DbError> {
        self.file.flush()?;
        self.file.sync()?;
        Ok(())
    }

    #[must_use]
    pub const fn good_len(&self) -> u64 {
        self.good_len
    }

    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(op: OpKind) -> WalRecord {
        WalRecord {
            op,
            collection: "restaurants".into(),
            id: DocumentId::new(),
            value_json: Some(br#"{"name":"Sushi Zen"}"#.to_vec()),
            metadata: Some(Metadata::new()),
        }
    }

    #[test]
    fn reads_back_records_in_order() {
        let mut buf = Vec::new();
        let first = record(OpKind::Insert);
        let second = record(OpKind::Delete);
        write_record(&mut buf, &first).unwrap();
        write_record(&mut buf, &second).unwrap();

        let mut cur = Cursor::new(buf);
        let a = read_record(&mut cur).unwrap().unwrap();
        let b = read_record(&mut cur).unwrap().unwrap();
        assert_eq!(a.id, first.id);
        assert_eq!(a.op, OpKind::Insert);
        assert_eq!(b.id, second.id);
        assert_eq!(b.op, OpKind::Delete);
        assert!(read_record(&mut cur).unwrap().is_none());
    }

    #[test]
    fn flipped_byte_fails_checksum() {
        let mut buf = Vec::new();
        write_record(&mut buf, &record(OpKind::Insert)).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        let err = read_record(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, DbError::WalError(_)));
    }

    /// In-memory log whose next write lands half its bytes and then fails.
    #[derive(Default)]
    struct FlakyLog {
        data: Vec<u8>,
        fail_next_write: bool,
        refuse_truncate: bool,
    }

    impl Write for FlakyLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_next_write {
                self.fail_next_write = false;
                self.data.extend_from_slice(&buf[..buf.len() / 2]);
                return Err(io::Error::other("disk full"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogFile for FlakyLog {
        fn truncate_to(&mut self, len: u64) -> io::Result<()> {
            if self.refuse_truncate {
                return Err(io::Error::other("read-only"));
            }
            self.data.truncate(len as usize);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_append_is_rolled_back_before_the_next_write() {
        let (a, b, c) = (record(OpKind::Insert), record(OpKind::Insert), record(OpKind::Insert));
        let mut log = WalAppender::new(FlakyLog::default(), 0);
        log.append(&a).unwrap();
        let after_a = log.good_len();

        log.file.fail_next_write = true;
        assert!(log.append(&b).is_err());
        assert_eq!(log.good_len(), after_a);
        assert_eq!(log.file.data.len() as u64, after_a);
        log.append(&c).unwrap();

        let mut cur = Cursor::new(log.file.data);
        assert_eq!(read_record(&mut cur).unwrap().unwrap().id, a.id);
        assert_eq!(read_record(&mut cur).unwrap().unwrap().id, c.id);
        assert!(read_record(&mut cur).unwrap().is_none());
    }

    #[test]
    fn failed_rollback_refuses_later_writes() {
        let log_file = FlakyLog { fail_next_write: true, refuse_truncate: true, ..FlakyLog::default() };
        let mut log = WalAppender::new(log_file, 0);
        assert!(matches!(log.append(&record(OpKind::Insert)), Err(DbError::Io(_))));
        assert!(log.is_poisoned());
        assert!(matches!(log.append(&record(OpKind::Insert)), Err(DbError::WalError(_))));
    }

    #[test]
    fn torn_tail_is_an_error_not_a_panic() {
        let mut buf = Vec::new();
        write_record(&mut buf, &record(OpKind::Replace)).unwrap();
        buf.truncate(buf.len() - 3);
        assert!(read_record(&mut Cursor::new(buf)).is_err());
    }
}
