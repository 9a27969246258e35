use std::{io::SeekFrom, path::Path, path::PathBuf};

use log::debug;

use crate::{
    error::DbError,
    io::{ByteWriter, DbFile},
    transaction::Transaction,
    types::DbResult,
};

/// see:
/// https://users.rust-lang.org/t/mapping-enum-u8/23400
#[derive(Debug, PartialEq, Clone, Copy)]
enum RecordType {
    Abort,
    Commit,
    Update,
    Start,
}

impl RecordType {
    fn to_u8(self) -> u8 {
        match self {
            RecordType::Abort => 0,
            RecordType::Commit => 1,
            RecordType::Update => 2,
            RecordType::Start => 3,
        }
    }
}

/// Append-only recovery log.
///
/// The storage core only appends: a start record when a transaction
/// begins, an update record (before and after page images) for every
/// page flushed at commit, and a commit/abort record at the end.
/// Replaying the log is someone else's job.
pub struct LogManager {
    file: DbFile,

    file_path: PathBuf,

    total_records: usize,
}

impl LogManager {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self, DbError> {
        let file = DbFile::new(&file_path)?;
        Ok(Self {
            file,
            file_path: file_path.as_ref().to_path_buf(),
            total_records: 0,
        })
    }

    pub fn log_start(&mut self, tx: &Transaction) -> DbResult {
        self.append(RecordType::Start, tx, None)
    }

    pub fn log_commit(&mut self, tx: &Transaction) -> DbResult {
        self.append(RecordType::Commit, tx, None)
    }

    pub fn log_abort(&mut self, tx: &Transaction) -> DbResult {
        self.append(RecordType::Abort, tx, None)
    }

    /// Append the before/after images of one page write.
    pub fn log_write(
        &mut self,
        tx: &Transaction,
        before_page: &[u8],
        after_page: &[u8],
    ) -> DbResult {
        self.append(RecordType::Update, tx, Some((before_page, after_page)))
    }

    fn append(
        &mut self,
        record_type: RecordType,
        tx: &Transaction,
        images: Option<(&[u8], &[u8])>,
    ) -> DbResult {
        let mut writer = ByteWriter::new();
        writer.write(&record_type.to_u8());
        writer.write(&tx.get_id());

        if let Some((before, after)) = images {
            writer.write(&(before.len() as u32));
            writer.write_bytes(before);
            writer.write(&(after.len() as u32));
            writer.write_bytes(after);
        }

        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&writer.to_bytes())?;
        self.file.flush()?;

        self.total_records += 1;
        debug!(
            "appended {:?} record for {}, {} records in total",
            record_type, tx, self.total_records
        );
        Ok(())
    }

    pub fn records_count(&self) -> usize {
        self.total_records
    }

    pub fn get_file_path(&self) -> PathBuf {
        self.file_path.clone()
    }

    /// Truncate the log, used by tests.
    pub fn reset(&mut self) -> DbResult {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.total_records = 0;
        Ok(())
    }
}
