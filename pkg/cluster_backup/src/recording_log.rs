use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use common::errors::*;

use crate::model::{RecordingLogEntry, RecordingLogEntryType};

const TAG_TERM: u8 = 0;
const TAG_SNAPSHOT: u8 = 1;

/// Append-only durable index of terms and snapshots.
///
/// The on-disk format is a sequence of length-prefixed frames
/// (`u32` length, little-endian, followed by that many payload bytes). Each
/// payload is a fixed-layout record: one tag byte followed by five `i64`
/// fields and one `i32` field, all little-endian. The file is never
/// truncated or rewritten: `append_term`/`append_snapshot` only ever append
/// a new frame, and the whole file is replayed once at `open` time to
/// rebuild the in-memory index.
///
/// This plays the role of the teacher's `sstable::record_log` length-prefixed
/// append-only record file (see `pkg/container/src/runtime/logging.rs`), with
/// a fixed binary record instead of an opaque blob.
pub struct RecordingLog {
    path: PathBuf,
    file: std::fs::File,
    entries: Vec<RecordingLogEntry>,
}

const RECORD_LEN: usize = 1 + 8 * 5 + 4;

impl RecordingLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        let mut entries = Vec::new();
        let mut offset = 0usize;
        while offset + 4 <= buf.len() {
            let len = u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap()) as usize;
            offset += 4;
            if offset + len > buf.len() {
                return Err(err_msg("recording log truncated mid-record"));
            }
            let record = &buf[offset..offset + len];
            entries.push(Self::decode_record(record, entries.len())?);
            offset += len;
        }

        Ok(Self {
            path,
            file,
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode_record(record: &[u8], entry_index: usize) -> Result<RecordingLogEntry> {
        if record.len() != RECORD_LEN {
            return Err(err_msg("malformed recording log record"));
        }
        let tag = record[0];
        let mut i = 1;
        let mut next_i64 = || {
            let v = i64::from_le_bytes(record[i..i + 8].try_into().unwrap());
            i += 8;
            v
        };
        let recording_id = next_i64();
        let leadership_term_id = next_i64();
        let term_base_log_position = next_i64();
        let log_position = next_i64();
        let timestamp_ms = next_i64();
        let service_id = i32::from_le_bytes(record[i..i + 4].try_into().unwrap());

        let entry_type = match tag {
            TAG_TERM => RecordingLogEntryType::Term,
            TAG_SNAPSHOT => RecordingLogEntryType::Snapshot,
            _ => return Err(err_msg("unknown recording log record tag")),
        };

        Ok(RecordingLogEntry {
            entry_type,
            recording_id,
            leadership_term_id,
            term_base_log_position,
            log_position,
            timestamp_ms,
            service_id,
            entry_index,
        })
    }

    fn encode_record(entry: &RecordingLogEntry) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_LEN);
        out.push(match entry.entry_type {
            RecordingLogEntryType::Term => TAG_TERM,
            RecordingLogEntryType::Snapshot => TAG_SNAPSHOT,
        });
        out.extend_from_slice(&entry.recording_id.to_le_bytes());
        out.extend_from_slice(&entry.leadership_term_id.to_le_bytes());
        out.extend_from_slice(&entry.term_base_log_position.to_le_bytes());
        out.extend_from_slice(&entry.log_position.to_le_bytes());
        out.extend_from_slice(&entry.timestamp_ms.to_le_bytes());
        out.extend_from_slice(&entry.service_id.to_le_bytes());
        out
    }

    fn append(&mut self, entry: RecordingLogEntry) -> Result<()> {
        let record = Self::encode_record(&entry);
        self.file.write_all(&(record.len() as u32).to_le_bytes())?;
        self.file.write_all(&record)?;
        self.file.flush()?;
        self.entries.push(entry);
        Ok(())
    }

    pub fn append_term(
        &mut self,
        recording_id: i64,
        leadership_term_id: i64,
        term_base_log_position: i64,
        log_position: i64,
        timestamp_ms: i64,
    ) -> Result<()> {
        let entry_index = self.entries.len();
        self.append(RecordingLogEntry::new_term(
            recording_id,
            leadership_term_id,
            term_base_log_position,
            log_position,
            timestamp_ms,
            entry_index,
        ))
    }

    pub fn append_snapshot(
        &mut self,
        recording_id: i64,
        leadership_term_id: i64,
        term_base_log_position: i64,
        log_position: i64,
        timestamp_ms: i64,
        service_id: i32,
    ) -> Result<()> {
        let entry_index = self.entries.len();
        self.append(RecordingLogEntry::new_snapshot(
            recording_id,
            leadership_term_id,
            term_base_log_position,
            log_position,
            timestamp_ms,
            service_id,
            entry_index,
        ))
    }

    /// Returns the term entry with the greatest `leadership_term_id`, if any.
    pub fn find_last_term(&self) -> Option<&RecordingLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.entry_type == RecordingLogEntryType::Term)
            .max_by_key(|e| e.leadership_term_id)
    }

    /// Returns the most recently appended snapshot for `service_id`, if any.
    pub fn get_latest_snapshot(&self, service_id: i32) -> Option<&RecordingLogEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.entry_type == RecordingLogEntryType::Snapshot && e.service_id == service_id)
    }

    /// A leadership term id is "unknown" if no term entry carries it.
    pub fn is_unknown_term(&self, leadership_term_id: i64) -> bool {
        !self
            .entries
            .iter()
            .any(|e| e.entry_type == RecordingLogEntryType::Term && e.leadership_term_id == leadership_term_id)
    }

    pub fn entries(&self) -> &[RecordingLogEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::NULL_POSITION;

    fn temp_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "cluster_backup_recording_log_test_{}_{}",
            std::process::id(),
            name
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("recording.log")
    }

    #[test]
    fn append_and_reopen_round_trips() {
        let path = temp_path("round_trip");
        {
            let mut log = RecordingLog::open(&path).unwrap();
            log.append_term(101, 3, 0, NULL_POSITION, 1000).unwrap();
            log.append_snapshot(100, 3, 0, 4096, 1000, -1).unwrap();
        }

        let log = RecordingLog::open(&path).unwrap();
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.find_last_term().unwrap().leadership_term_id, 3);
        assert_eq!(log.get_latest_snapshot(-1).unwrap().log_position, 4096);
        assert!(!log.is_unknown_term(3));
        assert!(log.is_unknown_term(4));

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn latest_snapshot_per_service_is_independent() {
        let path = temp_path("per_service");
        let mut log = RecordingLog::open(&path).unwrap();
        log.append_snapshot(1, 1, 0, 10, 0, -1).unwrap();
        log.append_snapshot(2, 1, 0, 20, 0, 0).unwrap();
        log.append_snapshot(3, 2, 0, 30, 0, -1).unwrap();

        assert_eq!(log.get_latest_snapshot(-1).unwrap().log_position, 30);
        assert_eq!(log.get_latest_snapshot(0).unwrap().log_position, 20);
        assert!(log.get_latest_snapshot(1).is_none());

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn never_truncates_history() {
        let path = temp_path("append_only");
        let mut log = RecordingLog::open(&path).unwrap();
        log.append_term(1, 1, 0, NULL_POSITION, 0).unwrap();
        drop(log);

        let mut log = RecordingLog::open(&path).unwrap();
        assert_eq!(log.entries().len(), 1);
        log.append_term(2, 2, 100, NULL_POSITION, 0).unwrap();
        assert_eq!(log.entries().len(), 2);
        assert_eq!(log.entries()[0].leadership_term_id, 1);

        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
