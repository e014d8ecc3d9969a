use crate::model::SnapshotDescriptor;

/// Ordinal published via the state counter. Must track `BackupState`'s
/// variant order exactly (spec §8 invariant 2: "the state counter and the
/// internal state are always equal after each doWork").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum StateOrdinal {
    Init = 0,
    BackupQuery = 1,
    SnapshotLengthRetrieve = 2,
    SnapshotRetrieve = 3,
    LiveLogReplay = 4,
    UpdateRecordingLog = 5,
    BackingUp = 6,
    ResetBackup = 7,
}

/// A snapshot the agent still needs to retrieve from the leader's archive,
/// paired with the stop position once it becomes known.
#[derive(Debug, Clone)]
pub struct PendingSnapshot {
    pub descriptor: SnapshotDescriptor,
    pub expected_stop_position: Option<i64>,
}

/// Once retrieved, the snapshot's leader-side metadata plus the id it was
/// recorded under locally.
#[derive(Debug, Clone)]
pub struct RetrievedSnapshot {
    pub descriptor: SnapshotDescriptor,
    pub local_recording_id: i64,
}

/// A term entry decided during `BACKUP_QUERY`'s response handling but not
/// yet appended to the durable recording log (that only happens in
/// `UPDATE_RECORDING_LOG`, once the local recording id it maps to is
/// known).
#[derive(Debug, Clone, Copy)]
pub struct PendingTermEntry {
    pub leadership_term_id: i64,
    pub term_base_log_position: i64,
    pub timestamp_ms: i64,
}

/// Per-cycle in-flight data accumulated across a full `BACKUP_QUERY →
/// BACKING_UP` pass, carried along regardless of which state is currently
/// active so that `UPDATE_RECORDING_LOG` can see what `BACKUP_QUERY`
/// decided.
#[derive(Debug, Clone, Default)]
pub struct PendingExchange {
    pub leader_log_entry: Option<PendingTermEntry>,
    pub leader_last_term_entry: Option<PendingTermEntry>,
    pub leader_commit_position_counter_id: Option<i32>,
    pub snapshots_to_retrieve: Vec<PendingSnapshot>,
    pub snapshots_retrieved: Vec<RetrievedSnapshot>,
}

impl PendingExchange {
    pub fn clear(&mut self) {
        *self = PendingExchange::default();
    }
}

/// The seven-state backup automaton, carrying per-variant in-flight data
/// (spec §9: "the natural representation is a tagged-union state with
/// per-variant data carrying in-flight correlation ids and cursors").
#[derive(Debug, Clone)]
pub enum BackupState {
    Init,

    BackupQuery {
        correlation_id: Option<i64>,
    },

    SnapshotLengthRetrieve {
        cursor: usize,
        correlation_id: Option<i64>,
    },

    SnapshotRetrieve {
        cursor: usize,
    },

    LiveLogReplay,

    UpdateRecordingLog,

    BackingUp,

    ResetBackup {
        cool_down_deadline_ms: Option<i64>,
    },
}

impl BackupState {
    pub fn ordinal(&self) -> StateOrdinal {
        match self {
            BackupState::Init => StateOrdinal::Init,
            BackupState::BackupQuery { .. } => StateOrdinal::BackupQuery,
            BackupState::SnapshotLengthRetrieve { .. } => StateOrdinal::SnapshotLengthRetrieve,
            BackupState::SnapshotRetrieve { .. } => StateOrdinal::SnapshotRetrieve,
            BackupState::LiveLogReplay => StateOrdinal::LiveLogReplay,
            BackupState::UpdateRecordingLog => StateOrdinal::UpdateRecordingLog,
            BackupState::BackingUp => StateOrdinal::BackingUp,
            BackupState::ResetBackup { .. } => StateOrdinal::ResetBackup,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BackupState::Init => "INIT",
            BackupState::BackupQuery { .. } => "BACKUP_QUERY",
            BackupState::SnapshotLengthRetrieve { .. } => "SNAPSHOT_LENGTH_RETRIEVE",
            BackupState::SnapshotRetrieve { .. } => "SNAPSHOT_RETRIEVE",
            BackupState::LiveLogReplay => "LIVE_LOG_REPLAY",
            BackupState::UpdateRecordingLog => "UPDATE_RECORDING_LOG",
            BackupState::BackingUp => "BACKING_UP",
            BackupState::ResetBackup { .. } => "RESET_BACKUP",
        }
    }
}
