use crate::model::SnapshotDescriptor;

/// Observer hooks fired by the agent as it moves through the backup state
/// machine. All methods have no-op default bodies, following the teacher's
/// `Listener` trait convention (see `pkg/container/src/node/events.rs`) of
/// giving callers an opt-in subset rather than forcing every hook to be
/// implemented.
pub trait BackupEventsListener: Send {
    fn on_backup_query_sent(&mut self, _endpoint: &str) {}

    fn on_backup_response_received(&mut self, _leader_member_id: i32) {}

    fn on_snapshot_retrieve_started(&mut self, _snapshot: &SnapshotDescriptor) {}

    fn on_snapshot_retrieve_progress(&mut self, _snapshot: &SnapshotDescriptor, _position: i64) {}

    fn on_snapshot_retrieve_ended(&mut self, _snapshot: &SnapshotDescriptor) {}

    fn on_live_log_replay_started(&mut self, _recording_id: i64, _start_position: i64) {}

    fn on_live_log_progress(&mut self, _position: i64) {}

    fn on_updated_recording_log(&mut self) {}

    fn on_possible_failure(&mut self, _message: &str) {}

    fn on_reset(&mut self, _reason: &str) {}
}

/// Default listener used when the caller has no observability needs beyond
/// the ambient log output.
pub struct NullEventsListener;

impl BackupEventsListener for NullEventsListener {}
