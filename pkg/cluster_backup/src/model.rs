/// `service_id` used for the consensus module's own snapshot, as opposed to a
/// non-negative id identifying a state-machine service.
pub const CONSENSUS_MODULE_SERVICE_ID: i32 = -1;

/// A member of the cluster being backed up, as parsed out of a
/// `BackupResponse`'s cluster-members string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterMember {
    pub id: i32,
    pub consensus_endpoint: String,
    pub archive_endpoint: String,
}

impl ClusterMember {
    /// Parses `"id|consensusEndpoint|archiveEndpoint;id|consensusEndpoint|archiveEndpoint;..."`.
    pub fn parse_list(raw: &str) -> common::errors::Result<Vec<ClusterMember>> {
        let mut out = Vec::new();
        for entry in raw.split(';').filter(|s| !s.is_empty()) {
            let parts: Vec<&str> = entry.split('|').collect();
            if parts.len() != 3 {
                return Err(common::errors::err_msg(format!(
                    "malformed cluster member entry: {}",
                    entry
                )));
            }
            let id: i32 = parts[0]
                .parse()
                .map_err(|_| common::errors::err_msg("malformed cluster member id"))?;
            out.push(ClusterMember {
                id,
                consensus_endpoint: parts[1].to_string(),
                archive_endpoint: parts[2].to_string(),
            });
        }
        Ok(out)
    }

    pub fn find<'a>(members: &'a [ClusterMember], id: i32) -> Option<&'a ClusterMember> {
        members.iter().find(|m| m.id == id)
    }
}

/// A snapshot descriptor as carried in a `BackupResponse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotDescriptor {
    pub recording_id: i64,
    pub leadership_term_id: i64,
    pub term_base_log_position: i64,
    pub log_position: i64,
    pub service_id: i32,
}

/// The response to a `BackupQuery`.
#[derive(Debug, Clone)]
pub struct BackupResponse {
    pub correlation_id: i64,
    pub log_recording_id: i64,
    pub log_leadership_term_id: i64,
    pub log_term_base_log_position: i64,
    pub last_leadership_term_id: i64,
    pub last_term_base_log_position: i64,
    pub commit_position_counter_id: i32,
    pub leader_member_id: i32,
    pub snapshots: Vec<SnapshotDescriptor>,
    pub cluster_members_string: String,
}

/// Durable recording-log entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingLogEntryType {
    Term,
    Snapshot,
}

/// A single entry in the durable recording log: either a term or a snapshot,
/// unified so the invariant checks in spec §3/§8 can be expressed uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingLogEntry {
    pub entry_type: RecordingLogEntryType,
    pub recording_id: i64,
    pub leadership_term_id: i64,
    pub term_base_log_position: i64,
    /// `NULL_POSITION` when open-ended (only valid for `Term` entries).
    pub log_position: i64,
    pub timestamp_ms: i64,
    pub service_id: i32,
    pub entry_index: usize,
}

impl RecordingLogEntry {
    pub fn new_term(
        recording_id: i64,
        leadership_term_id: i64,
        term_base_log_position: i64,
        log_position: i64,
        timestamp_ms: i64,
        entry_index: usize,
    ) -> Self {
        Self {
            entry_type: RecordingLogEntryType::Term,
            recording_id,
            leadership_term_id,
            term_base_log_position,
            log_position,
            timestamp_ms,
            service_id: CONSENSUS_MODULE_SERVICE_ID,
            entry_index,
        }
    }

    pub fn new_snapshot(
        recording_id: i64,
        leadership_term_id: i64,
        term_base_log_position: i64,
        log_position: i64,
        timestamp_ms: i64,
        service_id: i32,
        entry_index: usize,
    ) -> Self {
        Self {
            entry_type: RecordingLogEntryType::Snapshot,
            recording_id,
            leadership_term_id,
            term_base_log_position,
            log_position,
            timestamp_ms,
            service_id,
            entry_index,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cluster_members() {
        let raw = "0|consensus-a:9000|archive-a:9010;1|consensus-b:9000|archive-b:9010";
        let members = ClusterMember::parse_list(raw).unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].id, 0);
        assert_eq!(members[1].archive_endpoint, "archive-b:9010");
        assert_eq!(ClusterMember::find(&members, 1).unwrap().id, 1);
        assert!(ClusterMember::find(&members, 5).is_none());
    }

    #[test]
    fn rejects_malformed_member() {
        assert!(ClusterMember::parse_list("0|only-two-parts").is_err());
    }
}
