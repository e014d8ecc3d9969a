use common::errors::*;

use crate::{log_error, log_info, log_warn};

use crate::archive::{ArchiveClient, ArchiveConnector, ArchiveEvent, ControlResponseCode, RecordingSignal};
use crate::clock::EpochClock;
use crate::config::Config;
use crate::consensus::{ConsensusPublication, ConsensusSubscription};
use crate::counters::{CountersManager, NULL_COUNTER_ID, NULL_POSITION, NULL_VALUE};
use crate::errors::{BackupError, Severity};
use crate::events::BackupEventsListener;
use crate::mark_file::MarkFile;
use crate::model::ClusterMember;
use crate::protocol::{self, BackupQuery};
use crate::recording_log::RecordingLog;
use crate::state::{BackupState, PendingSnapshot, PendingTermEntry, RetrievedSnapshot};

/// Tracks multi-tick progress through `LIVE_LOG_REPLAY`'s three sub-steps
/// (spec §4.7), re-entered fresh every time the agent transitions into that
/// state.
enum LiveLogPhase {
    ResolveResume,
    Replay {
        start_position: i64,
        existing_recording_id: Option<i64>,
    },
    AwaitCounter {
        session_id: i64,
        existing_recording_id: Option<i64>,
    },
}

/// Tracks a single in-flight snapshot transfer during `SNAPSHOT_RETRIEVE`
/// (spec §4.6): a replay against the leader's archive feeding a recording on
/// the local archive, observed via recording signals.
struct SnapshotRetrieveMonitor {
    expected_stop_position: i64,
    local_recording_id: Option<i64>,
    error: Option<String>,
}

/// The cluster backup agent: a single-threaded, cooperatively scheduled
/// state machine maintaining an off-cluster replica of a replicated-log
/// consensus cluster (spec §1-§4).
///
/// Every collaborator is injected so the agent itself never blocks and can
/// be driven deterministically in tests via fakes.
pub struct Agent {
    config: Config,
    clock: Box<dyn EpochClock>,
    recording_log: RecordingLog,
    mark_file: MarkFile,
    counters: CountersManager,
    events: Box<dyn BackupEventsListener>,

    endpoint_cursor: crate::endpoint_cursor::EndpointCursor,
    consensus_publication: Box<dyn ConsensusPublication>,
    consensus_subscription: Box<dyn ConsensusSubscription>,
    backup_archive: Box<dyn ArchiveClient>,
    archive_connector: Box<dyn ArchiveConnector>,
    cluster_archive: Option<Box<dyn ArchiveClient>>,

    state: BackupState,
    pending: crate::state::PendingExchange,
    live_log_phase: LiveLogPhase,
    snapshot_monitor: Option<SnapshotRetrieveMonitor>,

    cluster_members: Vec<ClusterMember>,
    leader_member_id: Option<i32>,
    log_recording_id: Option<i64>,
    live_log_recording_id: Option<i64>,
    live_log_rec_counter_id: Option<i32>,

    next_correlation_id: i64,
    time_of_last_backup_query_ms: Option<i64>,
    time_of_last_progress_ms: i64,
    last_tick_ms: Option<i64>,
}

impl Agent {
    pub fn new(
        config: Config,
        clock: Box<dyn EpochClock>,
        recording_log: RecordingLog,
        mark_file: MarkFile,
        counters: CountersManager,
        events: Box<dyn BackupEventsListener>,
        consensus_publication: Box<dyn ConsensusPublication>,
        consensus_subscription: Box<dyn ConsensusSubscription>,
        backup_archive: Box<dyn ArchiveClient>,
        archive_connector: Box<dyn ArchiveConnector>,
    ) -> Self {
        let endpoints = config.cluster_consensus_endpoints.clone();
        let now_ms = clock.now_ms();
        Self {
            config,
            clock,
            recording_log,
            mark_file,
            counters,
            events,
            endpoint_cursor: crate::endpoint_cursor::EndpointCursor::new(endpoints),
            consensus_publication,
            consensus_subscription,
            backup_archive,
            archive_connector,
            cluster_archive: None,
            state: BackupState::Init,
            pending: crate::state::PendingExchange::default(),
            live_log_phase: LiveLogPhase::ResolveResume,
            snapshot_monitor: None,
            cluster_members: Vec::new(),
            leader_member_id: None,
            log_recording_id: None,
            live_log_recording_id: None,
            live_log_rec_counter_id: None,
            next_correlation_id: 0,
            time_of_last_backup_query_ms: None,
            time_of_last_progress_ms: now_ms,
            last_tick_ms: None,
        }
    }

    pub fn counters(&self) -> &CountersManager {
        &self.counters
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// Runs one non-blocking duty cycle. Returns the amount of work done
    /// (always `>= 0`), matching the teacher's agent-loop convention of
    /// reporting zero when a cycle found nothing ready to do.
    pub fn do_work(&mut self) -> Result<i64> {
        let now_ms = self.clock.now_ms();
        let mut work = 0i64;

        if matches!(self.state, BackupState::Init) {
            work += self.do_init(now_ms);
        }

        if self.last_tick_ms != Some(now_ms) {
            self.last_tick_ms = Some(now_ms);
            self.mark_file.update_activity_timestamp(now_ms)?;
            work += 1;
        }

        self.counters.state_counter().set(self.state.ordinal() as i64);

        match self
            .poll_consensus_inbound(now_ms)
            .and_then(|w1| self.dispatch(now_ms).map(|w2| w1 + w2))
        {
            Ok(w) => work += w,
            Err(e) => {
                self.report_failure(now_ms, &e);
                self.transition_to_reset_backup(now_ms, "operation failed");
                self.counters.state_counter().set(self.state.ordinal() as i64);
                return Err(e.into());
            }
        }

        self.counters.state_counter().set(self.state.ordinal() as i64);

        if self.stalled(now_ms) {
            let err = BackupError::Timeout {
                detail: "no progress before steady state".to_string(),
            };
            self.report_failure(now_ms, &err);
            self.transition_to_reset_backup(now_ms, "progress has stalled");
            self.counters.state_counter().set(self.state.ordinal() as i64);
        }

        Ok(work)
    }

    fn do_init(&mut self, now_ms: i64) -> i64 {
        self.time_of_last_progress_ms = now_ms;
        self.state = BackupState::BackupQuery { correlation_id: None };
        1
    }

    fn stalled(&self, now_ms: i64) -> bool {
        self.live_log_rec_counter_id.is_none()
            && now_ms > self.time_of_last_progress_ms + self.config.backup_progress_timeout_ms
    }

    fn report_failure(&mut self, now_ms: i64, error: &BackupError) {
        match error.severity() {
            Severity::Warn => log_warn!(now_ms, "{}", error),
            Severity::Fatal => log_error!(now_ms, "{}", error),
        }
        self.events.on_possible_failure(&error.to_string());
    }

    fn allocate_correlation_id(&mut self) -> i64 {
        self.next_correlation_id += 1;
        self.next_correlation_id
    }

    fn dispatch(&mut self, now_ms: i64) -> std::result::Result<i64, BackupError> {
        match &self.state {
            BackupState::Init => Ok(0),
            BackupState::BackupQuery { .. } => self.tick_backup_query(now_ms),
            BackupState::SnapshotLengthRetrieve { .. } => self.tick_snapshot_length_retrieve(now_ms),
            BackupState::SnapshotRetrieve { .. } => self.tick_snapshot_retrieve(now_ms),
            BackupState::LiveLogReplay => self.tick_live_log_replay(now_ms),
            BackupState::UpdateRecordingLog => self.tick_update_recording_log(now_ms),
            BackupState::BackingUp => self.tick_backing_up(now_ms),
            BackupState::ResetBackup { .. } => self.tick_reset_backup(now_ms),
        }
    }

    // ---- BACKUP_QUERY (§4.4 issuance) -------------------------------------

    fn tick_backup_query(&mut self, now_ms: i64) -> std::result::Result<i64, BackupError> {
        let correlation_id = match &self.state {
            BackupState::BackupQuery { correlation_id } => *correlation_id,
            _ => unreachable!(),
        };

        let stale = match self.time_of_last_backup_query_ms {
            Some(t) => now_ms > t + self.config.backup_response_timeout_ms,
            None => false,
        };
        if stale {
            self.rotate_endpoint(now_ms);
            return Ok(1);
        }

        if correlation_id.is_none() {
            let endpoint = self.endpoint_cursor.current().to_string();
            let cid = self.allocate_correlation_id();
            let query = BackupQuery {
                correlation_id: cid,
                response_stream_id: self.config.consensus_stream_id,
                protocol_semantic_version: 1,
                response_channel: self.config.catchup_endpoint.clone(),
                encoded_credentials: Vec::new(),
            };
            return match self.consensus_publication.try_offer(&endpoint, &query) {
                Ok(true) => {
                    self.state = BackupState::BackupQuery {
                        correlation_id: Some(cid),
                    };
                    self.time_of_last_backup_query_ms = Some(now_ms);
                    self.events.on_backup_query_sent(&endpoint);
                    log_info!(now_ms, "sent backup query {} to {}", cid, endpoint);
                    Ok(1)
                }
                Ok(false) => Ok(0),
                Err(e) => Err(e),
            };
        }

        Ok(0)
    }

    fn rotate_endpoint(&mut self, now_ms: i64) {
        self.endpoint_cursor.advance();
        self.cluster_archive = None;
        self.state = BackupState::BackupQuery { correlation_id: None };
        self.time_of_last_backup_query_ms = None;
        log_info!(now_ms, "rotating to endpoint {}", self.endpoint_cursor.current());
    }

    // ---- Consensus inbound / BackupResponse handling (§4.4 response) ------

    fn poll_consensus_inbound(&mut self, now_ms: i64) -> std::result::Result<i64, BackupError> {
        let fragments = self.consensus_subscription.poll_fragments()?;
        let mut work = 0;
        for fragment in fragments {
            if fragment.header.template_id != protocol::TEMPLATE_ID_BACKUP_RESPONSE {
                continue;
            }
            let response = protocol::decode_backup_response(&fragment.body).map_err(|_| {
                BackupError::ProtocolMismatch {
                    expected: protocol::SCHEMA_ID,
                    actual: fragment.header.schema_id,
                }
            })?;
            self.handle_backup_response(now_ms, response)?;
            work += 1;
        }
        Ok(work)
    }

    fn handle_backup_response(
        &mut self,
        now_ms: i64,
        response: crate::model::BackupResponse,
    ) -> std::result::Result<(), BackupError> {
        let correlation_id = match &self.state {
            BackupState::BackupQuery { correlation_id } => *correlation_id,
            _ => None,
        };
        if !matches!(self.state, BackupState::BackupQuery { .. }) || correlation_id != Some(response.correlation_id) {
            return Ok(());
        }

        let mut snapshots_to_retrieve = Vec::new();
        for snapshot in &response.snapshots {
            let include = match self.recording_log.get_latest_snapshot(snapshot.service_id) {
                None => true,
                Some(entry) => entry.log_position != snapshot.log_position,
            };
            if include {
                snapshots_to_retrieve.push(PendingSnapshot {
                    descriptor: *snapshot,
                    expected_stop_position: None,
                });
            }
        }

        let leader_changed = self.leader_member_id != Some(response.leader_member_id);
        let log_recording_changed = self.log_recording_id != Some(response.log_recording_id);
        let leader_log_entry = if self.leader_member_id.is_none() || leader_changed || log_recording_changed {
            Some(PendingTermEntry {
                leadership_term_id: response.log_leadership_term_id,
                term_base_log_position: response.log_term_base_log_position,
                timestamp_ms: now_ms,
            })
        } else {
            None
        };

        let last_term_disagrees = match self.recording_log.find_last_term() {
            None => true,
            Some(entry) => {
                entry.leadership_term_id != response.last_leadership_term_id
                    || entry.term_base_log_position != response.last_term_base_log_position
            }
        };
        let leader_last_term_entry = if last_term_disagrees {
            Some(PendingTermEntry {
                leadership_term_id: response.last_leadership_term_id,
                term_base_log_position: response.last_term_base_log_position,
                timestamp_ms: now_ms,
            })
        } else {
            None
        };

        let members = ClusterMember::parse_list(&response.cluster_members_string)
            .map_err(|e| BackupError::ArchiveError { message: e.to_string() })?;
        let leader = ClusterMember::find(&members, response.leader_member_id).cloned();

        self.cluster_members = members;
        self.leader_member_id = Some(response.leader_member_id);
        self.log_recording_id = Some(response.log_recording_id);
        self.time_of_last_backup_query_ms = None;
        self.time_of_last_progress_ms = now_ms;

        let has_snapshots_to_retrieve = !snapshots_to_retrieve.is_empty();

        self.pending.leader_log_entry = leader_log_entry;
        self.pending.leader_last_term_entry = leader_last_term_entry;
        self.pending.leader_commit_position_counter_id = Some(response.commit_position_counter_id);
        self.pending.snapshots_to_retrieve = snapshots_to_retrieve;
        self.pending.snapshots_retrieved.clear();

        self.events.on_backup_response_received(response.leader_member_id);
        log_info!(
            now_ms,
            "backup response from leader {}: {} snapshot(s) to retrieve",
            response.leader_member_id,
            self.pending.snapshots_to_retrieve.len()
        );

        // Migrating the leader-archive connection on any leader change is
        // required regardless of whether a connection already exists.
        if self.cluster_archive.is_none() || leader_changed {
            if let Some(leader) = &leader {
                self.cluster_archive = Some(self.archive_connector.connect(&leader.archive_endpoint));
            }
        }

        self.live_log_phase = LiveLogPhase::ResolveResume;
        self.state = if has_snapshots_to_retrieve {
            BackupState::SnapshotLengthRetrieve {
                cursor: 0,
                correlation_id: None,
            }
        } else {
            BackupState::LiveLogReplay
        };

        Ok(())
    }

    // ---- SNAPSHOT_LENGTH_RETRIEVE (§4.5) -----------------------------------

    fn tick_snapshot_length_retrieve(&mut self, now_ms: i64) -> std::result::Result<i64, BackupError> {
        let cursor = match &self.state {
            BackupState::SnapshotLengthRetrieve { cursor, .. } => *cursor,
            _ => unreachable!(),
        };

        if cursor >= self.pending.snapshots_to_retrieve.len() {
            self.state = BackupState::SnapshotRetrieve { cursor: 0 };
            return Ok(1);
        }

        let archive = match &mut self.cluster_archive {
            Some(a) => a,
            None => return Ok(0),
        };

        if !archive.is_connected() {
            return match archive.poll_connect() {
                Some(Ok(())) => Ok(1),
                Some(Err(e)) => Err(e),
                None => Ok(0),
            };
        }

        let recording_id = self.pending.snapshots_to_retrieve[cursor].descriptor.recording_id;
        match archive.poll_get_stop_position(recording_id) {
            Some(Ok(pos)) => {
                if pos == NULL_POSITION {
                    return Err(BackupError::ArchiveError {
                        message: format!("leader could not produce a stop position for recording {}", recording_id),
                    });
                }
                self.pending.snapshots_to_retrieve[cursor].expected_stop_position = Some(pos);
                self.time_of_last_progress_ms = now_ms;
                let next = cursor + 1;
                self.state = if next >= self.pending.snapshots_to_retrieve.len() {
                    BackupState::SnapshotRetrieve { cursor: 0 }
                } else {
                    BackupState::SnapshotLengthRetrieve {
                        cursor: next,
                        correlation_id: None,
                    }
                };
                Ok(1)
            }
            Some(Err(e)) => Err(e),
            None => Ok(0),
        }
    }

    // ---- SNAPSHOT_RETRIEVE (§4.6) ------------------------------------------

    fn tick_snapshot_retrieve(&mut self, now_ms: i64) -> std::result::Result<i64, BackupError> {
        let cursor = match &self.state {
            BackupState::SnapshotRetrieve { cursor } => *cursor,
            _ => unreachable!(),
        };

        if cursor >= self.pending.snapshots_to_retrieve.len() {
            self.live_log_phase = LiveLogPhase::ResolveResume;
            self.state = BackupState::LiveLogReplay;
            return Ok(1);
        }

        if self.snapshot_monitor.is_none() {
            let archive = match &mut self.cluster_archive {
                Some(a) => a,
                None => return Ok(0),
            };
            let pending = &self.pending.snapshots_to_retrieve[cursor];
            let recording_id = pending.descriptor.recording_id;
            let expected_stop_position = pending.expected_stop_position.unwrap_or(NULL_POSITION);

            return match archive.poll_replay(recording_id, 0) {
                Some(Ok(session_id)) => match self.backup_archive.poll_start_recording(session_id) {
                    Some(Ok(_)) => {
                        self.snapshot_monitor = Some(SnapshotRetrieveMonitor {
                            expected_stop_position,
                            local_recording_id: None,
                            error: None,
                        });
                        self.time_of_last_progress_ms = now_ms;
                        self.events.on_snapshot_retrieve_started(&pending.descriptor);
                        Ok(1)
                    }
                    Some(Err(e)) => Err(e),
                    None => Ok(0),
                },
                Some(Err(e)) => Err(e),
                None => Ok(0),
            };
        }

        let events = self.backup_archive.poll_events();
        let mut done = false;
        let mut progress_position = None;
        if let Some(monitor) = &mut self.snapshot_monitor {
            for event in events {
                match event {
                    ArchiveEvent::RecordingSignal {
                        recording_id,
                        position,
                        signal,
                    } => match signal {
                        RecordingSignal::Start => {
                            if position != 0 {
                                monitor.error = Some(format!("unexpected start position: {}", position));
                            } else {
                                monitor.local_recording_id = Some(recording_id);
                                progress_position = Some(position);
                            }
                        }
                        RecordingSignal::Stop => {
                            if position != monitor.expected_stop_position {
                                monitor.error = Some(format!(
                                    "unexpected stop position: expected {}, got {}",
                                    monitor.expected_stop_position, position
                                ));
                            } else {
                                done = true;
                            }
                        }
                        _ => {}
                    },
                    ArchiveEvent::ControlResponse {
                        code: ControlResponseCode::Error,
                        error_message,
                        ..
                    } => {
                        monitor.error = Some(error_message);
                    }
                    ArchiveEvent::ControlResponse { .. } => {}
                }
            }
        }

        if let Some(position) = progress_position {
            let descriptor = self.pending.snapshots_to_retrieve[cursor].descriptor;
            self.events.on_snapshot_retrieve_progress(&descriptor, position);
        }

        if let Some(message) = self.snapshot_monitor.as_ref().and_then(|m| m.error.clone()) {
            return Err(BackupError::UnexpectedRecordingSignal { detail: message });
        }

        if done {
            let monitor = self.snapshot_monitor.take().unwrap();
            let local_recording_id = monitor.local_recording_id.ok_or_else(|| BackupError::UnexpectedRecordingSignal {
                detail: "recording stopped before a start signal was observed".to_string(),
            })?;
            let descriptor = self.pending.snapshots_to_retrieve[cursor].descriptor;
            self.pending.snapshots_retrieved.push(RetrievedSnapshot {
                descriptor,
                local_recording_id,
            });
            self.time_of_last_progress_ms = now_ms;
            self.events.on_snapshot_retrieve_ended(&descriptor);
            self.state = BackupState::SnapshotRetrieve { cursor: cursor + 1 };
            return Ok(1);
        }

        Ok(0)
    }

    // ---- LIVE_LOG_REPLAY (§4.7) ---------------------------------------------

    fn tick_live_log_replay(&mut self, now_ms: i64) -> std::result::Result<i64, BackupError> {
        if self.cluster_archive.is_none() {
            return Ok(0);
        }

        {
            let archive = self.cluster_archive.as_mut().unwrap();
            if !archive.is_connected() {
                return match archive.poll_connect() {
                    Some(Ok(())) => Ok(1),
                    Some(Err(e)) => Err(e),
                    None => Ok(0),
                };
            }
        }

        match self.live_log_phase {
            LiveLogPhase::ResolveResume => match self.recording_log.find_last_term() {
                None => {
                    self.live_log_phase = LiveLogPhase::Replay {
                        start_position: NULL_POSITION,
                        existing_recording_id: None,
                    };
                    Ok(1)
                }
                Some(term) => {
                    let local_recording_id = term.recording_id;
                    match self.backup_archive.poll_get_stop_position(local_recording_id) {
                        Some(Ok(pos)) => {
                            self.live_log_phase = LiveLogPhase::Replay {
                                start_position: pos,
                                existing_recording_id: Some(local_recording_id),
                            };
                            Ok(1)
                        }
                        Some(Err(e)) => Err(e),
                        None => Ok(0),
                    }
                }
            },
            LiveLogPhase::Replay {
                start_position,
                existing_recording_id,
            } => {
                let leader_log_recording_id = self.log_recording_id.ok_or_else(|| BackupError::ArchiveError {
                    message: "no known leader log recording id".to_string(),
                })?;
                // The commit-position counter bounds the replay to committed
                // data only; real archive channels carry it as a
                // `limitCounterId` channel parameter.
                let _limit_counter_id = self.pending.leader_commit_position_counter_id.unwrap_or(NULL_COUNTER_ID);

                let archive = self.cluster_archive.as_mut().unwrap();
                let session = if start_position == NULL_POSITION {
                    archive.poll_replay(leader_log_recording_id, 0)
                } else {
                    archive.poll_bounded_replay(leader_log_recording_id, start_position, i64::MAX)
                };

                match session {
                    Some(Ok(session_id)) => {
                        self.events.on_live_log_replay_started(leader_log_recording_id, start_position);
                        self.live_log_phase = LiveLogPhase::AwaitCounter {
                            session_id,
                            existing_recording_id,
                        };
                        self.time_of_last_progress_ms = now_ms;
                        Ok(1)
                    }
                    Some(Err(e)) => Err(e),
                    None => Ok(0),
                }
            }
            LiveLogPhase::AwaitCounter {
                session_id,
                existing_recording_id,
            } => {
                let started = match existing_recording_id {
                    Some(existing) => self.backup_archive.poll_extend_recording(existing, session_id),
                    None => self.backup_archive.poll_start_recording(session_id),
                };
                match started {
                    Some(Ok((recording_id, counter_id))) => {
                        self.live_log_recording_id = Some(recording_id);
                        self.live_log_rec_counter_id = Some(counter_id);
                        let position = self.counters.recording_counter_value(counter_id).unwrap_or(0);
                        self.counters.live_log_position_counter().set_max(position);
                        self.time_of_last_progress_ms = now_ms;
                        self.state = BackupState::UpdateRecordingLog;
                        Ok(1)
                    }
                    Some(Err(e)) => Err(e),
                    None => Ok(0),
                }
            }
        }
    }

    // ---- UPDATE_RECORDING_LOG (§4.8) ---------------------------------------

    fn tick_update_recording_log(&mut self, now_ms: i64) -> std::result::Result<i64, BackupError> {
        let live_log_recording_id = self.live_log_recording_id.unwrap_or(NULL_VALUE);
        let mut wrote = false;

        if let Some(entry) = self.pending.leader_log_entry {
            let earliest_snapshot_term = self
                .pending
                .snapshots_retrieved
                .iter()
                .map(|s| s.descriptor.leadership_term_id)
                .min();
            let covered = match earliest_snapshot_term {
                Some(min_term) => entry.leadership_term_id <= min_term,
                None => true,
            };
            if covered && self.recording_log.is_unknown_term(entry.leadership_term_id) {
                self.recording_log
                    .append_term(
                        live_log_recording_id,
                        entry.leadership_term_id,
                        entry.term_base_log_position,
                        NULL_POSITION,
                        entry.timestamp_ms,
                    )
                    .map_err(to_backup_error)?;
                wrote = true;
            }
        }

        for retrieved in self.pending.snapshots_retrieved.clone().iter().rev() {
            self.recording_log
                .append_snapshot(
                    retrieved.local_recording_id,
                    retrieved.descriptor.leadership_term_id,
                    retrieved.descriptor.term_base_log_position,
                    retrieved.descriptor.log_position,
                    now_ms,
                    retrieved.descriptor.service_id,
                )
                .map_err(to_backup_error)?;
            wrote = true;
        }

        if let Some(entry) = self.pending.leader_last_term_entry {
            if self.recording_log.is_unknown_term(entry.leadership_term_id) {
                self.recording_log
                    .append_term(
                        live_log_recording_id,
                        entry.leadership_term_id,
                        entry.term_base_log_position,
                        NULL_POSITION,
                        entry.timestamp_ms,
                    )
                    .map_err(to_backup_error)?;
                wrote = true;
            }
        }

        self.pending.clear();
        self.counters
            .next_query_deadline_counter()
            .set(now_ms + self.config.backup_interval_ms);
        self.state = BackupState::BackingUp;

        if wrote {
            self.events.on_updated_recording_log();
        }

        Ok(1)
    }

    // ---- BACKING_UP (§4.9) --------------------------------------------------

    fn tick_backing_up(&mut self, now_ms: i64) -> std::result::Result<i64, BackupError> {
        let deadline = self.counters.next_query_deadline_counter().get();
        if deadline != NULL_VALUE && now_ms >= deadline {
            self.state = BackupState::BackupQuery { correlation_id: None };
            return Ok(1);
        }

        if let Some(counter_id) = self.live_log_rec_counter_id {
            match self.counters.recording_counter_value(counter_id) {
                Some(position) => {
                    if self.counters.live_log_position_counter().set_max(position) {
                        self.events.on_live_log_progress(position);
                        return Ok(1);
                    }
                }
                None => {
                    return Err(BackupError::ResourceUnavailable {
                        detail: "live-log recording counter disappeared".to_string(),
                    });
                }
            }
        }

        Ok(0)
    }

    // ---- RESET_BACKUP / cool-down (§4.10) ------------------------------------

    fn transition_to_reset_backup(&mut self, now_ms: i64, reason: &str) {
        if matches!(self.state, BackupState::ResetBackup { .. }) {
            return;
        }
        self.reset(now_ms);
        self.state = BackupState::ResetBackup {
            cool_down_deadline_ms: Some(now_ms + self.config.backup_cool_down_interval_ms),
        };
        self.events.on_reset(reason);
        log_warn!(now_ms, "entering reset: {}", reason);
    }

    fn tick_reset_backup(&mut self, now_ms: i64) -> std::result::Result<i64, BackupError> {
        let deadline = match &self.state {
            BackupState::ResetBackup { cool_down_deadline_ms } => *cool_down_deadline_ms,
            _ => unreachable!(),
        };
        match deadline {
            Some(d) if now_ms >= d => {
                self.state = BackupState::Init;
                Ok(1)
            }
            Some(_) => Ok(0),
            None => {
                self.state = BackupState::ResetBackup {
                    cool_down_deadline_ms: Some(now_ms + self.config.backup_cool_down_interval_ms),
                };
                Ok(0)
            }
        }
    }

    /// Tears down everything accumulated across a backup cycle. Fields are
    /// cleared before any collaborator is dropped, so a panic or re-entrant
    /// call mid-teardown can never observe half-torn-down state.
    fn reset(&mut self, now_ms: i64) {
        self.cluster_members.clear();
        self.leader_member_id = None;
        self.log_recording_id = None;
        self.live_log_recording_id = None;
        self.live_log_rec_counter_id = None;
        self.live_log_phase = LiveLogPhase::ResolveResume;
        self.snapshot_monitor = None;
        self.pending.clear();
        self.cluster_archive = None;
        self.time_of_last_backup_query_ms = None;
        self.time_of_last_progress_ms = now_ms;
        self.counters.next_query_deadline_counter().set(NULL_VALUE);
    }
}

fn to_backup_error(e: Error) -> BackupError {
    BackupError::ArchiveError { message: e.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use crate::archive::fake::{FakeArchiveClient, FakeArchiveConnector};
    use crate::clock::ManualEpochClock;
    use crate::consensus::fake::{FakeConsensusChannel, FakeConsensusPublication, FakeConsensusSubscription};
    use crate::events::NullEventsListener;
    use crate::model::{BackupResponse, SnapshotDescriptor};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cluster_backup_agent_test_{}_{}", std::process::id(), name));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_config(dir: &std::path::Path, endpoints: &[&str]) -> Config {
        Config {
            cluster_consensus_endpoints: endpoints.iter().map(|s| s.to_string()).collect(),
            cluster_dir: dir.to_path_buf(),
            catchup_endpoint: "127.0.0.1:9020".to_string(),
            consensus_stream_id: 10,
            replay_stream_id: 11,
            log_stream_id: 12,
            backup_response_timeout_ms: 5000,
            backup_interval_ms: 60000,
            backup_progress_timeout_ms: 30000,
            backup_cool_down_interval_ms: 5000,
        }
    }

    fn sample_response(correlation_id: i64, leader_member_id: i32, snapshots: Vec<SnapshotDescriptor>) -> BackupResponse {
        BackupResponse {
            correlation_id,
            log_recording_id: 11,
            log_leadership_term_id: 3,
            log_term_base_log_position: 0,
            last_leadership_term_id: 3,
            last_term_base_log_position: 0,
            commit_position_counter_id: 7,
            leader_member_id,
            snapshots,
            cluster_members_string: "0|a:9000|archive-a:9010;1|b:9000|archive-b:9010".to_string(),
        }
    }

    struct TestHarness {
        agent: Agent,
        clock: Arc<ManualEpochClock>,
        channel: FakeConsensusChannel,
        connected_endpoints: Arc<Mutex<Vec<String>>>,
    }

    /// Wires up an `Agent` against every fake collaborator, the way
    /// `bin/cluster_backup.rs` wires up the real ones, but with handles
    /// retained so a test can push responses, advance time, and inspect
    /// which archive endpoints were dialed after handing ownership to the
    /// agent.
    fn build_harness(
        dir_name: &str,
        endpoints: &[&str],
        local_next_recording_id: i64,
        leader_recording_id: i64,
        leader_stop_position: i64,
        events: Box<dyn BackupEventsListener>,
        configure_local_archive: impl FnOnce(&mut FakeArchiveClient),
    ) -> TestHarness {
        let dir = temp_dir(dir_name);
        let recording_log = RecordingLog::open(dir.join("recording.log")).unwrap();
        let mark_file = MarkFile::open(dir.join("mark.dat")).unwrap();
        let counters = CountersManager::new();
        let clock = Arc::new(ManualEpochClock::new(1_000));
        let channel = FakeConsensusChannel::new();
        let consensus_publication = Box::new(FakeConsensusPublication::new(channel.clone()));
        let consensus_subscription = Box::new(FakeConsensusSubscription::new(channel.clone()));

        let mut local_archive = FakeArchiveClient::new(counters.clone()).with_next_recording_id(local_next_recording_id);
        local_archive.stop_positions.insert(local_next_recording_id, 0);
        configure_local_archive(&mut local_archive);
        let backup_archive: Box<dyn ArchiveClient> = Box::new(local_archive);

        let mut connector = FakeArchiveConnector::new(counters.clone());
        connector.set_stop_position(leader_recording_id, leader_stop_position);
        let connected_endpoints = connector.connected_endpoints_handle();
        let archive_connector: Box<dyn ArchiveConnector> = Box::new(connector);

        let agent = Agent::new(
            test_config(&dir, endpoints),
            Box::new(clock.clone()),
            recording_log,
            mark_file,
            counters,
            events,
            consensus_publication,
            consensus_subscription,
            backup_archive,
            archive_connector,
        );

        TestHarness {
            agent,
            clock,
            channel,
            connected_endpoints,
        }
    }

    fn drive_until(agent: &mut Agent, target: &str, max_ticks: usize) {
        for _ in 0..max_ticks {
            if agent.state_name() == target {
                return;
            }
            agent.do_work().unwrap();
        }
        panic!(
            "agent stuck in {} after {} ticks, expected {}",
            agent.state_name(),
            max_ticks,
            target
        );
    }

    #[derive(Default)]
    struct RecordingListenerState {
        possible_failures: Vec<String>,
        reset_reasons: Vec<String>,
    }

    #[derive(Clone, Default)]
    struct RecordingListener {
        state: Arc<Mutex<RecordingListenerState>>,
    }

    impl BackupEventsListener for RecordingListener {
        fn on_possible_failure(&mut self, message: &str) {
            self.state.lock().unwrap().possible_failures.push(message.to_string());
        }

        fn on_reset(&mut self, reason: &str) {
            self.state.lock().unwrap().reset_reasons.push(reason.to_string());
        }
    }

    // (a) Cold start, no local state, one snapshot.
    #[test]
    fn cold_start_one_snapshot_reaches_backing_up_with_expected_log() {
        let mut h = build_harness("cold_start", &["a", "b"], 100, 10, 4096, Box::new(NullEventsListener), |client| {
            client.push_signal(100, 0, RecordingSignal::Start);
            client.push_signal(100, 4096, RecordingSignal::Stop);
        });

        h.agent.do_work().unwrap();
        assert_eq!(h.agent.state_name(), "BACKUP_QUERY");

        h.channel.push_raw(protocol::encode_backup_response(&sample_response(
            1,
            0,
            vec![SnapshotDescriptor {
                recording_id: 10,
                leadership_term_id: 3,
                term_base_log_position: 0,
                log_position: 4096,
                service_id: -1,
            }],
        )));

        drive_until(&mut h.agent, "BACKING_UP", 20);
        assert_eq!(h.connected_endpoints.lock().unwrap().as_slice(), &["archive-a:9010".to_string()]);

        let recording_log_path = h.agent.recording_log.path().to_path_buf();
        drop(h);
        let log = RecordingLog::open(&recording_log_path).unwrap();
        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].recording_id, 101);
        assert_eq!(entries[0].leadership_term_id, 3);
        assert_eq!(entries[0].log_position, NULL_POSITION);
        assert_eq!(entries[1].recording_id, 100);
        assert_eq!(entries[1].log_position, 4096);
        assert_eq!(entries[1].service_id, -1);
    }

    // (b) Endpoint rotation: first endpoint silent, cursor advances, retry succeeds.
    #[test]
    fn endpoint_rotation_after_response_timeout() {
        let mut h = build_harness("rotation", &["a", "b"], 100, 10, 4096, Box::new(NullEventsListener), |_| {});

        h.agent.do_work().unwrap();
        assert_eq!(h.channel.offered_endpoints(), vec!["a".to_string()]);

        h.clock.advance(5001);
        h.agent.do_work().unwrap();
        h.agent.do_work().unwrap();
        assert_eq!(h.channel.offered_endpoints(), vec!["a".to_string(), "b".to_string()]);

        h.channel.push_raw(protocol::encode_backup_response(&sample_response(2, 0, vec![])));
        drive_until(&mut h.agent, "BACKING_UP", 20);
    }

    // (c) Leader change mid-run: reconnect, no duplicate term appended.
    #[test]
    fn leader_change_migrates_archive_connection_without_duplicate_term() {
        let mut h = build_harness("leader_change", &["a"], 100, 10, 4096, Box::new(NullEventsListener), |_| {});

        h.agent.do_work().unwrap();
        h.channel.push_raw(protocol::encode_backup_response(&sample_response(1, 0, vec![])));
        drive_until(&mut h.agent, "BACKING_UP", 20);
        assert_eq!(h.connected_endpoints.lock().unwrap().as_slice(), &["archive-a:9010".to_string()]);

        let recording_log_path = h.agent.recording_log.path().to_path_buf();
        {
            let log = RecordingLog::open(&recording_log_path).unwrap();
            assert_eq!(log.entries().len(), 1);
        }

        h.clock.advance(h.agent.config.backup_interval_ms + 1);
        h.agent.do_work().unwrap();
        assert_eq!(h.agent.state_name(), "BACKUP_QUERY");

        h.channel.push_raw(protocol::encode_backup_response(&sample_response(2, 1, vec![])));
        drive_until(&mut h.agent, "BACKING_UP", 20);

        assert_eq!(
            h.connected_endpoints.lock().unwrap().as_slice(),
            &["archive-a:9010".to_string(), "archive-b:9010".to_string()]
        );

        let log = RecordingLog::open(&recording_log_path).unwrap();
        assert_eq!(log.entries().len(), 1, "leader change with same term must not append a duplicate entry");
    }

    // (d) Progress stall pre-steady-state.
    #[test]
    fn progress_stall_before_steady_state_resets_then_reinits() {
        let listener = RecordingListener::default();
        let listener_state = listener.state.clone();
        let mut h = build_harness("stall", &["a"], 100, 10, 4096, Box::new(listener), |_| {});

        h.agent.do_work().unwrap();
        assert_eq!(h.agent.state_name(), "BACKUP_QUERY");

        h.clock.advance(30_001);
        assert!(h.agent.do_work().is_ok());
        assert_eq!(h.agent.state_name(), "RESET_BACKUP");
        assert!(listener_state
            .lock()
            .unwrap()
            .possible_failures
            .iter()
            .any(|m| m.contains("progress has stalled")));
        assert_eq!(listener_state.lock().unwrap().reset_reasons, vec!["progress has stalled".to_string()]);

        h.clock.advance(5_001);
        h.agent.do_work().unwrap();
        assert_eq!(h.agent.state_name(), "INIT");
    }

    // (e) Unexpected snapshot stop position.
    #[test]
    fn unexpected_snapshot_stop_position_is_fatal() {
        let mut h = build_harness("bad_stop", &["a"], 100, 10, 4096, Box::new(NullEventsListener), |client| {
            client.push_signal(100, 0, RecordingSignal::Start);
            client.push_signal(100, 2048, RecordingSignal::Stop);
        });

        h.agent.do_work().unwrap();
        h.channel.push_raw(protocol::encode_backup_response(&sample_response(
            1,
            0,
            vec![SnapshotDescriptor {
                recording_id: 10,
                leadership_term_id: 3,
                term_base_log_position: 0,
                log_position: 4096,
                service_id: -1,
            }],
        )));

        let mut saw_error = false;
        for _ in 0..20 {
            match h.agent.do_work() {
                Ok(_) => {}
                Err(_) => {
                    saw_error = true;
                    break;
                }
            }
        }
        assert!(saw_error, "expected the unexpected stop position to surface as an error");
        assert_eq!(h.agent.state_name(), "RESET_BACKUP");
        assert_eq!(
            h.agent.counters.state_counter().get(),
            h.agent.state.ordinal() as i64,
            "state counter must reflect RESET_BACKUP immediately after an error tick"
        );
    }

    // (f) Live-log counter unavailability in steady state.
    #[test]
    fn live_log_counter_disappearing_in_backing_up_resets() {
        let listener = RecordingListener::default();
        let listener_state = listener.state.clone();
        let mut h = build_harness("counter_gone", &["a"], 100, 10, 4096, Box::new(listener), |_| {});

        h.agent.do_work().unwrap();
        h.channel.push_raw(protocol::encode_backup_response(&sample_response(1, 0, vec![])));
        drive_until(&mut h.agent, "BACKING_UP", 20);

        let counter_id = h.agent.live_log_rec_counter_id.expect("counter id known once backing up");
        h.agent.counters.remove_recording_counter(counter_id);

        let result = h.agent.do_work();
        assert!(result.is_err());
        assert_eq!(h.agent.state_name(), "RESET_BACKUP");
        assert_eq!(
            h.agent.counters.state_counter().get(),
            h.agent.state.ordinal() as i64,
            "state counter must reflect RESET_BACKUP immediately after an error tick"
        );
        assert!(listener_state
            .lock()
            .unwrap()
            .possible_failures
            .iter()
            .any(|m| m.contains("resource unavailable")));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut h = build_harness("reset_idempotent", &["a"], 100, 10, 4096, Box::new(NullEventsListener), |_| {});
        h.agent.do_work().unwrap();

        let now = h.clock.now_ms();
        h.agent.transition_to_reset_backup(now, "first");
        let state_after_first = h.agent.state_name();
        let deadline_after_first = h.agent.counters.next_query_deadline_counter().get();

        h.agent.transition_to_reset_backup(now, "second");
        assert_eq!(h.agent.state_name(), state_after_first);
        assert_eq!(h.agent.counters.next_query_deadline_counter().get(), deadline_after_first);
    }

    #[test]
    fn state_counter_tracks_internal_state_after_every_tick() {
        let mut h = build_harness("counter_sync", &["a", "b"], 100, 10, 4096, Box::new(NullEventsListener), |client| {
            client.push_signal(100, 0, RecordingSignal::Start);
            client.push_signal(100, 4096, RecordingSignal::Stop);
        });

        for _ in 0..12 {
            h.agent.do_work().unwrap();
            assert_eq!(h.agent.counters.state_counter().get(), h.agent.state.ordinal() as i64);
            if h.agent.state_name() == "BACKUP_QUERY" && h.channel.offered_endpoints().is_empty() == false {
                h.channel.push_raw(protocol::encode_backup_response(&sample_response(
                    1,
                    0,
                    vec![SnapshotDescriptor {
                        recording_id: 10,
                        leadership_term_id: 3,
                        term_base_log_position: 0,
                        log_position: 4096,
                        service_id: -1,
                    }],
                )));
            }
        }
    }
}
