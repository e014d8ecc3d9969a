use crate::errors::BackupError;

/// Recording-lifecycle signal raised by an archive, mirroring Aeron's
/// `RecordingSignal` enum (`DELETE`, `REPLICATE`, `MERGE`, `EXTEND`, `STOP`,
/// ...) but trimmed to the subset this agent reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingSignal {
    Start,
    Extend,
    Replicate,
    Merge,
    Stop,
    Delete,
}

/// Result code carried by an archive control response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlResponseCode {
    Ok,
    Error,
}

/// One control-response or recording-signal event observed on an archive
/// connection during a tick.
#[derive(Debug, Clone)]
pub enum ArchiveEvent {
    RecordingSignal {
        recording_id: i64,
        position: i64,
        signal: RecordingSignal,
    },
    ControlResponse {
        correlation_id: i64,
        code: ControlResponseCode,
        error_message: String,
    },
}

/// Non-blocking facade over an archive control-session, following the
/// `poll_*` naming and `Option<Result<T>>` return shape the teacher uses for
/// cooperative, never-block network clients (see `pkg/rpc/src/client.rs`'s
/// `poll_call`): `None` means "still in flight, call again next tick",
/// `Some(Err(_))` means the operation failed outright.
///
/// Implementors must never block the calling thread; every method is called
/// once per `do_work` tick by the agent.
pub trait ArchiveClient: Send {
    /// Drives the underlying connection handshake. Returns `Some(Ok(()))`
    /// once connected.
    fn poll_connect(&mut self) -> Option<Result<(), BackupError>>;

    fn is_connected(&self) -> bool;

    /// Issues (on first call) and polls a stop-position query for
    /// `recording_id`. `NULL_POSITION` still recording.
    fn poll_get_stop_position(&mut self, recording_id: i64) -> Option<Result<i64, BackupError>>;

    /// Issues (on first call) and polls a replay session from `start_position`
    /// onward with no bound, returning the allocated replay session id.
    fn poll_replay(
        &mut self,
        recording_id: i64,
        start_position: i64,
    ) -> Option<Result<i64, BackupError>>;

    /// Same as `poll_replay` but stops once `stop_position` is reached.
    fn poll_bounded_replay(
        &mut self,
        recording_id: i64,
        start_position: i64,
        stop_position: i64,
    ) -> Option<Result<i64, BackupError>>;

    /// Begins recording a live replayed stream, returning the local
    /// recording id it was assigned and the counter id tracking its
    /// recorded position.
    fn poll_start_recording(&mut self, session_id: i64) -> Option<Result<(i64, i32), BackupError>>;

    /// Extends a previously recorded (but not currently live) recording with
    /// a fresh replay session, returning its (unchanged) recording id and a
    /// fresh position-counter id.
    fn poll_extend_recording(
        &mut self,
        recording_id: i64,
        session_id: i64,
    ) -> Option<Result<(i64, i32), BackupError>>;

    fn poll_try_stop_recording(&mut self, session_id: i64) -> Option<Result<(), BackupError>>;

    /// Drains pending recording-signal / control-response events observed
    /// since the last call.
    fn poll_events(&mut self) -> Vec<ArchiveEvent>;
}

/// Creates a fresh `ArchiveClient` bound to a remote archive endpoint.
/// Used to (re)open the leader-archive connection on the first backup
/// response, and again whenever the leader changes.
pub trait ArchiveConnector: Send {
    fn connect(&self, endpoint: &str) -> Box<dyn ArchiveClient>;
}

pub mod fake {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory `ArchiveClient` test double. Every `poll_*` call can be
    /// scripted to return pending (`None`) for a configurable number of
    /// ticks before resolving, so tests can exercise multi-tick polling
    /// without a real archive process.
    pub struct FakeArchiveClient {
        connect_delay_ticks: u32,
        connected: bool,
        pub events: VecDeque<ArchiveEvent>,
        pub stop_positions: std::collections::HashMap<i64, i64>,
        next_session_id: i64,
        next_recording_id: i64,
        pub fail_connect: bool,
        /// Position counters a real archive would publish into the shared
        /// counters file. Registering into the same `CountersManager` the
        /// agent reads from is what lets `poll_start_recording` hand back an
        /// id the agent can actually look up.
        counters: crate::counters::CountersManager,
    }

    impl FakeArchiveClient {
        pub fn new(counters: crate::counters::CountersManager) -> Self {
            Self {
                connect_delay_ticks: 0,
                connected: false,
                events: VecDeque::new(),
                stop_positions: std::collections::HashMap::new(),
                next_session_id: 1,
                next_recording_id: 1000,
                fail_connect: false,
                counters,
            }
        }

        pub fn with_connect_delay(mut self, ticks: u32) -> Self {
            self.connect_delay_ticks = ticks;
            self
        }

        pub fn with_next_recording_id(mut self, id: i64) -> Self {
            self.next_recording_id = id;
            self
        }

        pub fn push_signal(&mut self, recording_id: i64, position: i64, signal: RecordingSignal) {
            self.events.push_back(ArchiveEvent::RecordingSignal {
                recording_id,
                position,
                signal,
            });
        }
    }

    impl ArchiveClient for FakeArchiveClient {
        fn poll_connect(&mut self) -> Option<Result<(), BackupError>> {
            if self.fail_connect {
                return Some(Err(BackupError::ArchiveError {
                    message: "connection refused".into(),
                }));
            }
            if self.connect_delay_ticks > 0 {
                self.connect_delay_ticks -= 1;
                return None;
            }
            self.connected = true;
            Some(Ok(()))
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn poll_get_stop_position(&mut self, recording_id: i64) -> Option<Result<i64, BackupError>> {
            Some(Ok(*self
                .stop_positions
                .get(&recording_id)
                .unwrap_or(&crate::counters::NULL_POSITION)))
        }

        fn poll_replay(&mut self, _recording_id: i64, _start_position: i64) -> Option<Result<i64, BackupError>> {
            let id = self.next_session_id;
            self.next_session_id += 1;
            Some(Ok(id))
        }

        fn poll_bounded_replay(
            &mut self,
            _recording_id: i64,
            _start_position: i64,
            _stop_position: i64,
        ) -> Option<Result<i64, BackupError>> {
            let id = self.next_session_id;
            self.next_session_id += 1;
            Some(Ok(id))
        }

        fn poll_start_recording(&mut self, _session_id: i64) -> Option<Result<(i64, i32), BackupError>> {
            let recording_id = self.next_recording_id;
            self.next_recording_id += 1;
            let counter_id = self.counters.allocate_recording_counter(0);
            Some(Ok((recording_id, counter_id)))
        }

        fn poll_extend_recording(&mut self, recording_id: i64, _session_id: i64) -> Option<Result<(i64, i32), BackupError>> {
            let resume_from = *self.stop_positions.get(&recording_id).unwrap_or(&0);
            let counter_id = self.counters.allocate_recording_counter(resume_from);
            Some(Ok((recording_id, counter_id)))
        }

        fn poll_try_stop_recording(&mut self, _session_id: i64) -> Option<Result<(), BackupError>> {
            Some(Ok(()))
        }

        fn poll_events(&mut self) -> Vec<ArchiveEvent> {
            self.events.drain(..).collect()
        }
    }

    /// Hands out a fresh, already-connected `FakeArchiveClient` on every
    /// call, regardless of endpoint. Good enough for tests that don't care
    /// which endpoint string was used. Stop positions registered via
    /// `set_stop_position` are inherited by every client handed out
    /// afterward, standing in for a leader archive that already knows about
    /// a given recording.
    pub struct FakeArchiveConnector {
        pub connect_delay_ticks: u32,
        stop_positions: std::collections::HashMap<i64, i64>,
        counters: crate::counters::CountersManager,
        connected_endpoints: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl FakeArchiveConnector {
        pub fn new(counters: crate::counters::CountersManager) -> Self {
            Self {
                connect_delay_ticks: 0,
                stop_positions: std::collections::HashMap::new(),
                counters,
                connected_endpoints: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            }
        }

        pub fn set_stop_position(&mut self, recording_id: i64, position: i64) {
            self.stop_positions.insert(recording_id, position);
        }

        /// Endpoints `connect` has been called with, oldest first. Lets a
        /// test observe leader-archive migration without reaching into the
        /// connection itself, which is normally owned by the agent under
        /// test.
        pub fn connected_endpoints(&self) -> Vec<String> {
            self.connected_endpoints.lock().unwrap().clone()
        }

        /// Clones the shared log handle so a test can keep observing
        /// `connect` calls after this connector has been boxed and handed
        /// off to an `Agent`.
        pub fn connected_endpoints_handle(&self) -> std::sync::Arc<std::sync::Mutex<Vec<String>>> {
            self.connected_endpoints.clone()
        }
    }

    impl ArchiveConnector for FakeArchiveConnector {
        fn connect(&self, endpoint: &str) -> Box<dyn ArchiveClient> {
            self.connected_endpoints.lock().unwrap().push(endpoint.to_string());
            let mut client =
                FakeArchiveClient::new(self.counters.clone()).with_connect_delay(self.connect_delay_ticks);
            client.stop_positions = self.stop_positions.clone();
            Box::new(client)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn connect_resolves_after_configured_delay() {
            let mut client =
                FakeArchiveClient::new(crate::counters::CountersManager::new()).with_connect_delay(2);
            assert!(client.poll_connect().is_none());
            assert!(client.poll_connect().is_none());
            assert!(matches!(client.poll_connect(), Some(Ok(()))));
            assert!(client.is_connected());
        }

        #[test]
        fn failed_connect_surfaces_error() {
            let mut client = FakeArchiveClient::new(crate::counters::CountersManager::new());
            client.fail_connect = true;
            assert!(matches!(client.poll_connect(), Some(Err(_))));
        }
    }
}
