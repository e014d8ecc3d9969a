use crate::errors::BackupError;
use crate::protocol::{decode_backup_query, BackupQuery, HEADER_LENGTH, MessageHeader};

/// One fragment received off a consensus subscription: the decoded header
/// plus the raw body bytes (still to be matched against a template by the
/// caller).
pub struct Fragment {
    pub header: MessageHeader,
    pub body: Vec<u8>,
}

/// Non-blocking facade over the publication used to send `BackupQuery`
/// messages to the cluster's current leader.
pub trait ConsensusPublication: Send {
    /// Attempts to offer `query` to the current leader endpoint. `Ok(true)`
    /// means it was accepted; `Ok(false)` means back-pressured (try again
    /// next tick); `Err` means the endpoint should be rotated.
    fn try_offer(&mut self, endpoint: &str, query: &BackupQuery) -> Result<bool, BackupError>;
}

/// Non-blocking facade over the subscription used to receive
/// `BackupResponse` messages and consensus module fragments.
pub trait ConsensusSubscription: Send {
    /// Drains any fragments received since the last call without blocking.
    fn poll_fragments(&mut self) -> Result<Vec<Fragment>, BackupError>;
}

/// Parses a raw subscription fragment into a decoded header, verifying the
/// schema id along the way.
pub fn decode_fragment(raw: &[u8]) -> Result<Fragment, BackupError> {
    if raw.len() < HEADER_LENGTH {
        return Err(BackupError::ProtocolMismatch {
            expected: crate::protocol::SCHEMA_ID,
            actual: 0,
        });
    }
    let header = MessageHeader::decode(raw).map_err(|_| BackupError::ProtocolMismatch {
        expected: crate::protocol::SCHEMA_ID,
        actual: 0,
    })?;
    header.verify_schema()?;
    Ok(Fragment {
        header,
        body: raw[HEADER_LENGTH..].to_vec(),
    })
}

pub mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Shared in-memory channel standing in for the consensus
    /// publication/subscription pair. `FakeConsensusPublication::try_offer`
    /// pushes directly onto the queue a paired `FakeConsensusSubscription`
    /// drains, so tests can drive both sides of the conversation without a
    /// network stack.
    #[derive(Clone, Default)]
    pub struct FakeConsensusChannel {
        inner: Arc<Mutex<VecDeque<Vec<u8>>>>,
        offered_endpoints: Arc<Mutex<Vec<String>>>,
    }

    impl FakeConsensusChannel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_raw(&self, bytes: Vec<u8>) {
            self.inner.lock().unwrap().push_back(bytes);
        }

        /// Endpoints a `FakeConsensusPublication` sharing this channel has
        /// offered a query to, oldest first. Lets a test observe endpoint
        /// rotation without reaching into the publication itself, which is
        /// normally owned by the agent under test.
        pub fn offered_endpoints(&self) -> Vec<String> {
            self.offered_endpoints.lock().unwrap().clone()
        }
    }

    pub struct FakeConsensusPublication {
        pub channel: FakeConsensusChannel,
        pub reject_next: bool,
        pub last_endpoint: Option<String>,
        pub offers: Vec<BackupQuery>,
    }

    impl FakeConsensusPublication {
        pub fn new(channel: FakeConsensusChannel) -> Self {
            Self {
                channel,
                reject_next: false,
                last_endpoint: None,
                offers: Vec::new(),
            }
        }
    }

    impl ConsensusPublication for FakeConsensusPublication {
        fn try_offer(&mut self, endpoint: &str, query: &BackupQuery) -> Result<bool, BackupError> {
            if self.reject_next {
                self.reject_next = false;
                return Ok(false);
            }
            self.last_endpoint = Some(endpoint.to_string());

            let raw = query.encode();
            let decoded = decode_backup_query(&raw[HEADER_LENGTH..])
                .expect("freshly encoded BackupQuery must decode");
            self.offers.push(decoded);

            self.channel.offered_endpoints.lock().unwrap().push(endpoint.to_string());
            Ok(true)
        }
    }

    pub struct FakeConsensusSubscription {
        pub channel: FakeConsensusChannel,
    }

    impl FakeConsensusSubscription {
        pub fn new(channel: FakeConsensusChannel) -> Self {
            Self { channel }
        }
    }

    impl ConsensusSubscription for FakeConsensusSubscription {
        fn poll_fragments(&mut self) -> Result<Vec<Fragment>, BackupError> {
            let mut out = Vec::new();
            let mut queue = self.channel.inner.lock().unwrap();
            while let Some(raw) = queue.pop_front() {
                out.push(decode_fragment(&raw)?);
            }
            Ok(out)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::model::BackupResponse;
        use crate::protocol::encode_backup_response;

        #[test]
        fn published_response_is_observed_by_subscription() {
            let channel = FakeConsensusChannel::new();
            channel.push_raw(encode_backup_response(&BackupResponse {
                correlation_id: 1,
                log_recording_id: 1,
                log_leadership_term_id: 1,
                log_term_base_log_position: 0,
                last_leadership_term_id: 1,
                last_term_base_log_position: 0,
                commit_position_counter_id: 0,
                leader_member_id: 0,
                snapshots: vec![],
                cluster_members_string: String::new(),
            }));

            let mut sub = FakeConsensusSubscription::new(channel);
            let fragments = sub.poll_fragments().unwrap();
            assert_eq!(fragments.len(), 1);
        }
    }
}
