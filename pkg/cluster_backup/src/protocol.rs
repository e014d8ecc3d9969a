use common::errors::*;

use crate::errors::BackupError;
use crate::model::{BackupResponse, SnapshotDescriptor};

/// Schema id this agent understands. A consensus subscription fragment
/// carrying any other schema id is a protocol mismatch.
pub const SCHEMA_ID: u16 = 1;

pub const TEMPLATE_ID_BACKUP_QUERY: u16 = 1;
pub const TEMPLATE_ID_BACKUP_RESPONSE: u16 = 2;

pub const HEADER_LENGTH: usize = 8;

/// Sparse-binary message header: `{schema_id, template_id, block_length, version}`,
/// each a little-endian `u16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub schema_id: u16,
    pub template_id: u16,
    pub block_length: u16,
    pub version: u16,
}

impl MessageHeader {
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LENGTH {
            return Err(err_msg("message too short for header"));
        }
        Ok(Self {
            schema_id: u16::from_le_bytes([buf[0], buf[1]]),
            template_id: u16::from_le_bytes([buf[2], buf[3]]),
            block_length: u16::from_le_bytes([buf[4], buf[5]]),
            version: u16::from_le_bytes([buf[6], buf[7]]),
        })
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.schema_id.to_le_bytes());
        out.extend_from_slice(&self.template_id.to_le_bytes());
        out.extend_from_slice(&self.block_length.to_le_bytes());
        out.extend_from_slice(&self.version.to_le_bytes());
    }

    /// Verifies the schema id matches what this agent understands, returning
    /// a `ProtocolMismatch` error otherwise.
    pub fn verify_schema(&self) -> std::result::Result<(), BackupError> {
        if self.schema_id != SCHEMA_ID {
            return Err(BackupError::ProtocolMismatch {
                expected: SCHEMA_ID,
                actual: self.schema_id,
            });
        }
        Ok(())
    }
}

/// Outbound `BackupQuery` message.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupQuery {
    pub correlation_id: i64,
    pub response_stream_id: i32,
    pub protocol_semantic_version: i32,
    pub response_channel: String,
    pub encoded_credentials: Vec<u8>,
}

impl BackupQuery {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        MessageHeader {
            schema_id: SCHEMA_ID,
            template_id: TEMPLATE_ID_BACKUP_QUERY,
            block_length: 0,
            version: 0,
        }
        .encode(&mut out);

        out.extend_from_slice(&self.correlation_id.to_le_bytes());
        out.extend_from_slice(&self.response_stream_id.to_le_bytes());
        out.extend_from_slice(&self.protocol_semantic_version.to_le_bytes());

        out.extend_from_slice(&(self.response_channel.len() as u32).to_le_bytes());
        out.extend_from_slice(self.response_channel.as_bytes());

        out.extend_from_slice(&(self.encoded_credentials.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.encoded_credentials);

        out
    }
}

/// Decodes the body of a `BackupQuery` message (header already stripped and
/// verified by the caller). Used by the fake consensus publication to prove
/// the wire format it offers to the leader round-trips, the same way
/// `decode_backup_response` is exercised against `encode_backup_response`.
pub fn decode_backup_query(body: &[u8]) -> Result<BackupQuery> {
    let mut cursor = Cursor::new(body);

    let correlation_id = cursor.read_i64()?;
    let response_stream_id = cursor.read_i32()?;
    let protocol_semantic_version = cursor.read_i32()?;
    let response_channel = cursor.read_string()?;
    let credentials_len = cursor.read_u32()? as usize;
    let encoded_credentials = cursor.take(credentials_len)?.to_vec();

    Ok(BackupQuery {
        correlation_id,
        response_stream_id,
        protocol_semantic_version,
        response_channel,
        encoded_credentials,
    })
}

/// Decodes the body of a `BackupResponse` message (header already stripped
/// and verified by the caller).
pub fn decode_backup_response(body: &[u8]) -> Result<BackupResponse> {
    let mut cursor = Cursor::new(body);

    let correlation_id = cursor.read_i64()?;
    let log_recording_id = cursor.read_i64()?;
    let log_leadership_term_id = cursor.read_i64()?;
    let log_term_base_log_position = cursor.read_i64()?;
    let last_leadership_term_id = cursor.read_i64()?;
    let last_term_base_log_position = cursor.read_i64()?;
    let commit_position_counter_id = cursor.read_i32()?;
    let leader_member_id = cursor.read_i32()?;

    let snapshot_count = cursor.read_u32()? as usize;
    let mut snapshots = Vec::with_capacity(snapshot_count);
    for _ in 0..snapshot_count {
        snapshots.push(SnapshotDescriptor {
            recording_id: cursor.read_i64()?,
            leadership_term_id: cursor.read_i64()?,
            term_base_log_position: cursor.read_i64()?,
            log_position: cursor.read_i64()?,
            service_id: cursor.read_i32()?,
        });
    }

    let cluster_members_string = cursor.read_string()?;

    Ok(BackupResponse {
        correlation_id,
        log_recording_id,
        log_leadership_term_id,
        log_term_base_log_position,
        last_leadership_term_id,
        last_term_base_log_position,
        commit_position_counter_id,
        leader_member_id,
        snapshots,
        cluster_members_string,
    })
}

/// Encodes a `BackupResponse` body (used by test doubles acting as the
/// consensus leader).
pub fn encode_backup_response(response: &BackupResponse) -> Vec<u8> {
    let mut out = Vec::new();
    MessageHeader {
        schema_id: SCHEMA_ID,
        template_id: TEMPLATE_ID_BACKUP_RESPONSE,
        block_length: 0,
        version: 0,
    }
    .encode(&mut out);

    out.extend_from_slice(&response.correlation_id.to_le_bytes());
    out.extend_from_slice(&response.log_recording_id.to_le_bytes());
    out.extend_from_slice(&response.log_leadership_term_id.to_le_bytes());
    out.extend_from_slice(&response.log_term_base_log_position.to_le_bytes());
    out.extend_from_slice(&response.last_leadership_term_id.to_le_bytes());
    out.extend_from_slice(&response.last_term_base_log_position.to_le_bytes());
    out.extend_from_slice(&response.commit_position_counter_id.to_le_bytes());
    out.extend_from_slice(&response.leader_member_id.to_le_bytes());

    out.extend_from_slice(&(response.snapshots.len() as u32).to_le_bytes());
    for s in &response.snapshots {
        out.extend_from_slice(&s.recording_id.to_le_bytes());
        out.extend_from_slice(&s.leadership_term_id.to_le_bytes());
        out.extend_from_slice(&s.term_base_log_position.to_le_bytes());
        out.extend_from_slice(&s.log_position.to_le_bytes());
        out.extend_from_slice(&s.service_id.to_le_bytes());
    }

    out.extend_from_slice(&(response.cluster_members_string.len() as u32).to_le_bytes());
    out.extend_from_slice(response.cluster_members_string.as_bytes());

    out
}

struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.offset + n > self.buf.len() {
            return Err(err_msg("backup response body truncated"));
        }
        let out = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(out)
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| err_msg("invalid utf-8 in string field"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_backup_response() {
        let response = BackupResponse {
            correlation_id: 42,
            log_recording_id: 11,
            log_leadership_term_id: 3,
            log_term_base_log_position: 0,
            last_leadership_term_id: 3,
            last_term_base_log_position: 0,
            commit_position_counter_id: 7,
            leader_member_id: 1,
            snapshots: vec![SnapshotDescriptor {
                recording_id: 10,
                leadership_term_id: 3,
                term_base_log_position: 0,
                log_position: 4096,
                service_id: -1,
            }],
            cluster_members_string: "0|a:9000|a:9010;1|b:9000|b:9010".to_string(),
        };

        let encoded = encode_backup_response(&response);
        let header = MessageHeader::decode(&encoded).unwrap();
        header.verify_schema().unwrap();
        assert_eq!(header.template_id, TEMPLATE_ID_BACKUP_RESPONSE);

        let decoded = decode_backup_response(&encoded[HEADER_LENGTH..]).unwrap();
        assert_eq!(decoded.correlation_id, 42);
        assert_eq!(decoded.snapshots.len(), 1);
        assert_eq!(decoded.snapshots[0].log_position, 4096);
        assert_eq!(decoded.cluster_members_string, response.cluster_members_string);
    }

    #[test]
    fn round_trips_backup_query() {
        let query = BackupQuery {
            correlation_id: 7,
            response_stream_id: 10,
            protocol_semantic_version: 1,
            response_channel: "127.0.0.1:9020".to_string(),
            encoded_credentials: vec![1, 2, 3],
        };

        let encoded = query.encode();
        let header = MessageHeader::decode(&encoded).unwrap();
        header.verify_schema().unwrap();
        assert_eq!(header.template_id, TEMPLATE_ID_BACKUP_QUERY);

        let decoded = decode_backup_query(&encoded[HEADER_LENGTH..]).unwrap();
        assert_eq!(decoded, query);
    }

    #[test]
    fn rejects_mismatched_schema() {
        let mut buf = Vec::new();
        MessageHeader {
            schema_id: SCHEMA_ID + 1,
            template_id: TEMPLATE_ID_BACKUP_RESPONSE,
            block_length: 0,
            version: 0,
        }
        .encode(&mut buf);

        let header = MessageHeader::decode(&buf).unwrap();
        assert!(header.verify_schema().is_err());
    }
}
