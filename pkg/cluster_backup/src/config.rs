use std::path::PathBuf;
use std::time::Duration;

use common::errors::*;

use crate::model::ClusterMember;

/// Command-line arguments, parsed via the same `#[derive(Args)]` +
/// `common::args::parse_args` convention the teacher's other binaries use
/// (see `pkg/container/src/bin/cluster_node_setup.rs`).
#[derive(Args)]
pub struct ClusterBackupArgs {
    /// Comma-separated `id|consensusEndpoint|archiveEndpoint` triples for the
    /// candidate consensus endpoints to probe.
    pub cluster_consensus_endpoints: String,

    /// Directory used for the durable recording log and mark file.
    pub cluster_dir: String,

    /// Endpoint this agent's local archive listens for replay connections
    /// on.
    pub catchup_endpoint: String,

    #[arg(default = 5000)]
    pub backup_response_timeout_ms: u64,

    #[arg(default = 60000)]
    pub backup_interval_ms: u64,

    #[arg(default = 30000)]
    pub backup_progress_timeout_ms: u64,

    #[arg(default = 5000)]
    pub backup_cool_down_interval_ms: u64,

    #[arg(default = 10)]
    pub consensus_stream_id: i32,

    #[arg(default = 11)]
    pub replay_stream_id: i32,

    #[arg(default = 12)]
    pub log_stream_id: i32,
}

/// Resolved configuration, built from `ClusterBackupArgs` plus derived
/// paths. Kept distinct from the raw args struct so the rest of the agent
/// never has to re-parse strings or re-derive paths.
pub struct Config {
    pub cluster_consensus_endpoints: Vec<String>,
    pub cluster_dir: PathBuf,
    pub catchup_endpoint: String,
    pub consensus_stream_id: i32,
    pub replay_stream_id: i32,
    pub log_stream_id: i32,

    pub backup_response_timeout_ms: i64,
    pub backup_interval_ms: i64,
    pub backup_progress_timeout_ms: i64,
    pub backup_cool_down_interval_ms: i64,
}

impl Config {
    pub fn from_args(args: &ClusterBackupArgs) -> Result<Self> {
        let endpoints: Vec<String> = args
            .cluster_consensus_endpoints
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if endpoints.is_empty() {
            return Err(err_msg("cluster_consensus_endpoints must name at least one endpoint"));
        }

        Ok(Self {
            cluster_consensus_endpoints: endpoints,
            cluster_dir: PathBuf::from(&args.cluster_dir),
            catchup_endpoint: args.catchup_endpoint.clone(),
            consensus_stream_id: args.consensus_stream_id,
            replay_stream_id: args.replay_stream_id,
            log_stream_id: args.log_stream_id,
            backup_response_timeout_ms: args.backup_response_timeout_ms as i64,
            backup_interval_ms: args.backup_interval_ms as i64,
            backup_progress_timeout_ms: args.backup_progress_timeout_ms as i64,
            backup_cool_down_interval_ms: args.backup_cool_down_interval_ms as i64,
        })
    }

    pub fn recording_log_path(&self) -> PathBuf {
        self.cluster_dir.join("backup-recording.log")
    }

    pub fn mark_file_path(&self) -> PathBuf {
        self.cluster_dir.join("cluster-backup-mark.dat")
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.backup_response_timeout_ms as u64)
    }
}

/// Parses a config's raw consensus-endpoint members list the same way a
/// `BackupResponse`'s cluster-members string is parsed, so the initial
/// candidate endpoint list and the post-query membership share one format.
pub fn parse_consensus_members(raw: &str) -> Result<Vec<ClusterMember>> {
    ClusterMember::parse_list(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_endpoint_list() {
        let args = ClusterBackupArgs {
            cluster_consensus_endpoints: "  ,  ".to_string(),
            cluster_dir: "/tmp/x".to_string(),
            catchup_endpoint: "127.0.0.1:9020".to_string(),
            backup_response_timeout_ms: 5000,
            backup_interval_ms: 60000,
            backup_progress_timeout_ms: 30000,
            backup_cool_down_interval_ms: 5000,
            consensus_stream_id: 10,
            replay_stream_id: 11,
            log_stream_id: 12,
        };
        assert!(Config::from_args(&args).is_err());
    }

    #[test]
    fn splits_csv_endpoints() {
        let args = ClusterBackupArgs {
            cluster_consensus_endpoints: "a:9000, b:9000 ,c:9000".to_string(),
            cluster_dir: "/tmp/x".to_string(),
            catchup_endpoint: "127.0.0.1:9020".to_string(),
            backup_response_timeout_ms: 5000,
            backup_interval_ms: 60000,
            backup_progress_timeout_ms: 30000,
            backup_cool_down_interval_ms: 5000,
            consensus_stream_id: 10,
            replay_stream_id: 11,
            log_stream_id: 12,
        };
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.cluster_consensus_endpoints, vec!["a:9000", "b:9000", "c:9000"]);
    }
}
