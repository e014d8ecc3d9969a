extern crate common;
#[macro_use]
extern crate macros;
extern crate cluster_backup;

use std::thread;
use std::time::Duration;

use common::errors::*;

use cluster_backup::archive::fake::{FakeArchiveClient, FakeArchiveConnector};
use cluster_backup::clock::SystemEpochClock;
use cluster_backup::consensus::fake::{FakeConsensusChannel, FakeConsensusPublication, FakeConsensusSubscription};
use cluster_backup::counters::CountersManager;
use cluster_backup::mark_file::MarkFile;
use cluster_backup::recording_log::RecordingLog;
use cluster_backup::{Agent, ClusterBackupArgs, Config, NullEventsListener};

/// Runs the backup agent's duty cycle forever, sleeping briefly between
/// ticks when there was no work to do. A real deployment invokes `do_work`
/// from whatever scheduler also drives the node's other agents (see
/// `pkg/container/src/bin/cluster.rs` for the equivalent top-level run
/// loop); this binary stands alone.
fn run(config: Config) -> Result<()> {
    std::fs::create_dir_all(&config.cluster_dir)?;

    let recording_log = RecordingLog::open(config.recording_log_path())?;
    let mark_file = MarkFile::open(config.mark_file_path())?;

    // The consensus wire protocol and archive control protocol are
    // out-of-scope external collaborators (see spec §1); this binary wires
    // up the in-memory doubles so the agent can be exercised standalone.
    // A production deployment supplies real network-backed implementations
    // of `ConsensusPublication`/`ConsensusSubscription`/`ArchiveClient`.
    let counters = CountersManager::new();
    let channel = FakeConsensusChannel::new();
    let consensus_publication = Box::new(FakeConsensusPublication::new(channel.clone()));
    let consensus_subscription = Box::new(FakeConsensusSubscription::new(channel));
    let backup_archive = Box::new(FakeArchiveClient::new(counters.clone()));
    let archive_connector = Box::new(FakeArchiveConnector::new(counters.clone()));

    let mut agent = Agent::new(
        config,
        Box::new(SystemEpochClock),
        recording_log,
        mark_file,
        counters,
        Box::new(NullEventsListener),
        consensus_publication,
        consensus_subscription,
        backup_archive,
        archive_connector,
    );

    loop {
        let work = agent.do_work()?;
        if work == 0 {
            thread::sleep(Duration::from_millis(10));
        }
    }
}

fn main() -> Result<()> {
    let args = common::args::parse_args::<ClusterBackupArgs>()?;
    let config = Config::from_args(&args)?;
    run(config)
}
