use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use common::errors::*;

/// Local liveness heartbeat file: a single 8-byte little-endian millisecond
/// timestamp, overwritten in place on every tick where time has advanced.
///
/// Mirrors the teacher's habit of tracking node/worker liveness via a small
/// local record (`pkg/container/src/node`) rather than anything networked.
pub struct MarkFile {
    file: File,
    path: PathBuf,
}

impl MarkFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn update_activity_timestamp(&mut self, now_ms: i64) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&now_ms.to_le_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn writes_and_reads_back_timestamp() {
        let dir = std::env::temp_dir().join(format!("cluster_backup_markfile_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cluster-mark.dat");

        let mut mf = MarkFile::open(&path).unwrap();
        mf.update_activity_timestamp(12345).unwrap();

        let mut contents = Vec::new();
        File::open(&path).unwrap().read_to_end(&mut contents).unwrap();
        let value = i64::from_le_bytes(contents[0..8].try_into().unwrap());
        assert_eq!(value, 12345);

        std::fs::remove_dir_all(&dir).ok();
    }
}
