use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// An entry in the snapshot log: a named, ordered set of sealed segment
/// ids with a logical timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    pub snapshot_id: u64,
    pub timestamp_ms: i64,
    pub sealed_segment_ids: Vec<u64>,
}

/// Append-only, monotonically growing snapshot log.
///
/// Every commit also appends a JSON line to `snapshots.log` under the
/// data dir as an audit sidecar. Reopen derives state from the segment
/// files, not from this log, so a lost sidecar only loses history.
#[derive(Debug)]
pub struct SnapshotLog {
    snapshots: Vec<Snapshot>,
    log_path: PathBuf,
}

impl SnapshotLog {
    pub fn new(data_dir: &Path) -> Self {
        SnapshotLog {
            snapshots: Vec::new(),
            log_path: data_dir.join("snapshots.log"),
        }
    }

    /// Commit a new snapshot naming the current sealed segment list.
    pub fn commit(&mut self, sealed_segment_ids: Vec<u64>) -> &Snapshot {
        let snapshot = Snapshot {
            snapshot_id: self.snapshots.len() as u64,
            timestamp_ms: current_timestamp_ms(),
            sealed_segment_ids,
        };

        if let Ok(line) = serde_json::to_string(&snapshot) {
            let appended = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)
                .and_then(|mut f| writeln!(f, "{}", line));
            if let Err(e) = appended {
                tracing::warn!("snapshot log append failed: {}", e);
            }
        }

        tracing::debug!(
            snapshot_id = snapshot.snapshot_id,
            segments = snapshot.sealed_segment_ids.len(),
            "committed snapshot"
        );
        self.snapshots.push(snapshot);
        self.snapshots.last().unwrap()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, snapshot_id: u64) -> Option<&Snapshot> {
        self.snapshots.get(snapshot_id as usize)
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }
}

fn current_timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_ids_strictly_increasing() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SnapshotLog::new(dir.path());

        log.commit(vec![]);
        log.commit(vec![0]);
        log.commit(vec![0, 1]);

        assert_eq!(log.len(), 3);
        for (i, id) in (0..3).enumerate() {
            assert_eq!(log.get(id).unwrap().snapshot_id, i as u64);
        }
        assert_eq!(log.latest().unwrap().sealed_segment_ids, vec![0, 1]);
    }

    #[test]
    fn test_sidecar_written_as_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SnapshotLog::new(dir.path());
        log.commit(vec![]);
        log.commit(vec![3]);

        let contents = std::fs::read_to_string(dir.path().join("snapshots.log")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: Snapshot = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.snapshot_id, 1);
        assert_eq!(parsed.sealed_segment_ids, vec![3]);
    }

    #[test]
    fn test_unknown_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let log = SnapshotLog::new(dir.path());
        assert!(log.get(0).is_none());
    }
}
