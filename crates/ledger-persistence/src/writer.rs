//! JSON Lines writer for reconstructed positions.
//!
//! - `closed_positions.jsonl` is append-only and idempotent: a position key
//!   already present in the file is never written twice, so re-importing
//!   overlapping history is safe.
//! - `open_positions.jsonl` is a snapshot, replaced on every write.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use ledger_core::{ClosedPosition, OpenPosition};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::PersistenceResult;

pub const CLOSED_FILE: &str = "closed_positions.jsonl";
pub const OPEN_FILE: &str = "open_positions.jsonl";

/// Only the key is needed to rebuild the seen-set.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyOnly {
    position_key: String,
}

/// Position writer rooted at an output directory.
pub struct PositionWriter {
    base_dir: PathBuf,
    /// Keys already present in the closed-positions file.
    known_keys: HashSet<String>,
    /// Distinct positions dropped because another position in the same
    /// batch carried the same key.
    collisions: u64,
}

impl PositionWriter {
    /// Open (creating if needed) the output directory and index existing keys.
    pub fn open(base_dir: impl AsRef<Path>) -> PersistenceResult<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;

        let mut known_keys = HashSet::new();
        let closed_path = base_dir.join(CLOSED_FILE);
        if closed_path.exists() {
            let reader = BufReader::new(File::open(&closed_path)?);
            for (line_no, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<KeyOnly>(&line) {
                    Ok(record) => {
                        known_keys.insert(record.position_key);
                    }
                    Err(e) => warn!(?e, line = line_no + 1, "Corrupt closed-position line"),
                }
            }
        }

        info!(
            dir = %base_dir.display(),
            known = known_keys.len(),
            "Opened position writer"
        );

        Ok(Self {
            base_dir,
            known_keys,
            collisions: 0,
        })
    }

    pub fn closed_path(&self) -> PathBuf {
        self.base_dir.join(CLOSED_FILE)
    }

    pub fn open_path(&self) -> PathBuf {
        self.base_dir.join(OPEN_FILE)
    }

    pub fn is_known(&self, position_key: &str) -> bool {
        self.known_keys.contains(position_key)
    }

    pub fn collisions(&self) -> u64 {
        self.collisions
    }

    /// Append closed positions not yet on disk. Returns how many were written.
    pub fn write_closed(&mut self, positions: &[ClosedPosition]) -> PersistenceResult<usize> {
        let mut written = 0;
        let mut batch_keys = HashSet::new();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.closed_path())?;
        let mut writer = BufWriter::new(file);

        for position in positions {
            let key = position.position_key.to_string();
            if !batch_keys.insert(key.clone()) {
                // Two sessions opened in the same millisecond share a key
                self.collisions += 1;
                warn!(position_key = %key, "Position key collision within batch, dropping");
                continue;
            }
            if self.known_keys.contains(&key) {
                debug!(position_key = %key, "Closed position already persisted");
                continue;
            }
            writeln!(writer, "{}", serde_json::to_string(position)?)?;
            self.known_keys.insert(key);
            written += 1;
        }

        // Flush to disk immediately
        writer.flush()?;

        debug!(
            written,
            skipped = positions.len() - written,
            "Flushed closed positions"
        );
        Ok(written)
    }

    /// Replace the open-positions snapshot.
    pub fn write_open_snapshot(&self, positions: &[OpenPosition]) -> PersistenceResult<()> {
        let target = self.open_path();
        let tmp = self
            .base_dir
            .join(format!("{OPEN_FILE}.{}.tmp", Utc::now().timestamp_millis()));

        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            for position in positions {
                writeln!(writer, "{}", serde_json::to_string(position)?)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &target)?;

        debug!(count = positions.len(), "Wrote open-position snapshot");
        Ok(())
    }
}
