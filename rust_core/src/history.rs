// rust_core/src/history.rs
// Battle history. Append-only, scanned linearly.
// The trait is the seam: the scorer only ever asks for "append", "the last n"
// and "everything matching". An indexed store can slot in behind it later.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::error::{CoreError, CoreResult};
use crate::models::BattleRecord;

pub trait HistoryStore {
    /// Stores the record under the next id and returns the stored copy.
    fn append(&mut self, record: BattleRecord) -> CoreResult<BattleRecord>;

    /// Oldest first.
    fn all(&self) -> &[BattleRecord];

    /// The most recent `n` records, oldest first.
    fn recent(&self, n: usize) -> &[BattleRecord] {
        let all = self.all();
        &all[all.len().saturating_sub(n)..]
    }

    fn filter(&self, predicate: &dyn Fn(&BattleRecord) -> bool) -> Vec<&BattleRecord> {
        self.all().iter().filter(|r| predicate(r)).collect()
    }

    fn len(&self) -> usize {
        self.all().len()
    }

    fn is_empty(&self) -> bool {
        self.all().is_empty()
    }
}

fn next_id_after(records: &[BattleRecord]) -> u64 {
    let max_id = records.iter().map(|r| r.id).max().unwrap_or(0);
    max_id.max(records.len() as u64) + 1
}

// --- IN MEMORY ---

#[derive(Debug, Default, Clone)]
pub struct MemoryHistory {
    records: Vec<BattleRecord>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&mut self, mut record: BattleRecord) -> CoreResult<BattleRecord> {
        record.id = next_id_after(&self.records);
        self.records.push(record.clone());
        Ok(record)
    }

    fn all(&self) -> &[BattleRecord] {
        &self.records
    }
}

// --- JSON LINES FILE ---

/// One JSON record per line. Each append is a single write of a whole line
/// followed by fsync, so an interrupted process leaves at most one torn line,
/// which the next load skips.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    records: Vec<BattleRecord>,
    // Set when the file ends mid-line (torn write).
    needs_newline: bool,
}

impl JsonlHistory {
    pub fn open(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();

        if !path.exists() {
            info!("No battle history at {}, starting fresh", path.display());
            return Ok(Self {
                path,
                records: Vec::new(),
                needs_newline: false,
            });
        }

        // Bytes, not a String: a torn write can cut a multi-byte character.
        let raw = fs::read(&path).map_err(|e| CoreError::io(&path, e))?;
        let mut records = Vec::new();
        for (line_no, line) in raw.split(|&b| b == b'\n').enumerate() {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<BattleRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Skipping unreadable history line {} in {}: {}",
                    line_no + 1,
                    path.display(),
                    e
                ),
            }
        }
        info!("Loaded {} battles from {}", records.len(), path.display());

        Ok(Self {
            needs_newline: raw.last().is_some_and(|&b| b != b'\n'),
            path,
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonlHistory {
    fn append(&mut self, mut record: BattleRecord) -> CoreResult<BattleRecord> {
        record.id = next_id_after(&self.records);

        let mut line = String::new();
        if self.needs_newline {
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(&record)?);
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CoreError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|e| CoreError::io(&self.path, e))?;

        self.needs_newline = false;
        self.records.push(record.clone());
        Ok(record)
    }

    fn all(&self) -> &[BattleRecord] {
        &self.records
    }
}
