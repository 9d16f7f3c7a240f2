use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// One human evaluation submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Submission time, epoch millis
    pub ts: i64,
    pub seed: i64,
    pub base_id: String,
    pub selected_ids: Vec<String>,
}

impl FeedbackRecord {
    pub fn now(seed: i64, base_id: String, selected_ids: Vec<String>) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp_millis(),
            seed,
            base_id,
            selected_ids,
        }
    }
}

/// Append-only JSONL log of evaluation feedback.
///
/// Every record goes out as one `write_all` of a full line on a file opened
/// in append mode, so concurrent writers never interleave partial lines.
/// The file is opened on first append; a failed write drops the handle so
/// the next append reopens it.
pub struct FeedbackLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FeedbackLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(path: &Path) -> Result<File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening {}", path.display()))
    }

    /// Append one record as a single line
    pub fn append(&self, record: &FeedbackRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.file.lock();
        if file.is_none() {
            *file = Some(Self::open(&self.path)?);
        }
        if let Some(f) = file.as_mut() {
            if let Err(e) = f.write_all(&line).and_then(|()| f.flush()) {
                *file = None;
                return Err(e).with_context(|| format!("writing {}", self.path.display()));
            }
        }
        Ok(())
    }

    /// Flush appended records to disk
    pub fn sync(&self) -> Result<()> {
        if let Some(f) = self.file.lock().as_ref() {
            f.sync_data()?;
        }
        Ok(())
    }

    /// Read every well-formed record back, oldest first
    pub fn read_all(&self) -> Result<Vec<FeedbackRecord>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Ok(record) = serde_json::from_str(&line) {
                records.push(record);
            }
        }
        Ok(records)
    }
}
