use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

/// What the search emits for a terminal result the caller accepts.
#[derive(Debug, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub file_name: String,
    pub target_hash: Option<String>,
    pub file_size: Option<u64>,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub score: f32,
    pub outro_length_seconds: f64,
}

/// Storage boundary for detection results. Schema and persistence belong
/// to the implementation, not the search.
pub trait ResultSink {
    fn save(&mut self, record: &DetectionRecord) -> Result<()>;

    /// Whether a result for this file name or content hash already exists.
    fn contains(&self, file_name: &str, target_hash: Option<&str>) -> bool;
}

/// Append-only JSON-lines sink, one record per line.
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ResultSink for JsonLinesSink {
    fn save(&mut self, record: &DetectionRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open results file: {}", self.path.display()))?;

        let line = serde_json::to_string(record).context("Failed to serialize result")?;
        writeln!(file, "{}", line)
            .with_context(|| format!("Failed to write result to {}", self.path.display()))?;

        log::info!("Saved result to {}", self.path.display());
        Ok(())
    }

    fn contains(&self, file_name: &str, target_hash: Option<&str>) -> bool {
        let Ok(file) = std::fs::File::open(&self.path) else {
            return false;
        };
        for line in BufReader::new(file).lines() {
            let Ok(line) = line else { break };
            let Ok(record) = serde_json::from_str::<DetectionRecord>(&line) else {
                continue;
            };
            if record.file_name == file_name {
                return true;
            }
            if let (Some(existing), Some(wanted)) = (record.target_hash.as_deref(), target_hash) {
                if existing == wanted {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, hash: &str) -> DetectionRecord {
        DetectionRecord {
            file_name: name.to_string(),
            target_hash: Some(hash.to_string()),
            file_size: Some(1000),
            start_seconds: 20.0,
            end_seconds: 25.0,
            score: 0.91,
            outro_length_seconds: 0.0,
        }
    }

    #[test]
    fn save_then_lookup_by_name_and_hash() {
        let path = std::env::temp_dir().join("introseek-sink-test.jsonl");
        std::fs::remove_file(&path).ok();

        let mut sink = JsonLinesSink::new(path.clone());
        assert!(!sink.contains("ep01.mkv", Some("deadbeef00000000")));

        sink.save(&record("ep01.mkv", "deadbeef00000000")).unwrap();
        assert!(sink.contains("ep01.mkv", None));
        assert!(sink.contains("renamed.mkv", Some("deadbeef00000000")));
        assert!(!sink.contains("ep02.mkv", Some("feedface00000000")));

        std::fs::remove_file(path).ok();
    }
}
