//! Persisted run artifacts: `transcript.log` and `last_response.json`.
//!
//! The log is appended after every step so a crashed or killed run still
//! leaves a readable record. The JSON summary is written once at the end.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::core::transcript::Transcript;
use crate::core::types::{RunResult, Turn};
use crate::io::config::write_atomic;

#[derive(Debug, Clone)]
pub struct TranscriptPaths {
    pub dir: PathBuf,
    pub log_path: PathBuf,
    pub response_path: PathBuf,
}

impl TranscriptPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            log_path: dir.join("transcript.log"),
            response_path: dir.join("last_response.json"),
        }
    }
}

#[derive(Serialize)]
struct LastResponse<'a> {
    result: &'a RunResult,
    turns: &'a [Turn],
}

/// Writer for one run's artifacts. Not shared between runs.
#[derive(Debug)]
pub struct TranscriptStore {
    paths: TranscriptPaths,
    persisted: usize,
}

impl TranscriptStore {
    /// Create the output directory and start a fresh `transcript.log`.
    pub fn create(dir: &Path) -> Result<Self> {
        let paths = TranscriptPaths::new(dir);
        fs::create_dir_all(&paths.dir)
            .with_context(|| format!("create output dir {}", paths.dir.display()))?;
        let started = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        fs::write(
            &paths.log_path,
            format!("# verigen transcript\n# started: {started}\n"),
        )
        .with_context(|| format!("write {}", paths.log_path.display()))?;
        info!(log = %paths.log_path.display(), "transcript started");
        Ok(Self {
            paths,
            persisted: 0,
        })
    }

    pub fn paths(&self) -> &TranscriptPaths {
        &self.paths
    }

    /// Append every turn added since the previous sync.
    pub fn sync(&mut self, transcript: &Transcript) -> Result<()> {
        let pending = transcript.turns().get(self.persisted..).unwrap_or_default();
        if pending.is_empty() {
            return Ok(());
        }
        let mut buf = String::new();
        for (offset, turn) in pending.iter().enumerate() {
            buf.push_str(&format!(
                "\n=== [{}] {} ===\n{}\n",
                self.persisted + offset,
                turn.label(),
                turn.text().trim_end()
            ));
        }
        self.append(&buf)?;
        debug!(turns = pending.len(), "synced transcript");
        self.persisted = transcript.len();
        Ok(())
    }

    /// Flush remaining turns, record the result and write `last_response.json`.
    pub fn finish(mut self, transcript: &Transcript, result: &RunResult) -> Result<TranscriptPaths> {
        self.sync(transcript)?;
        let result_json =
            serde_json::to_string_pretty(result).context("serialize run result")?;
        self.append(&format!("\n=== RESULT ===\n{result_json}\n"))?;

        let mut buf = serde_json::to_string_pretty(&LastResponse {
            result,
            turns: transcript.turns(),
        })
        .context("serialize last response")?;
        buf.push('\n');
        write_atomic(&self.paths.response_path, &buf)?;
        info!(path = %self.paths.response_path.display(), "wrote last response");
        Ok(self.paths)
    }

    fn append(&self, text: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.paths.log_path)
            .with_context(|| format!("open {}", self.paths.log_path.display()))?;
        file.write_all(text.as_bytes())
            .with_context(|| format!("append {}", self.paths.log_path.display()))
    }
}
