//! JSONL event log files
//!
//! One [`LogRecord`] per line, sessions interleaved in arrival order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::events::LogRecord;

#[derive(Debug, thiserror::Error)]
pub enum LogFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse JSONL text. Blank lines are skipped; line numbers are 1-based.
pub fn parse_jsonl(text: &str) -> Result<Vec<LogRecord>, LogFileError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| LogFileError::Parse {
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Load a JSONL log file
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Vec<LogRecord>, LogFileError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LogFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_jsonl(&text)
}

/// Render records as JSONL, one per line
pub fn to_jsonl(records: &[LogRecord]) -> Result<String, serde_json::Error> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

/// Split records by session id, sessions in first-seen order, records in log order
pub fn group_sessions(records: Vec<LogRecord>) -> Vec<(String, Vec<LogRecord>)> {
    let mut sessions: Vec<(String, Vec<LogRecord>)> = Vec::new();
    for record in records {
        match sessions.iter_mut().find(|(id, _)| *id == record.session) {
            Some((_, list)) => list.push(record),
            None => sessions.push((record.session.clone(), vec![record])),
        }
    }
    sessions
}
