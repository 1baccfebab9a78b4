//! Unanswered-question log
//!
//! Append-only text file, one question per line, for offline review of
//! documentation gaps. Writes are best effort.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

/// Log of questions the bot could not answer
#[derive(Debug, Clone)]
pub struct UnansweredLog {
    path: Option<PathBuf>,
}

impl UnansweredLog {
    /// Log writing to `path`; an empty path disables it
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            path: if path.as_os_str().is_empty() {
                None
            } else {
                Some(path.to_path_buf())
            },
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one question; failures are logged and swallowed
    pub async fn record(&self, question: &str) {
        let Some(path) = &self.path else {
            return;
        };

        let line = question.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            return;
        }

        if let Err(e) = append_line(path, &line).await {
            tracing::warn!(error = %e, path = %path.display(), "Failed to record unanswered question");
        }
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await
}
