// ABOUTME: Optional on-disk log of everything a session reads.
// ABOUTME: Appends either the cleaned text or the raw bytes from the channel, flushed per chunk.

use super::error::Result;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

/// What a transcript records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptMode {
    /// Text after escape sequences and carriage returns are removed.
    #[default]
    Text,
    /// Bytes exactly as received from the channel.
    Raw,
}

/// Where and how to record a session transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptConfig {
    pub path: PathBuf,
    pub mode: TranscriptMode,
}

impl TranscriptConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: TranscriptMode::Text,
        }
    }

    pub fn raw(mut self) -> Self {
        self.mode = TranscriptMode::Raw;
        self
    }
}

pub(crate) struct Transcript {
    mode: TranscriptMode,
    writer: BufWriter<File>,
}

impl Transcript {
    pub(crate) async fn create(config: &TranscriptConfig) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .await?;
        Ok(Self {
            mode: config.mode,
            writer: BufWriter::new(file),
        })
    }

    pub(crate) async fn record(&mut self, raw: &[u8], text: &str) -> Result<()> {
        match self.mode {
            TranscriptMode::Raw => self.writer.write_all(raw).await?,
            TranscriptMode::Text => self.writer.write_all(text.as_bytes()).await?,
        }
        self.writer.flush().await?;
        Ok(())
    }

    pub(crate) async fn finish(mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}
