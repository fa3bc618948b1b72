//! Per-call conversation transcripts
//!
//! Appends are best effort: callers spawn them and only log failures.

use async_trait::async_trait;
use media_gateway_config::ConversationLogConfig;
use media_gateway_core::{ConversationEntry, ConversationLog, Error, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// One text file per call under `directory`
pub struct FileConversationLog {
    directory: PathBuf,
}

impl FileConversationLog {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// `{sanitized}-{hash}.txt`; the hash of the raw id keeps ids that
    /// sanitize alike apart
    pub fn path_for(&self, call_id: &str) -> PathBuf {
        let safe: String = call_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.directory
            .join(format!("{}-{:08x}.txt", safe, fnv1a(call_id.as_bytes()) as u32))
    }
}

/// 64-bit FNV-1a, stable across builds and platforms
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl ConversationLog for FileConversationLog {
    async fn append(&self, call_id: &str, entry: &ConversationEntry) -> Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| Error::Storage(format!("{}: {}", self.directory.display(), e)))?;

        let path = self.path_for(call_id);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Error::Storage(format!("{}: {}", path.display(), e)))?;
        file.write_all(entry.format_line().as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Discards every entry
pub struct NullConversationLog;

#[async_trait]
impl ConversationLog for NullConversationLog {
    async fn append(&self, _call_id: &str, _entry: &ConversationEntry) -> Result<()> {
        Ok(())
    }
}

pub fn create_conversation_log(config: &ConversationLogConfig) -> Arc<dyn ConversationLog> {
    if config.enabled {
        tracing::info!(directory = %config.directory, "Conversation logging enabled");
        Arc::new(FileConversationLog::new(&config.directory))
    } else {
        Arc::new(NullConversationLog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_gateway_core::Speaker;

    #[tokio::test]
    async fn test_appends_lines_per_call() {
        let dir = tempfile::tempdir().unwrap();
        let log = FileConversationLog::new(dir.path().join("calls"));

        log.append("call-1", &ConversationEntry::now(Speaker::Caller, "I need an appointment"))
            .await
            .unwrap();
        log.append("call-1", &ConversationEntry::now(Speaker::Agent, "Sure, when?"))
            .await
            .unwrap();
        log.append("call-2", &ConversationEntry::now(Speaker::Caller, "Hello"))
            .await
            .unwrap();

        let first = std::fs::read_to_string(log.path_for("call-1")).unwrap();
        let lines: Vec<&str> = first.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] User: I need an appointment"));
        assert!(lines[1].ends_with("] AI: Sure, when?"));
        assert!(log.path_for("call-2").exists());
    }

    #[test]
    fn test_call_id_cannot_escape_directory() {
        let log = FileConversationLog::new("/var/log/calls");
        let path = log.path_for("../../etc/passwd");
        assert_eq!(path.parent(), Some(std::path::Path::new("/var/log/calls")));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("______etc_passwd-"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_similar_call_ids_get_distinct_files() {
        let log = FileConversationLog::new("/var/log/calls");
        let slashed = log.path_for("a/b");
        let underscored = log.path_for("a_b");
        assert_ne!(slashed, underscored);
        assert_ne!(log.path_for("a:b"), slashed);

        // Stable for the same id
        assert_eq!(log.path_for("a/b"), slashed);
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[tokio::test]
    async fn test_disabled_log_is_noop() {
        let log = create_conversation_log(&ConversationLogConfig::default());
        log.append("call-1", &ConversationEntry::now(Speaker::Agent, "hi"))
            .await
            .unwrap();
    }
}
