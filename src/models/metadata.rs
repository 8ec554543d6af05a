use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 下载进度元数据（`download_metadata.json`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadMetadata {
    #[serde(default)]
    pub downloaded: BTreeMap<String, DownloadEntry>,
    #[serde(default)]
    pub failed: BTreeMap<String, FailedEntry>,
    /// 最后处理的ID，尚未开始时为 `start_id - 1`
    pub last_processed: i64,
    #[serde(default)]
    pub total_downloaded: usize,
    #[serde(default)]
    pub total_failed: usize,
}

impl DownloadMetadata {
    pub fn new(start_id: u64) -> Self {
        Self {
            downloaded: BTreeMap::new(),
            failed: BTreeMap::new(),
            last_processed: start_id as i64 - 1,
            total_downloaded: 0,
            total_failed: 0,
        }
    }

    pub fn record_success(&mut self, test_id: u64, status_code: u16, content_length: usize) {
        let key = test_id.to_string();
        self.failed.remove(&key);
        self.downloaded.insert(
            key,
            DownloadEntry {
                timestamp: chrono::Utc::now().to_rfc3339(),
                status_code,
                content_length,
            },
        );
    }

    pub fn record_failure(&mut self, test_id: u64, error: impl Into<String>, status_code: Option<u16>) {
        self.failed.insert(
            test_id.to_string(),
            FailedEntry {
                timestamp: chrono::Utc::now().to_rfc3339(),
                error: error.into(),
                status_code,
            },
        );
    }

    /// 更新进度并重新计算总数
    pub fn mark_processed(&mut self, test_id: u64) {
        self.last_processed = test_id as i64;
        self.total_downloaded = self.downloaded.len();
        self.total_failed = self.failed.len();
    }

    /// 下一次应当开始的ID
    pub fn resume_from(&self, start_id: u64) -> u64 {
        let next = self.last_processed + 1;
        if next < 0 {
            start_id
        } else {
            (next as u64).max(start_id)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub timestamp: String,
    pub status_code: u16,
    pub content_length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedEntry {
    pub timestamp: String,
    pub error: String,
    pub status_code: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_from_fresh_metadata() {
        let metadata = DownloadMetadata::new(0);
        assert_eq!(metadata.last_processed, -1);
        assert_eq!(metadata.resume_from(0), 0);
        assert_eq!(metadata.resume_from(500), 500);
    }

    #[test]
    fn test_success_clears_previous_failure() {
        let mut metadata = DownloadMetadata::new(10);
        metadata.record_failure(12, "HTTP 503", Some(503));
        metadata.mark_processed(12);
        assert_eq!(metadata.total_failed, 1);

        metadata.record_success(12, 200, 1024);
        metadata.mark_processed(12);
        assert_eq!(metadata.total_failed, 0);
        assert_eq!(metadata.total_downloaded, 1);
        assert_eq!(metadata.resume_from(10), 13);
    }
}
