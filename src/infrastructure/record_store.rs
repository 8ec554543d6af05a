//! 记录存储 - 基础设施层
//!
//! 一个 JSON 文件，每行记录由 `(test_id, question_idx)` 唯一确定。
//! 所有写入都经过同一把锁，保证同一页面的记录顺序确定。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, StorageError};
use crate::models::{Record, StoredRecord};

type RecordKey = (u64, usize);

/// 记录存储
pub struct RecordStore {
    path: PathBuf,
    records: Mutex<BTreeMap<RecordKey, StoredRecord>>,
    /// 自上次写回以来是否有改动
    dirty: AtomicBool,
}

impl RecordStore {
    /// 打开存储文件，不存在时创建空存储
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let records = match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => {
                let rows: Vec<StoredRecord> =
                    serde_json::from_str(&content).map_err(|source| StorageError::Corrupted {
                        path: path.display().to_string(),
                        source,
                    })?;
                rows.into_iter().map(|row| (row.key(), row)).collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(AppError::file_read_failed(path.display().to_string(), e)),
        };

        info!("💾 记录存储: {} (已有 {} 条记录)", path.display(), records.len());

        Ok(Self {
            path,
            records: Mutex::new(records),
            dirty: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 保存一个页面的解析结果
    ///
    /// 先删除该页面已有的所有记录，再按位置写入；
    /// 没有任何记录时写入一条占位记录（题干和答案为空，位置为 0）。
    ///
    /// # 返回
    /// 返回写入的行数
    pub async fn save_document(
        &self,
        test_id: u64,
        records: &[Record],
        html_file_path: &str,
    ) -> usize {
        let parsed_at = chrono::Utc::now().to_rfc3339();
        let mut guard = self.records.lock().await;

        guard.retain(|(id, _), _| *id != test_id);
        self.dirty.store(true, Ordering::SeqCst);

        if records.is_empty() {
            let row = StoredRecord::placeholder(test_id, html_file_path, &parsed_at);
            guard.insert(row.key(), row);
            return 1;
        }

        for (question_idx, record) in records.iter().enumerate() {
            let row = StoredRecord {
                test_id,
                question_idx,
                question: record.question.clone(),
                answer: record.answer.clone(),
                html_file_path: html_file_path.to_string(),
                parsed_at: parsed_at.clone(),
            };
            guard.insert(row.key(), row);
        }
        debug!("测试 {} 写入 {} 条记录", test_id, records.len());
        records.len()
    }

    /// 页面是否已经解析过
    pub async fn is_parsed(&self, test_id: u64) -> bool {
        let guard = self.records.lock().await;
        guard
            .range((test_id, 0)..=(test_id, usize::MAX))
            .next()
            .is_some()
    }

    /// 解析进度
    ///
    /// # 返回
    /// 返回 (最大的已解析ID, 已解析的页面数)
    pub async fn parsing_progress(&self) -> (Option<u64>, usize) {
        let guard = self.records.lock().await;
        let last = guard.keys().next_back().map(|(id, _)| *id);
        let mut ids: Vec<u64> = guard.keys().map(|(id, _)| *id).collect();
        ids.dedup();
        (last, ids.len())
    }

    /// 当前全部记录的副本，按 `(test_id, question_idx)` 排序
    pub async fn snapshot(&self) -> Vec<StoredRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// 是否有尚未写回的改动
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// 写回磁盘（先写临时文件再重命名）
    ///
    /// 没有改动时什么都不做。
    ///
    /// # 返回
    /// 返回是否真的写了文件
    pub async fn flush(&self) -> AppResult<bool> {
        let content = {
            let guard = self.records.lock().await;
            if !self.dirty.swap(false, Ordering::SeqCst) {
                return Ok(false);
            }
            let rows: Vec<&StoredRecord> = guard.values().collect();
            serde_json::to_string_pretty(&rows).map_err(|source| {
                self.dirty.store(true, Ordering::SeqCst);
                StorageError::SerializeFailed { source }
            })?
        };

        if let Err(e) = self.write_file(content).await {
            self.dirty.store(true, Ordering::SeqCst);
            return Err(e);
        }

        debug!("记录存储已写回: {}", self.path.display());
        Ok(true)
    }

    async fn write_file(&self, content: String) -> AppResult<()> {
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| AppError::file_write_failed(tmp_path.display().to_string(), e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_save_document_replaces_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("records.json")).await.unwrap();

        let first = vec![Record::new("q1", "a1"), Record::new("q2", "a2"), Record::new("q3", "")];
        assert_eq!(store.save_document(7, &first, "html/test_7.html").await, 3);
        assert_eq!(store.len().await, 3);

        let second = vec![Record::new("q1", "b1")];
        store.save_document(7, &second, "html/test_7.html").await;

        let rows = store.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key(), (7, 0));
        assert_eq!(rows[0].answer, "b1");
    }

    #[tokio::test]
    async fn test_empty_document_gets_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("records.json")).await.unwrap();

        assert_eq!(store.save_document(3, &[], "html/test_3.html").await, 1);
        let rows = store.snapshot().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].question_idx, 0);
        assert!(rows[0].question.is_empty());
        assert!(rows[0].answer.is_empty());
        assert!(store.is_parsed(3).await);
        assert!(!store.is_parsed(4).await);
    }

    #[tokio::test]
    async fn test_flush_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        {
            let store = RecordStore::open(&path).await.unwrap();
            store.save_document(2, &[Record::new("a", "b")], "p2").await;
            store.save_document(9, &[Record::new("c", "d"), Record::new("e", "")], "p9").await;
            assert_ok!(store.flush().await);
        }

        let reopened = RecordStore::open(&path).await.unwrap();
        assert_eq!(reopened.len().await, 3);
        assert_eq!(reopened.parsing_progress().await, (Some(9), 2));
        let rows = reopened.snapshot().await;
        assert_eq!(rows[1].key(), (9, 0));
        assert_eq!(rows[2].question, "e");
    }

    #[tokio::test]
    async fn test_corrupted_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, "[{\"test_id\": ").unwrap();
        assert!(RecordStore::open(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_flush_skips_write_without_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let store = RecordStore::open(&path).await.unwrap();

        assert!(!store.is_dirty());
        assert!(!store.flush().await.unwrap());
        assert!(!path.exists());

        store.save_document(1, &[Record::new("q", "a")], "p1").await;
        assert!(store.is_dirty());
        assert!(store.flush().await.unwrap());
        assert!(path.exists());

        std::fs::remove_file(&path).unwrap();
        assert!(!store.flush().await.unwrap());
        assert!(!path.exists());
    }
}
