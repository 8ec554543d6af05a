//! 页面缓存 - 基础设施层
//!
//! 持有 HTML 缓存目录，只暴露读写能力：
//! - `test_<id>.html` 原始页面
//! - `download_metadata.json` 下载进度

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::DownloadMetadata;

const METADATA_FILE: &str = "download_metadata.json";

/// 页面缓存
#[derive(Debug, Clone)]
pub struct PageStore {
    dir: PathBuf,
}

impl PageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 创建缓存目录（已存在时什么都不做）
    pub async fn ensure_dir(&self) -> AppResult<()> {
        if !fs::try_exists(&self.dir).await.unwrap_or(false) {
            fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| AppError::directory_failed(self.dir.display().to_string(), e))?;
            info!("📁 创建HTML缓存目录: {}", self.dir.display());
        }
        Ok(())
    }

    /// 页面文件路径
    pub fn path_for(&self, test_id: u64) -> PathBuf {
        self.dir.join(format!("test_{}.html", test_id))
    }

    /// 页面是否已下载（文件存在且非空）
    pub async fn is_downloaded(&self, test_id: u64) -> bool {
        match fs::metadata(self.path_for(test_id)).await {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(_) => false,
        }
    }

    /// 保存页面
    pub async fn save(&self, test_id: u64, html: &str) -> AppResult<PathBuf> {
        let path = self.path_for(test_id);
        fs::write(&path, html)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
        Ok(path)
    }

    /// 读取页面，文件不存在时返回 `None`
    ///
    /// # 返回
    /// 返回 (页面内容, 文件路径)
    pub async fn load(&self, test_id: u64) -> AppResult<Option<(String, PathBuf)>> {
        let path = self.path_for(test_id);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some((content, path))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::file_read_failed(path.display().to_string(), e)),
        }
    }

    /// 找到一个测试的页面文件
    ///
    /// 优先使用记录中保存的路径，没有时按命名规则拼出缓存路径。
    /// 文件不存在时返回 `None`。
    ///
    /// # 参数
    /// - `recorded`: 记录存储中的 `html_file_path`
    pub async fn locate(&self, recorded: Option<&str>, test_id: u64) -> Option<PathBuf> {
        let path = match recorded.map(str::trim).filter(|p| !p.is_empty()) {
            Some(recorded) => PathBuf::from(recorded),
            None => self.path_for(test_id),
        };

        if fs::try_exists(&path).await.unwrap_or(false) {
            Some(path)
        } else {
            warn!("[测试 {}] 页面文件不存在: {}", test_id, path.display());
            None
        }
    }

    /// 按 `locate` 的规则读取页面内容
    pub async fn load_located(
        &self,
        recorded: Option<&str>,
        test_id: u64,
    ) -> AppResult<Option<(String, PathBuf)>> {
        let Some(path) = self.locate(recorded, test_id).await else {
            return Ok(None);
        };
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Ok(Some((content, path)))
    }

    /// 缓存目录中所有页面的ID（升序）
    pub async fn list_ids(&self) -> AppResult<Vec<u64>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| AppError::directory_failed(self.dir.display().to_string(), e))?;

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::directory_failed(self.dir.display().to_string(), e))?
        {
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(parse_page_file_name) {
                ids.push(id);
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    fn metadata_path(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }

    /// 读取下载进度，文件缺失或损坏时从头开始
    pub async fn load_metadata(&self, start_id: u64) -> DownloadMetadata {
        let path = self.metadata_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(_) => return DownloadMetadata::new(start_id),
        };

        match serde_json::from_str(&content) {
            Ok(metadata) => metadata,
            Err(e) => {
                error!("下载进度文件损坏 ({}): {}，从头开始", path.display(), e);
                DownloadMetadata::new(start_id)
            }
        }
    }

    /// 保存下载进度
    pub async fn save_metadata(&self, metadata: &DownloadMetadata) -> AppResult<()> {
        let path = self.metadata_path();
        let content = serde_json::to_string_pretty(metadata)
            .map_err(|source| crate::error::StorageError::SerializeFailed { source })?;
        fs::write(&path, content)
            .await
            .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))
    }
}

/// `test_<id>.html` → id
fn parse_page_file_name(name: &str) -> Option<u64> {
    name.strip_prefix("test_")?
        .strip_suffix(".html")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_page_file_name() {
        assert_eq!(parse_page_file_name("test_42.html"), Some(42));
        assert_eq!(parse_page_file_name("test_x.html"), None);
        assert_eq!(parse_page_file_name("download_metadata.json"), None);
        assert_eq!(parse_page_file_name("test_7.htm"), None);
    }

    #[tokio::test]
    async fn test_save_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path().join("pages"));
        store.ensure_dir().await.unwrap();

        store.save(10, "<html>10</html>").await.unwrap();
        store.save(2, "<html>2</html>").await.unwrap();
        std::fs::write(store.path_for(3), "").unwrap();
        std::fs::write(store.dir().join("notes.txt"), "x").unwrap();

        assert!(store.is_downloaded(10).await);
        assert!(!store.is_downloaded(3).await);
        assert!(!store.is_downloaded(99).await);

        let (content, path) = store.load(2).await.unwrap().unwrap();
        assert_eq!(content, "<html>2</html>");
        assert!(path.ends_with("test_2.html"));
        assert!(store.load(99).await.unwrap().is_none());

        assert_eq!(store.list_ids().await.unwrap(), vec![2, 3, 10]);
    }

    #[tokio::test]
    async fn test_locate_prefers_recorded_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path().join("pages"));
        store.ensure_dir().await.unwrap();
        store.save(7, "<html>7</html>").await.unwrap();

        let moved = dir.path().join("moved_7.html");
        std::fs::write(&moved, "<html>moved</html>").unwrap();
        let recorded = moved.display().to_string();

        assert_eq!(store.locate(Some(&recorded), 7).await, Some(moved.clone()));
        assert_eq!(store.locate(Some("  "), 7).await, Some(store.path_for(7)));
        assert_eq!(store.locate(None, 7).await, Some(store.path_for(7)));
        assert_eq!(store.locate(Some("/no/such/test_7.html"), 7).await, None);
        assert_eq!(store.locate(None, 8).await, None);

        let (content, path) = store.load_located(Some(&recorded), 7).await.unwrap().unwrap();
        assert_eq!(content, "<html>moved</html>");
        assert_eq!(path, moved);
        assert!(store.load_located(None, 8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_metadata_round_trip_and_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = PageStore::new(dir.path());

        let fresh = store.load_metadata(5).await;
        assert_eq!(fresh.last_processed, 4);

        let mut metadata = DownloadMetadata::new(5);
        metadata.record_success(5, 200, 10);
        metadata.mark_processed(5);
        store.save_metadata(&metadata).await.unwrap();
        assert_eq!(store.load_metadata(5).await.total_downloaded, 1);

        std::fs::write(dir.path().join(METADATA_FILE), "{broken").unwrap();
        assert_eq!(store.load_metadata(5).await.total_downloaded, 0);
    }
}
