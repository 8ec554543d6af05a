//! 页面解析服务 - 业务能力层
//!
//! 只处理单个页面：读缓存 → 解析 → 写入记录存储

use crate::extraction::extract_records;
use crate::infrastructure::{PageStore, RecordStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

/// 单个页面的解析结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseOutcome {
    /// 解析出 n 道题目
    Parsed(usize),
    /// 页面中没有可识别的题目（写入了占位记录）
    Empty,
    /// 记录存储中已有该页面
    AlreadyParsed,
    /// 缓存中没有该页面
    Missing,
}

/// 页面解析服务
#[derive(Clone)]
pub struct ParseService {
    pages: PageStore,
    records: Arc<RecordStore>,
}

impl ParseService {
    pub fn new(pages: PageStore, records: Arc<RecordStore>) -> Self {
        Self { pages, records }
    }

    /// 解析一个已缓存的页面并保存结果
    pub async fn parse_document(&self, test_id: u64) -> Result<ParseOutcome> {
        if self.records.is_parsed(test_id).await {
            return Ok(ParseOutcome::AlreadyParsed);
        }

        let Some((html, path)) = self
            .pages
            .load(test_id)
            .await
            .with_context(|| format!("读取测试 {} 的页面失败", test_id))?
        else {
            return Ok(ParseOutcome::Missing);
        };

        // 解析是纯 CPU 工作，放到阻塞线程池
        let records = tokio::task::spawn_blocking(move || extract_records(&html))
            .await
            .with_context(|| format!("测试 {} 的解析任务异常退出", test_id))?;

        let html_file_path = path.display().to_string();
        self.records
            .save_document(test_id, &records, &html_file_path)
            .await;

        debug!("测试 {} 解析出 {} 道题目", test_id, records.len());
        if records.is_empty() {
            Ok(ParseOutcome::Empty)
        } else {
            Ok(ParseOutcome::Parsed(records.len()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div><h1 class="text-xl leading-7 text-primary">Задание 1</h1>
        <p class="leading-7 whitespace-pre-wrap my-4">2 + 2 = ?</p>
        <label><input type="radio" checked>4</label></div>
    </body></html>"#;

    async fn service(dir: &std::path::Path) -> (ParseService, PageStore, Arc<RecordStore>) {
        let pages = PageStore::new(dir.join("pages"));
        pages.ensure_dir().await.unwrap();
        let records = Arc::new(RecordStore::open(dir.join("records.json")).await.unwrap());
        (
            ParseService::new(pages.clone(), records.clone()),
            pages,
            records,
        )
    }

    #[tokio::test]
    async fn test_parse_document_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let (service, pages, records) = service(dir.path()).await;

        pages.save(1, PAGE).await.unwrap();
        pages.save(2, "<html><body><p>пусто</p></body></html>").await.unwrap();

        assert_eq!(service.parse_document(1).await.unwrap(), ParseOutcome::Parsed(1));
        assert_eq!(service.parse_document(2).await.unwrap(), ParseOutcome::Empty);
        assert_eq!(service.parse_document(3).await.unwrap(), ParseOutcome::Missing);
        assert_eq!(service.parse_document(1).await.unwrap(), ParseOutcome::AlreadyParsed);

        let rows = records.snapshot().await;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].question, "2 + 2 = ?");
        assert_eq!(rows[0].answer, "4");
        assert!(rows[0].html_file_path.ends_with("test_1.html"));
        assert_eq!(rows[1].test_id, 2);
        assert!(rows[1].question.is_empty());
    }
}
