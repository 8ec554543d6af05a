//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责按运行模式调度各服务。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建缓存目录、打开记录存储
//! 2. **下载**：委托 `DownloadService` 顺序下载页面
//! 3. **并发解析**：使用 Semaphore 限制并发数量，分批解析缓存页面
//! 4. **持久化**：按间隔把有变化的记录存储写回磁盘，结束时总会写回一次
//! 5. **全局统计**：汇总所有页面的处理结果
//! 6. **诊断**：统计指定页面的结构

use crate::clients::PageClient;
use crate::config::{Config, RunMode};
use crate::infrastructure::{PageStore, RecordStore};
use crate::services::{DiagnoseService, DownloadService, ParseOutcome, ParseService, SearchService};
use crate::utils::logging::{
    log_batch_complete, log_batch_start, log_startup, print_final_stats, truncate_text,
};
use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    pages: PageStore,
    records: Arc<RecordStore>,
    stop: Arc<AtomicBool>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(
            config.run_mode.as_str(),
            config.start_id,
            config.end_id,
            config.max_concurrent_documents,
        );

        let pages = PageStore::new(&config.html_storage_dir);
        pages
            .ensure_dir()
            .await
            .context("无法创建HTML缓存目录")?;

        let records = RecordStore::open(&config.records_path)
            .await
            .with_context(|| format!("无法打开记录存储: {}", config.records_path))?;

        Ok(Self {
            config,
            pages,
            records: Arc::new(records),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 停止信号（Ctrl-C 时置位）
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        self.listen_for_ctrl_c();

        match self.config.run_mode {
            RunMode::Download => self.download().await,
            RunMode::Parse => self.parse_all().await.map(|_| ()),
            RunMode::All => {
                self.download().await?;
                if self.stop.load(Ordering::SeqCst) {
                    warn!("⏹️ 下载被中断，跳过解析");
                    return Ok(());
                }
                self.parse_all().await.map(|_| ())
            }
            RunMode::Search => self.search().await,
            RunMode::Debug => self.diagnose().await,
        }
    }

    fn listen_for_ctrl_c(&self) {
        let stop = self.stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("⏹️ 收到 Ctrl-C，完成当前任务后退出...");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    async fn download(&self) -> Result<()> {
        let client = PageClient::new(&self.config).context("无法创建HTTP客户端")?;
        let service = DownloadService::new(client, self.pages.clone(), self.config.clone());
        service.run(&self.stop).await?;
        Ok(())
    }

    /// 解析缓存目录中的所有页面
    pub async fn parse_all(&self) -> Result<ParseStats> {
        info!("📁 正在扫描缓存页面...");
        let ids = self
            .pages
            .list_ids()
            .await
            .context("无法列出缓存页面")?;

        let mut stats = ParseStats {
            total: ids.len(),
            ..Default::default()
        };

        if ids.is_empty() {
            warn!("⚠️ 缓存目录中没有页面，程序结束");
            return Ok(stats);
        }

        let (last_parsed, parsed_count) = self.records.parsing_progress().await;
        info!(
            "✓ 找到 {} 个缓存页面 (已解析 {} 个，最大ID {:?})",
            ids.len(),
            parsed_count,
            last_parsed
        );

        let batch_size = self.config.max_concurrent_documents.max(1);
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total_batches = ids.len().div_ceil(batch_size);
        let mut last_flush = Instant::now();

        for (batch_idx, batch_ids) in ids.chunks(batch_size).enumerate() {
            if self.stop.load(Ordering::SeqCst) {
                warn!("⏹️ 收到停止信号，停止解析");
                break;
            }

            let batch_num = batch_idx + 1;
            if let (Some(first), Some(last)) = (batch_ids.first(), batch_ids.last()) {
                log_batch_start(batch_num, total_batches, *first, *last, ids.len());
            }

            let batch = self.process_batch(batch_ids, semaphore.clone()).await?;
            log_batch_complete(batch_num, batch.parsed, batch_ids.len());
            stats.absorb(&batch);

            if last_flush.elapsed() >= self.config.flush_interval() {
                self.flush_records().await?;
                last_flush = Instant::now();
            }
        }

        self.flush_records().await?;

        print_final_stats(
            stats.parsed,
            stats.empty,
            stats.skipped,
            stats.errors,
            stats.records,
            &self.config.output_log_file,
        );

        let summary = SearchService::new(self.records.snapshot().await).statistics();
        info!(
            "💾 存储: {} 条记录 / {} 个测试 / 有题干 {} 条 ({:.1}%)",
            summary.total_records,
            summary.unique_tests,
            summary.records_with_questions,
            summary.fill_percentage
        );

        Ok(stats)
    }

    /// 记录存储有变化时写回磁盘
    async fn flush_records(&self) -> Result<()> {
        if self
            .records
            .flush()
            .await
            .context("写回记录存储失败")?
        {
            debug!("💾 记录存储已写回 ({} 条)", self.records.len().await);
        }
        Ok(())
    }

    /// 处理单个批次
    async fn process_batch(&self, batch_ids: &[u64], semaphore: Arc<Semaphore>) -> Result<ParseStats> {
        let service = ParseService::new(self.pages.clone(), self.records.clone());
        let mut handles = Vec::with_capacity(batch_ids.len());

        for &test_id in batch_ids {
            let permit = semaphore.clone().acquire_owned().await?;
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                (test_id, service.parse_document(test_id).await)
            }));
        }

        let mut result = ParseStats {
            total: batch_ids.len(),
            ..Default::default()
        };

        for joined in join_all(handles).await {
            match joined {
                Ok((_, Ok(ParseOutcome::Parsed(n)))) => {
                    result.parsed += 1;
                    result.records += n;
                }
                Ok((test_id, Ok(ParseOutcome::Empty))) => {
                    warn!("[测试 {}] 未找到题目", test_id);
                    result.empty += 1;
                }
                Ok((_, Ok(ParseOutcome::AlreadyParsed))) => result.skipped += 1,
                Ok((test_id, Ok(ParseOutcome::Missing))) => {
                    warn!("[测试 {}] 页面已从缓存中消失", test_id);
                    result.skipped += 1;
                }
                Ok((test_id, Err(e))) => {
                    error!("[测试 {}] ❌ 解析失败: {:#}", test_id, e);
                    result.errors += 1;
                }
                Err(e) => {
                    error!("解析任务执行失败: {}", e);
                    result.errors += 1;
                }
            }
        }

        Ok(result)
    }

    /// 输出 `debug_ids` 中每个页面的结构诊断
    async fn diagnose(&self) -> Result<()> {
        if self.config.debug_ids.is_empty() {
            warn!("⚠️ DEBUG_IDS 为空，没有要诊断的页面");
            return Ok(());
        }

        let search = SearchService::new(self.records.snapshot().await);
        let service = DiagnoseService::new(self.pages.clone());
        for &test_id in &self.config.debug_ids {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }
            let recorded = search.html_file_path(test_id);
            if service.diagnose(test_id, recorded).await?.is_none() {
                warn!("[测试 {}] 缓存中没有该页面，跳过诊断", test_id);
            }
        }
        Ok(())
    }

    async fn search(&self) -> Result<()> {
        let service = SearchService::new(self.records.snapshot().await);
        let stats = service.statistics();
        info!(
            "💾 存储: {} 条记录 / {} 个测试 / 最大ID {:?}",
            stats.total_records, stats.unique_tests, stats.last_test_id
        );

        let keywords: Vec<&str> = self.config.search_query.split_whitespace().collect();
        if keywords.is_empty() {
            warn!("⚠️ SEARCH_QUERY 为空，没有可搜索的内容");
            return Ok(());
        }

        let hits = service.search_by_any_keywords(&keywords, self.config.search_limit);
        info!("🔍 \"{}\": 找到 {} 条结果", self.config.search_query, hits.len());
        for (idx, hit) in hits.iter().enumerate() {
            info!(
                "{:>3}. [测试 {} #{}] (匹配 {}) {}",
                idx + 1,
                hit.record.test_id,
                hit.record.question_idx + 1,
                hit.score,
                truncate_text(&hit.record.question, 80)
            );
            info!("     → {}", truncate_text(&hit.record.answer, 120));
        }

        Ok(())
    }
}

/// 解析统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseStats {
    pub total: usize,
    pub parsed: usize,
    pub empty: usize,
    pub skipped: usize,
    pub errors: usize,
    /// 新写入的记录数
    pub records: usize,
}

impl ParseStats {
    fn absorb(&mut self, batch: &ParseStats) {
        self.parsed += batch.parsed;
        self.empty += batch.empty;
        self.skipped += batch.skipped;
        self.errors += batch.errors;
        self.records += batch.records;
    }
}
