//! 页面下载服务 - 业务能力层
//!
//! 按ID顺序下载测试页面到缓存目录，支持断点续传

use crate::clients::PageClient;
use crate::config::Config;
use crate::infrastructure::PageStore;
use crate::models::DownloadMetadata;
use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// 每处理多少个ID保存一次进度
const METADATA_SAVE_INTERVAL: u64 = 100;

/// 单个页面的下载结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// 已保存
    Saved { status_code: u16, content_length: usize },
    /// 已在缓存中
    Skipped,
    /// 放弃下载
    Failed {
        error: String,
        status_code: Option<u16>,
    },
}

/// 一次下载运行的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DownloadSummary {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
    /// 是否因为停止信号提前结束
    pub interrupted: bool,
}

/// 页面下载服务
pub struct DownloadService {
    client: PageClient,
    pages: PageStore,
    config: Config,
}

impl DownloadService {
    pub fn new(client: PageClient, pages: PageStore, config: Config) -> Self {
        Self {
            client,
            pages,
            config,
        }
    }

    /// 下载 `start_id..=end_id` 范围内的页面
    ///
    /// 从上次保存的进度继续；`stop` 置位后处理完当前ID即保存进度并返回。
    pub async fn run(&self, stop: &AtomicBool) -> Result<DownloadSummary> {
        self.pages
            .ensure_dir()
            .await
            .context("无法创建HTML缓存目录")?;

        let mut metadata = self.pages.load_metadata(self.config.start_id).await;
        let resume_id = metadata.resume_from(self.config.start_id);
        let end_id = self.config.end_id;
        let mut summary = DownloadSummary::default();

        if resume_id > end_id {
            info!("✓ ID 范围 {}-{} 已全部处理", self.config.start_id, end_id);
            return Ok(summary);
        }

        info!(
            "⬇️ 开始下载: {} - {} (共 {} 个ID)",
            resume_id,
            end_id,
            end_id - resume_id + 1
        );

        for test_id in resume_id..=end_id {
            if stop.load(Ordering::SeqCst) {
                warn!("⏹️ 收到停止信号，保存进度后退出 (下一个ID: {})", test_id);
                summary.interrupted = true;
                break;
            }

            let outcome = self.download_one(test_id).await;
            apply_outcome(&mut metadata, &mut summary, test_id, &outcome);
            metadata.mark_processed(test_id);

            if (test_id - resume_id + 1) % METADATA_SAVE_INTERVAL == 0 {
                self.save_metadata(&metadata).await;
                info!(
                    "📈 进度: {} / {} (已保存 {}, 跳过 {}, 失败 {})",
                    test_id, end_id, summary.saved, summary.skipped, summary.failed
                );
            }

            if outcome != DownloadOutcome::Skipped && !self.config.sleep_between().is_zero() {
                sleep(self.config.sleep_between()).await;
            }
        }

        self.save_metadata(&metadata).await;
        info!(
            "📊 下载结束: 已保存 {}, 跳过 {}, 失败 {} (累计成功 {}, 累计失败 {})",
            summary.saved,
            summary.skipped,
            summary.failed,
            metadata.total_downloaded,
            metadata.total_failed
        );

        Ok(summary)
    }

    /// 下载单个页面（含重试）
    pub async fn download_one(&self, test_id: u64) -> DownloadOutcome {
        if self.pages.is_downloaded(test_id).await {
            debug!("测试 {} 已在缓存中", test_id);
            return DownloadOutcome::Skipped;
        }

        let max_attempts = self.config.max_retries.max(1);
        let mut last_failure = DownloadOutcome::Failed {
            error: "未尝试".to_string(),
            status_code: None,
        };

        for attempt in 1..=max_attempts {
            match self.client.fetch(test_id).await {
                Ok(response) if response.status.is_success() => {
                    let status_code = response.status.as_u16();
                    let content_length = response.body.len();
                    return match self.pages.save(test_id, &response.body).await {
                        Ok(path) => {
                            debug!("测试 {} 已保存: {}", test_id, path.display());
                            DownloadOutcome::Saved {
                                status_code,
                                content_length,
                            }
                        }
                        Err(e) => {
                            error!("测试 {} 保存失败: {}", test_id, e);
                            DownloadOutcome::Failed {
                                error: e.to_string(),
                                status_code: Some(status_code),
                            }
                        }
                    };
                }
                Ok(response) if response.is_transient() => {
                    let status_code = response.status.as_u16();
                    warn!(
                        "测试 {} 服务端返回 {} (尝试 {}/{})",
                        test_id, status_code, attempt, max_attempts
                    );
                    last_failure = DownloadOutcome::Failed {
                        error: format!("HTTP {}", status_code),
                        status_code: Some(status_code),
                    };
                    if attempt < max_attempts {
                        sleep(self.config.server_backoff()).await;
                    }
                }
                Ok(response) => {
                    let status_code = response.status.as_u16();
                    debug!("测试 {} 返回 {}，不再重试", test_id, status_code);
                    return DownloadOutcome::Failed {
                        error: format!("HTTP {}", status_code),
                        status_code: Some(status_code),
                    };
                }
                Err(e) => {
                    warn!(
                        "测试 {} 请求失败 (尝试 {}/{}): {}",
                        test_id, attempt, max_attempts, e
                    );
                    last_failure = DownloadOutcome::Failed {
                        error: e.to_string(),
                        status_code: None,
                    };
                    if attempt < max_attempts {
                        sleep(self.config.error_backoff()).await;
                    }
                }
            }
        }

        last_failure
    }

    async fn save_metadata(&self, metadata: &DownloadMetadata) {
        if let Err(e) = self.pages.save_metadata(metadata).await {
            error!("保存下载进度失败: {}", e);
        }
    }
}

fn apply_outcome(
    metadata: &mut DownloadMetadata,
    summary: &mut DownloadSummary,
    test_id: u64,
    outcome: &DownloadOutcome,
) {
    match outcome {
        DownloadOutcome::Saved {
            status_code,
            content_length,
        } => {
            metadata.record_success(test_id, *status_code, *content_length);
            summary.saved += 1;
        }
        DownloadOutcome::Skipped => summary.skipped += 1,
        DownloadOutcome::Failed { error, status_code } => {
            metadata.record_failure(test_id, error.clone(), *status_code);
            summary.failed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_config(dir: &std::path::Path, start_id: u64, end_id: u64) -> Config {
        Config {
            html_storage_dir: dir.display().to_string(),
            start_id,
            end_id,
            sleep_between_ms: 0,
            // 不可路由的地址，测试中不应发出请求
            base_url: "http://127.0.0.1:9/cdz/test".to_string(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_cached_range_is_skipped_without_requests() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), 1, 3);
        let pages = PageStore::new(dir.path());
        for id in 1..=3 {
            pages.save(id, "<html></html>").await.unwrap();
        }

        let service =
            DownloadService::new(PageClient::new(&config).unwrap(), pages.clone(), config);
        let summary = service.run(&AtomicBool::new(false)).await.unwrap();

        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.saved + summary.failed, 0);
        assert_eq!(pages.load_metadata(1).await.last_processed, 3);
    }

    #[tokio::test]
    async fn test_stop_flag_interrupts_before_first_id() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), 5, 10);
        let pages = PageStore::new(dir.path());

        let service =
            DownloadService::new(PageClient::new(&config).unwrap(), pages.clone(), config);
        let summary = service.run(&AtomicBool::new(true)).await.unwrap();

        assert!(summary.interrupted);
        assert_eq!(summary.saved + summary.skipped + summary.failed, 0);
        assert_eq!(pages.load_metadata(5).await.resume_from(5), 5);
    }

    #[tokio::test]
    async fn test_finished_range_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let config = offline_config(dir.path(), 1, 2);
        let pages = PageStore::new(dir.path());
        let mut metadata = DownloadMetadata::new(1);
        metadata.mark_processed(2);
        pages.save_metadata(&metadata).await.unwrap();

        let service = DownloadService::new(PageClient::new(&config).unwrap(), pages, config);
        let summary = service.run(&AtomicBool::new(false)).await.unwrap();
        assert_eq!(summary, DownloadSummary::default());
    }

    #[test]
    fn test_apply_outcome_counts() {
        let mut metadata = DownloadMetadata::new(0);
        let mut summary = DownloadSummary::default();
        apply_outcome(
            &mut metadata,
            &mut summary,
            1,
            &DownloadOutcome::Saved {
                status_code: 200,
                content_length: 5,
            },
        );
        apply_outcome(
            &mut metadata,
            &mut summary,
            2,
            &DownloadOutcome::Failed {
                error: "HTTP 404".to_string(),
                status_code: Some(404),
            },
        );
        apply_outcome(&mut metadata, &mut summary, 3, &DownloadOutcome::Skipped);

        assert_eq!((summary.saved, summary.failed, summary.skipped), (1, 1, 1));
        assert!(metadata.downloaded.contains_key("1"));
        assert_eq!(metadata.failed["2"].status_code, Some(404));
    }
}
