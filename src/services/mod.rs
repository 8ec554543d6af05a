//! 业务能力层（Services）
//!
//! 每个服务描述"我能做什么"，一次只处理一个页面或一次查询：
//! - `DownloadService` - 下载页面到缓存
//! - `ParseService` - 解析单个缓存页面并保存记录
//! - `SearchService` - 在已保存的记录中搜索
//! - `DiagnoseService` - 统计单个页面的结构，排查解析问题

pub mod diagnose_service;
pub mod download_service;
pub mod parse_service;
pub mod search_service;

pub use diagnose_service::DiagnoseService;
pub use download_service::{DownloadOutcome, DownloadService, DownloadSummary};
pub use parse_service::{ParseOutcome, ParseService};
pub use search_service::{KeywordHit, SearchService, StoreStatistics};
