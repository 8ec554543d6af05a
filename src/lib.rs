//! # CDZ Harvest
//!
//! 把测试页面转换为 `{question, answer}` 记录的采集工具
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有磁盘资源，只暴露读写能力
//! - `PageStore` - HTML 页面缓存和下载进度
//! - `RecordStore` - 解析结果存储
//! - `clients/PageClient` - 浏览器风格的 HTTP 客户端
//!
//! ### ② 业务能力层（Capabilities）
//! - `extraction/` - 纯函数解析引擎，一个页面 → 有序记录
//! - `services/` - 下载 / 解析 / 搜索，一次只处理一个页面或一次查询
//!
//! ### ③ 数据模型（Models）
//! - `Record`、`StoredRecord`、`EmbeddedPayload`、`DownloadMetadata`
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 按运行模式调度，分批并发解析
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod extraction;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use config::{Config, RunMode};
pub use error::{AppError, AppResult};
pub use extraction::extract_records;
pub use models::{Record, StoredRecord};
pub use orchestrator::App;
