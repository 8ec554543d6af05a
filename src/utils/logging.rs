/// 日志工具模块
///
/// 负责初始化 tracing 订阅者（终端 + 日志文件），并提供格式化输出的辅助函数
use anyhow::Result;
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// 初始化日志
///
/// 日志同时输出到终端和 `log_file_path`。
/// 设置了 `RUST_LOG` 时以它为准，否则按 `verbose` 选择 debug 或 info。
pub fn init(verbose: bool, log_file_path: &str) -> Result<()> {
    init_log_file(log_file_path)?;

    let file = OpenOptions::new().append(true).open(log_file_path)?;
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;

    Ok(())
}

/// 初始化日志文件（写入文件头）
fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n测试页面采集日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(mode: &str, start_id: u64, end_id: u64, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 运行模式: {}", mode);
    info!("🔢 ID 范围: {} - {}", start_id, end_id);
    info!("📊 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `batch_num`: 批次编号
/// - `total_batches`: 批次总数
/// - `start`: 本批第一个页面ID
/// - `end`: 本批最后一个页面ID
/// - `total`: 页面总数
pub fn log_batch_start(batch_num: usize, total_batches: usize, start: u64, end: u64, total: usize) {
    info!("{}", "=".repeat(60));
    info!("📦 开始解析第 {}/{} 批", batch_num, total_batches);
    info!("📄 本批页面: {}-{} / 共 {} 个", start, end, total);
}

/// 记录批次完成信息
pub fn log_batch_complete(batch_num: usize, parsed: usize, total: usize) {
    info!("✓ 第 {} 批完成: 产出记录 {}/{}", batch_num, parsed, total);
    info!("{}", "─".repeat(60));
}

/// 输出解析统计
pub fn print_final_stats(
    parsed: usize,
    empty: usize,
    skipped: usize,
    errors: usize,
    records: usize,
    log_file_path: &str,
) {
    info!("{}", "=".repeat(60));
    info!("📊 解析完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 有题目: {}", parsed);
    info!("⚪ 无题目: {}", empty);
    info!("⏭️ 已解析跳过: {}", skipped);
    info!("❌ 失败: {}", errors);
    info!("📝 新增记录: {}", records);
    info!("{}", "=".repeat(60));
    info!("日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
