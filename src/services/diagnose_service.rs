//! 页面诊断服务 - 业务能力层
//!
//! 只处理单个页面：定位缓存文件 → 统计结构 → 输出诊断日志

use crate::extraction::PageDiagnostics;
use crate::infrastructure::PageStore;
use crate::utils::logging::truncate_text;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// 页面诊断服务
#[derive(Clone)]
pub struct DiagnoseService {
    pages: PageStore,
}

impl DiagnoseService {
    pub fn new(pages: PageStore) -> Self {
        Self { pages }
    }

    /// 诊断一个页面
    ///
    /// # 参数
    /// - `recorded`: 记录存储中保存的页面路径，没有时使用缓存路径
    ///
    /// # 返回
    /// 页面文件不存在时返回 `None`
    pub async fn diagnose(&self, test_id: u64, recorded: Option<&str>) -> Result<Option<PageDiagnostics>> {
        let Some((html, path)) = self
            .pages
            .load_located(recorded, test_id)
            .await
            .with_context(|| format!("读取测试 {} 的页面失败", test_id))?
        else {
            return Ok(None);
        };

        let diagnostics = tokio::task::spawn_blocking(move || PageDiagnostics::from_html(&html))
            .await
            .with_context(|| format!("测试 {} 的诊断任务异常退出", test_id))?;

        log_report(test_id, &path, &diagnostics);
        Ok(Some(diagnostics))
    }
}

fn log_report(test_id: u64, path: &Path, d: &PageDiagnostics) {
    info!("{}", "=".repeat(60));
    info!("🔬 [测试 {}] {}", test_id, path.display());
    info!("   HTML 大小: {} 字节", d.html_bytes);
    info!("   h1 总数: {}，包含题目标记: {}", d.h1_total, d.task_headings);
    for (idx, heading) in d.heading_samples.iter().enumerate() {
        info!("     {}. '{}' class='{}'", idx + 1, heading.text, heading.classes);
    }
    info!("   包含题目标记的 div/span: {}", d.marker_blocks);

    for class in &d.title_classes {
        info!("   .{}: {}", class.class, class.count);
        for sample in &class.samples {
            info!("     - {}", sample);
        }
    }

    info!(
        "   输入框: {} (文本 {}，已勾选 {})",
        d.inputs_total, d.text_inputs, d.checked_inputs
    );
    for input in &d.text_input_samples {
        info!("     - value='{}' name='{}'", truncate_text(&input.value, 50), input.name);
    }

    info!("   data-selected=\"true\": {}", d.selected);
    for selected in &d.selected_samples {
        info!("     - <{}> {}", selected.tag, selected.text);
    }

    if !d.looks_parsable() {
        warn!("[测试 {}] 页面中没有可识别的题目标题", test_id);
    }
}
