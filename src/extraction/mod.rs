//! 解析引擎
//!
//! 把一个 HTML 页面转换为按文档顺序排列的 `{question, answer}` 列表。
//!
//! ## 流程
//!
//! ```text
//! 页面 → 方言.locate_regions
//!      → 每个区域: extract_question → 答案策略链 [嵌入 JSON, 折叠面板, 表单输入]
//!      → 组装记录
//! 当前结构一个有效题目都没有时，用旧结构重新执行一遍
//! ```
//!
//! ## 约定
//!
//! - 纯函数：没有 I/O，没有共享状态，同一页面多次解析结果相同
//! - 永不失败：无法识别的页面返回空列表，由调用方决定是否写入占位记录
//! - 每次调用自己持有解析后的文档，可以在多个线程中并发调用

pub mod dialect;
pub mod diagnostics;
pub mod payload;
pub mod region;
pub mod resolver;
pub mod text;

pub use dialect::{Dialect, LegacyDialect, PrimaryDialect, TASK_MARKER};
pub use diagnostics::PageDiagnostics;
pub use payload::find_balanced_json_object;
pub use region::TaskRegion;
pub use resolver::{AnswerResolver, ResolverChain};

use scraper::Html;
use tracing::debug;

use crate::models::Record;

/// 解析一个页面（使用默认方言顺序：当前结构 → 旧结构）
pub fn extract_records(html: &str) -> Vec<Record> {
    Extractor::default().extract(html)
}

/// 解析引擎
///
/// 按顺序尝试各方言，第一个产出记录的方言胜出。
pub struct Extractor {
    dialects: Vec<Box<dyn Dialect + Send + Sync>>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::with_dialects(vec![Box::new(PrimaryDialect), Box::new(LegacyDialect)])
    }
}

impl Extractor {
    pub fn with_dialects(dialects: Vec<Box<dyn Dialect + Send + Sync>>) -> Self {
        Self { dialects }
    }

    /// 解析 HTML 文本
    pub fn extract(&self, html: &str) -> Vec<Record> {
        let document = Html::parse_document(html);
        self.extract_document(&document)
    }

    /// 解析已构建的文档
    pub fn extract_document(&self, document: &Html) -> Vec<Record> {
        for dialect in &self.dialects {
            let records = assemble(dialect.as_ref(), document);
            if !records.is_empty() {
                debug!("方言 {} 解析出 {} 道题目", dialect.name(), records.len());
                return records;
            }
            debug!("方言 {} 未找到有效题目", dialect.name());
        }
        Vec::new()
    }
}

/// 用一个方言组装记录
///
/// 所有区域的题干都为空时视为该方言不适用，返回空列表。
fn assemble(dialect: &dyn Dialect, document: &Html) -> Vec<Record> {
    let regions = dialect.locate_regions(document);
    let questions: Vec<String> = regions
        .iter()
        .map(|region| dialect.extract_question(region))
        .collect();

    if questions.iter().all(String::is_empty) {
        return Vec::new();
    }

    let chain = dialect.answer_chain(document);
    regions
        .iter()
        .zip(questions)
        .filter(|(_, question)| dialect.keeps_empty_questions() || !question.is_empty())
        .map(|(region, question)| Record {
            answer: dialect.extract_answer(&chain, region),
            question,
        })
        .collect()
}
