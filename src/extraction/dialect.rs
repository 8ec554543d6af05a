//! 页面结构方言
//!
//! 站点先后用过多种标记结构。每种结构是一个 `Dialect`，
//! 各自负责定位区域、提取题干、组装答案策略链。
//! 支持新的结构只需要新增一个实现，不需要修改已有方言。

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::extraction::payload;
use crate::extraction::region::{build_regions, nearest_ancestor, RegionCandidate, TaskRegion};
use crate::extraction::resolver::{
    AccordionResolver, EmbeddedJsonResolver, FormInputMode, FormInputResolver, ResolverChain,
};
use crate::extraction::text::{collapsed_text, css};

/// 题目标题的开头
pub const TASK_MARKER: &str = "Задание";

static PRIMARY_HEADING: LazyLock<Option<Selector>> =
    LazyLock::new(|| css(PrimaryDialect::HEADING));
static PRIMARY_QUESTION: LazyLock<Option<Selector>> =
    LazyLock::new(|| css(PrimaryDialect::QUESTION));
static ANY_HEADING: LazyLock<Option<Selector>> = LazyLock::new(|| css("h1"));
static ANY_PARAGRAPH: LazyLock<Option<Selector>> = LazyLock::new(|| css("p"));

/// 页面结构方言
pub trait Dialect {
    /// 方言名称（用于日志）
    fn name(&self) -> &'static str;

    /// 按文档顺序定位所有题目区域
    fn locate_regions<'a>(&self, document: &'a Html) -> Vec<TaskRegion<'a>>;

    /// 提取题干，找不到时返回空字符串
    fn extract_question(&self, region: &TaskRegion<'_>) -> String;

    /// 为整个页面构造答案策略链（页面级数据在这里解码一次）
    fn answer_chain(&self, document: &Html) -> ResolverChain;

    /// 解析单个区域的答案，找不到时返回空字符串
    fn extract_answer(&self, chain: &ResolverChain, region: &TaskRegion<'_>) -> String {
        chain.resolve(region).unwrap_or_default()
    }

    /// 题干为空的区域是否也输出记录
    fn keeps_empty_questions(&self) -> bool;
}

fn is_task_heading(heading: &ElementRef<'_>) -> bool {
    collapsed_text(*heading).starts_with(TASK_MARKER)
}

// ========== 当前结构 ==========

/// 当前的卡片式结构
///
/// - 标题：`h1.text-xl.leading-7.text-primary`，文本以"Задание"开头
/// - 容器：标题最近的 `div` 祖先，没有则跳过该标题
/// - 题干：`p.leading-7.whitespace-pre-wrap.my-4`
/// - 答案：嵌入 JSON → 折叠面板 → 表单输入
pub struct PrimaryDialect;

impl PrimaryDialect {
    pub const HEADING: &'static str = "h1.text-xl.leading-7.text-primary";
    pub const QUESTION: &'static str = "p.leading-7.whitespace-pre-wrap.my-4";
}

impl Dialect for PrimaryDialect {
    fn name(&self) -> &'static str {
        "primary"
    }

    fn locate_regions<'a>(&self, document: &'a Html) -> Vec<TaskRegion<'a>> {
        let Some(heading_sel) = PRIMARY_HEADING.as_ref() else {
            return Vec::new();
        };

        let candidates: Vec<RegionCandidate<'a>> = document
            .select(heading_sel)
            .filter(is_task_heading)
            .filter_map(|heading| {
                let container = nearest_ancestor(heading, |a| a.value().name() == "div")?;
                Some(RegionCandidate { heading, container })
            })
            .collect();

        build_regions(&candidates)
    }

    fn extract_question(&self, region: &TaskRegion<'_>) -> String {
        PRIMARY_QUESTION
            .as_ref()
            .and_then(|sel| region.select_first(sel))
            .map(collapsed_text)
            .unwrap_or_default()
    }

    fn answer_chain(&self, document: &Html) -> ResolverChain {
        ResolverChain::new()
            .then(EmbeddedJsonResolver::new(payload::decode_document(document)))
            .then(AccordionResolver)
            .then(FormInputResolver::new())
    }

    fn keeps_empty_questions(&self) -> bool {
        true
    }
}

// ========== 旧结构 ==========

/// 旧的宽松结构
///
/// - 标题：任意文本以"Задание"开头的 `h1`
/// - 容器：标题的父元素
/// - 题干：容器内第一个 `p`
/// - 答案：只看 `data-selected` 和选中的输入框
pub struct LegacyDialect;

impl Dialect for LegacyDialect {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn locate_regions<'a>(&self, document: &'a Html) -> Vec<TaskRegion<'a>> {
        let Some(heading_sel) = ANY_HEADING.as_ref() else {
            return Vec::new();
        };

        let candidates: Vec<RegionCandidate<'a>> = document
            .select(heading_sel)
            .filter(is_task_heading)
            .filter_map(|heading| {
                let container = nearest_ancestor(heading, |_| true)?;
                Some(RegionCandidate { heading, container })
            })
            .collect();

        build_regions(&candidates)
    }

    fn extract_question(&self, region: &TaskRegion<'_>) -> String {
        ANY_PARAGRAPH
            .as_ref()
            .and_then(|sel| region.select_first(sel))
            .map(collapsed_text)
            .unwrap_or_default()
    }

    fn answer_chain(&self, _document: &Html) -> ResolverChain {
        ResolverChain::new().then(FormInputResolver::with_modes(&[
            FormInputMode::Selected,
            FormInputMode::Checked,
        ]))
    }

    fn keeps_empty_questions(&self) -> bool {
        false
    }
}
