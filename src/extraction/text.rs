//! 文本与选择器辅助函数

use scraper::{ElementRef, Selector};

/// 多个答案之间的分隔符
pub const ANSWER_SEPARATOR: &str = " | ";

/// 解析 CSS 选择器
///
/// 选择器都是硬编码的常量，解析失败时按"没有匹配"处理。
pub fn css(selector: &str) -> Option<Selector> {
    Selector::parse(selector).ok()
}

/// 提取元素的全部文本，空白折叠为单个空格并去掉首尾空白
pub fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 元素是否没有子元素（只包含文本）
pub fn is_leaf(element: ElementRef<'_>) -> bool {
    !element.children().any(|child| child.value().is_element())
}

/// 用分隔符拼接非空文本，全部为空时返回 `None`
pub fn join_answers<I>(parts: I) -> Option<String>
where
    I: IntoIterator<Item = String>,
{
    let parts: Vec<String> = parts.into_iter().filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(ANSWER_SEPARATOR))
    }
}

/// 取字符串的前 `n` 个字符
pub fn truncate_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// URL 的最后一段路径（去掉查询串和锚点）
pub fn last_path_segment(src: &str) -> &str {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    path.rsplit('/').next().unwrap_or(path)
}
