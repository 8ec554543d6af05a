//! 嵌入答案解码器
//!
//! 站点通过服务端渲染把连线题的正确答案写进内联脚本：
//!
//! ```text
//! self.__next_f.push([1,"...\"answer\":{\"right_answer\":{...},\"options\":[...]}..."])
//! ```
//!
//! 这些数据不在可见的 DOM 中，只能从脚本文本里还原：
//! 1. 找到每个 push 调用的字符串字面量参数
//! 2. 反转义得到内嵌的 JSON 文本
//! 3. 定位 `"answer":` 后面的对象，用括号深度计数找到匹配的右括号
//! 4. 反序列化并展开为 `"组: 元素"` 列表
//!
//! 任何一步失败都只是"没有匹配"，不会向调用方返回错误。

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::extraction::text::{css, truncate_chars};
use crate::models::EmbeddedPayload;

/// 脚本中的调用标记
pub const PUSH_MARKER: &str = "self.__next_f.push";

const PUSH_CALL_PATTERN: &str = r#"self\.__next_f\.push\(\[\s*1\s*,\s*""#;
const ANSWER_KEY_PATTERN: &str = r#""answer"\s*:\s*\{"#;
const RIGHT_ANSWER_KEY: &str = "\"right_answer\"";
const UNKNOWN_ID_CHARS: usize = 8;

static SCRIPT: LazyLock<Option<Selector>> = LazyLock::new(|| css("script"));
static PUSH_CALL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(PUSH_CALL_PATTERN).ok());
static ANSWER_KEY: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(ANSWER_KEY_PATTERN).ok());

/// 解码整个页面，返回连线题的 `"组: 元素"` 列表
///
/// 每个页面只调用一次。依次尝试每个 push 块；如果没有单独完整的块，
/// 再尝试把所有块按顺序拼接后的文本（数据可能被拆分到多个块中）。
pub fn decode_document(document: &Html) -> Option<Vec<String>> {
    let script_selector = SCRIPT.as_ref()?;

    let chunks: Vec<String> = document
        .select(script_selector)
        .map(|script| script.text().collect::<String>())
        .filter(|text| text.contains(PUSH_MARKER))
        .flat_map(|text| push_payloads(&text))
        .map(|raw| unescape_payload(&raw))
        .collect();

    if chunks.is_empty() {
        return None;
    }
    debug!("找到 {} 个 push 数据块", chunks.len());

    if let Some(pairs) = chunks.iter().find_map(|chunk| decode_text(chunk)) {
        return Some(pairs);
    }

    if chunks.len() > 1 {
        let joined = chunks.concat();
        if let Some(pairs) = decode_text(&joined) {
            debug!("在拼接后的数据块中找到答案");
            return Some(pairs);
        }
    }

    None
}

/// 从一段已反转义的文本中解码答案
pub fn decode_text(text: &str) -> Option<Vec<String>> {
    if !text.contains(RIGHT_ANSWER_KEY) {
        return None;
    }

    answer_objects(text).into_iter().find_map(|object| {
        match serde_json::from_str::<EmbeddedPayload>(object) {
            Ok(payload) => {
                let pairs = matching_pairs(&payload);
                if pairs.is_empty() {
                    debug!("答案对象中没有任何分组元素");
                    None
                } else {
                    Some(pairs)
                }
            }
            Err(e) => {
                debug!("答案对象解析失败: {}", e);
                None
            }
        }
    })
}

/// 提取脚本中所有 push 调用的字符串参数（未反转义）
pub fn push_payloads(script: &str) -> Vec<String> {
    let Some(re) = PUSH_CALL.as_ref() else {
        return Vec::new();
    };

    let mut payloads = Vec::new();
    for m in re.find_iter(script) {
        let body = &script[m.end()..];
        match string_literal_end(body) {
            Some(end) => payloads.push(body[..end].to_string()),
            None => debug!("push 调用的字符串没有闭合"),
        }
    }
    payloads
}

/// 反转义 push 参数
///
/// 参数是 JS 字符串字面量，按 JSON 字符串解码（处理 `\n`、`\uXXXX` 等）；
/// 解码失败时只还原 `\"` 和 `\\`。
pub fn unescape_payload(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| {
        let mut out = String::with_capacity(raw.len());
        let mut chars = raw.chars();
        while let Some(ch) = chars.next() {
            if ch == '\\' {
                match chars.next() {
                    Some(next @ ('"' | '\\')) => out.push(next),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                }
            } else {
                out.push(ch);
            }
        }
        out
    })
}

/// 文本中所有包含 `"right_answer"` 的 `"answer": {...}` 对象，按出现顺序
pub fn answer_objects(text: &str) -> Vec<&str> {
    let Some(re) = ANSWER_KEY.as_ref() else {
        return Vec::new();
    };

    re.find_iter(text)
        .filter_map(|m| find_balanced_json_object(text, m.end() - 1))
        .map(|span| &text[span])
        .filter(|object| object.contains(RIGHT_ANSWER_KEY))
        .collect()
}

/// 从 `start` 处的 `{` 开始，找到与之匹配的 `}`
///
/// 字符串字面量中的括号不计数。`start` 不是 `{` 或者对象没有闭合时返回 `None`。
pub fn find_balanced_json_object(text: &str, start: usize) -> Option<Range<usize>> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start..start + offset + 1);
                }
            }
            _ => {}
        }
    }

    None
}

/// 展开为 `"组: 元素"` 列表，顺序为分组顺序、组内元素顺序
pub fn matching_pairs(payload: &EmbeddedPayload) -> Vec<String> {
    let labels: HashMap<&str, &str> = payload
        .options
        .iter()
        .map(|option| (option.id.as_str(), option.text.as_str()))
        .collect();

    let label = |id: &str, prefix: &str| -> String {
        match labels.get(id) {
            Some(text) => text.to_string(),
            None => format!("{} {}", prefix, truncate_chars(id, UNKNOWN_ID_CHARS)),
        }
    };

    let mut pairs = Vec::new();
    for group in &payload.right_answer.groups {
        let group_name = label(&group.group_id, "Группа");
        for option_id in &group.options_ids {
            pairs.push(format!("{}: {}", group_name, label(option_id, "Элемент")));
        }
    }
    pairs
}

/// 字符串字面量的结束位置（未转义的 `"`）
fn string_literal_end(body: &str) -> Option<usize> {
    let mut escaped = false;
    for (idx, ch) in body.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return Some(idx);
        }
    }
    None
}
