use serde::{Deserialize, Serialize};

/// 一道题的解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub question: String,
    /// 未作答时为空字符串
    pub answer: String,
}

impl Record {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// 持久化的记录
///
/// `(test_id, question_idx)` 是唯一键，`question_idx` 即该题在解析结果中的位置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub test_id: u64,
    pub question_idx: usize,
    pub question: String,
    pub answer: String,
    pub html_file_path: String,
    /// RFC 3339 (UTC)
    pub parsed_at: String,
}

impl StoredRecord {
    /// 页面没有解析出任何题目时写入的占位记录
    pub fn placeholder(test_id: u64, html_file_path: &str, parsed_at: &str) -> Self {
        Self {
            test_id,
            question_idx: 0,
            question: String::new(),
            answer: String::new(),
            html_file_path: html_file_path.to_string(),
            parsed_at: parsed_at.to_string(),
        }
    }

    /// 形状和占位记录一致（位置 0，题干和答案都为空）
    ///
    /// 当前结构的页面也可能产生同样形状的真实记录，只有当它是该页面
    /// 唯一的一行时才是占位记录。
    pub fn has_placeholder_shape(&self) -> bool {
        self.question_idx == 0 && self.question.is_empty() && self.answer.is_empty()
    }

    pub fn key(&self) -> (u64, usize) {
        (self.test_id, self.question_idx)
    }
}
