//! 页面脚本中嵌入的答案数据
//!
//! 形如 `{"options": [{"id", "text"}], "right_answer": {"groups": [...]}}`，
//! 只在解析单个页面时短暂存在，不会被持久化。

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedPayload {
    pub options: Vec<PayloadOption>,
    pub right_answer: RightAnswer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RightAnswer {
    pub groups: Vec<AnswerGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerGroup {
    pub group_id: String,
    #[serde(default)]
    pub options_ids: Vec<String>,
}
