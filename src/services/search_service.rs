//! 记录搜索服务 - 业务能力层
//!
//! 在记录快照上做大小写不敏感的子串搜索。
//! 占位记录（没有解析出题目的页面唯一的一行）永远不会出现在结果中；
//! 题干为空的真实记录仍然保留。

use crate::models::StoredRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// 按关键词匹配的搜索结果
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHit<'a> {
    pub record: &'a StoredRecord,
    /// 命中的关键词数量
    pub score: usize,
}

/// 存储统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatistics {
    pub total_records: usize,
    pub unique_tests: usize,
    pub records_with_questions: usize,
    /// 没有解析出题目的页面数（各有一条占位记录）
    pub placeholder_tests: usize,
    pub last_test_id: Option<u64>,
    /// 有题干的记录占比（百分比）
    pub fill_percentage: f64,
}

/// 记录搜索服务
pub struct SearchService {
    records: Vec<StoredRecord>,
    placeholder_tests: BTreeSet<u64>,
}

impl SearchService {
    /// `records` 应按 `(test_id, question_idx)` 排序，和 `RecordStore::snapshot` 一致
    pub fn new(records: Vec<StoredRecord>) -> Self {
        let placeholder_tests = placeholder_tests(&records);
        Self {
            records,
            placeholder_tests,
        }
    }

    fn is_placeholder(&self, record: &StoredRecord) -> bool {
        record.has_placeholder_shape() && self.placeholder_tests.contains(&record.test_id)
    }

    fn searchable(&self) -> impl Iterator<Item = &StoredRecord> {
        self.records.iter().filter(|r| !self.is_placeholder(r))
    }

    /// 记录中保存的页面文件路径（包括占位记录）
    pub fn html_file_path(&self, test_id: u64) -> Option<&str> {
        self.records
            .iter()
            .filter(|r| r.test_id == test_id)
            .map(|r| r.html_file_path.as_str())
            .find(|path| !path.is_empty())
    }

    /// 按题干或答案搜索
    ///
    /// 题干命中的排在答案命中的前面，同类按 `test_id` 排序。
    pub fn search_questions(&self, query: &str, limit: usize) -> Vec<&StoredRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<(u8, &StoredRecord)> = self
            .searchable()
            .filter_map(|r| {
                if r.question.to_lowercase().contains(&needle) {
                    Some((0, r))
                } else if r.answer.to_lowercase().contains(&needle) {
                    Some((1, r))
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by_key(|(rank, r)| (*rank, r.test_id, r.question_idx));
        hits.into_iter().take(limit).map(|(_, r)| r).collect()
    }

    /// 一个测试的全部题目，按题目顺序
    pub fn get_test(&self, test_id: u64) -> Vec<&StoredRecord> {
        let mut rows: Vec<&StoredRecord> =
            self.searchable().filter(|r| r.test_id == test_id).collect();
        rows.sort_by_key(|r| r.question_idx);
        rows
    }

    /// 所有关键词都命中（AND）
    pub fn search_by_keywords(&self, keywords: &[&str], limit: usize) -> Vec<&StoredRecord> {
        let keywords = normalize_keywords(keywords);
        if keywords.is_empty() {
            return Vec::new();
        }

        self.searchable()
            .filter(|r| matched_count(r, &keywords) == keywords.len())
            .take(limit)
            .collect()
    }

    /// 任一关键词命中（OR），命中数量多的排在前面，同分按 `test_id` 排序
    pub fn search_by_any_keywords(&self, keywords: &[&str], limit: usize) -> Vec<KeywordHit<'_>> {
        let keywords = normalize_keywords(keywords);
        if keywords.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<KeywordHit<'_>> = self
            .searchable()
            .filter_map(|record| {
                let score = matched_count(record, &keywords);
                (score > 0).then_some(KeywordHit { record, score })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then(a.record.test_id.cmp(&b.record.test_id))
                .then(a.record.question_idx.cmp(&b.record.question_idx))
        });
        hits.truncate(limit);
        hits
    }

    pub fn statistics(&self) -> StoreStatistics {
        let total_records = self.records.len();
        let mut test_ids: Vec<u64> = self.records.iter().map(|r| r.test_id).collect();
        test_ids.sort_unstable();
        test_ids.dedup();
        let records_with_questions = self
            .records
            .iter()
            .filter(|r| !r.question.is_empty())
            .count();

        let fill_percentage = if total_records == 0 {
            0.0
        } else {
            records_with_questions as f64 * 100.0 / total_records as f64
        };

        StoreStatistics {
            total_records,
            unique_tests: test_ids.len(),
            records_with_questions,
            placeholder_tests: self.placeholder_tests.len(),
            last_test_id: test_ids.last().copied(),
            fill_percentage,
        }
    }
}

/// 只有一行、且这一行是占位形状的页面
fn placeholder_tests(records: &[StoredRecord]) -> BTreeSet<u64> {
    let mut rows_per_test: BTreeMap<u64, (usize, bool)> = BTreeMap::new();
    for record in records {
        let entry = rows_per_test.entry(record.test_id).or_insert((0, true));
        entry.0 += 1;
        entry.1 &= record.has_placeholder_shape();
    }
    rows_per_test
        .into_iter()
        .filter(|(_, (rows, shape))| *rows == 1 && *shape)
        .map(|(test_id, _)| test_id)
        .collect()
}

fn normalize_keywords(keywords: &[&str]) -> Vec<String> {
    keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn matched_count(record: &StoredRecord, keywords: &[String]) -> usize {
    let question = record.question.to_lowercase();
    let answer = record.answer.to_lowercase();
    keywords
        .iter()
        .filter(|k| question.contains(k.as_str()) || answer.contains(k.as_str()))
        .count()
}
