//! 页面结构诊断
//!
//! 解析结果不符合预期时，统计页面里和解析相关的结构：
//! 标题数量、已知的标题类名、文本输入框、已勾选的输入框、`data-selected` 元素。
//! 和解析引擎一样是纯函数。

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::extraction::dialect::TASK_MARKER;
use crate::extraction::text::{collapsed_text, css, truncate_chars};

/// 历史上出现过的题目标题类名
pub const KNOWN_TITLE_CLASSES: &[&str] = &[
    "text-xl leading-7 text-primary",
    "task-title",
    "question-title",
    "exercise-title",
];

const HEADING_SAMPLES: usize = 5;
const SAMPLES: usize = 3;
const SAMPLE_CHARS: usize = 100;

static H1: LazyLock<Option<Selector>> = LazyLock::new(|| css("h1"));
static DIV_OR_SPAN: LazyLock<Option<Selector>> = LazyLock::new(|| css("div, span"));
static INPUT: LazyLock<Option<Selector>> = LazyLock::new(|| css("input"));
static TEXT_INPUT: LazyLock<Option<Selector>> = LazyLock::new(|| css(r#"input[type="text"]"#));
static CHECKED_INPUT: LazyLock<Option<Selector>> = LazyLock::new(|| css("input[checked]"));
static SELECTED: LazyLock<Option<Selector>> = LazyLock::new(|| css(r#"[data-selected="true"]"#));
static TITLE_CLASSES: LazyLock<Vec<(&'static str, Option<Selector>)>> = LazyLock::new(|| {
    KNOWN_TITLE_CLASSES
        .iter()
        .map(|class| (*class, css(&class_selector(class))))
        .collect()
});

/// 一个标题
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingSample {
    pub text: String,
    pub classes: String,
}

/// 一个已知类名的出现次数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassCount {
    pub class: &'static str,
    pub count: usize,
    /// 前几个元素的文本（截断）
    pub samples: Vec<String>,
}

/// 一个文本输入框
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSample {
    pub value: String,
    pub name: String,
}

/// 一个 `data-selected="true"` 元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedSample {
    pub tag: String,
    pub text: String,
}

/// 页面诊断结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageDiagnostics {
    pub html_bytes: usize,
    pub h1_total: usize,
    /// 文本包含题目标记的 h1 数量
    pub task_headings: usize,
    pub heading_samples: Vec<HeadingSample>,
    /// 自身文本包含题目标记的 div / span 数量
    pub marker_blocks: usize,
    pub title_classes: Vec<ClassCount>,
    pub inputs_total: usize,
    pub text_inputs: usize,
    pub text_input_samples: Vec<InputSample>,
    pub checked_inputs: usize,
    pub selected: usize,
    pub selected_samples: Vec<SelectedSample>,
}

impl PageDiagnostics {
    pub fn from_html(html: &str) -> Self {
        let mut diagnostics = Self::from_document(&Html::parse_document(html));
        diagnostics.html_bytes = html.len();
        diagnostics
    }

    /// `html_bytes` 为 0，文档已经没有原始长度
    pub fn from_document(document: &Html) -> Self {
        let task_headings: Vec<ElementRef<'_>> = select_all(document, &H1)
            .into_iter()
            .filter(|h| collapsed_text(*h).contains(TASK_MARKER))
            .collect();
        let heading_samples = task_headings
            .iter()
            .take(HEADING_SAMPLES)
            .map(|h| HeadingSample {
                text: collapsed_text(*h),
                classes: h.value().classes().collect::<Vec<_>>().join(" "),
            })
            .collect();

        let marker_blocks = select_all(document, &DIV_OR_SPAN)
            .into_iter()
            .filter(|e| own_text(*e).contains(TASK_MARKER))
            .count();

        let title_classes = TITLE_CLASSES
            .iter()
            .map(|(class, selector)| {
                let matched: Vec<ElementRef<'_>> = match selector {
                    Some(selector) => document.select(selector).collect(),
                    None => Vec::new(),
                };
                ClassCount {
                    class: *class,
                    count: matched.len(),
                    samples: matched
                        .iter()
                        .take(SAMPLES)
                        .map(|e| truncate_chars(&collapsed_text(*e), SAMPLE_CHARS).to_string())
                        .collect(),
                }
            })
            .collect();

        let text_inputs = select_all(document, &TEXT_INPUT);
        let text_input_samples = text_inputs
            .iter()
            .take(SAMPLES)
            .map(|input| InputSample {
                value: input.value().attr("value").unwrap_or_default().to_string(),
                name: input.value().attr("name").unwrap_or_default().to_string(),
            })
            .collect();

        let selected = select_all(document, &SELECTED);
        let selected_samples = selected
            .iter()
            .take(SAMPLES)
            .map(|e| SelectedSample {
                tag: e.value().name().to_string(),
                text: truncate_chars(&collapsed_text(*e), SAMPLE_CHARS).to_string(),
            })
            .collect();

        Self {
            html_bytes: 0,
            h1_total: select_all(document, &H1).len(),
            task_headings: task_headings.len(),
            heading_samples,
            marker_blocks,
            title_classes,
            inputs_total: select_all(document, &INPUT).len(),
            text_inputs: text_inputs.len(),
            text_input_samples,
            checked_inputs: select_all(document, &CHECKED_INPUT).len(),
            selected: selected.len(),
            selected_samples,
        }
    }

    /// 页面上是否有任何可供解析的结构
    pub fn looks_parsable(&self) -> bool {
        self.task_headings > 0 || self.title_classes.iter().any(|c| c.count > 0)
    }
}

fn select_all<'a>(document: &'a Html, selector: &LazyLock<Option<Selector>>) -> Vec<ElementRef<'a>> {
    match selector.as_ref() {
        Some(selector) => document.select(selector).collect(),
        None => Vec::new(),
    }
}

/// 元素直接包含的文本（不含子元素）
fn own_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    for child in element.children() {
        if let Some(t) = child.value().as_text() {
            text.push_str(t);
        }
    }
    text
}

/// "a b c" → ".a.b.c"
fn class_selector(classes: &str) -> String {
    classes
        .split_whitespace()
        .map(|class| format!(".{}", class))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div><h1 class="text-xl leading-7 text-primary">Задание 1</h1>
            <p>Вопрос</p>
            <input type="text" name="a1" value="ответ">
            <label><input type="radio" checked>Да</label>
            <div data-selected="true">Вариант Б</div>
            <div data-selected="false">Вариант В</div>
        </div>
        <h1>Результаты</h1>
        <span>Задание 2</span>
        <div class="task-title">Старый заголовок</div>
    </body></html>"#;

    #[test]
    fn test_counts_page_structure() {
        let d = PageDiagnostics::from_html(PAGE);

        assert_eq!(d.html_bytes, PAGE.len());
        assert_eq!(d.h1_total, 2);
        assert_eq!(d.task_headings, 1);
        assert_eq!(
            d.heading_samples,
            vec![HeadingSample {
                text: "Задание 1".to_string(),
                classes: "text-xl leading-7 text-primary".to_string(),
            }]
        );
        assert_eq!(d.marker_blocks, 1);
        assert_eq!(d.inputs_total, 2);
        assert_eq!(d.text_inputs, 1);
        assert_eq!(d.text_input_samples[0].value, "ответ");
        assert_eq!(d.text_input_samples[0].name, "a1");
        assert_eq!(d.checked_inputs, 1);
        assert_eq!(d.selected, 1);
        assert_eq!(d.selected_samples[0].tag, "div");
        assert_eq!(d.selected_samples[0].text, "Вариант Б");
        assert!(d.looks_parsable());
    }

    #[test]
    fn test_title_class_counts() {
        let d = PageDiagnostics::from_html(PAGE);
        let counts: Vec<(&str, usize)> = d.title_classes.iter().map(|c| (c.class, c.count)).collect();
        assert_eq!(
            counts,
            vec![
                ("text-xl leading-7 text-primary", 1),
                ("task-title", 1),
                ("question-title", 0),
                ("exercise-title", 0),
            ]
        );
        assert_eq!(d.title_classes[1].samples, vec!["Старый заголовок".to_string()]);
    }

    #[test]
    fn test_empty_page() {
        let d = PageDiagnostics::from_html("<html><body>404</body></html>");
        assert_eq!(d.h1_total, 0);
        assert_eq!(d.selected, 0);
        assert!(!d.looks_parsable());
    }

    #[test]
    fn test_static_selectors_are_valid() {
        for selector in [&H1, &DIV_OR_SPAN, &INPUT, &TEXT_INPUT, &CHECKED_INPUT, &SELECTED] {
            assert!(selector.is_some());
        }
        assert!(TITLE_CLASSES.iter().all(|(_, s)| s.is_some()));
    }
}
