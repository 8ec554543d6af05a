//! 答案解析策略
//!
//! 每个策略都是 `TaskRegion → Option<String>` 的纯函数，
//! `ResolverChain` 按固定顺序依次尝试，第一个给出非空答案的策略胜出。

use std::sync::LazyLock;

use scraper::{ElementRef, Selector};
use tracing::debug;

use crate::extraction::region::{nearest_ancestor, TaskRegion};
use crate::extraction::text::{collapsed_text, css, is_leaf, join_answers, last_path_segment};

/// 连线题元素识别的图片后缀
pub const IMAGE_SUFFIXES: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"];

static SECTION_BASE: LazyLock<Option<Selector>> =
    LazyLock::new(|| css(r#"div[data-slot="base"]"#));
static SECTION_SUBTITLE: LazyLock<Option<Selector>> =
    LazyLock::new(|| css(r#"span[data-slot="subtitle"]"#));
static SECTION_CONTENT: LazyLock<Option<Selector>> =
    LazyLock::new(|| css(r#"div[data-slot="content"]"#));
static AUDIO_SOURCE: LazyLock<Option<Selector>> = LazyLock::new(|| css("source[src]"));
static TEXT_INPUT: LazyLock<Option<Selector>> = LazyLock::new(|| css(r#"input[type="text"]"#));
static SELECTED: LazyLock<Option<Selector>> = LazyLock::new(|| css(r#"[data-selected="true"]"#));
static CHECKED_INPUT: LazyLock<Option<Selector>> = LazyLock::new(|| {
    css(r#"input[type="checkbox"][checked], input[type="radio"][checked]"#)
});

/// 答案解析策略
pub trait AnswerResolver {
    /// 策略名称（用于日志）
    fn name(&self) -> &'static str;

    /// 尝试解析答案，`None` 表示该策略不适用
    fn resolve(&self, region: &TaskRegion<'_>) -> Option<String>;
}

/// 有序的策略链
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn AnswerResolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个策略（优先级低于已有策略）
    pub fn then(mut self, resolver: impl AnswerResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// 依次尝试，返回第一个非空答案
    pub fn resolve(&self, region: &TaskRegion<'_>) -> Option<String> {
        self.resolvers.iter().find_map(|resolver| {
            let answer = resolver.resolve(region).filter(|a| !a.is_empty())?;
            debug!("答案来自策略: {}", resolver.name());
            Some(answer)
        })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }
}

// ========== 1. 嵌入 JSON ==========

/// 页面级的嵌入答案
///
/// 解码在构造链之前对整个页面只做一次，结果对页面上所有区域生效。
pub struct EmbeddedJsonResolver {
    answer: Option<String>,
}

impl EmbeddedJsonResolver {
    pub fn new(pairs: Option<Vec<String>>) -> Self {
        Self {
            answer: pairs.and_then(join_answers),
        }
    }
}

impl AnswerResolver for EmbeddedJsonResolver {
    fn name(&self) -> &'static str {
        "embedded-json"
    }

    fn resolve(&self, _region: &TaskRegion<'_>) -> Option<String> {
        self.answer.clone()
    }
}

// ========== 2. 折叠面板（连线题） ==========

/// 折叠面板形式的连线题
///
/// 区域内至少有两个 `div[data-slot="base"]` 才视为连线题。每个面板的
/// `span[data-slot="subtitle"]` 是分类名，`div[data-slot="content"]` 中的
/// 图片文件名和音频文件名是元素。
pub struct AccordionResolver;

impl AccordionResolver {
    fn section_items(content: ElementRef<'_>) -> Vec<String> {
        content
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter_map(|el| {
                if el.value().name() == "audio" {
                    return audio_label(el);
                }
                if !is_leaf(el) {
                    return None;
                }
                let text = collapsed_text(el);
                let lower = text.to_lowercase();
                IMAGE_SUFFIXES
                    .iter()
                    .any(|suffix| lower.ends_with(suffix))
                    .then_some(text)
            })
            .collect()
    }
}

impl AnswerResolver for AccordionResolver {
    fn name(&self) -> &'static str {
        "accordion"
    }

    fn resolve(&self, region: &TaskRegion<'_>) -> Option<String> {
        let base_sel = SECTION_BASE.as_ref()?;
        let subtitle_sel = SECTION_SUBTITLE.as_ref()?;
        let content_sel = SECTION_CONTENT.as_ref()?;

        let sections: Vec<ElementRef<'_>> = region.select(base_sel).collect();
        if sections.len() < 2 {
            return None;
        }
        debug!("区域内有 {} 个折叠面板，按连线题处理", sections.len());

        let mut pairs = Vec::new();
        for section in sections {
            let Some(category) = section.select(subtitle_sel).next().map(collapsed_text) else {
                continue;
            };
            let Some(content) = section.select(content_sel).next() else {
                continue;
            };
            for item in Self::section_items(content) {
                pairs.push(format!("{}: {}", category, item));
            }
        }

        join_answers(pairs)
    }
}

fn audio_label(audio: ElementRef<'_>) -> Option<String> {
    let src = audio.value().attr("src").filter(|s| !s.is_empty()).or_else(|| {
        let source = AUDIO_SOURCE.as_ref()?;
        audio.select(source).next()?.value().attr("src")
    })?;
    let name = last_path_segment(src.trim());
    (!name.is_empty()).then(|| name.to_string())
}

// ========== 3. 表单输入 ==========

/// 表单输入的子策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormInputMode {
    /// 单行文本框的 value
    TextInput,
    /// `data-selected="true"` 的元素
    Selected,
    /// 选中的复选框 / 单选框所在的 label
    Checked,
}

/// 表单输入策略，按给定的子策略顺序尝试
pub struct FormInputResolver {
    modes: Vec<FormInputMode>,
}

impl FormInputResolver {
    /// 完整的子策略顺序：文本框 → 选中元素 → 选中的输入框
    pub fn new() -> Self {
        Self::with_modes(&[
            FormInputMode::TextInput,
            FormInputMode::Selected,
            FormInputMode::Checked,
        ])
    }

    pub fn with_modes(modes: &[FormInputMode]) -> Self {
        Self {
            modes: modes.to_vec(),
        }
    }

    fn resolve_mode(mode: FormInputMode, region: &TaskRegion<'_>) -> Option<String> {
        match mode {
            FormInputMode::TextInput => {
                let input = TEXT_INPUT.as_ref()?;
                let value = region.select_first(input)?.value().attr("value")?.trim();
                (!value.is_empty()).then(|| value.to_string())
            }
            FormInputMode::Selected => {
                let selected = SELECTED.as_ref()?;
                join_answers(region.select(selected).map(collapsed_text))
            }
            FormInputMode::Checked => {
                let checked = CHECKED_INPUT.as_ref()?;
                join_answers(region.select(checked).filter_map(|input| {
                    nearest_ancestor(input, |a| a.value().name() == "label").map(collapsed_text)
                }))
            }
        }
    }
}

impl Default for FormInputResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerResolver for FormInputResolver {
    fn name(&self) -> &'static str {
        "form-input"
    }

    fn resolve(&self, region: &TaskRegion<'_>) -> Option<String> {
        self.modes
            .iter()
            .find_map(|&mode| Self::resolve_mode(mode, region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::region::{build_regions, RegionCandidate};
    use scraper::Html;

    fn with_region<R>(html: &str, f: impl FnOnce(&TaskRegion<'_>) -> R) -> R {
        let doc = Html::parse_document(html);
        let h1 = css("h1").unwrap();
        let heading = doc.select(&h1).next().unwrap();
        let container = nearest_ancestor(heading, |a| a.value().name() == "div").unwrap();
        let regions = build_regions(&[RegionCandidate { heading, container }]);
        f(&regions[0])
    }

    const ACCORDION: &str = r#"<div><h1>Задание 1</h1>
        <div data-slot="base"><span data-slot="subtitle">Кошки</span>
          <div data-slot="content"><div>cat1.jpg</div><audio src="/media/sounds/meow.mp3"></audio><div>cat2.PNG</div></div></div>
        <div data-slot="base"><span data-slot="subtitle">Собаки</span>
          <div data-slot="content"><div>dog.jpg</div><div>not an image</div></div></div>
        <input type="text" value="ignored">
    </div>"#;

    #[test]
    fn test_accordion_pairs_in_document_order() {
        let answer = with_region(ACCORDION, |region| AccordionResolver.resolve(region));
        assert_eq!(
            answer.as_deref(),
            Some("Кошки: cat1.jpg | Кошки: meow.mp3 | Кошки: cat2.PNG | Собаки: dog.jpg")
        );
    }

    #[test]
    fn test_accordion_needs_two_sections() {
        let html = r#"<div><h1>Задание 1</h1>
            <div data-slot="base"><span data-slot="subtitle">A</span>
              <div data-slot="content"><div>a.jpg</div></div></div></div>"#;
        assert_eq!(with_region(html, |r| AccordionResolver.resolve(r)), None);
    }

    #[test]
    fn test_audio_source_child() {
        let html = r#"<div><h1>Задание 1</h1>
            <div data-slot="base"><span data-slot="subtitle">A</span>
              <div data-slot="content"><audio><source src="https://cdn.x/a/b/track.ogg?v=1"></audio></div></div>
            <div data-slot="base"><span data-slot="subtitle">B</span>
              <div data-slot="content"></div></div></div>"#;
        assert_eq!(
            with_region(html, |r| AccordionResolver.resolve(r)).as_deref(),
            Some("A: track.ogg")
        );
    }

    #[test]
    fn test_text_input_wins_over_selected() {
        let html = r#"<div><h1>Задание 1</h1>
            <input type="text" value="  42  ">
            <div data-selected="true">other</div></div>"#;
        assert_eq!(
            with_region(html, |r| FormInputResolver::new().resolve(r)).as_deref(),
            Some("42")
        );
    }

    #[test]
    fn test_empty_text_input_falls_through_to_selected() {
        let html = r#"<div><h1>Задание 1</h1>
            <input type="text" value="   ">
            <div data-selected="true"> first
              choice </div><div data-selected="false">no</div><span data-selected="true">second</span></div>"#;
        assert_eq!(
            with_region(html, |r| FormInputResolver::new().resolve(r)).as_deref(),
            Some("first choice | second")
        );
    }

    #[test]
    fn test_checked_inputs_use_label_text() {
        let html = r#"<div><h1>Задание 1</h1>
            <label><input type="checkbox" checked> Москва</label>
            <label><input type="checkbox"> Париж</label>
            <label><input type="checkbox" checked="checked"> Казань</label>
            <input type="radio" checked></div>"#;
        assert_eq!(
            with_region(html, |r| FormInputResolver::new().resolve(r)).as_deref(),
            Some("Москва | Казань")
        );
    }

    #[test]
    fn test_nothing_found() {
        let html = r#"<div><h1>Задание 1</h1><p>?</p></div>"#;
        assert_eq!(with_region(html, |r| FormInputResolver::new().resolve(r)), None);
    }

    #[test]
    fn test_chain_first_non_empty_wins() {
        let chain = ResolverChain::new()
            .then(EmbeddedJsonResolver::new(Some(Vec::new())))
            .then(AccordionResolver)
            .then(FormInputResolver::new());
        assert_eq!(chain.names(), vec!["embedded-json", "accordion", "form-input"]);

        let answer = with_region(ACCORDION, |r| chain.resolve(r)).unwrap();
        assert!(answer.starts_with("Кошки: cat1.jpg"));

        let json_first = ResolverChain::new()
            .then(EmbeddedJsonResolver::new(Some(vec!["Animals: Cat".to_string()])))
            .then(AccordionResolver);
        assert_eq!(
            with_region(ACCORDION, |r| json_first.resolve(r)).as_deref(),
            Some("Animals: Cat")
        );
    }

    #[test]
    fn test_static_selectors_are_valid() {
        for selector in [
            &SECTION_BASE,
            &SECTION_SUBTITLE,
            &SECTION_CONTENT,
            &AUDIO_SOURCE,
            &TEXT_INPUT,
            &SELECTED,
            &CHECKED_INPUT,
        ] {
            assert!(selector.is_some());
        }
    }
}
