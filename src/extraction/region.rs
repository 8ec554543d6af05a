//! 题目区域
//!
//! 一个 `TaskRegion` 对应页面上的一道题：以"Задание"标题为中心，
//! 后续所有的题干 / 答案搜索都限定在它的作用域内。
//!
//! 作用域规则：
//! - 作用域是容器的后代元素，按文档顺序排列
//! - 多个区域共用同一个容器时，每个区域从自己的标题开始，到下一个标题为止
//!   （第一个区域包含标题之前的内容）
//! - 嵌套在容器内部的其他区域的容器整体排除

use scraper::{ElementRef, Selector};

/// 定位器找到的候选区域（标题 + 容器）
#[derive(Debug, Clone, Copy)]
pub struct RegionCandidate<'a> {
    pub heading: ElementRef<'a>,
    pub container: ElementRef<'a>,
}

/// 题目区域
#[derive(Debug, Clone)]
pub struct TaskRegion<'a> {
    heading: ElementRef<'a>,
    container: ElementRef<'a>,
    scope: Vec<ElementRef<'a>>,
}

impl<'a> TaskRegion<'a> {
    /// 标题元素
    pub fn heading(&self) -> ElementRef<'a> {
        self.heading
    }

    /// 边界容器
    pub fn container(&self) -> ElementRef<'a> {
        self.container
    }

    /// 作用域内的全部元素（文档顺序）
    pub fn scope(&self) -> &[ElementRef<'a>] {
        &self.scope
    }

    /// 在作用域内按选择器查找，保持文档顺序
    pub fn select<'s>(&'s self, selector: &'s Selector) -> impl Iterator<Item = ElementRef<'a>> + 's {
        self.scope.iter().copied().filter(move |el| selector.matches(el))
    }

    /// 作用域内第一个匹配的元素
    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'a>> {
        self.select(selector).next()
    }

    pub fn contains(&self, element: &ElementRef<'a>) -> bool {
        self.scope.contains(element)
    }
}

/// 由候选列表构造区域，候选必须按文档顺序排列
pub fn build_regions<'a>(candidates: &[RegionCandidate<'a>]) -> Vec<TaskRegion<'a>> {
    (0..candidates.len())
        .map(|idx| {
            let RegionCandidate { heading, container } = candidates[idx];
            TaskRegion {
                heading,
                container,
                scope: collect_scope(idx, candidates),
            }
        })
        .collect()
}

/// 最近的满足条件的祖先元素
pub fn nearest_ancestor<'a, F>(element: ElementRef<'a>, predicate: F) -> Option<ElementRef<'a>>
where
    F: Fn(&ElementRef<'a>) -> bool,
{
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| predicate(ancestor))
}

fn collect_scope<'a>(idx: usize, candidates: &[RegionCandidate<'a>]) -> Vec<ElementRef<'a>> {
    let own = candidates[idx];
    let mut foreign_containers = Vec::new();
    let mut sibling_headings = Vec::new();
    for (j, other) in candidates.iter().enumerate() {
        if j == idx {
            continue;
        }
        if other.container == own.container {
            sibling_headings.push(other.heading);
        } else {
            foreign_containers.push(other.container);
        }
    }

    // 第一个使用该容器的区域包含标题之前的内容
    let mut started = !candidates[..idx].iter().any(|c| c.container == own.container);
    let mut out = Vec::new();

    // 显式栈的先序遍历，嵌套再深也不会耗尽线程栈
    let mut stack: Vec<ElementRef<'a>> = element_children(own.container);
    stack.reverse();

    while let Some(node) = stack.pop() {
        if foreign_containers.contains(&node) {
            continue;
        }
        if node == own.heading {
            started = true;
        } else if started && sibling_headings.contains(&node) {
            break;
        }
        if started {
            out.push(node);
        }
        stack.extend(element_children(node).into_iter().rev());
    }

    out
}

fn element_children(parent: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    parent.children().filter_map(ElementRef::wrap).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::text::{collapsed_text, css};
    use scraper::Html;

    fn candidates<'a>(doc: &'a Html) -> Vec<RegionCandidate<'a>> {
        let h1 = css("h1").unwrap();
        doc.select(&h1)
            .filter_map(|heading| {
                let container = nearest_ancestor(heading, |a| a.value().name() == "div")?;
                Some(RegionCandidate { heading, container })
            })
            .collect()
    }

    fn texts(region: &TaskRegion<'_>, selector: &str) -> Vec<String> {
        let sel = css(selector).unwrap();
        region.select(&sel).map(collapsed_text).collect()
    }

    #[test]
    fn test_separate_containers() {
        let doc = Html::parse_document(
            r#"<div id="a"><h1>Задание 1</h1><p>one</p></div>
               <div id="b"><h1>Задание 2</h1><p>two</p></div>"#,
        );
        let regions = build_regions(&candidates(&doc));
        assert_eq!(regions.len(), 2);
        assert_eq!(texts(&regions[0], "p"), vec!["one"]);
        assert_eq!(texts(&regions[1], "p"), vec!["two"]);
    }

    #[test]
    fn test_shared_container_is_split_at_headings() {
        let doc = Html::parse_document(
            r#"<div><p>intro</p><h1>Задание 1</h1><p>one</p><h1>Задание 2</h1><p>two</p></div>"#,
        );
        let regions = build_regions(&candidates(&doc));
        assert_eq!(regions.len(), 2);
        assert_eq!(texts(&regions[0], "p"), vec!["intro", "one"]);
        assert_eq!(texts(&regions[1], "p"), vec!["two"]);
        assert!(regions[1].contains(&regions[1].heading()));
        assert!(!regions[0].contains(&regions[1].heading()));
    }

    #[test]
    fn test_nested_foreign_container_is_excluded() {
        let doc = Html::parse_document(
            r#"<div id="outer"><h1>Задание 1</h1><p>outer</p>
                 <div id="inner"><h1>Задание 2</h1><p>inner</p></div>
               </div>"#,
        );
        let regions = build_regions(&candidates(&doc));
        assert_eq!(regions.len(), 2);
        assert_eq!(texts(&regions[0], "p"), vec!["outer"]);
        assert_eq!(texts(&regions[1], "p"), vec!["inner"]);
    }

    #[test]
    fn test_deeply_nested_container_does_not_exhaust_stack() {
        let depth = 100_000;
        let html = format!(
            r#"<div><h1>Задание 1</h1>{}<p>дно</p>{}</div>"#,
            "<span>".repeat(depth),
            "</span>".repeat(depth)
        );
        let doc = Html::parse_document(&html);
        let regions = build_regions(&candidates(&doc));
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].scope().len(), depth + 2);
        assert_eq!(texts(&regions[0], "p"), vec!["дно"]);
    }
}
