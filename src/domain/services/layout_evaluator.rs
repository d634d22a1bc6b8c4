// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::layout_verdict::{FailureKind, LayoutVerdict};
use crate::domain::models::page_snapshot::PageSnapshot;
use crate::domain::models::viewport::Viewport;
use crate::utils::errors::EvaluationError;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;

/// 视口宽度小于该值时视为移动端布局
pub const DEFAULT_MOBILE_BREAKPOINT: u32 = 1024;

/// 失败详情中最多列出的溢出元素数
const MAX_REPORTED_OFFENDERS: usize = 3;

static INLINE_WIDTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[;\s])(min-width|width)\s*:\s*(\d+(?:\.\d+)?)px")
        .expect("static inline width regex")
});

static STYLED_ELEMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[style]").expect("static style selector"));

static SIZED_ELEMENTS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("img[width], table[width], iframe[width], video[width], canvas[width]")
        .expect("static sized element selector")
});

static META_ELEMENTS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("meta[name]").expect("static meta selector"));

/// 布局评估器特质
///
/// 对同一页面的不同视口评估可以并发执行，实现不能持有跨调用的可变状态。
pub trait LayoutEvaluator: Send + Sync {
    /// 评估页面在指定视口下是否符合布局期望
    fn evaluate(
        &self,
        snapshot: &PageSnapshot,
        viewport: &Viewport,
        expected_layout: &str,
    ) -> Result<LayoutVerdict, EvaluationError>;

    /// 在爬取开始前检查布局期望是否合法
    fn validate_expectation(&self, _expected_layout: &str) -> Result<(), EvaluationError> {
        Ok(())
    }

    /// 评估器名称
    fn name(&self) -> &'static str;
}

/// 单条布局规则
#[derive(Debug, Clone)]
enum LayoutRule {
    /// 窄视口下必须声明 `width=device-width` 的 viewport meta
    ResponsiveMeta,
    /// 不允许固定像素宽度超过视口宽度的元素
    NoOverflow,
    /// 选择器必须至少匹配一个元素
    Require { source: String, selector: Selector },
    /// 选择器不能匹配任何元素
    Forbid { source: String, selector: Selector },
}

/// 解析后的布局期望
///
/// 由 `;` 分隔的指令组成：`default`、`none`、`responsive-meta`、
/// `no-overflow`、`require: <选择器>`、`forbid: <选择器>`
#[derive(Debug, Clone)]
pub struct LayoutExpectation {
    rules: Vec<LayoutRule>,
}

impl LayoutExpectation {
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl FromStr for LayoutExpectation {
    type Err = EvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rules = Vec::new();

        for directive in s.split(';').map(str::trim).filter(|d| !d.is_empty()) {
            if let Some((name, argument)) = directive.split_once(':') {
                let source = argument.trim().to_string();
                if source.is_empty() {
                    return Err(EvaluationError::InvalidExpectation(format!(
                        "directive `{}` needs a selector",
                        name.trim()
                    )));
                }
                let selector = Selector::parse(&source).map_err(|e| {
                    EvaluationError::InvalidExpectation(format!(
                        "invalid selector `{}`: {:?}",
                        source, e
                    ))
                })?;
                match name.trim().to_ascii_lowercase().as_str() {
                    "require" => rules.push(LayoutRule::Require { source, selector }),
                    "forbid" => rules.push(LayoutRule::Forbid { source, selector }),
                    other => {
                        return Err(EvaluationError::InvalidExpectation(format!(
                            "unknown directive `{}`",
                            other
                        )))
                    }
                }
                continue;
            }

            match directive.to_ascii_lowercase().as_str() {
                "default" => {
                    rules.push(LayoutRule::ResponsiveMeta);
                    rules.push(LayoutRule::NoOverflow);
                }
                "none" => {}
                "responsive-meta" => rules.push(LayoutRule::ResponsiveMeta),
                "no-overflow" => rules.push(LayoutRule::NoOverflow),
                other => {
                    return Err(EvaluationError::InvalidExpectation(format!(
                        "unknown directive `{}`",
                        other
                    )))
                }
            }
        }

        Ok(Self { rules })
    }
}

/// 结构化布局评估器
///
/// 对HTML做静态结构检查，不渲染页面
#[derive(Debug, Clone)]
pub struct StructuralLayoutEvaluator {
    mobile_breakpoint: u32,
}

impl Default for StructuralLayoutEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuralLayoutEvaluator {
    pub fn new() -> Self {
        Self {
            mobile_breakpoint: DEFAULT_MOBILE_BREAKPOINT,
        }
    }

    pub fn with_mobile_breakpoint(mut self, breakpoint: u32) -> Self {
        self.mobile_breakpoint = breakpoint;
        self
    }

    fn check_rule(&self, rule: &LayoutRule, document: &Html, viewport: &Viewport) -> Option<String> {
        match rule {
            LayoutRule::ResponsiveMeta => {
                if viewport.width < self.mobile_breakpoint && !has_responsive_meta(document) {
                    Some("missing `<meta name=\"viewport\" content=\"width=device-width\">`".to_string())
                } else {
                    None
                }
            }
            LayoutRule::NoOverflow => {
                let offenders = overflowing_elements(document, viewport.width);
                if offenders.is_empty() {
                    return None;
                }
                let listed: Vec<&str> = offenders
                    .iter()
                    .take(MAX_REPORTED_OFFENDERS)
                    .map(String::as_str)
                    .collect();
                let more = offenders.len().saturating_sub(MAX_REPORTED_OFFENDERS);
                let suffix = if more > 0 {
                    format!(" and {} more", more)
                } else {
                    String::new()
                };
                Some(format!(
                    "{} element(s) wider than {}px: {}{}",
                    offenders.len(),
                    viewport.width,
                    listed.join(", "),
                    suffix
                ))
            }
            LayoutRule::Require { source, selector } => {
                if document.select(selector).next().is_none() {
                    Some(format!("required element `{}` not found", source))
                } else {
                    None
                }
            }
            LayoutRule::Forbid { source, selector } => {
                let count = document.select(selector).count();
                if count > 0 {
                    Some(format!("forbidden element `{}` found {} time(s)", source, count))
                } else {
                    None
                }
            }
        }
    }
}

impl LayoutEvaluator for StructuralLayoutEvaluator {
    fn evaluate(
        &self,
        snapshot: &PageSnapshot,
        viewport: &Viewport,
        expected_layout: &str,
    ) -> Result<LayoutVerdict, EvaluationError> {
        if !snapshot.is_html() {
            return Err(EvaluationError::CorruptSnapshot(format!(
                "unsupported content type `{}`",
                snapshot.content_type
            )));
        }
        if snapshot.content.trim().is_empty() {
            return Err(EvaluationError::CorruptSnapshot("empty document".to_string()));
        }

        let expectation: LayoutExpectation = expected_layout.parse()?;
        let document = Html::parse_document(&snapshot.content);

        let failures: Vec<String> = expectation
            .rules
            .iter()
            .filter_map(|rule| self.check_rule(rule, &document, viewport))
            .collect();

        if failures.is_empty() {
            Ok(LayoutVerdict::pass(
                &snapshot.url,
                &viewport.name,
                format!(
                    "conforms to `{}` at {}",
                    expected_layout.trim(),
                    viewport
                ),
            ))
        } else {
            Ok(LayoutVerdict::fail(
                &snapshot.url,
                &viewport.name,
                FailureKind::Layout,
                failures.join("; "),
            ))
        }
    }

    fn validate_expectation(&self, expected_layout: &str) -> Result<(), EvaluationError> {
        expected_layout.parse::<LayoutExpectation>().map(|_| ())
    }

    fn name(&self) -> &'static str {
        "structural"
    }
}

fn has_responsive_meta(document: &Html) -> bool {
    document.select(&META_ELEMENTS).any(|meta| {
        let element = meta.value();
        let is_viewport = element
            .attr("name")
            .is_some_and(|n| n.trim().eq_ignore_ascii_case("viewport"));
        let content: String = element
            .attr("content")
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        is_viewport && content.contains("width=device-width")
    })
}

/// 找出声明了超过 `max_width` 像素固定宽度的元素
fn overflowing_elements(document: &Html, max_width: u32) -> Vec<String> {
    let limit = f64::from(max_width);
    let mut offenders = Vec::new();

    for element in document.select(&STYLED_ELEMENTS) {
        let style = element.value().attr("style").unwrap_or_default();
        for caps in INLINE_WIDTH.captures_iter(style) {
            let property = &caps[1];
            let Ok(width) = caps[2].parse::<f64>() else {
                continue;
            };
            if width > limit {
                offenders.push(format!("<{} style {}:{}px>", tag(&element), property, width));
            }
        }
    }

    for element in document.select(&SIZED_ELEMENTS) {
        let raw = element.value().attr("width").unwrap_or_default().trim();
        // percentages and other relative widths are fluid
        let digits = raw.strip_suffix("px").unwrap_or(raw);
        if let Ok(width) = digits.parse::<u32>() {
            if width > max_width {
                offenders.push(format!("<{} width={}>", tag(&element), width));
            }
        }
    }

    offenders
}

fn tag(element: &ElementRef<'_>) -> String {
    element.value().name().to_string()
}

#[cfg(test)]
#[path = "layout_evaluator_test.rs"]
mod tests;
