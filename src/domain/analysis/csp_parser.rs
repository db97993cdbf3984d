// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::analysis::grade::{clamp_score, Grade};
use serde::{Deserialize, Serialize};

/// 缺失时每项扣 10 分的关键指令
pub const CRITICAL_DIRECTIVES: [&str; 5] = [
    "default-src",
    "script-src",
    "object-src",
    "base-uri",
    "frame-ancestors",
];

/// 单条 CSP 指令
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CspDirective {
    /// 指令名（小写）
    pub name: String,
    pub values: Vec<String>,
}

/// 解析后的 CSP 策略及其质量评分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CspPolicy {
    pub directives: Vec<CspDirective>,
    pub has_unsafe_inline: bool,
    pub has_unsafe_eval: bool,
    pub has_strict_dynamic: bool,
    pub missing_directives: Vec<String>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub score: i32,
    pub grade: Grade,
}

impl CspPolicy {
    /// 按名称查找指令
    pub fn directive(&self, name: &str) -> Option<&CspDirective> {
        let name = name.to_ascii_lowercase();
        self.directives.iter().find(|d| d.name == name)
    }

    /// 见 [`CspParser::would_block_source`]
    pub fn would_block_source(&self, directive: &str, source: &str) -> bool {
        CspParser::would_block_source(self, directive, source)
    }
}

/// CSP 策略解析器
///
/// 评估策略本身的质量，而非响应头是否存在。评分规则由
/// [`PolicyCspScore`] 实现，与响应头分析中内嵌的
/// [`crate::domain::analysis::header_analyzer::HeaderCspScore`] 相互独立。
#[derive(Debug, Default, Clone, Copy)]
pub struct CspParser;

impl CspParser {
    pub fn new() -> Self {
        Self
    }

    /// 解析并评分一个 CSP 响应头值
    pub fn parse(&self, header_value: &str) -> CspPolicy {
        if header_value.trim().is_empty() {
            return CspPolicy {
                directives: Vec::new(),
                has_unsafe_inline: false,
                has_unsafe_eval: false,
                has_strict_dynamic: false,
                missing_directives: CRITICAL_DIRECTIVES.iter().map(|d| d.to_string()).collect(),
                issues: vec!["Empty CSP header".to_string()],
                recommendations: vec![
                    "Define a policy starting from default-src 'self'".to_string()
                ],
                score: 0,
                grade: Grade::F,
            };
        }

        let (directives, duplicates) = parse_directives(header_value);
        let mut policy = PolicyCspScore::score(directives);
        for name in duplicates {
            policy.issues.push(format!(
                "Duplicate {} directive is ignored by browsers",
                name
            ));
        }
        policy
    }

    /// 判断某个来源是否会被策略拦截
    ///
    /// 先解析生效指令（指定指令不存在时回退到 `default-src`；两者都没有时
    /// 不做限制）。以下任一条件成立即视为允许：`*`、完全匹配、协议前缀匹配
    /// （如 `https:`）、存在 `'self'`、或两者互为子串。`'none'` 优先，
    /// 出现时一律拦截。
    ///
    /// NOTE: `'self'` 和子串匹配都是近似判断，并没有按源（scheme/host/port）
    /// 精确比较；只要存在 `'self'` 任何来源都会被视为允许。
    pub fn would_block_source(policy: &CspPolicy, directive: &str, source: &str) -> bool {
        let effective = match policy
            .directive(directive)
            .or_else(|| policy.directive("default-src"))
        {
            Some(d) => d,
            None => return false,
        };

        let values: Vec<String> = effective
            .values
            .iter()
            .map(|v| v.to_ascii_lowercase())
            .collect();
        let source = source.trim().to_ascii_lowercase();

        if values.iter().any(|v| v == "'none'") {
            return true;
        }
        if values.iter().any(|v| v == "*") {
            return false;
        }

        let allowed = values.iter().any(|value| {
            *value == source
                || (value.ends_with(':') && source.starts_with(value.as_str()))
                || value == "'self'"
                || value.contains(source.as_str())
                || source.contains(value.as_str())
        });

        !allowed
    }
}

/// 拆分指令：先按 `;` 分段，再按第一个空白拆成指令名和取值
///
/// 重复的指令只保留第一条，与浏览器一致。
fn parse_directives(header_value: &str) -> (Vec<CspDirective>, Vec<String>) {
    let mut directives: Vec<CspDirective> = Vec::new();
    let mut duplicates = Vec::new();

    for segment in header_value.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (name, rest) = match segment.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest),
            None => (segment, ""),
        };
        let name = name.to_ascii_lowercase();

        if directives.iter().any(|d| d.name == name) {
            duplicates.push(name);
            continue;
        }

        directives.push(CspDirective {
            name,
            values: rest.split_whitespace().map(str::to_string).collect(),
        });
    }

    (directives, duplicates)
}

/// 策略级 CSP 评分
///
/// 起始 100 分：`'unsafe-inline'` -30，`'unsafe-eval'` -20，每缺一个关键指令
/// -10，没有 `report-uri`/`report-to` -5，除 `img-src` 外每个含裸 `*` 的指令 -10；
/// `'strict-dynamic'` 与 `upgrade-insecure-requests` 各加 5 分。
pub struct PolicyCspScore;

impl PolicyCspScore {
    pub fn score(directives: Vec<CspDirective>) -> CspPolicy {
        let has_value = |needle: &str| {
            directives
                .iter()
                .any(|d| d.values.iter().any(|v| v.eq_ignore_ascii_case(needle)))
        };
        let has_directive = |name: &str| directives.iter().any(|d| d.name == name);

        let has_unsafe_inline = has_value("'unsafe-inline'");
        let has_unsafe_eval = has_value("'unsafe-eval'");
        let has_strict_dynamic = has_value("'strict-dynamic'");

        let mut score = 100;
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if has_unsafe_inline {
            score -= 30;
            issues.push("Policy allows 'unsafe-inline'".to_string());
            recommendations.push("Use nonces or hashes instead of 'unsafe-inline'".to_string());
        }
        if has_unsafe_eval {
            score -= 20;
            issues.push("Policy allows 'unsafe-eval'".to_string());
            recommendations.push("Remove 'unsafe-eval'".to_string());
        }

        let missing_directives: Vec<String> = CRITICAL_DIRECTIVES
            .iter()
            .filter(|name| !has_directive(name))
            .map(|name| name.to_string())
            .collect();
        for name in &missing_directives {
            score -= 10;
            issues.push(format!("Missing {} directive", name));
            recommendations.push(format!("Add a {} directive", name));
        }

        if !has_directive("report-uri") && !has_directive("report-to") {
            score -= 5;
            issues.push("No violation reporting configured".to_string());
            recommendations.push("Add report-to or report-uri".to_string());
        }

        for directive in directives.iter().filter(|d| d.name != "img-src") {
            if directive.values.iter().any(|v| v == "*") {
                score -= 10;
                issues.push(format!("{} allows any source (*)", directive.name));
                recommendations.push(format!("Restrict {} to explicit sources", directive.name));
            }
        }

        if has_strict_dynamic {
            score += 5;
        }
        if has_directive("upgrade-insecure-requests") {
            score += 5;
        }

        let score = clamp_score(score);
        CspPolicy {
            directives,
            has_unsafe_inline,
            has_unsafe_eval,
            has_strict_dynamic,
            missing_directives,
            issues,
            recommendations,
            score,
            grade: Grade::from_score(score),
        }
    }
}

#[cfg(test)]
#[path = "csp_parser_test.rs"]
mod tests;
