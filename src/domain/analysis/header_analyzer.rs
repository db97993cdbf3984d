// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::analysis::grade::{clamp_score, Grade};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 缺失时仍给 70 分（C）的非关键响应头
const NON_CRITICAL_ABSENT_SCORE: i32 = 70;

/// HSTS 推荐的最短 max-age（一年）
const HSTS_MIN_MAX_AGE: u64 = 31_536_000;

/// 单个响应头的分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityHeader {
    /// 展示名称
    pub name: String,
    /// 实际读取的响应头名称（小写）
    pub header: String,
    pub present: bool,
    pub value: Option<String>,
    pub score: i32,
    pub grade: Grade,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// 整体分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderAnalysis {
    /// 固定目录中的全部分析项，无论响应头是否存在
    pub headers: Vec<SecurityHeader>,
    pub overall_score: i32,
    pub overall_grade: Grade,
    pub headers_present: usize,
    /// 评级为 D 或 F 的分析项数量
    pub critical_issues: usize,
}

impl HeaderAnalysis {
    /// 按展示名称查找分析项
    pub fn header(&self, name: &str) -> Option<&SecurityHeader> {
        self.headers.iter().find(|h| h.name.eq_ignore_ascii_case(name))
    }
}

/// 单项评估结果
#[derive(Debug, Clone, Default)]
struct Evaluation {
    score: i32,
    /// 个别响应头（X-Frame-Options）使用固定评级而非分数阈值
    grade: Option<Grade>,
    issues: Vec<String>,
    recommendations: Vec<String>,
}

impl Evaluation {
    fn new(score: i32) -> Self {
        Self {
            score,
            ..Default::default()
        }
    }

    fn issue(mut self, issue: impl Into<String>) -> Self {
        self.issues.push(issue.into());
        self
    }

    fn recommend(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }
}

/// 缺失时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Absence {
    /// 0 分，F
    Critical,
    /// 70 分，C
    Tolerated,
}

struct HeaderRule {
    name: &'static str,
    header: &'static str,
    weight: u32,
    absence: Absence,
    recommendation: &'static str,
    evaluate: fn(&str) -> Evaluation,
}

/// 固定的分析目录
///
/// X-Content-Type-Options 以两个不同的名称被评估两次；第二项不在权重表中，
/// 权重为 0，因此不影响总分，但会计入 `headers_present` 与 `critical_issues`。
static CATALOG: [HeaderRule; 15] = [
    HeaderRule {
        name: "Content-Security-Policy",
        header: "content-security-policy",
        weight: 25,
        absence: Absence::Critical,
        recommendation: "Add a Content-Security-Policy starting from default-src 'self'",
        evaluate: evaluate_csp,
    },
    HeaderRule {
        name: "Strict-Transport-Security",
        header: "strict-transport-security",
        weight: 15,
        absence: Absence::Critical,
        recommendation: "Add Strict-Transport-Security: max-age=31536000; includeSubDomains",
        evaluate: evaluate_hsts,
    },
    HeaderRule {
        name: "X-Frame-Options",
        header: "x-frame-options",
        weight: 10,
        absence: Absence::Critical,
        recommendation: "Add X-Frame-Options: DENY (or frame-ancestors in CSP)",
        evaluate: evaluate_frame_options,
    },
    HeaderRule {
        name: "X-Content-Type-Options",
        header: "x-content-type-options",
        weight: 8,
        absence: Absence::Critical,
        recommendation: "Add X-Content-Type-Options: nosniff",
        evaluate: evaluate_content_type_options,
    },
    HeaderRule {
        name: "X-Content-Type-Options (MIME sniffing)",
        header: "x-content-type-options",
        weight: 0,
        absence: Absence::Critical,
        recommendation: "Add X-Content-Type-Options: nosniff",
        evaluate: evaluate_content_type_options,
    },
    HeaderRule {
        name: "Referrer-Policy",
        header: "referrer-policy",
        weight: 8,
        absence: Absence::Critical,
        recommendation: "Add Referrer-Policy: strict-origin-when-cross-origin",
        evaluate: evaluate_referrer_policy,
    },
    HeaderRule {
        name: "Permissions-Policy",
        header: "permissions-policy",
        weight: 8,
        absence: Absence::Critical,
        recommendation: "Add a Permissions-Policy disabling unused features, e.g. camera=(), microphone=(), geolocation=()",
        evaluate: evaluate_permissions_policy,
    },
    HeaderRule {
        name: "Cross-Origin-Embedder-Policy",
        header: "cross-origin-embedder-policy",
        weight: 5,
        absence: Absence::Tolerated,
        recommendation: "Consider Cross-Origin-Embedder-Policy: require-corp",
        evaluate: evaluate_coep,
    },
    HeaderRule {
        name: "Cross-Origin-Opener-Policy",
        header: "cross-origin-opener-policy",
        weight: 5,
        absence: Absence::Tolerated,
        recommendation: "Consider Cross-Origin-Opener-Policy: same-origin",
        evaluate: evaluate_coop,
    },
    HeaderRule {
        name: "Cross-Origin-Resource-Policy",
        header: "cross-origin-resource-policy",
        weight: 5,
        absence: Absence::Tolerated,
        recommendation: "Consider Cross-Origin-Resource-Policy: same-origin",
        evaluate: evaluate_corp,
    },
    HeaderRule {
        name: "X-XSS-Protection",
        header: "x-xss-protection",
        weight: 3,
        absence: Absence::Tolerated,
        recommendation: "Set X-XSS-Protection: 0 and rely on Content-Security-Policy",
        evaluate: evaluate_xss_protection,
    },
    HeaderRule {
        name: "Expect-CT",
        header: "expect-ct",
        weight: 2,
        absence: Absence::Tolerated,
        recommendation: "Expect-CT is deprecated; Certificate Transparency is enforced by browsers",
        evaluate: evaluate_expect_ct,
    },
    HeaderRule {
        name: "Public-Key-Pins",
        header: "public-key-pins",
        weight: 1,
        absence: Absence::Critical,
        recommendation: "HTTP Public Key Pinning is deprecated; use Certificate Transparency monitoring",
        evaluate: evaluate_public_key_pins,
    },
    HeaderRule {
        name: "Feature-Policy",
        header: "feature-policy",
        weight: 2,
        absence: Absence::Tolerated,
        recommendation: "Feature-Policy is superseded by Permissions-Policy",
        evaluate: evaluate_feature_policy,
    },
    HeaderRule {
        name: "Report-To",
        header: "report-to",
        weight: 3,
        absence: Absence::Tolerated,
        recommendation: "Add a Report-To endpoint group to collect policy violation reports",
        evaluate: evaluate_report_to,
    },
];

/// 响应头分析器
///
/// 对任意响应头集合（包括空集合）都会返回完整的 15 项分析结果。
#[derive(Debug, Default, Clone, Copy)]
pub struct HeaderAnalyzer;

impl HeaderAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// 分析响应头
    ///
    /// # 参数
    ///
    /// * `headers` - 原始响应头，名称大小写不敏感
    ///
    /// # 返回值
    ///
    /// 各项评分及加权总分。缺失的响应头不向加权和贡献分数，但其权重
    /// 仍计入分母，因此空响应头集合的总分为 0。
    pub fn analyze(&self, headers: &HashMap<String, String>) -> HeaderAnalysis {
        let lookup: HashMap<String, &str> = headers
            .iter()
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.as_str()))
            .collect();

        let mut results = Vec::with_capacity(CATALOG.len());
        let mut weighted_sum = 0f64;
        let mut total_weight = 0u32;

        for rule in CATALOG.iter() {
            let result = match lookup.get(rule.header) {
                Some(value) => {
                    let evaluation = (rule.evaluate)(value.trim());
                    let score = clamp_score(evaluation.score);
                    weighted_sum += f64::from(score) * f64::from(rule.weight);
                    SecurityHeader {
                        name: rule.name.to_string(),
                        header: rule.header.to_string(),
                        present: true,
                        value: Some(value.to_string()),
                        score,
                        grade: evaluation.grade.unwrap_or_else(|| Grade::from_score(score)),
                        issues: evaluation.issues,
                        recommendations: evaluation.recommendations,
                    }
                }
                None => absent_header(rule),
            };
            total_weight += rule.weight;
            results.push(result);
        }

        let overall_score = if total_weight == 0 {
            0
        } else {
            (weighted_sum / f64::from(total_weight)).round() as i32
        };

        HeaderAnalysis {
            headers_present: results.iter().filter(|h| h.present).count(),
            critical_issues: results.iter().filter(|h| h.grade.is_critical()).count(),
            overall_grade: Grade::from_score(overall_score),
            overall_score,
            headers: results,
        }
    }
}

fn absent_header(rule: &HeaderRule) -> SecurityHeader {
    let (score, issues) = match rule.absence {
        Absence::Critical => (0, vec![format!("Missing {} header", rule.name)]),
        Absence::Tolerated => (NON_CRITICAL_ABSENT_SCORE, Vec::new()),
    };
    SecurityHeader {
        name: rule.name.to_string(),
        header: rule.header.to_string(),
        present: false,
        value: None,
        score,
        grade: Grade::from_score(score),
        issues,
        recommendations: vec![rule.recommendation.to_string()],
    }
}

/// 响应头分析中内嵌的 CSP 评分
///
/// 与 [`crate::domain::analysis::csp_parser::PolicyCspScore`] 是两套独立的规则，
/// 同一输入可以得到不同的分数，二者不可合并。
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCspScore {
    pub score: i32,
    pub grade: Grade,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl HeaderCspScore {
    pub fn evaluate(value: &str) -> Self {
        let lowered = value.to_ascii_lowercase();
        let directives: Vec<&str> = lowered
            .split(';')
            .filter_map(|d| d.split_whitespace().next())
            .collect();
        let has = |name: &str| directives.contains(&name);

        let mut score = 100;
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        if lowered.contains("'unsafe-inline'") {
            score -= 30;
            issues.push("CSP allows 'unsafe-inline'".to_string());
            recommendations.push("Replace 'unsafe-inline' with nonces or hashes".to_string());
        }
        if lowered.contains("'unsafe-eval'") {
            score -= 20;
            issues.push("CSP allows 'unsafe-eval'".to_string());
            recommendations.push("Remove 'unsafe-eval' and avoid eval()-like APIs".to_string());
        }
        if !has("default-src") {
            score -= 15;
            issues.push("Missing default-src directive".to_string());
            recommendations.push("Add default-src 'self' as a fallback".to_string());
        }
        if !has("script-src") {
            score -= 10;
            issues.push("Missing script-src directive".to_string());
            recommendations.push("Add an explicit script-src directive".to_string());
        }
        for directive in ["object-src", "base-uri", "frame-ancestors"] {
            if !has(directive) {
                score -= 5;
                issues.push(format!("Missing {} directive", directive));
                recommendations.push(format!("Add a {} directive", directive));
            }
        }
        if !has("report-uri") && !has("report-to") {
            score -= 5;
            issues.push("No CSP violation reporting configured".to_string());
            recommendations.push("Add report-to or report-uri to collect violations".to_string());
        }
        if has("upgrade-insecure-requests") {
            score += 5;
        }

        let score = clamp_score(score);
        Self {
            score,
            grade: Grade::from_score(score),
            issues,
            recommendations,
        }
    }
}

impl From<HeaderCspScore> for Evaluation {
    fn from(csp: HeaderCspScore) -> Self {
        Evaluation {
            score: csp.score,
            grade: Some(csp.grade),
            issues: csp.issues,
            recommendations: csp.recommendations,
        }
    }
}

fn evaluate_csp(value: &str) -> Evaluation {
    HeaderCspScore::evaluate(value).into()
}

fn evaluate_hsts(value: &str) -> Evaluation {
    let lowered = value.to_ascii_lowercase();
    let parts: Vec<&str> = lowered.split(';').map(str::trim).collect();

    let max_age = parts.iter().find_map(|p| {
        p.strip_prefix("max-age=")
            .map(|v| v.trim().trim_matches('"').parse::<u64>().ok())
    });

    let mut eval = Evaluation::new(100);
    match max_age {
        None => {
            eval.score -= 50;
            eval = eval
                .issue("HSTS header has no max-age")
                .recommend("Set max-age to at least 31536000");
        }
        Some(None) => {
            eval.score -= 50;
            eval = eval
                .issue("HSTS max-age is not a number")
                .recommend("Set max-age to at least 31536000");
        }
        Some(Some(age)) if age < HSTS_MIN_MAX_AGE => {
            eval.score -= 20;
            eval = eval
                .issue(format!("HSTS max-age {} is shorter than one year", age))
                .recommend("Increase max-age to at least 31536000");
        }
        Some(Some(_)) => {}
    }

    if !parts.iter().any(|p| *p == "includesubdomains") {
        eval.score -= 10;
        eval = eval
            .issue("HSTS does not include subdomains")
            .recommend("Add includeSubDomains");
    }

    if !parts.iter().any(|p| *p == "preload") {
        eval = eval.recommend("Consider adding preload and submitting to the HSTS preload list");
    }

    eval
}

fn evaluate_frame_options(value: &str) -> Evaluation {
    let lowered = value.to_ascii_lowercase();
    let (score, grade) = if lowered == "deny" {
        (100, Grade::A)
    } else if lowered == "sameorigin" {
        (80, Grade::B)
    } else if lowered.starts_with("allow-from") {
        (60, Grade::C)
    } else {
        (40, Grade::D)
    };

    let mut eval = Evaluation {
        score,
        grade: Some(grade),
        ..Default::default()
    };
    match grade {
        Grade::A => {}
        Grade::B => eval = eval.recommend("Use DENY unless same-origin framing is required"),
        Grade::C => {
            eval = eval
                .issue("ALLOW-FROM is obsolete and ignored by modern browsers")
                .recommend("Use CSP frame-ancestors instead of ALLOW-FROM")
        }
        _ => {
            eval = eval
                .issue(format!("Unrecognized X-Frame-Options value: {}", value))
                .recommend("Use DENY or SAMEORIGIN")
        }
    }
    eval
}

fn evaluate_content_type_options(value: &str) -> Evaluation {
    if value.eq_ignore_ascii_case("nosniff") {
        Evaluation::new(100)
    } else {
        Evaluation::new(30)
            .issue(format!("Invalid X-Content-Type-Options value: {}", value))
            .recommend("The only valid value is nosniff")
    }
}

fn evaluate_referrer_policy(value: &str) -> Evaluation {
    // browsers use the last policy token they understand
    let policy = value
        .split(',')
        .map(|p| p.trim().to_ascii_lowercase())
        .filter(|p| is_known_referrer_policy(p))
        .last();

    match policy.as_deref() {
        Some("no-referrer" | "same-origin" | "strict-origin" | "strict-origin-when-cross-origin") => {
            Evaluation::new(100)
        }
        Some("origin" | "origin-when-cross-origin") => Evaluation::new(80)
            .recommend("strict-origin-when-cross-origin avoids leaking origins over HTTP"),
        Some("no-referrer-when-downgrade") => Evaluation::new(70)
            .issue("no-referrer-when-downgrade leaks full URLs to other origins")
            .recommend("Use strict-origin-when-cross-origin"),
        Some(_) => Evaluation::new(30)
            .issue("unsafe-url sends the full URL to every origin")
            .recommend("Use strict-origin-when-cross-origin"),
        None => Evaluation::new(50)
            .issue(format!("Unrecognized Referrer-Policy value: {}", value))
            .recommend("Use strict-origin-when-cross-origin"),
    }
}

fn is_known_referrer_policy(policy: &str) -> bool {
    matches!(
        policy,
        "no-referrer"
            | "no-referrer-when-downgrade"
            | "origin"
            | "origin-when-cross-origin"
            | "same-origin"
            | "strict-origin"
            | "strict-origin-when-cross-origin"
            | "unsafe-url"
    )
}

fn evaluate_permissions_policy(value: &str) -> Evaluation {
    if value.is_empty() {
        return Evaluation::new(50)
            .issue("Permissions-Policy is empty")
            .recommend("Restrict sensitive features such as camera, microphone and geolocation");
    }

    let lowered = value.to_ascii_lowercase();
    let mut eval = Evaluation::new(100);

    if lowered.contains("=*") {
        eval.score -= 20;
        eval = eval
            .issue("Permissions-Policy grants a feature to all origins")
            .recommend("Replace * allowlists with explicit origins or ()");
    }

    for feature in ["camera", "microphone", "geolocation"] {
        let declared = lowered
            .split(',')
            .any(|d| d.trim().split('=').next().map(str::trim) == Some(feature));
        if !declared {
            eval.score -= 10;
            eval = eval.recommend(format!("Restrict the {} feature", feature));
        }
    }

    eval
}

fn evaluate_coep(value: &str) -> Evaluation {
    match value.to_ascii_lowercase().as_str() {
        "require-corp" => Evaluation::new(100),
        "credentialless" => Evaluation::new(90),
        "unsafe-none" => Evaluation::new(50)
            .issue("COEP unsafe-none disables cross-origin isolation")
            .recommend("Use require-corp or credentialless"),
        _ => Evaluation::new(40)
            .issue(format!("Unrecognized Cross-Origin-Embedder-Policy value: {}", value)),
    }
}

fn evaluate_coop(value: &str) -> Evaluation {
    // reporting suffixes such as `; report-to="x"` do not change the policy
    let policy = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match policy.as_str() {
        "same-origin" => Evaluation::new(100),
        "same-origin-allow-popups" => Evaluation::new(80)
            .recommend("Use same-origin unless popups must keep an opener"),
        "unsafe-none" => Evaluation::new(50)
            .issue("COOP unsafe-none shares the browsing context group with other origins")
            .recommend("Use same-origin"),
        _ => Evaluation::new(40)
            .issue(format!("Unrecognized Cross-Origin-Opener-Policy value: {}", value)),
    }
}

fn evaluate_corp(value: &str) -> Evaluation {
    match value.to_ascii_lowercase().as_str() {
        "same-origin" => Evaluation::new(100),
        "same-site" => Evaluation::new(90),
        "cross-origin" => Evaluation::new(70)
            .recommend("Use same-origin or same-site unless resources are meant to be shared"),
        _ => Evaluation::new(40)
            .issue(format!("Unrecognized Cross-Origin-Resource-Policy value: {}", value)),
    }
}

fn evaluate_xss_protection(value: &str) -> Evaluation {
    let lowered = value.replace(' ', "").to_ascii_lowercase();
    if lowered == "0" {
        Evaluation::new(100)
    } else if lowered.starts_with("1;mode=block") {
        Evaluation::new(80).recommend("The XSS auditor is removed from browsers; prefer X-XSS-Protection: 0 with a strict CSP")
    } else if lowered.starts_with('1') {
        Evaluation::new(60)
            .issue("X-XSS-Protection enabled without mode=block")
            .recommend("Set X-XSS-Protection: 0 and rely on CSP")
    } else {
        Evaluation::new(40).issue(format!("Invalid X-XSS-Protection value: {}", value))
    }
}

fn evaluate_expect_ct(value: &str) -> Evaluation {
    let eval = if value.to_ascii_lowercase().contains("max-age") {
        Evaluation::new(80)
    } else {
        Evaluation::new(60).issue("Expect-CT has no max-age")
    };
    eval.recommend("Expect-CT is deprecated and can be removed")
}

fn evaluate_public_key_pins(_value: &str) -> Evaluation {
    Evaluation::new(40)
        .issue("HTTP Public Key Pinning is deprecated and risks locking out clients")
        .recommend("Remove Public-Key-Pins")
}

fn evaluate_feature_policy(_value: &str) -> Evaluation {
    Evaluation::new(80).recommend("Migrate Feature-Policy to Permissions-Policy")
}

fn evaluate_report_to(value: &str) -> Evaluation {
    // the header is a comma separated list of JSON objects
    let groups: Vec<serde_json::Value> = match serde_json::from_str(&format!("[{}]", value)) {
        Ok(groups) => groups,
        Err(_) => {
            return Evaluation::new(50)
                .issue("Report-To is not valid JSON")
                .recommend("Use the {\"group\",\"max_age\",\"endpoints\"} JSON format")
        }
    };

    let valid = !groups.is_empty()
        && groups.iter().all(|g| {
            g.get("max_age").is_some_and(|v| v.is_u64())
                && g
                    .get("endpoints")
                    .and_then(|e| e.as_array())
                    .is_some_and(|e| !e.is_empty())
        });

    if valid {
        Evaluation::new(100)
    } else {
        Evaluation::new(70)
            .issue("Report-To group is missing max_age or endpoints")
            .recommend("Each group needs max_age and at least one endpoint")
    }
}

#[cfg(test)]
#[path = "header_analyzer_test.rs"]
mod tests;
