// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::*;
use crate::domain::analysis::header_analyzer::HeaderCspScore;

#[test]
fn test_empty_policy() {
    let policy = CspParser::new().parse("   ");

    assert_eq!(policy.score, 0);
    assert_eq!(policy.grade, Grade::F);
    assert_eq!(policy.issues, vec!["Empty CSP header".to_string()]);
    assert!(policy.directives.is_empty());
}

#[test]
fn test_parse_directives_and_flags() {
    let policy = CspParser::new().parse(
        "Default-Src 'self';  script-src 'self' 'unsafe-inline' 'strict-dynamic' ; img-src *",
    );

    assert_eq!(policy.directives.len(), 3);
    assert_eq!(policy.directives[0].name, "default-src");
    assert_eq!(
        policy.directive("script-src").unwrap().values,
        vec!["'self'", "'unsafe-inline'", "'strict-dynamic'"]
    );
    assert!(policy.has_unsafe_inline);
    assert!(!policy.has_unsafe_eval);
    assert!(policy.has_strict_dynamic);
    assert_eq!(
        policy.missing_directives,
        vec!["object-src", "base-uri", "frame-ancestors"]
    );
    // -30 inline, -30 missing, -5 reporting, +5 strict-dynamic; img-src * is exempt
    assert_eq!(policy.score, 40);
}

#[test]
fn test_duplicate_directive_keeps_first() {
    let policy = CspParser::new().parse("script-src 'none'; script-src *");

    assert_eq!(policy.directives.len(), 1);
    assert_eq!(policy.directive("script-src").unwrap().values, vec!["'none'"]);
    assert!(policy.issues.iter().any(|i| i.contains("Duplicate script-src")));
}

#[test]
fn test_wildcard_penalty_outside_img_src() {
    let policy = CspParser::new().parse(
        "default-src *; script-src 'self'; object-src 'none'; base-uri 'self'; \
         frame-ancestors 'none'; report-uri /csp",
    );
    assert_eq!(policy.score, 90);
    assert_eq!(policy.grade, Grade::A);
}

#[test]
fn test_bonuses_are_clamped() {
    let policy = CspParser::new().parse(
        "default-src 'self'; script-src 'strict-dynamic'; object-src 'none'; base-uri 'none'; \
         frame-ancestors 'none'; report-to csp; upgrade-insecure-requests",
    );
    assert_eq!(policy.score, 100);
    assert!(policy.issues.is_empty());
}

/// 两套 CSP 评分规则互不相同，同一个策略会得到不同的分数
#[test]
fn test_policy_and_header_scores_diverge() {
    let header_score = HeaderCspScore::evaluate("default-src 'self'");
    let policy = CspParser::new().parse("default-src 'self'");

    assert_eq!((header_score.score, header_score.grade), (70, Grade::C));
    assert_eq!((policy.score, policy.grade), (55, Grade::F));
}

#[test]
fn test_none_blocks_everything() {
    let policy = CspParser::new().parse("default-src 'none'");

    assert!(policy.would_block_source("script-src", "https://cdn.example.com"));
    assert!(policy.would_block_source("img-src", "data:"));
}

#[test]
fn test_falls_back_to_default_src() {
    let policy = CspParser::new().parse("default-src https://cdn.example.com; img-src *");

    assert!(!policy.would_block_source("script-src", "https://cdn.example.com"));
    assert!(policy.would_block_source("script-src", "https://evil.example.org"));
    assert!(!policy.would_block_source("img-src", "https://anything.example.org"));
}

#[test]
fn test_no_governing_directive_allows() {
    let policy = CspParser::new().parse("img-src 'none'");
    assert!(!policy.would_block_source("script-src", "https://evil.example.org"));
}

#[test]
fn test_scheme_source_allows_matching_scheme() {
    let policy = CspParser::new().parse("script-src https:");

    assert!(!policy.would_block_source("script-src", "https://cdn.example.com/app.js"));
    assert!(policy.would_block_source("script-src", "ftp://files.example.com"));
}

#[test]
fn test_self_allows_any_source() {
    let policy = CspParser::new().parse("script-src 'self'");
    assert!(!CspParser::would_block_source(
        &policy,
        "script-src",
        "https://elsewhere.example.net"
    ));
}
