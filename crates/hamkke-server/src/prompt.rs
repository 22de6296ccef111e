//! Prompt templates, model-output parsing, and the canned content returned
//! when the model is unavailable.

use std::sync::LazyLock;

use regex::Regex;

/// Numbered-list markers such as `1.` or `12.`.
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.").expect("valid regex"));

pub const FALLBACK_IDEAS: [&str; 3] = [
    "온라인 주문 시스템 도입으로 고객 편의성 향상",
    "SNS 마케팅을 통한 브랜드 인지도 제고",
    "고객 피드백을 활용한 서비스 개선",
];

pub const POLICY_FALLBACK: &str =
    "죄송합니다. 현재 정책 설명 서비스에 일시적인 문제가 발생했습니다. 잠시 후 다시 시도해주세요.";

pub const MISSING_BUSINESS_MESSAGE: &str = "사업 설명이 필요합니다.";
pub const MISSING_POLICY_TYPE_MESSAGE: &str = "정책 유형이 필요합니다.";
pub const IDEA_FAILURE_MESSAGE: &str = "아이디어 생성 중 오류가 발생했습니다.";
pub const POLICY_FAILURE_MESSAGE: &str = "정책 설명 생성 중 오류가 발생했습니다.";
pub const BODY_TOO_LARGE_MESSAGE: &str = "요청 본문이 너무 큽니다.";

pub fn fallback_ideas() -> Vec<String> {
    FALLBACK_IDEAS.iter().map(|s| s.to_string()).collect()
}

pub fn idea_prompt(business: &str) -> String {
    format!(
        "
다음 사업에 대한 실용적이고 구체적인 개선 아이디어 3가지를 한국어로 제안해주세요:

사업 설명: {business}

다음 형식으로 답변해주세요:
1. [첫 번째 아이디어]
2. [두 번째 아이디어]\x20
3. [세 번째 아이디어]

각 아이디어는 실제로 실행 가능하고 구체적이어야 하며, 소상공인이 적용할 수 있는 수준이어야 합니다.
"
    )
}

pub fn policy_prompt(policy_type: &str) -> String {
    format!(
        "
다음 소상공인 지원 정책에 대해 쉽고 자세하게 설명해주세요:

정책명: {policy_type}

다음 내용을 포함하여 설명해주세요:
- 정책의 목적과 대상
- 지원 내용 및 규모
- 신청 방법 및 절차
- 필요 서류
- 주의사항

소상공인이 이해하기 쉽게 친근한 톤으로 설명해주세요.
"
    )
}

/// Splits model output on numbered-list markers and keeps the trimmed,
/// non-blank fragments in order.
///
/// Any text before the first marker becomes a fragment of its own, and a
/// decimal such as `2.5` inside an idea also splits it.
pub fn parse_ideas(text: &str) -> Vec<String> {
    LIST_MARKER
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parsed ideas, or the full fallback list when nothing usable came back.
pub fn ideas_or_fallback(text: &str) -> Vec<String> {
    let ideas = parse_ideas(text);
    if ideas.is_empty() {
        fallback_ideas()
    } else {
        ideas
    }
}
