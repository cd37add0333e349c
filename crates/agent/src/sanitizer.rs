//! Output sanitizer: strips meta-commentary the model sometimes leaks into
//! replies (risk annotations, "edited response" markers, answer labels).
//!
//! Deterministic and idempotent: `sanitize` repeats a single cleaning pass
//! until the text stops changing. Every pass that changes the text either
//! shortens it or only normalizes whitespace, so the loop terminates.

use regex_lite::{Captures, Regex};
use std::sync::LazyLock;

/// Glyph that introduces an annotation, as in "(※ 위험도 반영)".
pub const MARKER: char = '※';

/// Keywords that mark a parenthetical span as meta-commentary.
pub const PAREN_KEYWORDS: &[&str] = &[
    "위험도",
    "위험 수준",
    "감정 반영",
    "검색 결과",
    "적용 기법",
    "기법 적용",
    "risk level",
    "emotion reflection",
    "retrieval result",
    "technique applied",
];

/// Keywords that mark an asterisk-delimited span as meta-commentary.
pub const ASTERISK_KEYWORDS: &[&str] = &["수정", "응답", "분석", "edit", "response", "analysis"];

/// Innermost parenthetical span, ASCII or full-width.
static PAREN_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(（]([^()（）]*)[)）]").expect("valid parenthetical pattern"));

/// Asterisk-delimited span with an optional trailing colon. The content may
/// not start or end with whitespace, so a lone `*` in prose never opens one.
static ASTERISK_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*+([^*\s](?:[^*]*[^*\s])?)\*+([:：]?)").expect("valid asterisk pattern")
});

static LEADING_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:응답|분석|결과|답변|response|analysis|result|answer)\s*[:：]\s*")
        .expect("valid label pattern")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace pattern"));

static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" +([.?!])").expect("valid punctuation pattern"));

fn contains_keyword(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

fn is_meta_parenthetical(inner: &str) -> bool {
    inner.trim_start().starts_with(MARKER) || contains_keyword(inner, PAREN_KEYWORDS)
}

/// One cleaning pass.
fn sanitize_once(text: &str) -> String {
    let text = PAREN_SPAN.replace_all(text, |caps: &Captures| {
        if is_meta_parenthetical(&caps[1]) {
            String::new()
        } else {
            caps[0].to_string()
        }
    });

    let text = ASTERISK_SPAN.replace_all(&text, |caps: &Captures| {
        if contains_keyword(&caps[1], ASTERISK_KEYWORDS) {
            String::new()
        } else {
            caps[0].to_string()
        }
    });

    let text = LEADING_LABEL.replace(&text, "");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    let text = SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    text.trim().to_string()
}

/// Remove meta-commentary from a model reply.
pub fn sanitize(text: &str) -> String {
    let mut current = sanitize_once(text);
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_marker_parenthetical() {
        assert_eq!(
            sanitize("많이 속상하셨겠어요 (※ 공감 우선). 오늘은 어떠세요?"),
            "많이 속상하셨겠어요. 오늘은 어떠세요?"
        );
    }

    #[test]
    fn removes_keyword_parentheticals_ascii_and_full_width() {
        assert_eq!(
            sanitize("그러셨군요（위험도: 1, 감정 반영）. 산책은 다녀오셨어요?"),
            "그러셨군요. 산책은 다녀오셨어요?"
        );
        assert_eq!(
            sanitize("I hear you (Risk Level: 0). How was lunch?"),
            "I hear you. How was lunch?"
        );
    }

    #[test]
    fn keeps_ordinary_parentheticals() {
        let text = "기초연금(월 최대 32.4만원)은 주민센터에서 신청하세요.";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn removes_asterisk_meta_spans_with_colon() {
        assert_eq!(
            sanitize("**수정된 응답:** 날씨가 많이 추워요. 따뜻하게 입으세요!"),
            "날씨가 많이 추워요. 따뜻하게 입으세요!"
        );
        assert_eq!(sanitize("*Response*: Stay warm today."), "Stay warm today.");
    }

    #[test]
    fn keeps_ordinary_emphasis() {
        let text = "*꼭* 약을 챙겨 드세요.";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn stray_asterisks_do_not_pair_across_prose() {
        let text = "별 5개 * 분석해 보니 좋아요 *꼭*";
        assert_eq!(sanitize(text), text);
        assert_eq!(sanitize("3 * 4 는 12예요. 응답 잘 들었어요 *"), "3 * 4 는 12예요. 응답 잘 들었어요 *");
        assert_eq!(sanitize("별 * 하나 *분석 메모* 좋아요"), "별 * 하나 좋아요");
    }

    #[test]
    fn strips_leading_label() {
        assert_eq!(sanitize("답변: 오늘은 맑아요."), "오늘은 맑아요.");
        assert_eq!(sanitize("Answer:  It is sunny."), "It is sunny.");
        assert_eq!(sanitize("오늘 결과: 좋아요."), "오늘 결과: 좋아요.");
    }

    #[test]
    fn collapses_whitespace_and_space_before_punctuation() {
        assert_eq!(sanitize("  안녕하세요  \n\n 어르신 !  "), "안녕하세요 어르신!");
    }

    #[test]
    fn label_exposed_by_removed_span_is_stripped() {
        assert_eq!(sanitize("(※ 메모) 응답: 네, 맞아요."), "네, 맞아요.");
    }

    #[test]
    fn idempotent_on_mixed_input() {
        let samples = [
            "**분석** (위험도 2) 응답: 괜찮으세요 ? (※ 기법 적용)",
            "결과: 결과: 두 번",
            "((위험도)) 남은 괄호",
            "*a* 응답 *b*",
            "",
            "   ",
        ];
        for sample in samples {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize(""), "");
    }
}
