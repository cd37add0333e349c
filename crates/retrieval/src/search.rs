//! Keyword relevance search over the welfare catalog.
//!
//! Each query token scores against a program by the strongest field it hits
//! (name > keywords/category > any other field). A program's score is the
//! mean over query tokens, so it always lies in [0, 1].

use crate::catalog::{WelfareCatalog, WelfareProgram};
use carebridge_core::retrieval::ProgramMatch;

const NAME_WEIGHT: f32 = 1.0;
const TERM_WEIGHT: f32 = 0.75;
const TEXT_WEIGHT: f32 = 0.5;

/// Header of an LLM context block.
pub const CONTEXT_HEADER: &str = "[관련 복지 정보]";

/// Returned by `format_context` when nothing matched.
pub const NO_RESULTS: &str = "관련 복지 정보를 찾지 못했습니다.";

/// Split a query into lowercase tokens of at least two characters.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(String::from)
        .collect()
}

/// Containment in either direction, so "기초연금은" still hits "기초연금".
fn overlaps(term: &str, token: &str) -> bool {
    let term = term.to_lowercase();
    term.chars().count() >= 2 && (term.contains(token) || token.contains(term.as_str()))
}

fn searchable_text(program: &WelfareProgram) -> String {
    let mut parts = vec![
        program.target.as_str(),
        program.description.as_str(),
        program.benefit.as_str(),
        program.how_to_apply.as_str(),
        program.contact.as_str(),
    ];
    parts.extend(program.eligibility.iter().map(String::as_str));
    parts.join(" ").to_lowercase()
}

/// Relevance of `program` for the given query tokens, in [0, 1].
pub fn score_program(program: &WelfareProgram, tokens: &[String]) -> f32 {
    if tokens.is_empty() {
        return 0.0;
    }
    let text = searchable_text(program);

    let total: f32 = tokens
        .iter()
        .map(|token| {
            if overlaps(&program.name, token) {
                NAME_WEIGHT
            } else if overlaps(&program.category, token)
                || program.keywords.iter().any(|k| overlaps(k, token))
            {
                TERM_WEIGHT
            } else if text.contains(token.as_str()) {
                TEXT_WEIGHT
            } else {
                0.0
            }
        })
        .sum();

    (total / tokens.len() as f32).clamp(0.0, 1.0)
}

fn to_match(program: &WelfareProgram, score: f32) -> ProgramMatch {
    ProgramMatch {
        program_id: program.id.clone(),
        name: program.name.clone(),
        category: program.category.clone(),
        description: program.description.clone(),
        benefit: program.benefit.clone(),
        eligibility: program.eligibility.clone(),
        how_to_apply: program.how_to_apply.clone(),
        contact: program.contact.clone(),
        score,
    }
}

/// Rank catalog programs for `query`, best first, ties in catalog order.
///
/// A blank query lists the catalog (score 0). Otherwise programs with no
/// matching token are dropped.
pub fn rank(
    catalog: &WelfareCatalog,
    query: &str,
    top_k: usize,
    category: Option<&str>,
) -> Vec<ProgramMatch> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());
    let in_category = |p: &&WelfareProgram| {
        category.is_none_or(|c| p.category.eq_ignore_ascii_case(c))
    };
    let tokens = tokenize(query);

    let mut scored: Vec<(f32, &WelfareProgram)> = if tokens.is_empty() {
        catalog
            .programs()
            .iter()
            .filter(in_category)
            .map(|p| (0.0, p))
            .collect()
    } else {
        catalog
            .programs()
            .iter()
            .filter(in_category)
            .map(|p| (score_program(p, &tokens), p))
            .filter(|(score, _)| *score > 0.0)
            .collect()
    };

    // Stable sort keeps catalog order among equal scores
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored.into_iter().map(|(score, p)| to_match(p, score)).collect()
}

/// Render matches as the context block handed to the language model.
pub fn format_context(matches: &[ProgramMatch]) -> String {
    if matches.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut parts = vec![CONTEXT_HEADER.to_string()];
    for (i, m) in matches.iter().enumerate() {
        parts.push(format!("\n--- {}. {} ---", i + 1, m.name));
        parts.push(format!("분류: {}", m.category));
        parts.push(format!("설명: {}", m.description));
        parts.push(format!("혜택: {}", m.benefit));
        parts.push(format!("자격요건: {}", m.eligibility.join(", ")));
        parts.push(format!("신청방법: {}", m.how_to_apply));
        parts.push(format!("문의: {}", m.contact));
    }
    parts.join("\n")
}
