//! Welfare program catalog: the documents retrieval searches over.
//!
//! Loaded from a JSON file of the shape `{"programs": [...]}` or taken from
//! the built-in sample set.

use carebridge_core::error::RetrievalError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// One welfare program as stored in the catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelfareProgram {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub benefit: String,
    #[serde(default)]
    pub eligibility: Vec<String>,
    #[serde(default)]
    pub how_to_apply: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl WelfareProgram {
    /// Flattened text used for keyword matching.
    pub fn document_text(&self) -> String {
        [
            format!("프로그램명: {}", self.name),
            format!("분류: {}", self.category),
            format!("대상: {}", self.target),
            format!("설명: {}", self.description),
            format!("혜택: {}", self.benefit),
            format!("자격요건: {}", self.eligibility.join(", ")),
            format!("신청방법: {}", self.how_to_apply),
            format!("연락처: {}", self.contact),
            format!("키워드: {}", self.keywords.join(", ")),
        ]
        .join("\n")
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    programs: Vec<WelfareProgram>,
}

/// An ordered, immutable set of welfare programs.
#[derive(Debug, Clone, Default)]
pub struct WelfareCatalog {
    programs: Vec<WelfareProgram>,
}

impl WelfareCatalog {
    pub fn new(programs: Vec<WelfareProgram>) -> Self {
        Self { programs }
    }

    /// Parse a catalog document.
    pub fn from_json_str(raw: &str) -> Result<Self, RetrievalError> {
        let file: CatalogFile = serde_json::from_str(raw)
            .map_err(|e| RetrievalError::Catalog(format!("invalid catalog JSON: {e}")))?;

        let mut seen = BTreeSet::new();
        for program in &file.programs {
            if program.id.trim().is_empty() {
                return Err(RetrievalError::Catalog(format!(
                    "program '{}' has an empty id",
                    program.name
                )));
            }
            if !seen.insert(program.id.as_str()) {
                return Err(RetrievalError::Catalog(format!(
                    "duplicate program id '{}'",
                    program.id
                )));
            }
        }

        Ok(Self::new(file.programs))
    }

    /// Load a catalog from disk.
    pub fn from_json_file(path: &Path) -> Result<Self, RetrievalError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RetrievalError::Catalog(format!("failed to read {}: {e}", path.display()))
        })?;
        let catalog = Self::from_json_str(&raw)?;
        tracing::info!(path = %path.display(), programs = catalog.len(), "Welfare catalog loaded");
        Ok(catalog)
    }

    pub fn programs(&self) -> &[WelfareProgram] {
        &self.programs
    }

    pub fn get(&self, id: &str) -> Option<&WelfareProgram> {
        self.programs.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.programs
            .iter()
            .map(|p| p.category.clone())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sample programs shipped with the binary.
    pub fn builtin() -> Self {
        Self::new(vec![
            WelfareProgram {
                id: "basic-pension".into(),
                name: "기초연금".into(),
                category: "생활지원".into(),
                target: "만 65세 이상 어르신".into(),
                description: "어르신의 안정적인 노후생활을 위해 매월 연금을 지급합니다.".into(),
                benefit: "월 최대 32.4만원".into(),
                eligibility: vec![
                    "만 65세 이상".into(),
                    "소득인정액 기준 하위 70%".into(),
                ],
                how_to_apply: "주민센터 방문 또는 복지로 온라인 신청".into(),
                contact: "국민연금공단 1355".into(),
                keywords: vec!["연금".into(), "노후".into(), "현금".into()],
            },
            WelfareProgram {
                id: "energy-voucher".into(),
                name: "에너지바우처".into(),
                category: "에너지".into(),
                target: "기초생활수급자, 차상위계층 가구".into(),
                description: "저소득층 가구의 난방비와 냉방비를 지원합니다.".into(),
                benefit: "연간 최대 18.6만원".into(),
                eligibility: vec![
                    "기초생활수급자 또는 차상위계층".into(),
                    "만 65세 이상 가구원".into(),
                ],
                how_to_apply: "주민센터 방문 또는 온라인 신청".into(),
                contact: "한국에너지공단 1600-3190".into(),
                keywords: vec!["난방비".into(), "냉방비".into(), "바우처".into(), "겨울".into()],
            },
            WelfareProgram {
                id: "customized-care".into(),
                name: "노인맞춤돌봄서비스".into(),
                category: "돌봄".into(),
                target: "일상생활 영위가 어려운 취약 어르신".into(),
                description: "안부 확인, 생활교육, 가사 지원 등 맞춤형 돌봄을 제공합니다.".into(),
                benefit: "방문 안전지원, 사회참여, 생활교육, 일상생활 지원".into(),
                eligibility: vec![
                    "만 65세 이상".into(),
                    "기초생활수급자, 차상위계층 또는 기초연금 수급자".into(),
                ],
                how_to_apply: "주민센터 방문 신청".into(),
                contact: "보건복지상담센터 129".into(),
                keywords: vec!["돌봄".into(), "안부".into(), "방문".into(), "혼자".into(), "외로움".into()],
            },
            WelfareProgram {
                id: "senior-jobs".into(),
                name: "노인일자리".into(),
                category: "일자리".into(),
                target: "만 65세 이상 기초연금 수급자".into(),
                description: "공익활동, 사회서비스형 일자리로 소득과 사회참여를 지원합니다.".into(),
                benefit: "공익활동 월 29만원 수준의 활동비".into(),
                eligibility: vec!["만 65세 이상".into(), "기초연금 수급자".into()],
                how_to_apply: "노인일자리 여기 누리집 또는 수행기관 방문".into(),
                contact: "한국노인인력개발원 1544-3388".into(),
                keywords: vec!["일자리".into(), "활동비".into(), "소득".into(), "사회참여".into()],
            },
            WelfareProgram {
                id: "long-term-care".into(),
                name: "장기요양보험".into(),
                category: "의료".into(),
                target: "노인성 질병으로 혼자 생활하기 어려운 어르신".into(),
                description: "요양시설 입소나 방문요양, 방문목욕 등 장기요양 급여를 제공합니다.".into(),
                benefit: "재가급여 및 시설급여 비용의 85% 이상 지원".into(),
                eligibility: vec![
                    "만 65세 이상 또는 노인성 질병 보유".into(),
                    "장기요양등급 판정".into(),
                ],
                how_to_apply: "국민건강보험공단 지사 방문 또는 전화 신청".into(),
                contact: "국민건강보험공단 1577-1000".into(),
                keywords: vec!["요양".into(), "간병".into(), "방문요양".into(), "치매".into()],
            },
        ])
    }
}
