//! Judge response parsing.
//!
//! Three stages, each usable on its own:
//! 1. `decode_full`: the whole response (code fences stripped) is the JSON object.
//! 2. `extract_braced`: slice from the first `{` to the last `}` and decode that.
//! 3. `fallback_evaluation`: fixed neutral record carrying the parse error.
//!
//! `parse_evaluation` chains them and always returns a result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::llm_client::strip_json_fences;

/// Sub-score keys the judge prompt asks for.
pub const SCORE_KEYS: [&str; 5] = [
    "legal_compliance",
    "completeness",
    "clarity",
    "risk_management",
    "practicality",
];

const DEFAULT_OVERALL_SCORE: i64 = 50;
const FALLBACK_SUB_SCORE: i64 = 5;

/// Letter grade. Decoded from the first letter of the model's string (`"B+"` → B).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Grade {
    A,
    B,
    #[default]
    C,
    D,
    F,
}

impl TryFrom<String> for Grade {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().chars().next().map(|c| c.to_ascii_uppercase()) {
            Some('A') => Ok(Grade::A),
            Some('B') => Ok(Grade::B),
            Some('C') => Ok(Grade::C),
            Some('D') => Ok(Grade::D),
            Some('F') => Ok(Grade::F),
            _ => Err(format!("unknown grade: {value:?}")),
        }
    }
}

/// Structured score sheet produced by the judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// 1 – 100
    pub overall_score: i64,
    /// Each 1 – 10
    pub scores: BTreeMap<String, i64>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub legal_issues: Vec<String>,
    pub grade: Grade,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

/// Shape of the model's JSON before clamping. Every field is optional.
#[derive(Debug, Deserialize)]
struct RawEvaluation {
    #[serde(default)]
    overall_score: Option<f64>,
    #[serde(default)]
    scores: BTreeMap<String, f64>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    legal_issues: Vec<String>,
    #[serde(default)]
    grade: Option<Grade>,
    #[serde(default)]
    summary: String,
}

impl From<RawEvaluation> for EvaluationResult {
    fn from(raw: RawEvaluation) -> Self {
        EvaluationResult {
            overall_score: clamp_overall_score(raw.overall_score),
            scores: complete_scores(raw.scores),
            strengths: raw.strengths,
            weaknesses: raw.weaknesses,
            recommendations: raw.recommendations,
            legal_issues: raw.legal_issues,
            grade: raw.grade.unwrap_or_default(),
            summary: raw.summary,
            parse_error: None,
        }
    }
}

/// Clamps into [1, 100]; an absent score becomes 50.
pub fn clamp_overall_score(score: Option<f64>) -> i64 {
    score
        .map(|s| (s.round() as i64).clamp(1, 100))
        .unwrap_or(DEFAULT_OVERALL_SCORE)
}

fn clamp_sub_score(score: f64) -> i64 {
    (score.round() as i64).clamp(1, 10)
}

/// Clamps every reported sub-score; a missing `SCORE_KEYS` entry gets the neutral 5.
fn complete_scores(reported: BTreeMap<String, f64>) -> BTreeMap<String, i64> {
    let mut scores: BTreeMap<String, i64> = reported
        .into_iter()
        .map(|(k, v)| (k, clamp_sub_score(v)))
        .collect();
    for key in SCORE_KEYS {
        scores.entry(key.to_string()).or_insert(FALLBACK_SUB_SCORE);
    }
    scores
}

/// Stage 1: decode the entire response as the evaluation object.
pub fn decode_full(raw: &str) -> Result<EvaluationResult, serde_json::Error> {
    serde_json::from_str::<RawEvaluation>(strip_json_fences(raw)).map(EvaluationResult::from)
}

/// Stage 2 slice: text from the first `{` through the last `}`, if both exist in order.
pub fn extract_braced(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (start < end).then(|| &raw[start..=end])
}

/// Stage 3: neutral record returned when the response cannot be decoded.
pub fn fallback_evaluation(parse_error: impl Into<String>) -> EvaluationResult {
    EvaluationResult {
        overall_score: DEFAULT_OVERALL_SCORE,
        scores: SCORE_KEYS
            .iter()
            .map(|k| (k.to_string(), FALLBACK_SUB_SCORE))
            .collect(),
        strengths: vec!["評価結果の解析に失敗しました".to_string()],
        weaknesses: vec!["詳細な評価ができませんでした".to_string()],
        recommendations: vec!["再評価を実行してください".to_string()],
        legal_issues: vec![],
        grade: Grade::C,
        summary: "評価処理中にエラーが発生しました".to_string(),
        parse_error: Some(parse_error.into()),
    }
}

/// Runs the full pipeline. Never fails.
pub fn parse_evaluation(raw: &str) -> EvaluationResult {
    if let Ok(result) = decode_full(raw) {
        return result;
    }

    let Some(slice) = extract_braced(raw) else {
        return fallback_evaluation("no JSON object found in judge response");
    };

    match serde_json::from_str::<RawEvaluation>(slice) {
        Ok(raw) => raw.into(),
        Err(e) => fallback_evaluation(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RESPONSE: &str = r#"{
        "overall_score": 85,
        "scores": {
            "legal_compliance": 9,
            "completeness": 8,
            "clarity": 8,
            "risk_management": 7,
            "practicality": 9
        },
        "strengths": ["賃料・敷金の明記"],
        "weaknesses": ["更新条件が曖昧"],
        "recommendations": ["更新料の条項を追加"],
        "legal_issues": [],
        "grade": "B",
        "summary": "概ね良好な契約書です"
    }"#;

    #[test]
    fn test_decode_full_accepts_clean_json() {
        let result = decode_full(FULL_RESPONSE).unwrap();
        assert_eq!(result.overall_score, 85);
        assert_eq!(result.grade, Grade::B);
        assert_eq!(result.scores["legal_compliance"], 9);
        assert_eq!(result.strengths, vec!["賃料・敷金の明記"]);
        assert!(result.parse_error.is_none());
    }

    #[test]
    fn test_decode_full_accepts_fenced_json() {
        let fenced = format!("```json\n{FULL_RESPONSE}\n```");
        assert_eq!(decode_full(&fenced).unwrap().overall_score, 85);
    }

    #[test]
    fn test_parse_extracts_object_surrounded_by_noise() {
        let raw = format!("noise {FULL_RESPONSE} trailing");
        assert!(decode_full(&raw).is_err());

        let result = parse_evaluation(&raw);
        assert_eq!(result.overall_score, 85);
        assert_eq!(result.summary, "概ね良好な契約書です");
        assert!(result.parse_error.is_none());
    }

    #[test]
    fn test_extract_braced_spans_first_to_last_brace() {
        assert_eq!(extract_braced("a {\"x\": {\"y\": 1}} b"), Some("{\"x\": {\"y\": 1}}"));
        assert_eq!(extract_braced("no braces"), None);
        assert_eq!(extract_braced("} backwards {"), None);
    }

    #[test]
    fn test_non_json_response_yields_fallback() {
        let result = parse_evaluation("申し訳ありませんが評価できません。");
        assert_eq!(result.overall_score, 50);
        assert_eq!(result.grade, Grade::C);
        assert!(result.scores.values().all(|&s| s == 5));
        assert_eq!(result.scores.len(), 5);
        assert!(result.legal_issues.is_empty());
        assert!(!result.parse_error.unwrap().is_empty());
    }

    #[test]
    fn test_malformed_braced_json_yields_fallback_with_decode_error() {
        let result = parse_evaluation("here: {\"overall_score\": 85, oops} done");
        assert_eq!(result.overall_score, 50);
        assert!(result.parse_error.is_some());
    }

    #[test]
    fn test_overall_score_is_clamped() {
        assert_eq!(parse_evaluation(r#"{"overall_score": 150}"#).overall_score, 100);
        assert_eq!(parse_evaluation(r#"{"overall_score": -5}"#).overall_score, 1);
        assert_eq!(parse_evaluation(r#"{"overall_score": 72.6}"#).overall_score, 73);
        assert_eq!(parse_evaluation(r#"{"grade": "A"}"#).overall_score, 50);
    }

    #[test]
    fn test_sub_scores_are_clamped() {
        let result = parse_evaluation(r#"{"scores": {"clarity": 14, "completeness": 0}}"#);
        assert_eq!(result.scores["clarity"], 10);
        assert_eq!(result.scores["completeness"], 1);
    }

    #[test]
    fn test_missing_sub_scores_default_to_neutral() {
        let result = parse_evaluation(r#"{"overall_score": 80}"#);
        assert_eq!(result.overall_score, 80);
        assert_eq!(result.scores.len(), SCORE_KEYS.len());
        assert!(result.scores.values().all(|&score| score == 5));

        let partial = parse_evaluation(r#"{"scores": {"clarity": 9}}"#);
        assert_eq!(partial.scores["clarity"], 9);
        assert_eq!(partial.scores["practicality"], 5);
        assert!(partial.parse_error.is_none());
    }

    #[test]
    fn test_grade_reads_first_letter() {
        assert_eq!(Grade::try_from("B+".to_string()), Ok(Grade::B));
        assert_eq!(Grade::try_from(" a".to_string()), Ok(Grade::A));
        assert!(Grade::try_from("Excellent".to_string()).is_err());
        assert!(Grade::try_from(String::new()).is_err());
    }

    #[test]
    fn test_unknown_grade_falls_back() {
        let result = parse_evaluation(r#"{"overall_score": 90, "grade": "S"}"#);
        assert_eq!(result.overall_score, 50);
        assert!(result.parse_error.is_some());
    }

    #[test]
    fn test_fallback_serializes_parse_error() {
        let value = serde_json::to_value(fallback_evaluation("bad json")).unwrap();
        assert_eq!(value["parse_error"], "bad json");
        assert_eq!(value["grade"], "C");

        let clean = serde_json::to_value(decode_full(FULL_RESPONSE).unwrap()).unwrap();
        assert!(clean.get("parse_error").is_none());
    }
}
