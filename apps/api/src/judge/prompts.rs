// Prompt constants for contract quality evaluation (LLM-as-a-judge).

/// System prompt for the judge model.
pub const JUDGE_SYSTEM: &str = "あなたは法務専門家として契約書の品質を客観的に評価します。";

pub const RENTAL_CRITERIA: &str = "【賃貸契約書評価基準】
1. 法的適合性 (1-10点): 日本の借地借家法・民法への準拠度
2. 情報完整性 (1-10点): 必要な契約条項の網羅性
3. 明瞭性 (1-10点): 条文の明確性・理解しやすさ
4. リスク管理 (1-10点): 貸主・借主双方のリスク配慮
5. 実用性 (1-10点): 実際の運用における有効性";

pub const RENTAL_CHECKLIST: &str = "- 物件詳細情報の記載
- 賃料・敷金・礼金の明記
- 契約期間と更新条件
- 修繕責任の明確化
- 解約条件の適切性";

pub const SERVICE_CRITERIA: &str = "【業務委託契約書評価基準】
1. 法的適合性 (1-10点): 日本の民法・労働法への準拠度
2. 業務範囲明確性 (1-10点): 委託業務の具体性・明確性
3. 報酬・支払条件 (1-10点): 報酬体系の明確性
4. 責任・リスク分担 (1-10点): 責任範囲の適切な分担
5. 契約管理 (1-10点): 契約変更・終了条件の適切性";

pub const SERVICE_CHECKLIST: &str = "- 業務内容の具体的記載
- 成果物・納期の明確化
- 報酬額と支払方法
- 知的財産権の取扱い
- 秘密保持義務";

/// Evaluation prompt template.
/// Replace: {contract_label}, {contract_content}, {metadata_json}, {criteria}, {checklist}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"あなたは法務の専門家として、以下の{contract_label}の品質を客観的に評価してください。

【契約書内容】
{contract_content}

【メタデータ】
{metadata_json}

{criteria}

【評価項目】
{checklist}

【評価形式】
以下のJSON形式で評価結果を出力してください：

{
    "overall_score": <総合点数 1-100>,
    "scores": {
        "legal_compliance": <法的適合性点数 1-10>,
        "completeness": <完整性点数 1-10>,
        "clarity": <明瞭性点数 1-10>,
        "risk_management": <リスク管理点数 1-10>,
        "practicality": <実用性点数 1-10>
    },
    "strengths": [
        "<強み1>",
        "<強み2>"
    ],
    "weaknesses": [
        "<弱点1>",
        "<弱点2>"
    ],
    "recommendations": [
        "<改善提案1>",
        "<改善提案2>"
    ],
    "legal_issues": [
        "<法的懸念点1>",
        "<法的懸念点2>"
    ],
    "grade": "<A/B/C/D/F>",
    "summary": "<100文字程度の総評>"
}

必ず上記JSON形式でのみ回答してください。"#;
