//! Server-rendered HTML for the browser UI. Every interpolated value goes through `escape`.

use std::fmt::Write;

use crate::generation::generator::{
    default_payment_terms, default_rental_period, default_service_period, GeneratedContract,
};
use crate::judge::handlers::EvaluationResponse;
use crate::judge::parser::SCORE_KEYS;
use crate::storage::handlers::SearchRequest;
use crate::storage::{ContractSummary, ContractType};

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2rem auto;padding:0 1rem}\
nav a{margin-right:1rem}table{border-collapse:collapse;width:100%}\
td,th{border:1px solid #ccc;padding:.4rem;text-align:left}\
pre{white-space:pre-wrap;background:#f6f6f6;padding:1rem}\
label{display:block;margin-top:.6rem}.error{color:#b00020}";

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="ja">
<head><meta charset="utf-8"><title>{title} | ドキュメント管理AI Agent</title><style>{STYLE}</style></head>
<body>
<nav><a href="/">ホーム</a><a href="/rental">賃貸契約書</a><a href="/service">業務委託契約書</a><a href="/contracts">一覧</a><a href="/search">検索</a><a href="/evaluate">品質評価</a></nav>
<h1>{title}</h1>
{body}
</body>
</html>"#,
        title = escape(title),
    )
}

fn text_field(name: &str, label: &str, default: Option<&str>) -> String {
    let (value, required) = match default {
        Some(v) => (escape(v), ""),
        None => (String::new(), " required"),
    };
    format!(r#"<label>{label}<br><input name="{name}" value="{value}"{required}></label>"#)
}

fn file_name_of(file_path: &str) -> &str {
    std::path::Path::new(file_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(file_path)
}

fn error_block(error: &str) -> String {
    format!(r#"<p class="error">❌ {}</p>"#, escape(error))
}

pub fn error_page(message: &str) -> String {
    layout("エラー", &error_block(message))
}

pub fn index() -> String {
    layout(
        "ドキュメント管理AI Agent",
        r#"<p>契約書の生成・管理・品質評価を行います。</p>
<ul>
<li><a href="/rental">賃貸契約書を作成</a></li>
<li><a href="/service">業務委託契約書を作成</a></li>
<li><a href="/contracts">保存された契約書一覧</a></li>
<li><a href="/search">契約書を検索</a></li>
<li><a href="/evaluate">契約書の品質評価</a></li>
</ul>"#,
    )
}

pub fn rental_form() -> String {
    let period = default_rental_period();
    let fields = [
        text_field("property_name", "物件名", None),
        text_field("address", "所在地", None),
        text_field("rent", "賃料（円）", None),
        text_field("deposit", "敷金（円）", None),
        text_field("key_money", "礼金（円）", None),
        text_field("period", "契約期間", Some(&period)),
        text_field("landlord_name", "貸主氏名", None),
        text_field("tenant_name", "借主氏名", None),
    ];
    form_page(ContractType::Rental, "/rental", &fields)
}

pub fn service_form() -> String {
    let period = default_service_period();
    let payment_terms = default_payment_terms();
    let fields = [
        text_field("service_description", "業務内容", None),
        text_field("period", "委託期間", Some(&period)),
        text_field("compensation", "報酬", None),
        text_field("payment_terms", "支払条件", Some(&payment_terms)),
        text_field("client_company", "委託者会社名", None),
        text_field("client_representative", "委託者代表者名", None),
        text_field("contractor_name", "受託者名", None),
    ];
    form_page(ContractType::Service, "/service", &fields)
}

fn form_page(contract_type: ContractType, action: &str, fields: &[String]) -> String {
    let body = format!(
        r#"<form method="post" action="{action}">
{}
<p><button type="submit">生成する</button></p>
</form>"#,
        fields.join("\n")
    );
    layout(&format!("{}作成", contract_type.label()), &body)
}

pub fn contract_result(result: Result<&GeneratedContract, String>) -> String {
    match result {
        Ok(generated) => {
            let body = format!(
                r#"<p>✅ {label}が生成されました！</p>
<p>📁 保存先: {path}</p>
<p><a href="/evaluate?file={file}">この契約書を評価する</a></p>
<h2>📄 契約書内容</h2>
<pre>{content}</pre>"#,
                label = generated.contract_type.label(),
                path = escape(&generated.file_path),
                file = escape(file_name_of(&generated.file_path)),
                content = escape(&generated.content),
            );
            layout("生成結果", &body)
        }
        Err(error) => layout("生成結果", &error_block(&error)),
    }
}

fn contracts_table(contracts: &[ContractSummary]) -> String {
    if contracts.is_empty() {
        return "<p>📭 保存された契約書はありません。</p>".to_string();
    }

    let mut rows = String::new();
    for contract in contracts {
        let metadata = &contract.metadata;
        let summary = match contract.contract_type {
            ContractType::Rental => format!(
                "物件: {} / 賃料: {}",
                metadata.param("property_name").unwrap_or("N/A"),
                metadata.param("rent").unwrap_or("N/A")
            ),
            ContractType::Service => format!(
                "業務: {} / 報酬: {}",
                metadata.param("service_description").unwrap_or("N/A"),
                metadata.param("compensation").unwrap_or("N/A")
            ),
        };
        let file = escape(file_name_of(&contract.file_path));
        let _ = write!(
            rows,
            r#"<tr><td>{label}</td><td>{created}</td><td><a href="/api/contracts/{file}">{file}</a></td><td>{summary}</td><td><a href="/evaluate?file={file}">評価</a></td></tr>"#,
            label = contract.contract_type.label(),
            created = escape(&metadata.created_at),
            summary = escape(&summary),
        );
    }

    format!(
        "<p>{}件</p><table><tr><th>種類</th><th>作成日時</th><th>ファイル</th><th>概要</th><th></th></tr>{rows}</table>",
        contracts.len()
    )
}

pub fn contracts_list(contracts: &[ContractSummary]) -> String {
    layout("📚 保存された契約書一覧", &contracts_table(contracts))
}

pub fn search_form() -> String {
    layout(
        "契約書検索",
        r#"<form method="post" action="/search">
<label>キーワード<br><input name="query"></label>
<label>種類<br><select name="contract_type">
<option value="all">すべて</option>
<option value="rental">賃貸契約書</option>
<option value="service">業務委託契約書</option>
</select></label>
<label>作成日（から）<br><input type="date" name="date_from"></label>
<label>作成日（まで）<br><input type="date" name="date_to"></label>
<p><button type="submit">検索</button></p>
</form>"#,
    )
}

pub fn search_results(request: &SearchRequest, result: Result<&[ContractSummary], String>) -> String {
    let criteria = format!(
        "<p>キーワード: {} / 種類: {} / 期間: {} 〜 {}</p>",
        escape(request.query.as_deref().unwrap_or("")),
        escape(request.contract_type.as_deref().unwrap_or("all")),
        escape(request.date_from.as_deref().unwrap_or("")),
        escape(request.date_to.as_deref().unwrap_or("")),
    );
    let body = match result {
        Ok(contracts) => format!(
            "{criteria}<p>検索結果: {}件</p>{}",
            contracts.len(),
            contracts_table(contracts)
        ),
        Err(error) => format!("{criteria}<p>検索結果: 0件</p>{}", error_block(&error)),
    };
    layout("検索結果", &body)
}

pub fn evaluation_page(contracts: &[ContractSummary], preselected: Option<&str>) -> String {
    let mut options = String::new();
    for contract in contracts {
        let file = file_name_of(&contract.file_path);
        let selected = if Some(file) == preselected { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{value}"{selected}>{label} {created} ({value})</option>"#,
            value = escape(file),
            label = contract.contract_type.label(),
            created = escape(&contract.metadata.created_at),
        );
    }

    let body = if contracts.is_empty() {
        "<p>📭 評価できる契約書がありません。</p>".to_string()
    } else {
        format!(
            r#"<form method="post" action="/evaluate">
<label>契約書<br><select name="file_name">{options}</select></label>
<p><button type="submit">評価する</button></p>
</form>"#
        )
    };
    layout("契約書品質評価", &body)
}

pub fn evaluation_result(file_name: &str, result: Result<&EvaluationResponse, String>) -> String {
    let header = format!("<p>対象: {}</p>", escape(file_name));
    let response = match result {
        Ok(response) => response,
        Err(error) => return layout("評価結果", &format!("{header}{}", error_block(&error))),
    };

    let Some(evaluation) = response.evaluation.as_ref().filter(|_| response.success) else {
        let error = response.error.as_deref().unwrap_or(&response.message);
        return layout("評価結果", &format!("{header}{}", error_block(error)));
    };

    let mut scores = String::new();
    for key in SCORE_KEYS {
        if let Some(score) = evaluation.scores.get(key) {
            let _ = write!(scores, "<tr><td>{key}</td><td>{score}/10</td></tr>");
        }
    }

    let list = |items: &[String]| -> String {
        if items.is_empty() {
            return "<p>なし</p>".to_string();
        }
        let li: String = items
            .iter()
            .map(|i| format!("<li>{}</li>", escape(i)))
            .collect();
        format!("<ul>{li}</ul>")
    };

    let mut body = format!(
        r#"{header}
<p>総合点: <strong>{overall}/100</strong> 評価: <strong>{grade:?}</strong></p>
<p>{summary}</p>
<table><tr><th>項目</th><th>点数</th></tr>{scores}</table>
<h2>強み</h2>{strengths}
<h2>弱点</h2>{weaknesses}
<h2>改善提案</h2>{recommendations}
<h2>法的懸念点</h2>{legal_issues}"#,
        overall = evaluation.overall_score,
        grade = evaluation.grade,
        summary = escape(&evaluation.summary),
        strengths = list(&evaluation.strengths),
        weaknesses = list(&evaluation.weaknesses),
        recommendations = list(&evaluation.recommendations),
        legal_issues = list(&evaluation.legal_issues),
    );
    if let Some(trace_id) = &response.trace_id {
        let _ = write!(body, "<p>トレースID: {}</p>", escape(trace_id));
    }
    layout("評価結果", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::parser::fallback_evaluation;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn test_rental_form_prefills_period_default() {
        let html = rental_form();
        assert!(html.contains(r#"name="period" value="2年""#));
        assert!(html.contains(r#"name="property_name" value="" required"#));
    }

    #[test]
    fn test_contract_result_escapes_generated_content() {
        let generated = GeneratedContract {
            contract_type: ContractType::Rental,
            file_path: "contracts/rental/rental_contract_x.txt".to_string(),
            content: "<b>第1条</b>".to_string(),
        };
        let html = contract_result(Ok(&generated));
        assert!(html.contains("&lt;b&gt;第1条&lt;/b&gt;"));
        assert!(html.contains("/evaluate?file=rental_contract_x.txt"));
    }

    #[test]
    fn test_evaluation_result_shows_scores() {
        let response = EvaluationResponse {
            success: true,
            message: "ok".to_string(),
            trace_id: Some("trace-1".to_string()),
            evaluation: Some(fallback_evaluation("bad")),
            error: None,
        };
        let html = evaluation_result("a.txt", Ok(&response));
        assert!(html.contains("50/100"));
        assert!(html.contains("<td>clarity</td><td>5/10</td>"));
        assert!(html.contains("トレースID: trace-1"));
    }

    #[test]
    fn test_empty_contract_list_message() {
        assert!(contracts_list(&[]).contains("保存された契約書はありません"));
    }
}
