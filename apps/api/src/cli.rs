//! Command-line front end. Interactive commands prompt with dialoguer and print to stdout.

use std::fmt::Write;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dialoguer::{theme::ColorfulTheme, Input};

use crate::config::Config;
use crate::generation::generator::{
    default_payment_terms, default_rental_period, default_service_period, generate_and_save,
    ContractGenerator,
};
use crate::judge::evaluator::ContractJudge;
use crate::judge::handlers::{evaluate_stored, EvaluationResponse};
use crate::judge::parser::SCORE_KEYS;
use crate::server;
use crate::storage::handlers::SearchRequest;
use crate::storage::{ContractParams, ContractStorage, ContractSummary, ContractType};
use crate::telemetry::build_observer;

const RULE_WIDTH: usize = 60;

#[derive(Debug, Parser)]
#[command(
    name = "contract-agent",
    version,
    about = "ドキュメント管理AI Agent: 契約書の生成・検索・品質評価"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 賃貸契約書を対話形式で作成
    Rental,
    /// 業務委託契約書を対話形式で作成
    Service,
    /// 保存された契約書の一覧を表示
    ListContracts {
        /// rental | service | all
        #[arg(long)]
        contract_type: Option<String>,
    },
    /// 契約書を検索
    Search {
        #[arg(long)]
        query: Option<String>,
        /// rental | service | all
        #[arg(long)]
        contract_type: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date_from: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date_to: Option<String>,
    },
    /// 保存された契約書を品質評価
    Evaluate {
        /// e.g. rental_contract_20240101_120000_ab12cd34.txt
        file_name: String,
    },
    /// 自由形式の指示から契約書を生成（対話モード）
    Agent,
    /// Webサーバーを起動
    Serve,
}

/// A field collected interactively: params key, prompt label, optional default.
type FieldPrompt = (&'static str, &'static str, Option<fn() -> String>);

const RENTAL_PROMPTS: [FieldPrompt; 8] = [
    ("property_name", "物件名", None),
    ("address", "所在地", None),
    ("rent", "賃料（円）", None),
    ("deposit", "敷金（円）", None),
    ("key_money", "礼金（円）", None),
    ("period", "契約期間", Some(default_rental_period)),
    ("landlord_name", "貸主氏名", None),
    ("tenant_name", "借主氏名", None),
];

const SERVICE_PROMPTS: [FieldPrompt; 7] = [
    ("service_description", "業務内容", None),
    ("period", "委託期間", Some(default_service_period)),
    ("compensation", "報酬", None),
    ("payment_terms", "支払条件", Some(default_payment_terms)),
    ("client_company", "委託者会社名", None),
    ("client_representative", "委託者代表者名", None),
    ("contractor_name", "受託者名", None),
];

/// Runs a command. `serve` failures propagate; other command failures are printed.
pub async fn run(cmd: Command, config: &Config) -> Result<()> {
    if let Command::Serve = cmd {
        return server::serve(config).await;
    }

    if let Err(e) = dispatch(cmd, config).await {
        println!("❌ エラーが発生しました: {e}");
    }
    Ok(())
}

async fn dispatch(cmd: Command, config: &Config) -> Result<()> {
    let storage = ContractStorage::new(&config.contracts_dir);

    match cmd {
        Command::Rental => create(ContractType::Rental, &RENTAL_PROMPTS, config, &storage).await,
        Command::Service => {
            create(ContractType::Service, &SERVICE_PROMPTS, config, &storage).await
        }
        Command::ListContracts { contract_type } => {
            let contract_type = ContractType::parse_filter(contract_type.as_deref())?;
            let contracts = storage.list(contract_type).await?;
            print!("{}", format_contract_list(&contracts));
            Ok(())
        }
        Command::Search {
            query,
            contract_type,
            date_from,
            date_to,
        } => {
            let request = SearchRequest {
                query,
                contract_type,
                date_from,
                date_to,
            };
            let filters = request.to_filters()?;
            let contracts = storage.search(&filters).await?;
            println!("🔍 検索結果: {}件", contracts.len());
            print!("{}", format_contract_list(&contracts));
            Ok(())
        }
        Command::Evaluate { file_name } => {
            let observer = build_observer(&config.langfuse).await;
            let judge = ContractJudge::new(config, observer)?;
            println!("🔍 契約書を評価中: {file_name}");
            let response = evaluate_stored(&storage, &judge, &file_name).await?;
            print!("{}", format_evaluation(&response));
            Ok(())
        }
        Command::Agent => agent(config).await,
        Command::Serve => server::serve(config).await,
    }
}

const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "q"];

/// `exit`, `quit` or `q` in any case, surrounding whitespace ignored.
pub fn is_exit_command(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    EXIT_COMMANDS.contains(&input.as_str())
}

async fn agent(config: &Config) -> Result<()> {
    let observer = build_observer(&config.langfuse).await;
    let generator = ContractGenerator::new(config, observer)?;
    let theme = ColorfulTheme::default();

    println!("💼 契約書生成エージェントへようこそ！");
    println!("🔹 指示を入力してください（例: 業務委託契約書を作成してください）");
    println!("🔹 終了するには exit / quit / q を入力");

    loop {
        println!();
        let instruction = Input::<String>::with_theme(&theme)
            .with_prompt("📝 指示 >")
            .allow_empty(true)
            .interact_text()?;

        if is_exit_command(&instruction) {
            println!("👋 終了します。");
            return Ok(());
        }
        if instruction.trim().is_empty() {
            continue;
        }

        print!("{}", agent_turn(&generator, &instruction).await);
    }
}

/// One REPL turn. A failed turn is reported and the loop carries on.
async fn agent_turn(generator: &ContractGenerator, instruction: &str) -> String {
    match generator.generate_from_instruction(instruction).await {
        Ok(contract) => format!("\n📄 生成された契約書:\n\n{contract}\n"),
        Err(e) => format!("\n❌ エラーが発生しました: {e}\n"),
    }
}

async fn create(
    contract_type: ContractType,
    prompts: &[FieldPrompt],
    config: &Config,
    storage: &ContractStorage,
) -> Result<()> {
    let observer = build_observer(&config.langfuse).await;
    let generator = ContractGenerator::new(config, Arc::clone(&observer))?;

    println!("📝 {}の作成", contract_type.label());
    let params = prompt_params(prompts)?;

    println!("\n⏳ {}を生成中...", contract_type.label());
    let generated = generate_and_save(&generator, storage, contract_type, &params).await?;

    println!("\n✅ {}が生成されました！", contract_type.label());
    println!("📁 保存先: {}", generated.file_path);
    println!("\n📄 契約書内容:");
    println!("{}", "=".repeat(RULE_WIDTH));
    println!("{}", generated.content);
    println!("{}", "=".repeat(RULE_WIDTH));
    Ok(())
}

fn prompt_params(prompts: &[FieldPrompt]) -> Result<ContractParams> {
    let theme = ColorfulTheme::default();
    let mut params = ContractParams::new();

    for (key, label, default) in prompts {
        let mut input = Input::<String>::with_theme(&theme).with_prompt(*label);
        if let Some(default) = default {
            input = input.default(default());
        }
        params.insert((*key).to_string(), input.interact_text()?);
    }

    Ok(params)
}

pub fn format_contract_list(contracts: &[ContractSummary]) -> String {
    if contracts.is_empty() {
        return "📭 保存された契約書はありません。\n".to_string();
    }

    let rule = "-".repeat(RULE_WIDTH);
    let mut out = format!("\n📚 保存された契約書一覧 ({}件):\n{rule}\n", contracts.len());

    for contract in contracts {
        let metadata = &contract.metadata;
        let _ = writeln!(out, "📄 {}", contract.contract_type.label());
        let _ = writeln!(out, "   作成日時: {}", metadata.created_at);
        let _ = writeln!(out, "   ファイル: {}", contract.file_path);
        let fields = match contract.contract_type {
            ContractType::Rental => [("物件", "property_name"), ("賃料", "rent")],
            ContractType::Service => [("業務", "service_description"), ("報酬", "compensation")],
        };
        for (label, key) in fields {
            let _ = writeln!(out, "   {label}: {}", metadata.param(key).unwrap_or("N/A"));
        }
        let _ = writeln!(out, "{rule}");
    }

    out
}

pub fn format_evaluation(response: &EvaluationResponse) -> String {
    let mut out = String::new();

    let Some(evaluation) = response.evaluation.as_ref().filter(|_| response.success) else {
        let _ = writeln!(
            out,
            "❌ {}: {}",
            response.message,
            response.error.as_deref().unwrap_or("unknown error")
        );
        return out;
    };

    let _ = writeln!(out, "\n📊 評価結果");
    let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
    let _ = writeln!(
        out,
        "総合点: {}/100  評価: {:?}",
        evaluation.overall_score, evaluation.grade
    );
    let _ = writeln!(out, "概要: {}", evaluation.summary);
    for key in SCORE_KEYS {
        if let Some(score) = evaluation.scores.get(key) {
            let _ = writeln!(out, "   {key}: {score}/10");
        }
    }

    let sections = [
        ("💪 強み", &evaluation.strengths),
        ("⚠️ 弱点", &evaluation.weaknesses),
        ("💡 改善提案", &evaluation.recommendations),
        ("⚖️ 法的懸念点", &evaluation.legal_issues),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{title}:");
        for item in items {
            let _ = writeln!(out, "   - {item}");
        }
    }

    if let Some(trace_id) = &response.trace_id {
        let _ = writeln!(out, "🔗 トレースID: {trace_id}");
    }
    out
}
