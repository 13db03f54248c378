//! Contract Generation: renders a prompt from contract params and asks the model for
//! the full contract text.
//!
//! Flow: render template → trace start → LLM complete → generation record → return text.
//! The completion is returned verbatim; nothing checks that it is a well-formed contract.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;
use crate::generation::prompts::{
    INSTRUCTION_PROMPT_TEMPLATE, INSTRUCTION_SYSTEM, RENTAL_FIELDS, RENTAL_PROMPT_TEMPLATE,
    RENTAL_SYSTEM, SERVICE_FIELDS, SERVICE_PROMPT_TEMPLATE, SERVICE_SYSTEM,
};
use crate::llm_client::{fill_template, CompletionRequest, LlmClient};
use crate::storage::{ContractParams, ContractStorage, ContractType};
use crate::telemetry::{ErrorEvent, GenerationRecord, TraceObserver, TraceStart};

/// Model used for contract drafting.
pub const GENERATION_MODEL: &str = "gpt-3.5-turbo";
/// Model used for free-form instruction drafting.
pub const INSTRUCTION_MODEL: &str = "gpt-4";
const GENERATION_TEMPERATURE: f32 = 0.2;

// ────────────────────────────────────────────────────────────────────────────
// Request models
// ────────────────────────────────────────────────────────────────────────────

/// Request body for a rental contract (JSON API and web form).
#[derive(Debug, Clone, Deserialize)]
pub struct RentalContractRequest {
    pub property_name: String,
    pub address: String,
    pub rent: String,
    pub deposit: String,
    pub key_money: String,
    #[serde(default = "default_rental_period")]
    pub period: String,
    pub landlord_name: String,
    pub tenant_name: String,
}

/// Request body for a service contract (JSON API and web form).
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceContractRequest {
    pub service_description: String,
    #[serde(default = "default_service_period")]
    pub period: String,
    pub compensation: String,
    #[serde(default = "default_payment_terms")]
    pub payment_terms: String,
    pub client_company: String,
    pub client_representative: String,
    pub contractor_name: String,
}

pub fn default_rental_period() -> String {
    "2年".to_string()
}

pub fn default_service_period() -> String {
    "6ヶ月".to_string()
}

pub fn default_payment_terms() -> String {
    "月末締め翌月末支払い".to_string()
}

impl RentalContractRequest {
    pub fn into_params(self) -> ContractParams {
        to_params([
            ("property_name", self.property_name),
            ("address", self.address),
            ("rent", self.rent),
            ("deposit", self.deposit),
            ("key_money", self.key_money),
            ("period", self.period),
            ("landlord_name", self.landlord_name),
            ("tenant_name", self.tenant_name),
        ])
    }
}

impl ServiceContractRequest {
    pub fn into_params(self) -> ContractParams {
        to_params([
            ("service_description", self.service_description),
            ("period", self.period),
            ("compensation", self.compensation),
            ("payment_terms", self.payment_terms),
            ("client_company", self.client_company),
            ("client_representative", self.client_representative),
            ("contractor_name", self.contractor_name),
        ])
    }
}

fn to_params<const N: usize>(fields: [(&str, String); N]) -> ContractParams {
    fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// A contract that has been generated and written to storage.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedContract {
    pub contract_type: ContractType,
    pub file_path: String,
    pub content: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Generator
// ────────────────────────────────────────────────────────────────────────────

/// Drafts contracts through the LLM client and reports each call to the observer.
#[derive(Clone)]
pub struct ContractGenerator {
    llm: LlmClient,
    observer: Arc<dyn TraceObserver>,
}

impl ContractGenerator {
    /// Fails with a configuration error when no usable model API key is configured.
    pub fn new(config: &Config, observer: Arc<dyn TraceObserver>) -> Result<Self, AppError> {
        let api_key = config.require_openai_key()?;
        Ok(Self::with_client(
            LlmClient::new(api_key, &config.openai_base_url),
            observer,
        ))
    }

    pub fn with_client(llm: LlmClient, observer: Arc<dyn TraceObserver>) -> Self {
        Self { llm, observer }
    }

    pub async fn generate_rental(&self, params: &ContractParams) -> Result<String, AppError> {
        self.generate(ContractType::Rental, params).await
    }

    pub async fn generate_service(&self, params: &ContractParams) -> Result<String, AppError> {
        self.generate(ContractType::Service, params).await
    }

    /// Renders the type's prompt and returns the model's completion verbatim.
    pub async fn generate(
        &self,
        contract_type: ContractType,
        params: &ContractParams,
    ) -> Result<String, AppError> {
        info!("📊 {}生成開始", contract_type.label());

        let system = match contract_type {
            ContractType::Rental => RENTAL_SYSTEM,
            ContractType::Service => SERVICE_SYSTEM,
        };
        let text = self
            .complete_traced(TracedCall {
                name: format!("{contract_type}_contract"),
                model: GENERATION_MODEL,
                system,
                prompt: build_prompt(contract_type, params),
                metadata: json!({
                    "contract_type": contract_type,
                    "params": params,
                }),
            })
            .await?;

        info!("✅ {}生成完了", contract_type.label());
        Ok(text)
    }

    /// Drafts a contract from a free-form instruction ("業務委託契約書を作成してください").
    /// Nothing is persisted.
    pub async fn generate_from_instruction(&self, instruction: &str) -> Result<String, AppError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(AppError::Validation("指示を入力してください".to_string()));
        }

        self.complete_traced(TracedCall {
            name: "instruction_contract".to_string(),
            model: INSTRUCTION_MODEL,
            system: INSTRUCTION_SYSTEM,
            prompt: fill_template(INSTRUCTION_PROMPT_TEMPLATE, &[("instruction", instruction)]),
            metadata: json!({ "instruction": instruction }),
        })
        .await
    }

    /// One completion wrapped in a trace: start, then a generation record or an error event.
    async fn complete_traced(&self, call: TracedCall<'_>) -> Result<String, AppError> {
        let TracedCall {
            name,
            model,
            system,
            prompt,
            metadata,
        } = call;

        let trace_id = Uuid::new_v4().to_string();
        self.observer
            .on_trace_start(&TraceStart {
                id: trace_id.clone(),
                name: format!("{name}_generation"),
                metadata: metadata.clone(),
                tags: vec![],
                timestamp: Utc::now(),
            })
            .await;

        let start_time = Utc::now();
        let completion = match self
            .llm
            .complete(CompletionRequest {
                model,
                system,
                prompt: &prompt,
                temperature: GENERATION_TEMPERATURE,
                max_tokens: None,
            })
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                self.observer
                    .on_error(&ErrorEvent {
                        id: format!("{trace_id}_error"),
                        trace_id: trace_id.clone(),
                        name: format!("{name}_generation_error"),
                        message: e.to_string(),
                        metadata,
                        timestamp: Utc::now(),
                    })
                    .await;
                return Err(AppError::Llm(format!("Contract generation failed: {e}")));
            }
        };

        self.observer
            .on_generation(&GenerationRecord {
                id: Uuid::new_v4().to_string(),
                trace_id,
                name: format!("openai_{name}"),
                model: model.to_string(),
                model_parameters: json!({ "temperature": GENERATION_TEMPERATURE }),
                input: prompt,
                output: completion.text.clone(),
                usage: completion.usage,
                metadata: json!({}),
                tags: vec![],
                start_time,
                end_time: Utc::now(),
            })
            .await;

        Ok(completion.text)
    }
}

struct TracedCall<'a> {
    /// Prefix for the trace, generation and error event names.
    name: String,
    model: &'a str,
    system: &'a str,
    prompt: String,
    metadata: Value,
}

/// Generates a contract and persists it. Content is written before metadata.
pub async fn generate_and_save(
    generator: &ContractGenerator,
    storage: &ContractStorage,
    contract_type: ContractType,
    params: &ContractParams,
) -> Result<GeneratedContract, AppError> {
    let content = match contract_type {
        ContractType::Rental => generator.generate_rental(params).await?,
        ContractType::Service => generator.generate_service(params).await?,
    };
    let file_path = storage.save(contract_type, &content, params).await?;

    Ok(GeneratedContract {
        contract_type,
        file_path,
        content,
    })
}

/// Fills the type's template, substituting defaults for absent params.
pub fn build_prompt(contract_type: ContractType, params: &ContractParams) -> String {
    match contract_type {
        ContractType::Rental => render_template(RENTAL_PROMPT_TEMPLATE, &RENTAL_FIELDS, params),
        ContractType::Service => render_template(SERVICE_PROMPT_TEMPLATE, &SERVICE_FIELDS, params),
    }
}

fn render_template(template: &str, fields: &[(&str, &str)], params: &ContractParams) -> String {
    let values: Vec<(&str, &str)> = fields
        .iter()
        .map(|(key, default)| (*key, params.get(*key).map(String::as_str).unwrap_or(*default)))
        .collect();
    fill_template(template, &values)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::completion_body;
    use crate::telemetry::recording::RecordingObserver;
    use crate::telemetry::{LangfuseObserver, NoopObserver};
    use tempfile::TempDir;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rental_request() -> RentalContractRequest {
        serde_json::from_value(json!({
            "property_name": "Sakura Heights",
            "address": "東京都新宿区1-1-1",
            "rent": "85000",
            "deposit": "170000",
            "key_money": "85000",
            "landlord_name": "山本一郎",
            "tenant_name": "高橋花子"
        }))
        .unwrap()
    }

    #[test]
    fn test_rental_request_defaults_period() {
        let params = rental_request().into_params();
        assert_eq!(params.get("period").map(String::as_str), Some("2年"));
        assert_eq!(params.len(), 8);
    }

    #[test]
    fn test_service_request_defaults() {
        let request: ServiceContractRequest = serde_json::from_value(json!({
            "service_description": "Webサイト保守",
            "compensation": "月額30万円",
            "client_company": "株式会社テスト",
            "client_representative": "代表 太郎",
            "contractor_name": "受託 次郎"
        }))
        .unwrap();
        let params = request.into_params();
        assert_eq!(params["period"], "6ヶ月");
        assert_eq!(params["payment_terms"], "月末締め翌月末支払い");
        assert_eq!(params.len(), 7);
    }

    #[test]
    fn test_rental_request_requires_property_name() {
        let result: Result<RentalContractRequest, _> =
            serde_json::from_value(json!({ "address": "x" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_build_prompt_substitutes_params() {
        let prompt = build_prompt(ContractType::Rental, &rental_request().into_params());
        assert!(prompt.contains("- 物件名: Sakura Heights"));
        assert!(prompt.contains("- 賃料: 85000"));
        assert!(prompt.contains("- 氏名: 高橋花子"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_build_prompt_uses_defaults_for_missing_fields() {
        let prompt = build_prompt(ContractType::Rental, &ContractParams::new());
        assert!(prompt.contains("- 物件名: 未指定"));
        assert!(prompt.contains("- 契約期間: 2年"));
        assert!(prompt.contains("- 氏名: 田中太郎"));
        assert!(prompt.contains("- 氏名: 佐藤花子"));

        let prompt = build_prompt(ContractType::Service, &ContractParams::new());
        assert!(prompt.contains("- 会社名: 株式会社サンプル"));
        assert!(prompt.contains("- 代表者: 山田一郎"));
        assert!(prompt.contains("- 氏名/会社名: 鈴木二郎"));
        assert!(prompt.contains("- 支払条件: 月末締め翌月末支払い"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_build_prompt_keeps_braces_inside_values() {
        let mut params = rental_request().into_params();
        params.insert("property_name".into(), "Villa {rent}".into());
        params.insert("tenant_name".into(), "{landlord_name}".into());

        let prompt = build_prompt(ContractType::Rental, &params);

        assert!(prompt.contains("- 物件名: Villa {rent}"));
        assert!(prompt.contains("- 氏名: {landlord_name}"));
        assert!(prompt.contains("- 賃料: 85000"));
    }

    #[test]
    fn test_new_requires_api_key() {
        let mut config = crate::config::test_config("contracts".into(), "http://localhost");
        config.openai_api_key = None;
        let result = ContractGenerator::new(&config, Arc::new(NoopObserver));
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_generate_rental_returns_completion_and_reports_trace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({
                "model": GENERATION_MODEL,
                "temperature": 0.2
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion_body("賃貸借契約書\n第1条")),
            )
            .mount(&server)
            .await;

        let observer = Arc::new(RecordingObserver::default());
        let generator =
            ContractGenerator::with_client(LlmClient::new("sk-test", server.uri()), observer.clone());

        let text = generator
            .generate_rental(&rental_request().into_params())
            .await
            .unwrap();
        assert_eq!(text, "賃貸借契約書\n第1条");

        let traces = observer.traces.lock().unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].name, "rental_contract_generation");
        assert_eq!(traces[0].metadata["params"]["property_name"], "Sakura Heights");

        let generations = observer.generations.lock().unwrap();
        assert_eq!(generations.len(), 1);
        assert_eq!(generations[0].trace_id, traces[0].id);
        assert_eq!(generations[0].output, "賃貸借契約書\n第1条");
        assert_eq!(generations[0].usage.total_tokens, 200);
        assert!(observer.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_from_instruction_sends_instruction_to_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({ "model": INSTRUCTION_MODEL })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("業務委託契約書")))
            .expect(1)
            .mount(&server)
            .await;

        let observer = Arc::new(RecordingObserver::default());
        let generator =
            ContractGenerator::with_client(LlmClient::new("sk-test", server.uri()), observer.clone());

        let text = generator
            .generate_from_instruction("  業務委託契約書を作成してください  ")
            .await
            .unwrap();
        assert_eq!(text, "業務委託契約書");

        let traces = observer.traces.lock().unwrap();
        assert_eq!(traces[0].name, "instruction_contract_generation");
        assert_eq!(traces[0].metadata["instruction"], "業務委託契約書を作成してください");
        let generations = observer.generations.lock().unwrap();
        assert_eq!(generations[0].name, "openai_instruction_contract");
        assert!(generations[0].input.contains("業務委託契約書を作成してください"));
    }

    #[tokio::test]
    async fn test_generate_from_blank_instruction_is_rejected() {
        let observer = Arc::new(RecordingObserver::default());
        let generator = ContractGenerator::with_client(
            LlmClient::new("sk-test", "http://127.0.0.1:9"),
            observer.clone(),
        );

        let err = generator.generate_from_instruction("   ").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(observer.traces.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_failure_is_propagated_and_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .expect(1)
            .mount(&server)
            .await;

        let observer = Arc::new(RecordingObserver::default());
        let generator =
            ContractGenerator::with_client(LlmClient::new("sk-test", server.uri()), observer.clone());

        let err = generator
            .generate_service(&ContractParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
        assert_eq!(observer.errors.lock().unwrap().len(), 1);
        assert!(observer.generations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_succeeds_when_telemetry_fails() {
        let llm_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("契約書")))
            .mount(&llm_server)
            .await;

        let langfuse_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&langfuse_server)
            .await;

        let observer = Arc::new(LangfuseObserver::new(&langfuse_server.uri(), "pk", "sk"));
        let generator =
            ContractGenerator::with_client(LlmClient::new("sk-test", llm_server.uri()), observer);

        let text = generator
            .generate_rental(&ContractParams::new())
            .await
            .unwrap();
        assert_eq!(text, "契約書");
    }

    #[tokio::test]
    async fn test_generate_and_save_persists_content_and_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("本文")))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = ContractStorage::new(dir.path());
        let generator = ContractGenerator::with_client(
            LlmClient::new("sk-test", server.uri()),
            Arc::new(NoopObserver),
        );

        let generated = generate_and_save(
            &generator,
            &storage,
            ContractType::Rental,
            &rental_request().into_params(),
        )
        .await
        .unwrap();

        assert_eq!(generated.content, "本文");
        let listed = storage.list(Some(ContractType::Rental)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_path, generated.file_path);
        assert_eq!(
            listed[0].metadata.param("property_name"),
            Some("Sakura Heights")
        );
    }
}
