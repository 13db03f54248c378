// All LLM prompt constants for contract generation.
// Templates use `{field}` placeholders filled by `render_template`.

/// System prompt for rental contracts.
pub const RENTAL_SYSTEM: &str = "あなたは日本の不動産法に精通した法務専門家です。\
    正確で法的に有効な賃貸契約書を作成してください。";

/// System prompt for service (業務委託) contracts.
pub const SERVICE_SYSTEM: &str = "あなたは日本の契約法に精通した法務専門家です。\
    正確で法的に有効な業務委託契約書を作成してください。";

/// Rental fields and the text substituted when a field is absent.
pub const RENTAL_FIELDS: [(&str, &str); 8] = [
    ("property_name", "未指定"),
    ("address", "未指定"),
    ("rent", "未指定"),
    ("deposit", "未指定"),
    ("key_money", "未指定"),
    ("period", "2年"),
    ("landlord_name", "田中太郎"),
    ("tenant_name", "佐藤花子"),
];

/// Service fields and the text substituted when a field is absent.
pub const SERVICE_FIELDS: [(&str, &str); 7] = [
    ("service_description", "未指定"),
    ("period", "6ヶ月"),
    ("compensation", "未指定"),
    ("payment_terms", "月末締め翌月末支払い"),
    ("client_company", "株式会社サンプル"),
    ("client_representative", "山田一郎"),
    ("contractor_name", "鈴木二郎"),
];

/// Rental prompt template. Replace every key of `RENTAL_FIELDS`.
pub const RENTAL_PROMPT_TEMPLATE: &str = r#"以下の条件で賃貸契約書を作成してください：

物件情報：
- 物件名: {property_name}
- 所在地: {address}
- 賃料: {rent}
- 敷金: {deposit}
- 礼金: {key_money}
- 契約期間: {period}

貸主情報：
- 氏名: {landlord_name}

借主情報：
- 氏名: {tenant_name}

日本の法律に準拠した正式な賃貸契約書として作成してください。"#;

/// Service prompt template. Replace every key of `SERVICE_FIELDS`.
pub const SERVICE_PROMPT_TEMPLATE: &str = r#"以下の条件で業務委託契約書を作成してください：

委託業務：
- 業務内容: {service_description}
- 委託期間: {period}
- 報酬: {compensation}
- 支払条件: {payment_terms}

委託者情報：
- 会社名: {client_company}
- 代表者: {client_representative}

受託者情報：
- 氏名/会社名: {contractor_name}

日本の法律に準拠した正式な業務委託契約書として作成してください。"#;

/// System prompt for free-form instructions.
pub const INSTRUCTION_SYSTEM: &str = "あなたは日本の契約法に精通した法務専門家です。\
    ユーザーの指示に従い、正確で法的に有効な契約書を作成してください。";

/// Instruction prompt template. Replace `{instruction}`.
pub const INSTRUCTION_PROMPT_TEMPLATE: &str = r#"以下の指示に基づいて契約書を作成してください：

{instruction}

不足している条件には一般的な内容を補い、日本の法律に準拠した正式な契約書として作成してください。"#;
