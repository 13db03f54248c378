use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::storage::StorageError;

/// Free-text contract fields keyed by name (`property_name`, `rent`, ...).
/// No validation beyond presence.
pub type ContractParams = BTreeMap<String, String>;

/// The two contract kinds the system can generate and store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Rental,
    Service,
}

impl ContractType {
    pub const ALL: [ContractType; 2] = [ContractType::Rental, ContractType::Service];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Rental => "rental",
            ContractType::Service => "service",
        }
    }

    /// Japanese document title shown in the CLI and HTML pages.
    pub fn label(&self) -> &'static str {
        match self {
            ContractType::Rental => "賃貸契約書",
            ContractType::Service => "業務委託契約書",
        }
    }

    /// Parses an optional type filter. Blank and `"all"` mean no filter.
    pub fn parse_filter(value: Option<&str>) -> Result<Option<ContractType>, StorageError> {
        match value.map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(v) => v.parse().map(Some),
        }
    }

    /// Infers the type from a stored file path: anything mentioning `rental` is a rental
    /// contract, everything else is treated as a service contract.
    pub fn infer_from_path(path: &str) -> ContractType {
        if path.contains("rental") {
            ContractType::Rental
        } else {
            ContractType::Service
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rental" => Ok(ContractType::Rental),
            "service" => Ok(ContractType::Service),
            other => Err(StorageError::UnknownContractType(other.to_string())),
        }
    }
}

/// Sidecar metadata written next to every contract file.
///
/// The caller's params are flattened into the top-level object alongside the
/// fields injected at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractMetadata {
    #[serde(flatten)]
    pub params: ContractParams,
    pub created_at: String,
    pub file_path: String,
    pub contract_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_id: Option<String>,
}

impl ContractMetadata {
    /// Keys written by storage itself; never taken from caller params.
    pub const INJECTED_KEYS: [&'static str; 4] =
        ["created_at", "file_path", "contract_type", "contract_id"];

    /// Date portion (`YYYY-MM-DD`) of `created_at`.
    pub fn created_date(&self) -> &str {
        self.created_at.get(..10).unwrap_or(&self.created_at)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// One entry of `list` / `search` results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSummary {
    #[serde(rename = "type")]
    pub contract_type: ContractType,
    pub file_path: String,
    pub metadata: ContractMetadata,
}

/// A single contract loaded by file name.
#[derive(Debug, Clone, Serialize)]
pub struct StoredContract {
    pub contract_type: ContractType,
    pub file_path: String,
    pub content: String,
    /// Raw sidecar JSON; an empty object when the sidecar is missing.
    pub metadata: serde_json::Value,
}

/// Filters accepted by `ContractStorage::search`. `None` means unfiltered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub query: Option<String>,
    pub contract_type: Option<ContractType>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl SearchFilters {
    /// Builds filters from raw request values, treating blank strings as absent.
    pub fn from_raw(
        query: Option<String>,
        contract_type: Option<&str>,
        date_from: Option<String>,
        date_to: Option<String>,
    ) -> Result<Self, StorageError> {
        Ok(SearchFilters {
            query: non_blank(query),
            contract_type: ContractType::parse_filter(contract_type)?,
            date_from: non_blank(date_from),
            date_to: non_blank(date_to),
        })
    }

    pub fn has_date_bounds(&self) -> bool {
        self.date_from.is_some() || self.date_to.is_some()
    }

    /// Inclusive lexicographic check of a `YYYY-MM-DD` date against the bounds.
    pub fn date_in_range(&self, date: &str) -> bool {
        let after_start = self.date_from.as_deref().map_or(true, |from| date >= from);
        let before_end = self.date_to.as_deref().map_or(true, |to| date <= to);
        after_start && before_end
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_type_round_trips_through_str() {
        for ct in ContractType::ALL {
            assert_eq!(ct.as_str().parse::<ContractType>().unwrap(), ct);
        }
    }

    #[test]
    fn test_unknown_contract_type_is_rejected() {
        let err = "unknown_type".parse::<ContractType>().unwrap_err();
        assert!(matches!(err, StorageError::UnknownContractType(ref t) if t == "unknown_type"));
    }

    #[test]
    fn test_parse_filter_treats_all_and_blank_as_none() {
        assert_eq!(ContractType::parse_filter(None).unwrap(), None);
        assert_eq!(ContractType::parse_filter(Some("")).unwrap(), None);
        assert_eq!(ContractType::parse_filter(Some("all")).unwrap(), None);
        assert_eq!(
            ContractType::parse_filter(Some("service")).unwrap(),
            Some(ContractType::Service)
        );
        assert!(ContractType::parse_filter(Some("lease")).is_err());
    }

    #[test]
    fn test_infer_from_path() {
        assert_eq!(
            ContractType::infer_from_path("contracts/rental/rental_contract_20240101_120000.txt"),
            ContractType::Rental
        );
        assert_eq!(
            ContractType::infer_from_path("contracts/service/service_contract_x.txt"),
            ContractType::Service
        );
    }

    #[test]
    fn test_metadata_serializes_params_at_top_level() {
        let mut params = ContractParams::new();
        params.insert("property_name".to_string(), "さくらハイツ".to_string());
        let metadata = ContractMetadata {
            params,
            created_at: "2024-05-01T09:30:00.000000".to_string(),
            file_path: "contracts/rental/a.txt".to_string(),
            contract_type: "rental".to_string(),
            contract_id: None,
        };

        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value["property_name"], "さくらハイツ");
        assert_eq!(value["contract_type"], "rental");
        assert!(value.get("contract_id").is_none());

        let recovered: ContractMetadata = serde_json::from_value(value).unwrap();
        assert_eq!(recovered, metadata);
        assert_eq!(recovered.created_date(), "2024-05-01");
    }

    #[test]
    fn test_date_in_range_with_open_bounds() {
        let filters = SearchFilters {
            date_from: Some("2024-02-01".to_string()),
            ..Default::default()
        };
        assert!(filters.date_in_range("2024-02-01"));
        assert!(filters.date_in_range("2025-01-01"));
        assert!(!filters.date_in_range("2024-01-31"));

        let filters = SearchFilters {
            date_to: Some("2024-02-01".to_string()),
            ..Default::default()
        };
        assert!(filters.date_in_range("2024-02-01"));
        assert!(!filters.date_in_range("2024-02-02"));
    }

    #[test]
    fn test_from_raw_drops_blank_values() {
        let filters = SearchFilters::from_raw(
            Some("  ".to_string()),
            Some("all"),
            Some(String::new()),
            Some("2024-12-31".to_string()),
        )
        .unwrap();
        assert_eq!(filters.query, None);
        assert_eq!(filters.contract_type, None);
        assert_eq!(filters.date_from, None);
        assert_eq!(filters.date_to.as_deref(), Some("2024-12-31"));
    }

    #[test]
    fn test_from_raw_trims_bounds_before_comparing() {
        let filters = SearchFilters::from_raw(
            Some(" sakura ".to_string()),
            None,
            Some(" 2024-02-01".to_string()),
            Some("2024-02-29 ".to_string()),
        )
        .unwrap();
        assert_eq!(filters.query.as_deref(), Some("sakura"));
        assert_eq!(filters.date_from.as_deref(), Some("2024-02-01"));
        assert!(filters.date_in_range("2024-02-01"));
        assert!(filters.date_in_range("2024-02-29"));
        assert!(!filters.date_in_range("2024-03-01"));
    }
}
