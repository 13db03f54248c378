//! Flat-file contract storage.
//!
//! Layout: `{base}/{type}/{type}_contract_{YYYYMMDD_HHMMSS}_{id8}.txt` with a sibling
//! `{file}.metadata.json`. The content file is written first and the sidecar second;
//! an orphaned content file without a sidecar is skipped by `list` and `search`.

pub mod handlers;
pub mod models;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use models::{
    ContractMetadata, ContractParams, ContractSummary, ContractType, SearchFilters,
    StoredContract,
};

const METADATA_SUFFIX: &str = ".metadata.json";
/// Attempts at finding an unused file name before giving up.
const MAX_NAME_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unknown contract type: {0}")]
    UnknownContractType(String),

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed metadata in {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Contract store rooted at a base directory. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ContractStorage {
    base_dir: PathBuf,
}

impl ContractStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn type_dir(&self, contract_type: ContractType) -> PathBuf {
        self.base_dir.join(contract_type.as_str())
    }

    /// Saves a contract and its metadata sidecar, returning the content file path.
    pub async fn save(
        &self,
        contract_type: ContractType,
        content: &str,
        params: &ContractParams,
    ) -> Result<String, StorageError> {
        self.save_at(contract_type, content, params, Local::now())
            .await
    }

    async fn save_at(
        &self,
        contract_type: ContractType,
        content: &str,
        params: &ContractParams,
        now: DateTime<Local>,
    ) -> Result<String, StorageError> {
        let directory = self.type_dir(contract_type);
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| StorageError::io(&directory, e))?;

        let timestamp = now.format("%Y%m%d_%H%M%S");
        let (file_path, contract_id) = {
            let mut attempt = 0;
            loop {
                let contract_id = Uuid::new_v4();
                let short_id = &contract_id.simple().to_string()[..8];
                let filename = format!("{contract_type}_contract_{timestamp}_{short_id}.txt");
                let file_path = directory.join(&filename);

                match write_new_file(&file_path, content.as_bytes()).await {
                    Ok(()) => break (file_path, contract_id),
                    Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                        attempt += 1;
                        if attempt >= MAX_NAME_ATTEMPTS {
                            return Err(StorageError::io(&file_path, e));
                        }
                        warn!("Contract file {} already exists, drawing a new id", filename);
                    }
                    Err(e) => return Err(StorageError::io(&file_path, e)),
                }
            }
        };

        let mut params = params.clone();
        for key in ContractMetadata::INJECTED_KEYS {
            params.remove(key);
        }
        let metadata = ContractMetadata {
            params,
            created_at: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            file_path: file_path.display().to_string(),
            contract_type: contract_type.as_str().to_string(),
            contract_id: Some(contract_id.to_string()),
        };

        let metadata_path = metadata_path_for(&file_path);
        let json = serde_json::to_string_pretty(&metadata).map_err(|source| {
            StorageError::Metadata {
                path: metadata_path.clone(),
                source,
            }
        })?;
        tokio::fs::write(&metadata_path, json)
            .await
            .map_err(|e| StorageError::io(&metadata_path, e))?;

        info!(
            "Saved {} contract {} to {}",
            contract_type,
            contract_id,
            file_path.display()
        );
        Ok(metadata.file_path)
    }

    /// Lists stored contracts, newest first. `None` lists every type.
    pub async fn list(
        &self,
        contract_type: Option<ContractType>,
    ) -> Result<Vec<ContractSummary>, StorageError> {
        let types: Vec<ContractType> = match contract_type {
            Some(ct) => vec![ct],
            None => ContractType::ALL.to_vec(),
        };

        let mut contracts = Vec::new();
        for ct in types {
            let directory = self.type_dir(ct);
            let mut entries = match tokio::fs::read_dir(&directory).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(&directory, e)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| StorageError::io(&directory, e))?
            {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                    continue;
                }

                let metadata_path = metadata_path_for(&path);
                let raw = match tokio::fs::read_to_string(&metadata_path).await {
                    Ok(raw) => raw,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        debug!("Skipping {} (no metadata sidecar)", path.display());
                        continue;
                    }
                    Err(e) => {
                        warn!("Skipping {}: unreadable metadata ({e})", metadata_path.display());
                        continue;
                    }
                };

                match serde_json::from_str::<ContractMetadata>(&raw) {
                    Ok(metadata) => contracts.push(ContractSummary {
                        contract_type: ct,
                        file_path: path.display().to_string(),
                        metadata,
                    }),
                    Err(e) => warn!(
                        "Skipping {}: malformed metadata ({e})",
                        metadata_path.display()
                    ),
                }
            }
        }

        contracts.sort_by(|a, b| b.metadata.created_at.cmp(&a.metadata.created_at));
        Ok(contracts)
    }

    /// Linear scan over `list`, filtered by date range and a case-insensitive query.
    pub async fn search(
        &self,
        filters: &SearchFilters,
    ) -> Result<Vec<ContractSummary>, StorageError> {
        let mut contracts = self.list(filters.contract_type).await?;

        if filters.has_date_bounds() {
            contracts.retain(|c| filters.date_in_range(c.metadata.created_date()));
        }

        let Some(query) = filters.query.as_deref() else {
            return Ok(contracts);
        };
        let needle = query.to_lowercase();

        let mut matched = Vec::with_capacity(contracts.len());
        for contract in contracts {
            let content = match tokio::fs::read_to_string(&contract.file_path).await {
                Ok(content) => content,
                Err(e) => {
                    debug!("Dropping {} from search: {e}", contract.file_path);
                    continue;
                }
            };
            let metadata_json = serde_json::to_string(&contract.metadata).unwrap_or_default();

            if content.to_lowercase().contains(&needle)
                || metadata_json.to_lowercase().contains(&needle)
            {
                matched.push(contract);
            }
        }

        Ok(matched)
    }

    /// Loads a contract by bare file name, looking in each type directory in turn.
    pub async fn load(&self, file_name: &str) -> Result<Option<StoredContract>, StorageError> {
        validate_file_name(file_name)?;

        for ct in ContractType::ALL {
            let path = self.type_dir(ct).join(file_name);
            let exists = tokio::fs::try_exists(&path)
                .await
                .map_err(|e| StorageError::io(&path, e))?;
            if !exists {
                continue;
            }

            let (content, metadata) = read_with_metadata(&path).await?;
            return Ok(Some(StoredContract {
                contract_type: ct,
                file_path: path.display().to_string(),
                content,
                metadata,
            }));
        }

        Ok(None)
    }
}

/// Reads a contract file plus its sidecar. A missing sidecar yields an empty object.
pub async fn read_with_metadata(
    path: &Path,
) -> Result<(String, serde_json::Value), StorageError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StorageError::io(path, e))?;

    let metadata_path = metadata_path_for(path);
    let metadata = match tokio::fs::read_to_string(&metadata_path).await {
        Ok(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::Metadata {
            path: metadata_path.clone(),
            source,
        })?,
        Err(e) if e.kind() == ErrorKind::NotFound => serde_json::json!({}),
        Err(e) => return Err(StorageError::io(&metadata_path, e)),
    };

    Ok((content, metadata))
}

fn metadata_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(METADATA_SUFFIX);
    PathBuf::from(name)
}

fn validate_file_name(file_name: &str) -> Result<(), StorageError> {
    if file_name.is_empty()
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains("..")
    {
        return Err(StorageError::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

async fn write_new_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}
