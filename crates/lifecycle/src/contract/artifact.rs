//! Compiled contract artifacts.

use std::path::{Path, PathBuf};

use alloy_core::primitives::Bytes;
use serde_json::Value;

use crate::error::{LifecycleError, Result};

/// Creation bytecode for one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub name: String,
    pub bytecode: Bytes,
    /// File the bytecode was read from, if any.
    pub source: Option<PathBuf>,
}

impl ContractArtifact {
    pub fn from_bytecode(name: impl Into<String>, bytecode: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytecode: bytecode.into(),
            source: None,
        }
    }

    /// Locate and read `<name>` under `artifacts_dir`.
    ///
    /// Hardhat layout (`contracts/<Name>.sol/<Name>.json`) is tried first, then
    /// Foundry layout (`<Name>.sol/<Name>.json`), then any nested
    /// `<Name>.sol/<Name>.json` below the directory.
    pub fn load(artifacts_dir: &Path, name: &str) -> Result<Self> {
        let file_name = format!("{name}.json");
        let source_dir = format!("{name}.sol");

        let mut candidates = vec![
            artifacts_dir
                .join("contracts")
                .join(&source_dir)
                .join(&file_name),
            artifacts_dir.join(&source_dir).join(&file_name),
        ];

        let found = candidates
            .iter()
            .find(|path| path.is_file())
            .cloned()
            .or_else(|| find_nested(artifacts_dir, &source_dir, &file_name));

        let Some(path) = found else {
            candidates.push(artifacts_dir.join("**").join(&source_dir).join(&file_name));
            return Err(LifecycleError::ArtifactMissing {
                contract: name.to_string(),
                searched: candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        };

        let missing = |reason: String| LifecycleError::ArtifactMissing {
            contract: name.to_string(),
            searched: format!("{} ({reason})", path.display()),
        };

        let content = std::fs::read_to_string(&path).map_err(|e| missing(e.to_string()))?;
        let json: Value = serde_json::from_str(&content).map_err(|e| missing(e.to_string()))?;

        // Hardhat stores a plain string, Foundry nests it under `object`.
        let bytecode_hex = match &json["bytecode"] {
            Value::String(hex) => hex.as_str(),
            Value::Object(obj) => obj
                .get("object")
                .and_then(Value::as_str)
                .ok_or_else(|| missing("bytecode.object missing".to_string()))?,
            _ => return Err(missing("no bytecode field".to_string())),
        };

        let bytecode = hex::decode(bytecode_hex.trim_start_matches("0x"))
            .map_err(|e| missing(format!("invalid bytecode hex: {e}")))?;

        if bytecode.is_empty() {
            return Err(missing(
                "empty bytecode (abstract contract or interface)".to_string(),
            ));
        }

        tracing::debug!(contract = name, path = %path.display(), size = bytecode.len(), "Loaded artifact");

        Ok(Self {
            name: name.to_string(),
            bytecode: bytecode.into(),
            source: Some(path),
        })
    }
}

fn find_nested(dir: &Path, source_dir: &str, file_name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        if path.file_name().is_some_and(|n| n == source_dir) {
            let candidate = path.join(file_name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if let Some(found) = find_nested(&path, source_dir, file_name) {
            return Some(found);
        }
    }

    None
}
