//! Build artifact scanner - discovers compiled contracts and builds decoding contexts

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use alloy_json_abi::{JsonAbi, StateMutability};
use alloy_primitives::{keccak256, Selector};
use anyhow::{Context, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::{
    normalize_hex, AbiEntry, ContractKind, Contexts, DecodingContext, FunctionTable,
};

/// Largest artifact file that will be parsed
const MAX_ARTIFACT_SIZE: u64 = 5 * 1024 * 1024;

/// Contexts found by a scan, with scan statistics
#[derive(Debug, Default, Clone)]
pub struct ArtifactScan {
    pub contexts: Contexts,
    /// Number of artifact files parsed
    pub scanned_files: usize,
    /// Per-file errors; a bad file never aborts the scan
    pub errors: Vec<String>,
    /// Scan duration in milliseconds
    pub scan_ms: u128,
}

impl ArtifactScan {
    /// Merge another scan into this one (first context wins)
    pub fn merge(&mut self, other: Self) {
        self.scanned_files = self.scanned_files.saturating_add(other.scanned_files);
        self.errors.extend(other.errors);
        self.contexts.merge(other.contexts);
    }
}

/// Foundry / Hardhat artifact scanner
pub struct ArtifactScanner;

impl ArtifactScanner {
    /// Scan a single root directory for contract artifacts
    pub fn scan(root: impl AsRef<Path>) -> ArtifactScan {
        let started = Instant::now();
        let root = root.as_ref();
        let mut scan = ArtifactScan::default();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !Self::is_ignored_dir(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    scan.errors.push(err.to_string());
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();

            // Only JSON files in out/ or artifacts/ directories
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if !Self::path_contains_any(path, &["out", "artifacts"]) {
                continue;
            }

            match entry.metadata() {
                Ok(meta) if meta.len() > MAX_ARTIFACT_SIZE => continue,
                Ok(_) => {}
                Err(err) => {
                    scan.errors.push(format!("{}: {}", path.display(), err));
                    continue;
                }
            }

            scan.scanned_files += 1;

            if let Err(err) = Self::load_artifact(path, &mut scan.contexts) {
                warn!(target: "poke_decode::artifacts", path = %path.display(), error = %err, "skipping artifact");
                scan.errors.push(format!("{}: {:#}", path.display(), err));
            }
        }

        scan.scan_ms = started.elapsed().as_millis();
        debug!(
            target: "poke_decode::artifacts",
            root = %root.display(),
            files = scan.scanned_files,
            contexts = scan.contexts.len(),
            errors = scan.errors.len(),
            "artifact scan finished"
        );

        scan
    }

    /// Scan multiple root directories
    pub fn scan_roots(roots: &[PathBuf]) -> ArtifactScan {
        let started = Instant::now();
        let mut scan = ArtifactScan::default();

        for root in roots {
            scan.merge(Self::scan(root));
        }

        scan.scan_ms = started.elapsed().as_millis();
        scan
    }

    /// Load one artifact, adding its deployed and constructor contexts
    fn load_artifact(path: &Path, contexts: &mut Contexts) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;

        let Some(abi_value) = value.get("abi") else {
            return Ok(()); // not a contract artifact, skip silently
        };
        let abi: JsonAbi = serde_json::from_value(abi_value.clone()).context("invalid abi")?;

        let contract_name = value
            .get("contractName")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .context("cannot determine contract name")?;

        // Hardhat records the source; Foundry nests artifacts under `<Source>.sol/`
        let source_name = value
            .get("sourceName")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .or_else(|| {
                path.parent()
                    .and_then(|p| p.file_name())
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        let deployed = Self::bytecode_field(&value, "deployedBytecode").unwrap_or_default();
        let constructor = Self::bytecode_field(&value, "bytecode").unwrap_or_default();

        let contract_kind = Self::infer_kind(&deployed);
        let payable = abi.receive.is_some()
            || abi
                .fallback
                .as_ref()
                .is_some_and(|f| f.state_mutability == StateMutability::Payable);

        let functions: HashMap<Selector, AbiEntry> = abi
            .functions()
            .map(|function| {
                let signature = function.signature();
                let entry = AbiEntry {
                    name: function.name.clone(),
                    signature: signature.clone(),
                };
                (Self::compute_selector(&signature), entry)
            })
            .collect();

        let contract_id = format!("{}:{}", source_name, contract_name);

        for (binary, is_constructor) in [(deployed, false), (constructor, true)] {
            if binary.is_empty() {
                continue;
            }
            contexts.insert(DecodingContext {
                context_hash: Self::context_hash(&binary),
                binary,
                is_constructor,
                contract_id: Some(contract_id.clone()),
                contract_name: Some(contract_name.clone()),
                contract_kind: Some(contract_kind),
                payable: Some(payable),
                abi: functions.clone(),
            });
        }

        Ok(())
    }

    /// Bytecode as normalized hex; either a plain string (Hardhat) or `{ "object": .. }` (Foundry)
    fn bytecode_field(value: &serde_json::Value, key: &str) -> Option<String> {
        let raw = match value.get(key)? {
            serde_json::Value::String(s) => s.as_str(),
            serde_json::Value::Object(obj) => obj.get("object")?.as_str()?,
            _ => return None,
        };
        Some(normalize_hex(raw))
    }

    /// Deployed libraries start with `PUSH20 <zero address>` (their own address
    /// is patched in at deploy time); an empty deployed binary is an interface
    /// or abstract contract.
    fn infer_kind(deployed: &str) -> ContractKind {
        const LIBRARY_PREFIX: &str = "730000000000000000000000000000000000000000";
        if deployed.is_empty() {
            ContractKind::Interface
        } else if deployed.starts_with(LIBRARY_PREFIX) {
            ContractKind::Library
        } else {
            ContractKind::Contract
        }
    }

    /// Registry key for a binary
    fn context_hash(binary: &str) -> String {
        format!("0x{}", hex::encode(keccak256(binary.as_bytes())))
    }

    /// Compute the 4-byte function selector from a signature
    fn compute_selector(signature: &str) -> Selector {
        let hash = keccak256(signature.as_bytes());
        Selector::from([hash[0], hash[1], hash[2], hash[3]])
    }

    /// Check if a path should be ignored
    fn is_ignored_dir(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| {
                matches!(
                    name,
                    ".git" | "target" | "node_modules" | ".next" | "dist" | "build"
                )
            })
            .unwrap_or(false)
    }

    /// Check if path contains any of the given names
    fn path_contains_any(path: &Path, names: &[&str]) -> bool {
        path.components().any(|component| {
            if let std::path::Component::Normal(value) = component {
                if let Some(value) = value.to_str() {
                    return names.iter().any(|name| *name == value);
                }
            }
            false
        })
    }
}

/// Load an internal function table from a JSON file (`{ "<pc>": entry, .. }`)
pub fn load_function_table(path: impl AsRef<Path>) -> Result<FunctionTable> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("read function table {}", path.display()))?;
    let table: FunctionTable = serde_json::from_str(&content)
        .with_context(|| format!("parse function table {}", path.display()))?;
    debug!(target: "poke_decode::artifacts", path = %path.display(), entries = table.len(), "loaded function table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("poke-decode-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const TOKEN_ABI: &str = r#"[
        {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
        {"type":"receive","stateMutability":"payable"}
    ]"#;

    #[test]
    fn test_compute_selector() {
        // transfer(address,uint256) -> 0xa9059cbb
        let selector = ArtifactScanner::compute_selector("transfer(address,uint256)");
        assert_eq!(selector, Selector::from([0xa9, 0x05, 0x9c, 0xbb]));

        // approve(address,uint256) -> 0x095ea7b3
        let selector = ArtifactScanner::compute_selector("approve(address,uint256)");
        assert_eq!(selector, Selector::from([0x09, 0x5e, 0xa7, 0xb3]));
    }

    #[test]
    fn test_is_ignored_dir() {
        assert!(ArtifactScanner::is_ignored_dir(Path::new(".git")));
        assert!(ArtifactScanner::is_ignored_dir(Path::new("node_modules")));
        assert!(!ArtifactScanner::is_ignored_dir(Path::new("src")));
        assert!(!ArtifactScanner::is_ignored_dir(Path::new("out")));
    }

    #[test]
    fn test_infer_kind() {
        assert_eq!(ArtifactScanner::infer_kind(""), ContractKind::Interface);
        assert_eq!(
            ArtifactScanner::infer_kind("73000000000000000000000000000000000000000030146080"),
            ContractKind::Library
        );
        assert_eq!(ArtifactScanner::infer_kind("6080604052"), ContractKind::Contract);
    }

    #[test]
    fn test_scan_foundry_artifact() {
        let root = scratch_dir("foundry");
        let dir = root.join("out").join("Token.sol");
        fs::create_dir_all(&dir).unwrap();
        let artifact = format!(
            r#"{{"abi":{},"bytecode":{{"object":"0x60806040aa"}},"deployedBytecode":{{"object":"0x6080604052"}}}}"#,
            TOKEN_ABI
        );
        fs::write(dir.join("Token.json"), artifact).unwrap();
        // outside out/ and artifacts/, never read
        fs::write(root.join("package.json"), "{}").unwrap();

        let scan = ArtifactScanner::scan(&root);
        assert_eq!(scan.scanned_files, 1);
        assert!(scan.errors.is_empty(), "{:?}", scan.errors);
        assert_eq!(scan.contexts.len(), 2);

        let deployed = scan
            .contexts
            .find_context(&[0x60, 0x80, 0x60, 0x40, 0x52])
            .unwrap();
        assert!(!deployed.is_constructor);
        assert_eq!(deployed.contract_id.as_deref(), Some("Token.sol:Token"));
        assert_eq!(deployed.payable, Some(true));
        assert_eq!(
            deployed
                .lookup(Selector::from([0xa9, 0x05, 0x9c, 0xbb]))
                .map(|e| e.name.as_str()),
            Some("transfer")
        );

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_scan_collects_errors() {
        let root = scratch_dir("broken");
        let dir = root.join("artifacts");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Broken.json"), "{ not json").unwrap();

        let scan = ArtifactScanner::scan(&root);
        assert_eq!(scan.scanned_files, 1);
        assert_eq!(scan.errors.len(), 1);
        assert!(scan.contexts.is_empty());

        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn test_load_function_table() {
        let root = scratch_dir("table");
        let path = root.join("table.json");
        fs::write(
            &path,
            r#"{ "42": { "name": "helper", "contractId": "1", "contractName": "Main" } }"#,
        )
        .unwrap();

        let table = load_function_table(&path).unwrap();
        assert_eq!(table.get(42).unwrap().name, "helper");
        assert!(load_function_table(root.join("missing.json")).is_err());

        let _ = fs::remove_dir_all(&root);
    }
}
