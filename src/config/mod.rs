//! Decoder configuration

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::decode::DecodeMode;
use crate::domain::{Contexts, FunctionTable};
use crate::infrastructure::{load_function_table, ArtifactScanner};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DecoderConfig {
    #[serde(default)]
    pub mode: DecodeMode,

    /// Project roots to scan for compiled artifacts
    #[serde(default)]
    pub artifact_paths: Vec<String>,

    /// JSON internal function table
    #[serde(default)]
    pub function_table: Option<PathBuf>,
}

impl DecoderConfig {
    /// Parse a TOML config
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str::<DecoderConfig>(content)?)
    }

    /// Artifact roots with `~` expanded
    pub fn artifact_roots(&self) -> Vec<PathBuf> {
        self.artifact_paths
            .iter()
            .map(|path| expand_home(path))
            .collect()
    }

    /// Scan the configured artifact roots into a context registry
    pub fn load_contexts(&self) -> Contexts {
        let scan = ArtifactScanner::scan_roots(&self.artifact_roots());
        for error in &scan.errors {
            warn!(target: "poke_decode::config", %error, "artifact scan error");
        }
        scan.contexts
    }

    /// Load the configured function table, if any
    pub fn load_function_table(&self) -> Result<Option<FunctionTable>> {
        self.function_table
            .as_ref()
            .map(load_function_table)
            .transpose()
    }
}

/// Load the user config; a missing or unreadable file gives the defaults
pub fn load() -> DecoderConfig {
    let Some(path) = config_path() else {
        return DecoderConfig::default();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return DecoderConfig::default(),
    };
    match DecoderConfig::from_toml(&content) {
        Ok(config) => {
            debug!(target: "poke_decode::config", path = %path.display(), "loaded config");
            config
        }
        Err(err) => {
            warn!(target: "poke_decode::config", path = %path.display(), error = %err, "invalid config, using defaults");
            DecoderConfig::default()
        }
    }
}

/// Name of the per-project config file, looked up in the working directory
pub const PROJECT_CONFIG_FILE: &str = "poke-decode.toml";

pub fn config_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok();
    resolve_config_path(|key| std::env::var_os(key), cwd.as_deref())
}

/// Config lookup order: `POKE_DECODE_CONFIG`, a `poke-decode.toml` in the
/// project directory, then the user config directory.
fn resolve_config_path(
    env: impl Fn(&str) -> Option<OsString>,
    project_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = env("POKE_DECODE_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(local) = project_dir
        .map(|dir| dir.join(PROJECT_CONFIG_FILE))
        .filter(|path| path.is_file())
    {
        return Some(local);
    }
    if let Some(xdg) = env("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("poke").join("decode.toml"));
    }
    if let Some(home) = env("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("poke").join("decode.toml"));
    }

    directories::ProjectDirs::from("io", "poke", "poke")
        .map(|dirs| dirs.config_dir().join("decode.toml"))
}

fn expand_home(path: &str) -> PathBuf {
    let trimmed = path.trim();
    match trimmed.strip_prefix("~/") {
        Some(rest) => match std::env::var_os("HOME") {
            Some(home) => PathBuf::from(home).join(rest),
            None => PathBuf::from(trimmed),
        },
        None => PathBuf::from(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::from_toml("").unwrap();
        assert_eq!(config.mode, DecodeMode::Normal);
        assert!(config.artifact_paths.is_empty());
        assert!(config.function_table.is_none());
        assert!(config.load_function_table().unwrap().is_none());
    }

    #[test]
    fn test_parse_mode_and_paths() {
        let config = DecoderConfig::from_toml(
            r#"
            mode = "strict"
            artifact_paths = ["/work/project", "  /other "]
            function_table = "/work/table.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, DecodeMode::Strict);
        assert_eq!(
            config.artifact_roots(),
            vec![PathBuf::from("/work/project"), PathBuf::from("/other")]
        );
        assert_eq!(config.function_table, Some(PathBuf::from("/work/table.json")));
    }

    #[test]
    fn test_config_path_order() {
        let project = std::env::temp_dir().join(format!("poke-decode-cfg-{}", std::process::id()));
        fs::create_dir_all(&project).unwrap();
        let local = project.join(PROJECT_CONFIG_FILE);
        let _ = fs::remove_file(&local);

        let env = |key: &str| match key {
            "XDG_CONFIG_HOME" => Some(OsString::from("/xdg")),
            "HOME" => Some(OsString::from("/home/dev")),
            _ => None,
        };
        assert_eq!(
            resolve_config_path(env, Some(&project)),
            Some(PathBuf::from("/xdg/poke/decode.toml"))
        );

        fs::write(&local, "mode = \"permissive\"").unwrap();
        assert_eq!(resolve_config_path(env, Some(&project)), Some(local.clone()));

        let explicit =
            |key: &str| (key == "POKE_DECODE_CONFIG").then(|| OsString::from("/etc/decode.toml"));
        assert_eq!(
            resolve_config_path(explicit, Some(&project)),
            Some(PathBuf::from("/etc/decode.toml"))
        );

        let home_only = |key: &str| (key == "HOME").then(|| OsString::from("/home/dev"));
        assert_eq!(
            resolve_config_path(home_only, None),
            Some(PathBuf::from("/home/dev/.config/poke/decode.toml"))
        );

        fs::remove_dir_all(&project).unwrap();
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(DecoderConfig::from_toml(r#"mode = "lenient""#).is_err());
    }
}
