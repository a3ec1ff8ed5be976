//! The declarative configuration tree and its version gate.
//!
//! Schema enforcement beyond "does this deserialize and is the version
//! acceptable" is not this crate's job (see SPEC_FULL.md §B.1) — `serde`
//! does the structural work, `load`/`Config::validate_version` do the one
//! piece of validation the core is responsible for.

use std::collections::HashMap;
use std::fs;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};

const ACCEPTED_VERSION_PREFIXES: &[&str] = &["0.1.0", "0.2.0"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub namespaces: HashMap<String, NamespaceDescriptor>,
    #[serde(default)]
    pub hooks: Hooks,
    pub process: Option<ProcessDescriptor>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamespaceDescriptor {
    /// Present => join this namespace by path. Absent => create a new one.
    pub path: Option<String>,
    #[serde(rename = "uidMappings", default)]
    pub uid_mappings: Vec<IdMapping>,
    #[serde(rename = "gidMappings", default)]
    pub gid_mappings: Vec<IdMapping>,
    pub setgroups: Option<bool>,
    #[serde(default)]
    pub mounts: Vec<MountEntry>,
}

impl NamespaceDescriptor {
    /// A namespace is joined (not created) when it names a non-empty path.
    pub fn is_join(&self) -> bool {
        matches!(&self.path, Some(p) if !p.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdMapping {
    #[serde(rename = "containerID")]
    pub container_id: u32,
    #[serde(rename = "hostID")]
    pub host_id: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MountEntry {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub flags: Vec<String>,
    pub data: Option<String>,
}

impl MountEntry {
    pub fn is_pivot_root(&self) -> bool {
        self.kind == "pivot-root"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hooks {
    #[serde(rename = "pre-start", default)]
    pub pre_start: Vec<ProcessDescriptor>,
    #[serde(rename = "post-stop", default)]
    pub post_stop: Vec<ProcessDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessDescriptor {
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Vec<String>,
    pub path: Option<String>,
    pub cwd: Option<String>,
    #[serde(default)]
    pub host: bool,
    pub user: Option<UserSpec>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserSpec {
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    #[serde(rename = "additionalGids", default)]
    pub additional_gids: Vec<u32>,
}

impl Config {
    pub fn parse(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate_version()?;
        config.validate_namespaces()?;
        Ok(config)
    }

    fn validate_version(&self) -> Result<()> {
        if ACCEPTED_VERSION_PREFIXES
            .iter()
            .any(|prefix| self.version.starts_with(prefix))
        {
            Ok(())
        } else {
            Err(Error::config(format!(
                "unsupported config version: {}",
                self.version
            )))
        }
    }

    fn validate_namespaces(&self) -> Result<()> {
        for (name, descriptor) in &self.namespaces {
            if let Some(path) = &descriptor.path {
                if path.is_empty() {
                    return Err(Error::config(format!(
                        "namespace '{name}' has an empty path; omit 'path' to create a new namespace"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Resolves `--config-string`/`--config` into a parsed, version-validated
/// [`Config`], per SPEC_FULL.md §C.
pub fn load(cli: &Cli) -> Result<Config> {
    let raw = match &cli.config_string {
        Some(inline) => inline.clone(),
        None => {
            let path = cli.config.as_deref().unwrap_or("config.json");
            fs::read_to_string(path)
                .map_err(|e| Error::Configuration(format!("cannot read '{path}': {e}")))?
        }
    };
    Config::parse(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_version_prefixes() {
        for v in ["0.1.0", "0.1.0-rc1", "0.2.0", "0.2.0-beta"] {
            let json = format!(r#"{{"version":"{v}"}}"#);
            assert!(Config::parse(&json).is_ok(), "expected {v} to be accepted");
        }
    }

    #[test]
    fn rejects_unknown_version() {
        let json = r#"{"version":"0.3.0"}"#;
        assert!(Config::parse(json).is_err());
    }

    #[test]
    fn unknown_top_level_keys_are_ignored() {
        let json = r#"{"version":"0.2.0","totallyUnknown":{"a":1}}"#;
        assert!(Config::parse(json).is_ok());
    }

    #[test]
    fn namespace_create_vs_join() {
        let json = r#"{
            "version":"0.2.0",
            "namespaces": {
                "uts": {},
                "net": {"path": "/proc/123/ns/net"}
            }
        }"#;
        let config = Config::parse(json).unwrap();
        assert!(!config.namespaces["uts"].is_join());
        assert!(config.namespaces["net"].is_join());
    }

    #[test]
    fn empty_namespace_path_is_rejected() {
        let json = r#"{"version":"0.2.0","namespaces":{"net":{"path":""}}}"#;
        assert!(Config::parse(json).is_err());
    }

    #[test]
    fn minimal_process_only_needs_args() {
        let json = r#"{"version":"0.2.0","process":{"args":["/bin/true"]}}"#;
        let config = Config::parse(json).unwrap();
        let process = config.process.unwrap();
        assert_eq!(process.args, vec!["/bin/true".to_string()]);
        assert!(process.env.is_empty());
        assert!(!process.host);
    }
}
