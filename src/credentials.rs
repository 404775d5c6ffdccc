//! API key resolution from the environment and YAML config files.
//!
//! Resolution walks an ordered candidate list and returns the first non-empty
//! value: the environment variable first, then every `(file, key path)` pair in
//! order. Missing files are skipped; unreadable or malformed files are errors.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::constants::steam_web;
use crate::errors::IngestError;

/// One config-file location to probe for the key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyCandidate {
    /// YAML file to read.
    pub file: PathBuf,
    /// Nested mapping keys leading to the value, e.g. `["auth", "api_key"]`.
    pub key_path: Vec<String>,
}

/// Ordered API key lookup: environment variable, then config candidates.
#[derive(Clone, Debug)]
pub struct ApiKeyResolver {
    env_var: String,
    candidates: Vec<KeyCandidate>,
}

impl ApiKeyResolver {
    /// Resolver that checks `env_var` and nothing else until candidates are added.
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
            candidates: Vec::new(),
        }
    }

    /// Steam Web API lookup: `STEAM_API_KEY`, then the local override file,
    /// then the shared config file, each probing `auth.api_key`,
    /// `steam.api_key`, and `api_key`.
    pub fn steam_web() -> Self {
        Self::steam_web_in(".")
    }

    /// Same as [`ApiKeyResolver::steam_web`] with config paths relative to `root`.
    pub fn steam_web_in(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(steam_web::API_KEY_ENV)
            .with_file_fields(
                root.join(steam_web::LOCAL_CONFIG_PATH),
                &steam_web::API_KEY_FIELDS,
            )
            .with_file_fields(
                root.join(steam_web::SHARED_CONFIG_PATH),
                &steam_web::API_KEY_FIELDS,
            )
    }

    /// Append one candidate per key path, all reading `file`.
    pub fn with_file_fields(mut self, file: impl Into<PathBuf>, key_paths: &[&[&str]]) -> Self {
        let file = file.into();
        for key_path in key_paths {
            self.candidates.push(KeyCandidate {
                file: file.clone(),
                key_path: key_path.iter().map(|part| (*part).to_string()).collect(),
            });
        }
        self
    }

    /// Candidates in probe order.
    pub fn candidates(&self) -> &[KeyCandidate] {
        &self.candidates
    }

    /// Resolve using the process environment.
    pub fn resolve(&self) -> Result<String, IngestError> {
        self.resolve_with_env(std::env::var(&self.env_var).ok())
    }

    /// Resolve with an explicit environment value, which wins when non-empty.
    pub fn resolve_with_env(&self, env_value: Option<String>) -> Result<String, IngestError> {
        if let Some(value) = env_value.and_then(non_empty) {
            return Ok(value);
        }

        let mut loaded: Option<(PathBuf, Option<Value>)> = None;
        for candidate in &self.candidates {
            let cached = matches!(&loaded, Some((path, _)) if *path == candidate.file);
            if !cached {
                let document = if candidate.file.is_file() {
                    Some(load_yaml(&candidate.file)?)
                } else {
                    None
                };
                loaded = Some((candidate.file.clone(), document));
            }
            let Some((_, Some(document))) = &loaded else {
                continue;
            };
            if let Some(value) = lookup_string(document, &candidate.key_path) {
                return Ok(value);
            }
        }

        Err(IngestError::Configuration(self.missing_key_message()))
    }

    fn missing_key_message(&self) -> String {
        let mut files: Vec<String> = Vec::new();
        for candidate in &self.candidates {
            let display = candidate.file.display().to_string();
            if !files.contains(&display) {
                files.push(display);
            }
        }
        let fields = self
            .candidates
            .iter()
            .map(|candidate| candidate.key_path.join("."))
            .fold(Vec::<String>::new(), |mut acc, field| {
                if !acc.contains(&field) {
                    acc.push(field);
                }
                acc
            });
        format!(
            "no API key found. Export the {} environment variable, or set {} in {}",
            self.env_var,
            fields.join(" / "),
            if files.is_empty() {
                "a config file".to_string()
            } else {
                files.join(" or ")
            }
        )
    }
}

/// Parse a YAML file into a generic value.
pub fn load_yaml(path: &Path) -> Result<Value, IngestError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&text)?)
}

fn lookup_string(document: &Value, key_path: &[String]) -> Option<String> {
    let mut current = document;
    for key in key_path {
        current = current.as_mapping()?.get(key.as_str())?;
    }
    match current {
        Value::String(value) => non_empty(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, relative: &str, body: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn environment_value_wins_over_files() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            steam_web::LOCAL_CONFIG_PATH,
            "auth:\n  api_key: from-local\n",
        );
        let resolver = ApiKeyResolver::steam_web_in(temp.path());
        let key = resolver
            .resolve_with_env(Some("from-env".to_string()))
            .unwrap();
        assert_eq!(key, "from-env");
    }

    #[test]
    fn blank_environment_value_falls_through_to_files() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            steam_web::SHARED_CONFIG_PATH,
            "api_key: shared-top-level\n",
        );
        let resolver = ApiKeyResolver::steam_web_in(temp.path());
        let key = resolver.resolve_with_env(Some("   ".to_string())).unwrap();
        assert_eq!(key, "shared-top-level");
    }

    #[test]
    fn local_file_wins_over_shared_file() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            steam_web::LOCAL_CONFIG_PATH,
            "steam:\n  api_key: local-steam\n",
        );
        write(
            temp.path(),
            steam_web::SHARED_CONFIG_PATH,
            "auth:\n  api_key: shared-auth\n",
        );
        let resolver = ApiKeyResolver::steam_web_in(temp.path());
        assert_eq!(resolver.resolve_with_env(None).unwrap(), "local-steam");
    }

    #[test]
    fn field_order_within_one_file() {
        let temp = tempdir().unwrap();
        write(
            temp.path(),
            steam_web::LOCAL_CONFIG_PATH,
            "api_key: top\nsteam:\n  api_key: steam\nauth:\n  api_key: auth\n",
        );
        let resolver = ApiKeyResolver::steam_web_in(temp.path());
        assert_eq!(resolver.resolve_with_env(None).unwrap(), "auth");
    }

    #[test]
    fn missing_key_names_env_var_and_both_files() {
        let temp = tempdir().unwrap();
        write(temp.path(), steam_web::LOCAL_CONFIG_PATH, "auth:\n  other: 1\n");
        let resolver = ApiKeyResolver::steam_web_in(temp.path());
        let err = resolver.resolve_with_env(None).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, IngestError::Configuration(_)));
        assert!(message.contains("STEAM_API_KEY"));
        assert!(message.contains("steam_web_api.local.yaml"));
        assert!(message.contains("steam_web_api.yaml"));
        assert!(message.contains("auth.api_key"));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let temp = tempdir().unwrap();
        write(temp.path(), steam_web::LOCAL_CONFIG_PATH, "auth: [unclosed\n");
        let resolver = ApiKeyResolver::steam_web_in(temp.path());
        let err = resolver.resolve_with_env(None).unwrap_err();
        assert!(matches!(err, IngestError::Yaml(_)));
    }

    #[test]
    fn load_yaml_reads_scalars() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("test.yaml");
        fs::write(&path, "foo: bar\nnum: 1").unwrap();

        let data = load_yaml(&path).unwrap();

        assert_eq!(data["foo"].as_str(), Some("bar"));
        assert_eq!(data["num"].as_i64(), Some(1));
    }
}
