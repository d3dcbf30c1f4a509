//! Runtime configuration: TOML file, then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{ArtifactType, HalgateError, Result};
use crate::probe::default_plantuml_jar_paths;
use crate::runner::MAX_TOOL_TIMEOUT;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "halgate.toml";

pub const ENV_TOOL_TIMEOUT_SECS: &str = "HALGATE_TOOL_TIMEOUT_SECS";
pub const ENV_MAX_CONCURRENCY: &str = "HALGATE_MAX_CONCURRENCY";

/// Per-type score at or above which a validator may report `ok = true`.
///
/// The defaults are the values the generation pipeline has been running
/// with; they are not derived from anything and are expected to be tuned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceThresholds {
    pub aidl: f64,
    pub cpp: f64,
    pub selinux: f64,
    pub build: f64,
    pub vintf: f64,
    pub puml: f64,
    pub android_app: f64,
    pub android_layout: f64,
    pub backend: f64,
    pub backend_model: f64,
    pub simulator: f64,
    pub design_doc: f64,
}

impl Default for AcceptanceThresholds {
    fn default() -> Self {
        Self {
            aidl: 0.70,
            cpp: 0.70,
            selinux: 0.70,
            build: 0.70,
            vintf: 0.75,
            puml: 0.80,
            android_app: 0.75,
            android_layout: 0.75,
            backend: 0.75,
            backend_model: 0.75,
            simulator: 0.75,
            design_doc: 0.75,
        }
    }
}

impl AcceptanceThresholds {
    pub fn for_type(&self, ty: ArtifactType) -> f64 {
        match ty {
            ArtifactType::InterfaceDefinition => self.aidl,
            ArtifactType::NativeService => self.cpp,
            ArtifactType::SecurityPolicy => self.selinux,
            ArtifactType::BuildDescriptor => self.build,
            ArtifactType::ServiceManifest => self.vintf,
            ArtifactType::DiagramSource => self.puml,
            ArtifactType::UiController => self.android_app,
            ArtifactType::UiLayout => self.android_layout,
            ArtifactType::RestServer => self.backend,
            ArtifactType::DataModel => self.backend_model,
            ArtifactType::Simulator => self.simulator,
            ArtifactType::DesignDocument => self.design_doc,
        }
    }

    /// Every threshold must lie in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for ty in ArtifactType::ALL {
            let value = self.for_type(ty);
            if !(0.0..=1.0).contains(&value) {
                return Err(HalgateError::InvalidConfig(format!(
                    "threshold for '{}' must be within [0, 1], got {}",
                    ty, value
                )));
            }
        }
        Ok(())
    }
}

/// Top-level halgate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalgateConfig {
    /// Hard limit for each native tool invocation, in seconds (max 60).
    pub tool_timeout_secs: u64,
    /// In-flight validations during batch evaluation; `None` = host parallelism.
    pub max_concurrency: Option<usize>,
    pub thresholds: AcceptanceThresholds,
    /// Where to look for `plantuml.jar`.
    pub plantuml_jar_paths: Vec<PathBuf>,
}

impl Default for HalgateConfig {
    fn default() -> Self {
        Self {
            tool_timeout_secs: MAX_TOOL_TIMEOUT.as_secs(),
            max_concurrency: None,
            thresholds: AcceptanceThresholds::default(),
            plantuml_jar_paths: default_plantuml_jar_paths(),
        }
    }
}

impl HalgateConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: HalgateConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or from [`DEFAULT_CONFIG_FILE`] if it exists, or
    /// defaults; then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_toml_str(&std::fs::read_to_string(p)?)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_toml_str(&std::fs::read_to_string(default_path)?)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup function.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TOOL_TIMEOUT_SECS) {
            self.tool_timeout_secs = raw.trim().parse().map_err(|_| {
                HalgateError::InvalidConfig(format!("{ENV_TOOL_TIMEOUT_SECS}: not a number: {raw}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
            let n: usize = raw.trim().parse().map_err(|_| {
                HalgateError::InvalidConfig(format!("{ENV_MAX_CONCURRENCY}: not a number: {raw}"))
            })?;
            self.max_concurrency = Some(n);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.tool_timeout_secs == 0 {
            return Err(HalgateError::InvalidConfig(
                "tool_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrency == Some(0) {
            return Err(HalgateError::InvalidConfig(
                "max_concurrency must be greater than zero".to_string(),
            ));
        }
        self.thresholds.validate()
    }

    /// Effective per-invocation timeout, capped at [`MAX_TOOL_TIMEOUT`].
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs).min(MAX_TOOL_TIMEOUT)
    }

    /// Effective batch concurrency.
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = HalgateConfig::default();
        assert_eq!(cfg.tool_timeout(), Duration::from_secs(60));
        assert!(cfg.concurrency() >= 1);
        assert_eq!(cfg.thresholds.for_type(ArtifactType::DiagramSource), 0.80);
        assert_eq!(cfg.thresholds.for_type(ArtifactType::InterfaceDefinition), 0.70);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let cfg = HalgateConfig::from_toml_str(
            r#"
            tool_timeout_secs = 20

            [thresholds]
            selinux = 0.9
            "#,
        )
        .unwrap();
        assert_eq!(cfg.tool_timeout(), Duration::from_secs(20));
        assert_eq!(cfg.thresholds.selinux, 0.9);
        assert_eq!(cfg.thresholds.cpp, 0.70);
    }

    #[test]
    fn test_timeout_is_capped() {
        let cfg = HalgateConfig::from_toml_str("tool_timeout_secs = 300").unwrap();
        assert_eq!(cfg.tool_timeout(), MAX_TOOL_TIMEOUT);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let err = HalgateConfig::from_toml_str("[thresholds]\naidl = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("aidl"));
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = HalgateConfig::default();
        cfg.apply_env(|key| match key {
            ENV_TOOL_TIMEOUT_SECS => Some("7".to_string()),
            ENV_MAX_CONCURRENCY => Some("3".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.tool_timeout_secs, 7);
        assert_eq!(cfg.concurrency(), 3);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut cfg = HalgateConfig::default();
        let err = cfg
            .apply_env(|key| (key == ENV_MAX_CONCURRENCY).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, HalgateError::InvalidConfig(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("halgate.toml");
        std::fs::write(&path, "max_concurrency = 2\n").unwrap();
        let cfg = HalgateConfig::load(Some(&path)).unwrap();
        assert!(cfg.max_concurrency.is_some());
    }
}
