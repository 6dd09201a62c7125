use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use synthguard_anonymity::EnforcerConfig;
use synthguard_copula::CopulaConfig;
use synthguard_inference::AuditConfig;
use synthguard_ledger::LedgerConfig;
use thiserror::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigFormat {
    Auto,
    Toml,
    Yaml,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {format:?} config: {details}")]
    Parse {
        format: ConfigFormat,
        details: String,
    },
    #[error("configuration invalid: {0}")]
    Validation(String),
}

/// Parameters of one certification run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct CertificationConfig {
    /// ε attributed to the release.
    pub epsilon: f64,
    pub delta: f64,
    pub target_k: usize,
    pub quasi_identifiers: Vec<String>,
    /// Columns the membership attack looks at; empty means all.
    pub sensitive_columns: Vec<String>,
    /// Assumed size of the population the source was drawn from. Defaults
    /// to the released row count.
    pub population_size: Option<usize>,
    /// When set, ε is charged to this dataset's ledger.
    pub dataset_id: Option<String>,
    pub actor: String,
    /// Only evaluate k, the table was already enforced upstream.
    pub enforcement_applied_upstream: bool,
    pub seed: u64,
}

impl CertificationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(ConfigError::Validation(format!(
                "certification epsilon {} must be finite and positive",
                self.epsilon
            )));
        }
        if !(0.0..1.0).contains(&self.delta) {
            return Err(ConfigError::Validation(format!(
                "certification delta {} must lie in [0, 1)",
                self.delta
            )));
        }
        if self.target_k == 0 {
            return Err(ConfigError::Validation(
                "target k must be greater than zero".into(),
            ));
        }
        if self.quasi_identifiers.is_empty() {
            return Err(ConfigError::Validation(
                "at least one quasi-identifier must be defined".into(),
            ));
        }
        if self.population_size == Some(0) {
            return Err(ConfigError::Validation(
                "population size must be greater than zero".into(),
            ));
        }
        if self.dataset_id.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::Validation("dataset id must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for CertificationConfig {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            delta: 1e-5,
            target_k: 5,
            quasi_identifiers: Vec::new(),
            sensitive_columns: Vec::new(),
            population_size: None,
            dataset_id: None,
            actor: "synthguard".into(),
            enforcement_applied_upstream: false,
            seed: 0,
        }
    }
}

/// Every subsystem's settings in one document.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct CoreConfig {
    pub copula: CopulaConfig,
    pub enforcer: EnforcerConfig,
    pub ledger: LedgerConfig,
    pub audit: AuditConfig,
    pub certification: CertificationConfig,
}

impl CoreConfig {
    /// Checks the subsystem sections. The certification section describes a
    /// single run and is checked when that run starts, or by
    /// [`CoreConfig::validate_document`] for configuration files.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.copula.eigen_floor.is_finite() && self.copula.eigen_floor > 0.0) {
            return Err(ConfigError::Validation(
                "copula eigen floor must be finite and positive".into(),
            ));
        }
        if !(self.copula.uniform_clamp > 0.0 && self.copula.uniform_clamp < 0.5) {
            return Err(ConfigError::Validation(
                "copula uniform clamp must lie in (0, 0.5)".into(),
            ));
        }
        if self.enforcer.band_count == 0 {
            return Err(ConfigError::Validation(
                "enforcer band count must be greater than zero".into(),
            ));
        }
        if let Some((column, width)) = self
            .enforcer
            .band_widths
            .iter()
            .find(|(_, width)| !(width.is_finite() && **width > 0.0))
        {
            return Err(ConfigError::Validation(format!(
                "band width {width} for {column} must be finite and positive"
            )));
        }
        self.ledger
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))?;
        self.audit
            .validate()
            .map_err(|err| ConfigError::Validation(err.to_string()))
    }

    /// Subsystem sections plus the certification run a file describes.
    pub fn validate_document(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.certification.validate()
    }

    pub fn sample() -> Self {
        Self {
            certification: CertificationConfig {
                quasi_identifiers: vec!["age".into(), "state".into()],
                dataset_id: Some("D1".into()),
                ..CertificationConfig::default()
            },
            ..Self::default()
        }
    }
}

pub fn load_config(path: &Path, format: ConfigFormat) -> Result<CoreConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&contents, resolve_format(path, format))
}

/// Parses and validates `contents`. `Auto` is read as TOML.
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<CoreConfig, ConfigError> {
    let config: CoreConfig = match format {
        ConfigFormat::Toml | ConfigFormat::Auto => {
            toml::from_str(contents).map_err(|err| ConfigError::Parse {
                format: ConfigFormat::Toml,
                details: err.to_string(),
            })
        }
        ConfigFormat::Yaml => serde_yaml::from_str(contents).map_err(|err| ConfigError::Parse {
            format,
            details: err.to_string(),
        }),
    }?;
    config.validate_document()?;
    Ok(config)
}

fn resolve_format(path: &Path, format: ConfigFormat) -> ConfigFormat {
    match format {
        ConfigFormat::Auto => match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Toml,
        },
        _ => format,
    }
}
