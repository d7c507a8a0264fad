//! Runtime configuration
//!
//! Settings come from an optional YAML file, then environment variables, then defaults.
//! The catalog data directory is searched in this order:
//!
//! 1. `data_dir` in the configuration file (relative to the file's directory)
//! 2. the `WQB_DATA_DIR` environment variable
//! 3. `./data`, when it contains the operator catalog
//! 4. `$HOME/.wqb_validator/data`
//!
//! `WQB_REGION`, `WQB_DELAY` and `WQB_UNIVERSE` override the default validation context.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::catalog::{CatalogError, FieldCatalog, OperatorCatalog};
use crate::validation::{ExpressionValidator, ValidationContext};

pub const DEFAULT_OPERATORS_FILE: &str = "operators.json";
pub const DEFAULT_FIELDS_FILE: &str = "data_fields.json";
pub const DEFAULT_REGION: &str = "USA";
pub const DEFAULT_DELAY: &str = "1";
pub const DEFAULT_UNIVERSE: &str = "TOP3000";

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file {path}")]
    #[diagnostic(code(wqb::config::io))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {path}")]
    #[diagnostic(code(wqb::config::parse), help("expected a YAML mapping of settings"))]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("could not locate the catalog data directory")]
    #[diagnostic(
        code(wqb::config::data_dir),
        help("set WQB_DATA_DIR, pass --data-dir, or create ./data with the catalog files")
    )]
    NoDataDir,
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub operators_file: String,
    pub fields_file: String,
    pub region: String,
    pub delay: String,
    pub universe: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SettingsFile {
    data_dir: Option<PathBuf>,
    operators_file: Option<String>,
    fields_file: Option<String>,
    region: Option<String>,
    delay: Option<Scalar>,
    universe: Option<String>,
}

/// YAML lets `delay: 1` and `delay: "1"` both through.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(u64),
    Text(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Int(n) => n.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

impl Settings {
    /// Loads settings from the process environment and working directory.
    pub fn load(config: Option<&Path>) -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::load_with(config, &cwd, |name| std::env::var(name).ok())
    }

    /// Loads settings with an explicit working directory and environment lookup.
    pub fn load_with<F>(config: Option<&Path>, cwd: &Path, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (file, base) = match config {
            Some(path) => (read_settings_file(path)?, path.parent().map(Path::to_path_buf)),
            None => (SettingsFile::default(), None),
        };

        let operators_file = file
            .operators_file
            .unwrap_or_else(|| DEFAULT_OPERATORS_FILE.to_string());
        let fields_file = file
            .fields_file
            .unwrap_or_else(|| DEFAULT_FIELDS_FILE.to_string());

        let data_dir = match file.data_dir {
            Some(dir) if dir.is_relative() => base.unwrap_or_default().join(dir),
            Some(dir) => dir,
            None => locate_data_dir(cwd, &operators_file, &var)?,
        };

        let pick = |env: &str, from_file: Option<String>, default: &str| {
            var(env)
                .filter(|value| !value.is_empty())
                .or(from_file)
                .unwrap_or_else(|| default.to_string())
        };
        let settings = Settings {
            region: pick("WQB_REGION", file.region, DEFAULT_REGION),
            delay: pick("WQB_DELAY", file.delay.map(Scalar::into_string), DEFAULT_DELAY),
            universe: pick("WQB_UNIVERSE", file.universe, DEFAULT_UNIVERSE),
            data_dir,
            operators_file,
            fields_file,
        };
        tracing::debug!(data_dir = %settings.data_dir.display(), "resolved settings");
        Ok(settings)
    }

    pub fn operators_path(&self) -> PathBuf {
        self.data_dir.join(&self.operators_file)
    }

    pub fn fields_path(&self) -> PathBuf {
        self.data_dir.join(&self.fields_file)
    }

    /// The default validation context.
    pub fn context(&self) -> ValidationContext {
        ValidationContext::new(&*self.region, &*self.delay, &*self.universe)
    }

    /// Loads both catalogs and builds a validator over them.
    pub fn validator(&self) -> Result<ExpressionValidator, CatalogError> {
        let operators = OperatorCatalog::from_path(self.operators_path())?;
        let fields = FieldCatalog::from_path(self.fields_path())?;
        Ok(ExpressionValidator::new(Arc::new(operators), Arc::new(fields)))
    }
}

fn read_settings_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    let display = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: display.clone(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(SettingsFile::default());
    }
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: display,
        source,
    })
}

fn locate_data_dir<F>(cwd: &Path, operators_file: &str, var: &F) -> Result<PathBuf, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = var("WQB_DATA_DIR").filter(|dir| !dir.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let local = cwd.join("data");
    if local.join(operators_file).is_file() {
        return Ok(local);
    }

    var("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| Path::new(&home).join(".wqb_validator").join("data"))
        .ok_or(ConfigError::NoDataDir)
}
