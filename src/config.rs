use crate::backend::BackendKind;
use crate::error::{ExportToolError, Result};
use crate::export::naming::{CollisionPolicy, DatePattern};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATE_FORMAT: &str = "dd-MM-yyyy_HHmm";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub export: ExportConfig,
    pub sheets: SheetConfig,
    pub output: OutputConfig,
    pub office: OfficeConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExportConfig {
    pub backend: BackendKind,
    pub recurse: bool,
    pub date_format: String,
    pub on_collision: CollisionPolicy,
    pub max_depth: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SheetConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination root; `csv-export` next to the source when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    /// Central log directory; logs go into each export folder when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OfficeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    pub visible: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Library,
            recurse: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            on_collision: CollisionPolicy::Suffix,
            max_depth: 32,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ExportToolError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ExportToolError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ExportToolError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["xlsheet2csv.toml", ".xlsheet2csv.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(backend) = cli_args.backend {
            self.export.backend = backend;
        }

        if cli_args.recurse {
            self.export.recurse = true;
        }

        if let Some(ref date_format) = cli_args.date_format {
            self.export.date_format = date_format.clone();
        }

        if let Some(policy) = cli_args.on_collision {
            self.export.on_collision = policy;
        }

        if let Some(ref include) = cli_args.include {
            self.sheets.include = clean_names(include);
        }

        if let Some(ref exclude) = cli_args.exclude {
            self.sheets.exclude = clean_names(exclude);
        }

        if let Some(ref destination) = cli_args.destination {
            self.output.destination = Some(destination.clone());
        }

        if let Some(ref log_root) = cli_args.log_root {
            self.output.log_root = Some(log_root.clone());
        }

        if let Some(ref program) = cli_args.office_program {
            self.office.program = Some(program.clone());
        }

        if cli_args.visible {
            self.office.visible = true;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| ExportToolError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| ExportToolError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.date_pattern()?;

        if self.export.max_depth == 0 {
            return Err(ExportToolError::Config {
                message: "Maximum directory depth must be greater than 0".to_string(),
            });
        }

        if let (BackendKind::Office, Some(program)) = (self.export.backend, &self.office.program) {
            if !program.exists() {
                return Err(ExportToolError::Config {
                    message: format!("Office program does not exist: {}", program.display()),
                });
            }
        }

        if self
            .sheets
            .include
            .iter()
            .chain(self.sheets.exclude.iter())
            .any(|name| name.trim().is_empty())
        {
            return Err(ExportToolError::Config {
                message: "Sheet names in include/exclude lists cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    pub fn date_pattern(&self) -> Result<DatePattern> {
        DatePattern::parse(&self.export.date_format)
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

fn clean_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub backend: Option<BackendKind>,
    pub recurse: bool,
    pub date_format: Option<String>,
    pub on_collision: Option<CollisionPolicy>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub destination: Option<PathBuf>,
    pub log_root: Option<PathBuf>,
    pub office_program: Option<PathBuf>,
    pub visible: bool,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: Option<BackendKind>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn with_date_format(mut self, date_format: Option<String>) -> Self {
        self.date_format = date_format;
        self
    }

    pub fn with_on_collision(mut self, policy: Option<CollisionPolicy>) -> Self {
        self.on_collision = policy;
        self
    }

    pub fn with_include(mut self, include: Option<Vec<String>>) -> Self {
        self.include = include;
        self
    }

    pub fn with_exclude(mut self, exclude: Option<Vec<String>>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_log_root(mut self, log_root: Option<PathBuf>) -> Self {
        self.log_root = log_root;
        self
    }

    pub fn with_office_program(mut self, program: Option<PathBuf>) -> Self {
        self.office_program = program;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.export.backend, BackendKind::Library);
        assert_eq!(config.export.date_format, "dd-MM-yyyy_HHmm");
        assert_eq!(config.export.on_collision, CollisionPolicy::Suffix);
        assert!(!config.export.recurse);
        assert!(config.sheets.include.is_empty());
        assert!(config.output.destination.is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.export.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.date_format = "%Q".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.export.date_format = "%Z".to_string();
        assert!(config.validate().is_err());

        // separators are sanitized out of folder names
        let mut config = Config::default();
        config.export.date_format = "yyyy/MM/dd".to_string();
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.office.program = Some(PathBuf::from("/definitely/not/here/soffice"));
        assert!(config.validate().is_ok());
        config.export.backend = BackendKind::Office;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.sheets.include = vec!["Summary".to_string()];
        config.export.recurse = true;
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.sheets.include, vec!["Summary"]);
        assert!(loaded_config.export.recurse);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let config: Config = toml::from_str("[export]\nbackend = \"office\"\n").unwrap();
        assert_eq!(config.export.backend, BackendKind::Office);
        assert_eq!(config.export.date_format, DEFAULT_DATE_FORMAT);
        assert!(!config.office.visible);
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::load_from_file("/no/such/xlsheet2csv.toml");
        assert!(matches!(result, Err(ExportToolError::Config { .. })));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_backend(Some(BackendKind::Office))
            .with_recurse(true)
            .with_include(Some(vec![" Sheet1 ".to_string(), "".to_string()]))
            .with_date_format(Some("%Y%m%d".to_string()))
            .with_visible(true);

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.export.backend, BackendKind::Office);
        assert!(config.export.recurse);
        assert_eq!(config.sheets.include, vec!["Sheet1"]);
        assert_eq!(config.export.date_format, "%Y%m%d");
        assert!(config.office.visible);
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(!sample.is_empty());
        assert!(sample.contains("[export]"));
        assert!(sample.contains("[sheets]"));
        assert!(sample.contains("[office]"));
        assert!(sample.contains("dd-MM-yyyy_HHmm"));
    }
}
