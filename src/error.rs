use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportToolError {
    #[error("Source path not found: {path}")]
    PathNotFound { path: String },

    #[error("Backend '{backend}' is unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    #[error("Export failed for {workbook}: {message}")]
    Export { workbook: String, message: String },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },
}

impl ExportToolError {
    pub fn export<W: std::fmt::Display, M: Into<String>>(workbook: W, message: M) -> Self {
        ExportToolError::Export {
            workbook: workbook.to_string(),
            message: message.into(),
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for ExportToolError {
    fn user_message(&self) -> String {
        match self {
            ExportToolError::PathNotFound { path } => {
                format!("Source path not found: {}", path)
            }
            ExportToolError::BackendUnavailable { backend, reason } => {
                format!("The '{}' backend cannot be used: {}", backend, reason)
            }
            ExportToolError::Export { workbook, message } => {
                format!("Failed to export {}: {}", workbook, message)
            }
            ExportToolError::Csv(e) => {
                format!("Failed to write CSV output: {}", e)
            }
            ExportToolError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            ExportToolError::Cancelled => "Operation was cancelled by user".to_string(),
            ExportToolError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            ExportToolError::PathNotFound { .. } => Some(
                "Check the spelling of the path, or pass an absolute path to a .xlsx file or a folder.".to_string()
            ),
            ExportToolError::BackendUnavailable { backend, .. } if backend == "office" => Some(
                "Install LibreOffice, point --office-program at the soffice executable, or use --backend library.".to_string()
            ),
            ExportToolError::BackendUnavailable { .. } => Some(
                "Try the other backend with --backend.".to_string()
            ),
            ExportToolError::Export { .. } => Some(
                "Make sure the workbook opens in a spreadsheet application and that the destination is writable. See the export log for the last step reached.".to_string()
            ),
            ExportToolError::Config { .. } => Some(
                "Check your configuration file syntax and the values passed on the command line.".to_string()
            ),
            ExportToolError::Io(_) | ExportToolError::Csv(_) => Some(
                "Ensure you have the necessary read/write permissions for the destination folder.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ExportToolError {
    fn from(error: toml::de::Error) -> Self {
        ExportToolError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportToolError>;
