use crate::backend::BackendKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One workbook's export: where it reads from and where it writes to.
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub workbook: PathBuf,
    pub output_folder: PathBuf,
    pub log_file: PathBuf,
    pub index: usize,
    pub total: usize,
}

impl ExportJob {
    pub fn progress_label(&self) -> String {
        format!("[{}/{}]", self.index, self.total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    pub backend: BackendKind,
    pub workbook_path: PathBuf,
    pub output_folder: PathBuf,
    pub sheets_exported: Vec<String>,
    pub csv_files: Vec<PathBuf>,
    pub log_file: PathBuf,
}

impl ExportResult {
    pub fn new(backend: BackendKind, job: &ExportJob) -> Self {
        Self {
            backend,
            workbook_path: job.workbook.clone(),
            output_folder: job.output_folder.clone(),
            sheets_exported: Vec::new(),
            csv_files: Vec::new(),
            log_file: job.log_file.clone(),
        }
    }

    pub fn record_sheet<S: Into<String>>(&mut self, sheet: S, csv_file: PathBuf) {
        self.sheets_exported.push(sheet.into());
        self.csv_files.push(csv_file);
    }

    pub fn has_written(&self, csv_file: &Path) -> bool {
        self.csv_files.iter().any(|f| f == csv_file)
    }
}

/// Dry-run view of a single job.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedJob {
    pub workbook_path: PathBuf,
    pub output_folder: PathBuf,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportPlan {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub backend: BackendKind,
    pub jobs: Vec<PlannedJob>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ExportJob {
        ExportJob {
            workbook: PathBuf::from("/data/book.xlsx"),
            output_folder: PathBuf::from("/data/csv-export/book_05-01-2024_1430"),
            log_file: PathBuf::from("/data/csv-export/book_05-01-2024_1430/export.log"),
            index: 2,
            total: 5,
        }
    }

    #[test]
    fn test_progress_label() {
        assert_eq!(job().progress_label(), "[2/5]");
    }

    #[test]
    fn test_result_records_sheets_in_order() {
        let job = job();
        let mut result = ExportResult::new(BackendKind::Library, &job);
        result.record_sheet("Sheet1", job.output_folder.join("Sheet1.csv"));
        result.record_sheet("Summary", job.output_folder.join("Summary.csv"));

        assert_eq!(result.sheets_exported, vec!["Sheet1", "Summary"]);
        assert_eq!(result.csv_files.len(), 2);
        assert!(result.has_written(&job.output_folder.join("Summary.csv")));
        assert!(!result.has_written(&job.output_folder.join("Sheet2.csv")));
        assert_eq!(result.log_file, job.log_file);
    }

    #[test]
    fn test_result_serializes_backend_name() {
        let result = ExportResult::new(BackendKind::Office, &job());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["backend"], "office");
        assert_eq!(json["workbook_path"], "/data/book.xlsx");
    }
}
