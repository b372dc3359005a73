pub mod library;
pub mod office;

pub use library::LibraryBackend;
pub use office::{OfficeBackend, OfficeSession};

use crate::config::Config;
use crate::error::{ExportToolError, Result};
use crate::export::{sanitize_name, ExportJob, ExportResult, JobLog};
use crate::scanner::{SheetFilter, SheetSelection};
use calamine::{open_workbook, Reader, Xlsx};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Read the workbook in-process and write CSV directly
    Library,
    /// Drive an installed office application (LibreOffice)
    Office,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Library => "library",
            BackendKind::Office => "office",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The conversion strategy for a run.
#[derive(Debug, Clone)]
pub enum Backend {
    Library(LibraryBackend),
    Office(OfficeBackend),
}

impl Backend {
    pub fn from_config(config: &Config) -> Self {
        match config.export.backend {
            BackendKind::Library => Backend::Library(LibraryBackend::new()),
            BackendKind::Office => Backend::Office(OfficeBackend::from_config(&config.office)),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Library(_) => BackendKind::Library,
            Backend::Office(_) => BackendKind::Office,
        }
    }

    /// Fails with `BackendUnavailable` when the backend cannot run here.
    pub fn check_available(&self) -> Result<()> {
        match self {
            // linked into the binary
            Backend::Library(_) => Ok(()),
            Backend::Office(office) => office.resolve_program().map(|_| ()),
        }
    }

    pub fn export(
        &self,
        job: &ExportJob,
        filter: &SheetFilter,
        log: &mut JobLog,
    ) -> Result<ExportResult> {
        match self {
            Backend::Library(library) => library.export(job, filter, log),
            Backend::Office(office) => office.export(job, filter, log),
        }
    }
}

/// Sheet names from workbook metadata, without loading cell data.
pub fn read_sheet_names(workbook: &Path) -> Result<Vec<String>> {
    let reader: Xlsx<_> = open_workbook(workbook).map_err(|e| {
        ExportToolError::export(
            workbook.display(),
            format!("cannot open workbook: {}", e),
        )
    })?;
    Ok(reader.sheet_names().to_vec())
}

/// `<outputFolder>/<safeSheetName>.csv`
pub fn csv_path_for(output_folder: &Path, sheet: &str) -> PathBuf {
    output_folder.join(format!("{}.csv", sanitize_name(sheet)))
}

fn log_selection(log: &mut JobLog, selection: &SheetSelection) {
    for (name, reason) in &selection.skipped {
        log.info(format!("Skipping sheet '{}' ({}).", name, reason));
    }
}

fn warn_on_overwrite(log: &mut JobLog, result: &ExportResult, sheet: &str, csv_path: &Path) {
    if result.has_written(csv_path) {
        log.warn(format!(
            "Sheet '{}' maps to '{}', which was already written in this job; it will be replaced.",
            sheet,
            csv_path.display()
        ));
    }
}
