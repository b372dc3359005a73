use crate::config::ExportConfig;
use crate::error::{ExportToolError, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Prefix of the lock files office applications leave next to open workbooks.
const LOCK_FILE_PREFIX: &str = "~$";
const WORKBOOK_EXTENSION: &str = "xlsx";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookFile {
    pub path: PathBuf,
    pub relative_path: PathBuf,
    pub filename: String,
    pub size: u64,
}

impl WorkbookFile {
    pub fn new(path: PathBuf, relative_path: PathBuf, size: u64) -> Self {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();

        Self {
            path,
            relative_path,
            filename,
            size,
        }
    }

    /// Path relative to the scanned folder, for progress messages.
    pub fn display_path(&self) -> String {
        self.relative_path.display().to_string()
    }
}

/// Workbooks found under a source, plus the entries the walk could not read.
#[derive(Debug, Default)]
pub struct Discovery {
    pub workbooks: Vec<WorkbookFile>,
    pub skipped: Vec<String>,
}

pub struct WorkbookScanner {
    recurse: bool,
    max_depth: usize,
}

impl WorkbookScanner {
    pub fn new(recurse: bool, max_depth: usize) -> Self {
        Self { recurse, max_depth }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.recurse, config.max_depth)
    }

    /// True for `*.xlsx` (any case) that is not an office lock file.
    pub fn is_workbook_name(name: &str) -> bool {
        if name.starts_with(LOCK_FILE_PREFIX) {
            return false;
        }

        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(WORKBOOK_EXTENSION))
    }

    /// Resolves a file or directory into the ordered list of workbooks to export.
    pub fn discover<P: AsRef<Path>>(&self, source: P) -> Result<Discovery> {
        let source = source.as_ref();

        if !source.exists() {
            return Err(ExportToolError::PathNotFound {
                path: source.display().to_string(),
            });
        }

        if source.is_file() {
            let size = source.metadata().map(|m| m.len()).unwrap_or(0);
            let relative = source
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| source.to_path_buf());
            return Ok(Discovery {
                workbooks: vec![WorkbookFile::new(source.to_path_buf(), relative, size)],
                skipped: Vec::new(),
            });
        }

        self.scan_directory(source)
    }

    fn scan_directory(&self, root: &Path) -> Result<Discovery> {
        let depth = if self.recurse { self.max_depth } else { 1 };
        let mut workbooks = Vec::new();
        let mut skipped = Vec::new();

        for entry in WalkDir::new(root).min_depth(1).max_depth(depth) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("walk error under {}: {}", root.display(), err);
                    skipped.push(err.to_string());
                    continue;
                }
            };

            // symlinks are not followed, but a link to a workbook still counts
            if entry.file_type().is_dir() || !entry.path().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if !Self::is_workbook_name(&name) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let relative = entry
                .path()
                .strip_prefix(root)
                .map(Path::to_path_buf)
                .map_err(|_| ExportToolError::InvalidPath {
                    path: entry.path().display().to_string(),
                })?;

            workbooks.push(WorkbookFile::new(entry.path().to_path_buf(), relative, size));
        }

        workbooks.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(Discovery { workbooks, skipped })
    }
}

#[derive(Debug, Default)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub total_size: u64,
}

impl ScanStatistics {
    pub fn from_workbooks(workbooks: &[WorkbookFile]) -> Self {
        Self {
            total_files: workbooks.len(),
            total_size: workbooks.iter().map(|w| w.size).sum(),
        }
    }

    pub fn display_summary(&self) -> String {
        format!(
            "Found {} workbook(s), {} in total",
            self.total_files,
            format_bytes(self.total_size)
        )
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
