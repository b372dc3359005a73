//! Office-application backend.
//!
//! Drives an installed LibreOffice (`soffice`) to render each selected sheet's
//! used range, as displayed, into its own CSV file. Every export call owns one
//! [`OfficeSession`]: a private application profile plus a work area, released
//! when the session is dropped, whichever way the export ends.

use super::{csv_path_for, log_selection, read_sheet_names, warn_on_overwrite, BackendKind};
use crate::config::OfficeConfig;
use crate::error::{ExportToolError, Result};
use crate::export::{ExportJob, ExportResult, JobLog};
use crate::scanner::SheetFilter;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const PROGRAM_NAMES: &[&str] = &["soffice", "libreoffice"];

/// Comma separated, double-quoted, UTF-8, values as shown; the last token
/// selects the 1-based sheet to export.
const CSV_FILTER: &str = "csv:Text - txt - csv (StarCalc):44,34,76,1,,0,false,true,true,false,false";

#[derive(Debug, Clone)]
pub struct OfficeBackend {
    program: Option<PathBuf>,
    visible: bool,
}

impl OfficeBackend {
    pub fn new(program: Option<PathBuf>, visible: bool) -> Self {
        Self { program, visible }
    }

    pub fn from_config(config: &OfficeConfig) -> Self {
        Self::new(config.program.clone(), config.visible)
    }

    /// The configured program, or the first office executable found.
    pub fn resolve_program(&self) -> Result<PathBuf> {
        if let Some(ref program) = self.program {
            if program.is_file() {
                return Ok(program.clone());
            }
            return Err(unavailable(format!(
                "configured program {} does not exist",
                program.display()
            )));
        }

        find_office_program().ok_or_else(|| {
            unavailable(format!(
                "none of {} found on PATH or in the default install locations",
                PROGRAM_NAMES.join(", ")
            ))
        })
    }

    pub fn export(
        &self,
        job: &ExportJob,
        filter: &SheetFilter,
        log: &mut JobLog,
    ) -> Result<ExportResult> {
        let program = self.resolve_program()?;
        let session = OfficeSession::acquire(program, self.visible)?;

        log.info(format!("Starting workbook: {}", job.workbook.display()));
        log.info(format!(
            "Office session started ({}, {}).",
            session.program().display(),
            if self.visible { "visible" } else { "headless" }
        ));

        let all_names = read_sheet_names(&job.workbook)?;
        log.info(format!("Workbook has {} sheet(s).", all_names.len()));

        let selection = filter.select(&all_names);
        log_selection(log, &selection);

        let staged = session.stage_workbook(&job.workbook)?;
        let mut result = ExportResult::new(BackendKind::Office, job);
        let total = selection.selected.len();

        for (i, name) in selection.selected.iter().enumerate() {
            let position = all_names
                .iter()
                .position(|n| n == name)
                .map(|p| p + 1)
                .ok_or_else(|| {
                    ExportToolError::export(
                        job.workbook.display(),
                        format!("sheet '{}' disappeared from the workbook", name),
                    )
                })?;

            let csv_path = csv_path_for(&job.output_folder, name);
            warn_on_overwrite(log, &result, name, &csv_path);

            log.info(format!(
                "[{}/{}] Exporting sheet '{}' to '{}'.",
                i + 1,
                total,
                name,
                csv_path.display()
            ));

            session
                .export_sheet(&staged, position, &csv_path)
                .map_err(|e| match e {
                    ExportToolError::Export { message, .. } => ExportToolError::export(
                        job.workbook.display(),
                        format!("sheet '{}': {}", name, message),
                    ),
                    other => other,
                })?;
            result.record_sheet(name.as_str(), csv_path);
        }

        log.info(format!(
            "Completed workbook: {} (sheets exported: {})",
            job.workbook.display(),
            result.csv_files.len()
        ));

        Ok(result)
    }
}

/// Scoped handle on the office application.
///
/// Holds a throwaway user profile, so first-start dialogs, document recovery
/// prompts and lock checks never block a conversion, and a work area for the
/// staged workbook copy. Both are removed on drop.
pub struct OfficeSession {
    program: PathBuf,
    visible: bool,
    profile: TempDir,
    work: TempDir,
}

impl OfficeSession {
    pub fn acquire(program: PathBuf, visible: bool) -> Result<Self> {
        if !program.is_file() {
            return Err(unavailable(format!(
                "program {} does not exist",
                program.display()
            )));
        }

        let profile = tempfile::Builder::new()
            .prefix("xlsheet2csv-profile-")
            .tempdir()
            .map_err(|e| unavailable(format!("cannot create application profile: {}", e)))?;
        let work = tempfile::Builder::new()
            .prefix("xlsheet2csv-work-")
            .tempdir()?;

        tracing::debug!(
            "Acquired office session {} (profile {})",
            program.display(),
            profile.path().display()
        );

        Ok(Self {
            program,
            visible,
            profile,
            work,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn profile_dir(&self) -> &Path {
        self.profile.path()
    }

    /// Copies the workbook into the session, so the source is never opened
    /// for writing.
    pub fn stage_workbook(&self, workbook: &Path) -> Result<PathBuf> {
        let file_name = workbook.file_name().ok_or_else(|| ExportToolError::InvalidPath {
            path: workbook.display().to_string(),
        })?;
        let staged = self.work.path().join(file_name);
        fs::copy(workbook, &staged)?;
        Ok(staged)
    }

    /// Renders sheet `position` (1-based) of `staged` into `target`,
    /// replacing any existing file.
    pub fn export_sheet(&self, staged: &Path, position: usize, target: &Path) -> Result<()> {
        let target_dir = target.parent().ok_or_else(|| ExportToolError::InvalidPath {
            path: target.display().to_string(),
        })?;

        // staged next to the target so the final rename stays on one filesystem
        let outdir = tempfile::Builder::new()
            .prefix(".xlsheet2csv-")
            .tempdir_in(target_dir)?;

        let args = self.conversion_args(staged, position, outdir.path());
        tracing::debug!("Running {} {:?}", self.program.display(), args);

        let output = Command::new(&self.program).args(&args).output().map_err(|e| {
            unavailable(format!("cannot launch {}: {}", self.program.display(), e))
        })?;

        if !output.status.success() {
            return Err(ExportToolError::export(
                staged.display(),
                format!(
                    "office application exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let produced = find_csv(outdir.path())?.ok_or_else(|| {
            ExportToolError::export(
                staged.display(),
                format!(
                    "office application produced no CSV: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            )
        })?;

        if target.exists() {
            fs::remove_file(target)?;
        }
        fs::rename(&produced, target)?;

        Ok(())
    }

    pub fn conversion_args(&self, staged: &Path, position: usize, outdir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();

        if !self.visible {
            args.push("--headless".into());
        }

        for flag in ["--norestore", "--nolockcheck", "--nologo", "--nodefault"] {
            args.push(flag.into());
        }

        args.push(format!("-env:UserInstallation={}", file_url(self.profile.path())).into());
        args.push("--convert-to".into());
        args.push(format!("{},{}", CSV_FILTER, position).into());
        args.push("--outdir".into());
        args.push(outdir.as_os_str().to_os_string());
        args.push(staged.as_os_str().to_os_string());

        args
    }
}

impl Drop for OfficeSession {
    fn drop(&mut self) {
        tracing::debug!(
            "Released office session {} (profile {})",
            self.program.display(),
            self.profile.path().display()
        );
    }
}

fn unavailable(reason: String) -> ExportToolError {
    ExportToolError::BackendUnavailable {
        backend: BackendKind::Office.name().to_string(),
        reason,
    }
}

fn find_csv(dir: &Path) -> Result<Option<PathBuf>> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn find_office_program() -> Option<PathBuf> {
    let on_path = std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths).find_map(|dir| {
            PROGRAM_NAMES.iter().find_map(|name| {
                let candidate = dir.join(executable_name(name));
                candidate.is_file().then_some(candidate)
            })
        })
    });

    on_path.or_else(|| {
        default_install_locations()
            .into_iter()
            .find(|candidate| candidate.is_file())
    })
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

fn default_install_locations() -> Vec<PathBuf> {
    if cfg!(windows) {
        ["ProgramFiles", "ProgramFiles(x86)"]
            .iter()
            .filter_map(std::env::var_os)
            .map(|base| {
                PathBuf::from(base)
                    .join("LibreOffice")
                    .join("program")
                    .join("soffice.exe")
            })
            .collect()
    } else if cfg!(target_os = "macos") {
        vec![PathBuf::from(
            "/Applications/LibreOffice.app/Contents/MacOS/soffice",
        )]
    } else {
        vec![
            PathBuf::from("/usr/lib/libreoffice/program/soffice"),
            PathBuf::from("/opt/libreoffice/program/soffice"),
        ]
    }
}

/// `file://` URL for a local directory, as the application expects for
/// `-env:UserInstallation`.
fn file_url(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/").replace(' ', "%20");
    if path.starts_with('/') {
        format!("file://{}", path)
    } else {
        format!("file:///{}", path)
    }
}
