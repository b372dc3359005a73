pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod scanner;
pub mod ui;

#[cfg(test)]
mod test_support;

// Public API re-exports
pub use backend::{Backend, BackendKind, LibraryBackend, OfficeBackend, OfficeSession};
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, ExportConfig, OfficeConfig, OutputConfig, SheetConfig};
pub use error::{ExportToolError, Result, UserFriendlyError};

// Core functionality re-exports
pub use export::{
    sanitize_name, CollisionPolicy, ConsoleEcho, DatePattern, ExportJob, ExportPlan,
    ExportResult, JobLog, LogTarget, OutputFolderNamer, PlannedJob,
};
pub use scanner::{filter_sheets, SheetFilter, SheetSelection, WorkbookFile, WorkbookScanner};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use chrono::Local;
use scanner::ScanStatistics;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Folder created next to the source when no destination is configured.
pub const DEFAULT_DESTINATION_DIR: &str = "csv-export";

/// Main library interface: exports every workbook under a source path.
pub struct XlSheet2Csv {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl XlSheet2Csv {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// No signal handler conflicts between tests.
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Self::new(
            config,
            cli_args.output_format.into(),
            cli_args.verbose,
            cli_args.quiet,
        )
    }

    /// Exports each discovered workbook in turn and returns one result per
    /// workbook, in discovery order. The first failing workbook aborts the run.
    pub fn run<P: AsRef<Path>>(&self, source: P) -> Result<Vec<ExportResult>> {
        let source = resolve_source(source.as_ref())?;
        let destination = self.destination_for(&source)?;

        fs::create_dir_all(&destination)?;
        tracing::debug!("Destination root: {}", destination.display());

        let workbooks = self.discover(&source)?;
        if workbooks.is_empty() {
            self.output_formatter
                .warning(&format!("No .xlsx files found under '{}'", source.display()));
            return Ok(Vec::new());
        }

        self.output_formatter
            .info(&ScanStatistics::from_workbooks(&workbooks).display_summary());

        let backend = Backend::from_config(&self.config);
        backend.check_available()?;

        let filter = SheetFilter::from_config(&self.config.sheets);
        let namer = OutputFolderNamer::new(
            destination,
            self.config.date_pattern()?,
            self.config.export.on_collision,
        );
        let log_target = self.log_target()?;
        log_target.prepare()?;

        self.output_formatter.start_operation(&format!(
            "Exporting {} workbook(s) with the {} backend",
            workbooks.len(),
            backend.kind()
        ));

        let total = workbooks.len();
        let progress = self.progress_manager.create_workbook_progress(total as u64);
        let mut results = Vec::with_capacity(total);

        for (i, workbook) in workbooks.iter().enumerate() {
            if let Err(e) = self.shutdown.check_shutdown() {
                ui::progress::abandon_progress(&progress, "cancelled");
                return Err(e);
            }

            progress.set_message(workbook.display_path());

            // one timestamp per job, shared by the folder name and the log
            let now = Local::now().naive_local();
            let output_folder = namer.create(&workbook.path, &now)?;
            let job = ExportJob {
                workbook: workbook.path.clone(),
                log_file: log_target.log_path(&output_folder),
                output_folder,
                index: i + 1,
                total,
            };

            let mut log = self.job_log(&job);
            log.info(format!(
                "{} Processing workbook '{}'",
                job.progress_label(),
                job.workbook.display()
            ));

            match backend.export(&job, &filter, &mut log) {
                Ok(result) => {
                    tracing::debug!(
                        "{} exported {} sheet(s)",
                        job.workbook.display(),
                        result.sheets_exported.len()
                    );
                    results.push(result);
                    progress.inc(1);
                }
                Err(e) => {
                    log.error(e.to_string());
                    ui::progress::abandon_progress(&progress, "failed");
                    return Err(e);
                }
            }
        }

        ui::progress::finish_progress(&progress, "done");
        self.progress_manager.clear();

        Ok(results)
    }

    /// The folders and logs `run` would use, without creating anything.
    pub fn plan<P: AsRef<Path>>(&self, source: P) -> Result<ExportPlan> {
        let source = resolve_source(source.as_ref())?;
        let destination = self.destination_for(&source)?;
        let workbooks = self.discover(&source)?;

        let namer = OutputFolderNamer::new(
            destination.clone(),
            self.config.date_pattern()?,
            self.config.export.on_collision,
        );
        let log_target = self.log_target()?;
        let now = Local::now().naive_local();
        let mut reserved = HashSet::new();

        let jobs = workbooks
            .iter()
            .map(|workbook| {
                let output_folder = namer.preview(&workbook.path, &now, &mut reserved);
                PlannedJob {
                    workbook_path: workbook.path.clone(),
                    log_file: log_target.log_path(&output_folder),
                    output_folder,
                }
            })
            .collect();

        Ok(ExportPlan {
            source,
            destination,
            backend: self.config.export.backend,
            jobs,
        })
    }

    /// Configured destination, else `csv-export` in the source folder (or
    /// next to a source file).
    pub fn destination_for(&self, source: &Path) -> Result<PathBuf> {
        if let Some(ref destination) = self.config.output.destination {
            return absolute_path(destination);
        }

        let base = if source.is_file() {
            source.parent().unwrap_or(source)
        } else {
            source
        };
        Ok(base.join(DEFAULT_DESTINATION_DIR))
    }

    fn log_target(&self) -> Result<LogTarget> {
        let root = match self.config.output.log_root {
            Some(ref root) => Some(absolute_path(root)?),
            None => None,
        };
        Ok(LogTarget::from_root(root))
    }

    /// Workbooks under `source`; entries the walk could not read are
    /// reported as warnings and left out.
    fn discover(&self, source: &Path) -> Result<Vec<WorkbookFile>> {
        let discovery = WorkbookScanner::from_config(&self.config.export).discover(source)?;
        for entry in &discovery.skipped {
            self.output_formatter
                .warning(&format!("Skipped unreadable entry while scanning: {}", entry));
        }
        Ok(discovery.workbooks)
    }

    fn job_log(&self, job: &ExportJob) -> JobLog {
        let echo = if self.output_formatter.is_quiet() {
            ConsoleEcho::Silent
        } else if self.output_formatter.mode() == OutputMode::Json {
            ConsoleEcho::Stderr
        } else {
            ConsoleEcho::Stdout
        };

        let log = JobLog::new(Some(job.log_file.clone())).with_console(echo);
        match self.progress_manager.multi_progress() {
            Some(progress) => log.with_progress(progress),
            None => log,
        }
    }

    pub fn generate_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        fs::write(path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &ExportToolError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn resolve_source(source: &Path) -> Result<PathBuf> {
    let source = absolute_path(source)?;
    if !source.exists() {
        return Err(ExportToolError::PathNotFound {
            path: source.display().to_string(),
        });
    }
    Ok(source)
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "xlsheet2csv {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_three_sheet_workbook, write_workbook, Cell};
    use tempfile::TempDir;

    fn exporter(config: Config) -> XlSheet2Csv {
        XlSheet2Csv::new_for_test(config, OutputMode::Plain, 0, true)
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_include_filter_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let workbook = temp_dir.path().join("Report 1.xlsx");
        write_three_sheet_workbook(&workbook);

        let mut config = Config::default();
        config.sheets.include = vec!["sheet1".to_string(), "summary".to_string()];

        let results = exporter(config).run(&workbook).unwrap();

        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.sheets_exported, vec!["Sheet1", "Summary"]);
        assert!(result
            .output_folder
            .starts_with(temp_dir.path().join(DEFAULT_DESTINATION_DIR)));

        let folder_name = result.output_folder.file_name().unwrap().to_string_lossy().into_owned();
        assert!(folder_name.starts_with("Report 1_"));
        assert_eq!(
            entries(&result.output_folder),
            vec!["Sheet1.csv", "Summary.csv", "export.log"]
        );

        let log = fs::read_to_string(&result.log_file).unwrap();
        assert!(log.contains("[1/1] Processing workbook"));
        assert!(log.contains("Skipping sheet 'Sheet2' (not in include list)."));
    }

    #[test]
    fn test_missing_source_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        let result = exporter(Config::default()).run(&missing);

        assert!(matches!(result, Err(ExportToolError::PathNotFound { .. })));
        assert!(entries(temp_dir.path()).is_empty());
    }

    #[test]
    fn test_empty_folder_creates_only_destination() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "not a workbook").unwrap();

        let results = exporter(Config::default()).run(temp_dir.path()).unwrap();

        assert!(results.is_empty());
        assert_eq!(entries(temp_dir.path()), vec!["csv-export", "notes.txt"]);
        assert!(entries(&temp_dir.path().join("csv-export")).is_empty());
    }

    #[test]
    fn test_central_log_root() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("in");
        fs::create_dir(&source).unwrap();
        write_three_sheet_workbook(&source.join("book.xlsx"));

        let mut config = Config::default();
        config.output.destination = Some(temp_dir.path().join("out"));
        config.output.log_root = Some(temp_dir.path().join("logs"));

        let results = exporter(config).run(&source).unwrap();
        let result = &results[0];

        let folder_name = result.output_folder.file_name().unwrap().to_string_lossy().into_owned();
        assert_eq!(
            result.log_file,
            temp_dir.path().join("logs").join(format!("{}.log", folder_name))
        );
        assert!(result.log_file.exists());
        assert!(!result.output_folder.join("export.log").exists());
        assert_eq!(result.csv_files.len(), 3);
    }

    #[test]
    fn test_same_name_workbooks_get_separate_folders() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("in");
        fs::create_dir_all(source.join("a")).unwrap();
        fs::create_dir_all(source.join("b")).unwrap();
        write_three_sheet_workbook(&source.join("a").join("book.xlsx"));
        write_three_sheet_workbook(&source.join("b").join("book.xlsx"));

        let mut config = Config::default();
        config.export.recurse = true;
        config.export.date_format = "yyyyMMdd".to_string();
        config.output.destination = Some(temp_dir.path().join("out"));

        let results = exporter(config).run(&source).unwrap();

        assert_eq!(results.len(), 2);
        assert_ne!(results[0].output_folder, results[1].output_folder);
        let second = results[1].output_folder.file_name().unwrap().to_string_lossy().into_owned();
        assert!(second.ends_with("_2"));
    }

    #[test]
    fn test_reuse_policy_shares_folder() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("in");
        fs::create_dir_all(source.join("a")).unwrap();
        fs::create_dir_all(source.join("b")).unwrap();
        write_workbook(
            &source.join("a").join("book.xlsx"),
            &[("First", vec![vec![Cell::Text("x")]])],
        );
        write_workbook(
            &source.join("b").join("book.xlsx"),
            &[("Second", vec![vec![Cell::Text("y")]])],
        );

        let mut config = Config::default();
        config.export.recurse = true;
        config.export.date_format = "yyyyMMdd".to_string();
        config.export.on_collision = CollisionPolicy::Reuse;
        config.output.destination = Some(temp_dir.path().join("out"));

        let results = exporter(config).run(&source).unwrap();

        assert_eq!(results[0].output_folder, results[1].output_folder);
        assert_eq!(
            entries(&results[0].output_folder),
            vec!["First.csv", "Second.csv", "export.log"]
        );
    }

    #[test]
    fn test_unavailable_office_creates_no_job_folder() {
        let temp_dir = TempDir::new().unwrap();
        let workbook = temp_dir.path().join("book.xlsx");
        write_three_sheet_workbook(&workbook);

        let mut config = Config::default();
        config.export.backend = BackendKind::Office;
        config.office.program = Some(temp_dir.path().join("no-soffice"));

        let result = exporter(config).run(&workbook);

        assert!(matches!(
            result,
            Err(ExportToolError::BackendUnavailable { .. })
        ));
        assert!(entries(&temp_dir.path().join(DEFAULT_DESTINATION_DIR)).is_empty());
    }

    #[test]
    fn test_cancelled_before_first_workbook() {
        let temp_dir = TempDir::new().unwrap();
        write_three_sheet_workbook(&temp_dir.path().join("book.xlsx"));

        let exporter = exporter(Config::default());
        exporter.request_shutdown();

        let result = exporter.run(temp_dir.path());
        assert!(matches!(result, Err(ExportToolError::Cancelled)));
        assert!(!exporter.is_running());
    }

    #[test]
    fn test_plan_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        write_three_sheet_workbook(&temp_dir.path().join("a.xlsx"));
        write_three_sheet_workbook(&temp_dir.path().join("b.xlsx"));

        let plan = exporter(Config::default()).plan(temp_dir.path()).unwrap();

        assert_eq!(plan.jobs.len(), 2);
        assert_eq!(plan.backend, BackendKind::Library);
        assert_eq!(plan.destination, temp_dir.path().join(DEFAULT_DESTINATION_DIR));
        assert_eq!(plan.jobs[0].log_file, plan.jobs[0].output_folder.join("export.log"));
        assert!(!plan.destination.exists());
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        XlSheet2Csv::generate_sample_config(&config_path).unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[export]"));
        assert!(content.contains("[sheets]"));
    }

    #[test]
    fn test_build_info_display() {
        let build_info = build_info();
        assert!(!version_info().is_empty());
        assert!(build_info.to_string().contains("xlsheet2csv"));
        assert!(build_info.to_string().contains(build_info.version));
    }
}
