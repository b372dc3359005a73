use chrono::{Local, NaiveDateTime};
use indicatif::MultiProgress;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const JOB_LOG_FILE_NAME: &str = "export.log";

/// Where a job's log file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// `export.log` inside the job's output folder
    PerJob,
    /// `<root>/<folderName>.log`, one file per workbook
    Central(PathBuf),
}

impl LogTarget {
    pub fn from_root(root: Option<PathBuf>) -> Self {
        match root {
            Some(root) => LogTarget::Central(root),
            None => LogTarget::PerJob,
        }
    }

    pub fn log_path(&self, output_folder: &Path) -> PathBuf {
        match self {
            LogTarget::PerJob => output_folder.join(JOB_LOG_FILE_NAME),
            LogTarget::Central(root) => {
                let folder_name = output_folder
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "export".to_string());
                root.join(format!("{}.log", folder_name))
            }
        }
    }

    pub fn prepare(&self) -> std::io::Result<()> {
        if let LogTarget::Central(root) = self {
            fs::create_dir_all(root)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleEcho {
    Stdout,
    Stderr,
    Silent,
}

/// Per-job log: `[yyyy-MM-dd HH:mm:ss] message` lines echoed to the console
/// and appended to a file that is only created on the first write.
pub struct JobLog {
    path: Option<PathBuf>,
    file: Option<File>,
    file_failed: bool,
    console: ConsoleEcho,
    progress: Option<MultiProgress>,
}

impl JobLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            file: None,
            file_failed: false,
            console: ConsoleEcho::Stdout,
            progress: None,
        }
    }

    pub fn console_only() -> Self {
        Self::new(None)
    }

    pub fn with_console(mut self, console: ConsoleEcho) -> Self {
        self.console = console;
        self
    }

    /// Console lines are printed with the progress bars suspended.
    pub fn with_progress(mut self, progress: MultiProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info<S: AsRef<str>>(&mut self, message: S) {
        self.write_line(message.as_ref());
    }

    pub fn warn<S: AsRef<str>>(&mut self, message: S) {
        self.write_line(&format!("WARNING: {}", message.as_ref()));
    }

    pub fn error<S: AsRef<str>>(&mut self, message: S) {
        self.write_line(&format!("ERROR: {}", message.as_ref()));
    }

    pub fn format_line(at: &NaiveDateTime, message: &str) -> String {
        format!("[{}] {}", at.format("%Y-%m-%d %H:%M:%S"), message)
    }

    fn write_line(&mut self, message: &str) {
        let line = Self::format_line(&Local::now().naive_local(), message);

        self.echo(&line);

        if let Some(file) = self.open_file() {
            if let Err(e) = writeln!(file, "{}", line) {
                tracing::warn!("Failed to append to export log: {}", e);
                self.file_failed = true;
                self.file = None;
            }
        }
    }

    fn echo(&self, line: &str) {
        let print = || match self.console {
            ConsoleEcho::Stdout => println!("{}", line),
            ConsoleEcho::Stderr => eprintln!("{}", line),
            ConsoleEcho::Silent => {}
        };

        match self.progress {
            Some(ref progress) => progress.suspend(print),
            None => print(),
        }
    }

    fn open_file(&mut self) -> Option<&mut File> {
        if self.file.is_none() && !self.file_failed {
            let path = self.path.as_ref()?;

            let opened = path
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|_| OpenOptions::new().create(true).append(true).open(path));

            match opened {
                Ok(file) => self.file = Some(file),
                Err(e) => {
                    tracing::warn!("Cannot open export log {}: {}", path.display(), e);
                    self.file_failed = true;
                }
            }
        }

        self.file.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    #[test]
    fn test_line_format() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(14, 30, 7)
            .unwrap();
        assert_eq!(
            JobLog::format_line(&at, "Processing"),
            "[2024-01-05 14:30:07] Processing"
        );
    }

    #[test]
    fn test_file_created_lazily_with_parent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("nested").join("export.log");

        let mut log = JobLog::new(Some(path.clone())).with_console(ConsoleEcho::Silent);
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());

        log.info("first");
        log.warn("second");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] first"));
        assert!(lines[1].ends_with("] WARNING: second"));
    }

    #[test]
    fn test_appends_to_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("export.log");
        fs::write(&path, "previous run\n").unwrap();

        let mut log = JobLog::new(Some(path.clone())).with_console(ConsoleEcho::Silent);
        log.info("next run");

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("previous run\n"));
        assert!(content.contains("] next run"));
    }

    #[test]
    fn test_console_only_log_has_no_path() {
        let mut log = JobLog::console_only().with_console(ConsoleEcho::Silent);
        log.info("nothing written");
        assert!(log.path().is_none());
    }

    #[test]
    fn test_log_target_paths() {
        let folder = Path::new("/exports/book_05-01-2024_1430");

        assert_eq!(
            LogTarget::PerJob.log_path(folder),
            PathBuf::from("/exports/book_05-01-2024_1430/export.log")
        );
        assert_eq!(
            LogTarget::Central(PathBuf::from("/logs")).log_path(folder),
            PathBuf::from("/logs/book_05-01-2024_1430.log")
        );
        assert_eq!(LogTarget::from_root(None), LogTarget::PerJob);
    }

    #[test]
    fn test_central_target_prepare_creates_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("central");
        LogTarget::Central(root.clone()).prepare().unwrap();
        assert!(root.is_dir());
    }
}
