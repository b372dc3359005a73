use crate::error::{ExportToolError, UserFriendlyError};
use crate::export::{ExportPlan, ExportResult};
use console::{style, Emoji, Term};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

static CHECKMARK: Emoji = Emoji("✅ ", "+ ");
static CROSS: Emoji = Emoji("❌ ", "x ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

/// Console messages and end-of-run reports.
///
/// In JSON mode every status message is a JSON line on stderr, so stdout
/// carries nothing but the final report or plan document.
pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn success(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    /// Shown at the default verbosity; only `--quiet` hides it.
    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn debug(&self, message: &str) {
        if self.should_show_message(2) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("  {}", style(message).dim());
                    } else {
                        println!("  DEBUG: {}", message);
                    }
                }
                OutputMode::Json => self.print_json_message("debug", message),
                OutputMode::Plain => println!("DEBUG: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &ExportToolError) {
        self.error(&error.user_message());

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        eprintln!("{}{}", INFO, style(format!("Suggestion: {}", suggestion)).cyan());
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => eprintln!("SUGGESTION: {}", suggestion),
            }
        }
    }

    /// End-of-run report. JSON output is printed even in quiet mode.
    pub fn print_export_report(&self, results: &[ExportResult], elapsed: Duration) {
        match self.mode {
            OutputMode::Json => {
                let report = serde_json::json!({
                    "type": "report",
                    "workbooks": results.len(),
                    "csv_files": csv_file_count(results),
                    "duration_ms": elapsed.as_millis() as u64,
                    "results": results,
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
                );
            }
            _ if self.quiet => {}
            OutputMode::Human => self.print_human_report(results, elapsed),
            OutputMode::Plain => self.print_plain_report(results, elapsed),
        }
    }

    pub fn print_plan(&self, plan: &ExportPlan) {
        match self.mode {
            OutputMode::Json => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(plan).unwrap_or_else(|_| "{}".to_string())
                );
            }
            OutputMode::Human | OutputMode::Plain => {
                self.print_header("Export Plan");
                println!("Source:      {}", plan.source.display());
                println!("Destination: {}", plan.destination.display());
                println!("Backend:     {}", plan.backend);
                self.print_separator();

                if plan.jobs.is_empty() {
                    println!("No workbooks to export.");
                }
                for (i, job) in plan.jobs.iter().enumerate() {
                    println!("[{}/{}] {}", i + 1, plan.jobs.len(), job.workbook_path.display());
                    println!("      folder: {}", job.output_folder.display());
                    println!("      log:    {}", job.log_file.display());
                }
                self.print_separator();
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => println!("=== {} ===", title),
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => println!("{}", "-".repeat(60)),
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        if self.use_colors {
            let styled = match msg_type {
                MessageType::Success => style(message).green().bold(),
                MessageType::Error => style(message).red().bold(),
                MessageType::Warning => style(message).yellow().bold(),
                MessageType::Info => style(message).cyan(),
            };
            let emoji = match msg_type {
                MessageType::Success => CHECKMARK,
                MessageType::Error => CROSS,
                MessageType::Warning => WARNING,
                MessageType::Info => INFO,
            };

            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, styled),
                _ => println!("{}{}", emoji, styled),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "+",
                MessageType::Error => "x",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        eprintln!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_human_report(&self, results: &[ExportResult], elapsed: Duration) {
        self.print_header("Export Report");

        for result in results {
            println!(
                "{} -> {} ({} sheet(s))",
                result.workbook_path.display(),
                result.output_folder.display(),
                result.sheets_exported.len()
            );
            if self.verbose_level >= 1 {
                for csv in &result.csv_files {
                    println!("    {}", csv.display());
                }
            }
        }

        self.print_separator();
        let summary = format!(
            "Exported {} sheet(s) from {} workbook(s) in {}",
            csv_file_count(results),
            results.len(),
            format_duration(elapsed)
        );
        if self.use_colors {
            println!("{}{}", CHECKMARK, style(summary).green().bold());
        } else {
            println!("+ {}", summary);
        }
    }

    fn print_plain_report(&self, results: &[ExportResult], elapsed: Duration) {
        println!("REPORT: Export completed");
        println!("Workbooks: {}", results.len());
        println!("CSV files: {}", csv_file_count(results));
        println!("Duration: {}", format_duration(elapsed));
        for result in results {
            for csv in &result.csv_files {
                println!("CSV: {}", csv.display());
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

fn csv_file_count(results: &[ExportResult]) -> usize {
    results.iter().map(|r| r.csv_files.len()).sum()
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendKind;
    use std::path::PathBuf;

    #[test]
    fn test_output_mode_parsing() {
        assert_eq!(OutputMode::from_string("human"), OutputMode::Human);
        assert_eq!(OutputMode::from_string("JSON"), OutputMode::Json);
        assert_eq!(OutputMode::from_string("plain"), OutputMode::Plain);
        assert_eq!(OutputMode::from_string("invalid"), OutputMode::Human);
    }

    #[test]
    fn test_quiet_mode() {
        let formatter = OutputFormatter::new(OutputMode::Human, 2, true);
        assert_eq!(formatter.verbose_level, 0);
        assert!(formatter.is_quiet());
    }

    #[test]
    fn test_warnings_visible_by_default() {
        let formatter = OutputFormatter::new(OutputMode::Plain, 0, false);
        assert!(formatter.should_show_message(0));
        assert!(!formatter.should_show_message(1));

        let quiet_formatter = OutputFormatter::new(OutputMode::Plain, 0, true);
        assert!(!quiet_formatter.should_show_message(0));
    }

    #[test]
    fn test_csv_file_count() {
        let result = ExportResult {
            backend: BackendKind::Library,
            workbook_path: PathBuf::from("a.xlsx"),
            output_folder: PathBuf::from("out/a_x"),
            sheets_exported: vec!["S1".to_string(), "S2".to_string()],
            csv_files: vec![PathBuf::from("out/a_x/S1.csv"), PathBuf::from("out/a_x/S2.csv")],
            log_file: PathBuf::from("out/a_x/export.log"),
        };
        assert_eq!(csv_file_count(&[result.clone(), result]), 4);
        assert_eq!(csv_file_count(&[]), 0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
    }
}
