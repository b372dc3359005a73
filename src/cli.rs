use crate::backend::BackendKind;
use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::export::CollisionPolicy;
use crate::ui::OutputMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "xlsheet2csv")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Export every worksheet of .xlsx workbooks to CSV files")]
#[command(
    long_about = "xlsheet2csv takes a workbook or a folder of workbooks and writes each \
                  selected worksheet to its own CSV file, in a timestamped folder per workbook."
)]
#[command(after_help = "EXAMPLES:\n  \
    xlsheet2csv report.xlsx\n  \
    xlsheet2csv ./reports --recurse -o ./csv\n  \
    xlsheet2csv ./reports --include Summary Totals --exclude Scratch\n  \
    xlsheet2csv report.xlsx --backend office --date-format yyyyMMdd\n  \
    xlsheet2csv ./reports --log-root ./logs --output-format json")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Workbook file or folder containing workbooks
    #[arg(required_unless_present = "generate_config")]
    pub source_path: Option<PathBuf>,

    /// Destination root (defaults to csv-export next to the source)
    #[arg(short, long = "output-root")]
    pub output_root: Option<PathBuf>,

    /// Conversion backend
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Also look for workbooks in subfolders
    #[arg(short, long)]
    pub recurse: bool,

    /// Timestamp pattern for folder names (e.g. dd-MM-yyyy_HHmm or %Y%m%d)
    #[arg(long)]
    pub date_format: Option<String>,

    /// Only export these sheets (space-separated or repeated, case-insensitive)
    #[arg(short, long, num_args = 1.., action = clap::ArgAction::Append)]
    pub include: Option<Vec<String>>,

    /// Never export these sheets (space-separated or repeated, case-insensitive)
    #[arg(short, long, num_args = 1.., action = clap::ArgAction::Append)]
    pub exclude: Option<Vec<String>>,

    /// Let the office application show its window
    #[arg(long)]
    pub visible: bool,

    /// Write one log per workbook into this folder instead of the export folder
    #[arg(long)]
    pub log_root: Option<PathBuf>,

    /// What to do when an export folder already exists
    #[arg(long, value_enum)]
    pub on_collision: Option<CollisionPolicy>,

    /// Path to the soffice executable
    #[arg(long, env = "XLSHEET2CSV_OFFICE_PROGRAM")]
    pub office_program: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show the folders and logs that would be created, without exporting
    #[arg(long)]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<OutputFormat> for OutputMode {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_backend(self.backend)
            .with_recurse(self.recurse)
            .with_date_format(self.date_format.clone())
            .with_on_collision(self.on_collision)
            .with_include(self.include.clone())
            .with_exclude(self.exclude.clone())
            .with_destination(self.output_root.clone())
            .with_log_root(self.log_root.clone())
            .with_office_program(self.office_program.clone())
            .with_visible(self.visible)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "xlsheet2csv",
            "reports",
            "-o",
            "out",
            "--backend",
            "office",
            "--recurse",
            "--include",
            "Sheet1",
            "Summary",
            "--exclude",
            "Scratch",
            "--on-collision",
            "reuse",
            "--date-format",
            "yyyyMMdd",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.source_path, Some(PathBuf::from("reports")));
        assert_eq!(cli.output_root, Some(PathBuf::from("out")));
        assert_eq!(cli.backend, Some(BackendKind::Office));
        assert!(cli.recurse);
        assert_eq!(
            cli.include,
            Some(vec!["Sheet1".to_string(), "Summary".to_string()])
        );
        assert_eq!(cli.exclude, Some(vec!["Scratch".to_string()]));
        assert_eq!(cli.on_collision, Some(CollisionPolicy::Reuse));
        assert_eq!(cli.verbosity_level(), 2);
    }

    #[test]
    fn test_sheet_names_keep_commas() {
        let cli = Cli::try_parse_from(["xlsheet2csv", "book.xlsx", "--include", "Sales, 2024"])
            .unwrap();
        assert_eq!(cli.include, Some(vec!["Sales, 2024".to_string()]));

        let cli = Cli::try_parse_from([
            "xlsheet2csv",
            "book.xlsx",
            "--exclude",
            "A,B",
            "--exclude",
            "Scratch",
        ])
        .unwrap();
        assert_eq!(
            cli.exclude,
            Some(vec!["A,B".to_string(), "Scratch".to_string()])
        );
    }

    #[test]
    fn test_source_required_unless_generating_config() {
        assert!(Cli::try_parse_from(["xlsheet2csv", "--dry-run"]).is_err());

        let cli = Cli::try_parse_from(["xlsheet2csv", "--generate-config"]).unwrap();
        assert!(cli.generate_config);
        assert!(cli.source_path.is_none());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["xlsheet2csv", "book.xlsx", "-q", "-v"]).is_err());

        let cli = Cli::try_parse_from(["xlsheet2csv", "book.xlsx", "-q"]).unwrap();
        assert_eq!(cli.verbosity_level(), 0);
    }

    #[test]
    fn test_overrides_reach_config() {
        let cli = Cli::try_parse_from([
            "xlsheet2csv",
            "book.xlsx",
            "--include",
            "Summary",
            "--log-root",
            "logs",
            "--visible",
        ])
        .unwrap();

        let mut config = Config::default();
        config.merge_with_cli_args(&cli.create_cli_overrides());

        assert_eq!(config.sheets.include, vec!["Summary"]);
        assert_eq!(config.output.log_root, Some(PathBuf::from("logs")));
        assert!(config.office.visible);
        assert_eq!(config.export.backend, BackendKind::Library);
    }

    #[test]
    fn test_invalid_date_format_rejected_on_load() {
        let cli = Cli::try_parse_from(["xlsheet2csv", "book.xlsx", "--date-format", "%Q"]).unwrap();
        assert!(cli.load_config().is_err());
    }
}
