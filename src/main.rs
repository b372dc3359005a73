use clap::Parser;
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use xlsheet2csv::{
    Cli, ExportToolError, OutputFormatter, OutputMode, UserFriendlyError, XlSheet2Csv,
};

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(cli.verbosity_level());

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let exporter = match XlSheet2Csv::from_cli(&cli) {
        Ok(exporter) => exporter,
        Err(e) => {
            print_startup_error(&cli, &e);
            return exit_code_for(&e);
        }
    };

    // clap guarantees a source unless --generate-config was given
    let Some(ref source) = cli.source_path else {
        return 2;
    };

    if cli.dry_run {
        return handle_dry_run(source, &exporter);
    }

    let started = Instant::now();
    match exporter.run(source) {
        Ok(results) => {
            exporter
                .output_formatter()
                .print_export_report(&results, started.elapsed());
            0
        }
        Err(e) => {
            exporter.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &ExportToolError) -> i32 {
    match error {
        ExportToolError::Cancelled => 130,
        ExportToolError::Config { .. } => 2,
        ExportToolError::PathNotFound { .. } => 3,
        ExportToolError::BackendUnavailable { .. } => 4,
        ExportToolError::Export { .. } | ExportToolError::Csv(_) => 5,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "xlsheet2csv.toml".to_string());

    match XlSheet2Csv::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  xlsheet2csv <source> --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(source: &std::path::Path, exporter: &XlSheet2Csv) -> i32 {
    let formatter = exporter.output_formatter();
    formatter.info("DRY RUN MODE - No folders or files will be created");

    match exporter.plan(source) {
        Ok(plan) => {
            formatter.print_plan(&plan);
            formatter.success("Dry run completed successfully");
            0
        }
        Err(e) => {
            exporter.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn print_startup_error(cli: &Cli, error: &ExportToolError) {
    let formatter = OutputFormatter::new(OutputMode::from(cli.output_format), 0, false);
    formatter.print_user_friendly_error(error);
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `-v`.
fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("xlsheet2csv={}", level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
