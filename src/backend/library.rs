//! In-process backend: calamine reads the workbook, the csv crate writes it.

use super::{csv_path_for, log_selection, warn_on_overwrite, BackendKind};
use crate::error::{ExportToolError, Result};
use crate::export::{ExportJob, ExportResult, JobLog};
use crate::scanner::SheetFilter;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct LibraryBackend;

impl LibraryBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn export(
        &self,
        job: &ExportJob,
        filter: &SheetFilter,
        log: &mut JobLog,
    ) -> Result<ExportResult> {
        log.info(format!("Starting workbook: {}", job.workbook.display()));

        let mut workbook: Xlsx<_> = open_workbook(&job.workbook).map_err(|e| {
            ExportToolError::export(job.workbook.display(), format!("cannot open workbook: {}", e))
        })?;

        let all_names = workbook.sheet_names().to_vec();
        log.info(format!("Workbook has {} sheet(s).", all_names.len()));

        let selection = filter.select(&all_names);
        log_selection(log, &selection);

        let mut result = ExportResult::new(BackendKind::Library, job);
        let total = selection.selected.len();

        for (i, name) in selection.selected.iter().enumerate() {
            let range = workbook.worksheet_range(name).map_err(|e| {
                ExportToolError::export(
                    job.workbook.display(),
                    format!("cannot read sheet '{}': {}", name, e),
                )
            })?;

            let table = SheetTable::from_range(&range);
            let csv_path = csv_path_for(&job.output_folder, name);
            warn_on_overwrite(log, &result, name, &csv_path);

            log.info(format!(
                "[{}/{}] Exporting sheet '{}' to '{}' (rows={}, cols={}).",
                i + 1,
                total,
                name,
                csv_path.display(),
                table.row_count(),
                table.column_count()
            ));

            table.write_csv(&csv_path)?;
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

/// A sheet's used range as text: the first row becomes the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn from_range(range: &Range<Data>) -> Self {
        let mut rows = range.rows();

        let Some(first) = rows.next() else {
            return Self::default();
        };

        let header = header_labels(first);
        let width = header.len();

        let rows = rows
            .map(|row| {
                let mut cells: Vec<String> = row.iter().map(render_cell).collect();
                cells.resize(width, String::new());
                cells
            })
            .collect();

        Self { header, rows }
    }

    /// Data rows, not counting the header.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if self.header.is_empty() {
            File::create(path)?;
            return Ok(());
        }

        let mut writer = csv::WriterBuilder::new().from_path(path)?;
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        Ok(())
    }
}

/// Blank labels become `Unnamed: <i>`; repeated labels get `.1`, `.2`, ...
fn header_labels(row: &[Data]) -> Vec<String> {
    let mut used = HashSet::new();

    row.iter()
        .enumerate()
        .map(|(i, cell)| {
            let label = render_cell(cell);
            let label = if label.trim().is_empty() {
                format!("Unnamed: {}", i)
            } else {
                label
            };

            let mut candidate = label.clone();
            let mut n = 1;
            while used.contains(&candidate) {
                candidate = format!("{}.{}", label, n);
                n += 1;
            }
            used.insert(candidate.clone());
            candidate
        })
        .collect()
}

pub fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => format_datetime(&value),
            None => format_float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn format_datetime(value: &NaiveDateTime) -> String {
    if value.time() == chrono::NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}
