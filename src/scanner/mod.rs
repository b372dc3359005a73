pub mod sheet_filter;
pub mod workbook_scanner;

pub use sheet_filter::{filter_sheets, SheetFilter, SheetSelection, SkipReason};
pub use workbook_scanner::{Discovery, ScanStatistics, WorkbookFile, WorkbookScanner};
