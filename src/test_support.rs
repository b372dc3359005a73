//! Fixture workbooks for unit tests.

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};
use std::path::Path;

pub enum Cell {
    Text(&'static str),
    Number(f64),
    Bool(bool),
    Date(u16, u8, u8),
}

pub fn write_workbook(path: &Path, sheets: &[(&str, Vec<Vec<Cell>>)]) {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).unwrap();

        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match cell {
                    Cell::Text(s) => {
                        worksheet.write_string(r, c, *s).unwrap();
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(r, c, *n).unwrap();
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(r, c, *b).unwrap();
                    }
                    Cell::Date(y, m, d) => {
                        let date = ExcelDateTime::from_ymd(*y, *m, *d).unwrap();
                        worksheet
                            .write_datetime_with_format(r, c, &date, &date_format)
                            .unwrap();
                    }
                }
            }
        }
    }

    workbook.save(path).unwrap();
}

/// Three plain sheets: `Sheet1`, `Sheet2`, `Summary`.
pub fn write_three_sheet_workbook(path: &Path) {
    write_workbook(
        path,
        &[
            ("Sheet1", vec![vec![Cell::Text("a")], vec![Cell::Number(1.0)]]),
            ("Sheet2", vec![vec![Cell::Text("b")], vec![Cell::Number(2.0)]]),
            ("Summary", vec![vec![Cell::Text("total")], vec![Cell::Number(3.0)]]),
        ],
    );
}
