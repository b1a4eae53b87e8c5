//! Spreadsheet export.

use std::path::Path;

use billplumber_core::{RecordSet, Value};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

/// Number format for timestamp cells.
pub const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Failure writing a spreadsheet or report.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("spreadsheet error: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lay out `record_set` on a single worksheet: a bold header row, then one
/// row per record.
fn build_workbook(record_set: &RecordSet) -> Result<Workbook, ExportError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

    let sheet = workbook.add_worksheet();
    sheet.set_name("账单")?;

    for (col, field) in record_set.fields().iter().enumerate() {
        let col = u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)?;
        sheet.write_string_with_format(0, col, field.name.clone().unwrap_or_default(), &header_format)?;
    }

    for (row_index, row) in record_set.rows().iter().enumerate() {
        let xl_row = u32::try_from(row_index + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, value) in row.iter().enumerate() {
            let col = u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)?;
            match value {
                Value::Null => {}
                Value::Text(text) => {
                    sheet.write_string(xl_row, col, text)?;
                }
                Value::Timestamp(ts) => {
                    sheet.write_datetime_with_format(xl_row, col, ts, &datetime_format)?;
                }
                Value::Amount(amount) => {
                    sheet.write_number(xl_row, col, *amount)?;
                }
            }
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    sheet.autofit();
    Ok(workbook)
}

/// Write `record_set` to an `.xlsx` file at `path`.
///
/// # Errors
///
/// Returns [`ExportError`] if the workbook cannot be built or saved.
pub fn write_xlsx(record_set: &RecordSet, path: impl AsRef<Path>) -> Result<(), ExportError> {
    let mut workbook = build_workbook(record_set)?;
    workbook.save(path.as_ref())?;
    Ok(())
}

/// The `.xlsx` file contents for `record_set`.
///
/// # Errors
///
/// Returns [`ExportError`] if the workbook cannot be built.
pub fn xlsx_bytes(record_set: &RecordSet) -> Result<Vec<u8>, ExportError> {
    let mut workbook = build_workbook(record_set)?;
    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use billplumber_core::Field;
    use chrono::NaiveDate;

    fn sample() -> RecordSet {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        RecordSet::new(
            vec![
                Field::new(Some("交易时间".into())),
                Field::new(Some("金额(元)".into())),
                Field::new(None),
            ],
            vec![
                vec![Value::Timestamp(ts), Value::Amount(9.9), Value::Text("x".into())],
                vec![Value::Null, Value::Amount(0.0), Value::Null],
            ],
        )
    }

    #[test]
    fn xlsx_is_a_zip_container() {
        let bytes = xlsx_bytes(&sample()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn write_xlsx_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bill.xlsx");
        write_xlsx(&sample(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.len() > 100);
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_record_set_still_exports_header() {
        let rs = RecordSet::new(vec![Field::new(Some("交易时间".into()))], Vec::new());
        assert!(xlsx_bytes(&rs).is_ok());
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("bill.xlsx");
        assert!(write_xlsx(&sample(), &path).is_err());
    }
}
