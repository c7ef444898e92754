//! Spreadsheet I/O: `.xlsx` in, `.xlsx` out.
//!
//! Reading stringifies every cell (the adapters work on text, exactly as the
//! exports are meant to be read); writing takes a fixed column order and
//! highlights rows whose standardization needs human review.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Color, Format, Workbook};

/// One spreadsheet row, column name → cell text.
pub type Row = HashMap<String, String>;

/// Marker key carried on output rows, never written as a column. Rows whose
/// marker is `IA` or `MANUAL` get the review highlight.
pub const ORIGIN_MARKER: &str = "__origem_padronizacao";

/// Excel's classic "bad" light red.
const HIGHLIGHT_RGB: u32 = 0xFFC7CE;

#[derive(Debug, thiserror::Error)]
pub enum SheetError {
    #[error("spreadsheet read at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    #[error("spreadsheet {path} has no worksheets")]
    NoWorksheet { path: PathBuf },
    #[error("spreadsheet write at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },
    #[error("spreadsheet I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read the first worksheet into rows keyed by the header line.
/// Fully empty rows are skipped; missing cells read as `""`.
pub fn read_rows(path: &Path) -> Result<Vec<Row>, SheetError> {
    let read_err = |source| SheetError::Read { path: path.to_path_buf(), source };

    let mut workbook = open_workbook_auto(path).map_err(read_err)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| SheetError::NoWorksheet { path: path.to_path_buf() })?
        .map_err(read_err)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header.iter().map(format_cell).collect();

    let mut out = Vec::new();
    for cells in rows {
        let mut row = Row::new();
        let mut any = false;
        for (name, cell) in headers.iter().zip(cells) {
            let value = format_cell(cell);
            if !value.is_empty() {
                any = true;
            }
            if !name.is_empty() {
                row.insert(name.clone(), value);
            }
        }
        if any {
            out.push(row);
        }
    }
    Ok(out)
}

/// Write rows with the given column order. Unknown row keys (the origin
/// marker included) are not written; missing columns come out empty.
pub fn write_rows(path: &Path, columns: &[&str], rows: &[Row]) -> Result<(), SheetError> {
    let write_err = |source| SheetError::Write { path: path.to_path_buf(), source };

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let highlight = Format::new().set_background_color(Color::RGB(HIGHLIGHT_RGB));

    for (c, name) in columns.iter().enumerate() {
        sheet.write_string(0, c as u16, *name).map_err(write_err)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let flagged = matches!(
            row.get(ORIGIN_MARKER).map(String::as_str),
            Some("IA") | Some("MANUAL")
        );
        for (c, name) in columns.iter().enumerate() {
            let value = row.get(*name).map(String::as_str).unwrap_or("");
            let (r, c) = ((r + 1) as u32, c as u16);
            if flagged {
                sheet.write_string_with_format(r, c, value, &highlight).map_err(write_err)?;
            } else {
                sheet.write_string(r, c, value).map_err(write_err)?;
            }
        }
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|source| SheetError::Io { path: path.to_path_buf(), source })?;
        }
    }
    workbook.save(path).map_err(write_err)
}

fn format_cell(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            // exports carry ids as floats; "2360.0" must read back as "2360"
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => if *b { "VERDADEIRO" } else { "FALSO" }.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn write_then_read_round_trips_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let columns = ["A", "B", "C"];
        write_rows(
            &path,
            &columns,
            &[
                row(&[("A", "1"), ("B", "x"), ("C", "")]),
                row(&[("A", "2"), ("B", "y"), (ORIGIN_MARKER, "IA")]),
            ],
        )
        .unwrap();

        let rows = read_rows(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["A"], "1");
        assert_eq!(rows[0]["B"], "x");
        assert_eq!(rows[0]["C"], "");
        assert_eq!(rows[1]["A"], "2");
        // the marker is carried in memory only, never written
        assert!(!rows[1].contains_key(ORIGIN_MARKER));
    }

    #[test]
    fn missing_columns_write_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_rows(&path, &["A", "B"], &[row(&[("A", "only")])]).unwrap();
        let rows = read_rows(&path).unwrap();
        assert_eq!(rows[0]["A"], "only");
        assert_eq!(rows[0]["B"], "");
    }

    #[test]
    fn empty_sheet_reads_as_no_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        write_rows(&path, &["A"], &[]).unwrap();
        assert!(read_rows(&path).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_rows(&dir.path().join("absent.xlsx")).is_err());
    }
}
