//! Writes the HOPE delta spreadsheet with the full column set in order.

use std::path::Path;

use crate::hope::rules::OUTPUT_COLUMNS;
use crate::sheet::{write_rows, Row, SheetError};

pub fn write_delta(rows: &[Row], path: &Path) -> Result<(), SheetError> {
    write_rows(path, &OUTPUT_COLUMNS, rows)
}
