//! Thin readers for the two HOPE inputs. Both are plain first-worksheet
//! reads; the split exists so callers say which file they mean.

use std::path::Path;

use crate::sheet::{read_rows, Row, SheetError};

/// The bank's product report (`RelatorioProdutos.xlsx`).
pub fn read_bank_report(path: &Path) -> Result<Vec<Row>, SheetError> {
    read_rows(path)
}

/// The internal commissioning table, all columns preserved.
pub fn read_internal_table(path: &Path) -> Result<Vec<Row>, SheetError> {
    read_rows(path)
}
