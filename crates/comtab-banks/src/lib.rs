//! Institution adapters and the commissioning update pipeline.
//!
//! `sheet` does the `.xlsx` I/O, `hope` maps the HOPE report/table pair into
//! canonical items and back into delta rows, and `pipeline` runs the whole
//! update: read both files, seed the dictionary from the internal table,
//! standardize the bank side, diff, and write the delta spreadsheet.

pub mod hope;
pub mod pipeline;
pub mod sheet;

pub use pipeline::{
    is_supported, run_update, supported_institutions, ActionCounts, CacheStats, PipelineError,
    UpdateJob, UpdateReport,
};
pub use sheet::{Row, SheetError, ORIGIN_MARKER};
