//! Bulk export of the message log.
//!
//! [`ExhaustiveExporter`] drains a filtered result set page by page;
//! [`ExportFormat`] turns the buffer into JSON or CSV.

pub mod exporter;
pub mod format;

pub use exporter::{
    DEFAULT_EXPORT_STEP, Drained, ExhaustiveExporter, ExportConfig, ExportOutput, ExportProgress,
};
pub use format::{ExportFormat, to_csv, to_json};
