//! Table exporter
//!
//! Snapshots every user table of the base store into one escaped flat file
//! per table and delivers it to an object sink:
//!
//! ```text
//! list_exportable_tables ─► per table (bounded, isolated):
//!                             write_table (read-only conn, blocking pool)
//!                               └─► BodyWriter ══ channel ══► ObjectBody
//!                                     └─► ObjectSink::put("<table>.csv")
//!                           ─► ExportReport { succeeded, failed }
//! ```

pub mod body;
pub mod discovery;
pub mod escape;
pub mod extract;
pub mod pipeline;
pub mod sink;

pub use body::{object_body, BodyWriter, ObjectBody};
pub use discovery::{list_exportable_tables, RESERVED_TABLE_PREFIX};
pub use escape::{
    escape_field, escape_row, split_line, unescape_field, unescape_nullable_field, UnescapeError,
    NULL_MARKER,
};
pub use extract::{write_table, ExtractError};
pub use pipeline::{
    object_name, run_export, ExportError, ExportReport, TableExport, TableExportError,
    TableFailure,
};
pub use sink::{sink_for_destination, HttpSink, LocalDirSink, ObjectSink, SinkError};
