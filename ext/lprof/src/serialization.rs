pub mod text;
pub mod tree;

use std::io::{self, Write};

use crate::frame::FrameRecord;
use crate::session::configuration::TraceFormat;

/// Writes one completed tree (records in pop order) in the given format.
pub fn write_tree<W: Write>(writer: &mut W, format: TraceFormat, records: &[FrameRecord]) -> io::Result<()> {
    match format {
        TraceFormat::Text => text::write_records(writer, records),
        TraceFormat::Json => tree::TraceTree::from_records(records).write_json_line(writer),
    }
}
