use std::borrow::Cow;
use std::io::{self, Write};

use crate::frame::FrameRecord;

pub const HEADER: &str =
    "stack_level|file_defined|function_name|line_defined|current_line|call_kind|local_time|total_time";

/// `|` and newlines delimit fields and records.
pub fn sanitize(field: &str) -> Cow<'_, str> {
    if field.contains(['|', '\n']) {
        Cow::Owned(field.replace(['|', '\n'], " "))
    } else {
        Cow::Borrowed(field)
    }
}

pub fn format_record(record: &FrameRecord) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}|{:.6}|{:.6}",
        record.depth,
        sanitize(record.source.as_deref().unwrap_or("")),
        sanitize(&record.name),
        record.line_defined,
        record.current_line,
        record.kind.as_str(),
        record.elapsed_secs(),
        record.total_secs(),
    )
}

pub fn write_header<W: Write>(writer: &mut W) -> io::Result<()> {
    writeln!(writer, "{}", HEADER)
}

pub fn write_records<W: Write>(writer: &mut W, records: &[FrameRecord]) -> io::Result<()> {
    for record in records {
        writeln!(writer, "{}", format_record(record))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CallKind;
    use std::time::Duration;

    fn record(name: &str, source: Option<&str>, depth: i32) -> FrameRecord {
        FrameRecord {
            name: name.to_owned(),
            source: source.map(str::to_owned),
            native_function: None,
            line_defined: 3,
            current_line: 7,
            kind: CallKind::Script,
            depth,
            elapsed: Duration::from_micros(1500),
            total: Duration::from_millis(2),
            orphaned: false,
        }
    }

    #[test]
    fn test_sanitize() {
        assert!(matches!(sanitize("plain"), Cow::Borrowed("plain")));
        assert_eq!(sanitize("a|b\nc"), "a b c");
    }

    #[test]
    fn test_format_record() {
        assert_eq!(
            format_record(&record("update", Some("game.lua"), 2)),
            "2|game.lua|update|3|7|script|0.001500|0.002000"
        );
        assert_eq!(
            format_record(&record("weird|name", None, 1)),
            "1||weird name|3|7|script|0.001500|0.002000"
        );
    }

    #[test]
    fn test_format_record_keeps_call_kind() {
        for (kind, column) in [
            (CallKind::Script, "script"),
            (CallKind::Native, "native"),
            (CallKind::Main, "main"),
            (CallKind::Tail, "tail"),
        ] {
            let mut record = record("f", None, 1);
            record.kind = kind;
            let line = format_record(&record);
            let fields: Vec<&str> = line.split('|').collect();
            assert_eq!(fields.len(), HEADER.split('|').count());
            assert_eq!(fields[5], column);
        }
    }

    #[test]
    fn test_write_records() {
        let mut out: Vec<u8> = vec![];
        write_header(&mut out).unwrap();
        write_records(&mut out, &[record("b", None, 2), record("a", None, 1)]).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].starts_with("2||b|"));
        assert!(lines[2].starts_with("1||a|"));
    }
}
