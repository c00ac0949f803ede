//! Flat-file field escaping
//!
//! Output framing: fields joined by a single TAB, rows terminated by a single
//! LF, no header. Inside a field the bytes that could break that framing are
//! replaced by two-byte sequences:
//!
//! | raw byte | written as |
//! |----------|------------|
//! | `\`      | `\\`       |
//! | TAB      | `\t`       |
//! | CR       | `\r`       |
//! | LF       | `\n`       |
//!
//! Backslash is escaped too, so [`unescape_field`] is an exact inverse for
//! any byte sequence, valid UTF-8 or not, and a raw TAB or LF in the output
//! is always framing.
//!
//! SQL NULL is written as the bare field `\N`, the warehouse loader's null
//! marker. No escaped value can produce it: a text value `\N` is written as
//! `\\N`, and the empty string stays an empty field.

use thiserror::Error;

pub const FIELD_DELIMITER: u8 = b'\t';
pub const RECORD_TERMINATOR: u8 = b'\n';
const ESCAPE: u8 = b'\\';

/// Whole-field marker for SQL NULL
pub const NULL_MARKER: &[u8] = b"\\N";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnescapeError {
    #[error("Dangling escape at end of field")]
    DanglingEscape,

    #[error("Unknown escape byte 0x{byte:02x} at offset {offset}")]
    UnknownEscape { byte: u8, offset: usize },
}

/// Append `raw` to `out` with framing bytes escaped
pub fn escape_field_into(out: &mut Vec<u8>, raw: &[u8]) {
    out.reserve(raw.len());
    for &byte in raw {
        match byte {
            ESCAPE => out.extend_from_slice(b"\\\\"),
            b'\t' => out.extend_from_slice(b"\\t"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            other => out.push(other),
        }
    }
}

/// Append a value that may be NULL
pub fn escape_nullable_field_into(out: &mut Vec<u8>, raw: Option<&[u8]>) {
    match raw {
        Some(raw) => escape_field_into(out, raw),
        None => out.extend_from_slice(NULL_MARKER),
    }
}

pub fn escape_field(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    escape_field_into(&mut out, raw);
    out
}

/// Append one framed record: escaped fields, TAB separated, LF terminated
pub fn escape_row_into<F>(out: &mut Vec<u8>, fields: &[F])
where
    F: AsRef<[u8]>,
{
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_DELIMITER);
        }
        escape_field_into(out, field.as_ref());
    }
    out.push(RECORD_TERMINATOR);
}

pub fn escape_row<F: AsRef<[u8]>>(fields: &[F]) -> Vec<u8> {
    let mut out = Vec::new();
    escape_row_into(&mut out, fields);
    out
}

/// [`escape_row_into`] for rows with NULLs, `None` becomes [`NULL_MARKER`]
pub fn escape_nullable_row_into<F>(out: &mut Vec<u8>, fields: &[Option<F>])
where
    F: AsRef<[u8]>,
{
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_DELIMITER);
        }
        escape_nullable_field_into(out, field.as_ref().map(|f| f.as_ref()));
    }
    out.push(RECORD_TERMINATOR);
}

/// Split one record (without its LF) into its escaped fields
///
/// Every raw TAB in a record is a delimiter, so a plain split is enough.
pub fn split_line(line: &[u8]) -> Vec<&[u8]> {
    line.split(|&b| b == FIELD_DELIMITER).collect()
}

/// Reverse [`escape_field`]
pub fn unescape_field(escaped: &[u8]) -> Result<Vec<u8>, UnescapeError> {
    let mut out = Vec::with_capacity(escaped.len());
    let mut bytes = escaped.iter().copied().enumerate();

    while let Some((offset, byte)) = bytes.next() {
        if byte != ESCAPE {
            out.push(byte);
            continue;
        }
        match bytes.next() {
            Some((_, ESCAPE)) => out.push(ESCAPE),
            Some((_, b't')) => out.push(b'\t'),
            Some((_, b'r')) => out.push(b'\r'),
            Some((_, b'n')) => out.push(b'\n'),
            Some((_, other)) => return Err(UnescapeError::UnknownEscape { byte: other, offset }),
            None => return Err(UnescapeError::DanglingEscape),
        }
    }

    Ok(out)
}

/// Reverse [`escape_nullable_field_into`], `None` for the NULL marker
pub fn unescape_nullable_field(escaped: &[u8]) -> Result<Option<Vec<u8>>, UnescapeError> {
    if escaped == NULL_MARKER {
        return Ok(None);
    }
    unescape_field(escaped).map(Some)
}
